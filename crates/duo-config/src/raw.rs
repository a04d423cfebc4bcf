use serde::Deserialize;

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    pub runtime: Option<Vec<String>>,
    pub package_manager: Option<Vec<String>>,
    pub backend: Option<RawService>,
    pub frontend: Option<RawService>,
    pub timing: Option<RawTiming>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawService {
    pub args: Option<Vec<String>>,
    pub cwd: Option<String>,
    pub port: Option<u16>,
    pub health_path: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTiming {
    pub settle_delay_ms: Option<u64>,
    pub stop_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub readiness_attempts: Option<u32>,
    pub waiting_notice_every: Option<u32>,
}
