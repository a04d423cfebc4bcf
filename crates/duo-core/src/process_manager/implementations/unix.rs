use std::{os::unix::process::ExitStatusExt, process::ExitStatus, time::Duration};

use futures::StreamExt;
use libc::{killpg, setsid, ESRCH, SIGKILL, SIGTERM};
use tokio::{
    io::AsyncRead,
    process::{Child, Command},
    time::{sleep, Instant},
};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};

use crate::{
    error::{Error, Result},
    process_manager::{
        base::ProcessManager,
        types::{BoxStream, CommandSpec, ProcId, Spawned},
    },
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct ChildRec {
    child: Child,
    pgid: libc::pid_t,
}

/// Unix-specific process manager.
///
/// Every child leads its own session, so signals are delivered to the whole process
/// group and tools like `npm` cannot leave their own children behind.
#[derive(Debug)]
pub struct UnixProcessManager {
    processes: Vec<Option<ChildRec>>,
}

impl Default for UnixProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UnixProcessManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
        }
    }

    fn index(id: ProcId) -> Result<usize> {
        usize::try_from(id.0).map_err(|_| Error::UnknownProcess(id))
    }

    fn record(&self, id: ProcId) -> Result<&ChildRec> {
        self.processes
            .get(Self::index(id)?)
            .ok_or(Error::UnknownProcess(id))?
            .as_ref()
            .ok_or(Error::AlreadyExited(id))
    }
}

/// Split a pipe into lossily decoded lines.
fn lines<R>(reader: R, name: String) -> BoxStream<String>
where
    R: AsyncRead + Send + 'static,
{
    let codec = AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec());
    Box::pin(FramedRead::new(reader, codec).filter_map(move |res| {
        let name = name.clone();
        async move {
            match res {
                Ok(bytes) => Some(decode_line(&bytes)),
                Err(err) => {
                    tracing::warn!("Failed to read output of `{name}`: {err}");
                    None
                }
            }
        }
    }))
}

pub(crate) fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_owned()
}

/// Exit code, or `128 + signal` for children terminated by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or_default()
}

/// Deliver `signal` to a process group. A group that no longer exists is not an error.
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> Result<()> {
    #[allow(unsafe_code)]
    let rc = unsafe { killpg(pgid, signal) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(ESRCH) {
            return Err(Error::IO(err));
        }
        tracing::debug!("Process group {pgid} is already gone");
    }
    Ok(())
}

#[async_trait::async_trait]
impl ProcessManager for UnixProcessManager {
    async fn spawn(&mut self, spec: CommandSpec) -> Result<Spawned> {
        let Some((program, args)) = spec.cmd.split_first() else {
            return Err(Error::EmptyCommand(spec.name));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                if setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        cmd.stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let pid = child.id();
        let pgid = pid
            .and_then(|pid| libc::pid_t::try_from(pid).ok())
            .ok_or_else(|| Error::IO(std::io::Error::other("pid not available")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::IO(std::io::Error::other("stdout not piped")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::IO(std::io::Error::other("stderr not piped")))?;

        let id = ProcId(self.processes.len() as u64);
        self.processes.push(Some(ChildRec { child, pgid }));

        tracing::debug!("Spawned `{}` as {id:?} (pid {pgid})", spec.name);

        Ok(Spawned {
            id,
            pid,
            stdout: lines(stdout, spec.name.clone()),
            stderr: lines(stderr, spec.name),
        })
    }

    async fn shutdown(&mut self, id: ProcId) -> Result<()> {
        let proc = self.record(id)?;
        signal_group(proc.pgid, SIGTERM)
    }

    async fn wait(&mut self, id: ProcId, d: Duration) -> Result<Option<i32>> {
        let index = Self::index(id)?;
        let proc = self
            .processes
            .get_mut(index)
            .ok_or(Error::UnknownProcess(id))?
            .as_mut()
            .ok_or(Error::AlreadyExited(id))?;

        let start = Instant::now();
        loop {
            if let Some(status) = proc.child.try_wait()? {
                let pgid = proc.pgid;
                self.processes[index] = None;

                // The leader is gone; take down anything it left in its group.
                if let Err(err) = signal_group(pgid, SIGKILL) {
                    tracing::debug!("Failed to reap process group {pgid}: {err}");
                }

                return Ok(Some(exit_code(status)));
            }

            if start.elapsed() >= d {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn kill(&mut self, id: ProcId) -> Result<()> {
        let proc = self.record(id)?;
        signal_group(proc.pgid, SIGKILL)?;

        match self.wait(id, Duration::from_millis(10)).await {
            Ok(Some(code)) => tracing::debug!("Killed {id:?} exited with {code}"),
            Ok(None) => tracing::debug!("Killed {id:?} not reaped yet"),
            Err(err) => tracing::debug!("Failed to reap killed {id:?}: {err}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"Compiled successfully!\n"), "Compiled successfully!");
        assert_eq!(decode_line(b"windows line\r\n"), "windows line");
        assert_eq!(decode_line(b"no terminator"), "no terminator");
        assert_eq!(decode_line(b"bad \xff byte"), "bad \u{fffd} byte");
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code(ExitStatus::from_raw(SIGKILL)), 137);
    }
}
