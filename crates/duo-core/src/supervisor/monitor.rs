use duo_types::{ProcessName, Service};
use futures::StreamExt;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    process_manager::BoxStream,
    supervisor::events::{Notice, SupervisorEvent},
};

/// Decides how lines of one process are presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classifier {
    /// Forward every line as is.
    Verbatim,
    /// Collapse the dev server's well-known progress lines into notices.
    DevServer { port: u16 },
}

impl Classifier {
    #[must_use]
    pub fn for_service(service: &Service) -> Self {
        match service.name {
            ProcessName::Backend => Classifier::Verbatim,
            ProcessName::Frontend => Classifier::DevServer { port: service.port },
        }
    }

    /// First matching rule wins.
    #[must_use]
    pub fn classify(&self, line: &str) -> Option<Notice> {
        let Classifier::DevServer { port } = self else {
            return None;
        };

        let lower = line.to_lowercase();
        if lower.contains("compiled successfully") || lower.contains("compiled with") {
            Some(Notice::CompiledSuccessfully)
        } else if lower.contains("local:") && lower.contains(&port.to_string()) {
            Some(Notice::Available {
                url: format!("http://localhost:{port}"),
            })
        } else if lower.contains("webpack compiled") {
            Some(Notice::WebpackCompiled)
        } else if lower.contains("no issues found") {
            Some(Notice::ReadyForDevelopment)
        } else {
            None
        }
    }

    fn event(&self, process: ProcessName, line: String) -> SupervisorEvent {
        match self.classify(&line) {
            Some(notice) => SupervisorEvent::Notice { process, notice },
            None => SupervisorEvent::Log { process, line },
        }
    }
}

async fn follow_output(
    process: ProcessName,
    mut output: BoxStream<String>,
    classifier: Classifier,
    token: CancellationToken,
    tx: Sender<SupervisorEvent>,
) {
    let open = loop {
        let line = tokio::select! {
            biased;
            () = token.cancelled() => break true,
            line = output.next() => line,
        };
        let Some(line) = line else {
            tracing::debug!("Output of {process} closed");
            break false;
        };

        let event = classifier.event(process, line);
        tokio::select! {
            biased;
            () = token.cancelled() => break true,
            res = tx.send(event) => {
                if let Err(err) = res {
                    tracing::error!("Failed to send log event: {}", err);
                    break true;
                }
            }
        }
    };

    if open {
        // The child may still be writing while it shuts down; its pipes must stay open
        // until it exits or the reader is aborted.
        let mut discarded = 0usize;
        while output.next().await.is_some() {
            discarded += 1;
        }
        tracing::debug!("Discarded {discarded} lines of {process} output after forwarding stopped");
    }

    tracing::trace!("Reader for {process} finished");
}

/// Start the reader for one process. Stdout and stderr are merged into one line stream.
pub(crate) fn spawn_reader(
    process: ProcessName,
    stdout: BoxStream<String>,
    stderr: BoxStream<String>,
    classifier: Classifier,
    token: CancellationToken,
    tx: Sender<SupervisorEvent>,
) -> JoinHandle<()> {
    let merged: BoxStream<String> = Box::pin(futures::stream::select(stdout, stderr));
    tokio::spawn(follow_output(process, merged, classifier, token, tx))
}
