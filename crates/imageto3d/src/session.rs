//! Generation session state machine
//!
//! A session walks `Probing → Submitting → Polling → {Succeeded | Failed}`
//! and is exposed as a lazy stream of [`SessionEvent`]s. The stream yields a
//! progress event for every non-terminal status, then exactly one
//! [`SessionEvent::Finished`], then ends.
//!
//! The poll timer lives inside the `Polling` state, so leaving that state for
//! any reason (terminal status, poll failure, cancellation, timeout, or the
//! consumer dropping the stream) drops the timer with it. Polls are issued
//! one at a time: the next tick is only awaited after the previous status has
//! been handled.

use crate::codec::{decode_artifact, encode_for_upload};
use crate::config::{MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::transport::Transport;
use crate::types::{
    GenerateError, GenerationRequest, ImageSource, JobHandle, JobStatus, ProgressEvent,
    ProgressStage, Result, SessionEvent,
};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Suffix of the temp file an artifact is written to before it is renamed
const PARTIAL_SUFFIX: &str = ".part";

/// Polling limits copied out of the client configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollSettings {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
    pub max_polls: Option<u32>,
}

enum Phase {
    Probing(GenerationRequest),
    Submitting(GenerationRequest),
    Polling(PollState),
    Done,
}

struct PollState {
    handle: JobHandle,
    output: PathBuf,
    ticker: Interval,
    submitted_at: Instant,
    polls: u32,
}

struct Session<'a, T> {
    transport: &'a T,
    settings: PollSettings,
    cancel: CancellationToken,
    phase: Phase,
}

/// Build the event stream for one generation request
pub(crate) fn run<'a, T: Transport>(
    transport: &'a T,
    settings: PollSettings,
    request: GenerationRequest,
    cancel: CancellationToken,
) -> impl Stream<Item = SessionEvent> + Send + 'a {
    let session = Session {
        transport,
        settings,
        cancel,
        phase: Phase::Probing(request),
    };
    futures::stream::unfold(session, |session| session.step())
}

impl<'a, T: Transport> Session<'a, T> {
    /// Advance until the next event; `None` once the session has finished
    async fn step(mut self) -> Option<(SessionEvent, Self)> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => return None,

                Phase::Probing(request) => {
                    let ready = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return self.finish(Err(GenerateError::Cancelled)),
                        ready = self.transport.probe() => ready,
                    };
                    if !ready {
                        let base_url = self.transport.base_url().to_string();
                        return self.finish(Err(GenerateError::BackendUnreachable(base_url)));
                    }
                    self.phase = Phase::Submitting(request);
                }

                Phase::Submitting(mut request) => {
                    let source =
                        std::mem::replace(&mut request.source, ImageSource::Bytes(Vec::new()));
                    let image = match source.load().await {
                        Ok(bytes) => encode_for_upload(&bytes),
                        Err(e) => return self.finish(Err(e)),
                    };
                    let payload = request.to_payload(image);

                    let submitted = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return self.finish(Err(GenerateError::Cancelled)),
                        submitted = self.transport.submit(&payload) => submitted,
                    };
                    let handle = match submitted {
                        Ok(handle) => handle,
                        Err(e) => return self.finish(Err(e)),
                    };
                    tracing::info!("Submitted generation job {}", handle);

                    let submitted_at = Instant::now();
                    let interval = self
                        .settings
                        .interval
                        .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
                    let first_tick = submitted_at.checked_add(interval).unwrap_or(submitted_at);
                    let mut ticker = interval_at(first_tick, interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    let event = ProgressEvent {
                        status: ProgressStage::Started,
                        uid: handle.clone(),
                        progress: Some(0.0),
                    };
                    self.phase = Phase::Polling(PollState {
                        handle,
                        output: request.output,
                        ticker,
                        submitted_at,
                        polls: 0,
                    });
                    return Some((SessionEvent::Progress(event), self));
                }

                Phase::Polling(mut state) => {
                    if let Some(max_polls) = self.settings.max_polls {
                        if state.polls >= max_polls {
                            return self.finish(Err(state.timeout()));
                        }
                    }
                    // A limit past the end of the clock is no limit
                    let deadline = self
                        .settings
                        .max_wait
                        .and_then(|wait| state.submitted_at.checked_add(wait));

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return self.finish(Err(GenerateError::Cancelled)),
                        _ = sleep_until(deadline) => return self.finish(Err(state.timeout())),
                        _ = state.ticker.tick() => {}
                    }

                    state.polls += 1;
                    let polled = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return self.finish(Err(GenerateError::Cancelled)),
                        polled = self.transport.poll_status(&state.handle) => polled,
                    };
                    let status = match polled {
                        Ok(status) => status,
                        Err(e) => return self.finish(Err(e)),
                    };
                    tracing::debug!("Job {} poll {}: {}", state.handle, state.polls, status.name());

                    match status {
                        JobStatus::Started => {
                            let event = state.progress(ProgressStage::Started, None);
                            self.phase = Phase::Polling(state);
                            return Some((SessionEvent::Progress(event), self));
                        }
                        JobStatus::Processing { progress } => {
                            let event = state.progress(ProgressStage::Processing, progress);
                            self.phase = Phase::Polling(state);
                            return Some((SessionEvent::Progress(event), self));
                        }
                        JobStatus::Unrecognized(_) => {
                            self.phase = Phase::Polling(state);
                        }
                        JobStatus::Completed { artifact: None } => {
                            return self.finish(Err(GenerateError::EmptyArtifact));
                        }
                        JobStatus::Completed {
                            artifact: Some(encoded),
                        } => {
                            // Release the timer before touching the filesystem
                            let PollState { output, ticker, .. } = state;
                            drop(ticker);
                            let result = write_artifact(&encoded, output).await;
                            return self.finish(result);
                        }
                        JobStatus::Failed { message } => {
                            return self.finish(Err(GenerateError::RemoteGeneration { message }));
                        }
                    }
                }
            }
        }
    }

    /// Emit the terminal event; the phase is already `Done`
    fn finish(self, result: Result<PathBuf>) -> Option<(SessionEvent, Self)> {
        match &result {
            Ok(path) => tracing::info!("Model written to {}", path.display()),
            Err(e) => tracing::warn!("Generation failed: {}", e),
        }
        Some((SessionEvent::Finished(result), self))
    }
}

impl PollState {
    fn progress(&self, status: ProgressStage, progress: Option<f64>) -> ProgressEvent {
        ProgressEvent {
            status,
            uid: self.handle.clone(),
            progress,
        }
    }

    fn timeout(&self) -> GenerateError {
        GenerateError::Timeout {
            uid: self.handle.to_string(),
            polls: self.polls,
            elapsed: self.submitted_at.elapsed(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Write the decoded model through a sibling temp file, so `output` is
/// either absent or complete
async fn write_artifact(encoded: &str, output: PathBuf) -> Result<PathBuf> {
    let bytes = decode_artifact(encoded)?;
    let temp_path = partial_path(&output);

    let written = match tokio::fs::write(&temp_path, &bytes).await {
        Ok(()) => tokio::fs::rename(&temp_path, &output).await,
        Err(e) => Err(e),
    };
    if let Err(source) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(GenerateError::ArtifactWrite {
            path: output,
            source,
        });
    }
    Ok(output)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    output.with_file_name(name)
}
