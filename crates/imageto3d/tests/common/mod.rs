//! Shared test infrastructure for integration tests.

#![allow(dead_code)]

use imageto3d::{GenerateError, JobHandle, JobStatus, Result, SubmitPayload, Transport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory transport that replays a fixed script.
///
/// Once the poll script is exhausted every further poll reports `started`,
/// which keeps a session polling until a limit or cancellation ends it.
pub struct ScriptedTransport {
    ready: bool,
    submit_result: Mutex<Option<Result<JobHandle>>>,
    polls: Mutex<VecDeque<Result<JobStatus>>>,
    submitted: Mutex<Vec<SubmitPayload>>,
    probe_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
}

impl ScriptedTransport {
    /// A reachable backend that accepts the job as `abc123`.
    pub fn new() -> Self {
        Self {
            ready: true,
            submit_result: Mutex::new(Some(Ok(JobHandle::new("abc123")))),
            polls: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            probe_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }

    /// A backend whose health probe fails.
    pub fn unreachable() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn with_submit_error(self, error: GenerateError) -> Self {
        *self.submit_result.lock().unwrap() = Some(Err(error));
        self
    }

    pub fn with_polls(self, polls: Vec<Result<JobStatus>>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<SubmitPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn base_url(&self) -> &str {
        "http://scripted.test"
    }

    async fn probe(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.ready
    }

    async fn submit(&self, payload: &SubmitPayload) -> Result<JobHandle> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(payload.clone());
        self.submit_result
            .lock()
            .unwrap()
            .take()
            .expect("submit called more than once")
    }

    async fn poll_status(&self, handle: &JobHandle) -> Result<JobStatus> {
        assert_eq!(handle.as_str(), "abc123");
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(JobStatus::Started))
    }
}

/// `completed` status carrying the given base64 payload.
pub fn completed(model_base64: &str) -> Result<JobStatus> {
    Ok(JobStatus::Completed {
        artifact: Some(model_base64.to_string()),
    })
}

/// `processing` status with a percentage.
pub fn processing(progress: f64) -> Result<JobStatus> {
    Ok(JobStatus::Processing {
        progress: Some(progress),
    })
}
