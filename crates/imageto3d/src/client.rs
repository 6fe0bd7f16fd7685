//! Image-to-3D client: one `generate` call per model

use crate::config::ClientConfig;
use crate::session::{self, PollSettings};
use crate::transport::{HttpTransport, Transport};
use crate::types::{GenerateError, GenerationRequest, ProgressEvent, Result, SessionEvent};
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Client for an image-to-3D inference backend
///
/// Each call to [`generate`](Self::generate) is an independent session:
/// probe the backend, submit the image, poll until the job finishes, then
/// write the decoded model to the requested path. Sessions share no mutable
/// state, so one client can drive several generations concurrently.
///
/// # Example
///
/// ```no_run
/// use imageto3d::{CancellationToken, ClientConfig, GenerationRequest, ImageTo3dClient};
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ImageTo3dClient::new(ClientConfig::new("http://localhost:8081"));
///
///     let request = GenerationRequest::new(PathBuf::from("/tmp/chair.png"), "/tmp/chair.glb")
///         .with_seed(42)
///         .with_octree_resolution(256);
///
///     let path = client
///         .generate_with_progress(request, CancellationToken::new(), |event| {
///             println!("{:?} {:?}", event.status, event.progress);
///         })
///         .await?;
///
///     println!("Model written to {}", path.display());
///     Ok(())
/// }
/// ```
pub struct ImageTo3dClient<T = HttpTransport> {
    transport: T,
    settings: PollSettings,
}

impl ImageTo3dClient<HttpTransport> {
    /// Create an HTTP client from the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(HttpTransport::new(&config), &config)
    }

    /// Create an HTTP client configured from `I23D_API_URL`
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }
}

impl Default for ImageTo3dClient<HttpTransport> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<T: Transport> ImageTo3dClient<T> {
    /// Create a client over a custom transport
    ///
    /// Only the polling settings of `config` are used; the transport owns its
    /// own endpoint and timeouts.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            settings: PollSettings {
                interval: config.poll_interval,
                max_wait: config.max_wait,
                max_polls: config.max_polls,
            },
        }
    }

    /// Backend root URL
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Check whether the backend is reachable
    pub async fn is_ready(&self) -> bool {
        self.transport.probe().await
    }

    /// Run a session as a lazy stream of events
    ///
    /// Nothing happens until the stream is polled. The stream yields one
    /// [`SessionEvent::Progress`] per non-terminal status, then a single
    /// [`SessionEvent::Finished`], then ends. Dropping the stream abandons
    /// the session and its poll timer; the backend job is left running.
    pub fn session(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = SessionEvent> + Send + '_ {
        session::run(&self.transport, self.settings, request, cancel)
    }

    /// Generate a model and return the path it was written to
    pub async fn generate(&self, request: GenerationRequest) -> Result<PathBuf> {
        self.generate_with_progress(request, CancellationToken::new(), |_| {})
            .await
    }

    /// Generate a model, reporting every non-terminal status to `on_progress`
    ///
    /// Triggering `cancel` stops polling and resolves with
    /// [`GenerateError::Cancelled`].
    pub async fn generate_with_progress<F>(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
        mut on_progress: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(&ProgressEvent),
    {
        drive(self.session(request, cancel), &mut on_progress).await
    }
}

/// Feed progress events to `on_progress` until the session finishes
async fn drive<S, F>(events: S, on_progress: &mut F) -> Result<PathBuf>
where
    S: Stream<Item = SessionEvent>,
    F: FnMut(&ProgressEvent),
{
    let mut events = std::pin::pin!(events);

    while let Some(event) = events.next().await {
        match event {
            SessionEvent::Progress(progress) => on_progress(&progress),
            SessionEvent::Finished(result) => return result,
        }
    }

    Err(GenerateError::SessionEnded)
}
