//! Types for image-to-3D API requests, job status and errors

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error types for a generation session
///
/// Every variant is terminal: once produced, the session has ended and
/// nothing is retried.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Image-to-3D backend is not reachable at {0}")]
    BackendUnreachable(String),

    #[error("Input image not found: {}: {source}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend rejected submission ({status}): {body}")]
    BackendRejected { status: u16, body: String },

    #[error("Polling error: {0}")]
    PollingError(String),

    #[error("Generated artifact is not valid base64: {0}")]
    CorruptArtifact(#[from] base64::DecodeError),

    #[error("Generation completed but no model data returned")]
    EmptyArtifact,

    #[error("{message}")]
    RemoteGeneration { message: String },

    #[error("Job {uid} did not finish after {polls} polls ({elapsed:?})")]
    Timeout {
        uid: String,
        polls: u32,
        elapsed: Duration,
    },

    #[error("Generation cancelled")]
    Cancelled,

    /// The event stream closed before reporting an outcome
    #[error("Session ended without a result")]
    SessionEnded,

    #[error("Failed to write model to {}: {source}", .path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Message used when the backend fails a job without saying why
pub const UNKNOWN_GENERATION_ERROR: &str = "Unknown generation error";

/// Artifact format requested from the backend
pub const MODEL_TYPE: &str = "glb";

/// Where the input image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Read from disk once, right before submission
    Path(PathBuf),
    /// Already-loaded image bytes
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Load the raw image bytes, consuming the source
    pub async fn load(self) -> Result<Vec<u8>> {
        match self {
            ImageSource::Path(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(source) => Err(GenerateError::SourceNotFound { path, source }),
            },
            ImageSource::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&std::path::Path> for ImageSource {
    fn from(path: &std::path::Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

/// Seed sent when the request does not specify one
pub const DEFAULT_SEED: i64 = 1234;

const DEFAULT_OCTREE_RESOLUTION: u32 = 256;
const DEFAULT_NUM_INFERENCE_STEPS: u32 = 50;
const DEFAULT_GUIDANCE_SCALE: f32 = 5.5;

/// A single "generate a 3D model" request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Input image
    pub source: ImageSource,

    /// Where the decoded model is written on success
    pub output: PathBuf,

    /// Remove the image background before generation (default: true)
    pub remove_background: bool,

    /// Generate PBR textures (default: true)
    pub texture: bool,

    /// Random seed (default sent to the backend: 1234)
    pub seed: Option<i64>,

    /// Mesh octree resolution (default: 256)
    pub octree_resolution: u32,

    /// Diffusion steps (default: 50)
    pub num_inference_steps: u32,

    /// Guidance scale (default: 5.5)
    pub guidance_scale: f32,

    /// Optional server-side file name
    pub filename: Option<String>,
}

impl GenerationRequest {
    /// Create a request with default generation parameters
    pub fn new(source: impl Into<ImageSource>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            remove_background: true,
            texture: true,
            seed: None,
            octree_resolution: DEFAULT_OCTREE_RESOLUTION,
            num_inference_steps: DEFAULT_NUM_INFERENCE_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            filename: None,
        }
    }

    /// Enable or disable background removal
    pub fn with_remove_background(mut self, remove_background: bool) -> Self {
        self.remove_background = remove_background;
        self
    }

    /// Enable or disable texture generation
    pub fn with_texture(mut self, texture: bool) -> Self {
        self.texture = texture;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the octree resolution
    pub fn with_octree_resolution(mut self, resolution: u32) -> Self {
        self.octree_resolution = resolution;
        self
    }

    /// Set the number of inference steps
    pub fn with_num_inference_steps(mut self, steps: u32) -> Self {
        self.num_inference_steps = steps.max(1);
        self
    }

    /// Set the guidance scale
    pub fn with_guidance_scale(mut self, scale: f32) -> Self {
        self.guidance_scale = scale.max(0.0);
        self
    }

    /// Set the server-side file name
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Build the wire body around an already-encoded image
    pub fn to_payload(&self, image: String) -> SubmitPayload {
        SubmitPayload {
            image,
            remove_background: self.remove_background,
            texture: self.texture,
            seed: self.seed.unwrap_or(DEFAULT_SEED),
            octree_resolution: self.octree_resolution,
            num_inference_steps: self.num_inference_steps,
            guidance_scale: self.guidance_scale,
            model_type: MODEL_TYPE.to_string(),
            filename: self.filename.clone().filter(|name| !name.is_empty()),
        }
    }
}

/// JSON body of `POST /api/send`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitPayload {
    /// Base64-encoded image
    pub image: String,
    pub remove_background: bool,
    pub texture: bool,
    pub seed: i64,
    pub octree_resolution: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,

    /// Always "glb"
    #[serde(rename = "type")]
    pub model_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// JSON body returned by `POST /api/send`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub uid: String,
}

/// Opaque backend job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status observed by one poll
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Accepted, waiting for a worker
    Started,

    /// Running, with an optional percentage in 0..=100
    Processing { progress: Option<f64> },

    /// Finished; `artifact` is the base64 model when the backend sent one
    Completed { artifact: Option<String> },

    /// The backend reported `error` or `failed`
    Failed { message: String },

    /// A status string this client does not know; polling continues
    Unrecognized(String),
}

impl JobStatus {
    /// Whether this status ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    /// Short name for logging; never includes the artifact
    pub fn name(&self) -> &str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Processing { .. } => "processing",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
            JobStatus::Unrecognized(status) => status,
        }
    }
}

/// JSON body returned by `GET /api/status/{uid}`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,

    #[serde(default)]
    pub progress: Option<f64>,

    #[serde(default)]
    pub model_base64: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl From<StatusResponse> for JobStatus {
    fn from(response: StatusResponse) -> Self {
        let non_empty = |value: Option<String>| value.filter(|s| !s.is_empty());

        match response.status.as_str() {
            "started" => JobStatus::Started,
            "processing" => JobStatus::Processing {
                progress: response.progress.map(|p| p.clamp(0.0, 100.0)),
            },
            "completed" => JobStatus::Completed {
                artifact: non_empty(response.model_base64),
            },
            "error" | "failed" => JobStatus::Failed {
                message: non_empty(response.message)
                    .or_else(|| non_empty(response.error))
                    .unwrap_or_else(|| UNKNOWN_GENERATION_ERROR.to_string()),
            },
            _ => JobStatus::Unrecognized(response.status),
        }
    }
}

/// Stage reported by a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Started,
    Processing,
}

/// Non-terminal status notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub status: ProgressStage,
    pub uid: JobHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// One item of a generation session stream
#[derive(Debug)]
pub enum SessionEvent {
    Progress(ProgressEvent),
    /// Always the last item
    Finished(Result<PathBuf>),
}
