//! Image-to-3D generation client
//!
//! This crate drives a remote image-to-3D inference server (a Hunyuan3D-style
//! API server) from Rust: it uploads an image, tracks the asynchronous job the
//! server creates, and writes the resulting GLB model to disk.
//!
//! # Features
//!
//! - **Readiness probe**: quick health check before committing to a job
//! - **Async job tracking**: submit once, then poll on a fixed interval
//! - **Progress events**: callback sink or a lazy `Stream` of session events
//! - **Cancellation and limits**: `CancellationToken`, wall-clock deadline and
//!   maximum poll count
//! - **Classified errors**: every failure ends the session with one
//!   [`GenerateError`] variant; nothing is retried internally
//!
//! # Session lifecycle
//!
//! ```text
//! generate(request)
//!     ↓ GET /api/health          (probe fails → BackendUnreachable)
//!     ↓ POST /api/send           (→ uid, "started" event)
//!     ↓ GET /api/status/{uid}    every poll interval
//!     ├─ started / processing   → progress event, keep polling
//!     ├─ error / failed         → RemoteGeneration
//!     └─ completed              → decode model_base64 → write file → path
//! ```
//!
//! # Example
//!
//! ```no_run
//! use imageto3d::{ClientConfig, GenerationRequest, ImageTo3dClient};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ImageTo3dClient::new(ClientConfig::from_env());
//!
//!     if !client.is_ready().await {
//!         eprintln!("Backend not reachable at {}", client.base_url());
//!         return Ok(());
//!     }
//!
//!     let request = GenerationRequest::new(PathBuf::from("input.png"), "model.glb")
//!         .with_texture(false);
//!     let path = client.generate(request).await?;
//!
//!     println!("Saved {}", path.display());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
mod session;
pub mod transport;
pub mod types;

pub use client::ImageTo3dClient;
pub use codec::{decode_artifact, encode_for_upload};
pub use config::{resolve_base_url, ClientConfig, API_URL_ENV, DEFAULT_SERVER_URL};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpTransport, Transport};
pub use types::{
    GenerateError, GenerationRequest, ImageSource, JobHandle, JobStatus, ProgressEvent,
    ProgressStage, Result, SessionEvent, SubmitPayload,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::ImageTo3dClient;
    pub use crate::config::ClientConfig;
    pub use crate::transport::{HttpTransport, Transport};
    pub use crate::types::{
        GenerateError, GenerationRequest, JobHandle, JobStatus, ProgressEvent, SessionEvent,
    };
    pub use tokio_util::sync::CancellationToken;
}
