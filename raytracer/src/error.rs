use std::path::PathBuf;

use scene::SceneError;
use thiserror::Error;

/// Errors raised while setting up or driving the renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("kernel program {path} could not be read: {source}")]
    MissingKernel {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kernel program failed validation: {0}")]
    InvalidKernel(String),

    #[error("no directional light configured, add a [light] section to the config")]
    MissingLight,

    #[error("{what} needs {requested} but the device allows {limit}")]
    ResourceExhausted {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    #[error("GPU allocation failed: {0}")]
    AllocationFailed(String),

    #[error("output extent {width}x{height} is empty")]
    EmptyExtent { width: u32, height: u32 },

    #[error("render session is not active")]
    Inactive,

    #[error("camera projection is not invertible")]
    DegenerateProjection,

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("environment map could not be loaded: {0:#}")]
    Environment(anyhow::Error),
}

impl RenderError {
    /// Whether the error only affects the current frame. The frame is skipped and retried.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            RenderError::ResourceExhausted { .. }
                | RenderError::AllocationFailed(_)
                | RenderError::EmptyExtent { .. }
                | RenderError::Inactive
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
