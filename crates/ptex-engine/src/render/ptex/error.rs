use ptex_resources::ResourceError;
use thiserror::Error;

use crate::device::{GlVersion, ShaderStage};

/// Failure while building a [`PtexMeshShader`](super::PtexMeshShader).
///
/// Only construction can fail. Every variant is fatal for the rendering
/// subsystem: rebuilding from the same sources reproduces the same error.
#[derive(Error, Debug)]
pub enum ShaderError {
    /// The context is older than the program requires.
    #[error("unsupported device: {found} found, {required} required")]
    UnsupportedDevice { required: GlVersion, found: GlVersion },

    /// The shader bundle is missing or corrupt.
    #[error("missing shader resource: {0}")]
    MissingResource(#[from] ResourceError),

    /// A stage failed to compile.
    #[error("failed to compile {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },

    /// The program failed to link, or lacks a uniform the renderer needs.
    #[error("failed to link shader program: {log}")]
    Link { log: String },
}

pub type Result<T> = std::result::Result<T, ShaderError>;
