//! Ptex mesh rendering.
//!
//! Meshes are textured with a per-face atlas (one square tile per face, row
//! major) and a buffer texture of face neighbors used to filter across tile
//! seams. [`PtexMeshShader`] owns the GL program; textures stay with the
//! mesh data and are only borrowed per draw.

mod atlas;
mod drawable;
mod error;
mod resources;
mod shader;

pub use atlas::AtlasGeometry;
pub use drawable::{PtexMeshDrawable, ToneMap};
pub use error::{Result, ShaderError};
pub use resources::{DEFAULT_SHADERS, DEFAULT_VARIANT, SHADER_GROUP, ensure_resources_registered};
pub use shader::{MIN_GL_VERSION, PtexMeshShader, PtexShaderInit, TextureSlot};
