//! Math types shared by the renderers.
//!
//! Matrices are column-major and match GLSL `mat4` layout, so they upload
//! without transposition.

mod mat4;

pub use mat4::Mat4;
