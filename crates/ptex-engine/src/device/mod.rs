//! OpenGL device access.
//!
//! Renderers talk to the GPU through [`GlDevice`], a narrow slice of the GL
//! API covering program build, uniform upload and texture-unit binding.
//!
//! Implementations:
//! - [`GlowDevice`]: a live context through `glow`
//! - `HeadlessDevice`: an in-process emulation for tests and tooling,
//!   behind the `headless` feature
//!
//! All methods must be called on the thread that owns the context.

#[cfg(any(test, feature = "headless"))]
mod headless;
mod native;
mod version;

use core::fmt;

#[cfg(any(test, feature = "headless"))]
pub use headless::{
    HeadlessDevice, HeadlessLocation, HeadlessProgram, HeadlessShader, HeadlessTexture,
    UniformValue,
};
pub use native::{GlowDevice, GlowTexture};
pub use version::GlVersion;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl ShaderStage {
    /// Source file extension used for this stage in resource groups.
    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Geometry => "geom",
            ShaderStage::Fragment => "frag",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Texture binding target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureTarget {
    Texture2d,
    /// Buffer-backed 1-D texture (`samplerBuffer`).
    Buffer,
}

/// The GL operations the renderers rely on.
///
/// Handles are plain copyable names, as in GL itself; passing one around never
/// transfers ownership of the underlying object.
pub trait GlDevice {
    type Shader: Copy + fmt::Debug;
    type Program: Copy + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;
    type Texture: Copy + fmt::Debug;

    /// Version of the current context.
    fn version(&self) -> GlVersion;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;

    /// Uploads `source` and compiles it. On failure returns the info log.
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String>;

    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);

    /// Links `program`. On failure returns the info log.
    fn link_program(&self, program: Self::Program) -> Result<(), String>;

    fn delete_program(&self, program: Self::Program);

    /// Location of an active uniform, `None` if the program has no such uniform.
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;

    /// Makes `program` current; uniform uploads target the current program.
    fn use_program(&self, program: Self::Program);

    fn set_uniform_i32(&self, location: &Self::UniformLocation, value: i32);

    fn set_uniform_f32(&self, location: &Self::UniformLocation, value: f32);

    /// Uploads a column-major 4×4 matrix.
    fn set_uniform_mat4(&self, location: &Self::UniformLocation, value: &[f32; 16]);

    /// Binds `texture` to texture unit `unit`.
    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Self::Texture);

    /// Width in texels of mip `level` of a 2-D texture.
    ///
    /// Must not change any texture binding. The texture must be allocated;
    /// otherwise the result is unspecified.
    fn texture_width(&self, texture: Self::Texture, level: i32) -> i32;
}
