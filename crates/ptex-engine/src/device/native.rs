use std::sync::Arc;

use glow::HasContext;

use super::{GlDevice, GlVersion, ShaderStage, TextureTarget};

/// Texture handle for [`GlowDevice`]: the GL name plus the base-level width
/// it was allocated with.
///
/// The width is recorded by whoever allocates the storage, so querying it
/// never touches GL binding state. For buffer textures it is the texel count.
/// The handle does not own the texture; deleting it stays with the allocator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GlowTexture {
    raw: glow::Texture,
    width: i32,
}

impl GlowTexture {
    #[inline]
    pub const fn new(raw: glow::Texture, width: i32) -> Self {
        Self { raw, width }
    }

    #[inline]
    pub fn raw(&self) -> glow::Texture {
        self.raw
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Width of mip `level`, halved per level and never below one texel.
    #[inline]
    pub fn level_width(&self, level: i32) -> i32 {
        (self.width >> level.clamp(0, 31)).max(1)
    }
}

/// [`GlDevice`] over a live OpenGL context loaded with `glow`.
///
/// Cloning shares the same context.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use glow::HasContext;
/// # use ptex_engine::device::{GlowDevice, GlowTexture};
/// # use ptex_engine::render::ptex::PtexMeshShader;
/// # fn demo(gl: Arc<glow::Context>) -> Result<(), Box<dyn std::error::Error>> {
/// let atlas = unsafe {
///     let raw = gl.create_texture()?;
///     gl.bind_texture(glow::TEXTURE_2D, Some(raw));
///     gl.tex_storage_2d(glow::TEXTURE_2D, 1, glow::RGBA8, 2048, 2048);
///     GlowTexture::new(raw, 2048)
/// };
///
/// let device = unsafe { GlowDevice::new(gl) };
/// let mut shader = PtexMeshShader::new(device)?;
/// shader.set_atlas_texture_size(&atlas, 256).bind_atlas_texture(&atlas);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GlowDevice {
    gl: Arc<glow::Context>,
}

impl GlowDevice {
    /// Wraps a loaded context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread for as long as this device
    /// (or any clone of it) is used, and every call must come from that thread.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }

    /// Returns the underlying context, e.g. to issue draw calls.
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

impl core::fmt::Debug for GlowDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlowDevice").field("version", &self.version()).finish()
    }
}

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn target_enum(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2d => glow::TEXTURE_2D,
        TextureTarget::Buffer => glow::TEXTURE_BUFFER,
    }
}

// Safety for every `unsafe` block below: `GlowDevice::new` requires the
// context to be current on the calling thread, and handles passed in were
// created by this context.
impl GlDevice for GlowDevice {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type UniformLocation = glow::UniformLocation;
    type Texture = GlowTexture;

    fn version(&self) -> GlVersion {
        let v = self.gl.version();
        GlVersion { major: v.major, minor: v.minor, embedded: v.is_embedded }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(stage_enum(stage)) }
    }

    fn compile_shader(&self, shader: Self::Shader, source: &str) -> Result<(), String> {
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(shader))
            }
        }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) -> Result<(), String> {
        unsafe {
            self.gl.link_program(program);
            if self.gl.get_program_link_status(program) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(program))
            }
        }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn use_program(&self, program: Self::Program) {
        unsafe { self.gl.use_program(Some(program)) }
    }

    fn set_uniform_i32(&self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn set_uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), value) }
    }

    fn set_uniform_mat4(&self, location: &Self::UniformLocation, value: &[f32; 16]) {
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(location), false, value) }
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Self::Texture) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target_enum(target), Some(texture.raw));
        }
    }

    fn texture_width(&self, texture: Self::Texture, level: i32) -> i32 {
        texture.level_width(level)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn texture(width: i32) -> GlowTexture {
        GlowTexture::new(glow::NativeTexture(NonZeroU32::MIN), width)
    }

    #[test]
    fn level_width_halves_per_mip() {
        let t = texture(2048);
        assert_eq!(t.level_width(0), 2048);
        assert_eq!(t.level_width(3), 256);
        assert_eq!(t.level_width(40), 1);
    }

    #[test]
    fn level_width_keeps_odd_base() {
        assert_eq!(texture(2047).level_width(0), 2047);
        assert_eq!(texture(2047).level_width(1), 1023);
    }
}
