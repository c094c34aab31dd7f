use ptex_resources::{Bundle, Resource};

use crate::coords::Mat4;
use crate::device::{GlDevice, GlVersion, ShaderStage, TextureTarget};

use super::atlas::AtlasGeometry;
use super::error::{Result, ShaderError};
use super::resources::{DEFAULT_SHADERS, DEFAULT_VARIANT, ensure_resources_registered};

/// Oldest context the ptex program runs on.
pub const MIN_GL_VERSION: GlVersion = GlVersion::GL410;

/// Texture units used by the ptex program.
///
/// GLSL 4.10 cannot declare sampler bindings in source, so these indices are
/// uploaded into the sampler uniforms once after linking and must match the
/// comments in `ptex-default-gl410.frag`.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureSlot {
    Atlas = 0,
    Adjacency = 1,
}

impl TextureSlot {
    #[inline]
    pub const fn unit(self) -> u32 {
        self as u32
    }
}

// Uniform names shared with the GLSL sources.
const U_TRANSFORM: &str = "MVP";
const U_EXPOSURE: &str = "exposure";
const U_GAMMA: &str = "gamma";
const U_SATURATION: &str = "saturation";
const U_TILE_SIZE: &str = "tileSize";
const U_TILES_PER_ROW: &str = "widthInTiles";
const U_ATLAS_SAMPLER: &str = "atlasTex";
const U_ADJACENCY_SAMPLER: &str = "meshAdjFaces";

/// Which sources a [`PtexMeshShader`] is built from.
#[derive(Debug, Copy, Clone)]
pub struct PtexShaderInit {
    /// Bundle registered (once per process) and read for sources.
    pub bundle: &'static Bundle,

    /// Base name of the sources; `.vert`, `.geom` and `.frag` are appended.
    pub variant: &'static str,
}

impl Default for PtexShaderInit {
    fn default() -> Self {
        Self {
            bundle: &DEFAULT_SHADERS,
            variant: DEFAULT_VARIANT,
        }
    }
}

/// Uniform locations resolved once after linking.
#[derive(Debug, Clone)]
struct UniformCache<L> {
    transform: L,
    exposure: L,
    gamma: L,
    saturation: L,
    tile_size: L,
    tiles_per_row: L,
}

/// Deletes stage objects when dropped; a linked program keeps its own copy.
struct StageSet<'d, D: GlDevice> {
    device: &'d D,
    shaders: Vec<D::Shader>,
}

impl<D: GlDevice> Drop for StageSet<'_, D> {
    fn drop(&mut self) {
        for shader in self.shaders.drain(..) {
            self.device.delete_shader(shader);
        }
    }
}

/// Deletes the program unless construction completes.
struct ProgramGuard<'d, D: GlDevice> {
    device: &'d D,
    program: D::Program,
    armed: bool,
}

impl<D: GlDevice> ProgramGuard<'_, D> {
    fn release(mut self) -> D::Program {
        self.armed = false;
        self.program
    }
}

impl<D: GlDevice> Drop for ProgramGuard<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            self.device.delete_program(self.program);
        }
    }
}

/// Shader program for meshes textured with a per-face ptex atlas.
///
/// The program is compiled, linked and has its sampler units assigned inside
/// [`new`](Self::new); a value of this type is always ready to draw with.
/// Per-draw state is set through chainable setters:
///
/// ```no_run
/// # use ptex_engine::coords::Mat4;
/// # use ptex_engine::device::{GlowDevice, GlowTexture};
/// # use ptex_engine::render::ptex::PtexMeshShader;
/// # fn demo(
/// #     device: GlowDevice,
/// #     atlas: GlowTexture,
/// #     adjacency: GlowTexture,
/// # ) -> Result<(), ptex_engine::render::ptex::ShaderError> {
/// let mut shader = PtexMeshShader::new(device)?;
/// shader
///     .set_exposure(1.0)
///     .set_gamma(2.2)
///     .set_saturation(1.0)
///     .set_atlas_texture_size(&atlas, 256)
///     .bind_atlas_texture(&atlas)
///     .bind_adjacency_texture(&adjacency)
///     .set_transform(&Mat4::IDENTITY);
/// // ...issue the draw call...
/// # Ok(())
/// # }
/// ```
///
/// Textures are only borrowed for the call; the shader never owns them.
/// Texture units and uniform values are GL-global state, so anything else
/// using the same context between these calls and the draw overrides them.
pub struct PtexMeshShader<D: GlDevice> {
    device: D,
    program: D::Program,
    uniforms: UniformCache<D::UniformLocation>,
}

impl<D: GlDevice> PtexMeshShader<D> {
    /// Builds the program from the default shader bundle.
    pub fn new(device: D) -> Result<Self> {
        Self::with_init(device, PtexShaderInit::default())
    }

    /// Builds the program from the sources named by `init`.
    ///
    /// Compilation is synchronous; call this outside per-frame code.
    pub fn with_init(device: D, init: PtexShaderInit) -> Result<Self> {
        let found = device.version();
        if !found.supports(MIN_GL_VERSION) {
            return Err(ShaderError::UnsupportedDevice { required: MIN_GL_VERSION, found });
        }

        ensure_resources_registered(init.bundle)?;
        let rs = Resource::open(init.bundle.group())?;

        const STAGES: [ShaderStage; 3] =
            [ShaderStage::Vertex, ShaderStage::Geometry, ShaderStage::Fragment];

        let mut sources = Vec::with_capacity(STAGES.len());
        for stage in STAGES {
            let name = format!("{}.{}", init.variant, stage.extension());
            sources.push((stage, rs.get(&name)?));
        }

        let mut stages = StageSet { device: &device, shaders: Vec::with_capacity(STAGES.len()) };
        for (stage, source) in sources {
            let shader = device
                .create_shader(stage)
                .map_err(|log| ShaderError::Compile { stage, log })?;
            stages.shaders.push(shader);
            device
                .compile_shader(shader, source)
                .map_err(|log| ShaderError::Compile { stage, log })?;
            log::debug!("compiled {stage} shader `{}.{}`", init.variant, stage.extension());
        }

        let program = device.create_program().map_err(|log| ShaderError::Link { log })?;
        let guard = ProgramGuard { device: &device, program, armed: true };

        for &shader in &stages.shaders {
            device.attach_shader(program, shader);
        }
        device.link_program(program).map_err(|log| ShaderError::Link { log })?;
        drop(stages);

        let locate = |name: &str| {
            device.uniform_location(program, name).ok_or_else(|| ShaderError::Link {
                log: format!("uniform `{name}` is not active in `{}`", init.variant),
            })
        };

        let uniforms = UniformCache {
            transform: locate(U_TRANSFORM)?,
            exposure: locate(U_EXPOSURE)?,
            gamma: locate(U_GAMMA)?,
            saturation: locate(U_SATURATION)?,
            tile_size: locate(U_TILE_SIZE)?,
            tiles_per_row: locate(U_TILES_PER_ROW)?,
        };
        let atlas_sampler = locate(U_ATLAS_SAMPLER)?;
        let adjacency_sampler = locate(U_ADJACENCY_SAMPLER)?;

        device.use_program(program);
        device.set_uniform_i32(&atlas_sampler, TextureSlot::Atlas as i32);
        device.set_uniform_i32(&adjacency_sampler, TextureSlot::Adjacency as i32);

        let program = guard.release();
        log::debug!("linked ptex program `{}` ({found})", init.variant);

        Ok(Self { device, program, uniforms })
    }

    /// The linked program, for issuing draw calls.
    #[inline]
    pub fn program(&self) -> D::Program {
        self.program
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Makes the program current so uniform uploads land in it.
    fn current(&self) -> &D {
        self.device.use_program(self.program);
        &self.device
    }

    /// Binds the atlas to [`TextureSlot::Atlas`].
    pub fn bind_atlas_texture(&mut self, texture: &D::Texture) -> &mut Self {
        self.device
            .bind_texture(TextureSlot::Atlas.unit(), TextureTarget::Texture2d, *texture);
        self
    }

    /// Binds the face-adjacency buffer texture to [`TextureSlot::Adjacency`].
    pub fn bind_adjacency_texture(&mut self, texture: &D::Texture) -> &mut Self {
        self.device
            .bind_texture(TextureSlot::Adjacency.unit(), TextureTarget::Buffer, *texture);
        self
    }

    /// Uploads the model-view-projection matrix.
    pub fn set_transform(&mut self, matrix: &Mat4) -> &mut Self {
        self.current().set_uniform_mat4(&self.uniforms.transform, matrix.as_array());
        self
    }

    pub fn set_exposure(&mut self, exposure: f32) -> &mut Self {
        self.current().set_uniform_f32(&self.uniforms.exposure, exposure);
        self
    }

    pub fn set_gamma(&mut self, gamma: f32) -> &mut Self {
        self.current().set_uniform_f32(&self.uniforms.gamma, gamma);
        self
    }

    pub fn set_saturation(&mut self, saturation: f32) -> &mut Self {
        self.current().set_uniform_f32(&self.uniforms.saturation, saturation);
        self
    }

    /// Uploads `tile_size` and the tiles-per-row count derived from the
    /// atlas base-level width.
    ///
    /// The texture must be allocated. `tile_size` should be non-zero and
    /// divide the width; otherwise the derived count is floored (zero for a
    /// zero tile size) and the draw samples whatever that layout addresses.
    pub fn set_atlas_texture_size(&mut self, texture: &D::Texture, tile_size: u32) -> &mut Self {
        let width = u32::try_from(self.device.texture_width(*texture, 0)).unwrap_or(0);
        let geometry = AtlasGeometry::from_width(width, tile_size);

        if tile_size == 0 {
            log::warn!("ptex tile size is zero; uploading widthInTiles = 0");
        } else if width % tile_size != 0 {
            log::debug!("atlas width {width} is not a multiple of tile size {tile_size}");
        }

        let device = self.current();
        device.set_uniform_i32(&self.uniforms.tile_size, gl_int(geometry.tile_size));
        device.set_uniform_i32(&self.uniforms.tiles_per_row, gl_int(geometry.tiles_per_row));
        self
    }
}

impl<D: GlDevice> Drop for PtexMeshShader<D> {
    fn drop(&mut self) {
        self.device.delete_program(self.program);
    }
}

/// GLSL `int` uniforms are signed; saturate instead of wrapping.
#[inline]
fn gl_int(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use ptex_resources::BundleFile;

    use super::*;
    use crate::device::{HeadlessDevice, UniformValue};

    const VERT: &[u8] = include_bytes!("shaders/ptex-default-gl410.vert");
    const GEOM: &[u8] = include_bytes!("shaders/ptex-default-gl410.geom");
    const FRAG: &[u8] = include_bytes!("shaders/ptex-default-gl410.frag");

    static CORRUPT: Bundle = Bundle::new(
        "test-ptex-corrupt",
        &[
            BundleFile::new("t.vert", VERT),
            BundleFile::new("t.geom", &[0xc3, 0x28]),
            BundleFile::new("t.frag", FRAG),
        ],
    );

    static NO_GEOMETRY: Bundle = Bundle::new(
        "test-ptex-no-geometry",
        &[BundleFile::new("t.vert", VERT), BundleFile::new("t.frag", FRAG)],
    );

    static BROKEN_FRAGMENT: Bundle = Bundle::new(
        "test-ptex-broken-fragment",
        &[
            BundleFile::new("t.vert", VERT),
            BundleFile::new("t.geom", GEOM),
            BundleFile::new("t.frag", b"#version 410 core\nuniform float exposure;\n"),
        ],
    );

    static NO_SATURATION: Bundle = Bundle::new(
        "test-ptex-no-saturation",
        &[
            BundleFile::new("t.vert", VERT),
            BundleFile::new("t.geom", GEOM),
            BundleFile::new(
                "t.frag",
                b"#version 410 core
uniform sampler2D atlasTex;
uniform isamplerBuffer meshAdjFaces;
uniform int tileSize;
uniform int widthInTiles;
uniform float exposure;
uniform float gamma;
out vec4 color;
void main() { color = vec4(exposure * gamma); }
",
            ),
        ],
    );

    fn init(bundle: &'static Bundle) -> PtexShaderInit {
        PtexShaderInit { bundle, variant: "t" }
    }

    fn device() -> HeadlessDevice {
        HeadlessDevice::new(GlVersion::GL410)
    }

    fn shader(dev: &HeadlessDevice) -> PtexMeshShader<HeadlessDevice> {
        PtexMeshShader::new(dev.clone()).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn two_instances_are_independent() {
        let dev = device();
        let a = shader(&dev);
        let b = shader(&dev);

        assert_ne!(a.program(), b.program());
        assert_ne!(a.uniforms.transform, b.uniforms.transform);
        assert_ne!(a.uniforms.tiles_per_row, b.uniforms.tiles_per_row);
        assert_eq!(dev.live_programs(), 2);
        assert!(ptex_resources::has_group(super::super::SHADER_GROUP));
    }

    #[test]
    fn stage_objects_released_after_link() {
        let dev = device();
        let _s = shader(&dev);
        assert_eq!(dev.live_shaders(), 0);
        assert_eq!(dev.compile_calls(), 3);
        assert!(dev.errors().is_empty());
    }

    #[test]
    fn sampler_units_uploaded_once() {
        let dev = device();
        let mut s = shader(&dev);
        let atlas = dev.create_texture_2d(512, 512);
        s.set_atlas_texture_size(&atlas, 128).bind_atlas_texture(&atlas).set_exposure(1.0);

        let p = s.program();
        assert_eq!(dev.uniform(p, "atlasTex"), Some(UniformValue::Int(0)));
        assert_eq!(dev.uniform(p, "meshAdjFaces"), Some(UniformValue::Int(1)));
        assert_eq!(dev.upload_count(p, "atlasTex"), 1);
        assert_eq!(dev.upload_count(p, "meshAdjFaces"), 1);
    }

    #[test]
    fn drop_deletes_program() {
        let dev = device();
        drop(shader(&dev));
        assert_eq!(dev.live_programs(), 0);
    }

    #[test]
    fn old_context_rejected_before_compiling() {
        let dev = HeadlessDevice::new(GlVersion::GL330);
        let err = PtexMeshShader::new(dev.clone()).err().unwrap();
        assert!(matches!(
            err,
            ShaderError::UnsupportedDevice { found: GlVersion::GL330, required: MIN_GL_VERSION }
        ));
        assert_eq!(dev.compile_calls(), 0);
        assert_eq!(dev.live_shaders() + dev.live_programs(), 0);
    }

    #[test]
    fn embedded_context_rejected() {
        let dev = HeadlessDevice::new(GlVersion::embedded(3, 2));
        assert!(matches!(
            PtexMeshShader::new(dev),
            Err(ShaderError::UnsupportedDevice { .. })
        ));
    }

    #[test]
    fn corrupt_bundle_is_missing_resource() {
        let dev = device();
        let err = PtexMeshShader::with_init(dev.clone(), init(&CORRUPT)).err().unwrap();
        assert!(matches!(err, ShaderError::MissingResource(_)));
        assert!(!ptex_resources::has_group("test-ptex-corrupt"));
        assert_eq!(dev.compile_calls(), 0);
        assert_eq!(dev.live_programs(), 0);

        // Deterministic: the same bundle fails the same way again.
        let again = PtexMeshShader::with_init(dev, init(&CORRUPT)).err().unwrap();
        assert_eq!(again.to_string(), err.to_string());
    }

    #[test]
    fn missing_stage_source_is_missing_resource() {
        let dev = device();
        let err = PtexMeshShader::with_init(dev.clone(), init(&NO_GEOMETRY)).err().unwrap();
        assert!(err.to_string().contains("t.geom"), "{err}");
        assert_eq!(dev.compile_calls(), 0);
    }

    #[test]
    fn compile_error_names_stage() {
        let dev = device();
        let err = PtexMeshShader::with_init(dev.clone(), init(&BROKEN_FRAGMENT)).err().unwrap();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("main"), "{log}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(dev.live_shaders(), 0);
        assert_eq!(dev.live_programs(), 0);
    }

    #[test]
    fn missing_uniform_fails_link() {
        let dev = device();
        let err = PtexMeshShader::with_init(dev.clone(), init(&NO_SATURATION)).err().unwrap();
        assert!(matches!(&err, ShaderError::Link { log } if log.contains("saturation")));
        assert_eq!(dev.live_programs(), 0);
    }

    // ── binding protocol ──────────────────────────────────────────────────

    #[test]
    fn tiles_per_row_exact() {
        let dev = device();
        let mut s = shader(&dev);
        let atlas = dev.create_texture_2d(2048, 2048);
        s.set_atlas_texture_size(&atlas, 256);

        assert_eq!(dev.uniform(s.program(), "tileSize"), Some(UniformValue::Int(256)));
        assert_eq!(dev.uniform(s.program(), "widthInTiles"), Some(UniformValue::Int(8)));
    }

    #[test]
    fn tiles_per_row_floors() {
        let dev = device();
        let mut s = shader(&dev);
        let atlas = dev.create_texture_2d(2047, 2048);
        s.set_atlas_texture_size(&atlas, 256);

        assert_eq!(dev.uniform(s.program(), "widthInTiles"), Some(UniformValue::Int(7)));
    }

    #[test]
    fn size_query_keeps_atlas_slot() {
        let dev = device();
        let mut s = shader(&dev);
        let bound = dev.create_texture_2d(2048, 2048);
        let measured = dev.create_texture_2d(1024, 1024);

        s.bind_atlas_texture(&bound).set_atlas_texture_size(&measured, 256);

        assert_eq!(dev.bound_texture(0), Some((TextureTarget::Texture2d, bound)));
        assert_eq!(dev.uniform(s.program(), "widthInTiles"), Some(UniformValue::Int(4)));
    }

    #[test]
    fn zero_tile_size_uploads_zero() {
        let dev = device();
        let mut s = shader(&dev);
        let atlas = dev.create_texture_2d(1024, 1024);
        s.set_atlas_texture_size(&atlas, 0);

        assert_eq!(dev.uniform(s.program(), "tileSize"), Some(UniformValue::Int(0)));
        assert_eq!(dev.uniform(s.program(), "widthInTiles"), Some(UniformValue::Int(0)));
    }

    #[test]
    fn slots_independent_of_bind_order() {
        let dev = device();
        let mut s = shader(&dev);
        let atlas = dev.create_texture_2d(1024, 1024);
        let adjacency = dev.create_buffer_texture(64);

        s.bind_adjacency_texture(&adjacency).bind_atlas_texture(&atlas);

        assert_eq!(dev.bound_texture(0), Some((TextureTarget::Texture2d, atlas)));
        assert_eq!(dev.bound_texture(1), Some((TextureTarget::Buffer, adjacency)));
        assert!(dev.errors().is_empty());
    }

    #[test]
    fn tone_map_uniforms_are_independent() {
        let dev = device();
        let mut s = shader(&dev);
        s.set_exposure(1.5).set_gamma(2.2).set_saturation(0.8);
        s.set_exposure(0.5);

        let p = s.program();
        assert_eq!(dev.uniform(p, "exposure"), Some(UniformValue::Float(0.5)));
        assert_eq!(dev.uniform(p, "gamma"), Some(UniformValue::Float(2.2)));
        assert_eq!(dev.uniform(p, "saturation"), Some(UniformValue::Float(0.8)));
    }

    #[test]
    fn transform_uploads_column_major() {
        let dev = device();
        let mut s = shader(&dev);
        let m = Mat4::translation(1.0, 2.0, 3.0);
        s.set_transform(&m);

        assert_eq!(dev.uniform(s.program(), "MVP"), Some(UniformValue::Mat4(*m.as_array())));
    }

    #[test]
    fn setters_target_own_program_after_another_was_used() {
        let dev = device();
        let mut a = shader(&dev);
        let mut b = shader(&dev);

        a.set_gamma(1.0);
        b.set_gamma(2.0);
        a.set_exposure(3.0);

        assert_eq!(dev.uniform(a.program(), "gamma"), Some(UniformValue::Float(1.0)));
        assert_eq!(dev.uniform(b.program(), "gamma"), Some(UniformValue::Float(2.0)));
        assert_eq!(dev.uniform(b.program(), "exposure"), None);
        assert!(dev.errors().is_empty());
    }
}
