use crate::coords::Mat4;
use crate::device::GlDevice;

use super::shader::PtexMeshShader;

/// Tone-mapping parameters of one mesh.
///
/// There are no defaults: values come from the mesh data.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ToneMap {
    pub exposure: f32,
    pub gamma: f32,
    pub saturation: f32,
}

impl ToneMap {
    #[inline]
    pub const fn new(exposure: f32, gamma: f32, saturation: f32) -> Self {
        Self { exposure, gamma, saturation }
    }
}

/// One ptex submesh ready to draw: borrowed textures plus per-mesh parameters.
///
/// The textures belong to the mesh data and must outlive the drawable.
#[derive(Debug)]
pub struct PtexMeshDrawable<'t, D: GlDevice> {
    atlas: &'t D::Texture,
    adjacency: &'t D::Texture,
    tile_size: u32,
    tone: ToneMap,
}

impl<'t, D: GlDevice> PtexMeshDrawable<'t, D> {
    pub fn new(
        atlas: &'t D::Texture,
        adjacency: &'t D::Texture,
        tile_size: u32,
        tone: ToneMap,
    ) -> Self {
        Self { atlas, adjacency, tile_size, tone }
    }

    #[inline]
    pub fn tone(&self) -> ToneMap {
        self.tone
    }

    #[inline]
    pub fn set_tone(&mut self, tone: ToneMap) {
        self.tone = tone;
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Configures `shader` for this mesh, then calls `draw_mesh` with the
    /// device and program to issue the actual draw.
    ///
    /// The uploaded MVP is `projection * transformation`.
    pub fn draw<F>(
        &self,
        shader: &mut PtexMeshShader<D>,
        transformation: &Mat4,
        projection: &Mat4,
        draw_mesh: F,
    ) where
        F: FnOnce(&D, D::Program),
    {
        shader
            .set_exposure(self.tone.exposure)
            .set_gamma(self.tone.gamma)
            .set_saturation(self.tone.saturation)
            .set_atlas_texture_size(self.atlas, self.tile_size)
            .bind_atlas_texture(self.atlas)
            .bind_adjacency_texture(self.adjacency)
            .set_transform(&(*projection * *transformation));

        draw_mesh(shader.device(), shader.program());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GlVersion, HeadlessDevice, TextureTarget, UniformValue};

    #[test]
    fn draw_configures_then_calls_back() {
        let dev = HeadlessDevice::new(GlVersion::GL410);
        let mut shader = PtexMeshShader::new(dev.clone()).unwrap();
        let atlas = dev.create_texture_2d(4096, 4096);
        let adjacency = dev.create_buffer_texture(1024);

        let mesh = PtexMeshDrawable::<HeadlessDevice>::new(
            &atlas,
            &adjacency,
            512,
            ToneMap::new(1.25, 2.2, 0.9),
        );

        let projection = Mat4::scale(2.0, 2.0, 1.0);
        let model = Mat4::translation(1.0, 0.0, 0.0);

        let mut drawn = None;
        mesh.draw(&mut shader, &model, &projection, |d, program| {
            drawn = Some((d.current_program(), program));
        });

        let p = shader.program();
        assert_eq!(drawn, Some((Some(p), p)));
        assert_eq!(dev.uniform(p, "exposure"), Some(UniformValue::Float(1.25)));
        assert_eq!(dev.uniform(p, "gamma"), Some(UniformValue::Float(2.2)));
        assert_eq!(dev.uniform(p, "saturation"), Some(UniformValue::Float(0.9)));
        assert_eq!(dev.uniform(p, "tileSize"), Some(UniformValue::Int(512)));
        assert_eq!(dev.uniform(p, "widthInTiles"), Some(UniformValue::Int(8)));
        assert_eq!(dev.bound_texture(0), Some((TextureTarget::Texture2d, atlas)));
        assert_eq!(dev.bound_texture(1), Some((TextureTarget::Buffer, adjacency)));

        let mvp = projection * model;
        assert_eq!(mvp.get(0, 3), 2.0);
        assert_eq!(dev.uniform(p, "MVP"), Some(UniformValue::Mat4(*mvp.as_array())));
    }

    #[test]
    fn tone_persists_across_draws_until_changed() {
        let dev = HeadlessDevice::new(GlVersion::GL410);
        let mut shader = PtexMeshShader::new(dev.clone()).unwrap();
        let atlas = dev.create_texture_2d(256, 256);
        let adjacency = dev.create_buffer_texture(16);

        let mut mesh =
            PtexMeshDrawable::<HeadlessDevice>::new(&atlas, &adjacency, 64, ToneMap::new(1.0, 1.0, 1.0));
        mesh.draw(&mut shader, &Mat4::IDENTITY, &Mat4::IDENTITY, |_, _| {});

        mesh.set_tone(ToneMap::new(2.0, 1.0, 1.0));
        mesh.draw(&mut shader, &Mat4::IDENTITY, &Mat4::IDENTITY, |_, _| {});

        assert_eq!(dev.uniform(shader.program(), "exposure"), Some(UniformValue::Float(2.0)));
        assert_eq!(dev.upload_count(shader.program(), "exposure"), 2);
    }
}
