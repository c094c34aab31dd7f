/// Layout of square per-face tiles packed row-major into an atlas texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AtlasGeometry {
    /// Texels per tile edge.
    pub tile_size: u32,
    /// Tiles in one atlas row.
    pub tiles_per_row: u32,
}

impl AtlasGeometry {
    /// Derives the layout from the atlas base-level width.
    ///
    /// `tiles_per_row` is `floor(width / tile_size)`. A zero tile size yields
    /// zero tiles per row instead of dividing by zero.
    pub fn from_width(width: u32, tile_size: u32) -> Self {
        Self {
            tile_size,
            tiles_per_row: width.checked_div(tile_size).unwrap_or(0),
        }
    }

    /// Texel origin of `face`'s tile; the fragment shader performs the same
    /// lookup from `gl_PrimitiveID`.
    ///
    /// Returns `None` when the layout holds no tiles.
    pub fn tile_origin(&self, face: u32) -> Option<[u32; 2]> {
        if self.tiles_per_row == 0 {
            return None;
        }
        let col = face % self.tiles_per_row;
        let row = face / self.tiles_per_row;
        Some([col * self.tile_size, row * self.tile_size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_division() {
        assert_eq!(AtlasGeometry::from_width(2048, 256).tiles_per_row, 8);
    }

    #[test]
    fn remainder_is_floored() {
        assert_eq!(AtlasGeometry::from_width(2047, 256).tiles_per_row, 7);
        assert_eq!(AtlasGeometry::from_width(255, 256).tiles_per_row, 0);
    }

    #[test]
    fn zero_tile_size_does_not_panic() {
        let g = AtlasGeometry::from_width(2048, 0);
        assert_eq!(g.tiles_per_row, 0);
        assert_eq!(g.tile_origin(3), None);
    }

    #[test]
    fn tile_origin_wraps_rows() {
        let g = AtlasGeometry::from_width(1024, 256);
        assert_eq!(g.tile_origin(0), Some([0, 0]));
        assert_eq!(g.tile_origin(3), Some([768, 0]));
        assert_eq!(g.tile_origin(4), Some([0, 256]));
        assert_eq!(g.tile_origin(9), Some([256, 512]));
    }
}
