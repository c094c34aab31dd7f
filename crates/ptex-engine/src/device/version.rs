use core::fmt;

/// OpenGL context version as reported by the driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    /// OpenGL ES / WebGL context.
    pub embedded: bool,
}

impl GlVersion {
    pub const GL330: Self = Self::desktop(3, 3);
    pub const GL410: Self = Self::desktop(4, 1);
    pub const GL430: Self = Self::desktop(4, 3);

    #[inline]
    pub const fn desktop(major: u32, minor: u32) -> Self {
        Self { major, minor, embedded: false }
    }

    #[inline]
    pub const fn embedded(major: u32, minor: u32) -> Self {
        Self { major, minor, embedded: true }
    }

    /// Returns `true` if a context of this version can run code written for
    /// `required`. Embedded and desktop profiles never satisfy each other.
    #[inline]
    pub fn supports(self, required: GlVersion) -> bool {
        self.embedded == required.embedded
            && (self.major, self.minor) >= (required.major, required.minor)
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.embedded {
            write!(f, "OpenGL ES {}.{}", self.major, self.minor)
        } else {
            write!(f, "OpenGL {}.{}", self.major, self.minor)
        }
    }
}
