use ptex_resources::{Bundle, BundleFile, ResourceError};

/// Logical group holding the packaged shader sources.
pub const SHADER_GROUP: &str = "default-shaders";

/// Shader variant built by default.
pub const DEFAULT_VARIANT: &str = "ptex-default-gl410";

/// Sources compiled into the binary.
pub static DEFAULT_SHADERS: Bundle = Bundle::new(
    SHADER_GROUP,
    &[
        BundleFile::new(
            "ptex-default-gl410.vert",
            include_bytes!("shaders/ptex-default-gl410.vert"),
        ),
        BundleFile::new(
            "ptex-default-gl410.geom",
            include_bytes!("shaders/ptex-default-gl410.geom"),
        ),
        BundleFile::new(
            "ptex-default-gl410.frag",
            include_bytes!("shaders/ptex-default-gl410.frag"),
        ),
    ],
);

/// Registers `bundle` with the process-wide registry if its group is absent.
///
/// Safe to call from every shader construction.
pub fn ensure_resources_registered(bundle: &'static Bundle) -> Result<(), ResourceError> {
    if ptex_resources::ensure_registered(bundle)? {
        log::debug!("registered resource group `{}`", bundle.group());
    }
    Ok(())
}
