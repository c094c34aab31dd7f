//! Ptex engine crate.
//!
//! GL device access plus the ptex mesh shader: program build, cached uniform
//! locations, fixed texture units and the per-draw setter chain.

pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
