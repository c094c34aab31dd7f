//! GPU rendering subsystem.
//!
//! Renderers own their GL programs and receive every other resource
//! (textures, meshes) by reference from the caller.

pub mod ptex;
