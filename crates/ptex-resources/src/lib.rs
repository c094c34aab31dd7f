//! Process-wide registry of packaged text resources.
//!
//! Resources are grouped under a logical name (for example `default-shaders`)
//! and addressed by fixed file names inside that group. A group is registered
//! at most once per process; later registrations of the same group are no-ops.
//!
//! # Quick start
//!
//! ```rust
//! use ptex_resources::{Bundle, BundleFile, Resource, ensure_registered};
//!
//! static DOCS: Bundle = Bundle::new(
//!     "doc-group",
//!     &[BundleFile::new("hello.txt", b"hello")],
//! );
//!
//! assert!(ensure_registered(&DOCS).unwrap());
//! assert!(!ensure_registered(&DOCS).unwrap());
//! assert_eq!(Resource::open("doc-group").unwrap().get("hello.txt").unwrap(), "hello");
//! ```

mod bundle;
mod error;
mod registry;

pub use bundle::{Bundle, BundleFile};
pub use error::ResourceError;
pub use registry::{Resource, ensure_registered, has_group};
