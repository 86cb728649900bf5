//! Pure data types for objsh: values, type descriptors, the member model
//! and the adaptive object wrapper.
//!
//! This crate is a leaf dependency with no async runtime and no I/O. The
//! kernel streams [`ShellObject`]s between pipeline stages; hosts and
//! commands inspect them through the member collections defined here.

pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod member;
pub mod object;
pub mod record;
pub mod value;

// Flat re-exports for convenience
pub use descriptor::*;
pub use error::*;
pub use member::*;
pub use object::*;
pub use record::*;
pub use value::*;
