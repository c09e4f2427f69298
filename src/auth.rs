//! Launch identifiers and secret wrappers.

pub mod id;
pub mod secret;

pub use id::*;
pub use secret::*;
