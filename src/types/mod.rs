//! Canonical, provider-independent types.

pub mod delta;
pub mod generation;
pub mod message;
pub mod usage;

pub use delta::*;
pub use generation::*;
pub use message::*;
pub use usage::*;
