//! Pure request routing helpers
//!
//! [`IntentRouter`] picks a transport from the raw instruction text and
//! [`PathNormalizer`] confines `path` parameters to the sandbox root.

mod intent;
mod sandbox;

pub use intent::{IntentRouter, Route};
pub use sandbox::{PathNormalizer, SandboxRoot};
