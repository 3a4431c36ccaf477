//! Shared types for the gazetteer client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
