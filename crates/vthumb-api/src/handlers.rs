//! Request handlers.

pub mod diagnostics;
pub mod health;
pub mod thumbnails;

pub use diagnostics::*;
pub use health::*;
pub use thumbnails::*;
