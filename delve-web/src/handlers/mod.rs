//! HTTP request handlers for the Delve web server

pub mod health;
pub mod research;
pub mod types;

pub use health::*;
pub use research::*;
pub use types::*;
