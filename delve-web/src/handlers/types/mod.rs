//! Type definitions for handlers
//!
//! This module contains all the request/response types used by the handlers.

pub mod common;
pub mod research;

pub use common::*;
pub use research::*;
