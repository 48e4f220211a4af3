//! Filesystem helpers for Studio Shell
//!
//! Provides locked atomic writes, the canonical checksum format and the
//! directory copy/swap primitives used when staging extension packages.

pub mod checksum;
pub mod dir;
pub mod error;
pub mod io;

pub use error::{Error, Result};
