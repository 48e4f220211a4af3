//! Core orchestration layer for Studio Shell
//!
//! Loads the [`ShellConfig`] and assembles the window coordinator and the
//! extension installation engine into a [`Shell`].

pub mod config;
pub mod error;
pub mod startup;

pub use config::{CONFIG_FILENAME, ExtensionsSection, ShellConfig, WindowSection};
pub use error::{Error, Result};
pub use startup::{Shell, Startup};
