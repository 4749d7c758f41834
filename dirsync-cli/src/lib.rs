//! Command line front end for dirsync.
//!
//! `main.rs` only parses arguments and installs logging; everything a
//! command does lives in [`commands`] so it can be driven from tests.

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Cli, Command};
