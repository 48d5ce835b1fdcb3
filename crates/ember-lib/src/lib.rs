//! Resolution, download and launch core for the Ember launcher.
//!
//! A run merges a target manifest with the base it inherits from, plans the files the
//! result needs on this platform, fetches and verifies them, unpacks natives, and
//! compiles the final Java command line.

pub mod error;
pub mod game;
pub mod utils;

pub use error::LaunchError;
