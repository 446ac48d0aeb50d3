//! Core domain models for the SBOM pipeline
//!
//! This module defines configuration, typed versions, artifacts,
//! the pipeline state machine and the error taxonomy.

pub mod artifact;
pub mod config;
pub mod error;
pub mod state;
pub mod version;

pub use artifact::*;
pub use error::*;
pub use state::*;
pub use version::{Version, VersionRequirement};
