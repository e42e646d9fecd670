//! Upload → separation → download pipeline services

pub mod artifacts;
pub mod download;
pub mod sanitizer;
pub mod separation;
pub mod staging;

pub use artifacts::{ArtifactResolver, MissingOutput, StemPaths};
pub use download::{Artifact, DownloadError, DownloadRoot};
pub use separation::{SeparationError, SeparationInvoker, ToolOutput};
pub use staging::{StageError, StagingArea, ValidationError};
