//! Per-run artifact files.
//!
//! Every pipeline run owns a directory `<buffer_dir>/<run_id>/` holding:
//! - `document`: the staged input, written once by [`ArtifactStager`]
//! - `document<suffix>`: the scheduler's raw output (suffix defaults to `.xml`)
//! - `document.json`: the converter's output, read back by [`read_result`]
//!
//! Run ids are fresh UUIDs, so concurrent runs never share a path.

mod error;
mod layout;
mod reader;
mod stager;

pub use error::{ReadError, StagingError};
pub use layout::{new_run_id, RunArtifacts, CONVERTED_EXTENSION, STAGED_FILE_NAME};
pub use reader::{read_result, ResultPayload, JSON_CONTENT_TYPE};
pub use stager::{ArtifactStager, Document, DocumentStream, StagedArtifact};
