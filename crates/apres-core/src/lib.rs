//! apres-core - Wire models for the ApRES radar HTTP control API
//!
//! This crate holds the documents exchanged between an ApRES device (or the
//! simulator in `apres-sim`) and the typed client in `apres-client`:
//! radar chirp configuration, burst results, housekeeping status, data file
//! listings and the JSON error envelope.

pub mod envelope;
pub mod error;
pub mod models;
pub mod paths;
pub mod timestamp;

pub use envelope::ErrorEnvelope;
pub use error::ModelError;
pub use models::*;
pub use timestamp::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
