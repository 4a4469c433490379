//! HTTP server for DCF Merge.
//!
//! `POST /upload` takes a multipart form with a required `consensus` file and
//! an optional `profile` file, merges them with the template's "DCF Model"
//! sheet and answers with the merged workbook as an attachment. Client faults
//! come back as `400 {"detail": ...}`, everything else as `500`.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::DcfMergeServer;
pub use state::AppState;
