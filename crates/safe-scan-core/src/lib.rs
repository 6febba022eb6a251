//! # Safe Scan Core
//!
//! Runtime-free logic for Safe Scan: the error taxonomy, scan request
//! validation, analysis report parsing and formatting, the poll state
//! machine, and the feedback / visit counter store traits.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. The
//! `safe-scan` crate wires these pieces to the network and to disk.

pub mod error;
pub mod poll;
pub mod report;
pub mod request;
pub mod store;

pub use error::ScanError;
