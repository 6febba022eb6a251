//! # Safe Scan
//!
//! A thin browser-facing proxy for a malware-scanning API.
//!
//! Visitors submit a URL or a file; Safe Scan forwards it to the scanning
//! service with the server-held API key, polls the resulting analysis with
//! backoff, and formats the outcome into a verdict with per-category
//! percentages. It also keeps a visit counter and stores free-text feedback.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Browser  │──▶│  HTTP proxy  │──▶│   Scanning   │
//! │ / CLI    │   │  (axum)      │   │   service    │
//! └──────────┘   └──────┬───────┘   └──────────────┘
//!                       │
//!           ┌───────────┴───────────┐
//!           ▼                       ▼
//!     ┌───────────┐          ┌─────────────┐
//!     │ Feedback  │          │   Visit     │
//!     │ (JSONL)   │          │  counter    │
//!     └───────────┘          │ (SQLite)    │
//!                            └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export VIRUSTOTAL_API_KEY=...
//! safe-scan init
//! safe-scan scan url https://example.com
//! safe-scan scan file ./suspicious.pdf --details
//! safe-scan serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`scanner`] | Scanning service HTTP client |
//! | [`poller`] | Async poll loop with backoff |
//! | [`render`] | Terminal rendering of reports |
//! | [`feedback_file`] | JSON-lines feedback store |
//! | [`sqlite_counter`] | SQLite visit counter |
//! | [`stores`] | Store selection from config |
//! | [`server`] | HTTP proxy server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! Pure logic (request validation, report formatting, the poll state
//! machine, store traits) lives in the `safe-scan-core` crate.

pub mod config;
pub mod counter_cmd;
pub mod db;
pub mod feedback_cmd;
pub mod feedback_file;
pub mod init_cmd;
pub mod logging;
pub mod migrate;
pub mod poller;
pub mod render;
pub mod scan_cmd;
pub mod scanner;
pub mod server;
pub mod sqlite_counter;
pub mod stores;
