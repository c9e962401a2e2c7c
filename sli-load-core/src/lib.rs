#![doc = "sli-load-core: core logic library for sli-load."]

//! Loads tabular data into a dataset of the analytics platform through its
//! Single Load Interface (SLI).
//!
//! The pipeline for one dataset:
//!   1. [`session`]: log in, obtain a security token, pick a working project
//!   2. [`manifest`]: download the dataset's SLI template and cache its manifest
//!   3. [`encode`]: render rows as CSV in manifest column order
//!   4. [`package`]: zip manifest and CSV into a load archive
//!   5. [`ingest`]: put the archive on the staging host and trigger the pull
//!
//! [`load::load_dataset`] runs all of it. Network access goes through the traits in
//! [`contract`]; the concrete clients live in the `sli-load` crate.

pub mod config;
pub mod contract;
pub mod encode;
pub mod error;
pub mod ingest;
pub mod load;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod package;
pub mod session;

pub use error::{Result, SliError, UploadStage};
