//! Core pipeline orchestration and domain logic for BrandScout.
//!
//! This crate ties together enrichment, logo discovery, and catalog
//! persistence into the end-to-end `run` workflow ([`pipeline::run_pipeline`]).

pub mod catalog;
pub mod llm;
pub mod pipeline;
pub mod providers;

pub use catalog::{Catalog, backup_path};
pub use llm::ChatClient;
pub use pipeline::{
    ProgressReporter, RecordStatus, RunOptions, RunSummary, SilentProgress, local_path,
    run_pipeline,
};
pub use providers::Enricher;
