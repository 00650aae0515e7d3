//! Shared types, error model, and configuration for BrandScout.
//!
//! This crate is the foundation depended on by all other BrandScout crates.
//! It provides:
//! - [`BrandScoutError`] — the unified error type
//! - Domain types ([`OrganizationRecord`], [`EnrichmentOutcome`], [`CandidateSet`], [`ImageFormat`])
//! - Configuration ([`AppConfig`], [`EnrichConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EnrichConfig, HttpConfig, LlmConfig, ProviderKind, SearchConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_secret,
};
pub use error::{BrandScoutError, Result};
pub use types::{
    CandidateSet, EnrichmentOutcome, ImageCandidate, ImageFormat, LOGO_SITE_DIR,
    OrganizationRecord, RESERVED_PROFILE_SEGMENTS, is_icon_content_type, logo_site_path,
    normalize_handle, profile_url, slugify,
};
