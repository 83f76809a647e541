//! Core domain logic for the Archivist card archive.
//! This crate is the single source of truth for archive invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::card::{
    Card, CardDraft, CardId, CardPatch, CardValidationError, Section, UNKNOWN_AUTHOR,
};
pub use repo::archive_repo::{
    ArchiveRepository, ArchiveSnapshot, Relation, RepoError, RepoResult, SqliteArchiveRepository,
};
pub use search::relevance::{
    card_tokens, is_relevant, partial_similarity, tokenize, MIN_TERM_COVERAGE_PCT, MIN_TOKEN_SCORE,
};
pub use service::archive_service::{ArchiveService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
