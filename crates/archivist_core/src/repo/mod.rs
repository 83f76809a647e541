//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the archive data access contract.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes validate input before SQL mutations.
//! - Multi-step mutations (cascades, renames, restores) are transactional;
//!   no partially applied state is ever observable.
//! - Repository APIs return semantic errors (`DuplicateTitle`,
//!   `CardNotFound`, ...) in addition to DB transport errors.

pub mod archive_repo;
