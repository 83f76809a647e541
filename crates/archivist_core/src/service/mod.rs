//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep dispatcher/transport layers decoupled from storage details.

pub mod archive_service;
