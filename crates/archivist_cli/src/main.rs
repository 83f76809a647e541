//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `archivist_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("archivist_core version={}", archivist_core::core_version());
}
