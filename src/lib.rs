//! Workspace root crate.
//!
//! This crate carries no code of its own; it exists so the workspace root
//! has dev-dependencies (git hooks) without requiring every consumer to
//! depend on a specific member crate. See the `crates/` directory for the
//! actual Companion Protocol implementation.
