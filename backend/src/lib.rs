//! Interior-design studio application layer

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Server-verified admin capability
pub mod admin;

/// Operator command line
pub mod cli;

/// Application context
pub mod state;

/// Environment, notices and shared types
pub mod types;
