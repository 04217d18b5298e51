//! Mutation-based bug reproduction over control-flow automata.
//!
//! This crate wires together the budget controller ([`cfa_budget`]),
//! structural checker and graph model ([`cfa_graph`]), outcome classifier
//! ([`cfa_classify`]), verifier adapter ([`cfa_verifier`]), counterexample
//! restorer ([`cfa_restore`]), feasibility rechecker ([`cfa_feasibility`]),
//! and CFA mutator ([`cfa_mutator`]) into the driver state machine in
//! [`driver`].

pub mod config;
pub mod driver;

pub use config::{ConfigError, DriverConfig};
pub use driver::{DriverOutcome, ExitStatus, MutationDriver, Phase};

/// Installs a `tracing-subscriber` formatter reading its filter from
/// `RUST_LOG`, defaulting to `info`. Intended for the CLI binary; library
/// consumers embedding this crate are expected to configure their own
/// subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).try_init().ok();
}
