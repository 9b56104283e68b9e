//! Dispatch engine for a remctl-style command-execution service: resolves a
//! caller's argument vector against a policy table, authorizes it, launches
//! the configured program, and drains its output back to the caller.
//!
//! This crate is transport-agnostic: it depends on `remctld-protocol`'s
//! `Transport`, `AclEvaluator`, and `CommandLogger` traits rather than any
//! concrete network stack, so it can be driven by a GSS-API server loop, a
//! test harness, or anything else that can produce a `Session` and an
//! argument vector.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod argv;
pub mod child;
pub mod dispatch;
pub mod error;
mod flags;
pub mod launch;
pub mod multiplex;
pub mod rules;

pub use dispatch::dispatch;
pub use error::DispatchError;
pub use error::Result;
