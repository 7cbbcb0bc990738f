//! # Fluxgate Core
//!
//! This crate is the authorization-gated execution pipeline of the platform.
//! It decides whether a caller may create, inspect or cancel a scheduled task
//! or execute a query, and wraps raw query execution with statistics,
//! logging and streamed encoding.
//!
//! The query compiler, the execution engine, task persistence and the
//! result formats are external collaborators. This crate only defines the
//! traits it consumes them through.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

#[cfg(test)]
mod mock;

pub mod buc;
pub mod cnf;
pub mod ctx;
pub mod doc;
pub mod err;
pub mod iam;
pub mod query;
pub mod task;
