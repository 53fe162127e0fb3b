//! Core types for the gridlock deadlock demonstration.
//!
//! This crate provides the foundational types shared by the supervisor
//! runtime and the command-line binary:
//!
//! - **Identifiers**: [`WorkerId`], [`ResourceId`] and the fixed
//!   acquisition order that produces the lock-order inversion
//! - **Mode**: the unsafe / safe / race scenario policies and the
//!   command-line argument matching rules
//! - **Configuration**: [`SupervisorConfig`] timing knobs
//!
//! # Design Philosophy
//!
//! This crate is self-contained with no dependencies. It does not depend
//! on any other workspace crate, making it the foundation layer: pure
//! data, no async, no I/O.

mod config;
mod identifiers;
mod mode;

pub use config::SupervisorConfig;
pub use identifiers::{ResourceId, WorkerId};
pub use mode::Mode;
