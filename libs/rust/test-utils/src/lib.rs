//! Shared test utilities for the admin client.
//!
//! This crate provides:
//! - Scripted transport, recording notifier and counting session store
//! - Envelope fixtures in the admin API's wire shape
//! - Proptest generators for status codes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{MockSessionStore, RecordingNotifier, ScriptedTransport};
