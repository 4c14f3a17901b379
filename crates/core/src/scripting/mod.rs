//! Asynchronous shell script execution and lifecycle coordination.
//!
//! The pieces, leaves first:
//!
//! - [`runner`] spawns one process per command and streams its output.
//! - [`aggregator`] batches that output and flushes it to a sink.
//! - [`registry`] maps execution IDs to live [`handle::ProcessHandle`]s.
//! - [`orchestrator`] ties them together with a [`store::ScriptStore`] and
//!   implements create / stop / get / delete.
//!
//! Process management is pure (no DB access); durable state is reached
//! only through the store trait.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod handle;
pub mod memory_store;
pub mod orchestrator;
pub mod registry;
pub mod runner;
pub mod store;
