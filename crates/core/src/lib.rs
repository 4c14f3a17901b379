//! Domain logic for scriptd.
//!
//! Everything here is free of HTTP and SQL: the script execution core talks
//! to durable storage only through the [`scripting::store::ScriptStore`]
//! trait, so it can be exercised against the in-memory store in tests.

pub mod error;
pub mod scripting;
pub mod types;
