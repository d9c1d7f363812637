//! Stanzle client core: daily/unlimited writing-prompt game flow against the
//! Stanzle backend, with local fallbacks when the backend is unreachable.

pub mod telemetry;
pub mod util;
pub mod error;
pub mod domain;
pub mod config;
pub mod seeds;
pub mod protocol;
pub mod api;
pub mod store;
pub mod cache;
pub mod archive;
pub mod challenge;
pub mod session;
pub mod gate;
pub mod scoring;
pub mod controller;
