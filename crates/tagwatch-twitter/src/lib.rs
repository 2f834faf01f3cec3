//! Twitter filtered-stream client for tagwatch.
//!
//! Implements [`UpstreamSource`](tagwatch_moderation::UpstreamSource) on top
//! of the v2 filtered stream: opening a subscription replaces the stream's
//! rule set with a single rule for the watched tag (and language), then
//! connects to the long-lived newline-delimited JSON stream.

pub mod client;
pub mod config;
mod decode;

pub use client::{rule_for, FilteredStreamClient};
pub use config::TwitterConfig;
pub use decode::decode_line;
