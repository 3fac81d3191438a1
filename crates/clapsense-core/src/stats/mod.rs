//! Session statistics
//!
//! - `store`: metric history, clap counters and gesture events

pub mod store;
