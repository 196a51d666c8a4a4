//! Update resolution for plugins and themes
//!
//! Given a tracked component and its source (a JSON metadata endpoint or a
//! GitHub repository), decide whether a newer eligible version exists, where
//! its package lives, and cache the outcome with separate success and failure
//! TTLs.

pub mod cache;
pub mod component;
pub mod config;
pub mod engine;
pub mod events;
pub mod fetch;
pub mod logging;
pub mod metadata;
pub mod policy;
pub mod source;
pub mod version;
