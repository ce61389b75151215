//! hostfacts agent library - exposes modules for testing.

pub mod collector;
pub mod config;
pub mod facts_service;
pub mod logging;
