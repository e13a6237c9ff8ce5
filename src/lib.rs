//! hippo - Terminal triage for Azure DevOps work items
//!
//! This library crate exposes internal modules for integration testing.

pub mod auth;
pub mod backend;
pub mod config;
pub mod data;
pub mod tui;
pub mod util;
