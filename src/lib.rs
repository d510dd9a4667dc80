//! Reconcile vendor hardware lifecycle exports with per-node host_vars documents.
pub mod accounts;
pub mod config;
pub mod document;
pub mod editor;
pub mod export;
pub mod import;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod staging;
pub mod util;
