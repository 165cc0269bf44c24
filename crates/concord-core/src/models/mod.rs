//! Data models for documents, backend results and ensemble output.

pub mod config;
pub mod document;
pub mod ensemble;
