//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep sessions, FFI and CLI layers decoupled from storage details.

pub mod note_service;
