#![deny(unsafe_code)]

/// Application shell that gates the chat behind the login view.
pub mod app;
/// Chat view, transcript domain model and related components.
pub mod chat;
pub mod config;
/// Login session lifecycle and conversation identity.
pub mod session;
