//! Cinedex - movie catalog client
//!
//! This library crate exposes the application layer for integration testing:
//! authentication, poster uploads, view state and configuration. Storage and
//! the movie repository live in `cinedex-store`.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod images;
