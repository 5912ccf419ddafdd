// Library entry point for pixel-gallery
// Exposes modules for testing

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod negotiation;
pub mod pagination;
pub mod projector;
pub mod store;
pub mod validate;
