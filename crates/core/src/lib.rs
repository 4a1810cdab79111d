//! Core business logic for emporium.

pub mod services;

pub use services::export::*;
