//! Business logic services.

#![allow(missing_docs)]

pub mod export;
