//! Job definitions.

#![allow(missing_docs)]

mod export;

pub use export::ExportMessage;
