// Copyright 2022 Oxide Computer Company

//! An engine for ingesting, validating and transforming GS1 barcode data
//! between bracketed AI element strings, unbracketed AI data with FNC1
//! separators, and GS1 Digital Link URIs.

pub mod ai;
mod aitable;
mod dl;
mod elements;
pub mod engine;
pub mod error;
pub mod lint;
pub mod validate;

pub use engine::Engine;
pub use error::{ErrorKind, Gs1Error};
