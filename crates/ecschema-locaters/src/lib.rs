//! ecschema-locaters - Filesystem and in-memory schema locaters
//!
//! Implementations of the [`ecschema_core::SchemaLocater`] contract:
//!
//! - [`JsonFileLocater`] / [`XmlFileLocater`] scan search directories for
//!   version-stamped schema files (`Name.RR.WW.mm.ecschema.json|xml`)
//! - [`InMemoryLocater`] serves documents registered at run time, for tests
//!   and embedders that compile schemas into the binary
//!
//! Copyright (c) 2025 ecschema contributors
//! Licensed under the MIT or Apache-2.0 license

pub mod file;
pub mod memory;

pub use file::{JsonFileLocater, XmlFileLocater};
pub use memory::InMemoryLocater;
