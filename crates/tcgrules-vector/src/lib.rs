#![deny(warnings)]
#![deny(unused_imports)]

pub mod format;
pub mod ingest;
pub mod service;
pub mod store;

pub use ingest::{IngestReport, Ingestor};
pub use service::{RetrievalService, Status};
pub use store::{IndexEntry, IndexStore};
