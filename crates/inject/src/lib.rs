//! `dupforge-inject`: synthetic invoice-duplicate injection engine.
//!
//! Pure engine crate: loads an invoice table, injects five labeled duplicate
//! archetypes, writes the labeled table back out. No CLI or network
//! dependencies.

pub mod cases;
pub mod date;
pub mod error;
pub mod inject;
pub mod model;
pub mod summary;
pub mod table;

pub use cases::DuplicateCase;
pub use error::InjectError;
pub use inject::{inject_anomalies, sample_size, DEFAULT_RATE};
pub use model::{InvoiceRecord, InvoiceTable, Label, Schema};
pub use summary::LabelSummary;
