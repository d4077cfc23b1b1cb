//! Segretario DVR - merges per-turn risk extractions from a dictated workplace
//! inspection into one cumulative report.

pub mod adapter;
pub mod api_types;
pub mod config;
pub mod console;
pub mod error;
pub mod extract;
pub mod image;
pub mod merge;
pub mod models;
pub mod photo;
pub mod render;
pub mod replay;
pub mod report;
pub mod session;

pub use error::TurnError;
pub use models::{ExtractionBatch, ReportState};
pub use report::apply_turn;
pub use session::Session;
