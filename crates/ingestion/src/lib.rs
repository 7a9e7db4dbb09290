//! Data ingestion and normalization for the finsight system.
//!
//! This crate handles:
//! - Raw `{date, close}` record parsing (JSON, CSV)
//! - Structural validation (`InvalidInput` on missing fields)
//! - Date ordering and duplicate-date resolution

pub mod record;
pub mod csv_reader;
pub mod normalizer;

pub use record::{parse_date, parse_json_records, validate, DateInput, RawPriceRecord};
pub use csv_reader::read_csv;
pub use normalizer::{normalize, normalize_bars, NormalizationStats, NormalizedSeries};
