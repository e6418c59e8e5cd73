//! Prior Flux - Trial table builder for the motion-direction prior experiment
//!
//! Prior Flux turns the published raw trial CSV into an analysis-ready table
//! through a deterministic pipeline: column contract (rename, drop, parse) →
//! per-run lag features → circular relative angles and response errors →
//! projection onto the documented 24-column schema → validation.
//!
//! ## Modules
//!
//! - **Core**: `geometry`, `lag`, `features`, `schema`, `pipeline`
//! - **Collaborators**: `source` (HTTP/file/cached retrieval), `report` (text
//!   rendering), `encoder` (CSV and JSON output), `config`

pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod geometry;
pub mod lag;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod source;
pub mod types;

pub use config::PipelineConfig;
pub use error::ComputeError;
pub use pipeline::{process_csv, process_data, process_source, TrialProcessor};

// Schema exports
pub use schema::{ColumnCatalog, RawTable, RawTableAdapter, FINAL_COLUMNS, RAW_COLUMN_MAP};

// Collaborator exports
pub use source::{CachedSource, DataSource, FetchError, FileSource, HttpSource};

/// Version embedded in encoded payloads
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded payloads
pub const PRODUCER_NAME: &str = "prior-flux";
