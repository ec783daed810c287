//! # Coil Lookup
//!
//! Loads a coil spreadsheet from a remote URL or a local file, keeps the last
//! successful load in a durable cache, and answers exact-match lookups and
//! autocomplete queries on the `MILL COIL NO` column.
//!
//! ## Features
//!
//! - **Two sources**: HTTP(S) download with cache busting, or a local `.xlsx` file
//! - **Offline start**: the last load is restored from an embedded DuckDB cache
//! - **Forgiving keys**: lookups ignore case and surrounding whitespace
//! - **Suggestions**: substring (or prefix) matches, capped at a configurable limit
//! - **Scan input**: scanned codes go through the same lookup path as typed ones
//! - **Export**: the live dataset can be written back out as a single-sheet workbook
//!
//! ## Example
//!
//! ```no_run
//! use coil_lookup::Config;
//! use coil_lookup::LoaderSession;
//!
//! let mut session = LoaderSession::from_config(Config::default())?;
//! println!("{}", session.startup());
//! if let Some(row) = session.lookup("c101") {
//!     println!("{}", coil_lookup::format_row(row));
//! }
//! # Ok::<(), coil_lookup::LookupError>(())
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
mod helpers;
pub mod lookup;
pub mod session;
pub mod source;
pub mod spreadsheet;

pub use crate::cache::CacheStore;
pub use crate::cache::DuckDbCacheStore;
pub use crate::config::Config;
pub use crate::dataset::CellValue;
pub use crate::dataset::Dataset;
pub use crate::dataset::Row;
pub use crate::dataset::SourceKind;
pub use crate::error::ErrorKind;
pub use crate::error::LookupError;
pub use crate::lookup::LookupEngine;
pub use crate::lookup::MatchPolicy;
pub use crate::session::format_row;
pub use crate::session::LineScanner;
pub use crate::session::LoadStatus;
pub use crate::session::LoaderSession;
pub use crate::session::ScanInput;
pub use crate::source::DatasetSource;
pub use crate::source::HttpSource;
