//! Fetches Yogyakarta open datasets and renders them as paginated,
//! bordered table reports.
//!
//! ```no_run
//! use jogja_report::{csv, Renderer, SvgWriter};
//!
//! let table = csv::load("hotspot_data.csv").unwrap();
//! let document = Renderer::default()
//!     .render(table, "Data from hotspot_data.csv")
//!     .unwrap();
//! SvgWriter::new()
//!     .write(&document, std::path::Path::new("."), "hotspot_data")
//!     .unwrap();
//! ```

pub mod config;
pub mod csv;
mod error;
pub mod fetch;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod table;

pub use config::{Config, ConfigError, Dataset};
pub use error::{OutputError, ReportError};
pub use fetch::{Fetch, FetchError, HttpFetcher, Source};
pub use layout::{ColumnLayout, PageBreakPolicy, PageGeometry, RenderPlan};
pub use output::SvgWriter;
pub use pipeline::{Pipeline, Summary};
pub use render::{Document, Page, Renderer, RowBox, RowStyle};
pub use table::{Cell, Table, PLACEHOLDER};
