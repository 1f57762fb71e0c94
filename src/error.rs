use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::csv::LoadError;
use crate::fetch::FetchError;

#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    #[error("could not load source table `{name}`")]
    #[diagnostic(
        code(jogja_report::missing_source),
        help("fetch the dataset first or check the CSV file")
    )]
    MissingSource {
        name: String,
        #[source]
        #[diagnostic_source]
        source: LoadError,
    },

    #[error("table `{0}` has no columns left to render")]
    #[diagnostic(
        code(jogja_report::empty_table),
        help("every column of the table is in the exclusion list")
    )]
    EmptyTable(String),

    #[error("invalid page geometry: {0}")]
    #[diagnostic(code(jogja_report::invalid_geometry))]
    InvalidGeometry(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Output(#[from] OutputError),
}

#[derive(Debug, Error, Diagnostic)]
pub enum OutputError {
    #[error("could not draw page {page}: {message}")]
    #[diagnostic(code(jogja_report::output::draw))]
    Draw { page: usize, message: String },

    #[error("could not write `{}`", path.display())]
    #[diagnostic(code(jogja_report::output::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
