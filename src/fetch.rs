//! Retrieval of dataset records from the public JSON APIs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::table::{Cell, Table};

pub const JOGJA_DATASTORE: &str = "https://dataset.jogjakota.go.id/api/3/action/datastore_search";
pub const PEERINGDB_IX: &str = "https://peeringdb.com/api/ix";

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("request to {url} failed")]
    #[diagnostic(code(jogja_report::fetch::request))]
    Request {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("could not decode the response from {url}")]
    #[diagnostic(code(jogja_report::fetch::decode))]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API request failed: {0}")]
    #[diagnostic(code(jogja_report::fetch::api))]
    Api(String),

    #[error("unexpected response format: {0}")]
    #[diagnostic(code(jogja_report::fetch::format))]
    UnexpectedFormat(String),

    #[error("could not save `{}`", path.display())]
    #[diagnostic(code(jogja_report::fetch::save))]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    /// A CKAN `datastore_search` action.
    Ckan {
        url: String,
        resource_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    /// A PeeringDB list endpoint.
    #[serde(rename = "peeringdb")]
    PeeringDb {
        url: String,
        #[serde(default)]
        query: BTreeMap<String, String>,
    },
}

impl Source {
    pub fn ckan(resource_id: impl Into<String>) -> Self {
        Self::Ckan {
            url: JOGJA_DATASTORE.to_string(),
            resource_id: resource_id.into(),
            limit: None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Ckan { url, .. } | Self::PeeringDb { url, .. } => url,
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        match self {
            Self::Ckan {
                resource_id, limit, ..
            } => {
                let mut query = vec![("resource_id".to_string(), resource_id.clone())];
                if let Some(limit) = limit {
                    query.push(("limit".to_string(), limit.to_string()));
                }
                query
            }
            Self::PeeringDb { query, .. } => query
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Extracts the record list out of a decoded response body.
    pub fn records(&self, mut body: Value) -> Result<Vec<Value>, FetchError> {
        match self {
            Self::Ckan { .. } => {
                if body.get("success").and_then(Value::as_bool) != Some(true) {
                    let reason = body
                        .get("error")
                        .map(Value::to_string)
                        .unwrap_or_else(|| String::from("no error given"));
                    return Err(FetchError::Api(reason));
                }
                match body.pointer_mut("/result/records").map(Value::take) {
                    Some(Value::Array(records)) => Ok(records),
                    _ => Err(FetchError::UnexpectedFormat(String::from(
                        "missing `result.records` array",
                    ))),
                }
            }
            Self::PeeringDb { .. } => match body {
                Value::Object(mut map) => match map.remove("data") {
                    Some(Value::Array(records)) => Ok(records),
                    _ => Err(FetchError::UnexpectedFormat(String::from(
                        "missing `data` array",
                    ))),
                },
                _ => Err(FetchError::UnexpectedFormat(String::from(
                    "body is not a JSON object",
                ))),
            },
        }
    }
}

/// Anything able to return the raw records of a [`Source`].
pub trait Fetch {
    fn fetch(&self, source: &Source) -> Result<Vec<Value>, FetchError>;
}

/// Blocking HTTP client. Requests are made once, without retry.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, source: &Source) -> Result<Vec<Value>, FetchError> {
        let url = source.url();
        let mut request = self.agent.get(url);
        for (key, value) in source.query() {
            request = request.query(&key, &value);
        }
        debug!(url, "requesting");

        let response = request.call().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source: Box::new(source),
        })?;
        let body: Value = response.into_json().map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;

        let records = source.records(body)?;
        info!(url, records = records.len(), "retrieved records");
        Ok(records)
    }
}

/// Builds a table out of JSON records. Columns appear in the order keys are
/// first seen across the records.
pub fn records_to_table(records: &[Value]) -> Result<Table, FetchError> {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        let Value::Object(map) = record else {
            return Err(FetchError::UnexpectedFormat(format!(
                "record is not an object: {record}"
            )));
        };
        for key in map.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut table = Table::new(columns.iter().copied());
    for record in records {
        let cells = columns
            .iter()
            .map(|column| record.get(*column).map(to_cell).unwrap_or(Cell::Absent))
            .collect();
        table
            .push_row(cells)
            .map_err(|err| FetchError::UnexpectedFormat(err.to_string()))?;
    }
    Ok(table)
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Absent,
        Value::String(text) => Cell::Text(text.clone()),
        Value::Number(number) => Cell::numeric(number.to_string()),
        other => Cell::Text(other.to_string()),
    }
}
