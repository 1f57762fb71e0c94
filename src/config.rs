use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{Source, PEERINGDB_IX};
use crate::layout::{ColumnLayout, PageGeometry};
use crate::render::{Renderer, DEFAULT_TRUNCATE, EXCLUDED_COLUMNS};

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read configuration `{}`", path.display())]
    #[diagnostic(code(jogja_report::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(jogja_report::config::parse))]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(jogja_report::config::invalid))]
    Invalid(String),

    #[error("no dataset named `{0}`")]
    #[diagnostic(
        code(jogja_report::config::unknown_dataset),
        help("dataset names come from the `[[dataset]]` entries of the configuration")
    )]
    UnknownDataset(String),
}

/// One dataset: where it is fetched from and the CSV file it is kept in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    /// Relative paths are resolved against the output directory.
    pub csv: PathBuf,
    /// Whether `run` renders this dataset after fetching it.
    #[serde(default)]
    pub render: bool,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output_dir: PathBuf,
    pub truncate: usize,
    pub exclude: Vec<String>,
    pub timeout_secs: u64,
    pub page: PageGeometry,
    pub layout: ColumnLayout,
    #[serde(rename = "dataset")]
    pub datasets: Vec<Dataset>,
}

impl Default for Config {
    fn default() -> Self {
        let peeringdb_query = BTreeMap::from([
            ("country".to_string(), "ID".to_string()),
            ("city".to_string(), "Yogyakarta".to_string()),
        ]);
        Self {
            output_dir: PathBuf::from("."),
            truncate: DEFAULT_TRUNCATE,
            exclude: EXCLUDED_COLUMNS.iter().map(|name| name.to_string()).collect(),
            timeout_secs: 30,
            page: PageGeometry::a4_landscape(),
            layout: ColumnLayout::municipal(),
            datasets: vec![
                Dataset {
                    name: "jogja".to_string(),
                    csv: PathBuf::from("jogja_data.csv"),
                    render: false,
                    source: Source::ckan("eaccabe7-6167-4215-8654-787e76f56956"),
                },
                Dataset {
                    name: "peeringdb".to_string(),
                    csv: PathBuf::from("peeringdb_yogyakarta.csv"),
                    render: false,
                    source: Source::PeeringDb {
                        url: PEERINGDB_IX.to_string(),
                        query: peeringdb_query,
                    },
                },
                Dataset {
                    name: "bts".to_string(),
                    csv: PathBuf::from("bts_data.csv"),
                    render: true,
                    source: Source::ckan("d1ca8da3-5603-42d6-ade2-3b2400af02e4"),
                },
                Dataset {
                    name: "hotspot".to_string(),
                    csv: PathBuf::from("hotspot_data.csv"),
                    render: true,
                    source: Source::ckan("dbbcef30-b61e-45f9-acb0-18d21efc5113"),
                },
            ],
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse {
            message: err.message().to_string(),
            src: NamedSource::new(name, text.to_string()),
            span: err.span().map(Into::into),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.truncate == 0 {
            return Err(ConfigError::Invalid(String::from(
                "`truncate` must be at least 1",
            )));
        }
        if !(self.layout.default_width > 0.0) {
            return Err(ConfigError::Invalid(String::from(
                "`layout.default_width` must be positive",
            )));
        }
        if let Some((name, _)) = self.layout.widths.iter().find(|(_, width)| !(**width > 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "width of column `{name}` must be positive"
            )));
        }

        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "dataset `{}` is declared twice",
                    dataset.name
                )));
            }
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Result<&Dataset, ConfigError> {
        self.datasets
            .iter()
            .find(|dataset| dataset.name == name)
            .ok_or_else(|| ConfigError::UnknownDataset(name.to_string()))
    }

    /// Datasets matching `names`, or all of them when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Dataset>, ConfigError> {
        if names.is_empty() {
            return Ok(self.datasets.iter().collect());
        }
        names.iter().map(|name| self.dataset(name)).collect()
    }

    pub fn csv_path(&self, dataset: &Dataset) -> PathBuf {
        self.output_dir.join(&dataset.csv)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(self.layout.clone(), self.page)
            .exclude(self.exclude.iter().cloned())
            .truncate(self.truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_the_default_setup() {
        let config = Config::parse("empty.toml", "").unwrap();
        assert_eq!(config, Config::default());
        let names: Vec<&str> = config.datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["jogja", "peeringdb", "bts", "hotspot"]);
        let rendered: Vec<&str> = config
            .datasets
            .iter()
            .filter(|d| d.render)
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(rendered, ["bts", "hotspot"]);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            "report.toml",
            r#"
            output_dir = "out"
            truncate = 12
            exclude = ["_id"]

            [page]
            width = 210.0
            height = 297.0

            [layout]
            default_width = 20.0
            [layout.widths]
            nama = 50.0

            [[dataset]]
            name = "hotspot"
            csv = "hotspot.csv"
            render = true
            source = { kind = "ckan", url = "https://example.org/api", resource_id = "r1", limit = 1000 }
            "#,
        )
        .unwrap();

        assert_eq!(config.truncate, 12);
        assert_eq!(config.page.width, 210.0);
        assert_eq!(config.page.margin_left, 10.0);
        assert_eq!(config.layout.preferred("nama"), 50.0);
        assert_eq!(config.layout.preferred("title"), 20.0);
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.csv_path(&config.datasets[0]), Path::new("out").join("hotspot.csv"));
    }

    #[test]
    fn parse_errors_carry_a_span() {
        let err = Config::parse("bad.toml", "truncate = \"many\"\n").unwrap_err();
        let ConfigError::Parse { span, .. } = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(span.is_some());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::parse("x", "colour = \"red\"\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::parse("x", "truncate = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse("x", "[layout.widths]\ntitle = -1.0\n"),
            Err(ConfigError::Invalid(_))
        ));

        let twice = r#"
            [[dataset]]
            name = "a"
            csv = "a.csv"
            source = { kind = "ckan", url = "u", resource_id = "r" }
            [[dataset]]
            name = "a"
            csv = "b.csv"
            source = { kind = "ckan", url = "u", resource_id = "r" }
        "#;
        assert!(matches!(Config::parse("x", twice), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn select_by_name() {
        let config = Config::default();
        assert_eq!(config.select(&[]).unwrap().len(), 4);
        let picked = config.select(&["hotspot".to_string()]).unwrap();
        assert_eq!(picked[0].csv, PathBuf::from("hotspot_data.csv"));
        assert!(matches!(
            config.select(&["nope".to_string()]),
            Err(ConfigError::UnknownDataset(name)) if name == "nope"
        ));
    }
}
