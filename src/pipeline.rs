//! Fetch-then-render orchestration over the configured datasets.
//!
//! Each dataset is handled on its own: a failure is logged, recorded in the
//! [`Summary`] and the next dataset is processed anyway.

use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::{Config, Dataset};
use crate::csv;
use crate::error::ReportError;
use crate::fetch::{records_to_table, Fetch, FetchError, HttpFetcher};
use crate::output::SvgWriter;
use crate::render::Renderer;

/// Outcome of processing several datasets.
#[derive(Debug, Default)]
pub struct Summary {
    pub completed: Vec<String>,
    pub failed: Vec<(String, ReportError)>,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<T>(&mut self, name: &str, result: Result<T, ReportError>) {
        match result {
            Ok(_) => self.completed.push(name.to_string()),
            Err(err) => {
                error!(dataset = name, error = %err, "dataset failed, continuing");
                self.failed.push((name.to_string(), err));
            }
        }
    }

    fn merge(&mut self, other: Summary) {
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
    }
}

pub struct Pipeline<F = HttpFetcher> {
    config: Config,
    renderer: Renderer,
    writer: SvgWriter,
    fetcher: F,
}

impl Pipeline<HttpFetcher> {
    pub fn new(config: Config) -> Self {
        let fetcher = HttpFetcher::new(config.timeout());
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetch> Pipeline<F> {
    pub fn with_fetcher(config: Config, fetcher: F) -> Self {
        Self {
            renderer: config.renderer(),
            writer: SvgWriter::new().generated_at(OffsetDateTime::now_utc()),
            config,
            fetcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches one dataset and saves it as CSV.
    pub fn fetch_dataset(&self, dataset: &Dataset) -> Result<PathBuf, ReportError> {
        info!(dataset = %dataset.name, "fetching");
        let records = self.fetcher.fetch(&dataset.source)?;
        let table = records_to_table(&records)?;

        let path = self.config.csv_path(dataset);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| FetchError::Save {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        table.save(&path).map_err(|source| FetchError::Save {
            path: path.clone(),
            source,
        })?;
        info!(
            dataset = %dataset.name,
            records = table.row_count(),
            path = %path.display(),
            "saved dataset"
        );
        Ok(path)
    }

    /// Renders a CSV file into `<out_dir>/<csv stem>-<n>.svg` pages. The title
    /// defaults to `Data from <file name>`.
    pub fn render_csv(
        &self,
        csv_path: &Path,
        title: Option<&str>,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ReportError> {
        let file_name = csv_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| csv_path.display().to_string());
        let table = csv::load(csv_path).map_err(|source| ReportError::MissingSource {
            name: file_name.clone(),
            source,
        })?;

        let title = title
            .map(str::to_string)
            .unwrap_or_else(|| format!("Data from {file_name}"));
        let document = self.renderer.render(table, &title)?;

        let stem = csv_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("report"));
        Ok(self.writer.write(&document, out_dir, &stem)?)
    }

    pub fn render_dataset(&self, dataset: &Dataset) -> Result<Vec<PathBuf>, ReportError> {
        self.render_csv(&self.config.csv_path(dataset), None, &self.config.output_dir)
    }

    pub fn fetch_all(&self, datasets: &[&Dataset]) -> Summary {
        let mut summary = Summary::default();
        for dataset in datasets {
            summary.record(&dataset.name, self.fetch_dataset(dataset));
        }
        summary
    }

    pub fn render_all(&self, datasets: &[&Dataset]) -> Summary {
        let mut summary = Summary::default();
        for dataset in datasets {
            summary.record(&dataset.name, self.render_dataset(dataset));
        }
        summary
    }

    /// Fetches every dataset, then renders the ones marked for rendering.
    ///
    /// A dataset whose fetch failed is still rendered from whatever CSV file
    /// a previous run left behind.
    pub fn run(&self) -> Summary {
        let all: Vec<&Dataset> = self.config.datasets.iter().collect();
        let mut summary = self.fetch_all(&all);

        let rendered: Vec<&Dataset> = all.into_iter().filter(|dataset| dataset.render).collect();
        if rendered.is_empty() {
            warn!("no dataset is marked for rendering");
        }
        summary.merge(self.render_all(&rendered));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Source;
    use serde_json::{json, Value};

    /// Serves canned records; sources whose resource id starts with `fail`
    /// behave like a failing API.
    struct Canned;

    impl Fetch for Canned {
        fn fetch(&self, source: &Source) -> Result<Vec<Value>, FetchError> {
            match source {
                Source::Ckan { resource_id, .. } if resource_id.starts_with("fail") => {
                    Err(FetchError::Api(String::from("resource not found")))
                }
                _ => Ok(vec![
                    json!({"_id": 1, "title": "Balai Kota", "kecamatan": "Umbulharjo", "kelurahan": null}),
                    json!({"_id": 2, "title": "Taman Pintar", "kecamatan": "Gondomanan", "kelurahan": "Ngupasan"}),
                ]),
            }
        }
    }

    fn config(dir: &Path) -> Config {
        let mut config = Config {
            output_dir: dir.to_path_buf(),
            ..Config::default()
        };
        config.datasets = vec![
            Dataset {
                name: "broken".to_string(),
                csv: PathBuf::from("broken.csv"),
                render: true,
                source: Source::ckan("fail-1"),
            },
            Dataset {
                name: "hotspot".to_string(),
                csv: PathBuf::from("hotspot_data.csv"),
                render: true,
                source: Source::ckan("ok"),
            },
        ];
        config
    }

    #[test]
    fn one_failing_dataset_does_not_stop_the_next() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_fetcher(config(dir.path()), Canned);
        let summary = pipeline.run();

        assert!(!summary.is_success());
        assert_eq!(summary.completed, ["hotspot", "hotspot"]);
        let failed: Vec<&str> = summary.failed.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, ["broken", "broken"]);
        assert!(matches!(summary.failed[0].1, ReportError::Fetch(FetchError::Api(_))));
        assert!(matches!(summary.failed[1].1, ReportError::MissingSource { .. }));

        assert!(dir.path().join("hotspot_data.csv").exists());
        assert!(dir.path().join("hotspot_data-001.svg").exists());
        assert!(!dir.path().join("broken-001.svg").exists());
    }

    #[test]
    fn fetched_csv_round_trips_into_the_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pipeline = Pipeline::with_fetcher(config.clone(), Canned);
        let path = pipeline.fetch_dataset(&config.datasets[1]).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with("_id,title,kecamatan,kelurahan\n1,Balai Kota,Umbulharjo,\n"));

        let svg = std::fs::read_to_string(
            pipeline.render_dataset(&config.datasets[1]).unwrap()[0].clone(),
        )
        .unwrap();
        assert!(svg.contains("Data from hotspot_data.csv"));
        assert!(svg.contains("Ngupasan"));
        assert!(!svg.contains("_id"));
    }

    #[test]
    fn render_csv_uses_the_given_title() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("bts_data.csv");
        std::fs::write(&csv_path, "_id,Kode Kecamatan,Kecamatan,Jumlah\n1,3471010,Mantrijeron,12\n")
            .unwrap();

        let pipeline = Pipeline::with_fetcher(config(dir.path()), Canned);
        let out = dir.path().join("pdf");
        let pages = pipeline
            .render_csv(&csv_path, Some("Jumlah BTS per Kecamatan"), &out)
            .unwrap();
        assert_eq!(pages, [out.join("bts_data-001.svg")]);
        let svg = std::fs::read_to_string(&pages[0]).unwrap();
        assert!(svg.contains("Jumlah BTS per Kecamatan"));
        assert!(svg.contains("Mantrijeron"));
    }

    #[test]
    fn csv_with_only_excluded_columns_is_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("icons.csv");
        std::fs::write(&csv_path, "_id,iconsrc\n1,a.png\n").unwrap();

        let pipeline = Pipeline::with_fetcher(config(dir.path()), Canned);
        let err = pipeline.render_csv(&csv_path, None, dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::EmptyTable(_)));
    }
}
