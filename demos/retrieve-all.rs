use jogja_report::fetch::records_to_table;
use jogja_report::{Config, Fetch, HttpFetcher};

fn main() {
    let config = Config::default();
    let fetcher = HttpFetcher::new(config.timeout());

    for dataset in &config.datasets {
        let records = match fetcher.fetch(&dataset.source) {
            Ok(records) => records,
            Err(e) => {
                eprintln!(
                    "Could not fetch `{}` from `{}`. {e}",
                    dataset.name,
                    dataset.source.url()
                );
                continue;
            }
        };

        let table = records_to_table(&records).unwrap();
        table.save(&dataset.csv).unwrap();

        println!(
            "Wrote {} records of {} to {}",
            table.row_count(),
            dataset.name,
            dataset.csv.display()
        );
    }
}
