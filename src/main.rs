use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jogja_report::{Config, Pipeline, Summary};
use miette::{miette, IntoDiagnostic};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Fetch Yogyakarta open datasets and render them as table reports
#[derive(Parser)]
#[command(name = "jogja-report", version, about)]
struct Cli {
    /// Configuration file (TOML). Built-in datasets are used without one.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for CSV files and rendered pages
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch datasets and save them as CSV
    Fetch {
        /// Dataset names; all configured datasets when omitted
        names: Vec<String>,
    },
    /// Render one CSV file
    Render {
        csv: PathBuf,

        /// Heading of the report [default: "Data from <file name>"]
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Fetch every dataset, then render the ones marked for rendering
    Run,
}

fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn,jogja_report=info".to_string(),
            1 => "info,jogja_report=debug".to_string(),
            _ => "debug,jogja_report=trace".to_string(),
        },
    };
    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(verbose >= 2)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn report(summary: Summary) -> miette::Result<()> {
    let total = summary.completed.len() + summary.failed.len();
    let failed = summary.failed.len();
    for (name, err) in summary.failed {
        eprintln!("{:?}", miette::Report::new(err).wrap_err(format!("dataset `{name}`")));
    }
    if failed == 0 {
        Ok(())
    } else {
        Err(miette!("{failed} of {total} dataset steps failed"))
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(out) = cli.out {
        config.output_dir = out;
    }

    let pipeline = Pipeline::new(config);
    match cli.command {
        Command::Fetch { names } => {
            let datasets = pipeline.config().select(&names)?;
            report(pipeline.fetch_all(&datasets))
        }
        Command::Render { csv, title } => {
            let pages = pipeline.render_csv(&csv, title.as_deref(), &pipeline.config().output_dir)?;
            for page in pages {
                println!("{}", page.display());
            }
            Ok(())
        }
        Command::Run => {
            std::fs::create_dir_all(&pipeline.config().output_dir).into_diagnostic()?;
            report(pipeline.run())
        }
    }
}
