use anyhow::Result;
use aum_common::observability::{init_logging, LogConfig, LogFormat};
use aum_config::{AumConfig, AumConfigLoader};
use aum_pipeline::intake::{self, Lookup};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tether::Tether;
use tracing::info;
use uuid::Uuid;

mod tether;

/// Find a company's assets under management on the public web.
#[derive(Debug, Parser)]
#[command(name = "aum", version)]
struct Cli {
    /// YAML config file; skipped when absent.
    #[arg(long, global = true, default_value = "aum.yaml", env = "AUM_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register companies and run the pipeline for each new one.
    Run {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },
    /// Run the pipeline again for a known company.
    Rescrape(RescrapeTarget),
    /// Print today's token usage as JSON.
    Usage,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct RescrapeTarget {
    #[arg(long)]
    id: Option<Uuid>,
    #[arg(long)]
    name: Option<String>,
}

impl RescrapeTarget {
    fn lookup(self) -> Option<Lookup> {
        match (self.id, self.name) {
            (Some(id), _) => Some(Lookup::Id(id)),
            (None, Some(name)) => Some(Lookup::Name(name)),
            (None, None) => None,
        }
    }
}

fn log_config(cfg: &AumConfig) -> LogConfig {
    LogConfig {
        log_dir: cfg.logging.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.logging.stderr,
        format: LogFormat::parse(&cfg.logging.format),
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) config (env wins over the file)
    let cfg = AumConfigLoader::new().with_optional_file(&cli.config).load()?;

    // 2) logging
    let log_path = init_logging(log_config(&cfg))?;
    info!(path = %log_path.display(), "app.logging.ready");

    // 3) repository
    let repo = tether::open_repository(&cfg).await?;

    if let Command::Usage = cli.command {
        let report = intake::today_usage_report(repo.as_ref()).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // 4..7) llm, tokenizer, browser, workers
    let tether = Tether::build(&cfg, repo)?;

    // 8) dispatch
    match cli.command {
        Command::Run { names } => {
            let queued = intake::register_companies(tether.repo(), tether.queue(), &names).await?;
            if queued == 0 {
                info!("app.nothing_to_do");
            }
        }
        Command::Rescrape(target) => {
            if let Some(lookup) = target.lookup() {
                let id = intake::requeue_company(tether.repo(), tether.queue(), lookup).await?;
                info!(company_id = %id, "app.rescrape.queued");
            }
        }
        Command::Usage => {}
    }

    tether.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_several_names() {
        let cli = Cli::try_parse_from(["aum", "run", "Acme Capital", "Beta Asset"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("aum.yaml"));
        match cli.command {
            Command::Run { names } => assert_eq!(names, vec!["Acme Capital", "Beta Asset"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_needs_at_least_one_name() {
        assert!(Cli::try_parse_from(["aum", "run"]).is_err());
    }

    #[test]
    fn rescrape_takes_exactly_one_target() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["aum", "rescrape", "--id", &id.to_string()]).unwrap();
        let Command::Rescrape(target) = cli.command else {
            panic!("expected rescrape");
        };
        assert_eq!(target.lookup(), Some(Lookup::Id(id)));

        assert!(Cli::try_parse_from(["aum", "rescrape"]).is_err());
        assert!(Cli::try_parse_from(["aum", "rescrape", "--id", &id.to_string(), "--name", "x"])
            .is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["aum", "usage", "--config", "/etc/aum.yaml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/aum.yaml"));
        assert!(matches!(cli.command, Command::Usage));
    }
}
