//! Course crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use course_crawler::{
    adapters,
    error::{AppError, Result},
    models::{Config, Target},
    pipeline::{self, CrawlOptions},
    services::NtnuSource,
    storage::LocalStorage,
};

/// Course catalogue crawler
#[derive(Parser, Debug)]
#[command(
    name = "course-crawler",
    version,
    about = "Crawl a university course catalogue into cached JSON",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Crawl flags, used when no subcommand is given
    #[command(flatten)]
    crawl: CrawlArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl metadata and details, then write adapter output
    Crawl(CrawlArgs),

    /// List registered output adapters
    Adapters,

    /// Validate the configuration file
    Validate,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Units in flight per phase [default: crawler.max_concurrent]
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Term to crawl as YEAR-TERM, repeatable [default: current term]
    #[arg(short, long = "target", value_name = "YEAR-TERM")]
    targets: Vec<Target>,

    /// Output adapter id [default: adapter from config]
    #[arg(short, long)]
    adapter: Option<String>,

    /// Ignore and overwrite cached files
    #[arg(short, long)]
    force: bool,

    /// Department code to crawl, repeatable [default: departments from config]
    #[arg(short, long = "department", value_name = "CODE")]
    departments: Vec<String>,

    /// Root of the cache tree and outputs [default: paths.data_dir]
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);

    match cli.command.unwrap_or(Command::Crawl(cli.crawl)) {
        Command::Crawl(args) => crawl(config, args).await?,

        Command::Adapters => {
            for id in adapters::ids() {
                println!("{id}");
            }
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} departments, adapter {})",
                config.departments.len(),
                config.adapter
            );
        }
    }

    Ok(())
}

async fn crawl(mut config: Config, args: CrawlArgs) -> Result<()> {
    if !args.departments.is_empty() {
        config.departments = args.departments;
    }
    if let Some(concurrency) = args.concurrency {
        config.crawler.max_concurrent = concurrency;
    }
    if let Some(data_dir) = args.data_dir {
        config.paths.data_dir = data_dir;
    }
    if let Some(adapter) = args.adapter {
        config.adapter = adapter;
    }

    if config.crawler.max_concurrent == 0 {
        return Err(AppError::PoolConfiguration(
            "concurrency must be a positive integer".into(),
        ));
    }
    if config.departments.is_empty() {
        return Err(AppError::config(
            "No departments to crawl; list them in the config or pass --department",
        ));
    }
    config.validate()?;

    let targets = if args.targets.is_empty() {
        vec![Target::current()]
    } else {
        args.targets
    };

    log::info!(
        "Targets: {} Concurrency: {}",
        Target::join(&targets),
        config.crawler.max_concurrent
    );

    let source = NtnuSource::new(&config.crawler)?;
    let storage = LocalStorage::new(&config.paths.data_dir);
    log::info!("Cache directory: {}", storage.root().display());
    let options = CrawlOptions {
        targets,
        departments: config.departments,
        adapter: config.adapter,
        concurrency: config.crawler.max_concurrent,
        force: args.force,
    };

    pipeline::run_crawler(Arc::new(source), storage, &options).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_flags_without_subcommand() {
        let cli = Cli::try_parse_from(["course-crawler", "-c", "5", "-t", "110-1", "-t", "110-2", "-f"])
            .unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.crawl.concurrency, Some(5));
        assert_eq!(cli.crawl.targets, vec![Target::new(110, 1), Target::new(110, 2)]);
        assert!(cli.crawl.force);
    }

    #[test]
    fn test_crawl_subcommand_flags() {
        let cli = Cli::try_parse_from(["course-crawler", "crawl", "-a", "course-pack", "-d", "CS"]).unwrap();

        let Some(Command::Crawl(args)) = cli.command else {
            panic!("expected crawl subcommand");
        };
        assert_eq!(args.adapter.as_deref(), Some("course-pack"));
        assert_eq!(args.departments, vec!["CS"]);
    }

    #[test]
    fn test_top_level_flags_conflict_with_subcommand() {
        assert!(Cli::try_parse_from(["course-crawler", "-f", "adapters"]).is_err());
    }

    #[test]
    fn test_invalid_target_rejected() {
        assert!(Cli::try_parse_from(["course-crawler", "-t", "110"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
