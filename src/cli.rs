use clap::{Parser, Subcommand};
use std::path::PathBuf;

use scrapewatch::api::ExportFormat;
use scrapewatch::api::models::{DEFAULT_ADAPTER, DEFAULT_MAX_RESULTS, DEFAULT_TASK_TYPE, JobStatus};

#[derive(Parser, Debug)]
#[command(name = "scrapewatch")]
#[command(about = "Job status watcher and client for the scraper backend", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $SCRAPEWATCH_CONFIG or config/scrapewatch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch every non-terminal job until all of them settle
    Watch(WatchArgs),
    /// List jobs
    Jobs(JobsArgs),
    /// Show the current status of one job
    Status(JobArgs),
    /// Show the results of one job
    Results(JobArgs),
    /// Create a job
    #[command(subcommand)]
    Submit(SubmitCommand),
    /// Start a job-listing scrape
    ScrapeJobs(QueryArgs),
    /// Start a lead scrape
    ScrapeLeads(QueryArgs),
    /// Export a job's results to a local CSV file
    Export(ExportArgs),
    /// Download a server-side export of a job's results
    Download(DownloadArgs),
    /// Cancel a running job
    Cancel(JobArgs),
    /// Show aggregate job statistics
    Stats,
    /// List available scraping adapters
    Adapters,
    /// Check backend health
    Health,
    /// Run a synchronous search
    Search(QueryArgs),
    /// Delete all jobs and results on the backend
    ClearData(ClearDataArgs),
    /// Manage saved form drafts
    #[command(subcommand)]
    Draft(DraftCommand),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Additional job ids to poll even if the listing does not include them
    #[arg(long = "job")]
    pub jobs: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct JobsArgs {
    /// Only show jobs with this status
    #[arg(long)]
    pub status: Option<JobStatus>,
}

#[derive(clap::Args, Debug)]
pub struct JobArgs {
    pub job_id: String,
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    pub query: String,

    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: u32,
}

#[derive(Subcommand, Debug)]
pub enum SubmitCommand {
    /// Search job: query plus result limit
    Search(SubmitSearchArgs),
    /// Scrape job: explicit URL list
    Scrape(SubmitScrapeArgs),
}

#[derive(clap::Args, Debug)]
pub struct SubmitSearchArgs {
    /// Search query; falls back to the saved draft's `query` field
    pub query: Option<String>,

    #[arg(long)]
    pub max_results: Option<u32>,

    /// Draft form whose saved values fill missing arguments
    #[arg(long, default_value = "searchForm")]
    pub form: String,

    /// Keep polling the new job until it settles
    #[arg(long)]
    pub watch: bool,
}

#[derive(clap::Args, Debug)]
pub struct SubmitScrapeArgs {
    /// URLs; each argument may hold several newline-separated URLs.
    /// Falls back to the saved draft's `urls` field.
    pub urls: Vec<String>,

    #[arg(long, default_value = DEFAULT_ADAPTER)]
    pub adapter: String,

    #[arg(long, default_value = DEFAULT_TASK_TYPE)]
    pub task_type: String,

    #[arg(long, default_value = "scrapeForm")]
    pub form: String,

    #[arg(long)]
    pub watch: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    pub job_id: String,

    /// Output directory (defaults to `export.output_dir`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    pub job_id: String,

    #[arg(long, default_value = "csv")]
    pub format: ExportFormat,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ClearDataArgs {
    /// Required; the operation cannot be undone
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum DraftCommand {
    /// Save field values for a form (`name=value` pairs)
    Save {
        #[arg(long)]
        form: Option<String>,
        #[arg(value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Show the saved draft of a form
    Show {
        #[arg(long)]
        form: Option<String>,
    },
    /// Remove the saved draft of a form
    Clear {
        #[arg(long)]
        form: Option<String>,
    },
    /// List every saved draft
    List,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("field name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("query=rust jobs").unwrap(),
            ("query".to_string(), "rust jobs".to_string())
        );
        assert_eq!(parse_field("urls=").unwrap().1, "");
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_cli_parses_submit_search() {
        let cli = Cli::try_parse_from([
            "scrapewatch",
            "--config",
            "custom.toml",
            "submit",
            "search",
            "rust developer",
            "--max-results",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::Submit(SubmitCommand::Search(args)) => {
                assert_eq!(args.query.as_deref(), Some("rust developer"));
                assert_eq!(args.max_results, Some(50));
                assert_eq!(args.form, "searchForm");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_download_format() {
        let cli = Cli::try_parse_from(["scrapewatch", "download", "job-1", "--format", "json"])
            .unwrap();
        match cli.command {
            Commands::Download(args) => assert_eq!(args.format, ExportFormat::Json),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
