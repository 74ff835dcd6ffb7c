use clap::{Parser, Subcommand};
use crawlbox::config::JobOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "crawlbox")]
#[command(about = "Resumable, queue-backed crawl dispatcher", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $CRAWLBOX_CONFIG or config/crawlbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl every request listed in a file
    Run(RunArgs),
    /// Show the queue counters of a job
    Status(JobArgs),
    /// Delete all stored state of a job
    Clear(JobArgs),
}

#[derive(clap::Args, Debug)]
pub struct JobArgs {
    /// Job name, determines the store namespace
    #[arg(long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Request list: one path, uri or JSON descriptor per line
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Continue an interrupted run instead of rebuilding the queue
    #[arg(long = "continue", alias = "resume")]
    pub resume: bool,

    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    #[arg(long)]
    pub log_step: Option<u64>,

    #[arg(long)]
    pub base_uri: Option<String>,

    /// Pause after each completion, e.g. `500ms`
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Expected number of requests, enables queue-build progress lines
    #[arg(long)]
    pub queue_len: Option<u64>,

    #[arg(long)]
    pub retry_count: Option<u32>,
}

impl RunArgs {
    /// Apply command-line overrides on top of configured defaults
    pub fn apply(&self, mut options: JobOptions) -> JobOptions {
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }
        if self.resume {
            options.resume = true;
        }
        if let Some(timeout) = self.timeout {
            options.timeout = timeout;
        }
        if let Some(log_step) = self.log_step {
            options.log_step = log_step;
        }
        if let Some(base_uri) = &self.base_uri {
            options.base_uri = base_uri.clone();
        }
        if let Some(interval) = self.interval {
            options.interval = interval;
        }
        if self.queue_len.is_some() {
            options.queue_len = self.queue_len;
        }
        if let Some(retry_count) = self.retry_count {
            options.retry_count = retry_count;
        }
        options
    }
}

fn parse_duration(raw: &str) -> Result<Duration, humantime_serde::re::humantime::DurationError> {
    humantime_serde::re::humantime::parse_duration(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_override_defaults() {
        let cli = Cli::parse_from([
            "crawlbox",
            "run",
            "--name",
            "news",
            "--input",
            "urls.txt",
            "--concurrency",
            "4",
            "--continue",
            "--interval",
            "250ms",
        ]);

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let options = args.apply(JobOptions::default());
        assert_eq!(args.job.name, "news");
        assert_eq!(options.concurrency, 4);
        assert!(options.resume);
        assert_eq!(options.interval, Duration::from_millis(250));
        assert_eq!(options.retry_count, 2);
    }

    #[test]
    fn test_status_command() {
        let cli = Cli::parse_from(["crawlbox", "status", "--name", "news"]);
        assert!(matches!(cli.command, Commands::Status(JobArgs { ref name }) if name == "news"));
    }
}
