use crate::core::filter::{DurationBucket, SortKey, TimeWindow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "trendpro")]
#[command(about = "YouTube trend dashboard and content strategy assistant")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard
    Tui,

    /// Fetch the most popular videos of a region
    Trending {
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Search a niche by keyword
    Search {
        /// Search keyword
        query: String,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// List generation-capable models of the configured AI provider
    Models,

    /// Write a config file with the default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Region code (ID, US, KR, JP, ...)
    #[arg(short, long)]
    pub region: Option<String>,

    /// Number of results, 10-50 in steps of 5
    #[arg(short, long)]
    pub count: Option<u32>,

    /// Publish window
    #[arg(short, long, default_value = "all")]
    pub window: TimeWindow,

    /// Sort order
    #[arg(short, long, default_value = "views")]
    pub sort: SortKey,

    /// Duration bucket
    #[arg(short, long, default_value = "all")]
    pub duration: DurationBucket,

    /// Print the rows as JSON
    #[arg(long)]
    pub json: bool,

    /// Ask the AI consultant about the top results
    #[arg(long, conflicts_with = "json")]
    pub ai: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_flags_parse_into_core_types() {
        let cli = Cli::try_parse_from([
            "trendpro", "search", "street food", "--region", "us", "-c", "25", "--window", "week",
            "--sort", "engagement", "--duration", "medium", "--ai",
        ])
        .expect("parse");

        let Some(Commands::Search { query, fetch }) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(query, "street food");
        assert_eq!(fetch.region.as_deref(), Some("us"));
        assert_eq!(fetch.count, Some(25));
        assert_eq!(fetch.window, TimeWindow::Week);
        assert_eq!(fetch.sort, SortKey::Engagement);
        assert_eq!(fetch.duration, DurationBucket::Medium);
        assert!(fetch.ai && !fetch.json);
    }

    #[test]
    fn no_subcommand_means_dashboard() {
        let cli = Cli::try_parse_from(["trendpro", "--config", "/tmp/t.toml"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn init_config_takes_force() {
        let cli = Cli::try_parse_from(["trendpro", "init-config", "--force"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::InitConfig { force: true })));
    }

    #[test]
    fn json_output_cannot_carry_the_ai_answer() {
        assert!(Cli::try_parse_from(["trendpro", "trending", "--json", "--ai"]).is_err());
        assert!(Cli::try_parse_from(["trendpro", "trending", "--json"]).is_ok());
    }

    #[test]
    fn unknown_sort_is_rejected() {
        assert!(Cli::try_parse_from(["trendpro", "trending", "--sort", "likes"]).is_err());
    }
}
