mod cli;
mod config;
mod core;
mod error;
mod tui;

use crate::cli::{Cli, Commands, FetchArgs};
use crate::config::{Config, ENV_YOUTUBE_KEY, clamp_count};
use crate::core::filter::{self, ResultView, ViewQuery};
use crate::core::http::HttpClient;
use crate::core::pipeline::{FetchMode, FetchParams, fetch_records};
use crate::core::records::{VideoRecord, format_count};
use crate::core::strategy::{StrategyService, TOP_N, select_model};
use crate::core::youtube::YouTubeClient;
use crate::error::{Error, Result};
use crate::tui::components::list::fit_width;
use crate::tui::{App, EventHandler, Tui, init as tui_init, restore as tui_restore, ui};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Tui));
    let _guard = init_logging(interactive);

    if let Some(Commands::InitConfig { force }) = cli.command {
        return run_cli_init_config(cli.config.as_deref(), force);
    }

    let config = Config::load(cli.config.as_deref())?;
    info!(provider = %config.ai.provider, "trendpro v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Trending { fetch }) => {
            run_cli_fetch(&config, FetchMode::Trending, String::new(), fetch).await?;
        }
        Some(Commands::Search { query, fetch }) => {
            run_cli_fetch(&config, FetchMode::Search, query, fetch).await?;
        }
        Some(Commands::Models) => {
            run_cli_models(&config).await?;
        }
        Some(Commands::Tui) | None => {
            run_tui(config).await?;
        }
        Some(Commands::InitConfig { .. }) => {}
    }

    Ok(())
}

/// The dashboard owns the terminal, so it logs to a daily file; one-shot
/// commands log to stderr.
fn init_logging(interactive: bool) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendpro=info"));

    if interactive {
        let file_appender = tracing_appender::rolling::daily(config::log_dir(), "trendpro.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(filter)
            .with_ansi(false)
            .with_target(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .init();
        None
    }
}

async fn run_cli_fetch(
    config: &Config,
    mode: FetchMode,
    query: String,
    args: FetchArgs,
) -> Result<()> {
    let api_key = config.youtube_api_key.clone().ok_or_else(|| {
        Error::custom(format!(
            "Missing YouTube API key: set {ENV_YOUTUBE_KEY} or youtube_api_key in the config file"
        ))
    })?;

    let params = FetchParams {
        mode,
        query,
        region: args
            .region
            .map(|r| r.trim().to_ascii_uppercase())
            .unwrap_or_else(|| config.dashboard.region.clone()),
        count: args.count.map_or(config.dashboard.count, clamp_count),
        window: args.window,
    };
    params.validate()?;

    if !args.json {
        println!(
            "{}: {} ({} results, {})",
            params.mode.label(),
            params.topic(),
            params.count,
            params.window.label()
        );
    }

    let http = HttpClient::new(&config.http)?;
    let client = YouTubeClient::new(http.clone(), api_key);
    let now = Utc::now();
    let records = fetch_records(&client, &params, now).await?;

    let view = filter::apply(
        &records,
        &ViewQuery {
            bucket: args.duration,
            sort: args.sort,
            cutoff: params.window.cutoff_date(now.date_naive()),
        },
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(view.rows())?);
    } else {
        match &view {
            ResultView::NoResults => println!("No videos found."),
            ResultView::FilteredOut => println!("No videos match the current filters."),
            ResultView::Rows(rows) => print_table(rows, config),
        }
    }

    if args.ai {
        let Some(ai_key) = config.ai.api_key() else {
            return Err(Error::custom(format!(
                "No {} API key configured for the AI consultant",
                config.ai.provider
            )));
        };
        let service = StrategyService::from_config(&config.ai, ai_key, http);
        let top: Vec<VideoRecord> = view.rows().iter().take(TOP_N).cloned().collect();
        let answer = service.consult(&top, &params.topic()).await;
        println!();
        println!("{answer}");
    }

    Ok(())
}

fn print_table(rows: &[VideoRecord], config: &Config) {
    let dashboard = &config.dashboard;
    println!(
        "{:<2} {} {} {:>13} {:>11} {:>7} {:>7} {:<10}",
        "",
        fit_width("Title", 44),
        fit_width("Channel", 20),
        "Views",
        "Subscribers",
        "Eng %",
        "Min",
        "Published"
    );

    for video in rows {
        let mark = if video.is_viral(dashboard.viral_threshold) { "*" } else { "" };
        let mut line = format!(
            "{:<2} {} {} {:>13} {:>11} {:>7.2} {:>7.2} {:<10}",
            mark,
            fit_width(&video.title, 44),
            fit_width(&video.channel, 20),
            format_count(video.views),
            format_count(video.subscribers),
            video.engagement_percent,
            video.duration_minutes,
            video.publish_date
        );
        if dashboard.show_interaction_columns {
            line.push_str(&format!(
                " {:>10} {:>9}",
                format_count(video.likes),
                format_count(video.comments)
            ));
        }
        println!("{line}");
    }

    println!();
    println!(
        "{} videos, * = at least {:.1}x views per subscriber",
        rows.len(),
        dashboard.viral_threshold
    );
}

async fn run_cli_models(config: &Config) -> Result<()> {
    let ai_key = config.ai.api_key().ok_or_else(|| {
        Error::custom(format!("No {} API key configured", config.ai.provider))
    })?;

    let http = HttpClient::new(&config.http)?;
    let service = StrategyService::from_config(&config.ai, ai_key, http);
    let models = service.available_models().await?;

    if models.is_empty() {
        println!("No generation-capable models found.");
        return Ok(());
    }

    let chosen = select_model(&models, &config.ai.model_priority);
    println!("Found {} models for {}:", models.len(), config.ai.provider);
    for model in &models {
        let marker = if Some(model.as_str()) == chosen { "*" } else { " " };
        println!("{marker} {model}");
    }

    Ok(())
}

fn run_cli_init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(config::default_path)
        .ok_or_else(|| Error::custom("Cannot determine a config directory"))?;

    if path.exists() && !force {
        return Err(Error::custom(format!(
            "{} already exists, use --force to overwrite",
            path.display()
        )));
    }

    Config::default().save(&path)?;
    println!("Config written to {}", path.display());
    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    let mut app = App::new(config)?;

    let mut terminal = tui_init()?;
    let result = event_loop(&mut terminal, &mut app);
    tui_restore()?;

    result
}

fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let event_handler = EventHandler::new();

    loop {
        let event = event_handler.next_event()?;
        app.handle_event(event)?;

        terminal.draw(|f| {
            ui::draw(f, app);
        })?;

        if app.should_quit {
            return Ok(());
        }
    }
}
