//! # switchscout CLI
//!
//! Command-line access to the analysis engine.
//!
//! ## Subcommands
//!
//! - `analyze`: Full recommendation for one installer
//! - `crawl`: Run only the documentation crawl and list the pages
//! - `check-url`: Run the URL safety validator
//! - `classify`: Classify an installer filename
//!
//! `analyze` and `crawl` print a spinner while crawling and can be stopped
//! with Ctrl-C or a `--deadline`; whatever was collected by then is used.

mod telemetry;

use std::time::Duration;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use switchscout::crawler::{DEFAULT_KEYWORDS, UrlGuard, inspect, page_title};
use switchscout::{Analyzer, CrawlerConfig, PackagingRecommendation, classify};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Derive silent-install commands and detection rules for Windows installers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an installer and print the packaging recommendation
    Analyze(AnalyzeArgs),

    /// Crawl vendor documentation and list the collected pages
    Crawl(CrawlArgs),

    /// Check whether a URL passes the safety validator
    CheckUrl(CheckUrlArgs),

    /// Classify an installer by its filename
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Clone)]
struct CrawlOptions {
    /// Maximum number of pages to crawl (1-10)
    #[arg(short = 'p', long, default_value = "8")]
    max_pages: usize,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value = "500")]
    rate: u64,

    /// Link keywords (comma-separated, replaces the defaults)
    #[arg(short, long)]
    keywords: Option<String>,

    /// Hosts exempt from the private-address block (comma-separated)
    #[arg(long)]
    allow_host: Option<String>,

    /// Give up crawling after this many seconds
    #[arg(long)]
    deadline: Option<u64>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Page the installer was found on
    #[arg(required = true)]
    page_url: String,

    /// Installer download URL
    #[arg(short, long, default_value = "")]
    installer_url: String,

    /// Installer filename (derived from the installer URL when omitted)
    #[arg(short, long, default_value = "")]
    filename: String,

    #[command(flatten)]
    crawl: CrawlOptions,

    /// Output format (text|json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to start from
    #[arg(required = true)]
    url: String,

    #[command(flatten)]
    crawl: CrawlOptions,

    /// Output format (text|json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct CheckUrlArgs {
    /// URL to check
    #[arg(required = true)]
    url: String,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Installer filename
    #[arg(required = true)]
    filename: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber();

    match cli.command {
        Some(Commands::Analyze(args)) => {
            analyze_command(args).await?;
        }
        Some(Commands::Crawl(args)) => {
            crawl_command(args).await?;
        }
        Some(Commands::CheckUrl(args)) => {
            check_url_command(args)?;
        }
        Some(Commands::Classify(args)) => {
            println!("{}", classify(&args.filename));
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["switchscout", "--help"]);
        }
    }

    Ok(())
}

fn crawler_config(options: &CrawlOptions) -> CrawlerConfig {
    let mut guard = UrlGuard::default();
    for host in options.allow_host.iter().flat_map(|hosts| hosts.split(',')) {
        let host = host.trim();
        if !host.is_empty() {
            guard = guard.allow_host(host);
        }
    }

    let keywords = match &options.keywords {
        Some(keywords) => keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        None => DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
    };

    CrawlerConfig::builder()
        .max_pages(options.max_pages)
        .timeout(Duration::from_secs(options.timeout))
        .politeness_delay_ms(options.rate)
        .keyword_allowlist(keywords)
        .url_guard(guard)
        .build()
}

/// A token cancelled by Ctrl-C or by the optional deadline
fn cancellation(deadline: Option<u64>) -> CancellationToken {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if let Some(seconds) = deadline {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            on_deadline.cancel();
        });
    }

    cancel
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

#[instrument]
async fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    let analyzer = Analyzer::new(crawler_config(&args.crawl))?;
    let cancel = cancellation(args.crawl.deadline);

    let progress = spinner(format!("Analyzing {}...", args.page_url))?;
    let result = analyzer
        .analyze_with_cancel(&args.page_url, &args.installer_url, &args.filename, &cancel)
        .await;
    progress.finish_and_clear();

    let recommendation = result.map_err(|e| anyhow!("analysis failed ({}): {}", e.status_code(), e))?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&recommendation)?),
        _ => print_recommendation(&recommendation),
    }

    Ok(())
}

fn print_recommendation(rec: &PackagingRecommendation) {
    println!("Installer:   {} ({})", rec.filename, rec.installer_kind);
    if !rec.installer_url.is_empty() {
        println!("URL:         {}", rec.installer_url);
    }
    println!("Install:     {}", rec.silent_install_command);
    println!("Uninstall:   {}", rec.uninstall_command);
    println!("Detection:   {}", rec.detection_rule);
    println!(
        "Confidence:  {} (install {}, uninstall {}, detection {})",
        rec.confidence,
        rec.confidence_breakdown.install,
        rec.confidence_breakdown.uninstall,
        rec.confidence_breakdown.detection
    );
    println!("Patterns:    v{}", rec.pattern_library_version);
    if !rec.detected_versions.is_empty() {
        println!("Versions:    {}", rec.detected_versions.join(", "));
    }

    if !rec.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &rec.warnings {
            println!("  ! {}", warning);
        }
    }
    if rec.needs_review() {
        println!("\nReview the flagged values before deploying.");
    }
    if !rec.notes.is_empty() {
        println!("\nNotes:");
        for note in &rec.notes {
            println!("  - {}", note);
        }
    }
    if !rec.source_pages.is_empty() {
        println!("\nSources:");
        for page in &rec.source_pages {
            println!("  {}", page);
        }
    }
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let analyzer = Analyzer::new(crawler_config(&args.crawl))?;
    let cancel = cancellation(args.crawl.deadline);

    if let Err(reason) = analyzer.config().url_guard.check(&args.url) {
        return Err(anyhow!("refusing to crawl {}: {}", args.url, reason));
    }

    let progress = spinner(format!("Crawling {}...", args.url))?;
    let result = analyzer.crawl(&args.url, &cancel).await;
    progress.finish_and_clear();
    let pages = result?;

    match args.format.as_str() {
        "json" => {
            let summary: Vec<_> = pages
                .iter()
                .map(|page| {
                    serde_json::json!({
                        "url": page.url,
                        "title": page_title(&page.raw_html),
                        "textLength": page.extracted_text.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            println!("Crawled {} pages", pages.len());
            for page in &pages {
                let title = page_title(&page.raw_html).unwrap_or_default();
                println!("  {} {}", page.url, title);
            }
        }
    }

    Ok(())
}

fn check_url_command(args: CheckUrlArgs) -> anyhow::Result<()> {
    match inspect(&args.url) {
        Ok(url) => {
            println!("allowed: {}", url);
            Ok(())
        }
        Err(reason) => Err(anyhow!("rejected: {}", reason)),
    }
}
