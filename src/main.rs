use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::info;

use posting_scraper::parser::{self, sections};
use posting_scraper::{html, validate_for_generation, JobPosting, Scraper, Settings};

#[derive(Parser)]
#[command(name = "posting_scraper", about = "Extract structured job postings from career pages")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Per-run overrides applied on top of the loaded settings.
#[derive(Args)]
struct Overrides {
    /// Settings file (default: ./posting_scraper.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Navigation timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Settle delay after load in milliseconds
    #[arg(long, global = true)]
    settle_ms: Option<u64>,
    /// Show the browser window
    #[arg(long, global = true)]
    headful: bool,
    /// Disable the Chrome sandbox (needed in some containers)
    #[arg(long, global = true)]
    no_sandbox: bool,
    /// Chrome/Chromium executable
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one posting URL and print the extracted record
    Scrape {
        url: String,
        /// Print the plain-text job description instead of JSON
        #[arg(long)]
        prompt: bool,
        /// Log the section headings found in the record's raw_text (offsets index raw_text)
        #[arg(long)]
        explain: bool,
        /// Fail unless both company and title were extracted
        #[arg(long)]
        require_basics: bool,
    },
    /// Extract postings from saved HTML files (no browser)
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// URL to record for every file (default: file:// path)
        #[arg(long)]
        url: Option<String>,
    },
    /// Scrape a list of URLs (one per line) and write JSON lines
    Batch {
        #[arg(short, long)]
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pages rendered at once
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = load_settings(&cli.overrides)?;
    info!(?settings, "Starting posting scraper");

    let result = match cli.command {
        Commands::Scrape {
            url,
            prompt,
            explain,
            require_basics,
        } => {
            let posting = scraper_for(&settings).scrape_bounded(&url).await;

            if explain {
                for pos in sections::find_positions(&posting.raw_text) {
                    info!(
                        category = pos.category.label(),
                        offset = pos.match_start,
                        header = %pos.header_text,
                        "section heading"
                    );
                }
            }
            if require_basics {
                validate_for_generation(&posting)?;
            }

            if prompt {
                println!("{}", posting.to_prompt_text());
            } else {
                println!("{}", serde_json::to_string_pretty(&posting)?);
            }
            Ok(())
        }
        Commands::Parse { files, url } => {
            let limit = settings.raw_text_limit;
            let postings: Vec<JobPosting> = files
                .par_iter()
                .map(|path| parse_file(path, url.as_deref(), limit))
                .collect::<anyhow::Result<_>>()?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            for p in &postings {
                serde_json::to_writer(&mut out, p)?;
                writeln!(out)?;
            }
            info!("Parsed {} files", postings.len());
            Ok(())
        }
        Commands::Batch {
            input,
            output,
            concurrency,
        } => {
            let urls = read_url_list(&input)?;
            if urls.is_empty() {
                println!("No URLs in {}.", input.display());
                return Ok(());
            }

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("creating {}", path.display()))?,
                )),
                None => Box::new(BufWriter::new(io::stdout())),
            };

            let concurrency = concurrency.unwrap_or(settings.concurrency);
            eprintln!("Scraping {} URLs ({} at a time)...", urls.len(), concurrency);
            let stats = scraper_for(&settings)
                .scrape_many(urls, concurrency, |row| {
                    serde_json::to_writer(&mut out, &row)?;
                    writeln!(out)?;
                    Ok(())
                })
                .await?;
            out.flush()?;

            eprintln!("Done: {} scraped ({} ok, {} errors).", stats.total, stats.ok, stats.errors);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_settings(o: &Overrides) -> anyhow::Result<Settings> {
    let mut s = Settings::load(o.config.as_deref()).context("loading settings")?;
    if let Some(ms) = o.timeout_ms {
        s.nav_timeout_ms = ms;
    }
    if let Some(ms) = o.settle_ms {
        s.settle_ms = ms;
    }
    if o.headful {
        s.headless = false;
    }
    if o.no_sandbox {
        s.sandbox = false;
    }
    if let Some(path) = &o.chrome_path {
        s.chrome_path = Some(path.clone());
    }
    Ok(s)
}

fn scraper_for(settings: &Settings) -> Scraper {
    Scraper::new(
        Arc::new(settings.chrome_driver()),
        settings.fetch_config(),
        settings.raw_text_limit,
    )
}

fn parse_file(path: &Path, url: Option<&str>, raw_text_limit: usize) -> anyhow::Result<JobPosting> {
    let html = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let url = match url {
        Some(u) => u.to_string(),
        None => format!("file://{}", path.display()),
    };
    let page = html::raw_page_from_html(&url, &html);
    Ok(parser::process_page(&page, raw_text_limit))
}

fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let body = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
