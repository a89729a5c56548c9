use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::fetcher::{self, BrowserDriver, FetchConfig, FetchError};
use crate::parser;
use crate::posting::JobPosting;

/// Scrape stats returned after a batch completes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// One batch result line.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRow {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub fetched: bool,
    pub error: Option<String>,
    pub posting: JobPosting,
}

/// Fetch and extract one posting. Never fails: a fetch error yields the empty record.
pub fn scrape(driver: &dyn BrowserDriver, url: &str, config: &FetchConfig, raw_text_limit: usize) -> JobPosting {
    scrape_inner(driver, url, config, raw_text_limit).0
}

fn scrape_inner(
    driver: &dyn BrowserDriver,
    url: &str,
    config: &FetchConfig,
    raw_text_limit: usize,
) -> (JobPosting, Option<FetchError>) {
    let fetched = parser::isolate("fetch", Err(FetchError::Panicked(url.to_string())), || {
        fetcher::fetch(driver, url, config)
    });
    match fetched {
        Ok(page) => (parser::process_page(&page, raw_text_limit), None),
        Err(e) => {
            warn!(url, error = %e, "fetch failed; returning empty posting");
            (JobPosting::empty(url), Some(e))
        }
    }
}

/// Owns a driver and config; bounds each scrape by a wall-clock budget.
#[derive(Clone)]
pub struct Scraper {
    driver: Arc<dyn BrowserDriver>,
    config: FetchConfig,
    raw_text_limit: usize,
    budget: Duration,
}

impl Scraper {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: FetchConfig, raw_text_limit: usize) -> Self {
        let budget = config.wall_clock_budget();
        Scraper {
            driver,
            config,
            raw_text_limit,
            budget,
        }
    }

    /// Override the per-page wall-clock bound.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Scrape on the blocking pool, giving up once the wall-clock budget is spent.
    pub async fn scrape_bounded(&self, url: &str) -> JobPosting {
        self.scrape_row(url).await.posting
    }

    async fn scrape_row(&self, url: &str) -> ScrapeRow {
        let start = Instant::now();
        let scraped_at = Utc::now();
        let budget = self.budget;

        let this = self.clone();
        let owned_url = url.to_string();
        let task = tokio::task::spawn_blocking(move || {
            scrape_inner(this.driver.as_ref(), &owned_url, &this.config, this.raw_text_limit)
        });

        let (posting, error) = match tokio::time::timeout(budget, task).await {
            Ok(Ok((posting, err))) => (posting, err.map(|e| e.to_string())),
            Ok(Err(join_err)) => {
                warn!(url, error = %join_err, "scrape task aborted");
                (JobPosting::empty(url), Some(join_err.to_string()))
            }
            Err(_) => {
                let e = FetchError::Timeout {
                    url: url.to_string(),
                    after_ms: budget.as_millis() as u64,
                };
                warn!(url, error = %e, "scrape exceeded wall-clock budget");
                (JobPosting::empty(url), Some(e.to_string()))
            }
        };

        ScrapeRow {
            url: url.to_string(),
            scraped_at,
            latency_ms: start.elapsed().as_millis() as u64,
            fetched: error.is_none(),
            error,
            posting,
        }
    }

    /// Scrape many URLs with bounded concurrency, handing each row to `on_row` as it lands.
    pub async fn scrape_many<F>(&self, urls: Vec<String>, concurrency: usize, mut on_row: F) -> anyhow::Result<ScrapeStats>
    where
        F: FnMut(ScrapeRow) -> anyhow::Result<()>,
    {
        let concurrency = concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let total = urls.len();

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                .progress_chars("=> "),
        );

        // Channel: workers send rows, this loop hands them to the caller
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ScrapeRow>(concurrency * 2);

        for url in urls {
            let scraper = self.clone();
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return;
                };
                let row = scraper.scrape_row(&url).await;
                let _ = tx.send(row).await;
            });
        }

        // rx closes once every worker has dropped its sender
        drop(tx);

        let mut stats = ScrapeStats {
            total,
            ..Default::default()
        };
        while let Some(row) = rx.recv().await {
            if row.fetched {
                stats.ok += 1;
            } else {
                stats.errors += 1;
            }
            on_row(row)?;
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!("Scraped {} pages ({} ok, {} errors)", stats.total, stats.ok, stats.errors);
        Ok(stats)
    }
}

// ── Tests ──
