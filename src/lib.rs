//! Extract structured job postings from rendered career pages.
//!
//! `fetcher` renders a page in headless Chrome, `parser` turns the visible text and
//! embedded metadata into a [`JobPosting`], and `scraper` ties the two together so a
//! failed page degrades to an empty record instead of an error.

pub mod config;
pub mod fetcher;
pub mod html;
pub mod parser;
pub mod posting;
pub mod scraper;

pub use crate::config::Settings;
pub use crate::fetcher::{BrowserDriver, BrowserSession, ChromeDriver, FetchConfig, FetchError, RawPage, WaitUntil};
pub use crate::parser::process_page;
pub use crate::posting::{validate_for_generation, BasicInfo, JobInfoError, JobPosting, SectionCategory, Sections};
pub use crate::scraper::{scrape, ScrapeRow, ScrapeStats, Scraper};
