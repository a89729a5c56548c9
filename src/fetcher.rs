use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::parser::metadata::parse_metadata;

const READY_POLL: Duration = Duration::from_millis(100);

/// Visible text: DOM-order text nodes outside script/style/noscript/iframe and hidden elements.
pub const VISIBLE_TEXT_SCRIPT: &str = r#"(() => {
  const SKIP = new Set(["SCRIPT", "STYLE", "NOSCRIPT", "IFRAME", "TEMPLATE", "SVG"]);
  const hidden = (el) => {
    for (let n = el; n && n.nodeType === 1; n = n.parentElement) {
      if (SKIP.has(n.tagName.toUpperCase())) return true;
      const cs = window.getComputedStyle(n);
      if (cs.display === "none" || cs.visibility === "hidden") return true;
    }
    return false;
  };
  const root = document.body || document.documentElement;
  if (!root) return "";
  const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
  const out = [];
  while (walker.nextNode()) {
    const node = walker.currentNode;
    const text = node.nodeValue.replace(/\s+/g, " ").trim();
    if (text && node.parentElement && !hidden(node.parentElement)) out.push(text);
  }
  return out.join("\n");
})()"#;

/// Raw text of the first embedded JSON-LD block, or "".
pub const METADATA_SCRIPT: &str = r#"(() => {
  const el = document.querySelector('script[type="application/ld+json"]');
  return el ? el.textContent : "";
})()"#;

const READY_STATE_SCRIPT: &str =
    r#"document.location.href === "about:blank" ? "loading" : document.readyState"#;

/// One rendered page. Transient: consumed by the parser and dropped.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    pub url: String,
    pub visible_text: String,
    pub structured_metadata: Option<Value>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("navigation to {url} timed out after {after_ms}ms")]
    Timeout { url: String, after_ms: u64 },
    #[error("page script failed: {0}")]
    Script(String),
    #[error("browser driver panicked while fetching {0}")]
    Panicked(String),
}

/// How long navigation waits before the page counts as loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// DOM parsed; slow trackers and ads are not waited for.
    #[default]
    DomContentLoaded,
    /// Full load event.
    Load,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub nav_timeout: Duration,
    pub settle_delay: Duration,
    pub wait_until: WaitUntil,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            nav_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(2500),
            wait_until: WaitUntil::DomContentLoaded,
        }
    }
}

impl FetchConfig {
    /// Upper bound on one fetch: navigation plus settle, plus a small grace for launch/teardown.
    pub fn wall_clock_budget(&self) -> Duration {
        self.nav_timeout + self.settle_delay + Duration::from_secs(10)
    }
}

/// An isolated browsing context, used for exactly one page.
pub trait BrowserSession {
    fn navigate(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<(), FetchError>;
    fn evaluate(&mut self, script: &str) -> Result<String, FetchError>;
    fn close(self: Box<Self>);
}

pub trait BrowserDriver: Send + Sync {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// Render `url` and pull its visible text and embedded metadata.
/// Blocking: launches and tears down a browser per call.
pub fn fetch(driver: &dyn BrowserDriver, url: &str, config: &FetchConfig) -> Result<RawPage, FetchError> {
    validate_url(url)?;
    let start = Instant::now();

    let mut session = driver.launch()?;
    let result = load_page(session.as_mut(), url, config);
    session.close();
    let page = result?;

    info!(
        url,
        chars = page.visible_text.len(),
        has_metadata = page.structured_metadata.is_some(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "page fetched"
    );
    Ok(page)
}

fn load_page(session: &mut dyn BrowserSession, url: &str, config: &FetchConfig) -> Result<RawPage, FetchError> {
    session.navigate(url, config.wait_until, config.nav_timeout)?;
    if !config.settle_delay.is_zero() {
        std::thread::sleep(config.settle_delay);
    }

    let visible_text = session.evaluate(VISIBLE_TEXT_SCRIPT)?;
    let structured_metadata = match session.evaluate(METADATA_SCRIPT) {
        Ok(raw) => parse_metadata(&raw),
        Err(e) => {
            debug!(url, error = %e, "metadata script failed; continuing without metadata");
            None
        }
    };

    Ok(RawPage {
        url: url.to_string(),
        visible_text,
        structured_metadata,
    })
}

pub fn validate_url(url: &str) -> Result<(), FetchError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

// ── headless Chrome ──

/// Launches a fresh Chrome process per page.
#[derive(Debug, Clone)]
pub struct ChromeDriver {
    pub headless: bool,
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub idle_timeout: Duration,
}

impl Default for ChromeDriver {
    fn default() -> Self {
        ChromeDriver {
            headless: true,
            sandbox: true,
            chrome_path: None,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl BrowserDriver for ChromeDriver {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let options = LaunchOptions {
            headless: self.headless,
            sandbox: self.sandbox,
            path: self.chrome_path.clone(),
            idle_browser_timeout: self.idle_timeout,
            window_size: Some((1366, 900)),
            ..Default::default()
        };
        let browser = Browser::new(options).map_err(|e| FetchError::Launch(e.to_string()))?;
        let tab = browser
            .new_context()
            .and_then(|ctx| ctx.new_tab())
            .map_err(|e| FetchError::Launch(e.to_string()))?;
        Ok(Box::new(ChromeSession { browser, tab }))
    }
}

struct ChromeSession {
    // dropping the browser kills the process
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    fn wait_for_dom(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        poll_until_ready(url, timeout, READY_POLL, || self.evaluate(READY_STATE_SCRIPT))
    }
}

/// Poll `ready_state` until the DOM is parsed. Evaluate errors count as still loading:
/// right after navigation the old execution context is gone before the new one exists.
fn poll_until_ready<F>(url: &str, timeout: Duration, every: Duration, mut ready_state: F) -> Result<(), FetchError>
where
    F: FnMut() -> Result<String, FetchError>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match ready_state() {
            Ok(state) if state == "interactive" || state == "complete" => return Ok(()),
            Ok(_) => {}
            Err(e) => debug!(url, error = %e, "readyState not available yet"),
        }
        if Instant::now() >= deadline {
            return Err(FetchError::Timeout {
                url: url.to_string(),
                after_ms: timeout.as_millis() as u64,
            });
        }
        std::thread::sleep(every);
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<(), FetchError> {
        self.tab.set_default_timeout(timeout);
        let nav_err = |e: anyhow::Error| classify_nav_error(url, timeout, e);

        self.tab.navigate_to(url).map_err(nav_err)?;
        match wait {
            WaitUntil::Load => self.tab.wait_until_navigated().map(|_| ()).map_err(nav_err),
            WaitUntil::DomContentLoaded => self.wait_for_dom(url, timeout),
        }
    }

    fn evaluate(&mut self, script: &str) -> Result<String, FetchError> {
        let remote = self
            .tab
            .evaluate(script, false)
            .map_err(|e| FetchError::Script(e.to_string()))?;
        Ok(match remote.value {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }

    fn close(self: Box<Self>) {
        if let Err(e) = self.tab.close(false) {
            debug!(error = %e, "tab close failed");
        }
        drop(self.browser);
    }
}

fn classify_nav_error(url: &str, timeout: Duration, e: anyhow::Error) -> FetchError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        FetchError::Timeout {
            url: url.to_string(),
            after_ms: timeout.as_millis() as u64,
        }
    } else {
        FetchError::Navigation {
            url: url.to_string(),
            message,
        }
    }
}

// ── Test double ──


// ── Tests ──
