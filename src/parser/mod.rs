pub mod basic_info;
pub mod items;
pub mod metadata;
pub mod sections;
pub mod skills;

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::fetcher::RawPage;
use crate::posting::{truncate_chars, JobPosting};

/// Three independent passes over one page: basic info, sections, skills.
/// A pass that fails contributes its default; the others still land.
pub fn process_page(page: &RawPage, raw_text_limit: usize) -> JobPosting {
    let text = page.visible_text.as_str();

    let info = isolate("basic_info", Default::default(), || {
        basic_info::extract_basic_info(text, page.structured_metadata.as_ref())
    });
    let sections = isolate("sections", Default::default(), || sections::segment(text));
    let skills = isolate("skills", Vec::new(), || skills::extract_skills(text));

    let raw_text = truncate_chars(text.trim(), raw_text_limit).to_string();
    JobPosting::new(&page.url, info, sections, skills, raw_text)
}

/// Run one extraction pass, falling back to `default` if it panics.
pub fn isolate<T, F>(stage: &str, default: T, f: F) -> T
where
    F: FnOnce() -> T,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(stage, %reason, "extraction stage failed; using defaults");
            default
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::raw_page_from_html;

    #[test]
    fn fixture_end_to_end() {
        let html = std::fs::read_to_string("tests/fixtures/posting.html").unwrap();
        let page = raw_page_from_html("https://careers.acme.test/jobs/42", &html);
        let p = process_page(&page, 15_000);

        assert_eq!(p.url, "https://careers.acme.test/jobs/42");
        assert_eq!(p.title.as_deref(), Some("Senior Rust Engineer"));
        assert_eq!(p.company.as_deref(), Some("Acme Robotics"));
        assert_eq!(p.location.as_deref(), Some("Austin, TX, US"));
        assert_eq!(p.employment_type.as_deref(), Some("FULL_TIME"));
        assert_eq!(p.salary.as_deref(), Some("$160,000 - $195,000 per year"));
        assert_eq!(p.work_arrangement.as_deref(), Some("Hybrid (3 days/week in office)"));
        assert_eq!(p.responsibilities[0], "Design and own the fleet telemetry pipeline end-to-end.");
        assert_eq!(p.preferred_qualifications.len(), 2);
        assert_eq!(p.about_company.len(), 1);
        for skill in ["AWS", "Kubernetes", "PostgreSQL", "Rust", "Tokio"] {
            assert!(p.skills_mentioned.contains(&skill.to_string()), "missing {skill}");
        }
        assert!(p.raw_text.starts_with("Home\nJobs\nSign in"));
    }

    #[test]
    fn heading_offsets_index_raw_text() {
        let html = std::fs::read_to_string("tests/fixtures/posting.html").unwrap();
        let page = raw_page_from_html("https://careers.acme.test/jobs/42", &html);
        let p = process_page(&page, 15_000);

        let positions = sections::find_positions(&p.raw_text);
        assert!(positions.len() >= 5);
        for pos in &positions {
            assert_eq!(p.raw_text[pos.match_start..pos.content_start].trim(), pos.header_text);
        }
    }

    #[test]
    fn raw_text_survives_when_no_sections() {
        let page = RawPage {
            url: "https://x.test/1".into(),
            visible_text: "We are hiring a barista.\nCome say hi at the shop.".into(),
            structured_metadata: None,
        };
        let p = process_page(&page, 15_000);
        assert!(!p.has_sections());
        assert!(!p.raw_text.is_empty());
        assert_eq!(p.substantive_text(), Some("We are hiring a barista.\nCome say hi at the shop."));
    }

    #[test]
    fn raw_text_is_capped() {
        let page = RawPage {
            url: "https://x.test/1".into(),
            visible_text: "ab".repeat(100),
            structured_metadata: None,
        };
        assert_eq!(process_page(&page, 10).raw_text, "ababababab");
    }

    #[test]
    fn isolate_recovers_from_panics() {
        let v: Vec<String> = isolate("boom", vec!["fallback".into()], || panic!("bad regex state"));
        assert_eq!(v, vec!["fallback"]);
        assert_eq!(isolate("ok", 0, || 7), 7);
    }
}
