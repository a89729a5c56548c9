use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::items::split_items;
use crate::posting::{SectionCategory, Sections};

/// Heading phrases per category, tried in order. Fragments are regex, matched case-insensitively.
pub const HEADING_RULES: &[(SectionCategory, &[&str])] = &[
    (
        SectionCategory::Responsibilities,
        &[
            r"(?:key |your |job |core |primary )?responsibilities",
            r"what you['’]?ll do",
            r"what you will do",
            r"what you['’]?ll be doing",
            r"what you will be doing",
            r"about the role",
            r"about the job",
            r"the role",
            r"your role",
            r"role overview",
            r"role description",
            r"in this role(?:,? you will)?",
            r"day[- ]to[- ]day",
            r"(?:job |key )?duties",
            r"your impact",
            r"what you['’]?ll work on",
        ],
    ),
    (
        SectionCategory::Requirements,
        &[
            r"(?:minimum |basic |job )?requirements",
            r"(?:minimum |basic |required |key )?qualifications",
            r"what you['’]?ll need",
            r"what you need",
            r"what we['’]?re looking for",
            r"what we are looking for",
            r"who you are",
            r"what you bring",
            r"must[- ]haves?",
            r"skills (?:and|&) experience",
            r"(?:required )?skills",
            r"about you",
            r"you have",
            r"you might be a (?:good |great )?fit if",
        ],
    ),
    (
        SectionCategory::Preferred,
        &[
            r"preferred (?:qualifications|skills|experience)",
            r"preferred",
            r"nice[- ]to[- ]haves?",
            r"bonus(?: points)?(?: if you have)?",
            r"(?:it['’]?s )?a plus if",
            r"pluses",
            r"extra credit",
            r"ideally,? you have",
        ],
    ),
    (
        SectionCategory::Benefits,
        &[
            r"benefits",
            r"(?:compensation|salary) (?:and|&) benefits",
            r"perks(?: (?:and|&) benefits)?",
            r"benefits (?:and|&) perks",
            r"what we offer",
            r"what['’]?s in it for you",
            r"why join us",
            r"why you['’]?ll love (?:it here|working here)",
            r"total rewards",
        ],
    ),
    (
        SectionCategory::AboutCompany,
        &[
            r"about us",
            r"about the company",
            r"about the team",
            r"about our team",
            r"who we are",
            r"our mission",
            r"our story",
            r"company overview",
            r"company description",
            r"life at [\w&.' -]{2,40}",
        ],
    ),
];

struct HeadingRule {
    category: SectionCategory,
    re: Regex,
}

static RULES: LazyLock<Vec<HeadingRule>> = LazyLock::new(|| {
    HEADING_RULES
        .iter()
        .flat_map(|(category, phrases)| {
            phrases.iter().map(move |phrase| HeadingRule {
                category: *category,
                re: heading_regex(phrase).unwrap(),
            })
        })
        .collect()
});

/// Line start, optional markdown/bullet marker, the phrase, then `:` / `-` / end of line.
pub fn heading_regex(phrase: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?im)^[ \t]*(?:#{{1,6}}[ \t]*)?(?:[•*][ \t]*)?(?:{phrase})[ \t]*(?::|[-–—](?:[ \t]|$)|$)"
    ))
}

/// One detected heading occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPosition {
    pub category: SectionCategory,
    pub match_start: usize,
    pub content_start: usize,
    pub header_text: String,
}

/// All heading occurrences, ordered by `content_start` (stable for ties).
pub fn find_positions(text: &str) -> Vec<SectionPosition> {
    let mut seen: HashSet<(SectionCategory, usize)> = HashSet::new();
    let mut positions = Vec::new();

    for rule in RULES.iter() {
        for m in rule.re.find_iter(text) {
            if !seen.insert((rule.category, m.start())) {
                continue;
            }
            positions.push(SectionPosition {
                category: rule.category,
                match_start: m.start(),
                content_start: m.end(),
                header_text: m.as_str().trim().to_string(),
            });
        }
    }

    positions.sort_by_key(|p| p.content_start);
    positions
}

/// Slice text between consecutive headings into per-category line items.
pub fn segment(text: &str) -> Sections {
    let text = text.replace("\r\n", "\n");
    let positions = find_positions(&text);
    let mut sections = Sections::default();

    for (i, pos) in positions.iter().enumerate() {
        let end = positions
            .get(i + 1)
            .map(|next| next.match_start)
            .unwrap_or(text.len());
        if end <= pos.content_start {
            continue;
        }
        let items = split_items(&text[pos.content_start..end]);
        sections.get_mut(pos.category).extend(items);
    }

    sections
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "What you'll do\n\
        Build scalable backend services for our platform.\n\
        Collaborate with cross-functional teams on system design.\n\
        \n\
        Requirements\n\
        5+ years of experience with distributed systems.\n\
        Strong knowledge of Python and Go.\n";

    #[test]
    fn basic_two_sections() {
        let s = segment(BASIC);
        assert_eq!(
            s.responsibilities,
            vec![
                "Build scalable backend services for our platform.",
                "Collaborate with cross-functional teams on system design.",
            ]
        );
        assert_eq!(
            s.requirements,
            vec![
                "5+ years of experience with distributed systems.",
                "Strong knowledge of Python and Go.",
            ]
        );
        assert!(s.preferred.is_empty());
        assert!(s.benefits.is_empty());
        assert!(s.about_company.is_empty());
    }

    #[test]
    fn short_noise_dropped_long_item_kept() {
        let text = "Responsibilities\nRemote\nDesign and own the checkout API end-to-end.\n";
        let s = segment(text);
        assert_eq!(s.responsibilities, vec!["Design and own the checkout API end-to-end."]);
    }

    #[test]
    fn segment_is_idempotent() {
        assert_eq!(segment(BASIC), segment(BASIC));
    }

    #[test]
    fn no_headings_yields_empty_sections() {
        let s = segment("We are a company.\nWe build things for people who like things.\n");
        assert!(s.is_empty());
    }

    #[test]
    fn later_heading_of_any_category_ends_span() {
        let text = "About us\n\
            Acme builds logistics software for small shippers.\n\
            Benefits:\n\
            • Health, dental, and vision insurance.\n\
            • Generous parental leave for all parents.\n\
            Nice to have\n\
            Experience with Kubernetes operators in production.\n";
        let s = segment(text);
        assert_eq!(s.about_company, vec!["Acme builds logistics software for small shippers."]);
        assert_eq!(
            s.benefits,
            vec!["Health, dental, and vision insurance.", "Generous parental leave for all parents."]
        );
        assert_eq!(s.preferred, vec!["Experience with Kubernetes operators in production."]);
    }

    #[test]
    fn same_category_accumulates_across_occurrences() {
        let text = "Responsibilities\n\
            Write reliable code for the ingestion pipeline.\n\
            Benefits\n\
            Unlimited PTO and a home office stipend.\n\
            Key Responsibilities\n\
            Review pull requests from the wider team.\n";
        let s = segment(text);
        assert_eq!(
            s.responsibilities,
            vec![
                "Write reliable code for the ingestion pipeline.",
                "Review pull requests from the wider team.",
            ]
        );
        assert_eq!(s.benefits, vec!["Unlimited PTO and a home office stipend."]);
    }

    #[test]
    fn inline_colon_heading_keeps_same_line_content() {
        let text = "Requirements: 3+ years building web applications.\n";
        let s = segment(text);
        assert_eq!(s.requirements, vec!["3+ years building web applications."]);
    }

    #[test]
    fn heading_words_inside_sentences_are_not_headings() {
        let text = "Requirements gathering with stakeholders is part of the job.\n\
            The benefits of our approach are clear to everyone.\n";
        assert!(find_positions(text).is_empty());
    }

    #[test]
    fn markdown_and_curly_apostrophe_headings() {
        let text = "## What you’ll do\nShip features to millions of users each week.\n\
            ### Preferred Qualifications -\nPrior startup experience, ideally early stage.\n";
        let positions = find_positions(text);
        let cats: Vec<SectionCategory> = positions.iter().map(|p| p.category).collect();
        assert_eq!(cats, vec![SectionCategory::Responsibilities, SectionCategory::Preferred]);
        let s = segment(text);
        assert_eq!(s.responsibilities, vec!["Ship features to millions of users each week."]);
        assert_eq!(s.preferred, vec!["Prior startup experience, ideally early stage."]);
    }

    #[test]
    fn positions_sorted_by_content_start() {
        let positions = find_positions(BASIC);
        assert_eq!(positions.len(), 2);
        assert!(positions[0].content_start < positions[1].content_start);
        assert_eq!(positions[0].header_text, "What you'll do");
        assert_eq!(positions[1].match_start, BASIC.find("Requirements").unwrap());
    }

    #[test]
    fn every_rule_compiles_and_matches_its_own_heading() {
        let samples = [
            ("Responsibilities", SectionCategory::Responsibilities),
            ("What You Will Be Doing:", SectionCategory::Responsibilities),
            ("Basic Qualifications", SectionCategory::Requirements),
            ("What we're looking for", SectionCategory::Requirements),
            ("Bonus points if you have", SectionCategory::Preferred),
            ("Perks & Benefits", SectionCategory::Benefits),
            ("What we offer", SectionCategory::Benefits),
            ("Life at Acme", SectionCategory::AboutCompany),
            ("Who we are", SectionCategory::AboutCompany),
        ];
        for (heading, expected) in samples {
            let found = find_positions(&format!("{heading}\n"));
            assert!(
                found.iter().any(|p| p.category == expected),
                "{heading} not detected as {expected:?}"
            );
        }
    }

    #[test]
    fn crlf_text_is_handled() {
        let s = segment(&BASIC.replace('\n', "\r\n"));
        assert_eq!(s.requirements.len(), 2);
    }

    #[test]
    fn fixture_sections() {
        let html = std::fs::read_to_string("tests/fixtures/posting.html").unwrap();
        let text = crate::html::visible_text(&html);
        let s = segment(&text);
        assert_eq!(s.responsibilities.len(), 3);
        assert_eq!(s.requirements.len(), 3);
        assert_eq!(s.preferred.len(), 2);
        assert_eq!(s.benefits.len(), 3);
        assert_eq!(s.about_company.len(), 1);
        assert!(s
            .benefits
            .iter()
            .all(|b| !b.to_lowercase().contains("cookie")));
    }
}
