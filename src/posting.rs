use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cap on raw text handed to generation when no section was detected.
pub const PROMPT_RAW_TEXT_LIMIT: usize = 3000;

/// Scalar facts about the posting. Every field is a trimmed non-empty string or `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    pub work_arrangement: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    Responsibilities,
    Requirements,
    Preferred,
    Benefits,
    AboutCompany,
}

impl SectionCategory {
    pub const ALL: [SectionCategory; 5] = [
        SectionCategory::Responsibilities,
        SectionCategory::Requirements,
        SectionCategory::Preferred,
        SectionCategory::Benefits,
        SectionCategory::AboutCompany,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SectionCategory::Responsibilities => "Responsibilities",
            SectionCategory::Requirements => "Requirements",
            SectionCategory::Preferred => "Preferred Qualifications",
            SectionCategory::Benefits => "Benefits",
            SectionCategory::AboutCompany => "About the Company",
        }
    }
}

/// Line items per category, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub preferred: Vec<String>,
    pub benefits: Vec<String>,
    pub about_company: Vec<String>,
}

impl Sections {
    pub fn get(&self, category: SectionCategory) -> &[String] {
        match category {
            SectionCategory::Responsibilities => &self.responsibilities,
            SectionCategory::Requirements => &self.requirements,
            SectionCategory::Preferred => &self.preferred,
            SectionCategory::Benefits => &self.benefits,
            SectionCategory::AboutCompany => &self.about_company,
        }
    }

    pub fn get_mut(&mut self, category: SectionCategory) -> &mut Vec<String> {
        match category {
            SectionCategory::Responsibilities => &mut self.responsibilities,
            SectionCategory::Requirements => &mut self.requirements,
            SectionCategory::Preferred => &mut self.preferred,
            SectionCategory::Benefits => &mut self.benefits,
            SectionCategory::AboutCompany => &mut self.about_company,
        }
    }

    pub fn is_empty(&self) -> bool {
        SectionCategory::ALL.iter().all(|c| self.get(*c).is_empty())
    }
}

/// The normalized record handed to the generation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub url: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    pub work_arrangement: Option<String>,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub preferred_qualifications: Vec<String>,
    pub benefits: Vec<String>,
    pub about_company: Vec<String>,
    pub skills_mentioned: Vec<String>,
    pub raw_text: String,
}

impl JobPosting {
    /// Record returned when the page could not be fetched at all.
    pub fn empty(url: &str) -> Self {
        JobPosting {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn new(
        url: &str,
        info: BasicInfo,
        sections: Sections,
        skills: Vec<String>,
        raw_text: String,
    ) -> Self {
        JobPosting {
            url: url.to_string(),
            title: info.title,
            company: info.company,
            location: info.location,
            employment_type: info.employment_type,
            salary: info.salary,
            work_arrangement: info.work_arrangement,
            responsibilities: sections.responsibilities,
            requirements: sections.requirements,
            preferred_qualifications: sections.preferred,
            benefits: sections.benefits,
            about_company: sections.about_company,
            skills_mentioned: skills,
            raw_text,
        }
    }

    fn section(&self, category: SectionCategory) -> &[String] {
        match category {
            SectionCategory::Responsibilities => &self.responsibilities,
            SectionCategory::Requirements => &self.requirements,
            SectionCategory::Preferred => &self.preferred_qualifications,
            SectionCategory::Benefits => &self.benefits,
            SectionCategory::AboutCompany => &self.about_company,
        }
    }

    pub fn has_sections(&self) -> bool {
        SectionCategory::ALL
            .iter()
            .any(|c| !self.section(*c).is_empty())
    }

    /// Raw text prefix used as the description body when no section was found.
    pub fn substantive_text(&self) -> Option<&str> {
        if self.has_sections() {
            return None;
        }
        let text = self.raw_text.trim();
        if text.is_empty() {
            None
        } else {
            Some(truncate_chars(text, PROMPT_RAW_TEXT_LIMIT))
        }
    }

    /// Plain-text job description for the generation prompt.
    pub fn to_prompt_text(&self) -> String {
        let mut out = Vec::new();

        let facts = [
            ("Job Title", &self.title),
            ("Company", &self.company),
            ("Location", &self.location),
            ("Employment Type", &self.employment_type),
            ("Salary", &self.salary),
            ("Work Arrangement", &self.work_arrangement),
        ];
        for (label, value) in facts {
            if let Some(v) = value {
                out.push(format!("{}: {}", label, v));
            }
        }

        for category in SectionCategory::ALL {
            let items = self.section(category);
            if items.is_empty() {
                continue;
            }
            out.push(String::new());
            out.push(format!("{}:", category.label()));
            out.extend(items.iter().map(|i| format!("- {}", i)));
        }

        if let Some(text) = self.substantive_text() {
            out.push(String::new());
            out.push("Job Description:".to_string());
            out.push(text.to_string());
        }

        if !self.skills_mentioned.is_empty() {
            out.push(String::new());
            out.push(format!("Skills Mentioned: {}", self.skills_mentioned.join(", ")));
        }

        out.join("\n").trim().to_string()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobInfoError {
    #[error("could not detect the company name for {0}")]
    MissingCompany(String),
    #[error("could not detect the job title for {0}")]
    MissingTitle(String),
}

/// Generation needs at least a company and a title. Extraction never calls this.
pub fn validate_for_generation(posting: &JobPosting) -> Result<(), JobInfoError> {
    if posting.company.is_none() {
        return Err(JobInfoError::MissingCompany(posting.url.clone()));
    }
    if posting.title.is_none() {
        return Err(JobInfoError::MissingTitle(posting.url.clone()));
    }
    Ok(())
}

/// Char-boundary safe prefix.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Tests ──
