use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use super::metadata::{self, job_node, name_or_string, number, string_field, FieldError, FieldResult};
use crate::posting::BasicInfo;

const AMOUNT: &str = r"((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?[kK]?)";
const UNIT: &str = r"(?:\s*(?:/|per|an|a)\s*(year|yr|annum|hour|hr|month|mo|week|wk)\b|\s+(annually|yearly|hourly|monthly|weekly)\b)?";

static DOLLAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\$\s?{AMOUNT}(?:\s*(?:-|–|—|to)\s*\$?\s?{AMOUNT})?{UNIT}"
    ))
    .unwrap()
});
static LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:salary|compensation|pay)(?:\s+range)?\s*:\s*\$?\s?{AMOUNT}(?:\s*(?:-|–|—|to)\s*\$?\s?{AMOUNT})?{UNIT}"
    ))
    .unwrap()
});
static HYBRID_DAYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+)\s*(?:-\s*\d+\s*)?days?\s*(?:(?:per|a|/)\s*week\s*)?(?:in\s+(?:the\s+)?)?(?:office|on-?site)",
    )
    .unwrap()
});

/// Combine embedded metadata and visible text into scalar facts.
/// Metadata wins per field; text only fills what metadata left absent.
pub fn extract_basic_info(text: &str, metadata: Option<&Value>) -> BasicInfo {
    let mut info = BasicInfo::default();

    if let Some(node) = metadata.and_then(job_node) {
        info.title = settle("title", title(node));
        info.employment_type = settle("employmentType", employment_type(node));
        info.company = settle("hiringOrganization", company(node));
        info.location = settle("jobLocation", location(node));
        info.salary = settle("baseSalary", salary(node));
    }

    info.work_arrangement = work_arrangement(text);
    if info.salary.is_none() {
        info.salary = salary_from_text(text);
    }

    info
}

/// Collapse a field result to an option, logging why a present field was dropped.
fn settle(field: &str, result: FieldResult) -> Option<String> {
    match result {
        Ok(v) => v,
        Err(e) => {
            debug!(field, error = %e, "metadata field unusable");
            None
        }
    }
}

fn title(node: &Value) -> FieldResult {
    match string_field(node, "title")? {
        Some(t) => Ok(Some(t)),
        None => string_field(node, "name"),
    }
}

fn employment_type(node: &Value) -> FieldResult {
    match node.get("employmentType") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(metadata::clean(s)),
        Some(Value::Array(items)) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    Value::String(s) => parts.extend(metadata::clean(s)),
                    other => {
                        return Err(FieldError::UnexpectedType {
                            field: "employmentType",
                            found: metadata::type_name(other),
                        })
                    }
                }
            }
            Ok(metadata::clean(&parts.join(", ")))
        }
        Some(other) => Err(FieldError::UnexpectedType {
            field: "employmentType",
            found: metadata::type_name(other),
        }),
    }
}

fn company(node: &Value) -> FieldResult {
    match node.get("hiringOrganization") {
        None => Ok(None),
        Some(org) => name_or_string(org, "hiringOrganization"),
    }
}

fn location(node: &Value) -> FieldResult {
    let loc = match node.get("jobLocation") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => match items.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        Some(other) => other,
    };

    let address = match loc {
        Value::String(s) => return Ok(metadata::clean(s)),
        Value::Object(map) => map.get("address").unwrap_or(loc),
        other => {
            return Err(FieldError::UnexpectedType {
                field: "jobLocation",
                found: metadata::type_name(other),
            })
        }
    };

    match address {
        Value::String(s) => Ok(metadata::clean(s)),
        Value::Object(_) => {
            let mut parts = Vec::new();
            for key in ["addressLocality", "addressRegion", "addressCountry"] {
                if let Some(v) = address.get(key) {
                    parts.extend(name_or_string(v, "jobLocation.address")?);
                }
            }
            Ok(metadata::clean(&parts.join(", ")))
        }
        other => Err(FieldError::UnexpectedType {
            field: "jobLocation.address",
            found: metadata::type_name(other),
        }),
    }
}

fn salary(node: &Value) -> FieldResult {
    let base = match node.get("baseSalary") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => return Ok(metadata::clean(s)),
        Some(b @ Value::Object(_)) => b,
        Some(other) => {
            return Err(FieldError::UnexpectedType {
                field: "baseSalary",
                found: metadata::type_name(other),
            })
        }
    };

    let (min, max, unit) = match base.get("value") {
        Some(v @ Value::Object(_)) => {
            let single = v.get("value").map(|x| number(x, "baseSalary.value")).transpose()?.flatten();
            let min = v.get("minValue").map(|x| number(x, "baseSalary.minValue")).transpose()?.flatten();
            let max = v.get("maxValue").map(|x| number(x, "baseSalary.maxValue")).transpose()?.flatten();
            let unit = v
                .get("unitText")
                .or_else(|| base.get("unitText"))
                .and_then(Value::as_str)
                .map(str::to_string);
            (min.or(single), max.or(single), unit)
        }
        Some(v) => {
            let single = number(v, "baseSalary.value")?;
            let unit = base.get("unitText").and_then(Value::as_str).map(str::to_string);
            (single, single, unit)
        }
        None => return Ok(None),
    };

    Ok(format_salary_range(min, max, unit.as_deref()))
}

/// "$<min> - $<max> per <unit>"; `None` when both bounds are zero or absent.
pub fn format_salary_range(min: Option<f64>, max: Option<f64>, unit: Option<&str>) -> Option<String> {
    let min = min.filter(|v| *v > 0.0);
    let max = max.filter(|v| *v > 0.0);
    let mut out = match (min, max) {
        (None, None) => return None,
        (Some(a), Some(b)) if (a - b).abs() > f64::EPSILON => {
            format!("${} - ${}", format_amount(a), format_amount(b))
        }
        (Some(a), _) | (None, Some(a)) => format!("${}", format_amount(a)),
    };
    if let Some(unit) = unit.and_then(metadata::clean) {
        out.push_str(" per ");
        out.push_str(&unit.to_lowercase());
    }
    Some(out)
}

/// Whole dollars with thousands separators; cents only when present.
fn format_amount(v: f64) -> String {
    let cents = (v * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if frac == 0 {
        grouped
    } else {
        format!("{}.{:02}", grouped, frac)
    }
}

/// Remote / Hybrid / On-site, from visible text only.
pub fn work_arrangement(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let remote = lower.contains("remote");
    let hybrid = lower.contains("hybrid");

    if remote && !hybrid {
        return Some("Remote".to_string());
    }
    if hybrid {
        return Some(match HYBRID_DAYS_RE.captures(&lower) {
            Some(caps) => format!("Hybrid ({} days/week in office)", &caps[1]),
            None => "Hybrid".to_string(),
        });
    }
    if lower.contains("on-site") || lower.contains("onsite") || lower.contains("in-office") {
        return Some("On-site".to_string());
    }
    None
}

/// First salary-looking phrase in the text, formatted `$<low>[ - $<high>][ per <unit>]`.
pub fn salary_from_text(text: &str) -> Option<String> {
    first_salary(&DOLLAR_RE, text).or_else(|| first_salary(&LABELED_RE, text))
}

fn first_salary(re: &Regex, text: &str) -> Option<String> {
    re.captures_iter(text)
        .filter(|caps| !followed_by_magnitude(text, caps))
        .map(|caps| format_text_salary(&caps))
        .next()
}

// "$5M in funding", "$2 billion"
fn followed_by_magnitude(text: &str, caps: &Captures) -> bool {
    let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    let rest = text[end..].trim_start();
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            let word: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
            let word = word.to_lowercase();
            matches!(word.as_str(), "m" | "mm" | "b" | "bn" | "million" | "billion")
        }
        _ => false,
    }
}

fn format_text_salary(caps: &Captures) -> String {
    let mut out = format!("${}", &caps[1]);
    if let Some(high) = caps.get(2) {
        out.push_str(" - $");
        out.push_str(high.as_str());
    }
    let unit = caps.get(3).or_else(|| caps.get(4)).map(|m| normalize_unit(m.as_str()));
    if let Some(unit) = unit {
        out.push_str(" per ");
        out.push_str(unit);
    }
    out
}

fn normalize_unit(raw: &str) -> &'static str {
    match raw.to_lowercase().as_str() {
        "hour" | "hr" | "hourly" => "hour",
        "month" | "mo" | "monthly" => "month",
        "week" | "wk" | "weekly" => "week",
        _ => "year",
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_metadata() -> Value {
        json!({
            "@context": "https://schema.org/",
            "@type": "JobPosting",
            "title": "Senior Backend Engineer",
            "employmentType": "FULL_TIME",
            "hiringOrganization": {"@type": "Organization", "name": "Acme Robotics"},
            "jobLocation": [{
                "@type": "Place",
                "address": {
                    "addressLocality": "Austin",
                    "addressRegion": {"name": "TX"},
                    "addressCountry": {"@type": "Country", "name": "US"}
                }
            }],
            "baseSalary": {
                "@type": "MonetaryAmount",
                "currency": "USD",
                "value": {"minValue": 150000, "maxValue": 190000, "unitText": "YEAR"}
            }
        })
    }

    #[test]
    fn metadata_fields() {
        let info = extract_basic_info("", Some(&full_metadata()));
        assert_eq!(info.title.as_deref(), Some("Senior Backend Engineer"));
        assert_eq!(info.employment_type.as_deref(), Some("FULL_TIME"));
        assert_eq!(info.company.as_deref(), Some("Acme Robotics"));
        assert_eq!(info.location.as_deref(), Some("Austin, TX, US"));
        assert_eq!(info.salary.as_deref(), Some("$150,000 - $190,000 per year"));
        assert_eq!(info.work_arrangement, None);
    }

    #[test]
    fn metadata_salary_beats_text() {
        let text = "Pay: $40 - $50 per hour. Remote friendly.";
        let info = extract_basic_info(text, Some(&full_metadata()));
        assert_eq!(info.salary.as_deref(), Some("$150,000 - $190,000 per year"));
        assert_eq!(info.work_arrangement.as_deref(), Some("Remote"));
    }

    #[test]
    fn company_as_plain_string() {
        let meta = json!({"hiringOrganization": "  Initech ", "title": "QA"});
        let info = extract_basic_info("", Some(&meta));
        assert_eq!(info.company.as_deref(), Some("Initech"));
    }

    #[test]
    fn malformed_field_does_not_blank_siblings() {
        let meta = json!({
            "title": ["not", "a", "string"],
            "hiringOrganization": {"name": "Globex"},
            "jobLocation": {"address": {"addressLocality": 12}},
            "baseSalary": {"value": {"minValue": "lots", "maxValue": 10}},
            "employmentType": ["FULL_TIME", "CONTRACTOR"]
        });
        let info = extract_basic_info("", Some(&meta));
        assert_eq!(info.title, None);
        assert_eq!(info.location, None);
        assert_eq!(info.salary, None);
        assert_eq!(info.company.as_deref(), Some("Globex"));
        assert_eq!(info.employment_type.as_deref(), Some("FULL_TIME, CONTRACTOR"));
    }

    #[test]
    fn title_falls_back_to_name() {
        let meta = json!({"@type": "JobPosting", "name": "Platform Engineer"});
        let info = extract_basic_info("", Some(&meta));
        assert_eq!(info.title.as_deref(), Some("Platform Engineer"));
    }

    #[test]
    fn location_string_address() {
        let meta = json!({"jobLocation": {"address": "Berlin, Germany"}});
        let info = extract_basic_info("", Some(&meta));
        assert_eq!(info.location.as_deref(), Some("Berlin, Germany"));
    }

    #[test]
    fn zero_salary_bounds_are_omitted() {
        let meta = json!({"baseSalary": {"value": {"minValue": 0, "maxValue": 0, "unitText": "YEAR"}}});
        let info = extract_basic_info("Salary: $95,000 per year", Some(&meta));
        // metadata produced nothing, so text fills in
        assert_eq!(info.salary.as_deref(), Some("$95,000 per year"));
    }

    #[test]
    fn single_value_salary() {
        assert_eq!(
            format_salary_range(Some(55.5), None, Some("HOUR")),
            Some("$55.50 per hour".to_string())
        );
        assert_eq!(format_salary_range(None, None, Some("YEAR")), None);
        assert_eq!(
            format_salary_range(Some(1_250_000.0), Some(1_250_000.0), None),
            Some("$1,250,000".to_string())
        );
    }

    #[test]
    fn work_arrangement_rules() {
        assert_eq!(work_arrangement("This role is fully Remote."), Some("Remote".into()));
        assert_eq!(
            work_arrangement("Hybrid role, 3 days per week in office in NYC. Remote on Fridays."),
            Some("Hybrid (3 days/week in office)".into())
        );
        assert_eq!(
            work_arrangement("We work hybrid: 2 days on-site."),
            Some("Hybrid (2 days/week in office)".into())
        );
        assert_eq!(work_arrangement("Hybrid schedule."), Some("Hybrid".into()));
        assert_eq!(work_arrangement("Onsite in Denver."), Some("On-site".into()));
        assert_eq!(work_arrangement("We value in-office collaboration."), Some("On-site".into()));
    }

    #[test]
    fn no_keyword_means_absent_arrangement() {
        let info = extract_basic_info("Build services. Ship features. Write tests.", None);
        assert_eq!(info.work_arrangement, None);
        assert_eq!(info, BasicInfo::default());
    }

    #[test]
    fn text_salary_formats() {
        assert_eq!(
            salary_from_text("The range is $120,000 - $150,000 per year plus equity."),
            Some("$120,000 - $150,000 per year".into())
        );
        assert_eq!(salary_from_text("Earn $45/hr."), Some("$45 per hour".into()));
        assert_eq!(salary_from_text("Base of $130k to $160k annually"), Some("$130k - $160k per year".into()));
        assert_eq!(
            salary_from_text("Compensation: 90,000 - 110,000"),
            Some("$90,000 - $110,000".into())
        );
        assert_eq!(salary_from_text("No numbers here"), None);
    }

    #[test]
    fn funding_amounts_are_not_salaries() {
        assert_eq!(
            salary_from_text("We raised $40M from great investors. Pay is $60 an hour."),
            Some("$60 per hour".into())
        );
    }
}
