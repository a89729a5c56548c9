use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// A named alternation of related technologies.
pub struct SkillGroup {
    pub name: &'static str,
    pub pattern: &'static str,
    pub case_insensitive: bool,
}

pub const SKILL_GROUPS: &[SkillGroup] = &[
    SkillGroup {
        name: "languages",
        pattern: r"\b(?:python|java|javascript|typescript|kotlin|scala|ruby|php|perl|haskell|clojure|erlang|golang|matlab|lua|objective-c|bash|powershell|sql|graphql|solidity|fortran|cobol)\b|\bc\+\+|\bc#|\bf#",
        case_insensitive: true,
    },
    SkillGroup {
        // ordinary English words; only the capitalized spelling counts
        name: "ambiguous_languages",
        pattern: r"\b(?:Go|Rust|Swift|Dart|Elixir|Julia|Spark|Express|Rails|R)\b",
        case_insensitive: false,
    },
    SkillGroup {
        name: "frameworks",
        pattern: r"\b(?:react(?: native)?|angular|vue(?:\.js)?|svelte|django|fastapi|spring boot|spring framework|laravel|ruby on rails|flask|node\.js|nodejs|next\.js|nestjs|deno|\.net|asp\.net|flutter|jquery|tailwind(?:css)?|redux|grpc|tokio|actix|axum|pandas|numpy)\b|\B\.net\b",
        case_insensitive: true,
    },
    SkillGroup {
        name: "cloud_infra",
        pattern: r"\b(?:aws|amazon web services|gcp|google cloud(?: platform)?|azure|kubernetes|k8s|docker|terraform|ansible|pulumi|helm|openshift|lambda|ec2|s3|cloudformation|serverless|nginx|linux|unix|ci/cd|jenkins|github actions|gitlab ci|circleci|argo ?cd|prometheus|grafana|datadog|splunk|new relic|opentelemetry)\b",
        case_insensitive: true,
    },
    SkillGroup {
        name: "data_stores",
        pattern: r"\b(?:postgres(?:ql)?|mysql|mariadb|sqlite|mongodb|redis|cassandra|dynamodb|elasticsearch|opensearch|snowflake|bigquery|redshift|clickhouse|cockroachdb|neo4j|kafka|rabbitmq|pulsar|kinesis|airflow|dbt|databricks|hadoop|hive|flink|spark streaming)\b",
        case_insensitive: true,
    },
    SkillGroup {
        name: "protocols",
        pattern: r"\b(?:restful(?: apis?)?|rest apis?|http/2|http|tcp/ip|tcp|udp|websockets?|oauth ?2?(?:\.0)?|openid connect|saml|json|protobuf|protocol buffers|soap|mqtt|dns|tls|ssl)\b",
        case_insensitive: true,
    },
    SkillGroup {
        name: "ml",
        pattern: r"\b(?:machine learning|deep learning|pytorch|tensorflow|keras|scikit-learn|sklearn|xgboost|hugging ?face|transformers|llms?|large language models?|nlp|natural language processing|computer vision|reinforcement learning|langchain|rag|mlops|generative ai|genai)\b",
        case_insensitive: true,
    },
    SkillGroup {
        name: "practices",
        pattern: r"\b(?:agile|scrum|kanban|tdd|test-driven development|devops|sre|microservices|distributed systems|system design|object-oriented|functional programming|code review|pair programming|git|unit testing|observability|event-driven)\b",
        case_insensitive: true,
    },
    SkillGroup {
        name: "security",
        pattern: r"\b(?:owasp|penetration testing|pen testing|siem|soc 2|soc2|iso 27001|zero trust|iam|encryption|pki|vulnerability management|threat modeling|incident response|gdpr|hipaa|pci(?:-dss)?)\b",
        case_insensitive: true,
    },
];

/// Capitalised words that open a non-skill phrase: "R&D", "Go-to-market".
const FALSE_FRIENDS: &[(&str, &[&str])] = &[("R", &["&", " & D", " and D"]), ("Go", &["-to-", " to market"])];

fn is_false_friend(text: &str, start: usize, matched: &str) -> bool {
    let rest = &text[start + matched.len()..];
    FALSE_FRIENDS
        .iter()
        .filter(|(word, _)| *word == matched)
        .any(|(_, followers)| followers.iter().any(|f| rest.starts_with(f)))
}

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SKILL_GROUPS
        .iter()
        .map(|g| {
            RegexBuilder::new(g.pattern)
                .case_insensitive(g.case_insensitive)
                .build()
                .unwrap_or_else(|e| panic!("skill group `{}` does not compile: {e}", g.name))
        })
        .collect()
});

/// Skills mentioned in `text`, deduplicated case-insensitively.
/// The first spelling seen in document order is kept; output is sorted case-insensitively.
pub fn extract_skills(text: &str) -> Vec<String> {
    let mut hits: Vec<(usize, &str)> = COMPILED
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.as_str())))
        .filter(|(start, raw)| !is_false_friend(text, *start, raw))
        .collect();
    // document order decides which spelling wins
    hits.sort_by_key(|(start, _)| *start);

    let mut canonical: HashMap<String, String> = HashMap::new();
    for (_, raw) in hits {
        let label = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        canonical.entry(label.to_lowercase()).or_insert(label);
    }

    let mut skills: Vec<String> = canonical.into_values().collect();
    skills.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    skills
}

// ── Tests ──
