use crate::error::PipelineError;
use crate::models::{Category, ChunkMetadata};
use regex::Regex;
use std::collections::BTreeSet;

/// Title fallback takes this many characters from the start of the text.
const TITLE_FALLBACK_CHARS: usize = 120;

/// Topical category patterns, bilingual. One row per category so a new
/// category is a new row, not new code.
const CATEGORY_PATTERNS: [(Category, &str); 8] = [
    (
        Category::SqlInjection,
        r"(?i)\bsql injection|sql注入|sqlmap|sql盲注|union注入\b",
    ),
    (Category::Xss, r"(?i)\bxss|cross.?site.?script|跨站脚本\b"),
    (Category::Phishing, r"(?i)\bphish(ing)?|钓鱼|网络钓鱼\b"),
    (Category::Ransomware, r"(?i)\bransomware|勒索软件|勒索病毒\b"),
    (Category::Rce, r"(?i)\brce|remote code execution|远程代码执行\b"),
    (Category::Ddos, r"(?i)\bddos|denial.?of.?service|拒绝服务\b"),
    (
        Category::PenetrationTesting,
        r"(?i)\bpenetration.?test|渗透测试|pentest\b",
    ),
    (Category::Malware, r"(?i)\bmalware|恶意软件|木马|trojan\b"),
];

/// Extracts structured tags (identifiers, dates, topical categories) from
/// free text via a fixed battery of regular expressions. Pure and
/// deterministic; no external calls.
pub struct MetadataTagger {
    cve: Regex,
    cwe: Regex,
    technique: Regex,
    date: Regex,
    categories: Vec<(Category, Regex)>,
}

impl MetadataTagger {
    pub fn new() -> Result<Self, PipelineError> {
        let categories = CATEGORY_PATTERNS
            .iter()
            .map(|(category, pattern)| Ok((*category, Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            cve: Regex::new(r"(?i)\bCVE-\d{4}-\d{4,7}\b")?,
            cwe: Regex::new(r"(?i)\bCWE-\d{1,5}\b")?,
            technique: Regex::new(r"\bT\d{4}\b")?,
            date: Regex::new(r"\b(20\d{2}[-/]\d{1,2}[-/]\d{1,2}|20\d{2})\b")?,
            categories,
        })
    }

    /// Pulls vulnerability identifiers, weakness identifiers, attack-technique
    /// identifiers, dates, and topical categories out of `text`. Identifier
    /// sets are deduplicated and sorted; the title defaults to the first 120
    /// characters of the text when not supplied.
    pub fn extract(&self, text: &str, source_url: &str, title: &str) -> ChunkMetadata {
        let title = if title.is_empty() {
            text.chars()
                .take(TITLE_FALLBACK_CHARS)
                .map(|c| if c == '\n' { ' ' } else { c })
                .collect()
        } else {
            title.to_string()
        };

        let cves = collect_matches(&self.cve, text, true);
        let cwes = collect_matches(&self.cwe, text, true);
        let mitre_techniques = collect_matches(&self.technique, text, false);
        let dates = collect_matches(&self.date, text, false);

        let mut categories = Vec::new();
        for (category, pattern) in &self.categories {
            if pattern.is_match(text) && !categories.contains(category) {
                categories.push(*category);
            }
        }
        if !cves.is_empty() {
            categories.push(Category::Vulnerability);
        }
        if !mitre_techniques.is_empty() {
            categories.push(Category::AttackTechnique);
        }

        ChunkMetadata {
            source_url: source_url.to_string(),
            title,
            cves,
            cwes,
            mitre_techniques,
            dates,
            categories,
            quality_score: None,
            chunk_index: None,
            total_chunks: None,
            source_type: None,
        }
    }
}

fn collect_matches(pattern: &Regex, text: &str, uppercase: bool) -> Vec<String> {
    let unique: BTreeSet<String> = pattern
        .find_iter(text)
        .map(|found| {
            if uppercase {
                found.as_str().to_uppercase()
            } else {
                found.as_str().to_string()
            }
        })
        .collect();
    unique.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> MetadataTagger {
        MetadataTagger::new().expect("patterns should compile")
    }

    #[test]
    fn identifiers_and_derived_categories_are_extracted() {
        let text = "The Log4Shell flaw CVE-2021-44228 is exploited via T1190 against public apps.";
        let metadata = tagger().extract(text, "https://example.com/advisory", "Log4Shell");

        assert_eq!(metadata.cves, vec!["CVE-2021-44228"]);
        assert_eq!(metadata.mitre_techniques, vec!["T1190"]);
        assert!(metadata.categories.contains(&Category::Vulnerability));
        assert!(metadata.categories.contains(&Category::AttackTechnique));
    }

    #[test]
    fn identifier_sets_are_deduplicated_and_uppercased() {
        let text = "cve-2021-44228 appears twice: CVE-2021-44228. Also cwe-79 and CWE-79.";
        let metadata = tagger().extract(text, "u", "t");

        assert_eq!(metadata.cves, vec!["CVE-2021-44228"]);
        assert_eq!(metadata.cwes, vec!["CWE-79"]);
    }

    #[test]
    fn empty_identifier_sets_are_omitted_from_serialization() {
        let metadata = tagger().extract("no identifiers in this text", "u", "t");
        let serialized = serde_json::to_value(&metadata).expect("metadata serializes");

        assert!(serialized.get("cves").is_none());
        assert!(serialized.get("cwes").is_none());
        assert!(serialized.get("mitre_techniques").is_none());
        assert!(serialized.get("dates").is_none());
    }

    #[test]
    fn dates_and_years_are_recognized() {
        let text = "Patched on 2021-12-10; originally reported in 2019.";
        let metadata = tagger().extract(text, "u", "t");

        assert!(metadata.dates.contains(&"2021-12-10".to_string()));
        assert!(metadata.dates.contains(&"2019".to_string()));
    }

    #[test]
    fn topical_categories_match_bilingually() {
        let tagger = tagger();

        let english = tagger.extract("A classic sql injection walkthrough with sqlmap", "u", "t");
        assert!(english.categories.contains(&Category::SqlInjection));

        let chinese = tagger.extract("常见的勒索软件传播方式与防护", "u", "t");
        assert!(chinese.categories.contains(&Category::Ransomware));

        let ddos = tagger.extract("Mitigating a denial of service campaign", "u", "t");
        assert!(ddos.categories.contains(&Category::Ddos));
    }

    #[test]
    fn cwe_alone_does_not_imply_vulnerability_category() {
        let metadata = tagger().extract("CWE-79 describes cross-site scripting weaknesses", "u", "t");
        assert_eq!(metadata.cwes, vec!["CWE-79"]);
        assert!(!metadata.categories.contains(&Category::Vulnerability));
        assert!(metadata.categories.contains(&Category::Xss));
    }

    #[test]
    fn missing_title_falls_back_to_flattened_text_prefix() {
        let text = format!("First line\nSecond line {}", "padding ".repeat(30));
        let metadata = tagger().extract(&text, "u", "");

        assert_eq!(metadata.title.chars().count(), 120);
        assert!(!metadata.title.contains('\n'));
        assert!(metadata.title.starts_with("First line Second line"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let tagger = tagger();
        let text = "CVE-2023-1234 and T1059 with phishing lures, updated 2023-06-01.";
        let first = tagger.extract(text, "https://example.com", "");
        let second = tagger.extract(text, "https://example.com", "");
        assert_eq!(first, second);
    }
}
