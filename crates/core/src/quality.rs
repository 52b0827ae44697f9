use crate::models::QualityScore;

/// Bilingual security vocabulary used for the relevance sub-score.
pub const DEFAULT_SECURITY_KEYWORDS: [&str; 58] = [
    "security",
    "attack",
    "vulnerability",
    "exploit",
    "malware",
    "encryption",
    "authentication",
    "authorization",
    "firewall",
    "intrusion",
    "threat",
    "risk",
    "breach",
    "phishing",
    "ransomware",
    "sql injection",
    "xss",
    "csrf",
    "ddos",
    "penetration",
    "hacker",
    "cyber",
    "network",
    "protocol",
    "cryptography",
    "ssl",
    "tls",
    "password",
    "access control",
    "backdoor",
    "trojan",
    "worm",
    "安全",
    "攻击",
    "漏洞",
    "威胁",
    "恶意",
    "加密",
    "认证",
    "授权",
    "防火墙",
    "入侵",
    "风险",
    "泄露",
    "钓鱼",
    "勒索",
    "注入",
    "跨站",
    "渗透",
    "黑客",
    "网络",
    "协议",
    "密码",
    "访问控制",
    "后门",
    "木马",
    "蠕虫",
    "病毒",
];

const SENTENCE_ENDS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// True for the characters that carry meaning in bilingual text: ASCII
/// letters and CJK ideographs.
pub fn is_meaningful_char(character: char) -> bool {
    character.is_ascii_alphabetic() || ('\u{4e00}'..='\u{9fff}').contains(&character)
}

/// Computes a multi-factor quality estimate for a text unit. Pure function of
/// the text; scoring a document and later scoring its chunks are independent
/// calls with no caching in between.
pub struct QualityScorer {
    keywords: Vec<String>,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::with_keywords(DEFAULT_SECURITY_KEYWORDS.iter().map(|kw| kw.to_string()))
    }

    /// Builds a scorer over an alternate vocabulary. Keywords are matched as
    /// case-insensitive substrings.
    pub fn with_keywords<I>(keywords: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.to_lowercase())
                .collect(),
        }
    }

    pub fn score(&self, text: &str) -> QualityScore {
        if text.is_empty() {
            return QualityScore::zero();
        }

        let total_chars = text.chars().count();

        let length = match total_chars {
            0..=49 => 0.0,
            50..=99 => 0.3,
            100..=2_000 => 1.0,
            2_001..=5_000 => 0.8,
            _ => 0.6,
        };

        let lowered = text.to_lowercase();
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|keyword| lowered.contains(keyword.as_str()))
            .count();
        let relevance = match keyword_hits {
            0 => 0.0,
            1 => 0.2,
            2 => 0.4,
            3 => 0.6,
            4 => 0.8,
            _ => 1.0,
        };

        let meaningful = text.chars().filter(|c| is_meaningful_char(*c)).count();
        let readability = meaningful as f64 / total_chars as f64;

        let information_density = mean_sentence_density(text);

        let weighted = length * 0.15 + relevance * 0.6 + readability * 0.15 + information_density * 0.1;

        // Relevance is a hard gate: below 0.2 the overall score is capped at
        // 0.3. Downstream thresholds were tuned against this exact shape, so
        // the min() stays even where it dips below the plain weighted sum.
        let overall = if relevance < 0.2 {
            weighted.min(0.3)
        } else {
            weighted
        };

        QualityScore {
            length,
            relevance,
            readability,
            information_density,
            overall,
        }
    }

    /// Threshold check with a hard relevance requirement: text without at
    /// least one domain keyword is never high quality.
    pub fn is_high_quality(&self, text: &str, threshold: f64) -> bool {
        let scores = self.score(text);
        if scores.relevance < 0.2 {
            return false;
        }
        scores.overall >= threshold
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean sentence length mapped into [0, 1]: ideal between 20 and 100 chars,
/// scaled down proportionally below, scaled down as 100/mean above with a
/// floor of 0.5.
fn mean_sentence_density(text: &str) -> f64 {
    let sentence_lengths: Vec<usize> = text
        .split(SENTENCE_ENDS)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(|sentence| sentence.chars().count())
        .collect();

    if sentence_lengths.is_empty() {
        return 0.0;
    }

    let mean = sentence_lengths.iter().sum::<usize>() as f64 / sentence_lengths.len() as f64;

    if (20.0..=100.0).contains(&mean) {
        1.0
    } else if mean < 20.0 {
        mean / 20.0
    } else {
        (100.0 / mean).max(0.5)
    }
}
