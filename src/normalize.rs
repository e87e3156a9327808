//! Pure text transforms shared by the migration jobs. Deterministic, regex
//! based, no I/O. When no pattern matches, input text passes through
//! unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*?\]\((https?://[^\s)]+)\)").unwrap());
static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s)]+").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([、。，．,.])").unwrap());
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[（(]\s*[）)]").unwrap());
static TRAILING_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)[（(]([^（）()]+)[）)]\s*$").unwrap());
static SCHEME_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());
static WWW_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^www\.").unwrap());
static BARE_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?:/.*)?$").unwrap());
static NURSING: Lazy<Regex> = Lazy::new(|| Regex::new("看護").unwrap());
static CO_MEDICAL: Lazy<Regex> = Lazy::new(|| Regex::new("療法|リハビリ|技師|技術").unwrap());
static CLERICAL: Lazy<Regex> = Lazy::new(|| Regex::new("事務|管理").unwrap());

/// Trimmed copy of a possibly-absent free-text field.
pub fn sanitize(value: &str) -> String {
    value.trim().to_string()
}

/// Same, for optional fields straight off a deserialized record.
pub fn sanitize_opt(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or("").to_string()
}

/// Name split into its base and a trailing parenthetical note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentheticalSplit {
    pub base: String,
    pub note: String,
}

/// Split a trailing fullwidth/halfwidth parenthetical qualifier off a name.
/// `"専門医（日本内科学会）"` becomes base `"専門医"`, note `"日本内科学会"`.
pub fn extract_parenthetical(name: &str) -> ParentheticalSplit {
    let original = sanitize(name);
    if original.is_empty() {
        return ParentheticalSplit {
            base: String::new(),
            note: String::new(),
        };
    }
    if let Some(caps) = TRAILING_PAREN.captures(&original) {
        let base = sanitize(&caps[1]);
        let note = sanitize(&caps[2]);
        if !base.is_empty() {
            return ParentheticalSplit { base, note };
        }
    }
    ParentheticalSplit {
        base: original,
        note: String::new(),
    }
}

/// A free-text field with any embedded URL pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReference {
    pub cleaned: String,
    pub url: String,
}

/// Extract a reference URL out of description text. Markdown links win over
/// bare URLs; leftover whitespace and empty parens are tidied up afterwards.
pub fn extract_reference(text: &str) -> ExtractedReference {
    let mut working = text.to_string();
    let mut url = String::new();

    if let Some(caps) = MARKDOWN_LINK.captures(&working) {
        url = caps[1].to_string();
        let whole = caps.get(0).unwrap();
        working = format!("{}{}", &working[..whole.start()], &working[whole.end()..])
            .trim()
            .to_string();
    }

    if url.is_empty() {
        if let Some(found) = BARE_URL.find(&working) {
            url = found.as_str().to_string();
            working = working.replacen(found.as_str(), "", 1).trim().to_string();
        }
    }

    let working = MULTI_SPACE.replace_all(&working, " ");
    let working = SPACE_BEFORE_PUNCT.replace_all(&working, "$1");
    let working = EMPTY_PARENS.replace_all(&working, "");

    ExtractedReference {
        cleaned: working.trim().to_string(),
        url,
    }
}

/// Coerce loosely-entered URL text into an absolute https URL where possible.
/// Unrecognized text passes through unchanged.
pub fn sanitize_url(value: &str) -> String {
    let trimmed = sanitize(value);
    if trimmed.is_empty() {
        return String::new();
    }
    if SCHEME_URL.is_match(&trimmed) {
        return trimmed;
    }
    if WWW_PREFIX.is_match(&trimmed) || BARE_DOMAIN.is_match(&trimmed) {
        return format!("https://{trimmed}");
    }
    trimmed
}

/// Infer a qualification classification from its category keywords. An
/// existing non-empty classification always wins.
pub fn infer_classification(existing: &str, category: &str, fallback: &str) -> String {
    let existing = sanitize(existing);
    if !existing.is_empty() {
        return existing;
    }
    let category = sanitize(category);
    if NURSING.is_match(&category) {
        return "看護".to_string();
    }
    if CO_MEDICAL.is_match(&category) {
        return "コメディカル".to_string();
    }
    if CLERICAL.is_match(&category) {
        return "事務".to_string();
    }
    fallback.to_string()
}

/// Order-preserving dedupe of trimmed non-empty note fragments.
pub fn uniquify(values: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for value in values {
        let trimmed = sanitize(value);
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.clone()) {
            out.push(trimmed);
        }
    }
    out
}

/// Normalized lookup key for thesaurus terms.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_reference_pulls_bare_url() {
        let result = extract_reference("詳細はこちら https://example.com/a 参照");
        assert_eq!(result.cleaned, "詳細はこちら 参照");
        assert_eq!(result.url, "https://example.com/a");
    }

    #[test]
    fn extract_reference_prefers_markdown_links() {
        let result = extract_reference("案内 [学会サイト](https://society.example.jp/info) を参照");
        assert_eq!(result.url, "https://society.example.jp/info");
        assert_eq!(result.cleaned, "案内 を参照");
    }

    #[test]
    fn extract_reference_is_idempotent() {
        let once = extract_reference("予約は https://example.com/reserve まで。");
        let twice = extract_reference(&once.cleaned);
        assert_eq!(twice.cleaned, once.cleaned);
        assert_eq!(twice.url, "");
    }

    #[test]
    fn extract_reference_passes_plain_text_through() {
        let result = extract_reference("特記事項なし");
        assert_eq!(result.cleaned, "特記事項なし");
        assert_eq!(result.url, "");
    }

    #[test]
    fn extract_reference_drops_emptied_parens() {
        let result = extract_reference("受付(https://example.com/desk)");
        assert_eq!(result.url, "https://example.com/desk");
        assert_eq!(result.cleaned, "受付");
    }

    #[test]
    fn parenthetical_split_handles_fullwidth() {
        let split = extract_parenthetical("総合内科専門医（日本内科学会）");
        assert_eq!(split.base, "総合内科専門医");
        assert_eq!(split.note, "日本内科学会");
    }

    #[test]
    fn parenthetical_split_keeps_unmatched_names() {
        let split = extract_parenthetical("認定内科医");
        assert_eq!(split.base, "認定内科医");
        assert_eq!(split.note, "");
    }

    #[test]
    fn sanitize_url_prefixes_bare_domains() {
        assert_eq!(sanitize_url("www.example.jp/page"), "https://www.example.jp/page");
        assert_eq!(sanitize_url("example.co.jp"), "https://example.co.jp");
        assert_eq!(sanitize_url("https://example.com"), "https://example.com");
        assert_eq!(sanitize_url("要確認"), "要確認");
    }

    #[test]
    fn classification_keyword_inference() {
        assert_eq!(infer_classification("", "看護部門", "医師"), "看護");
        assert_eq!(infer_classification("", "放射線技師", "医師"), "コメディカル");
        assert_eq!(infer_classification("", "医事管理", "医師"), "事務");
        assert_eq!(infer_classification("", "循環器", "医師"), "医師");
        assert_eq!(infer_classification("薬剤師", "看護", "医師"), "薬剤師");
    }

    #[test]
    fn uniquify_preserves_first_occurrence_order() {
        let fragments = uniquify(&[" 日本内科学会 ", "認定", "日本内科学会", "", "認定"]);
        assert_eq!(fragments, vec!["日本内科学会", "認定"]);
    }
}
