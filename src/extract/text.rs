//! Number and date parsing for listing text

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn float_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\d+|\d+").ok()).as_ref()
}

fn integer_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").ok())
        .as_ref()
}

fn with_reviews_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+|\d+)\s+with\s+reviews?").ok())
        .as_ref()
}

fn review_date_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Reviewed in (?P<country>.+?) on (?P<date>[A-Za-z]+ \d{1,2}, \d{4})").ok()
    })
    .as_ref()
}

fn parse_grouped(digits: &str) -> Option<u64> {
    digits.replace(',', "").parse().ok()
}

/// First decimal number in `text`, e.g. `4.5` from "4.5 out of 5 stars"
pub fn extract_float(text: &str) -> Option<f64> {
    float_re()?.find(text)?.as_str().parse().ok()
}

/// First integer in `text`, with thousands separators removed
pub fn extract_integer(text: &str) -> Option<u64> {
    parse_grouped(integer_re()?.find(text)?.as_str())
}

/// Number of written reviews from a ratings summary
///
/// "1,234 total ratings, 56 with reviews" yields 56. Without a "with reviews"
/// clause the last integer in the text is used.
pub fn parse_reviews_count(text: &str) -> Option<u64> {
    if let Some(caps) = with_reviews_re()?.captures(text) {
        return parse_grouped(caps.get(1)?.as_str());
    }

    integer_re()?
        .find_iter(text)
        .last()
        .and_then(|m| parse_grouped(m.as_str()))
}

/// Splits "Reviewed in {country} on {Month D, YYYY}" into country and date
pub fn parse_review_date_and_country(text: &str) -> Option<(String, NaiveDate)> {
    let caps = review_date_re()?.captures(text.trim())?;
    let country = caps.name("country")?.as_str().trim();
    let country = country.strip_prefix("the ").unwrap_or(country);
    let date = NaiveDate::parse_from_str(caps.name("date")?.as_str(), "%B %d, %Y").ok()?;
    Some((country.to_string(), date))
}

/// Helpful votes from "One person found this helpful" / "12 people found this helpful"
pub fn parse_helpful_votes(text: &str) -> u64 {
    if text.contains("One") {
        return 1;
    }
    extract_integer(text).unwrap_or(0)
}
