//! Soft-failure detection for HTTP-200 review pages

use crate::fetch::SoftFailureKind;
use scraper::{Html, Selector};

const CAPTCHA_TEXT: &str = "Enter the characters you see below";
const NO_RESULTS_TEXT: &str = "Sorry, no reviews match your current selections.";

/// Classifies a page body, returning the soft-failure kind if it has one
///
/// Markers are checked in order: bot challenge, empty result set, sign-in form.
/// A body without any marker returns `None` and is a usable page.
pub fn classify_body(body: &str) -> Option<SoftFailureKind> {
    let document = Html::parse_document(body);
    let has_text = |marker: &str| document.root_element().text().any(|t| t.contains(marker));

    let has_match = |selector: &str| {
        Selector::parse(selector)
            .map(|sel| document.select(&sel).next().is_some())
            .unwrap_or(false)
    };

    if has_match("#captchacharacters") || has_text(CAPTCHA_TEXT) {
        return Some(SoftFailureKind::BotChallenge);
    }

    if has_text(NO_RESULTS_TEXT) {
        return Some(SoftFailureKind::NoResults);
    }

    if has_match("[name=signIn]") {
        return Some(SoftFailureKind::LoginWall);
    }

    None
}
