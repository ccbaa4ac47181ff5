//! Extractor for the product review listing markup

use crate::extract::text::{
    extract_float, extract_integer, parse_helpful_votes, parse_review_date_and_country,
    parse_reviews_count,
};
use crate::extract::{AggregateHints, PageExtractor, PageFragment, Review};
use scraper::{ElementRef, Html, Selector};

/// Reads reviews and product figures from `data-hook` annotated listing pages
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewPageExtractor;

impl ReviewPageExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for ReviewPageExtractor {
    fn extract(&self, body: &str) -> PageFragment {
        let document = Html::parse_document(body);
        let root = document.root_element();

        let hints = AggregateHints {
            product_name: first(root, "a[data-hook=product-link]")
                .map(element_text)
                .filter(|name| !name.is_empty()),
            overall_rating: first(root, "[data-hook=rating-out-of-text]")
                .and_then(|el| extract_float(&element_text(el))),
            total_rating_count: first(root, "[data-hook=total-review-count]")
                .and_then(|el| extract_integer(&element_text(el))),
            total_review_count: first(root, "[data-hook=cr-filter-info-review-rating-count]")
                .and_then(|el| parse_reviews_count(&element_text(el))),
        };

        let mut reviews = Vec::new();
        if let Ok(review_selector) = Selector::parse("div[data-hook=review]") {
            for element in document.select(&review_selector) {
                if let Some(review) = extract_review(element) {
                    reviews.push(review);
                }
            }
        }

        PageFragment { reviews, hints }
    }
}

/// Extracts one review; elements without an id are dropped
fn extract_review(element: ElementRef<'_>) -> Option<Review> {
    let id = element.value().id()?.trim();
    if id.is_empty() {
        return None;
    }

    let mut review = Review {
        id: id.to_string(),
        ..Review::default()
    };

    review.rating = first(element, "i[data-hook=review-star-rating]")
        .or_else(|| first(element, "i[data-hook=cmps-review-star-rating]"))
        .and_then(|el| extract_float(&element_text(el)));

    if let Some(title) = first(element, "a[data-hook=review-title]") {
        review.href = title.value().attr("href").map(str::to_string);
        review.title = link_title(title);
    } else if let Some(title) = first(element, "span[data-hook=review-title]") {
        review.title = non_empty(element_text(title));
    }

    if let Some((country, date)) = first(element, "span[data-hook=review-date]")
        .and_then(|el| parse_review_date_and_country(&element_text(el)))
    {
        review.country = Some(country);
        review.date = Some(date);
    }

    let body = first(element, "span[data-hook=review-body]");
    review.body = body.map(element_text).and_then(non_empty);

    review.verified_purchase = first(element, "span[data-hook=avp-badge]").is_some();

    review.found_helpful = first(element, "span[data-hook=helpful-vote-statement]")
        .map(|el| parse_helpful_votes(&element_text(el)))
        .unwrap_or(0);

    if let Some(name) = first(element, "span.a-profile-name") {
        review.username = non_empty(element_text(name));
        review.username_url = name
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "a")
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
    }

    for selector in [
        "img[data-hook=review-image-tile]",
        "img[data-hook=cmps-review-image-tile]",
    ] {
        review.images.extend(attr_values(element, selector, "src"));
    }

    if let Some(body) = body {
        review.videos = attr_values(body, "[data-video-url]", "data-video-url");
    }

    Some(review)
}

/// Title of a linked review heading
///
/// The link wraps the star icon, a spacer and the title text; the title is the
/// third span when present.
fn link_title(link: ElementRef<'_>) -> Option<String> {
    let spans: Vec<ElementRef<'_>> = Selector::parse("span")
        .map(|sel| link.select(&sel).collect())
        .unwrap_or_default();

    match spans.get(2) {
        Some(span) => non_empty(element_text(*span)),
        None => non_empty(element_text(link)),
    }
}

fn first<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    let found = scope.select(&selector).next();
    found
}

fn attr_values(scope: ElementRef<'_>, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    scope
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
