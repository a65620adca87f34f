use scraper::{ElementRef, Html, Selector};

/// Precise path to the social-proof element on a product page.
const PRIMARY_SELECTOR: &str = "#social-proofing-faceout-title-tk_bought > span";

/// Tags scanned by the fallback pass, in document order.
const FALLBACK_SELECTOR: &str = "span, div, p";

/// Input field only present on the anti-bot challenge page.
const CHALLENGE_INPUT_SELECTOR: &str = "input#captchacharacters";

/// Phrase shown on the challenge page, matched case-insensitively.
const CHALLENGE_PHRASE: &str = "robot check";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Anti-bot challenge page; the batch must stop.
    Challenge,
    /// Trimmed visible text of the social-proof element, unmodified.
    Found(String),
    /// The page has no qualifying element. Not an error.
    NotFound,
}

/// Locate the "bought in past month" tagline in a fetched page.
///
/// Challenge detection runs first and short-circuits. Then the primary
/// selector, guarded by a "month" check so an unrelated element at the
/// same path is not accepted. Then a scan over generic tags whose direct
/// text mentions both "bought" and "month"; the first match wins.
pub fn extract(html: &str) -> ExtractionOutcome {
    let doc = Html::parse_document(html);

    if is_challenge_page(&doc) {
        return ExtractionOutcome::Challenge;
    }

    let primary = Selector::parse(PRIMARY_SELECTOR).unwrap();
    if let Some(element) = doc.select(&primary).next() {
        let text = visible_text(element);
        if text.to_lowercase().contains("month") {
            return ExtractionOutcome::Found(text);
        }
    }

    let fallback = Selector::parse(FALLBACK_SELECTOR).unwrap();
    for element in doc.select(&fallback) {
        if is_social_proof_text(&direct_text(element)) {
            return ExtractionOutcome::Found(visible_text(element));
        }
    }

    ExtractionOutcome::NotFound
}

fn is_challenge_page(doc: &Html) -> bool {
    let challenge_input = Selector::parse(CHALLENGE_INPUT_SELECTOR).unwrap();
    if doc.select(&challenge_input).next().is_some() {
        return true;
    }

    let page_text: String = doc.root_element().text().collect::<String>().to_lowercase();
    page_text.contains(CHALLENGE_PHRASE)
}

/// Does a fragment of text read like the social-proof tagline?
fn is_social_proof_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("bought") && lower.contains("month")
}

/// Visible text of the element and its descendants, each fragment trimmed.
fn visible_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text belonging to the element itself, ignoring nested elements. The
/// fallback scan uses this so a wrapper div does not match on behalf of
/// the span inside it.
fn direct_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|t| &**t)
        .collect()
}
