//! Content extraction functionality for the crawler module

use scraper::{ElementRef, Html, Node, Selector};

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Extract the visible text of an HTML document
///
/// Text under `script`, `style`, `noscript`, `template` and `head` is
/// dropped. Text nodes are separated by single spaces and runs of
/// whitespace are collapsed, so the result is one long line of prose.
///
/// # Arguments
///
/// * `html` - The HTML to read
///
/// # Returns
///
/// The visible text of the page
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    visible_text_of(document.root_element())
}

/// Visible text below `element`, with whitespace collapsed
pub(crate) fn visible_text_of(element: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            pieces.push(&**text);
        }
    }

    collapse_whitespace(&pieces.join(" "))
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the `<title>` of a page, if any
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|title| !title.is_empty())
}
