//! Phone number extraction from HTML pages
//!
//! Collects Russian phone numbers from the visible text of a page and
//! normalizes them to the 11-digit `8XXXXXXXXXX` form. Bare 7-digit local
//! numbers (`123-45-67`) are assumed to belong to the default city code.
//!
//! Only ASCII digits count. Area codes start with 3-9, as in the Russian
//! numbering plan. Local numbers must be hyphenated and may not start with
//! 0, so prices and quantities written with spaces are not taken for phones.

use crate::interpreter::{ContentInterpreter, Interpretation};
use crate::record::Payload;
use regex::Regex;
use scraper::Html;
use std::collections::BTreeSet;

/// City code assumed for local numbers written without one
const DEFAULT_CODE: &str = "495";

/// Digits following the trunk prefix in a complete number
const NATIONAL_DIGITS: usize = 10;

/// Elements whose text never counts as page content
const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// Interpreter producing `{"phones": "<sorted, comma-separated numbers>"}`
pub struct PhoneInterpreter {
    pattern: Regex,
}

impl PhoneInterpreter {
    pub fn new() -> Self {
        // full: +7/8 prefix, 3-5 digit code starting 3-9 (optionally parenthesized), subscriber number
        // local: 123-45-67 with no code, hyphenated, not starting with 0
        let pattern = Regex::new(
            r"(?P<full>(?:\+7|8)[ \-]?(?:\([3-9][0-9]{2,4}\)|[3-9][0-9]{2,4})[ \-]?[0-9]{1,3}(?:[ \-]?[0-9]{2}){2})|(?P<local>\b[1-9][0-9]{2}-[0-9]{2}-[0-9]{2}\b)",
        )
        .expect("phone pattern is a valid regex");
        Self { pattern }
    }

    /// Extracts normalized phone numbers from the visible text of `html`
    pub fn extract_phones(&self, html: &str) -> BTreeSet<String> {
        let text = visible_text(html);
        let mut phones = BTreeSet::new();

        for caps in self.pattern.captures_iter(&text) {
            if let Some(m) = caps.name("full") {
                let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
                // drop the 7 of +7 or the trunk 8
                let national = &digits[1..];
                if national.len() == NATIONAL_DIGITS {
                    phones.insert(format!("8{}", national));
                }
            } else if let Some(m) = caps.name("local") {
                let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
                phones.insert(format!("8{}{}", DEFAULT_CODE, digits));
            }
        }

        phones
    }
}

impl Default for PhoneInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentInterpreter for PhoneInterpreter {
    fn process(&self, content: &[u8]) -> anyhow::Result<Interpretation> {
        let html = String::from_utf8_lossy(content);
        let phones = self.extract_phones(&html);

        let mut payload = Payload::new();
        payload.insert(
            "phones".to_string(),
            phones.into_iter().collect::<Vec<_>>().join(",").into(),
        );
        Ok(Interpretation::ok(payload))
    }
}

/// Concatenates text nodes outside `<script>` and `<style>`, one per line
fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.tree.nodes() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            text.push_str(&fragment.text);
            text.push('\n');
        }
    }

    text
}
