//! URL detection in ordinary chat messages.

use fancy_regex::Regex;
use tracing::warn;

use crate::common::error::SummarizeError;

/// http(s) URL with a dotted host and optional path and query string.
const URL_PATTERN: &str = r"(?i)(https?)://([\da-z.-]+)\.([a-z.]{2,6})([/\w.-]*/?)(\?[/\w=&.-]+)?";

/// Finds the first link in a message.
#[derive(Debug, Clone)]
pub struct LinkScanner {
    regex: Regex,
}

impl LinkScanner {
    pub fn new() -> Self {
        Self {
            regex: Regex::new(URL_PATTERN).expect("URL pattern is valid"),
        }
    }

    /// The first URL-shaped substring of `text`, if any.
    pub fn scan<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self.regex.find(text) {
            Ok(found) => found.map(|m| m.as_str()),
            Err(e) => {
                warn!("URL scan failed: {}", e);
                None
            }
        }
    }
}

impl Default for LinkScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Reply sent when a link was seen but could not be summarized.
pub fn failure_tag(error: &SummarizeError) -> &'static str {
    match error {
        SummarizeError::Timeout => "URL: Timeout",
        SummarizeError::Request(_) => "URL: Error",
    }
}
