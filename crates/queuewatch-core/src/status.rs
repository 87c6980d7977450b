//! Reception status classification.
//!
//! The clinic page shows either a "now serving" marker (only while patients
//! are being accepted) or one of four fixed phrases describing the phase of
//! the day. [`classify`] turns an extracted [`PageContent`] into an
//! [`Observation`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClassifyError;

/// Operating phase displayed by the monitored page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Patients are being seen; the page shows the current reception number.
    Accepting,
    /// Before opening.
    Preparing,
    /// Open, but nobody has been called yet.
    Beginning,
    /// Closed for the rest of the day.
    Finished,
    /// Closed all day.
    Holiday,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Accepting => "accepting",
            Status::Preparing => "preparing",
            Status::Beginning => "beginning",
            Status::Finished => "finished",
            Status::Holiday => "holiday",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub status: Status,
    /// Reception number; only present while [`Status::Accepting`].
    pub counter: Option<u32>,
}

impl Observation {
    pub fn accepting(counter: u32) -> Self {
        Self {
            status: Status::Accepting,
            counter: Some(counter),
        }
    }

    /// Observation for a status that carries no reception number.
    pub fn phase(status: Status) -> Self {
        Self {
            status,
            counter: None,
        }
    }

    /// The counter value that should be recorded for this observation.
    ///
    /// `Beginning` is the zero point of a service day.
    pub fn sample_value(&self) -> Option<u32> {
        match self.status {
            Status::Accepting => self.counter,
            Status::Beginning => Some(0),
            Status::Preparing | Status::Finished | Status::Holiday => None,
        }
    }
}

/// Phrases identifying each non-accepting status, tested in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    #[serde(default = "default_preparing")]
    pub preparing: String,
    #[serde(default = "default_beginning")]
    pub beginning: String,
    #[serde(default = "default_finished")]
    pub finished: String,
    #[serde(default = "default_holiday")]
    pub holiday: String,
}

fn default_preparing() -> String {
    "開始前".into()
}
fn default_beginning() -> String {
    "診察開始".into()
}
fn default_finished() -> String {
    "診察終了".into()
}
fn default_holiday() -> String {
    "休診日".into()
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            preparing: default_preparing(),
            beginning: default_beginning(),
            finished: default_finished(),
            holiday: default_holiday(),
        }
    }
}

impl Keywords {
    fn ordered(&self) -> [(Status, &str); 4] {
        [
            (Status::Preparing, self.preparing.as_str()),
            (Status::Beginning, self.beginning.as_str()),
            (Status::Finished, self.finished.as_str()),
            (Status::Holiday, self.holiday.as_str()),
        ]
    }
}

static SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b([^>]*)>(.*?)</span\s*>"#).expect("valid span regex")
});
static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#).expect("valid class regex")
});
static NON_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")
        .expect("valid script regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// The parts of a fetched page the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// Text of the "service open" marker element, if the page has one.
    pub marker: Option<String>,
    /// Visible text of the whole page.
    pub text: String,
    /// Unmodified document, kept for the diagnostic dump.
    pub raw: String,
}

impl PageContent {
    /// Extract marker and text from an HTML document.
    ///
    /// The marker is the first `<span>` whose class list contains
    /// `marker_class`.
    pub fn from_html(raw: impl Into<String>, marker_class: &str) -> Self {
        let raw = raw.into();

        let marker = SPAN_RE.captures_iter(&raw).find_map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let class_list = CLASS_ATTR_RE
                .captures(attrs)
                .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
                .map_or("", |m| m.as_str());
            if class_list.split_whitespace().any(|c| c == marker_class) {
                let inner = caps.get(2).map_or("", |m| m.as_str());
                Some(strip_tags(inner).trim().to_string())
            } else {
                None
            }
        });

        let visible = NON_TEXT_RE.replace_all(&raw, " ");
        let text = strip_tags(&visible);

        Self { marker, text, raw }
    }
}

fn strip_tags(html: &str) -> String {
    TAG_RE
        .replace_all(html, " ")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Classify a page.
///
/// The marker is checked before any keyword: it only appears while the
/// clinic is accepting, and its surrounding text may contain other phrases.
pub fn classify(page: &PageContent, keywords: &Keywords) -> Result<Observation, ClassifyError> {
    if let Some(marker) = &page.marker {
        let counter = marker
            .trim()
            .parse::<u32>()
            .map_err(|_| ClassifyError::InvalidCounter(marker.clone()))?;
        debug!(counter, "service marker found");
        return Ok(Observation::accepting(counter));
    }

    for (status, keyword) in keywords.ordered() {
        if !keyword.is_empty() && page.text.contains(keyword) {
            debug!(%status, keyword, "status keyword matched");
            return Ok(Observation::phase(status));
        }
    }

    Err(ClassifyError::NoStatusMatched)
}
