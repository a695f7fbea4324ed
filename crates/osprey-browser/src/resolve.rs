//! Heuristic element reference resolution.
//!
//! Maps a fuzzy human reference ("the Search button") to exactly one page
//! element, or reports ambiguity with the full candidate list. Matching is
//! an ordered list of tagged strategies; the first strategy with candidates
//! wins, and a multi-candidate set is never silently collapsed to its first
//! entry: the caller disambiguates with an explicit index.

use crate::probes;
use crate::session::Session;
use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    /// A bare identifier (optionally `#`-prefixed) that can be a test id or
    /// element id.
    static ref IDENTIFIER: Regex = Regex::new(r"^#?[A-Za-z][A-Za-z0-9_-]*$").unwrap();
    /// Punctuation that only shows up in CSS selectors, not in visible text
    /// references.
    static ref CSS_HINT: Regex = Regex::new(r"[.#\[>~+:]").unwrap();
}

/// Which matcher strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    TestId,
    AriaLabel,
    Text,
    CssSelector,
}

impl Discriminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discriminator::TestId => "testid",
            Discriminator::AriaLabel => "aria-label",
            Discriminator::Text => "text",
            Discriminator::CssSelector => "css",
        }
    }
}

/// Nearest stable ancestor of a matched element.
///
/// Handed to the readiness detector so a post-action wait can fingerprint
/// one subtree instead of the whole document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub selector: String,
    pub child_count: u64,
    pub serialized_size: u64,
}

/// One resolved element candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatch {
    pub discriminator: Discriminator,
    pub selector: String,
    pub role: String,
    pub name: String,
    pub text: String,
    pub container: Option<ContainerInfo>,
}

impl ElementMatch {
    /// Short human-readable description for candidate listings.
    pub fn describe(&self) -> String {
        let label = if !self.name.is_empty() {
            &self.name
        } else if !self.text.is_empty() {
            &self.text
        } else {
            &self.selector
        };
        format!("{} '{}' [{}]", self.role, label, self.discriminator.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    selector: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    container: Option<ContainerInfo>,
}

/// Per-strategy candidate arrays as returned by the resolver probe.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrategySets {
    #[serde(default)]
    test_id: Vec<RawCandidate>,
    #[serde(default)]
    aria_label: Vec<RawCandidate>,
    #[serde(default)]
    text: Vec<RawCandidate>,
    #[serde(default)]
    css_selector: Vec<RawCandidate>,
}

/// Outcome of strategy composition before error mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Unique(ElementMatch),
    Ambiguous(Vec<ElementMatch>),
}

/// Resolves references against a live session.
pub struct ElementResolver;

impl ElementResolver {
    /// Resolves `reference` to exactly one element.
    ///
    /// `scope` restricts matching to one container's subtree. `index` picks
    /// a candidate out of a known-ambiguous set on retry; without it,
    /// multiple candidates surface as [`Error::Ambiguous`].
    pub async fn resolve(
        session: &mut Session,
        reference: &str,
        scope: Option<&str>,
        index: Option<usize>,
    ) -> Result<ElementMatch> {
        let probe = probes::resolver_probe(
            reference,
            scope,
            looks_like_identifier(reference),
            looks_like_css(reference),
        );
        let value = session.evaluate(&probe).await?;
        let sets: StrategySets = serde_json::from_value(value)
            .map_err(|e| Error::Protocol(format!("Bad resolver probe result: {}", e)))?;

        match compose(reference, sets, index)? {
            Resolution::Unique(element) => {
                tracing::debug!(reference, selector = %element.selector, "reference resolved");
                Ok(element)
            }
            Resolution::Ambiguous(candidates) => Err(Error::Ambiguous {
                reference: reference.to_string(),
                candidates,
            }),
        }
    }
}

/// Whether a reference can syntactically be a test id or element id.
pub fn looks_like_identifier(reference: &str) -> bool {
    IDENTIFIER.is_match(reference)
}

/// Whether a reference looks like a raw CSS selector.
pub fn looks_like_css(reference: &str) -> bool {
    CSS_HINT.is_match(reference)
}

/// Strategy composition: the first non-empty candidate set in priority order
/// wins.
fn compose(reference: &str, sets: StrategySets, index: Option<usize>) -> Result<Resolution> {
    let ordered = [
        (Discriminator::TestId, sets.test_id),
        (Discriminator::AriaLabel, sets.aria_label),
        (Discriminator::Text, sets.text),
        (Discriminator::CssSelector, sets.css_selector),
    ];

    for (discriminator, raw) in ordered {
        if raw.is_empty() {
            continue;
        }

        let mut candidates: Vec<ElementMatch> = raw
            .into_iter()
            .map(|c| ElementMatch {
                discriminator,
                selector: c.selector,
                role: c.role,
                name: c.name,
                text: c.text,
                container: c.container,
            })
            .collect();

        return match (candidates.len(), index) {
            (1, _) => Ok(Resolution::Unique(candidates.remove(0))),
            (n, Some(i)) if i < n => Ok(Resolution::Unique(candidates.remove(i))),
            (n, Some(i)) => Err(Error::NotFound {
                reference: format!("{} (index {} of {} candidates)", reference, i, n),
            }),
            (_, None) => Ok(Resolution::Ambiguous(candidates)),
        };
    }

    Err(Error::NotFound {
        reference: reference.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(selector: &str, text: &str) -> RawCandidate {
        RawCandidate {
            selector: selector.to_string(),
            role: "button".to_string(),
            name: String::new(),
            text: text.to_string(),
            container: None,
        }
    }

    #[test]
    fn test_single_text_match_is_unique() {
        let sets = StrategySets {
            text: vec![candidate("form > button", "Search")],
            ..Default::default()
        };

        let resolution = compose("Search", sets, None).unwrap();
        match resolution {
            Resolution::Unique(element) => {
                assert_eq!(element.discriminator, Discriminator::Text);
                assert_eq!(element.selector, "form > button");
            }
            other => panic!("expected unique, got {:?}", other),
        }
    }

    #[test]
    fn test_two_search_buttons_are_ambiguous() {
        let sets = StrategySets {
            text: vec![
                candidate("header button", "Search"),
                candidate("main button", "Search"),
            ],
            ..Default::default()
        };

        let resolution = compose("Search", sets, None).unwrap();
        match resolution {
            Resolution::Ambiguous(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_index_selects_second_candidate() {
        let sets = StrategySets {
            text: vec![
                candidate("header button", "Search"),
                candidate("main button", "Search"),
            ],
            ..Default::default()
        };

        let resolution = compose("Search", sets, Some(1)).unwrap();
        match resolution {
            Resolution::Unique(element) => assert_eq!(element.selector, "main button"),
            other => panic!("expected unique, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_index_is_not_found() {
        let sets = StrategySets {
            text: vec![candidate("button", "Search")],
            ..Default::default()
        };

        // One candidate short-circuits before the index applies.
        assert!(compose("Search", sets, Some(0)).is_ok());

        let sets = StrategySets {
            text: vec![
                candidate("header button", "Search"),
                candidate("main button", "Search"),
            ],
            ..Default::default()
        };
        assert!(matches!(
            compose("Search", sets, Some(5)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_test_id_preempts_text_matches() {
        let sets = StrategySets {
            test_id: vec![candidate("[data-testid=\"search\"]", "")],
            text: vec![
                candidate("header button", "search"),
                candidate("main button", "search"),
            ],
            ..Default::default()
        };

        let resolution = compose("search", sets, None).unwrap();
        match resolution {
            Resolution::Unique(element) => {
                assert_eq!(element.discriminator, Discriminator::TestId)
            }
            other => panic!("expected unique testid match, got {:?}", other),
        }
    }

    #[test]
    fn test_no_candidates_is_not_found() {
        assert!(matches!(
            compose("Nonexistent", StrategySets::default(), None),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_identifier_detection() {
        assert!(looks_like_identifier("submit-btn"));
        assert!(looks_like_identifier("#login"));
        assert!(!looks_like_identifier("the Search button"));
        assert!(!looks_like_identifier("div > button"));
    }

    #[test]
    fn test_css_detection() {
        assert!(looks_like_css("div > button"));
        assert!(looks_like_css(".nav-item"));
        assert!(looks_like_css("[role=dialog]"));
        assert!(!looks_like_css("Search"));
    }
}
