//! Structural page-mode classification.
//!
//! The probe reports raw rendered-state facts; classification is a pure,
//! priority-ordered function of those facts. No prior state is consulted, so
//! classifying the same static DOM twice always yields the same mode.

use crate::probes;
use crate::session::Session;
use crate::{Error, Result};
use osprey_core::PageMode;
use serde::Deserialize;

/// Viewport share above which a positioned element counts as an overlay.
pub const OVERLAY_COVERAGE_THRESHOLD: f64 = 0.4;

/// Raw structural facts from the mode probe.
///
/// The probe only reports rendered elements: markup that is present but
/// hidden (display:none, visibility:hidden, zero-sized box) never sets these
/// flags. That visibility check is load-bearing; many sites hide rather than
/// remove their modal markup.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeFacts {
    pub dialog_visible: bool,
    pub dropdown_open: bool,
    pub overlay_coverage: f64,
}

/// Priority-ordered classification; first match wins.
pub fn classify(facts: &ModeFacts) -> PageMode {
    if facts.dialog_visible {
        PageMode::Dialog
    } else if facts.dropdown_open {
        PageMode::Dropdown
    } else if facts.overlay_coverage > OVERLAY_COVERAGE_THRESHOLD {
        PageMode::Overlay
    } else {
        PageMode::Base
    }
}

/// Evaluates the mode probe against the live page and classifies.
pub async fn classify_page(session: &mut Session) -> Result<PageMode> {
    let value = session.evaluate(probes::MODE_PROBE).await?;
    let facts: ModeFacts = serde_json::from_value(value)
        .map_err(|e| Error::Protocol(format!("Bad mode probe result: {}", e)))?;

    let mode = classify(&facts);
    tracing::debug!(?facts, %mode, "page classified");
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_page_is_base() {
        assert_eq!(classify(&ModeFacts::default()), PageMode::Base);
    }

    #[test]
    fn test_hidden_dialog_classifies_as_base() {
        // A display:none dialog never reaches the facts as visible; the
        // probe reports it exactly like an absent one.
        let facts = ModeFacts {
            dialog_visible: false,
            dropdown_open: false,
            overlay_coverage: 0.0,
        };
        assert_eq!(classify(&facts), PageMode::Base);
    }

    #[test]
    fn test_dialog_takes_priority_over_everything() {
        let facts = ModeFacts {
            dialog_visible: true,
            dropdown_open: true,
            overlay_coverage: 0.9,
        };
        assert_eq!(classify(&facts), PageMode::Dialog);
    }

    #[test]
    fn test_dropdown_beats_overlay() {
        let facts = ModeFacts {
            dialog_visible: false,
            dropdown_open: true,
            overlay_coverage: 0.9,
        };
        assert_eq!(classify(&facts), PageMode::Dropdown);
    }

    #[test]
    fn test_overlay_requires_coverage_above_threshold() {
        let below = ModeFacts {
            overlay_coverage: 0.39,
            ..Default::default()
        };
        let above = ModeFacts {
            overlay_coverage: 0.41,
            ..Default::default()
        };

        assert_eq!(classify(&below), PageMode::Base);
        assert_eq!(classify(&above), PageMode::Overlay);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let facts = ModeFacts {
            dialog_visible: false,
            dropdown_open: true,
            overlay_coverage: 0.2,
        };
        assert_eq!(classify(&facts), classify(&facts));
    }
}
