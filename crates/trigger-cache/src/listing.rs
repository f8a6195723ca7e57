//! Prefix listings for on-screen completion hints.

use std::sync::Arc;

use config::Workflow;
use mac_keycode::{EventKey, Signature};

use crate::ScopeId;

/// A registered chord, kept for listing only.
#[derive(Clone, Debug)]
pub(crate) struct ListingEntry {
    pub(crate) scope: ScopeId,
    pub(crate) chord: Vec<Signature>,
    pub(crate) workflow: Arc<Workflow>,
}

impl ListingEntry {
    /// The listing for this entry if its chord starts with `wanted`.
    pub(crate) fn matching(&self, wanted: &[&str]) -> Option<PrefixListing> {
        if wanted.len() > self.chord.len() {
            return None;
        }
        let consumed = wanted
            .iter()
            .zip(&self.chord)
            .all(|(q, sig)| element_matches(q, *sig));
        if !consumed {
            return None;
        }
        Some(PrefixListing {
            workflow: self.workflow.clone(),
            global: self.scope.is_global(),
            chord: render(&self.chord),
            remaining: render(&self.chord[wanted.len()..]),
        })
    }
}

/// A chord that continues a typed prefix.
#[derive(Clone, Debug)]
pub struct PrefixListing {
    /// The workflow the chord fires.
    pub workflow: Arc<Workflow>,
    /// Registered globally rather than for the frontmost application.
    pub global: bool,
    /// Full canonical chord text.
    pub chord: String,
    /// Chord text left after the typed prefix.
    pub remaining: String,
}

pub(crate) fn render(sigs: &[Signature]) -> String {
    sigs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accept the canonical text or any spec that parses to the same signature.
fn element_matches(query: &str, sig: Signature) -> bool {
    if query == sig.to_string() {
        return true;
    }
    [false, true].into_iter().any(|specific| {
        EventKey::parse(query, specific).is_some_and(|k| k.signature(specific) == sig)
    })
}
