//! Re-anchoring: relocating stored anchors inside freshly rendered page
//! text.
//!
//! No DOM node or byte offset survives a reload, so the target text is
//! searched for literally in the page's text nodes. When the same text
//! occurs in several nodes, the context captured at creation time breaks
//! the tie. Anchors that cannot be located are skipped, never errors.

use crate::anchor::{Anchor, TextTarget};
use crate::text_layer::{MarkerId, NodePoint, TextLayer};
use log::debug;
use std::time::{Duration, Instant};

/// Aggregate result of one restore pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub requested: usize,
    pub applied: usize,
}

impl RestoreOutcome {
    pub fn absorb(&mut self, other: RestoreOutcome) {
        self.requested += other.requested;
        self.applied += other.applied;
    }
}

#[derive(Debug, Clone, Copy)]
struct CandidateMatch {
    node: usize,
    start: usize,
}

/// Locate one text-bound anchor in the layer and reapply its marker.
///
/// Returns `None` when the anchor belongs to another page, has no target,
/// or its text no longer occurs anywhere in the layer.
pub fn reanchor(layer: &mut TextLayer, page_count: u32, anchor: &Anchor) -> Option<MarkerId> {
    if anchor.page != layer.page() || anchor.page > page_count {
        return None;
    }
    let target = anchor.target.as_ref()?;
    if target.text.is_empty() {
        return None;
    }

    let best = best_candidate(layer, target)?;
    layer
        .wrap_match(
            best.node,
            best.start..best.start + target.text.len(),
            anchor.kind(),
            anchor.color.clone(),
        )
        .ok()
}

/// Restore every text-bound anchor for one rendered page.
///
/// Returns the outcome plus, aligned with the input, the marker each
/// anchor received (for live bookkeeping). Sticky notes and drawings are
/// not text-searched and always map to `None` here.
pub fn restore_page(
    layer: &mut TextLayer,
    page_count: u32,
    anchors: &[Anchor],
) -> (RestoreOutcome, Vec<Option<MarkerId>>) {
    let mut outcome = RestoreOutcome::default();
    let mut markers = Vec::with_capacity(anchors.len());

    for anchor in anchors {
        if !anchor.kind().is_text_bound()
            || anchor.page != layer.page()
            || anchor.page > page_count
        {
            markers.push(None);
            continue;
        }
        outcome.requested += 1;
        let marker = reanchor(layer, page_count, anchor);
        if marker.is_some() {
            outcome.applied += 1;
        }
        markers.push(marker);
    }

    debug!(
        "Restored {}/{} anchors on page {}",
        outcome.applied,
        outcome.requested,
        layer.page()
    );
    (outcome, markers)
}

/// First occurrence of the target text per node, best context match wins.
fn best_candidate(layer: &TextLayer, target: &TextTarget) -> Option<CandidateMatch> {
    let mut candidates = Vec::new();
    for node in 0..layer.node_count() {
        if let Some(text) = layer.node_text(node) {
            if let Some(start) = text.find(&target.text) {
                candidates.push(CandidateMatch { node, start });
            }
        }
    }

    match candidates.len() {
        0 => None,
        1 => Some(candidates[0]),
        _ => {
            // Same text in several nodes: prefer the occurrence whose
            // surroundings agree with the captured context. Strictly
            // greater keeps the first candidate on ties.
            let mut best = candidates[0];
            let mut best_score = context_score(layer, best, target);
            for candidate in &candidates[1..] {
                let score = context_score(layer, *candidate, target);
                if score > best_score {
                    best = *candidate;
                    best_score = score;
                }
            }
            Some(best)
        }
    }
}

fn context_score(layer: &TextLayer, candidate: CandidateMatch, target: &TextTarget) -> usize {
    let before_len = target.context_before.chars().count();
    let after_len = target.context_after.chars().count();

    let actual_before =
        layer.context_before(NodePoint::new(candidate.node, candidate.start), before_len);
    let actual_after = layer.context_after(
        NodePoint::new(candidate.node, candidate.start + target.text.len()),
        after_len,
    );

    suffix_agreement(&target.context_before, &actual_before)
        + prefix_agreement(&target.context_after, &actual_after)
}

/// Matching characters walking inward from the selection boundary, i.e.
/// from the end of the before-context.
fn suffix_agreement(stored: &str, actual: &str) -> usize {
    stored
        .chars()
        .rev()
        .zip(actual.chars().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

fn prefix_agreement(stored: &str, actual: &str) -> usize {
    stored
        .chars()
        .zip(actual.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Defers the restore pass after a (re)load and guards against running it
/// twice for the same load.
///
/// The underlying renderer exposes no reliable "text layer ready" signal,
/// so the pass fires a fixed delay after the load is armed, driven by the
/// caller's tick. Rearming on the next load resets the guard.
#[derive(Debug)]
pub struct RestoreGate {
    delay: Duration,
    armed_at: Option<Instant>,
    done: bool,
}

impl RestoreGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed_at: None,
            done: false,
        }
    }

    /// Call on every document load/reload.
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
        self.done = false;
    }

    /// True exactly once per armed load, after the delay has elapsed.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.armed_at {
            Some(armed) if !self.done && now.duration_since(armed) >= self.delay => {
                self.done = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
