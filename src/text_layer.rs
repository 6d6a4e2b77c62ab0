//! Rendered page text and live markers.
//!
//! A page's text layer is an ordered list of text nodes as produced by the
//! rendering engine. Markers are span overlays referencing node ranges;
//! applying or detaching a marker never alters node text.

use crate::anchor::AnchorKind;
use crate::color::MarkColor;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpanError {
    #[error("selection references a text node that does not exist")]
    NodeOutOfBounds,
    #[error("selection offset does not fall on a character boundary")]
    BadOffset,
    #[error("selection range is empty")]
    EmptyRange,
}

/// A position inside the text layer: node index plus byte offset into that
/// node's text. Offsets must fall on character boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct NodePoint {
    pub node: usize,
    pub offset: usize,
}

impl NodePoint {
    pub fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Handle to a live marker. Valid only for the layer that produced it and
/// only until the next reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(u32);

/// One contiguous marked range inside a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpan {
    pub node: usize,
    pub range: Range<usize>,
}

/// A live visual marker over one or more node spans.
#[derive(Debug, Clone)]
pub struct Marker {
    pub id: MarkerId,
    pub kind: AnchorKind,
    pub color: MarkColor,
    pub spans: Vec<NodeSpan>,
}

#[derive(Debug)]
pub struct TextLayer {
    page: u32,
    nodes: Vec<String>,
    markers: Vec<Marker>,
    next_id: u32,
}

impl TextLayer {
    pub fn new<S: Into<String>>(page: u32, nodes: Vec<S>) -> Self {
        Self {
            page,
            nodes: nodes.into_iter().map(Into::into).collect(),
            markers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_text(&self, node: usize) -> Option<&str> {
        self.nodes.get(node).map(String::as_str)
    }

    /// True for image-only pages with no extractable text.
    pub fn has_no_text(&self) -> bool {
        self.nodes.iter().all(|n| n.is_empty())
    }

    fn check_point(&self, point: NodePoint) -> Result<&str, SpanError> {
        let text = self
            .nodes
            .get(point.node)
            .ok_or(SpanError::NodeOutOfBounds)?;
        if point.offset > text.len() || !text.is_char_boundary(point.offset) {
            return Err(SpanError::BadOffset);
        }
        Ok(text)
    }

    /// Text between two points, crossing node boundaries. Points must be
    /// ordered.
    pub fn slice(&self, start: NodePoint, end: NodePoint) -> Result<String, SpanError> {
        let start_text = self.check_point(start)?;
        let end_text = self.check_point(end)?;
        if end < start {
            return Err(SpanError::EmptyRange);
        }

        if start.node == end.node {
            return Ok(start_text[start.offset..end.offset].to_string());
        }

        let mut out = String::from(&start_text[start.offset..]);
        for node in start.node + 1..end.node {
            out.push_str(&self.nodes[node]);
        }
        out.push_str(&end_text[..end.offset]);
        Ok(out)
    }

    /// Up to `max_chars` characters of layer text immediately before
    /// `point`, walking across node boundaries.
    pub fn context_before(&self, point: NodePoint, max_chars: usize) -> String {
        let mut collected: Vec<char> = Vec::new();
        let mut node = point.node;
        let mut upto = point.offset;
        loop {
            if let Some(text) = self.nodes.get(node) {
                let upto = floor_char_boundary(text, upto.min(text.len()));
                for ch in text[..upto].chars().rev() {
                    if collected.len() == max_chars {
                        break;
                    }
                    collected.push(ch);
                }
            }
            if collected.len() >= max_chars || node == 0 {
                break;
            }
            node -= 1;
            upto = self.nodes[node].len();
        }
        collected.into_iter().rev().collect()
    }

    /// Up to `max_chars` characters of layer text immediately after
    /// `point`.
    pub fn context_after(&self, point: NodePoint, max_chars: usize) -> String {
        let mut collected = String::new();
        let mut node = point.node;
        let mut from = point.offset;
        while node < self.nodes.len() {
            let text = &self.nodes[node];
            let from_fixed = floor_char_boundary(text, from.min(text.len()));
            for ch in text[from_fixed..].chars() {
                if collected.chars().count() == max_chars {
                    return collected;
                }
                collected.push(ch);
            }
            node += 1;
            from = 0;
        }
        collected
    }

    /// Wrap a selection range in a marker. A range inside one node becomes
    /// a single span; a range spanning several nodes falls back to one
    /// marker with a span per touched node. Invalid offsets apply nothing.
    pub fn wrap(
        &mut self,
        start: NodePoint,
        end: NodePoint,
        kind: AnchorKind,
        color: MarkColor,
    ) -> Result<MarkerId, SpanError> {
        self.check_point(start)?;
        self.check_point(end)?;
        if end <= start {
            return Err(SpanError::EmptyRange);
        }

        let mut spans = Vec::new();
        if start.node == end.node {
            spans.push(NodeSpan {
                node: start.node,
                range: start.offset..end.offset,
            });
        } else {
            let first_len = self.nodes[start.node].len();
            if start.offset < first_len {
                spans.push(NodeSpan {
                    node: start.node,
                    range: start.offset..first_len,
                });
            }
            for node in start.node + 1..end.node {
                if !self.nodes[node].is_empty() {
                    spans.push(NodeSpan {
                        node,
                        range: 0..self.nodes[node].len(),
                    });
                }
            }
            if end.offset > 0 {
                spans.push(NodeSpan {
                    node: end.node,
                    range: 0..end.offset,
                });
            }
        }

        if spans.is_empty() {
            return Err(SpanError::EmptyRange);
        }
        Ok(self.push_marker(kind, color, spans))
    }

    /// Wrap a byte range inside one node directly. Used by restore, where
    /// the range comes from a substring search and is known to be valid.
    pub fn wrap_match(
        &mut self,
        node: usize,
        range: Range<usize>,
        kind: AnchorKind,
        color: MarkColor,
    ) -> Result<MarkerId, SpanError> {
        self.check_point(NodePoint::new(node, range.start))?;
        self.check_point(NodePoint::new(node, range.end))?;
        if range.is_empty() {
            return Err(SpanError::EmptyRange);
        }
        Ok(self.push_marker(kind, color, vec![NodeSpan { node, range }]))
    }

    fn push_marker(&mut self, kind: AnchorKind, color: MarkColor, spans: Vec<NodeSpan>) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.markers.push(Marker {
            id,
            kind,
            color,
            spans,
        });
        id
    }

    /// Detach a marker. The underlying node text is untouched.
    pub fn unwrap_marker(&mut self, id: MarkerId) -> bool {
        let before = self.markers.len();
        self.markers.retain(|m| m.id != id);
        self.markers.len() != before
    }

    pub fn recolor_marker(&mut self, id: MarkerId, color: MarkColor) -> bool {
        match self.markers.iter_mut().find(|m| m.id == id) {
            Some(marker) => {
                marker.color = color;
                true
            }
            None => false,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// The text a marker covers, for tests and tooltips.
    pub fn marker_text(&self, id: MarkerId) -> Option<String> {
        let marker = self.marker(id)?;
        let mut out = String::new();
        for span in &marker.spans {
            out.push_str(&self.nodes[span.node][span.range.clone()]);
        }
        Some(out)
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
