//! Turns a live selection plus a requested kind/color into a stored
//! anchor and a live marker.

use crate::anchor::{Anchor, AnchorKind, MarkStyle, NotePosition, TextTarget};
use crate::color::ColorError;
use crate::color::MarkColor;
use crate::selection::Selection;
use crate::text_layer::{MarkerId, NodePoint, TextLayer};
use thiserror::Error;

/// Gap between a selection's bounding box and a sticky note spawned from
/// it, in page coordinates.
pub const NOTE_SELECTION_GAP: f32 = 12.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("nothing is selected")]
    NoSelection,
    #[error("selection spans multiple text nodes and could not be isolated")]
    SpanNotIsolated,
    #[error(transparent)]
    InvalidColor(#[from] ColorError),
}

/// A freshly captured anchor together with its live marker handle.
#[derive(Debug)]
pub struct Captured {
    pub anchor: Anchor,
    pub marker: MarkerId,
}

/// Bounding box of the current selection in page coordinates, supplied by
/// the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

fn extract_target(
    layer: &TextLayer,
    selection: &Selection,
    context_chars: usize,
) -> Result<(TextTarget, NodePoint, NodePoint), AnnotationError> {
    let (start, end) = selection
        .ordered_bounds()
        .ok_or(AnnotationError::NoSelection)?;
    let raw = layer
        .slice(start.node_point(), end.node_point())
        .map_err(|_| AnnotationError::NoSelection)?;

    let text = raw.trim();
    if text.is_empty() {
        return Err(AnnotationError::NoSelection);
    }

    let context_before = layer.context_before(start.node_point(), context_chars);
    let context_after = layer.context_after(end.node_point(), context_chars);
    let target = TextTarget::new(text, context_before, context_after);
    Ok((target, start.node_point(), end.node_point()))
}

fn apply_marker(
    layer: &mut TextLayer,
    start: NodePoint,
    end: NodePoint,
    kind: AnchorKind,
    color: &MarkColor,
) -> Result<MarkerId, AnnotationError> {
    layer
        .wrap(start, end, kind, color.clone())
        .map_err(|_| AnnotationError::SpanNotIsolated)
}

/// Capture a highlight over the current selection. No anchor is built if
/// the marker cannot be applied, so stored state never references a span
/// that was never visible.
pub fn capture_highlight(
    layer: &mut TextLayer,
    selection: &Selection,
    color: MarkColor,
    context_chars: usize,
) -> Result<Captured, AnnotationError> {
    let (target, start, end) = extract_target(layer, selection, context_chars)?;
    let marker = apply_marker(layer, start, end, AnchorKind::Highlight, &color)?;
    Ok(Captured {
        anchor: Anchor::highlight(layer.page(), color, target),
        marker,
    })
}

/// Capture an underline/strikethrough/squiggly mark.
pub fn capture_mark(
    layer: &mut TextLayer,
    selection: &Selection,
    style: MarkStyle,
    color: MarkColor,
    context_chars: usize,
) -> Result<Captured, AnnotationError> {
    let (target, start, end) = extract_target(layer, selection, context_chars)?;
    let marker = apply_marker(layer, start, end, style.kind(), &color)?;
    Ok(Captured {
        anchor: Anchor::mark(style, layer.page(), color, target),
        marker,
    })
}

/// Capture a comment attached to the current selection.
pub fn capture_comment(
    layer: &mut TextLayer,
    selection: &Selection,
    body: impl Into<String>,
    author: impl Into<String>,
    color: MarkColor,
    context_chars: usize,
) -> Result<Captured, AnnotationError> {
    let (target, start, end) = extract_target(layer, selection, context_chars)?;
    let marker = apply_marker(layer, start, end, AnchorKind::Comment, &color)?;
    Ok(Captured {
        anchor: Anchor::comment(layer.page(), color, target, body, author),
        marker,
    })
}

/// Sticky note at an explicit page-local position.
pub fn sticky_note_at(
    page: u32,
    color: MarkColor,
    body: impl Into<String>,
    position: NotePosition,
) -> Anchor {
    Anchor::sticky_note(page, color, body, position)
}

/// Sticky note spawned from a text selection: placed just right of the
/// selection's bounding box, top-aligned.
pub fn sticky_note_beside(
    page: u32,
    color: MarkColor,
    body: impl Into<String>,
    selection_box: SelectionBox,
) -> Anchor {
    let position = NotePosition::new(selection_box.right + NOTE_SELECTION_GAP, selection_box.top);
    Anchor::sticky_note(page, color, body, position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorBody;
    use crate::selection::SelectionPoint;

    fn yellow() -> MarkColor {
        MarkColor::parse("#FFFF00").unwrap()
    }

    fn layer() -> TextLayer {
        TextLayer::new(3, vec!["Some Lorem ipsum here", "   ", "and more text"])
    }

    fn select(start: (usize, usize), end: (usize, usize)) -> Selection {
        let mut selection = Selection::new();
        selection.start_at(SelectionPoint::new(3, start.0, start.1));
        selection.update_end(SelectionPoint::new(3, end.0, end.1));
        selection.finish();
        selection
    }

    #[test]
    fn captures_text_color_page_and_context() {
        let mut layer = layer();
        let captured =
            capture_highlight(&mut layer, &select((0, 5), (0, 16)), yellow(), 20).unwrap();

        let anchor = captured.anchor;
        assert_eq!(anchor.page, 3);
        assert_eq!(anchor.anchor_text(), Some("Lorem ipsum"));
        let target = anchor.target.unwrap();
        assert_eq!(target.context_before, "Some ");
        assert_eq!(target.context_after, " here   and more tex");
        assert_eq!(layer.marker_count(), 1);
        assert_eq!(layer.marker_text(captured.marker).unwrap(), "Lorem ipsum");
    }

    #[test]
    fn trims_whitespace_for_storage_but_marks_raw_range() {
        let mut layer = layer();
        let captured =
            capture_highlight(&mut layer, &select((0, 4), (0, 17)), yellow(), 20).unwrap();

        assert_eq!(captured.anchor.anchor_text(), Some("Lorem ipsum"));
        assert_eq!(layer.marker_text(captured.marker).unwrap(), " Lorem ipsum ");
    }

    #[test]
    fn rejected_colors_convert_into_annotation_errors() {
        let err: AnnotationError = MarkColor::parse("red").unwrap_err().into();
        assert!(matches!(err, AnnotationError::InvalidColor(_)));
    }

    #[test]
    fn rejects_empty_selection() {
        let mut layer = layer();
        let result = capture_highlight(&mut layer, &Selection::new(), yellow(), 20);
        assert_eq!(result.unwrap_err(), AnnotationError::NoSelection);
        assert_eq!(layer.marker_count(), 0);
    }

    #[test]
    fn rejects_whitespace_only_selection() {
        let mut layer = layer();
        let result = capture_highlight(&mut layer, &select((1, 0), (1, 3)), yellow(), 20);
        assert_eq!(result.unwrap_err(), AnnotationError::NoSelection);
        assert_eq!(layer.marker_count(), 0);
    }

    #[test]
    fn multi_node_selection_survives_via_fallback() {
        let mut layer = layer();
        let captured =
            capture_mark(&mut layer, &select((0, 16), (2, 3)), MarkStyle::Underline, yellow(), 20)
                .unwrap();

        assert_eq!(captured.anchor.kind(), AnchorKind::Underline);
        assert_eq!(captured.anchor.anchor_text(), Some("here   and"));
        assert!(layer.marker(captured.marker).unwrap().spans.len() > 1);
    }

    #[test]
    fn broken_span_stores_nothing() {
        // Node index out of range: wrap fails after extraction would, so
        // the layer must stay clean.
        let mut layer = layer();
        let selection = select((0, 5), (9, 2));
        let result = capture_highlight(&mut layer, &selection, yellow(), 20);
        assert!(result.is_err());
        assert_eq!(layer.marker_count(), 0);
    }

    #[test]
    fn comment_carries_body_and_author() {
        let mut layer = layer();
        let captured = capture_comment(
            &mut layer,
            &select((0, 5), (0, 16)),
            "worth a second read",
            "ana",
            yellow(),
            20,
        )
        .unwrap();

        match captured.anchor.body {
            AnchorBody::Comment { ref body, ref author } => {
                assert_eq!(body, "worth a second read");
                assert_eq!(author, "ana");
            }
            ref other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn sticky_note_lands_right_of_selection_box() {
        let anchor = sticky_note_beside(
            1,
            yellow(),
            "check this",
            SelectionBox {
                left: 10.0,
                top: 40.0,
                right: 110.0,
                bottom: 60.0,
            },
        );
        match anchor.body {
            AnchorBody::StickyNote { ref position, .. } => {
                assert_eq!(position.x, 110.0 + NOTE_SELECTION_GAP);
                assert_eq!(position.y, 40.0);
            }
            ref other => panic!("unexpected body: {other:?}"),
        }
    }
}
