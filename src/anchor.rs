use crate::color::MarkColor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage collection an anchor belongs to.
///
/// Underline, strikethrough and squiggly marks share one collection; each
/// record carries its own style. Collections are persisted independently
/// and never share a storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Highlights,
    Marks,
    Comments,
    StickyNotes,
    Drawings,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Highlights,
        Namespace::Marks,
        Namespace::Comments,
        Namespace::StickyNotes,
        Namespace::Drawings,
    ];

    pub fn key_prefix(&self) -> &'static str {
        match self {
            Namespace::Highlights => "highlights",
            Namespace::Marks => "marks",
            Namespace::Comments => "comments",
            Namespace::StickyNotes => "sticky_notes",
            Namespace::Drawings => "drawings",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key_prefix())
    }
}

/// What a single anchor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Highlight,
    Underline,
    Strikethrough,
    Squiggly,
    Comment,
    StickyNote,
    Drawing,
}

impl AnchorKind {
    pub fn namespace(&self) -> Namespace {
        match self {
            AnchorKind::Highlight => Namespace::Highlights,
            AnchorKind::Underline | AnchorKind::Strikethrough | AnchorKind::Squiggly => {
                Namespace::Marks
            }
            AnchorKind::Comment => Namespace::Comments,
            AnchorKind::StickyNote => Namespace::StickyNotes,
            AnchorKind::Drawing => Namespace::Drawings,
        }
    }

    /// Text-bound anchors carry a captured selection and are relocated by
    /// text search on restore. Sticky notes and drawings replay stored
    /// geometry instead.
    pub fn is_text_bound(&self) -> bool {
        !matches!(self, AnchorKind::StickyNote | AnchorKind::Drawing)
    }
}

/// Style of a non-highlight text mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStyle {
    Underline,
    Strikethrough,
    Squiggly,
}

impl MarkStyle {
    pub fn kind(&self) -> AnchorKind {
        match self {
            MarkStyle::Underline => AnchorKind::Underline,
            MarkStyle::Strikethrough => AnchorKind::Strikethrough,
            MarkStyle::Squiggly => AnchorKind::Squiggly,
        }
    }
}

/// The captured selection plus surrounding page text.
///
/// Context is captured at creation time and used to pick among multiple
/// occurrences of the same text during restore. Older records without
/// context fields still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTarget {
    pub text: String,
    #[serde(default)]
    pub context_before: String,
    #[serde(default)]
    pub context_after: String,
}

impl TextTarget {
    pub fn new(
        text: impl Into<String>,
        context_before: impl Into<String>,
        context_after: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            context_before: context_before.into(),
            context_after: context_after.into(),
        }
    }

    pub fn bare(text: impl Into<String>) -> Self {
        Self::new(text, "", "")
    }
}

/// Page-local position of a floating note panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotePosition {
    pub x: f32,
    pub y: f32,
}

impl NotePosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Geometry of a drawn shape, in page raster coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
    },
    Arrow {
        from: Point,
        to: Point,
    },
    Freehand {
        points: Vec<Point>,
    },
}

impl Shape {
    pub fn label(&self) -> &'static str {
        match self {
            Shape::Rectangle { .. } => "rectangle",
            Shape::Circle { .. } => "circle",
            Shape::Arrow { .. } => "arrow",
            Shape::Freehand { .. } => "freehand",
        }
    }
}

/// Kind-specific payload of an anchor. Tagged so persisted records state
/// what they are and unknown future fields are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorBody {
    Highlight,
    Underline,
    Strikethrough,
    Squiggly,
    Comment {
        body: String,
        author: String,
    },
    StickyNote {
        body: String,
        position: NotePosition,
    },
    Drawing {
        geometry: Shape,
        stroke_width: f32,
    },
}

/// A persisted record describing a markable span or object on a page.
///
/// Anchors carry only content-addressable data: the captured text plus
/// context for text-bound kinds, stored geometry for the rest. Live marker
/// references are transient view state and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// 1-indexed page the anchor was captured on.
    pub page: u32,
    pub color: MarkColor,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TextTarget>,
    #[serde(flatten)]
    pub body: AnchorBody,
}

impl Anchor {
    fn text_bound(page: u32, color: MarkColor, target: TextTarget, body: AnchorBody) -> Self {
        debug_assert!(!target.text.is_empty());
        Self {
            page,
            color,
            created_at: Utc::now(),
            target: Some(target),
            body,
        }
    }

    pub fn highlight(page: u32, color: MarkColor, target: TextTarget) -> Self {
        Self::text_bound(page, color, target, AnchorBody::Highlight)
    }

    pub fn mark(style: MarkStyle, page: u32, color: MarkColor, target: TextTarget) -> Self {
        let body = match style {
            MarkStyle::Underline => AnchorBody::Underline,
            MarkStyle::Strikethrough => AnchorBody::Strikethrough,
            MarkStyle::Squiggly => AnchorBody::Squiggly,
        };
        Self::text_bound(page, color, target, body)
    }

    pub fn comment(
        page: u32,
        color: MarkColor,
        target: TextTarget,
        body: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self::text_bound(
            page,
            color,
            target,
            AnchorBody::Comment {
                body: body.into(),
                author: author.into(),
            },
        )
    }

    pub fn sticky_note(
        page: u32,
        color: MarkColor,
        body: impl Into<String>,
        position: NotePosition,
    ) -> Self {
        Self {
            page,
            color,
            created_at: Utc::now(),
            target: None,
            body: AnchorBody::StickyNote {
                body: body.into(),
                position,
            },
        }
    }

    pub fn drawing(page: u32, color: MarkColor, geometry: Shape, stroke_width: f32) -> Self {
        Self {
            page,
            color,
            created_at: Utc::now(),
            target: None,
            body: AnchorBody::Drawing {
                geometry,
                stroke_width,
            },
        }
    }

    pub fn kind(&self) -> AnchorKind {
        match self.body {
            AnchorBody::Highlight => AnchorKind::Highlight,
            AnchorBody::Underline => AnchorKind::Underline,
            AnchorBody::Strikethrough => AnchorKind::Strikethrough,
            AnchorBody::Squiggly => AnchorKind::Squiggly,
            AnchorBody::Comment { .. } => AnchorKind::Comment,
            AnchorBody::StickyNote { .. } => AnchorKind::StickyNote,
            AnchorBody::Drawing { .. } => AnchorKind::Drawing,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.kind().namespace()
    }

    /// The text searched for during restore. `None` for sticky notes and
    /// drawings.
    pub fn anchor_text(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.text.as_str())
    }

    /// Text shown in pickers and list views.
    pub fn display_text(&self) -> &str {
        match &self.body {
            AnchorBody::StickyNote { body, .. } => body,
            AnchorBody::Drawing { geometry, .. } => geometry.label(),
            _ => self.anchor_text().unwrap_or_default(),
        }
    }
}
