//! Live text selection state for a rendered page.

use crate::text_layer::NodePoint;

/// A point in the selection: page plus position in that page's text layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionPoint {
    /// 1-indexed page
    pub page: u32,
    /// Text node index within the page's layer
    pub node: usize,
    /// Byte offset into the node's text
    pub offset: usize,
}

impl SelectionPoint {
    pub fn new(page: u32, node: usize, offset: usize) -> Self {
        Self { page, node, offset }
    }

    pub fn node_point(&self) -> NodePoint {
        NodePoint::new(self.node, self.offset)
    }

    fn sort_key(&self) -> (u32, usize, usize) {
        (self.page, self.node, self.offset)
    }
}

/// Text selection state
#[derive(Clone, Debug, Default)]
pub struct Selection {
    /// Start point of selection
    pub start: Option<SelectionPoint>,
    /// End point of selection
    pub end: Option<SelectionPoint>,
    /// Whether selection is in progress
    pub is_selecting: bool,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start selection at a point
    pub fn start_at(&mut self, point: SelectionPoint) {
        self.start = Some(point);
        self.end = Some(point);
        self.is_selecting = true;
    }

    /// Update the end point during selection
    pub fn update_end(&mut self, point: SelectionPoint) {
        if self.is_selecting {
            self.end = Some(point);
        }
    }

    /// Finish selection
    pub fn finish(&mut self) {
        self.is_selecting = false;
    }

    /// Clear selection
    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
        self.is_selecting = false;
    }

    /// Check if there is an active selection
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Get ordered selection bounds (start before end)
    #[must_use]
    pub fn ordered_bounds(&self) -> Option<(SelectionPoint, SelectionPoint)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                if start.sort_key() <= end.sort_key() {
                    Some((start, end))
                } else {
                    Some((end, start))
                }
            }
            _ => None,
        }
    }
}
