//! List views over stored anchors: picker state, jump targets, and the
//! flash shown when jumping to a live marker.

use crate::color::MarkColor;
use crate::store::AnchorSummary;
use crate::text_layer::MarkerId;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

static FLASH_COLOR: LazyLock<MarkColor> =
    LazyLock::new(|| MarkColor::parse("#FFA500").expect("flash color literal"));

/// Color a marker briefly takes while the view flashes it.
pub fn flash_color() -> MarkColor {
    FLASH_COLOR.clone()
}

/// Picker over anchor summaries, rebuilt from the store on every open so
/// indices are never stale across a delete.
#[derive(Debug)]
pub struct AnchorPicker {
    items: Vec<AnchorSummary>,
    selected: Option<usize>,
}

impl AnchorPicker {
    pub fn new(items: Vec<AnchorSummary>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    pub fn items(&self) -> &[AnchorSummary] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i == 0 {
                    self.items.len().saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn selected(&self) -> Option<&AnchorSummary> {
        self.selected.and_then(|i| self.items.get(i))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }
}

/// Where a picked anchor lives now. `marker` is present only while the
/// live marker from this load still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    pub page: u32,
    pub marker: Option<MarkerId>,
}

/// A marker temporarily recolored after a jump; reverts on expiry.
#[derive(Debug, Clone)]
pub struct MarkerFlash {
    pub page: u32,
    pub marker: MarkerId,
    pub original: MarkColor,
    pub until: Instant,
}

impl MarkerFlash {
    pub fn new(
        page: u32,
        marker: MarkerId,
        original: MarkColor,
        now: Instant,
        duration: Duration,
    ) -> Self {
        Self {
            page,
            marker,
            original,
            until: now + duration,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(n: usize) -> Vec<AnchorSummary> {
        (0..n)
            .map(|index| AnchorSummary {
                index,
                text: format!("entry {index}"),
                page: 1,
                color: MarkColor::parse("#FFFF00").unwrap(),
            })
            .collect()
    }

    #[test]
    fn selection_starts_at_first_entry() {
        let picker = AnchorPicker::new(summaries(3));
        assert_eq!(picker.selected_index(), Some(0));

        let empty = AnchorPicker::new(Vec::new());
        assert_eq!(empty.selected_index(), None);
    }

    #[test]
    fn next_and_previous_wrap_around() {
        let mut picker = AnchorPicker::new(summaries(3));
        picker.next();
        picker.next();
        assert_eq!(picker.selected_index(), Some(2));
        picker.next();
        assert_eq!(picker.selected_index(), Some(0));

        picker.previous();
        assert_eq!(picker.selected_index(), Some(2));
    }

    #[test]
    fn navigation_on_empty_picker_is_harmless() {
        let mut picker = AnchorPicker::new(Vec::new());
        picker.next();
        picker.previous();
        assert_eq!(picker.selected(), None);
    }

    #[test]
    fn flash_expires_after_its_duration() {
        let layer = &mut crate::text_layer::TextLayer::new(1, vec!["abc"]);
        let id = layer
            .wrap(
                crate::text_layer::NodePoint::new(0, 0),
                crate::text_layer::NodePoint::new(0, 3),
                crate::anchor::AnchorKind::Highlight,
                MarkColor::parse("#FFFF00").unwrap(),
            )
            .unwrap();

        let t0 = Instant::now();
        let flash = MarkerFlash::new(
            1,
            id,
            MarkColor::parse("#FFFF00").unwrap(),
            t0,
            Duration::from_millis(600),
        );
        assert!(!flash.is_expired(t0 + Duration::from_millis(100)));
        assert!(flash.is_expired(t0 + Duration::from_millis(600)));
    }

    #[test]
    fn flash_color_differs_from_common_mark_colors() {
        assert_ne!(flash_color(), MarkColor::parse("#FFFF00").unwrap());
    }
}
