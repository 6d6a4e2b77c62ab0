//! Single-threaded controller for one open document: rendered pages, the
//! anchor store, deferred restore, and the transient live-marker
//! back-references.
//!
//! Live references (marker ids, note panel slots, overlay shape slots) are
//! a per-load cache. They are invalidated wholesale on every reload and
//! are never required for correctness; the persisted anchors alone are.

use crate::anchor::{Anchor, AnchorBody, MarkStyle, Namespace, NotePosition, Shape};
use crate::capture::{self, AnnotationError, SelectionBox};
use crate::color::MarkColor;
use crate::config;
use crate::document::DocumentInfo;
use crate::drawing::{DrawTool, DrawingSession, Overlay};
use crate::navigation::{AnchorPicker, JumpTarget, MarkerFlash, flash_color};
use crate::notify::NotificationManager;
use crate::restore::{self, RestoreGate, RestoreOutcome};
use crate::selection::Selection;
use crate::storage::KeyValueStore;
use crate::store::{AnchorPatch, AnchorStore};
use crate::text_layer::{MarkerId, TextLayer};
use log::{debug, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A floating note panel on a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct NotePanel {
    pub body: String,
    pub position: NotePosition,
    pub color: MarkColor,
}

/// One rendered page: its text layer, note panels and drawing overlay.
#[derive(Debug)]
pub struct PageView {
    pub layer: TextLayer,
    pub notes: Vec<NotePanel>,
    pub overlay: Overlay,
}

impl PageView {
    pub fn new(layer: TextLayer, overlay: Overlay) -> Self {
        Self {
            layer,
            notes: Vec::new(),
            overlay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveRef {
    Marker { page: u32, marker: MarkerId },
    Note { page: u32, slot: usize },
    Shape { page: u32, slot: usize },
}

#[derive(Debug)]
struct DrawingMode {
    session: DrawingSession,
    page: u32,
    color: MarkColor,
    stroke_width: f32,
}

/// Tunables a view is constructed with; defaults come from settings.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub context_chars: usize,
    pub restore_delay: Duration,
    pub flash_duration: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            context_chars: 20,
            restore_delay: Duration::from_millis(400),
            flash_duration: Duration::from_millis(600),
        }
    }
}

impl ViewOptions {
    pub fn from_settings() -> Self {
        let settings = config::get();
        Self {
            context_chars: settings.context_chars,
            restore_delay: Duration::from_millis(settings.restore_delay_ms),
            flash_duration: Duration::from_millis(settings.flash_duration_ms),
        }
    }
}

pub struct DocumentView {
    document: DocumentInfo,
    store: AnchorStore,
    pages: Vec<PageView>,
    live: HashMap<Namespace, Vec<Option<LiveRef>>>,
    gate: RestoreGate,
    flash: Option<MarkerFlash>,
    drawing: Option<DrawingMode>,
    last_restore: Option<RestoreOutcome>,
    options: ViewOptions,
    pub notifications: NotificationManager,
}

fn find_page(pages: &mut [PageView], page: u32) -> Option<&mut PageView> {
    pages.iter_mut().find(|v| v.layer.page() == page)
}

impl DocumentView {
    pub fn new(document: DocumentInfo, storage: Box<dyn KeyValueStore>) -> Self {
        Self::with_options(document, storage, ViewOptions::from_settings())
    }

    pub fn with_options(
        document: DocumentInfo,
        storage: Box<dyn KeyValueStore>,
        options: ViewOptions,
    ) -> Self {
        let store = AnchorStore::open(document.identity.clone(), storage);
        let mut live = HashMap::new();
        for ns in Namespace::ALL {
            live.insert(ns, vec![None; store.len(ns)]);
        }
        Self {
            document,
            store,
            pages: Vec::new(),
            live,
            gate: RestoreGate::new(options.restore_delay),
            flash: None,
            drawing: None,
            last_restore: None,
            options,
            notifications: NotificationManager::new(),
        }
    }

    pub fn document(&self) -> &DocumentInfo {
        &self.document
    }

    pub fn store(&self) -> &AnchorStore {
        &self.store
    }

    pub fn page_view(&self, page: u32) -> Option<&PageView> {
        self.pages.iter().find(|v| v.layer.page() == page)
    }

    pub fn last_restore(&self) -> Option<RestoreOutcome> {
        self.last_restore
    }

    /// Install freshly rendered pages. Every live reference from the
    /// previous render is dropped; the restore pass is scheduled.
    pub fn load_pages(&mut self, pages: Vec<PageView>, now: Instant) {
        self.pages = pages;
        for ns in Namespace::ALL {
            self.live.insert(ns, vec![None; self.store.len(ns)]);
        }
        self.flash = None;
        self.drawing = None;
        self.last_restore = None;
        self.gate.arm(now);
        debug!(
            "Loaded {} rendered pages for {}",
            self.pages.len(),
            self.document.identity
        );
    }

    /// Drive deferred work: notification expiry, flash revert, and the
    /// delayed restore pass.
    pub fn tick(&mut self, now: Instant) {
        self.notifications.update();
        if self.flash.as_ref().is_some_and(|f| f.is_expired(now)) {
            self.expire_flash();
        }
        if self.gate.ready(now) {
            let outcome = self.run_restore();
            self.last_restore = Some(outcome);
        }
    }

    fn live_mut(&mut self, ns: Namespace) -> &mut Vec<Option<LiveRef>> {
        self.live.entry(ns).or_default()
    }

    fn live_ref(&self, ns: Namespace, index: usize) -> Option<LiveRef> {
        self.live.get(&ns).and_then(|l| l.get(index)).copied().flatten()
    }

    fn capture_with<F>(&mut self, selection: &Selection, f: F) -> Result<(), AnnotationError>
    where
        F: FnOnce(&mut TextLayer, &Selection, usize) -> Result<capture::Captured, AnnotationError>,
    {
        let Some((start, _)) = selection.ordered_bounds() else {
            self.notifications.info("Select some text first");
            return Err(AnnotationError::NoSelection);
        };
        let page = start.page;
        let context_chars = self.options.context_chars;
        let result = match find_page(&mut self.pages, page) {
            Some(view) => f(&mut view.layer, selection, context_chars),
            None => Err(AnnotationError::NoSelection),
        };
        match result {
            Ok(captured) => {
                let marker = captured.marker;
                let ns = captured.anchor.namespace();
                self.store.append(captured.anchor);
                self.live_mut(ns).push(Some(LiveRef::Marker { page, marker }));
                Ok(())
            }
            Err(e) => {
                self.notifications.warn(e.to_string());
                Err(e)
            }
        }
    }

    pub fn add_highlight(
        &mut self,
        selection: &Selection,
        color: MarkColor,
    ) -> Result<(), AnnotationError> {
        self.capture_with(selection, |layer, sel, ctx| {
            capture::capture_highlight(layer, sel, color, ctx)
        })
    }

    pub fn add_mark(
        &mut self,
        selection: &Selection,
        style: MarkStyle,
        color: MarkColor,
    ) -> Result<(), AnnotationError> {
        self.capture_with(selection, |layer, sel, ctx| {
            capture::capture_mark(layer, sel, style, color, ctx)
        })
    }

    pub fn add_comment(
        &mut self,
        selection: &Selection,
        body: impl Into<String>,
        author: impl Into<String>,
        color: MarkColor,
    ) -> Result<(), AnnotationError> {
        let body = body.into();
        let author = author.into();
        self.capture_with(selection, |layer, sel, ctx| {
            capture::capture_comment(layer, sel, body, author, color, ctx)
        })
    }

    pub fn add_sticky_note(
        &mut self,
        page: u32,
        body: impl Into<String>,
        color: MarkColor,
        position: NotePosition,
    ) {
        self.add_note_anchor(capture::sticky_note_at(page, color, body, position));
    }

    pub fn add_sticky_note_beside(
        &mut self,
        page: u32,
        body: impl Into<String>,
        color: MarkColor,
        selection_box: SelectionBox,
    ) {
        self.add_note_anchor(capture::sticky_note_beside(page, color, body, selection_box));
    }

    fn add_note_anchor(&mut self, anchor: Anchor) {
        let (body, position) = match &anchor.body {
            AnchorBody::StickyNote { body, position } => (body.clone(), *position),
            _ => return,
        };
        let page = anchor.page;
        let color = anchor.color.clone();
        self.store.append(anchor);
        let live = self.place_note_panel(page, body, position, color);
        self.live_mut(Namespace::StickyNotes).push(live);
    }

    fn place_note_panel(
        &mut self,
        page: u32,
        body: String,
        position: NotePosition,
        color: MarkColor,
    ) -> Option<LiveRef> {
        let view = find_page(&mut self.pages, page)?;
        view.notes.push(NotePanel {
            body,
            position,
            color,
        });
        Some(LiveRef::Note {
            page,
            slot: view.notes.len() - 1,
        })
    }

    /// Drag a sticky note; the new position is persisted immediately.
    pub fn move_sticky_note(&mut self, index: usize, position: NotePosition) {
        if index >= self.store.len(Namespace::StickyNotes) {
            warn!("Ignoring move of sticky note {index}: out of range");
            return;
        }
        self.store.update_content(
            Namespace::StickyNotes,
            index,
            AnchorPatch {
                body: None,
                position: Some(position),
            },
        );
        if let Some(LiveRef::Note { page, slot }) = self.live_ref(Namespace::StickyNotes, index) {
            if let Some(view) = find_page(&mut self.pages, page) {
                if let Some(panel) = view.notes.get_mut(slot) {
                    panel.position = position;
                }
            }
        }
    }

    pub fn edit_sticky_note(&mut self, index: usize, body: impl Into<String>) {
        let body = body.into();
        if index >= self.store.len(Namespace::StickyNotes) {
            warn!("Ignoring edit of sticky note {index}: out of range");
            return;
        }
        self.store.update_content(
            Namespace::StickyNotes,
            index,
            AnchorPatch {
                body: Some(body.clone()),
                position: None,
            },
        );
        if let Some(LiveRef::Note { page, slot }) = self.live_ref(Namespace::StickyNotes, index) {
            if let Some(view) = find_page(&mut self.pages, page) {
                if let Some(panel) = view.notes.get_mut(slot) {
                    panel.body = body;
                }
            }
        }
    }

    pub fn edit_comment(&mut self, index: usize, body: impl Into<String>) {
        self.store.update_content(
            Namespace::Comments,
            index,
            AnchorPatch {
                body: Some(body.into()),
                position: None,
            },
        );
    }

    pub fn begin_drawing(&mut self, page: u32, tool: DrawTool, color: MarkColor, stroke_width: f32) {
        self.drawing = Some(DrawingMode {
            session: DrawingSession::new(tool),
            page,
            color,
            stroke_width,
        });
    }

    /// Leave drawing mode. Committed shapes stay; an unfinished stroke is
    /// abandoned.
    pub fn end_drawing(&mut self) {
        self.drawing = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing.is_some()
    }

    pub fn drawing_pointer_down(&mut self, x: f32, y: f32) {
        let Some(mode) = self.drawing.as_mut() else {
            return;
        };
        let Some(view) = find_page(&mut self.pages, mode.page) else {
            return;
        };
        let point = view.overlay.to_canvas(x, y);
        mode.session.pointer_down(point);
    }

    /// Returns the shape to preview on top of the committed ones.
    pub fn drawing_pointer_move(&mut self, x: f32, y: f32) -> Option<Shape> {
        let mode = self.drawing.as_mut()?;
        let view = find_page(&mut self.pages, mode.page)?;
        let point = view.overlay.to_canvas(x, y);
        mode.session.pointer_move(point)
    }

    pub fn drawing_pointer_up(&mut self, x: f32, y: f32) {
        let Some(mode) = self.drawing.as_mut() else {
            return;
        };
        let Some(view) = find_page(&mut self.pages, mode.page) else {
            return;
        };
        let point = view.overlay.to_canvas(x, y);
        let Some(shape) = mode.session.pointer_up(point) else {
            return;
        };
        let page = mode.page;
        let color = mode.color.clone();
        let stroke_width = mode.stroke_width;
        view.overlay.commit(shape.clone(), color.clone(), stroke_width);
        let slot = view.overlay.shapes().len() - 1;

        self.store
            .append(Anchor::drawing(page, color, shape, stroke_width));
        self.live_mut(Namespace::Drawings)
            .push(Some(LiveRef::Shape { page, slot }));
    }

    /// Delete one anchor: detach its live counterpart and remove it from
    /// the store in the same logical step.
    pub fn delete_at(&mut self, ns: Namespace, index: usize) {
        if index >= self.store.len(ns) {
            warn!("Ignoring delete of {ns} index {index}: out of range");
            return;
        }
        let removed = {
            let live = self.live_mut(ns);
            if index < live.len() {
                live.remove(index)
            } else {
                None
            }
        };
        if let Some(live_ref) = removed {
            self.detach_live(live_ref);
        }
        self.store.remove_at(ns, index);
    }

    /// Empty a whole collection. Destructive, so the caller passes the
    /// user's explicit confirmation. Returns the number removed.
    pub fn clear_kind(&mut self, ns: Namespace, confirmed: bool) -> usize {
        if !confirmed {
            return 0;
        }
        let refs = self.live.insert(ns, Vec::new()).unwrap_or_default();
        match ns {
            Namespace::StickyNotes => {
                for view in &mut self.pages {
                    view.notes.clear();
                }
            }
            Namespace::Drawings => {
                for view in &mut self.pages {
                    view.overlay.clear();
                }
            }
            _ => {
                for live_ref in refs.into_iter().flatten() {
                    self.detach_live(live_ref);
                }
            }
        }
        let removed = self.store.clear_all(ns);
        self.notifications
            .info(format!("Removed {removed} {}", ns.key_prefix()));
        removed
    }

    fn detach_live(&mut self, live: LiveRef) {
        match live {
            LiveRef::Marker { page, marker } => {
                if self
                    .flash
                    .as_ref()
                    .is_some_and(|f| f.marker == marker && f.page == page)
                {
                    self.flash = None;
                }
                if let Some(view) = find_page(&mut self.pages, page) {
                    view.layer.unwrap_marker(marker);
                }
            }
            LiveRef::Note { page, slot } => {
                if let Some(view) = find_page(&mut self.pages, page) {
                    if slot < view.notes.len() {
                        view.notes.remove(slot);
                    }
                }
                self.shift_slots(Namespace::StickyNotes, page, slot);
            }
            LiveRef::Shape { page, slot } => {
                if let Some(view) = find_page(&mut self.pages, page) {
                    view.overlay.remove_at(slot);
                }
                self.shift_slots(Namespace::Drawings, page, slot);
            }
        }
    }

    fn shift_slots(&mut self, ns: Namespace, page: u32, removed_slot: usize) {
        if let Some(list) = self.live.get_mut(&ns) {
            for entry in list.iter_mut().flatten() {
                match entry {
                    LiveRef::Note { page: p, slot } | LiveRef::Shape { page: p, slot } => {
                        if *p == page && *slot > removed_slot {
                            *slot -= 1;
                        }
                    }
                    LiveRef::Marker { .. } => {}
                }
            }
        }
    }

    /// Picker rows for one collection, rebuilt from the store so indices
    /// are current.
    pub fn open_picker(&self, ns: Namespace) -> AnchorPicker {
        AnchorPicker::new(self.store.list_summaries(ns))
    }

    /// Resolve a picked entry. When the live marker from this load still
    /// exists it is flashed before reverting to the anchor's own color.
    pub fn jump_to(&mut self, ns: Namespace, index: usize, now: Instant) -> Option<JumpTarget> {
        let anchor = self.store.get(ns, index)?;
        let page = anchor.page;
        let anchor_color = anchor.color.clone();

        let marker = match self.live_ref(ns, index) {
            Some(LiveRef::Marker { marker, .. }) => Some(marker),
            _ => None,
        };
        if let Some(id) = marker {
            self.expire_flash();
            if let Some(view) = find_page(&mut self.pages, page) {
                if view.layer.recolor_marker(id, flash_color()) {
                    self.flash = Some(MarkerFlash::new(
                        page,
                        id,
                        anchor_color,
                        now,
                        self.options.flash_duration,
                    ));
                }
            }
        }
        Some(JumpTarget { page, marker })
    }

    fn expire_flash(&mut self) {
        if let Some(flash) = self.flash.take() {
            if let Some(view) = find_page(&mut self.pages, flash.page) {
                view.layer.recolor_marker(flash.marker, flash.original);
            }
        }
    }

    fn run_restore(&mut self) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();
        let page_count = self.document.page_count;

        // The pass rebuilds every live marker, panel and shape from the
        // persisted set, so it starts from a clean visual state. Markers
        // applied at capture time before the deferred pass are re-derived
        // here rather than duplicated.
        self.flash = None;
        for view in &mut self.pages {
            view.layer.clear_markers();
            view.notes.clear();
            view.overlay.clear();
        }

        for ns in [Namespace::Highlights, Namespace::Marks, Namespace::Comments] {
            let anchors = self.store.anchors(ns).to_vec();
            let mut live = vec![None; anchors.len()];
            for view in &mut self.pages {
                let (page_outcome, markers) =
                    restore::restore_page(&mut view.layer, page_count, &anchors);
                outcome.absorb(page_outcome);
                let page = view.layer.page();
                for (i, marker) in markers.into_iter().enumerate() {
                    if let Some(marker) = marker {
                        live[i] = Some(LiveRef::Marker { page, marker });
                    }
                }
            }
            self.live.insert(ns, live);
        }

        let notes = self.store.anchors(Namespace::StickyNotes).to_vec();
        let mut live = Vec::with_capacity(notes.len());
        for anchor in &notes {
            let AnchorBody::StickyNote { body, position } = &anchor.body else {
                live.push(None);
                continue;
            };
            if anchor.page > page_count {
                live.push(None);
                continue;
            }
            outcome.requested += 1;
            match self.place_note_panel(anchor.page, body.clone(), *position, anchor.color.clone())
            {
                Some(live_ref) => {
                    outcome.applied += 1;
                    live.push(Some(live_ref));
                }
                None => live.push(None),
            }
        }
        self.live.insert(Namespace::StickyNotes, live);

        let drawings = self.store.anchors(Namespace::Drawings).to_vec();
        let mut live = Vec::with_capacity(drawings.len());
        for anchor in &drawings {
            let AnchorBody::Drawing {
                geometry,
                stroke_width,
            } = &anchor.body
            else {
                live.push(None);
                continue;
            };
            if anchor.page > page_count {
                live.push(None);
                continue;
            }
            outcome.requested += 1;
            match find_page(&mut self.pages, anchor.page) {
                Some(view) => {
                    view.overlay
                        .commit(geometry.clone(), anchor.color.clone(), *stroke_width);
                    live.push(Some(LiveRef::Shape {
                        page: anchor.page,
                        slot: view.overlay.shapes().len() - 1,
                    }));
                    outcome.applied += 1;
                }
                None => live.push(None),
            }
        }
        self.live.insert(Namespace::Drawings, live);

        debug!(
            "Restore pass for {}: {}/{} anchors reapplied",
            self.document.identity, outcome.applied, outcome.requested
        );
        outcome
    }
}
