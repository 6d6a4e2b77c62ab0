use crate::anchor::{Anchor, AnchorBody, Namespace, NotePosition};
use crate::color::MarkColor;
use crate::storage::KeyValueStore;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Summary rows are truncated to this many characters for picker display.
pub const SUMMARY_TEXT_CHARS: usize = 50;

/// Lightweight row for picker UIs.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSummary {
    pub index: usize,
    pub text: String,
    pub page: u32,
    pub color: MarkColor,
}

/// Partial in-place update: comment/note body text, sticky note position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NotePosition>,
}

/// Ordered per-kind anchor collections for one document, persisted under
/// `{namespace}.{document_identity}` keys.
///
/// Mutations persist the affected collection immediately; persistence
/// failures are logged and the in-memory state stands. A read failure on
/// open is treated as no prior state.
pub struct AnchorStore {
    document: String,
    storage: Box<dyn KeyValueStore>,
    lists: HashMap<Namespace, Vec<Anchor>>,
}

impl AnchorStore {
    pub fn open(document: impl Into<String>, storage: Box<dyn KeyValueStore>) -> Self {
        let document = document.into();
        let mut lists = HashMap::new();
        for ns in Namespace::ALL {
            lists.insert(ns, load_list(storage.as_ref(), &storage_key(ns, &document)));
        }
        Self {
            document,
            storage,
            lists,
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    fn list(&self, ns: Namespace) -> &[Anchor] {
        self.lists.get(&ns).map(Vec::as_slice).unwrap_or(&[])
    }

    fn list_mut(&mut self, ns: Namespace) -> &mut Vec<Anchor> {
        self.lists.entry(ns).or_default()
    }

    /// Append to the end of the anchor's collection and persist it.
    pub fn append(&mut self, anchor: Anchor) {
        let ns = anchor.namespace();
        self.list_mut(ns).push(anchor);
        self.persist(ns);
    }

    /// Remove the anchor at `index`. Out-of-range indices are logged and
    /// ignored; callers must not cache indices across a removal.
    pub fn remove_at(&mut self, ns: Namespace, index: usize) {
        let list = self.list_mut(ns);
        if index >= list.len() {
            warn!(
                "Ignoring removal of {ns} index {index} (only {} stored)",
                list.len()
            );
            return;
        }
        list.remove(index);
        self.persist(ns);
    }

    /// Apply a partial update in place and persist. Out-of-range indices
    /// and patches that do not apply to the anchor's kind are logged
    /// no-ops.
    pub fn update_content(&mut self, ns: Namespace, index: usize, patch: AnchorPatch) {
        let list = self.list_mut(ns);
        let Some(anchor) = list.get_mut(index) else {
            warn!("Ignoring update of {ns} index {index}: out of range");
            return;
        };

        let mut applied = false;
        match &mut anchor.body {
            AnchorBody::Comment { body, .. } => {
                if let Some(new_body) = patch.body {
                    *body = new_body;
                    applied = true;
                }
            }
            AnchorBody::StickyNote { body, position } => {
                if let Some(new_body) = patch.body {
                    *body = new_body;
                    applied = true;
                }
                if let Some(new_position) = patch.position {
                    *position = new_position;
                    applied = true;
                }
            }
            _ => {}
        }

        if applied {
            self.persist(ns);
        } else {
            warn!("Patch did not apply to {ns} index {index}");
        }
    }

    /// Empty one collection. Returns how many anchors were removed, for
    /// user feedback.
    pub fn clear_all(&mut self, ns: Namespace) -> usize {
        let removed = {
            let list = self.list_mut(ns);
            let removed = list.len();
            list.clear();
            removed
        };
        self.persist(ns);
        removed
    }

    pub fn list_summaries(&self, ns: Namespace) -> Vec<AnchorSummary> {
        self.list(ns)
            .iter()
            .enumerate()
            .map(|(index, anchor)| AnchorSummary {
                index,
                text: truncate_chars(anchor.display_text(), SUMMARY_TEXT_CHARS),
                page: anchor.page,
                color: anchor.color.clone(),
            })
            .collect()
    }

    pub fn anchors(&self, ns: Namespace) -> &[Anchor] {
        self.list(ns)
    }

    pub fn get(&self, ns: Namespace, index: usize) -> Option<&Anchor> {
        self.list(ns).get(index)
    }

    pub fn len(&self, ns: Namespace) -> usize {
        self.list(ns).len()
    }

    pub fn is_empty(&self, ns: Namespace) -> bool {
        self.list(ns).is_empty()
    }

    /// Flat snapshot across all collections, in namespace then insertion
    /// order. This is the restore payload shape.
    pub fn all_anchors(&self) -> Vec<Anchor> {
        Namespace::ALL
            .iter()
            .flat_map(|ns| self.list(*ns).iter().cloned())
            .collect()
    }

    fn persist(&mut self, ns: Namespace) {
        let key = storage_key(ns, &self.document);
        let list = self.list(ns);
        let json = match serde_json::to_string(list) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.save(&key, &json) {
            error!("Failed to persist {key}: {e}");
        }
    }
}

fn storage_key(ns: Namespace, document: &str) -> String {
    format!("{}.{}", ns.key_prefix(), document)
}

fn load_list(storage: &dyn KeyValueStore, key: &str) -> Vec<Anchor> {
    let raw = match storage.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read {key}, starting empty: {e}");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(list) => list,
        Err(e) => {
            warn!("Failed to parse {key}, starting empty: {e}");
            Vec::new()
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let truncated: String = text.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::TextTarget;
    use crate::storage::{MemoryStore, SharedMemoryStore};

    fn yellow() -> MarkColor {
        MarkColor::parse("#FFFF00").unwrap()
    }

    fn highlight(text: &str) -> Anchor {
        Anchor::highlight(1, yellow(), TextTarget::bare(text))
    }

    fn open_memory(document: &str) -> AnchorStore {
        AnchorStore::open(document, Box::new(MemoryStore::new()))
    }

    #[test]
    fn append_then_summarize_round_trip() {
        let mut store = open_memory("/books/a.pdf");
        let long_text = "x".repeat(80);
        store.append(highlight("short one"));
        store.append(highlight(&long_text));

        let summaries = store.list_summaries(Namespace::Highlights);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].text, "short one");

        let last = &summaries[1];
        assert_eq!(last.index, 1);
        assert_eq!(last.text, format!("{}...", "x".repeat(50)));
        assert_eq!(last.page, 1);
    }

    #[test]
    fn remove_at_renumbers_following_entries() {
        let mut store = open_memory("/books/a.pdf");
        store.append(highlight("A0"));
        store.append(highlight("A1"));
        store.append(highlight("A2"));

        store.remove_at(Namespace::Highlights, 1);
        let texts: Vec<_> = store
            .anchors(Namespace::Highlights)
            .iter()
            .map(|a| a.anchor_text().unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["A0", "A2"]);

        // Index 1 now names what used to be A2.
        store.remove_at(Namespace::Highlights, 1);
        let texts: Vec<_> = store
            .anchors(Namespace::Highlights)
            .iter()
            .map(|a| a.anchor_text().unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["A0"]);
    }

    #[test]
    fn remove_at_out_of_range_is_a_noop() {
        let mut store = open_memory("/books/a.pdf");
        store.append(highlight("only"));
        store.remove_at(Namespace::Highlights, 5);
        assert_eq!(store.len(Namespace::Highlights), 1);
    }

    #[test]
    fn duplicate_text_stays_distinct_and_clear_all_counts() {
        let mut store = open_memory("/books/a.pdf");
        store.append(highlight("the"));
        store.append(highlight("the"));
        assert_eq!(store.len(Namespace::Highlights), 2);

        assert_eq!(store.clear_all(Namespace::Highlights), 2);
        assert!(store.list_summaries(Namespace::Highlights).is_empty());
    }

    #[test]
    fn update_content_edits_sticky_note_in_place() {
        let mut store = open_memory("/books/a.pdf");
        store.append(Anchor::sticky_note(
            1,
            yellow(),
            "check this",
            NotePosition::new(120.0, 80.0),
        ));

        store.update_content(
            Namespace::StickyNotes,
            0,
            AnchorPatch {
                body: None,
                position: Some(NotePosition::new(200.0, 150.0)),
            },
        );

        match &store.anchors(Namespace::StickyNotes)[0].body {
            AnchorBody::StickyNote { body, position } => {
                assert_eq!(body, "check this");
                assert_eq!(*position, NotePosition::new(200.0, 150.0));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn update_content_ignores_bad_index_and_bad_kind() {
        let mut store = open_memory("/books/a.pdf");
        store.append(highlight("plain"));

        store.update_content(
            Namespace::Highlights,
            0,
            AnchorPatch {
                body: Some("nope".to_string()),
                position: None,
            },
        );
        store.update_content(Namespace::Comments, 3, AnchorPatch::default());

        assert_eq!(
            store.anchors(Namespace::Highlights)[0].anchor_text(),
            Some("plain")
        );
    }

    #[test]
    fn collections_reload_from_shared_storage() {
        let backend = SharedMemoryStore::new();
        {
            let mut store = AnchorStore::open("/books/a.pdf", Box::new(backend.clone()));
            store.append(highlight("persisted"));
            store.append(Anchor::comment(
                2,
                yellow(),
                TextTarget::bare("ctx"),
                "a comment",
                "ana",
            ));
        }

        let reopened = AnchorStore::open("/books/a.pdf", Box::new(backend));
        assert_eq!(reopened.len(Namespace::Highlights), 1);
        assert_eq!(reopened.len(Namespace::Comments), 1);
        assert_eq!(
            reopened.anchors(Namespace::Highlights)[0].anchor_text(),
            Some("persisted")
        );
    }

    #[test]
    fn documents_do_not_leak_into_each_other() {
        let backend = SharedMemoryStore::new();
        {
            let mut store = AnchorStore::open("/books/a.pdf", Box::new(backend.clone()));
            store.append(highlight("mine"));
        }

        let other = AnchorStore::open("/books/b.pdf", Box::new(backend.clone()));
        assert!(other.is_empty(Namespace::Highlights));

        let original = AnchorStore::open("/books/a.pdf", Box::new(backend));
        assert_eq!(original.len(Namespace::Highlights), 1);
    }

    #[test]
    fn kinds_do_not_share_keys() {
        let mut store = open_memory("/books/a.pdf");
        store.append(highlight("h"));
        store.append(Anchor::mark(
            crate::anchor::MarkStyle::Underline,
            1,
            yellow(),
            TextTarget::bare("u"),
        ));

        assert_eq!(store.len(Namespace::Highlights), 1);
        assert_eq!(store.len(Namespace::Marks), 1);
        assert_eq!(store.len(Namespace::Comments), 0);
    }

    #[test]
    fn corrupt_stored_payload_loads_as_empty() {
        let mut backend = SharedMemoryStore::new();
        use crate::storage::KeyValueStore;
        backend
            .save("highlights./books/a.pdf", "not json at all")
            .unwrap();

        let store = AnchorStore::open("/books/a.pdf", Box::new(backend));
        assert!(store.is_empty(Namespace::Highlights));
    }

    #[test]
    fn all_anchors_flattens_in_namespace_order() {
        let mut store = open_memory("/books/a.pdf");
        store.append(Anchor::sticky_note(1, yellow(), "n", NotePosition::new(0.0, 0.0)));
        store.append(highlight("h"));

        let all = store.all_anchors();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].namespace(), Namespace::Highlights);
        assert_eq!(all[1].namespace(), Namespace::StickyNotes);
    }
}
