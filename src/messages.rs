//! Message contract between the rendering surface and the host.
//!
//! The wire form is JSON with a `type` tag. Payloads carry full anchor
//! records, so either side can be replaced by an out-of-process peer.
//! Unknown fields on incoming messages are ignored.

use crate::anchor::{Anchor, Namespace, NotePosition};
use crate::store::{AnchorPatch, AnchorStore};
use serde::{Deserialize, Serialize};

/// Events the rendering surface sends to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewMessage {
    /// A new anchor was captured; `count` is the view's resulting number
    /// of anchors of that kind, for diagnostics.
    AnchorAdded { anchor: Anchor, count: usize },
    AnchorRemoved { namespace: Namespace, index: usize },
    AnchorsCleared { namespace: Namespace, count: usize },
    /// Ask the host for the full stored set to restore from.
    RequestStoredAnchors,
    StickyNoteUpdated {
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<NotePosition>,
    },
}

/// Replies the host sends back to the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    RestoreAnchors { anchors: Vec<Anchor> },
}

/// Host-side endpoint: applies view events to the persisted store and
/// answers restore requests.
pub struct HostBridge {
    store: AnchorStore,
}

impl HostBridge {
    pub fn new(store: AnchorStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AnchorStore {
        &self.store
    }

    pub fn handle(&mut self, message: ViewMessage) -> Option<HostMessage> {
        match message {
            ViewMessage::AnchorAdded { anchor, .. } => {
                self.store.append(anchor);
                None
            }
            ViewMessage::AnchorRemoved { namespace, index } => {
                self.store.remove_at(namespace, index);
                None
            }
            ViewMessage::AnchorsCleared { namespace, .. } => {
                self.store.clear_all(namespace);
                None
            }
            ViewMessage::RequestStoredAnchors => Some(HostMessage::RestoreAnchors {
                anchors: self.store.all_anchors(),
            }),
            ViewMessage::StickyNoteUpdated {
                index,
                body,
                position,
            } => {
                self.store
                    .update_content(Namespace::StickyNotes, index, AnchorPatch { body, position });
                None
            }
        }
    }
}
