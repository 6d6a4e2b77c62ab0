pub mod anchor;
pub mod capture;
pub mod color;
pub mod config;
pub mod document;
pub mod drawing;
pub mod messages;
pub mod navigation;
pub mod notify;
pub mod restore;
pub mod selection;
pub mod storage;
pub mod store;
pub mod text_layer;
pub mod view;

// Re-export the types most embedders need
pub use anchor::{Anchor, AnchorKind, Namespace};
pub use color::MarkColor;
pub use document::DocumentInfo;
pub use store::AnchorStore;
pub use view::DocumentView;
