use std::path::Path;

/// Identity and shape of the open document.
///
/// The identity is the canonical string form of the document's location:
/// two paths resolving to the same file share stored annotations, distinct
/// documents never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub identity: String,
    pub page_count: u32,
}

impl DocumentInfo {
    pub fn new(identity: impl Into<String>, page_count: u32) -> Self {
        Self {
            identity: identity.into(),
            page_count,
        }
    }

    pub fn from_path(path: &Path, page_count: u32) -> Self {
        Self::new(canonical_identity(path), page_count)
    }
}

/// Canonical identity string for a document path. Falls back to the
/// verbatim path when it cannot be resolved (file missing, permission).
pub fn canonical_identity(path: &Path) -> String {
    std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string_lossy().into_owned())
}
