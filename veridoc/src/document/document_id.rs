use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// A unique identifier for a [crate::document::Document].
///
/// Identifiers are assigned by the store when a document is first inserted;
/// callers never mint them. The string form (used by the backup file format)
/// is the hyphenated UUID rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a fresh random identifier. Only the store assigns identity,
    /// so this stays crate-private.
    pub(crate) fn random() -> Self {
        DocumentId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_unique() {
        let id1 = DocumentId::random();
        let id2 = DocumentId::random();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_display_is_hyphenated_uuid() {
        let id = DocumentId::random();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 36);
        assert_eq!(rendered.matches('-').count(), 4);
    }

    #[test]
    fn test_debug_includes_uuid() {
        let id = DocumentId::random();
        let rendered = format!("{:?}", id);
        assert!(rendered.starts_with("DocumentId("));
        assert!(rendered.contains(&id.to_string()));
    }
}
