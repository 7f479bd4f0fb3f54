use serde::{Deserialize, Serialize};

/// The unit of storage: opaque content plus two free-form descriptors.
///
/// Empty `content_type` or `origin` means "unspecified". Field order is part
/// of the encoded form, so it must not change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Opaque payload, immutable once stored.
    pub content: Vec<u8>,
    /// How to interpret `content` (a MIME type in practice).
    pub content_type: String,
    /// Provenance of the payload, usually a source URL.
    pub origin: String,
}

impl Entity {
    /// Create an entity from its three parts.
    pub fn new(
        content: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            origin: origin.into(),
        }
    }

    /// An entity with content only; type and origin unspecified.
    pub fn from_content(content: impl Into<Vec<u8>>) -> Self {
        Self::new(content, String::new(), String::new())
    }

    /// The content type, or `None` when unspecified.
    pub fn content_type(&self) -> Option<&str> {
        (!self.content_type.is_empty()).then_some(self.content_type.as_str())
    }

    /// The origin, or `None` when unspecified.
    pub fn origin(&self) -> Option<&str> {
        (!self.origin.is_empty()).then_some(self.origin.as_str())
    }

    /// Size of the content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns `true` if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
