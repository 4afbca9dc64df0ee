use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata of an open publication, as supplied by the document model.
///
/// Only the fields the overlay cares about: a title, an optional stable
/// identifier, and the primary language tag (BCP-47-like).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub identifier: Option<String>,
    pub language: String,
}

impl DocumentMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            identifier: None,
            language: String::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// First subtag of the language tag (`"pt-BR"` -> `"pt"`).
    pub fn primary_subtag(&self) -> &str {
        self.language.split('-').next().unwrap_or("")
    }

    /// Composite key distinguishing this document's session from others.
    pub fn document_key(&self) -> DocumentKey {
        DocumentKey::new(&self.title, self.identifier.as_deref().unwrap_or(""))
    }
}

/// Composite `title:identifier` key for one open document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn new(title: &str, identifier: &str) -> Self {
        if title.is_empty() && identifier.is_empty() {
            return Self(String::new());
        }
        Self(format!("{title}:{identifier}"))
    }

    /// The key of the shared, document-less binding.
    pub fn shared() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
