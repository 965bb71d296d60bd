//! Shallow-merge of a provider refinement result into a document
//!
//! The primary provider replies with a JSON object carrying some or all
//! of a document's mutable fields plus a `changes_summary`. Extraction
//! is per-field and lenient: a field that is absent or of the wrong
//! shape is simply not part of the patch, it never fails the merge.
//! Identity and classification fields (id, topic, level, version,
//! protection flags, timestamps) are never touched.
//!
//! An empty patch applied to a document leaves it unchanged.

use serde_json::Value;

use cforge_common::models::{Book, Chapter, ContentDocument, ContentKind, CourseModule};

/// Fields a book refinement may replace
#[derive(Debug, Default, Clone)]
pub struct BookPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub chapters: Option<Vec<Chapter>>,
    pub changes_summary: Option<String>,
}

/// Fields a course refinement may replace
#[derive(Debug, Default, Clone)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_structure: Option<Vec<CourseModule>>,
    pub changes_summary: Option<String>,
}

/// A kind-matched patch extracted from one provider reply
#[derive(Debug, Clone)]
pub enum DocumentPatch {
    Book(BookPatch),
    Course(CoursePatch),
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn typed_field<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    value
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

impl DocumentPatch {
    /// Extract the patch fields relevant to `kind` from a parsed reply.
    /// Malformed fields are dropped silently; the result may be empty.
    pub fn from_value(kind: ContentKind, value: &Value) -> Self {
        match kind {
            ContentKind::Book => DocumentPatch::Book(BookPatch {
                title: string_field(value, "title"),
                subtitle: string_field(value, "subtitle"),
                chapters: typed_field(value, "chapters"),
                changes_summary: string_field(value, "changes_summary"),
            }),
            ContentKind::Course => DocumentPatch::Course(CoursePatch {
                title: string_field(value, "title"),
                description: string_field(value, "description"),
                content_structure: typed_field(value, "content_structure"),
                changes_summary: string_field(value, "changes_summary"),
            }),
        }
    }

    /// The provider's self-reported summary, if it sent one
    pub fn changes_summary(&self) -> Option<&str> {
        match self {
            DocumentPatch::Book(p) => p.changes_summary.as_deref(),
            DocumentPatch::Course(p) => p.changes_summary.as_deref(),
        }
    }

    /// True when no mutable field is present (summary alone does not count)
    pub fn is_empty(&self) -> bool {
        match self {
            DocumentPatch::Book(p) => {
                p.title.is_none() && p.subtitle.is_none() && p.chapters.is_none()
            }
            DocumentPatch::Course(p) => {
                p.title.is_none() && p.description.is_none() && p.content_structure.is_none()
            }
        }
    }

    /// Replace present fields on `doc`; absent fields keep prior values.
    /// A kind mismatch is a no-op (the patch was built for this kind).
    pub fn apply_to(&self, doc: &mut ContentDocument) {
        match (self, doc) {
            (DocumentPatch::Book(patch), ContentDocument::Book(book)) => {
                apply_book_patch(book, patch);
            }
            (DocumentPatch::Course(patch), ContentDocument::Course(course)) => {
                if let Some(title) = &patch.title {
                    course.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    course.description = Some(description.clone());
                }
                if let Some(structure) = &patch.content_structure {
                    course.content_structure = structure.clone();
                }
            }
            _ => {}
        }
    }
}

fn apply_book_patch(book: &mut Book, patch: &BookPatch) {
    if let Some(title) = &patch.title {
        book.title = title.clone();
    }
    if let Some(subtitle) = &patch.subtitle {
        book.subtitle = Some(subtitle.clone());
    }
    if let Some(chapters) = &patch.chapters {
        book.chapters = chapters.clone();
    }
}

// ============================================================================
// Tests
// ============================================================================
