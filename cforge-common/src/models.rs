//! Content document models shared across CourseForge services
//!
//! Two content kinds exist: Book (chapters) and Course (modules of
//! sections). Both are owned by the content store; `id` is assigned at
//! creation and never changes. The `version` column is the optimistic
//! concurrency token: every successful update increments it, and
//! conditional updates fail with `Error::Conflict` when the stored
//! version has moved since the document was fetched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content kind discriminator ("book" or "course" on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Book,
    Course,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Book => "book",
            ContentKind::Course => "course",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single quiz question attached to a course section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: usize,
}

/// Course section (leaf content unit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    /// Markdown body text
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Present only for quiz-enabled courses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_questions: Option<Vec<QuizQuestion>>,
}

/// Course module (ordered group of sections)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    pub module_title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// Book chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_number: u32,
    pub title: String,
    /// Markdown body text
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,
}

/// Book document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub topic: String,
    pub level: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub adult_content: bool,
    #[serde(default)]
    pub protected: bool,
    /// Optimistic concurrency token (incremented on every update)
    #[serde(default)]
    pub version: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn new(created_by: String, title: String, topic: String, level: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            subtitle: None,
            topic,
            level,
            chapters: Vec::new(),
            adult_content: false,
            protected: false,
            version: 0,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// A book with no chapters (or missing title/topic) is a transient
    /// draft: invalid for listing and a candidate for admin cleanup.
    pub fn is_valid_for_listing(&self) -> bool {
        !self.title.trim().is_empty() && !self.topic.trim().is_empty() && !self.chapters.is_empty()
    }
}

/// Course document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topic: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default)]
    pub content_structure: Vec<CourseModule>,
    #[serde(default)]
    pub adult_content: bool,
    #[serde(default)]
    pub protected: bool,
    /// Optimistic concurrency token (incremented on every update)
    #[serde(default)]
    pub version: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn new(created_by: String, title: String, topic: String, level: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description: None,
            topic,
            level,
            tier: None,
            content_structure: Vec::new(),
            adult_content: false,
            protected: false,
            version: 0,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// See [`Book::is_valid_for_listing`]
    pub fn is_valid_for_listing(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.topic.trim().is_empty()
            && !self.content_structure.is_empty()
    }
}

/// Either content kind, for code paths that operate on both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentDocument {
    Book(Book),
    Course(Course),
}

impl ContentDocument {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentDocument::Book(_) => ContentKind::Book,
            ContentDocument::Course(_) => ContentKind::Course,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ContentDocument::Book(b) => b.id,
            ContentDocument::Course(c) => c.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ContentDocument::Book(b) => &b.title,
            ContentDocument::Course(c) => &c.title,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            ContentDocument::Book(b) => &b.topic,
            ContentDocument::Course(c) => &c.topic,
        }
    }

    pub fn level(&self) -> &str {
        match self {
            ContentDocument::Book(b) => &b.level,
            ContentDocument::Course(c) => &c.level,
        }
    }

    pub fn protected(&self) -> bool {
        match self {
            ContentDocument::Book(b) => b.protected,
            ContentDocument::Course(c) => c.protected,
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            ContentDocument::Book(b) => b.version,
            ContentDocument::Course(c) => c.version,
        }
    }

    pub fn is_valid_for_listing(&self) -> bool {
        match self {
            ContentDocument::Book(b) => b.is_valid_for_listing(),
            ContentDocument::Course(c) => c.is_valid_for_listing(),
        }
    }
}
