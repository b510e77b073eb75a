//! Document aggregate: content with a lifecycle, independent of tree placement.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::clock;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{DocumentId, UserId};

/// Lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Published,
    /// Terminal state.
    Archived,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Published => "published",
            DocumentStatus::Archived => "archived",
        };
        write!(f, "{}", label)
    }
}

/// Content-bearing aggregate referenced by tree nodes through its id only.
///
/// Deserialization runs the same title and content checks as [`Document::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DocumentRecord")]
pub struct Document {
    id: DocumentId,
    title: String,
    content: String,
    description: Option<String>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
    status: DocumentStatus,
}

/// Stored form of a [`Document`], validated on the way in.
#[derive(Deserialize)]
struct DocumentRecord {
    id: DocumentId,
    title: String,
    content: String,
    description: Option<String>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
    status: DocumentStatus,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = DomainError;

    fn try_from(record: DocumentRecord) -> DomainResult<Self> {
        validate(&record.title, &record.content)?;
        Ok(Self {
            id: record.id,
            title: record.title,
            content: record.content,
            description: record.description,
            created_by: record.created_by,
            created_at: record.created_at,
            last_modified_at: record.last_modified_at,
            status: record.status,
        })
    }
}

impl Document {
    /// Create a new draft document.
    ///
    /// Fails with `InvalidArgument` if the title is blank or the content empty.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        created_by: UserId,
        description: Option<String>,
    ) -> DomainResult<Self> {
        let title = title.into();
        let content = content.into();
        validate(&title, &content)?;

        let now = Utc::now();
        Ok(Self {
            id: DocumentId::new(),
            title,
            content,
            description,
            created_by,
            created_at: now,
            last_modified_at: now,
            status: DocumentStatus::Draft,
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    /// Replace title, content and description.
    pub fn update_content(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        description: Option<String>,
    ) -> DomainResult<()> {
        let title = title.into();
        let content = content.into();
        validate(&title, &content)?;

        self.title = title;
        self.content = content;
        self.description = description;
        self.touch();
        Ok(())
    }

    /// Move a draft to `Published`. Re-publishing is allowed; archived
    /// documents cannot be published again.
    pub fn publish(&mut self) -> DomainResult<()> {
        if self.status == DocumentStatus::Archived {
            return Err(DomainError::InvalidOperation(format!(
                "document {} is archived and cannot be published",
                self.id
            )));
        }
        self.status = DocumentStatus::Published;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) {
        self.status = DocumentStatus::Archived;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_modified_at = clock::advance(self.last_modified_at);
    }
}

fn validate(title: &str, content: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::InvalidArgument(
            "document title must not be empty".to_string(),
        ));
    }
    if content.is_empty() {
        return Err(DomainError::InvalidArgument(
            "document content must not be empty".to_string(),
        ));
    }
    Ok(())
}
