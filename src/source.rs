//! Remote directory source contract.

use crate::error::SourceError;
use crate::types::ResourceRecord;
use async_trait::async_trait;

/// Opaque pagination token. `Cursor::start()` requests the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cursor(Option<String>);

impl Cursor {
    pub fn start() -> Self {
        Cursor(None)
    }

    pub fn token(token: impl Into<String>) -> Self {
        Cursor(Some(token.into()))
    }

    /// The token to send, or `None` for the first page
    pub fn as_token(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_start(&self) -> bool {
        self.0.is_none()
    }
}

/// One page of directory entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<ResourceRecord>,
    /// `None` when this is the last page
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn last(entries: Vec<ResourceRecord>) -> Self {
        Self {
            entries,
            next_cursor: None,
        }
    }

    pub fn with_next(entries: Vec<ResourceRecord>, next: impl Into<String>) -> Self {
        Self {
            entries,
            next_cursor: Some(Cursor::token(next)),
        }
    }
}

/// A paginated remote resource collection.
///
/// `list_page` must be idempotent for the same cursor and must eventually
/// return a page without a next cursor.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list_page(&self, cursor: &Cursor) -> Result<Page, SourceError>;

    /// Short label used in logs
    fn describe(&self) -> String {
        "directory".to_string()
    }
}
