//! Public room directory as a [`DirectorySource`].

use super::client::{MatrixClient, PublicRoomChunk};
use crate::error::SourceError;
use crate::source::{Cursor, DirectorySource, Page};
use crate::types::ResourceRecord;
use async_trait::async_trait;
use std::sync::Arc;

pub struct MatrixDirectorySource {
    client: Arc<MatrixClient>,
    page_limit: u32,
    server: Option<String>,
}

impl MatrixDirectorySource {
    pub fn new(client: Arc<MatrixClient>, page_limit: u32) -> Self {
        Self {
            client,
            page_limit,
            server: None,
        }
    }

    /// List a remote server's directory instead of the homeserver's own.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }
}

impl From<PublicRoomChunk> for ResourceRecord {
    fn from(chunk: PublicRoomChunk) -> Self {
        ResourceRecord {
            id: chunk.room_id.into(),
            name: chunk.name,
            topic: chunk.topic,
            canonical_alias: chunk.canonical_alias,
            joined_members: chunk.num_joined_members,
        }
    }
}

#[async_trait]
impl DirectorySource for MatrixDirectorySource {
    async fn list_page(&self, cursor: &Cursor) -> Result<Page, SourceError> {
        let response = self
            .client
            .public_rooms(cursor.as_token(), self.page_limit, self.server.as_deref())
            .await?;

        let entries = response
            .chunk
            .into_iter()
            .map(ResourceRecord::from)
            .collect();
        Ok(match response.next_batch {
            Some(next) if !next.is_empty() => Page::with_next(entries, next),
            _ => Page::last(entries),
        })
    }

    fn describe(&self) -> String {
        match &self.server {
            Some(server) => format!("{} via {}", server, self.client.homeserver()),
            None => self.client.homeserver().to_string(),
        }
    }
}
