//! In-memory directory and sink doubles for unit tests.

use crate::diff::ChangeReport;
use crate::error::{SinkError, SourceError};
use crate::sink::NotificationSink;
use crate::source::{Cursor, DirectorySource, Page};
use crate::types::ResourceRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Default)]
struct FakeState {
    pages: Vec<Vec<ResourceRecord>>,
    fail_next: u32,
    fail_per_page: HashMap<usize, u32>,
    failure: Option<SourceError>,
    calls: Vec<(Cursor, Instant)>,
}

/// Directory served from memory; page `n` is requested with cursor token `n`.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    state: Mutex<FakeState>,
}

impl FakeDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_pages(pages: Vec<Vec<ResourceRecord>>) -> Self {
        let source = Self::new();
        source.set_pages(pages);
        source
    }

    pub(crate) fn set_pages(&self, pages: Vec<Vec<ResourceRecord>>) {
        self.state.lock().unwrap().pages = pages;
    }

    /// The next `count` requests fail regardless of cursor
    pub(crate) fn fail_next(&self, count: u32, error: SourceError) {
        let mut state = self.state.lock().unwrap();
        state.fail_next = count;
        state.failure = Some(error);
    }

    /// Page `i` fails `counts[i]` times before it succeeds
    pub(crate) fn fail_pattern(&self, counts: Vec<u32>, error: SourceError) {
        let mut state = self.state.lock().unwrap();
        state.fail_per_page = counts.into_iter().enumerate().collect();
        state.failure = Some(error);
    }

    pub(crate) fn calls(&self) -> Vec<(Cursor, Instant)> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl DirectorySource for FakeDirectory {
    async fn list_page(&self, cursor: &Cursor) -> Result<Page, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((cursor.clone(), Instant::now()));

        let index: usize = cursor.as_token().and_then(|t| t.parse().ok()).unwrap_or(0);
        let failure = state
            .failure
            .clone()
            .unwrap_or_else(|| SourceError::Transient("scripted failure".to_string()));

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(failure);
        }
        if let Some(remaining) = state.fail_per_page.get_mut(&index) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(failure);
            }
        }

        let entries = state.pages.get(index).cloned().unwrap_or_default();
        if index + 1 < state.pages.len() {
            Ok(Page::with_next(entries, (index + 1).to_string()))
        } else {
            Ok(Page::last(entries))
        }
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

/// Sink that records everything it is given
#[derive(Default)]
pub(crate) struct RecordingSink {
    reports: Mutex<Vec<ChangeReport>>,
    notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub(crate) fn reports(&self) -> Vec<ChangeReport> {
        self.reports.lock().unwrap().clone()
    }

    pub(crate) fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, report: &ChangeReport) -> Result<(), SinkError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn notice(&self, text: &str) -> Result<(), SinkError> {
        self.notices.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
