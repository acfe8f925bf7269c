//! Append-only audit log.

use std::sync::Arc;

use crate::models::{AuditAction, AuditEntry};
use crate::store::{server_timestamp, to_document, CollectionPath, DocumentStore, StoreResult};

/// Default number of entries per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of filtered audit entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    /// 1-based page actually shown, after clamping
    pub page: usize,
    pub total_pages: usize,
    /// Entries matching the filter
    pub total: usize,
    /// Index of the first entry shown (0 when empty)
    pub start: usize,
    /// Index one past the last entry shown
    pub end: usize,
}

impl AuditPage {
    /// "1–10 of 42", or "0 of 0" when nothing matches.
    pub fn range_text(&self) -> String {
        if self.total == 0 {
            "0 of 0".to_string()
        } else {
            format!("{}–{} of {}", self.start + 1, self.end, self.total)
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Writer and reader for the `auditLog` collection.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
}

impl AuditLog {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Append an entry stamped with the server time.
    pub fn record(
        &self,
        user_email: &str,
        action: AuditAction,
        module: &str,
        detail: &str,
    ) -> StoreResult<String> {
        let entry = AuditEntry {
            id: String::new(),
            user_email: user_email.to_string(),
            action,
            module: module.to_string(),
            detail: detail.to_string(),
            timestamp: None,
        };
        let mut data = to_document(&entry)?;
        data.insert("timestamp".into(), server_timestamp());
        let id = self.store.add(&CollectionPath::audit_log(), data)?;
        tracing::debug!(action = action.as_str(), module, "audit entry recorded");
        Ok(id)
    }

    /// Every entry, newest first.
    pub fn entries(&self) -> StoreResult<Vec<AuditEntry>> {
        let mut entries = Vec::new();
        for doc in self.store.list(&CollectionPath::audit_log())? {
            let mut entry: AuditEntry = doc.decode()?;
            entry.id = doc.id().to_string();
            entries.push(entry);
        }
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Entries matching `filter` (blank matches all), cut to a 1-based page.
    ///
    /// Out-of-range pages are clamped to the nearest valid page.
    pub fn page(&self, filter: &str, page: usize) -> StoreResult<AuditPage> {
        let filter = filter.trim();
        let matching: Vec<AuditEntry> = self
            .entries()?
            .into_iter()
            .filter(|entry| filter.is_empty() || entry.matches(filter))
            .collect();
        Ok(paginate(matching, page, self.page_size))
    }
}

fn paginate(entries: Vec<AuditEntry>, page: usize, page_size: usize) -> AuditPage {
    let total = entries.len();
    let total_pages = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = if total == 0 { 0 } else { (page - 1) * page_size };
    let end = (start + page_size).min(total);
    AuditPage {
        entries: entries[start..end].to_vec(),
        page,
        total_pages,
        total,
        start,
        end,
    }
}
