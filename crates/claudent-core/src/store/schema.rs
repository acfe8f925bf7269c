//! SQLite schema definition.

/// Document table backing every collection.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Documents
-- ============================================================================

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,                    -- e.g. patients/{id}/odontograms
    doc_id TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',             -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;
