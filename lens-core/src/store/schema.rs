/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for the history database.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS lens_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Analysis records. `seq` preserves insertion order; `id` is the public identity.
CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    input_text TEXT NOT NULL CHECK (length(trim(input_text)) > 0),
    techniques TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_created_at ON records(created_at);
";
