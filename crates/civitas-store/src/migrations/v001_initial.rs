//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `accounts`, `issues`, `issue_upvotes`,
//! `timeline_events`, and `payments`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts (actors known to this deployment)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    name        TEXT NOT NULL,
    email       TEXT NOT NULL COLLATE NOCASE UNIQUE,
    photo       TEXT,
    phone       TEXT,
    role        TEXT NOT NULL CHECK (role IN ('citizen', 'staff', 'admin')),
    is_premium  INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    is_blocked  INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    issues_reported INTEGER NOT NULL DEFAULT 0, -- lifetime, never decremented
    created_at  TEXT NOT NULL,                -- RFC-3339, UTC, microseconds
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_accounts_role ON accounts(role, created_at DESC);

-- ----------------------------------------------------------------
-- Issues
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS issues (
    id                TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    title             TEXT NOT NULL,
    description       TEXT NOT NULL,
    category          TEXT NOT NULL
        CHECK (category IN ('road', 'garbage', 'water', 'electricity')),
    images            TEXT NOT NULL DEFAULT '[]',  -- JSON array of URIs
    location_address  TEXT NOT NULL DEFAULT '',
    location_lat      REAL,
    location_lng      REAL,
    status            TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'in-progress', 'working', 'resolved', 'closed', 'rejected')),
    priority          TEXT NOT NULL DEFAULT 'normal'
        CHECK (priority IN ('normal', 'high')),
    is_boosted        INTEGER NOT NULL DEFAULT 0,
    upvote_count      INTEGER NOT NULL DEFAULT 0 CHECK (upvote_count >= 0),
    reporter_id       TEXT NOT NULL,               -- FK -> accounts(id)
    assigned_staff_id TEXT,                        -- FK -> accounts(id)
    search_text       TEXT NOT NULL,               -- lower-cased title/description/category/location
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,

    CHECK ((priority = 'high') = (is_boosted = 1)),
    FOREIGN KEY (reporter_id) REFERENCES accounts(id),
    FOREIGN KEY (assigned_staff_id) REFERENCES accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_issues_reporter ON issues(reporter_id);
CREATE INDEX IF NOT EXISTS idx_issues_assigned ON issues(assigned_staff_id);
CREATE INDEX IF NOT EXISTS idx_issues_listing ON issues(priority, created_at DESC);

-- ----------------------------------------------------------------
-- Upvotes: one row per (issue, actor)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS issue_upvotes (
    issue_id   TEXT NOT NULL,                  -- FK -> issues(id)
    actor_id   TEXT NOT NULL,                  -- canonical actor id
    created_at TEXT NOT NULL,

    PRIMARY KEY (issue_id, actor_id),
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Timeline: append-only, deliberately not foreign-keyed so history
-- survives issue deletion
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS timeline_events (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,          -- UUID v4
    issue_id    TEXT NOT NULL,
    status      TEXT NOT NULL,                 -- snapshot at time of event
    message     TEXT NOT NULL,
    actor_id    TEXT NOT NULL,
    actor_role  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_timeline_issue_seq
    ON timeline_events(issue_id, seq DESC);

-- ----------------------------------------------------------------
-- Payments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS payments (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    actor_id        TEXT NOT NULL,
    issue_id        TEXT,                      -- NULL for premium
    amount          INTEGER NOT NULL CHECK (amount > 0),
    kind            TEXT NOT NULL CHECK (kind IN ('premium', 'boost')),
    transaction_ref TEXT NOT NULL UNIQUE,
    created_at      TEXT NOT NULL,

    CHECK ((kind = 'boost') = (issue_id IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_payments_actor ON payments(actor_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_payments_created ON payments(created_at DESC);
CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_one_boost
    ON payments(issue_id) WHERE kind = 'boost';
CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_one_premium
    ON payments(actor_id) WHERE kind = 'premium';
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
