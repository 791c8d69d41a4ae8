/// Application name
pub const APP_NAME: &str = "Civitas";

/// Lifetime number of issues a non-premium citizen may report
pub const FREE_ISSUE_QUOTA: u32 = 3;

/// Default boost charge, in minor currency units
pub const DEFAULT_BOOST_AMOUNT: i64 = 100;

/// Default premium subscription charge, in minor currency units
pub const DEFAULT_PREMIUM_AMOUNT: i64 = 1000;

/// Default page size for issue and payment listings
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Upper bound on the page size a caller may request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Number of rows shown in each "latest" dashboard panel
pub const DASHBOARD_LATEST: u32 = 5;

/// Number of months covered by the payment statistics chart
pub const PAYMENT_STATS_MONTHS: u32 = 12;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default busy timeout for SQLite write locks, in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
