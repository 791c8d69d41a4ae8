//! Storage-agnostic query descriptors.
//!
//! The engine describes *what* it wants (enumerated filter fields, an
//! explicit sort key, a page window) and the store translates the
//! descriptor into its own query language. Nothing in here knows about SQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PAGE_LIMIT;
use crate::types::{ActorId, Category, IssueStatus, PaymentKind, Priority};

/// Field filters over issues. `None` means "any"; set fields are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    /// Case-insensitive term matched against title, description, category
    /// and location (OR-combined).
    pub search: Option<String>,
}

impl IssueFilter {
    /// The search term with surrounding whitespace removed, or `None` when
    /// nothing is left.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// Implicit ownership filter applied on top of [`IssueFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueScope {
    #[default]
    All,
    ReportedBy(ActorId),
    AssignedTo(ActorId),
}

/// Secondary ordering. Priority descending always comes first so boosted
/// issues surface above non-boosted ones under every sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSort {
    #[default]
    Newest,
    Oldest,
    MostUpvoted,
    RecentlyUpdated,
}

/// 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Number of rows to skip. Saturates instead of overflowing on absurd
    /// page numbers.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = if request.limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(request.limit))
        };
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
        }
    }
}

/// Complete issue listing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueQuery {
    pub filter: IssueFilter,
    pub scope: IssueScope,
    pub sort: IssueSort,
    pub page: PageRequest,
}

/// Filters over payment records. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentFilter {
    pub kind: Option<PaymentKind>,
    pub actor: Option<ActorId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
