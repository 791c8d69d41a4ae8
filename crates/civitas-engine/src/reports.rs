//! Dashboard statistics and read-only payment projections.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use civitas_shared::constants::{DASHBOARD_LATEST, PAYMENT_STATS_MONTHS};
use civitas_shared::{
    Actor, IssueId, IssueScope, IssueStatus, Page, PageRequest, PaymentFilter,
    PaymentId, PaymentKind, Role,
};
use civitas_store::{
    Account, ActorStore, Issue, IssueStore, MonthlyTotal, PaymentLedger, PaymentRecord,
    PaymentTotals,
};

use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: IssueStatus,
    pub count: u64,
}

fn status_counts(counts: Vec<(IssueStatus, u64)>) -> (Vec<StatusCount>, u64) {
    let total = counts.iter().map(|(_, n)| n).sum();
    let counts = counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    (counts, total)
}

fn count_of(counts: &[StatusCount], status: IssueStatus) -> u64 {
    counts
        .iter()
        .find(|c| c.status == status)
        .map_or(0, |c| c.count)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_issues: u64,
    pub issues_by_status: Vec<StatusCount>,
    pub total_revenue: i64,
    pub total_payments: u64,
    pub latest_issues: Vec<Issue>,
    pub latest_payments: Vec<PaymentRecord>,
    pub latest_citizens: Vec<Account>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub assigned: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub working: u64,
    pub resolved: u64,
    pub closed: u64,
    /// Assigned issues that were reported today (UTC).
    pub assigned_today: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenStats {
    pub total_issues: u64,
    pub issues_by_status: Vec<StatusCount>,
    pub payments: PaymentTotals,
    pub is_premium: bool,
    /// Free reports left over the account's lifetime; `None` for premium
    /// members.
    pub remaining_free_issues: Option<u32>,
}

/// The caller's payments plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistory {
    pub payments: Vec<PaymentRecord>,
    pub summary: PaymentTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCustomer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub kind: PaymentKind,
    pub issue_id: Option<IssueId>,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub payment_id: PaymentId,
    pub issued_at: DateTime<Utc>,
    pub customer: InvoiceCustomer,
    pub items: Vec<InvoiceLine>,
    pub total: i64,
    pub transaction_ref: String,
}

/// `INV-` followed by the last eight hex digits of the payment id.
pub fn invoice_number(id: PaymentId) -> String {
    let hex = id.0.simple().to_string();
    format!("INV-{}", hex[hex.len() - 8..].to_uppercase())
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}

impl Engine {
    pub fn admin_stats(&self, actor: &Actor) -> Result<AdminStats> {
        can_perform(actor, Action::ViewAdminStats, Resource::None).into_result()?;

        let (issues_by_status, total_issues) = status_counts(self.db.status_counts(IssueScope::All)?);
        let totals = self.db.payment_totals(&PaymentFilter::default())?;
        let latest_payments = self
            .db
            .query_payments(&PaymentFilter::default(), PageRequest::new(1, DASHBOARD_LATEST))?
            .items;

        Ok(AdminStats {
            total_issues,
            issues_by_status,
            total_revenue: totals.total_amount,
            total_payments: totals.count,
            latest_issues: self.db.recent_issues(DASHBOARD_LATEST)?,
            latest_payments,
            latest_citizens: self.db.list_accounts(Role::Citizen, Some(DASHBOARD_LATEST))?,
        })
    }

    pub fn staff_stats(&self, actor: &Actor) -> Result<StaffStats> {
        can_perform(actor, Action::ViewStaffStats, Resource::None).into_result()?;

        let (counts, assigned) = status_counts(self.db.status_counts(IssueScope::AssignedTo(actor.id))?);
        let assigned_today = self
            .db
            .count_assigned_created_since(actor.id, start_of_day(Utc::now()))?;

        Ok(StaffStats {
            assigned,
            pending: count_of(&counts, IssueStatus::Pending),
            in_progress: count_of(&counts, IssueStatus::InProgress),
            working: count_of(&counts, IssueStatus::Working),
            resolved: count_of(&counts, IssueStatus::Resolved),
            closed: count_of(&counts, IssueStatus::Closed),
            assigned_today,
        })
    }

    pub fn citizen_stats(&self, actor: &Actor) -> Result<CitizenStats> {
        can_perform(actor, Action::ViewCitizenStats, Resource::None).into_result()?;

        let account = self
            .db
            .get_account(actor.id)?
            .ok_or_else(|| EngineError::InvalidActor(format!("unknown account {}", actor.id)))?;
        let (issues_by_status, total_issues) =
            status_counts(self.db.status_counts(IssueScope::ReportedBy(actor.id))?);
        let payments = self.db.payment_totals(&PaymentFilter {
            actor: Some(actor.id),
            ..Default::default()
        })?;

        let remaining_free_issues = if account.is_premium {
            None
        } else {
            let quota = u64::from(self.settings.free_issue_quota);
            let reported = self.db.issues_reported(account.id)?;
            Some(quota.saturating_sub(reported) as u32)
        };

        Ok(CitizenStats {
            total_issues,
            issues_by_status,
            payments,
            is_premium: account.is_premium,
            remaining_free_issues,
        })
    }

    /// Every payment made by `actor`, newest first.
    pub fn payment_history(&self, actor: &Actor) -> Result<PaymentHistory> {
        let filter = PaymentFilter {
            actor: Some(actor.id),
            ..Default::default()
        };
        let summary = self.db.payment_totals(&filter)?;
        // One page large enough for the whole history.
        let limit = u32::try_from(summary.count.max(1)).unwrap_or(u32::MAX);
        let payments = self.db.query_payments(&filter, PageRequest::new(1, limit))?.items;
        Ok(PaymentHistory { payments, summary })
    }

    pub fn invoice(&self, actor: &Actor, payment_id: PaymentId) -> Result<Invoice> {
        let payment = self
            .db
            .get_payment(payment_id)?
            .ok_or_else(|| EngineError::NotFound("Payment".into()))?;
        can_perform(actor, Action::ViewPayment, Resource::Payment(&payment)).into_result()?;

        let customer = match self.db.get_account(payment.actor_id)? {
            Some(account) => InvoiceCustomer {
                name: account.name,
                email: account.email,
            },
            None => InvoiceCustomer {
                name: "Former customer".into(),
                email: String::new(),
            },
        };

        let description = match (payment.kind, payment.issue_id) {
            (PaymentKind::Premium, _) => "Premium subscription".to_string(),
            (PaymentKind::Boost, Some(issue_id)) => match self.db.get_issue(issue_id)? {
                Some(issue) => format!("Priority boost: {}", issue.title),
                None => "Priority boost".to_string(),
            },
            (PaymentKind::Boost, None) => "Priority boost".to_string(),
        };

        Ok(Invoice {
            invoice_number: invoice_number(payment.id),
            payment_id: payment.id,
            issued_at: payment.created_at,
            customer,
            items: vec![InvoiceLine {
                description,
                kind: payment.kind,
                issue_id: payment.issue_id,
                amount: payment.amount,
            }],
            total: payment.amount,
            transaction_ref: payment.transaction_ref,
        })
    }

    /// Admin listing over every payment.
    pub fn list_payments(
        &self,
        actor: &Actor,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<Page<PaymentRecord>> {
        can_perform(actor, Action::ListAllPayments, Resource::None).into_result()?;
        self.validate_page(page)?;
        Ok(self.db.query_payments(filter, page)?)
    }

    /// Payment totals for each of the last twelve months, oldest first.
    pub fn monthly_payment_stats(&self, actor: &Actor) -> Result<Vec<MonthlyTotal>> {
        can_perform(actor, Action::ListAllPayments, Resource::None).into_result()?;
        Ok(self.db.monthly_totals(PAYMENT_STATS_MONTHS, Utc::now())?)
    }
}
