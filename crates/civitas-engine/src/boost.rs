//! Payment-gated priority boosts and premium subscriptions.
//!
//! The charge, the payment row, the state change and the timeline entry are
//! one transaction. The gateway is called after every precondition has
//! passed, so a rejected request never reaches it.

use serde::{Deserialize, Serialize};

use civitas_shared::{Actor, IssueId, PaymentId, PaymentKind, Priority};
use civitas_store::{
    ActorStore, AuditLog, Issue, IssueStore, PaymentLedger, PaymentRecord, TimelineEvent,
};

use crate::error::{EngineError, Result};
use crate::gateway::ChargeRequest;
use crate::policy::{can_perform, Action, Resource};
use crate::{active_actor, Engine};

/// Outcome of an accepted boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostReceipt {
    pub issue: Issue,
    pub payment: PaymentRecord,
}

fn positive_amount(amount: Option<i64>, default: i64) -> Result<i64> {
    let amount = amount.unwrap_or(default);
    if amount <= 0 {
        return Err(EngineError::Validation("amount must be positive".into()));
    }
    Ok(amount)
}

impl Engine {
    /// Pay to raise an issue to high priority.
    ///
    /// `reference`, when given, is used as the transaction reference so a
    /// client retry cannot charge twice.
    pub fn boost_issue(
        &mut self,
        issue_id: IssueId,
        actor: &Actor,
        amount: Option<i64>,
        reference: Option<&str>,
    ) -> Result<BoostReceipt> {
        let amount = positive_amount(amount, self.settings.default_boost_amount)?;

        let receipt = self.db.mutate(|tx| -> Result<BoostReceipt> {
            let actor = active_actor(tx, actor)?;
            let mut issue = tx
                .get_issue(issue_id)?
                .ok_or_else(EngineError::issue_not_found)?;
            can_perform(&actor, Action::Boost, Resource::Issue(&issue)).into_result()?;
            if issue.priority == Priority::High {
                return Err(EngineError::Conflict("issue is already boosted".into()));
            }

            let charged = self.gateway.charge(&ChargeRequest {
                actor: actor.id,
                kind: PaymentKind::Boost,
                issue: Some(issue.id),
                amount,
                reference,
            })?;

            let now = crate::now();
            let payment = PaymentRecord {
                id: PaymentId::new(),
                actor_id: actor.id,
                issue_id: Some(issue.id),
                amount,
                kind: PaymentKind::Boost,
                transaction_ref: charged.transaction_ref,
                created_at: now,
            };
            tx.insert_payment(&payment)?;
            if !tx.boost_if_normal(issue.id, now)? {
                return Err(EngineError::Conflict("issue is already boosted".into()));
            }
            tx.append_event(&TimelineEvent::new(
                issue.id,
                issue.status,
                "Issue boosted to high priority",
                &actor,
                now,
            ))?;

            issue.priority = Priority::High;
            issue.is_boosted = true;
            issue.updated_at = now;
            Ok(BoostReceipt { issue, payment })
        })?;

        tracing::info!(
            issue = %issue_id,
            payment = %receipt.payment.id,
            amount,
            "issue boosted"
        );
        Ok(receipt)
    }

    /// Pay once to lift the issue quota.
    pub fn subscribe_premium(
        &mut self,
        actor: &Actor,
        amount: Option<i64>,
        reference: Option<&str>,
    ) -> Result<PaymentRecord> {
        let amount = positive_amount(amount, self.settings.default_premium_amount)?;

        let payment = self.db.mutate(|tx| -> Result<PaymentRecord> {
            let actor = active_actor(tx, actor)?;
            can_perform(&actor, Action::SubscribePremium, Resource::None).into_result()?;
            if actor.is_premium {
                return Err(EngineError::Conflict("already a premium member".into()));
            }

            let charged = self.gateway.charge(&ChargeRequest {
                actor: actor.id,
                kind: PaymentKind::Premium,
                issue: None,
                amount,
                reference,
            })?;

            let now = crate::now();
            let payment = PaymentRecord {
                id: PaymentId::new(),
                actor_id: actor.id,
                issue_id: None,
                amount,
                kind: PaymentKind::Premium,
                transaction_ref: charged.transaction_ref,
                created_at: now,
            };
            tx.insert_payment(&payment)?;
            if !tx.set_premium(actor.id, now)? {
                return Err(EngineError::Conflict("already a premium member".into()));
            }
            Ok(payment)
        })?;

        tracing::info!(actor = %actor.id, payment = %payment.id, amount, "premium subscribed");
        Ok(payment)
    }
}
