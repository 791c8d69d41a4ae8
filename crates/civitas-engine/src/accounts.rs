//! Account bookkeeping the lifecycle rules depend on: registration, staff
//! management, blocking, and startup admin reconciliation.

use serde::{Deserialize, Serialize};

use civitas_shared::{Actor, ActorId, Role};
use civitas_store::{Account, ActorStore};

use crate::assignment::ensure_unassigned;
use crate::error::{EngineError, Result};
use crate::policy::{can_perform, Action, Resource};
use crate::{active_actor, Engine};

/// Profile fields for a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewAccount {
    fn into_account(self, role: Role) -> Result<Account> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("name must not be empty".into()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(EngineError::Validation(format!("invalid email address: {email:?}")));
        }

        let now = crate::now();
        Ok(Account {
            id: ActorId::new(),
            name: name.to_string(),
            email: email.to_string(),
            photo: self.photo,
            phone: self.phone,
            role,
            is_premium: false,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        })
    }
}

fn insert_unique<S: ActorStore + ?Sized>(store: &S, account: &Account) -> Result<()> {
    if store.find_account_by_email(&account.email)?.is_some() {
        return Err(EngineError::Conflict(format!(
            "an account with email {} already exists",
            account.email
        )));
    }
    store.insert_account(account)?;
    Ok(())
}

impl Engine {
    /// Create a citizen account. Nobody needs to be signed in.
    pub fn register_citizen(&mut self, new: NewAccount) -> Result<Account> {
        let account = new.into_account(Role::Citizen)?;
        self.db.mutate(|tx| insert_unique(tx, &account))?;
        tracing::info!(account = %account.id, "citizen registered");
        Ok(account)
    }

    pub fn create_staff(&mut self, actor: &Actor, new: NewAccount) -> Result<Account> {
        let account = new.into_account(Role::Staff)?;
        self.db.mutate(|tx| -> Result<()> {
            let actor = active_actor(tx, actor)?;
            can_perform(&actor, Action::ManageAccounts, Resource::None).into_result()?;
            insert_unique(tx, &account)
        })?;
        tracing::info!(account = %account.id, "staff account created");
        Ok(account)
    }

    /// The stored account behind `id`, if any.
    pub fn find_account(&self, id: ActorId) -> Result<Option<Account>> {
        Ok(self.db.get_account(id)?)
    }

    pub fn list_staff(&self, actor: &Actor) -> Result<Vec<Account>> {
        can_perform(actor, Action::ManageAccounts, Resource::None).into_result()?;
        Ok(self.db.list_accounts(Role::Staff, None)?)
    }

    pub fn list_citizens(&self, actor: &Actor) -> Result<Vec<Account>> {
        can_perform(actor, Action::ManageAccounts, Resource::None).into_result()?;
        Ok(self.db.list_accounts(Role::Citizen, None)?)
    }

    /// Flip a citizen's blocked flag and return the updated account.
    pub fn toggle_block(&mut self, actor: &Actor, target: ActorId) -> Result<Account> {
        let account = self.db.mutate(|tx| -> Result<Account> {
            let actor = active_actor(tx, actor)?;
            can_perform(&actor, Action::ManageAccounts, Resource::None).into_result()?;

            let mut account = tx
                .get_account(target)?
                .ok_or_else(|| EngineError::NotFound("Account".into()))?;
            if account.role != Role::Citizen {
                return Err(EngineError::InvalidActor("only citizens can be blocked".into()));
            }

            let now = crate::now();
            account.is_blocked = !account.is_blocked;
            account.updated_at = now;
            tx.set_blocked(account.id, account.is_blocked, now)?;
            Ok(account)
        })?;

        tracing::info!(account = %account.id, blocked = account.is_blocked, "block toggled");
        Ok(account)
    }

    /// Remove a staff account. Refused while any issue is assigned to it.
    pub fn delete_staff(&mut self, actor: &Actor, staff_id: ActorId) -> Result<()> {
        self.db.mutate(|tx| -> Result<()> {
            let actor = active_actor(tx, actor)?;
            can_perform(&actor, Action::ManageAccounts, Resource::None).into_result()?;

            let staff = tx
                .get_account(staff_id)?
                .ok_or_else(|| EngineError::NotFound("Staff member".into()))?;
            if staff.role != Role::Staff {
                return Err(EngineError::InvalidActor(format!(
                    "{} is not a staff member",
                    staff.name
                )));
            }
            ensure_unassigned(tx, staff.id)?;
            tx.delete_account(staff.id)?;
            Ok(())
        })?;

        tracing::info!(account = %staff_id, "staff account deleted");
        Ok(())
    }

    /// Make sure an admin account with `email` exists. Safe to call on every
    /// start; an existing admin is returned untouched.
    pub fn ensure_admin(&mut self, name: &str, email: &str) -> Result<Account> {
        let candidate = NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            photo: None,
            phone: None,
        }
        .into_account(Role::Admin)?;

        let (account, created) = self.db.mutate(|tx| -> Result<(Account, bool)> {
            match tx.find_account_by_email(&candidate.email)? {
                Some(existing) if existing.role == Role::Admin => Ok((existing, false)),
                Some(existing) => Err(EngineError::Conflict(format!(
                    "{} already belongs to a {} account",
                    existing.email, existing.role
                ))),
                None => {
                    tx.insert_account(&candidate)?;
                    Ok((candidate, true))
                }
            }
        })?;

        if created {
            tracing::info!(account = %account.id, email = %account.email, "admin account created");
        } else {
            tracing::debug!(account = %account.id, "admin account already present");
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_issue, Harness};

    fn profile(email: &str) -> NewAccount {
        NewAccount {
            name: "Amina Rahman".into(),
            email: email.into(),
            photo: None,
            phone: Some("+8801700000000".into()),
        }
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let mut h = Harness::new();
        let account = h.engine.register_citizen(profile("amina@example.org")).unwrap();
        assert_eq!(account.role, Role::Citizen);

        let err = h
            .engine
            .register_citizen(profile("AMINA@example.org"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn registered_citizen_can_report() {
        let mut h = Harness::new();
        let account = h.engine.register_citizen(profile("amina@example.org")).unwrap();
        h.engine
            .create_issue(&account.actor(), new_issue("Broken swing"))
            .unwrap();
    }

    #[test]
    fn invalid_profile_rejected() {
        let mut h = Harness::new();
        let err = h.engine.register_citizen(profile("not-an-email")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn staff_management_is_admin_only() {
        let mut h = Harness::new();
        let admin = h.admin();
        let citizen = h.citizen();

        let staff = h.engine.create_staff(&admin, profile("staff@example.org")).unwrap();
        assert_eq!(staff.role, Role::Staff);
        assert_eq!(h.engine.list_staff(&admin).unwrap().len(), 1);

        assert!(matches!(
            h.engine.create_staff(&citizen, profile("other@example.org")),
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            h.engine.list_citizens(&citizen),
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            h.engine.create_staff(&admin, profile("staff@example.org")),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn toggle_block_flips_and_takes_effect() {
        let mut h = Harness::new();
        let admin = h.admin();
        let citizen = h.citizen();

        let blocked = h.engine.toggle_block(&admin, citizen.id).unwrap();
        assert!(blocked.is_blocked);
        assert!(matches!(
            h.engine.create_issue(&citizen, new_issue("Noise")),
            Err(EngineError::BlockedActor)
        ));

        let unblocked = h.engine.toggle_block(&admin, citizen.id).unwrap();
        assert!(!unblocked.is_blocked);
        h.engine.create_issue(&citizen, new_issue("Noise")).unwrap();
    }

    #[test]
    fn staff_with_assignments_cannot_be_deleted() {
        let mut h = Harness::new();
        let admin = h.admin();
        let citizen = h.citizen();
        let staff = h.staff();
        let idle = h.staff();
        let issue = h.report(&citizen, "Pothole");
        h.engine.assign(issue.id, staff.id, &admin).unwrap();

        assert!(matches!(
            h.engine.delete_staff(&admin, staff.id),
            Err(EngineError::Conflict(_))
        ));
        assert!(h.engine.find_account(staff.id).unwrap().is_some());

        h.engine.delete_staff(&admin, idle.id).unwrap();
        assert!(h.engine.find_account(idle.id).unwrap().is_none());

        assert!(matches!(
            h.engine.delete_staff(&admin, citizen.id),
            Err(EngineError::InvalidActor(_))
        ));
    }

    #[test]
    fn ensure_admin_is_idempotent() {
        let mut h = Harness::new();
        let first = h.engine.ensure_admin("Admin", "admin@example.org").unwrap();
        let second = h.engine.ensure_admin("Admin", "admin@example.org").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);

        h.engine.register_citizen(profile("taken@example.org")).unwrap();
        assert!(matches!(
            h.engine.ensure_admin("Admin", "taken@example.org"),
            Err(EngineError::Conflict(_))
        ));
    }
}
