//! Fixtures shared by the engine tests.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use civitas_shared::{Actor, ActorId, Category, IssueId, Location, PaymentId, PaymentKind, Role};
use civitas_store::{Account, ActorStore, Database, Issue, PaymentRecord};

use crate::issues::NewIssue;
use crate::{Engine, EngineSettings};

/// A free-standing actor token, not backed by a stored account.
pub(crate) fn actor(role: Role) -> Actor {
    Actor {
        id: ActorId::new(),
        role,
        is_premium: false,
        is_blocked: false,
    }
}

pub(crate) fn issue_by(reporter: ActorId) -> Issue {
    let now = Utc::now();
    Issue {
        id: IssueId::new(),
        title: "Pothole".into(),
        description: "Deep pothole near the school gate".into(),
        category: Category::Road,
        images: Vec::new(),
        location: Location::text("School Road"),
        status: Default::default(),
        priority: Default::default(),
        is_boosted: false,
        upvote_count: 0,
        upvoters: Default::default(),
        reporter_id: reporter,
        assigned_staff_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn payment_by(owner: ActorId) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId::new(),
        actor_id: owner,
        issue_id: None,
        amount: 1000,
        kind: PaymentKind::Premium,
        transaction_ref: "TXN-test".into(),
        created_at: Utc::now(),
    }
}

pub(crate) fn new_issue(title: &str) -> NewIssue {
    NewIssue {
        title: title.into(),
        description: format!("{title}, reported by a resident"),
        category: Category::Road,
        images: vec!["https://img.example.org/report.jpg".into()],
        location: Location::text("Station Road"),
    }
}

/// An engine over a fresh on-disk database.
pub(crate) struct Harness {
    pub engine: Engine,
    dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("civitas.db")).unwrap();
        db.set_busy_timeout(Duration::from_secs(5)).unwrap();
        Self {
            engine: Engine::new(db, EngineSettings::default()),
            dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("civitas.db")
    }

    /// A second engine sharing the same file, for race tests.
    pub fn second_engine(&self) -> Engine {
        let db = Database::open_at(&self.db_path()).unwrap();
        db.set_busy_timeout(Duration::from_secs(5)).unwrap();
        Engine::new(db, EngineSettings::default())
    }

    pub fn account(&self, role: Role) -> Actor {
        let now = Utc::now();
        let id = ActorId::new();
        let account = Account {
            id,
            name: format!("{role} {}", &id.to_string()[..8]),
            email: format!("{id}@example.org"),
            photo: None,
            phone: None,
            role,
            is_premium: false,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        };
        self.engine.database().insert_account(&account).unwrap();
        account.actor()
    }

    pub fn citizen(&self) -> Actor {
        self.account(Role::Citizen)
    }

    pub fn staff(&self) -> Actor {
        self.account(Role::Staff)
    }

    pub fn admin(&self) -> Actor {
        self.account(Role::Admin)
    }

    pub fn report(&mut self, reporter: &Actor, title: &str) -> Issue {
        self.engine.create_issue(reporter, new_issue(title)).unwrap()
    }

    pub fn block(&self, actor: &Actor) {
        self.engine
            .database()
            .set_blocked(actor.id, true, Utc::now())
            .unwrap();
    }
}
