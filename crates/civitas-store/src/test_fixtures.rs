//! Row builders shared by the in-crate tests.

use chrono::Utc;

use civitas_shared::{ActorId, Category, IssueId, IssueStatus, Location, Priority, Role};

use crate::models::{Account, Issue};
use crate::{ActorStore, Database};

pub(crate) fn seed_account(db: &Database, role: Role) -> ActorId {
    let now = Utc::now();
    let id = ActorId::new();
    db.insert_account(&Account {
        id,
        name: format!("{role} {id}"),
        email: format!("{id}@example.org"),
        photo: None,
        phone: None,
        role,
        is_premium: false,
        is_blocked: false,
        created_at: now,
        updated_at: now,
    })
    .unwrap();
    id
}

pub(crate) fn sample_issue(reporter: ActorId, title: &str) -> Issue {
    let now = Utc::now();
    Issue {
        id: IssueId::new(),
        title: title.into(),
        description: format!("{title} needs attention"),
        category: Category::Road,
        images: vec!["https://img.example.org/1.jpg".into()],
        location: Location {
            address: "12 Market Square".into(),
            lat: Some(23.81),
            lng: Some(90.41),
        },
        status: IssueStatus::Pending,
        priority: Priority::Normal,
        is_boosted: false,
        upvote_count: 0,
        upvoters: Default::default(),
        reporter_id: reporter,
        assigned_staff_id: None,
        created_at: now,
        updated_at: now,
    }
}
