use crate::catalog::Domain;
use crate::models::entity::{Entity, Tracked};
use serde::{Deserialize, Serialize};

/// Delivery project tracked on the delivery catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<i64>,
    pub uuid: String,
    pub name: String,
    pub owner: Option<String>,
    pub stage: Option<String>,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Project {
    /// Create a new, unsaved project with no stage set
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            name,
            owner: None,
            stage: None,
            created_ts: now,
            modified_ts: now,
        }
    }
}

impl Entity for Project {
    const TABLE: &'static str = "projects";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Tracked for Project {
    const DOMAIN: Domain = Domain::Delivery;

    fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}
