use crate::catalog::Domain;
use crate::models::entity::{Entity, Tracked};
use serde::{Deserialize, Serialize};

/// Sales opportunity tracked on the sales catalog.
///
/// `probability` is driven separately from `stage`; moving the stage never
/// touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Option<i64>,
    pub uuid: String,
    pub name: String,
    pub customer: Option<String>,
    pub owner: Option<String>,
    pub stage: Option<String>,
    pub probability: i64,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Opportunity {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            name,
            customer: None,
            owner: None,
            stage: None,
            probability: 0,
            created_ts: now,
            modified_ts: now,
        }
    }

    /// True once the opportunity has been won or lost
    pub fn is_closed(&self) -> bool {
        matches!(self.stage.as_deref(), Some("won") | Some("lost"))
    }
}

impl Entity for Opportunity {
    const TABLE: &'static str = "opportunities";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Tracked for Opportunity {
    const DOMAIN: Domain = Domain::Sales;

    fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}
