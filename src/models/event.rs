use crate::models::entity::Entity;
use serde::{Deserialize, Serialize};

/// One recorded stage change, written alongside the stage update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub id: Option<i64>,
    pub entity_table: String,
    pub entity_id: i64,
    pub from_stage: Option<String>,
    pub to_stage: String,
    pub changed_by: Option<String>,
    pub changed_ts: i64,
}

impl Entity for StageEvent {
    const TABLE: &'static str = "stage_events";

    fn id(&self) -> Option<i64> {
        self.id
    }
}
