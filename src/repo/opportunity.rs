use crate::models::Opportunity;
use crate::repo::repository::Repository;
use crate::repo::stage::MutationError;
use crate::repo::store::Record;
use serde_json::json;

impl Repository<'_, Opportunity> {
    /// Set the win probability. Independent of the stage: no stage change,
    /// no stage event.
    pub fn set_probability(&self, id: i64, probability: i64) -> Result<Opportunity, MutationError> {
        if !(0..=100).contains(&probability) {
            return Err(MutationError::InvalidProbability(probability));
        }

        let mut partial = Record::new();
        partial.insert("probability".to_string(), json!(probability));
        partial.insert("modified_ts".to_string(), json!(chrono::Utc::now().timestamp()));
        let updated = self.update(id, partial)?;
        log::info!("Set probability of opportunity {} to {}%", id, probability);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::repo::{SqliteStore, StageMutator};

    #[test]
    fn test_set_probability_leaves_stage_alone() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Opportunity> = Repository::new(&store);
        let id = repo.create(&Opportunity::new("Acme".to_string())).unwrap().id.unwrap();
        StageMutator::new(&repo).advance(id, "negotiation").unwrap();

        let updated = repo.set_probability(id, 65).unwrap();
        assert_eq!(updated.probability, 65);
        assert_eq!(updated.stage.as_deref(), Some("negotiation"));
        assert_eq!(StageMutator::new(&repo).history(id).unwrap().len(), 1);
    }

    #[test]
    fn test_probability_out_of_range() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Opportunity> = Repository::new(&store);
        let id = repo.create(&Opportunity::new("Acme".to_string())).unwrap().id.unwrap();

        assert!(matches!(repo.set_probability(id, 101), Err(MutationError::InvalidProbability(101))));
        assert!(matches!(repo.set_probability(id, -1), Err(MutationError::InvalidProbability(-1))));
        assert!(repo.set_probability(id, 0).is_ok());
        assert!(repo.set_probability(id, 100).is_ok());
    }
}
