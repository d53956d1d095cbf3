use crate::catalog::StageCatalog;
use crate::models::{CurrentUserContext, Entity, Opportunity, StageEvent, Tracked};
use crate::repo::repository::{decode, encode, Repository};
use crate::repo::store::{read_one, Filter, PersistenceError, Record};
use crate::timeline::{progress, ResolvedProgress, Terminal};
use serde_json::{json, Value};
use thiserror::Error;

/// Why a stage change was refused
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("'{stage}' is not a {domain} stage (valid stages: {valid})")]
    InvalidStage {
        domain: &'static str,
        stage: String,
        valid: String,
    },
    #[error("Probability must be between 0 and 100, got {0}")]
    InvalidProbability(i64),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Writes new stage ids for one kind of tracked entity.
///
/// A change is validated against the entity's catalog, written together with
/// a `StageEvent` in one atomic unit, and only then reflected in the
/// repository's views (by refetching). A failed write leaves both the store
/// and any cached copy as they were. Concurrent writers are not coordinated:
/// the last write wins.
pub struct StageMutator<'r, 's, T: Tracked> {
    repo: &'r Repository<'s, T>,
    user: CurrentUserContext,
}

impl<'r, 's, T: Tracked> StageMutator<'r, 's, T> {
    pub fn new(repo: &'r Repository<'s, T>) -> Self {
        Self {
            repo,
            user: CurrentUserContext::anonymous(),
        }
    }

    /// Record stage changes as made by `user`
    pub fn acting_as(mut self, user: CurrentUserContext) -> Self {
        self.user = user;
        self
    }

    pub fn catalog(&self) -> &'static StageCatalog {
        T::catalog()
    }

    /// Check that `stage` is a linear or terminal stage of the catalog
    pub fn validate(&self, stage: &str) -> Result<(), MutationError> {
        let catalog = self.catalog();
        if catalog.contains(stage) {
            Ok(())
        } else {
            Err(MutationError::InvalidStage {
                domain: catalog.domain().as_str(),
                stage: stage.to_string(),
                valid: catalog.ids().join(", "),
            })
        }
    }

    /// Move entity `id` to `new_stage` and return the refetched entity.
    ///
    /// Any stage may be reached from any other; the rail is not enforced.
    pub fn advance(&self, id: i64, new_stage: &str) -> Result<T, MutationError> {
        let new_stage = new_stage.trim();
        self.validate(new_stage)?;

        let changed_by = self.user.user_id.clone();
        let mut from_stage: Option<String> = None;

        let result = self.repo.store().atomically(&mut |tx| {
            let current = read_one(tx, T::TABLE, id)?;
            from_stage = current.get("stage").and_then(Value::as_str).map(str::to_string);

            let now = chrono::Utc::now().timestamp();
            let mut partial = Record::new();
            partial.insert("stage".to_string(), json!(new_stage));
            partial.insert("modified_ts".to_string(), json!(now));
            tx.update(T::TABLE, id, partial)?;

            let event = StageEvent {
                id: None,
                entity_table: T::TABLE.to_string(),
                entity_id: id,
                from_stage: from_stage.clone(),
                to_stage: new_stage.to_string(),
                changed_by: changed_by.clone(),
                changed_ts: now,
            };
            tx.insert(StageEvent::TABLE, encode(&event)?)?;
            Ok(())
        });

        if let Err(e) = result {
            log::warn!("Failed to move {} {} to '{}': {}", T::TABLE, id, new_stage, e);
            return Err(e.into());
        }

        log::info!(
            "Moved {} {} from {} to '{}'",
            T::TABLE,
            id,
            from_stage.as_deref().map(|s| format!("'{}'", s)).unwrap_or_else(|| "(unset)".to_string()),
            new_stage
        );

        self.repo.invalidate(id);
        Ok(self.repo.fetch(id)?)
    }

    /// Progress of entity `id` as currently stored
    pub fn progress_of(&self, id: i64) -> Result<ResolvedProgress, MutationError> {
        let entity = self.repo.fetch(id)?;
        Ok(progress(self.catalog(), entity.stage()))
    }

    /// Stage changes recorded for entity `id`, oldest first
    pub fn history(&self, id: i64) -> Result<Vec<StageEvent>, MutationError> {
        let events = self
            .repo
            .store()
            .read(StageEvent::TABLE, &Filter::Eq("entity_id".to_string(), json!(id)))?
            .into_iter()
            .map(decode::<StageEvent>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events.into_iter().filter(|e| e.entity_table == T::TABLE).collect())
    }
}

impl StageMutator<'_, '_, Opportunity> {
    pub fn mark_won(&self, id: i64) -> Result<Opportunity, MutationError> {
        self.advance(id, Terminal::Won.as_str())
    }

    pub fn mark_lost(&self, id: i64) -> Result<Opportunity, MutationError> {
        self.advance(id, Terminal::Lost.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::models::Project;
    use crate::repo::SqliteStore;

    #[test]
    fn test_advance_writes_stage_and_event() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Project> = Repository::new(&store);
        let project = repo.create(&Project::new("Portal".to_string())).unwrap();
        let id = project.id.unwrap();

        let mutator = StageMutator::new(&repo).acting_as(CurrentUserContext::new("alice"));
        let moved = mutator.advance(id, "development").unwrap();
        assert_eq!(moved.stage.as_deref(), Some("development"));
        assert_eq!(moved.name, "Portal");

        let history = mutator.history(id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_stage, None);
        assert_eq!(history[0].to_stage, "development");
        assert_eq!(history[0].changed_by.as_deref(), Some("alice"));
    }

    #[test]
    fn test_jump_to_any_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Project> = Repository::new(&store);
        let id = repo.create(&Project::new("Portal".to_string())).unwrap().id.unwrap();
        let mutator = StageMutator::new(&repo);

        mutator.advance(id, "production").unwrap();
        let back = mutator.advance(id, "discovery").unwrap();
        assert_eq!(back.stage.as_deref(), Some("discovery"));
        assert_eq!(mutator.progress_of(id).unwrap().index, Some(1));
    }

    #[test]
    fn test_unknown_stage_rejected_before_write() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Project> = Repository::new(&store);
        let id = repo.create(&Project::new("Portal".to_string())).unwrap().id.unwrap();
        let mutator = StageMutator::new(&repo);

        let err = mutator.advance(id, "won").unwrap_err();
        assert!(matches!(err, MutationError::InvalidStage { .. }));
        assert_eq!(repo.fetch(id).unwrap().stage, None);
        assert!(mutator.history(id).unwrap().is_empty());
    }

    #[test]
    fn test_missing_entity() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Project> = Repository::new(&store);
        let err = StageMutator::new(&repo).advance(42, "sow").unwrap_err();
        assert!(matches!(err, MutationError::Persistence(PersistenceError::NotFound { id: 42, .. })));
    }

    #[test]
    fn test_mark_won_and_lost() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let repo: Repository<Opportunity> = Repository::new(&store);
        let id = repo.create(&Opportunity::new("Acme".to_string())).unwrap().id.unwrap();
        let mutator = StageMutator::new(&repo);

        let won = mutator.mark_won(id).unwrap();
        assert!(won.is_closed());
        assert_eq!(mutator.progress_of(id).unwrap().percent, 100.0);

        // Leaving a terminal state is permitted
        mutator.advance(id, "closing").unwrap();
        let lost = mutator.mark_lost(id).unwrap();
        assert_eq!(lost.stage.as_deref(), Some("lost"));
        assert_eq!(mutator.history(id).unwrap().len(), 3);
    }

    #[test]
    fn test_history_scoped_to_table() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let store = SqliteStore::new(&conn);
        let projects: Repository<Project> = Repository::new(&store);
        let opps: Repository<Opportunity> = Repository::new(&store);
        let pid = projects.create(&Project::new("Portal".to_string())).unwrap().id.unwrap();
        let oid = opps.create(&Opportunity::new("Acme".to_string())).unwrap().id.unwrap();
        assert_eq!(pid, oid);

        StageMutator::new(&projects).advance(pid, "sow").unwrap();
        StageMutator::new(&opps).advance(oid, "proposal").unwrap();

        let history = StageMutator::new(&projects).history(pid).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].to_stage, "sow");
    }
}
