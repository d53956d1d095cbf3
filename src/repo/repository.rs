use crate::models::Entity;
use crate::repo::store::{read_one, Filter, PersistenceError, Record, RecordStore};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Previously fetched list and detail views for one table.
///
/// Only ever filled from confirmed reads; writes invalidate entries rather
/// than patching them. Reads through a repository always refill it from the
/// store.
#[derive(Debug)]
pub struct ViewCache<T> {
    list: Option<Vec<T>>,
    details: HashMap<i64, T>,
}

impl<T: Clone> ViewCache<T> {
    pub fn new() -> Self {
        Self {
            list: None,
            details: HashMap::new(),
        }
    }

    pub fn list(&self) -> Option<&[T]> {
        self.list.as_deref()
    }

    pub fn detail(&self, id: i64) -> Option<&T> {
        self.details.get(&id)
    }

    fn store_list(&mut self, items: Vec<T>) {
        self.list = Some(items);
    }

    fn store_detail(&mut self, id: i64, item: T) {
        self.details.insert(id, item);
    }

    /// Drop the list view and the detail view of `id`
    pub fn invalidate(&mut self, id: i64) {
        self.list = None;
        self.details.remove(&id);
    }

    pub fn clear(&mut self) {
        self.list = None;
        self.details.clear();
    }
}

impl<T: Clone> Default for ViewCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize an entity into a record
pub(crate) fn encode<T: Entity>(entity: &T) -> Result<Record, PersistenceError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PersistenceError::Decode(format!(
            "{} entity did not serialize to an object: {}",
            T::TABLE,
            other
        ))),
        Err(e) => Err(PersistenceError::Decode(e.to_string())),
    }
}

/// Deserialize a record into an entity
pub(crate) fn decode<T: Entity>(record: Record) -> Result<T, PersistenceError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| PersistenceError::Decode(format!("{}: {}", T::TABLE, e)))
}

/// Typed list/get/create/update/delete over one table of a record store
///
/// # Example
///
/// ```no_run
/// use hubtrack::db::DbConnection;
/// use hubtrack::models::Project;
/// use hubtrack::repo::{Repository, SqliteStore};
///
/// let conn = DbConnection::connect().unwrap();
/// let store = SqliteStore::new(&conn);
/// let projects: Repository<Project> = Repository::new(&store);
/// let created = projects.create(&Project::new("Portal rollout".to_string())).unwrap();
/// ```
pub struct Repository<'s, T: Entity> {
    store: &'s dyn RecordStore,
    cache: RefCell<ViewCache<T>>,
}

impl<'s, T: Entity> Repository<'s, T> {
    pub fn new(store: &'s dyn RecordStore) -> Self {
        Self {
            store,
            cache: RefCell::new(ViewCache::new()),
        }
    }

    pub fn store(&self) -> &'s dyn RecordStore {
        self.store
    }

    /// All rows as the store currently holds them; refills the list view
    pub fn list(&self) -> Result<Vec<T>, PersistenceError> {
        self.refresh()
    }

    /// Refetch the list view
    pub fn refresh(&self) -> Result<Vec<T>, PersistenceError> {
        let items = self.find(&Filter::All)?;
        self.cache.borrow_mut().store_list(items.clone());
        Ok(items)
    }

    /// Uncached filtered read
    pub fn find(&self, filter: &Filter) -> Result<Vec<T>, PersistenceError> {
        self.store
            .read(T::TABLE, filter)?
            .into_iter()
            .map(decode::<T>)
            .collect()
    }

    /// One row by id as the store currently holds it.
    ///
    /// Other repositories over the same store may have written since the
    /// detail view was filled, so reads always go to the store.
    pub fn get(&self, id: i64) -> Result<Option<T>, PersistenceError> {
        match self.fetch(id) {
            Ok(item) => Ok(Some(item)),
            Err(PersistenceError::NotFound { .. }) => {
                self.invalidate(id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Read one row from the store, bypassing and then refilling the detail view
    pub fn fetch(&self, id: i64) -> Result<T, PersistenceError> {
        let item: T = decode(read_one(self.store, T::TABLE, id)?)?;
        self.cache.borrow_mut().store_detail(id, item.clone());
        Ok(item)
    }

    pub fn create(&self, entity: &T) -> Result<T, PersistenceError> {
        let stored: T = decode(self.store.insert(T::TABLE, encode(entity)?)?)?;
        let mut cache = self.cache.borrow_mut();
        if let Some(id) = stored.id() {
            cache.invalidate(id);
            cache.store_detail(id, stored.clone());
        }
        log::debug!("Created {} record id={:?}", T::TABLE, stored.id());
        Ok(stored)
    }

    /// Overwrite the given columns, then refetch the row
    pub fn update(&self, id: i64, partial: Record) -> Result<T, PersistenceError> {
        self.store.update(T::TABLE, id, partial)?;
        self.invalidate(id);
        self.fetch(id)
    }

    pub fn delete(&self, id: i64) -> Result<(), PersistenceError> {
        self.store.delete(T::TABLE, id)?;
        self.invalidate(id);
        log::debug!("Deleted {} record id={}", T::TABLE, id);
        Ok(())
    }

    /// Mark the list view and the detail view of `id` stale
    pub fn invalidate(&self, id: i64) {
        self.cache.borrow_mut().invalidate(id);
    }

    /// Last confirmed detail view, without touching the store
    pub fn cached(&self, id: i64) -> Option<T> {
        self.cache.borrow().detail(id).cloned()
    }

    /// Last confirmed list view, without touching the store
    pub fn cached_list(&self) -> Option<Vec<T>> {
        self.cache.borrow().list().map(<[T]>::to_vec)
    }

    pub fn is_list_cached(&self) -> bool {
        self.cache.borrow().list().is_some()
    }
}
