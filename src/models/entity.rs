use crate::catalog::{Domain, StageCatalog};
use serde::{de::DeserializeOwned, Serialize};

/// A record type stored in its own table.
///
/// Field names double as column names; `Repository<T>` converts between the
/// struct and a generic record through serde.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const TABLE: &'static str;

    /// Row id, `None` until inserted
    fn id(&self) -> Option<i64>;
}

/// An entity that moves along a stage catalog
pub trait Tracked: Entity {
    const DOMAIN: Domain;

    /// Stored stage id, possibly missing or stale
    fn stage(&self) -> Option<&str>;

    /// User id of the owner, if any
    fn owner(&self) -> Option<&str>;

    fn catalog() -> &'static StageCatalog {
        Self::DOMAIN.catalog()
    }
}
