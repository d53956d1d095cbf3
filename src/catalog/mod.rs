//! Stage catalogs
//!
//! A catalog is the ordered, immutable list of stages an entity moves through.
//! Position in the list defines progress. Some domains also carry terminal
//! stages (`won`, `lost`) that sit outside the linear rail.

pub mod builtin;

use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

pub use builtin::{delivery, sales};

/// Errors raised while building a catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("stage catalog must contain at least one linear stage")]
    Empty,
    #[error("duplicate stage id '{0}' in catalog")]
    DuplicateStage(String),
    #[error("default stage '{0}' is not a linear stage of the catalog")]
    UnknownDefault(String),
}

/// Which process a catalog describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Delivery,
    Sales,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Delivery => "delivery",
            Domain::Sales => "sales",
        }
    }

    /// Built-in catalog for this domain
    pub fn catalog(&self) -> &'static StageCatalog {
        match self {
            Domain::Delivery => delivery(),
            Domain::Sales => sales(),
        }
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Domain::Delivery),
            "sales" => Ok(Domain::Sales),
            _ => Err(format!("Unknown catalog '{}'. Use 'delivery' or 'sales'.", s)),
        }
    }
}

/// A single named stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub id: String,
    pub label: String,
    /// Color name used by the timeline renderer
    pub marker: String,
}

impl StageDefinition {
    pub fn new(id: &str, label: &str, marker: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            marker: marker.to_string(),
        }
    }
}

/// Ordered list of stages for one domain
#[derive(Debug, Clone, Serialize)]
pub struct StageCatalog {
    domain: Domain,
    stages: Vec<StageDefinition>,
    terminals: Vec<StageDefinition>,
    default_index: usize,
}

impl StageCatalog {
    /// Build a catalog whose default stage is the first linear stage
    pub fn new(
        domain: Domain,
        stages: Vec<StageDefinition>,
        terminals: Vec<StageDefinition>,
    ) -> Result<Self, CatalogError> {
        let default_id = stages.first().map(|s| s.id.clone()).ok_or(CatalogError::Empty)?;
        Self::with_default(domain, stages, terminals, &default_id)
    }

    /// Build a catalog with an explicit default stage
    pub fn with_default(
        domain: Domain,
        stages: Vec<StageDefinition>,
        terminals: Vec<StageDefinition>,
        default_id: &str,
    ) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for stage in stages.iter().chain(terminals.iter()) {
            if !seen.insert(stage.id.as_str()) {
                return Err(CatalogError::DuplicateStage(stage.id.clone()));
            }
        }

        let default_index = stages
            .iter()
            .position(|s| s.id == default_id)
            .ok_or_else(|| CatalogError::UnknownDefault(default_id.to_string()))?;

        Ok(Self {
            domain,
            stages,
            terminals,
            default_index,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Linear stages in order
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Terminal stages (empty for domains without them)
    pub fn terminals(&self) -> &[StageDefinition] {
        &self.terminals
    }

    /// Number of linear stages; never zero
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn default_stage(&self) -> &StageDefinition {
        &self.stages[self.default_index]
    }

    /// Position of a linear stage
    pub fn position(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    pub fn is_terminal(&self, id: &str) -> bool {
        self.terminals.iter().any(|s| s.id == id)
    }

    /// True for any linear or terminal stage id
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some() || self.is_terminal(id)
    }

    /// Look up a linear or terminal stage by id
    pub fn get(&self, id: &str) -> Option<&StageDefinition> {
        self.stages
            .iter()
            .chain(self.terminals.iter())
            .find(|s| s.id == id)
    }

    /// All valid ids, linear first
    pub fn ids(&self) -> Vec<&str> {
        self.stages
            .iter()
            .chain(self.terminals.iter())
            .map(|s| s.id.as_str())
            .collect()
    }
}
