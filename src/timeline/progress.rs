use crate::catalog::StageCatalog;
use crate::timeline::resolver::{resolve, terminal_of, Terminal};
use serde::Serialize;

/// Position of a stage relative to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Past,
    Current,
    Future,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Past => "past",
            Classification::Current => "current",
            Classification::Future => "future",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageStatus {
    pub stage_id: String,
    pub classification: Classification,
}

/// Derived view of where an entity sits on its rail. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedProgress {
    /// `None` when the entity is lost and has no position on the rail
    pub index: Option<usize>,
    pub percent: f64,
    pub stages: Vec<StageStatus>,
    pub terminal: Option<Terminal>,
}

impl ResolvedProgress {
    /// Index with `-1` standing in for "no position"
    pub fn index_or_sentinel(&self) -> i64 {
        self.index.map(|i| i as i64).unwrap_or(-1)
    }

    /// The current stage, if any
    pub fn current(&self) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|s| s.classification == Classification::Current)
    }
}

/// Classify each linear stage against `current_index`
pub fn classify(catalog: &StageCatalog, current_index: usize) -> Vec<StageStatus> {
    catalog
        .stages()
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let classification = if i < current_index {
                Classification::Past
            } else if i == current_index {
                Classification::Current
            } else {
                Classification::Future
            };
            StageStatus {
                stage_id: stage.id.clone(),
                classification,
            }
        })
        .collect()
}

/// Classification when a terminal state overrides the rail.
/// Won marks every stage past; lost leaves every stage future.
pub fn classify_terminal(catalog: &StageCatalog, terminal: Terminal) -> Vec<StageStatus> {
    let classification = match terminal {
        Terminal::Won => Classification::Past,
        Terminal::Lost => Classification::Future,
    };
    catalog
        .stages()
        .iter()
        .map(|stage| StageStatus {
            stage_id: stage.id.clone(),
            classification,
        })
        .collect()
}

/// Completion percentage; the first stage already counts as started
pub fn percent(catalog: &StageCatalog, current_index: usize) -> f64 {
    let len = catalog.len() as f64;
    let value = (current_index as f64 + 1.0) / len * 100.0;
    value.clamp(0.0, 100.0)
}

/// Percentage for a terminal state
pub fn terminal_percent(terminal: Terminal) -> f64 {
    match terminal {
        Terminal::Won => 100.0,
        Terminal::Lost => 0.0,
    }
}

/// Resolve a stored stage and derive the full progress view
pub fn progress(catalog: &StageCatalog, stored: Option<&str>) -> ResolvedProgress {
    if let Some(terminal) = terminal_of(catalog, stored) {
        let index = match terminal {
            Terminal::Won => Some(catalog.len() - 1),
            Terminal::Lost => None,
        };
        return ResolvedProgress {
            index,
            percent: terminal_percent(terminal),
            stages: classify_terminal(catalog, terminal),
            terminal: Some(terminal),
        };
    }

    let index = resolve(catalog, stored);
    ResolvedProgress {
        index: Some(index),
        percent: percent(catalog, index),
        stages: classify(catalog, index),
        terminal: None,
    }
}
