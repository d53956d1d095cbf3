use crate::catalog::StageCatalog;
use std::str::FromStr;

/// Terminal side-states outside the linear rail
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    Won,
    Lost,
}

impl Terminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminal::Won => "won",
            Terminal::Lost => "lost",
        }
    }

}

impl FromStr for Terminal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "won" => Ok(Terminal::Won),
            "lost" => Ok(Terminal::Lost),
            _ => Err(format!("'{}' is not a terminal stage", s)),
        }
    }
}

/// Map a stored stage id to its catalog index.
///
/// `None`, empty, unknown and terminal ids all fall back to the catalog's
/// default index (0 for the built-in catalogs). Matching is exact: stored ids
/// are not trimmed or case-folded. Nothing is signalled to the caller.
pub fn resolve(catalog: &StageCatalog, stored: Option<&str>) -> usize {
    let id = match stored {
        Some(id) if !id.is_empty() => id,
        _ => return catalog.default_index(),
    };

    match catalog.position(id) {
        Some(index) => index,
        None => {
            if !catalog.is_terminal(id) {
                log::debug!(
                    "Unrecognized {} stage '{}', falling back to '{}'",
                    catalog.domain().as_str(),
                    id,
                    catalog.default_stage().id
                );
            }
            catalog.default_index()
        }
    }
}

/// Detect a terminal stage declared by the catalog
pub fn terminal_of(catalog: &StageCatalog, stored: Option<&str>) -> Option<Terminal> {
    let id = stored?;
    if catalog.is_terminal(id) {
        id.parse().ok()
    } else {
        None
    }
}
