// Built-in catalogs for the delivery and sales domains

use super::{Domain, StageCatalog, StageDefinition};
use std::sync::OnceLock;

const DELIVERY_STAGES: &[(&str, &str, &str)] = &[
    ("kick_off", "Kick Off", "blue"),
    ("discovery", "Discovery", "blue"),
    ("sow", "SOW", "cyan"),
    ("hld", "HLD", "cyan"),
    ("environment", "Environment", "cyan"),
    ("lld", "LLD", "cyan"),
    ("development", "Development", "yellow"),
    ("testing_design", "Testing Design", "yellow"),
    ("implementation", "Implementation", "yellow"),
    ("integration_testing", "Integration Testing", "magenta"),
    ("uat", "UAT", "magenta"),
    ("production", "Production", "green"),
    ("change_requests", "Change Requests", "green"),
];

const SALES_STAGES: &[(&str, &str, &str)] = &[
    ("prospecting", "Prospecting", "blue"),
    ("proposal", "Proposal", "cyan"),
    ("negotiation", "Negotiation", "yellow"),
    ("closing", "Closing", "magenta"),
];

const SALES_TERMINALS: &[(&str, &str, &str)] = &[
    ("won", "Won", "green"),
    ("lost", "Lost", "red"),
];

fn definitions(rows: &[(&str, &str, &str)]) -> Vec<StageDefinition> {
    rows.iter()
        .map(|(id, label, marker)| StageDefinition::new(id, label, marker))
        .collect()
}

/// Project delivery catalog (13 stages, no terminal state)
pub fn delivery() -> &'static StageCatalog {
    static CATALOG: OnceLock<StageCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| StageCatalog {
        domain: Domain::Delivery,
        stages: definitions(DELIVERY_STAGES),
        terminals: Vec::new(),
        default_index: 0,
    })
}

/// Sales pipeline catalog (4 linear stages plus `won` and `lost`)
pub fn sales() -> &'static StageCatalog {
    static CATALOG: OnceLock<StageCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| StageCatalog {
        domain: Domain::Sales,
        stages: definitions(SALES_STAGES),
        terminals: definitions(SALES_TERMINALS),
        default_index: 0,
    })
}
