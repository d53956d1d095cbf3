// Output formatting utilities

use crate::catalog::StageCatalog;
use crate::models::{Opportunity, Project, StageEvent, Tracked};
use crate::timeline::{progress, Classification, ResolvedProgress};
use chrono::Local;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_BLUE: &str = "\x1b[34m";
const ANSI_FG_MAGENTA: &str = "\x1b[35m";
const ANSI_FG_CYAN: &str = "\x1b[36m";
const ANSI_FG_WHITE: &str = "\x1b[37m";

/// Map a stage marker color name to its ANSI foreground constant
fn color_name_to_fg(name: &str) -> Option<&'static str> {
    match name {
        "red" => Some(ANSI_FG_RED),
        "green" => Some(ANSI_FG_GREEN),
        "yellow" => Some(ANSI_FG_YELLOW),
        "blue" => Some(ANSI_FG_BLUE),
        "magenta" => Some(ANSI_FG_MAGENTA),
        "cyan" => Some(ANSI_FG_CYAN),
        "white" => Some(ANSI_FG_WHITE),
        _ => None,
    }
}

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, falling back to the COLUMNS environment
/// variable and then a fixed default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    100
}

fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn colorize(text: &str, marker: &str, is_tty: bool) -> String {
    match color_name_to_fg(marker) {
        Some(code) if is_tty => format!("{}{}{}", code, text, ANSI_RESET),
        _ => text.to_string(),
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    use chrono::TimeZone;
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// Label of the stage an entity sits on, honoring terminal states
pub fn stage_label(catalog: &StageCatalog, stored: Option<&str>) -> String {
    let progress = progress(catalog, stored);
    if let Some(terminal) = progress.terminal {
        return catalog
            .get(terminal.as_str())
            .map(|s| s.label.clone())
            .unwrap_or_else(|| terminal.as_str().to_string());
    }
    progress
        .current()
        .and_then(|s| catalog.get(&s.stage_id))
        .map(|s| s.label.clone())
        .unwrap_or_default()
}

/// Progress bar such as `[#####.....]  50%`
pub fn format_progress_bar(progress: &ResolvedProgress, width: usize) -> String {
    let width = width.max(1);
    let filled = ((progress.percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        progress.percent
    )
}

/// Render the stage rail, one stage per line
///
/// ```text
/// [x] Kick Off
/// [>] Discovery
/// [ ] SOW
/// ```
pub fn format_timeline(catalog: &StageCatalog, progress: &ResolvedProgress, is_tty: bool) -> String {
    let mut output = String::new();
    let bar_width = (get_terminal_width().saturating_sub(10)).clamp(10, 40);
    output.push_str(&format!("Progress: {}\n", format_progress_bar(progress, bar_width)));

    for (definition, status) in catalog.stages().iter().zip(progress.stages.iter()) {
        let line = match status.classification {
            Classification::Past => format!("[x] {}", definition.label),
            Classification::Current => bold_if_tty(&format!("[>] {}", definition.label), is_tty),
            Classification::Future => format!("[ ] {}", definition.label),
        };
        let line = match status.classification {
            Classification::Future if is_tty => format!("{}{}{}", ANSI_DIM, line, ANSI_RESET),
            _ => colorize(&line, &definition.marker, is_tty && status.classification != Classification::Future),
        };
        output.push_str(&line);
        output.push('\n');
    }

    if let Some(terminal) = progress.terminal {
        let definition = catalog.get(terminal.as_str());
        let label = definition.map(|d| d.label.as_str()).unwrap_or(terminal.as_str());
        let marker = definition.map(|d| d.marker.as_str()).unwrap_or("white");
        output.push_str(&format!("Outcome: {}\n", colorize(label, marker, is_tty)));
    }

    output
}

/// Render the definition list of a catalog
pub fn format_catalog(catalog: &StageCatalog, is_tty: bool) -> String {
    let mut output = String::new();
    output.push_str(&bold_if_tty(
        &format!("{:<4} {:<22} {:<22}", "#", "Stage", "Label"),
        is_tty,
    ));
    output.push('\n');
    output.push_str(&"-".repeat(48));
    output.push('\n');
    for (i, stage) in catalog.stages().iter().enumerate() {
        output.push_str(&format!("{:<4} {:<22} {}\n", i + 1, stage.id, colorize(&stage.label, &stage.marker, is_tty)));
    }
    for stage in catalog.terminals() {
        output.push_str(&format!("{:<4} {:<22} {}\n", "*", stage.id, colorize(&stage.label, &stage.marker, is_tty)));
    }
    output
}

fn progress_cell<T: Tracked>(entity: &T) -> String {
    let progress = progress(T::catalog(), entity.stage());
    if progress.index.is_none() {
        "-".to_string()
    } else {
        format!("{:.0}%", progress.percent)
    }
}

/// Table of projects
pub fn format_project_table(projects: &[Project], is_tty: bool) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }
    let catalog = Project::catalog();
    let mut output = String::new();
    output.push_str(&bold_if_tty(
        &format!("{:<6} {:<32} {:<22} {:>8} {:<12}", "ID", "Name", "Stage", "Progress", "Owner"),
        is_tty,
    ));
    output.push('\n');
    output.push_str(&"-".repeat(84));
    output.push('\n');
    for project in projects {
        output.push_str(&format!(
            "{:<6} {:<32} {:<22} {:>8} {:<12}\n",
            project.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
            project.name,
            stage_label(catalog, project.stage()),
            progress_cell(project),
            project.owner.as_deref().unwrap_or("-"),
        ));
    }
    output
}

/// Table of opportunities
pub fn format_opportunity_table(opportunities: &[Opportunity], is_tty: bool) -> String {
    if opportunities.is_empty() {
        return "No opportunities found.\n".to_string();
    }
    let catalog = Opportunity::catalog();
    let mut output = String::new();
    output.push_str(&bold_if_tty(
        &format!(
            "{:<6} {:<28} {:<20} {:<12} {:>8} {:>5} {:<12}",
            "ID", "Name", "Customer", "Stage", "Progress", "Prob", "Owner"
        ),
        is_tty,
    ));
    output.push('\n');
    output.push_str(&"-".repeat(97));
    output.push('\n');
    for opp in opportunities {
        output.push_str(&format!(
            "{:<6} {:<28} {:<20} {:<12} {:>8} {:>4}% {:<12}\n",
            opp.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
            opp.name,
            opp.customer.as_deref().unwrap_or("-"),
            stage_label(catalog, opp.stage()),
            progress_cell(opp),
            opp.probability,
            opp.owner.as_deref().unwrap_or("-"),
        ));
    }
    output
}

/// Stage change history
pub fn format_history(catalog: &StageCatalog, events: &[StageEvent]) -> String {
    if events.is_empty() {
        return "No stage changes recorded.\n".to_string();
    }
    let label = |id: Option<&str>| -> String {
        match id {
            Some(id) => catalog.get(id).map(|s| s.label.clone()).unwrap_or_else(|| id.to_string()),
            None => "(unset)".to_string(),
        }
    };
    let mut output = String::new();
    for event in events {
        output.push_str(&format!(
            "{}  {} -> {}  by {}\n",
            format_timestamp(event.changed_ts),
            label(event.from_stage.as_deref()),
            label(Some(event.to_stage.as_str())),
            event.changed_by.as_deref().unwrap_or("-"),
        ));
    }
    output
}

/// JSON view of a progress computation
pub fn progress_json(progress: &ResolvedProgress) -> serde_json::Value {
    serde_json::json!({
        "index": progress.index_or_sentinel(),
        "percent": progress.percent,
        "terminal": progress.terminal.map(|t| t.as_str()),
        "stages": progress.stages.iter().map(|s| {
            serde_json::json!({
                "stage": s.stage_id,
                "classification": s.classification.as_str(),
            })
        }).collect::<Vec<_>>(),
    })
}
