use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::catalog::Domain;
use crate::db::{Config, DbConnection};
use crate::models::{CurrentUserContext, Opportunity, Project, Tracked};
use crate::repo::{MutationError, PersistenceError, Repository, SqliteStore, StageMutator};
use crate::cli::error::{user_error, validate_entity_id, validate_non_empty, validate_probability, UserError};
use crate::cli::output::{
    format_catalog, format_history, format_opportunity_table, format_project_table, format_timeline,
    format_timestamp, is_tty, progress_json, stage_label,
};
use crate::timeline::progress;
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "hubtrack")]
#[command(about = "Stage timeline tracking for delivery projects and sales opportunities")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the stage catalogs
    Stages {
        /// Catalog to show (delivery or sales); both when omitted
        domain: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Delivery project commands
    Projects {
        #[command(subcommand)]
        subcommand: ProjectCommands,
    },
    /// Sales opportunity commands
    #[command(visible_alias = "opportunities")]
    Opps {
        #[command(subcommand)]
        subcommand: OppCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    Add {
        /// Project name
        name: String,
        /// Initial stage (defaults to the first delivery stage)
        #[arg(long)]
        stage: Option<String>,
        /// Owner user id (defaults to the current user)
        #[arg(long)]
        owner: Option<String>,
    },
    /// List projects
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show a project and its stage timeline
    Show {
        /// Project ID
        id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Move a project to any delivery stage
    Stage {
        /// Project ID
        id: String,
        /// Stage id (see `hubtrack stages delivery`)
        stage: String,
    },
    /// Show stage change history
    History {
        /// Project ID
        id: String,
    },
    /// Permanently delete a project
    Delete {
        /// Project ID
        id: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum OppCommands {
    /// Create a new opportunity
    Add {
        /// Opportunity name
        name: String,
        /// Customer name
        #[arg(long)]
        customer: Option<String>,
        /// Initial stage (defaults to the first sales stage)
        #[arg(long)]
        stage: Option<String>,
        /// Win probability, 0-100
        #[arg(long)]
        probability: Option<String>,
        /// Owner user id (defaults to the current user)
        #[arg(long)]
        owner: Option<String>,
    },
    /// List opportunities
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show an opportunity and its stage timeline
    Show {
        /// Opportunity ID
        id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Move an opportunity to any sales stage
    Stage {
        /// Opportunity ID
        id: String,
        /// Stage id (see `hubtrack stages sales`)
        stage: String,
    },
    /// Mark an opportunity as won
    Won {
        /// Opportunity ID
        id: String,
    },
    /// Mark an opportunity as lost
    Lost {
        /// Opportunity ID
        id: String,
    },
    /// Set the win probability
    Probability {
        /// Opportunity ID
        id: String,
        /// Probability, 0-100
        value: String,
    },
    /// Show stage change history
    History {
        /// Opportunity ID
        id: String,
    },
    /// Permanently delete an opportunity
    Delete {
        /// Opportunity ID
        id: String,
        /// Delete without confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests land here too
            e.print()?;
            if e.use_stderr() {
                return user_error("Invalid arguments");
            }
            return Ok(());
        }
    };

    if let Commands::Stages { domain, json } = &cli.command {
        return handle_stages(domain.as_deref(), *json);
    }

    let config = Config::load().context("Failed to load configuration")?;
    let user = current_user(&config);
    let conn = DbConnection::connect_at(&DbConnection::resolve_path(&config)?)
        .context("Failed to connect to database")?;

    handle_command(cli, &conn, &user)
}

/// Build the acting user from configuration
pub fn current_user(config: &Config) -> CurrentUserContext {
    CurrentUserContext {
        user_id: config.user_id.clone(),
        is_admin: config.user_admin,
    }
}

pub fn handle_command(cli: Cli, conn: &Connection, user: &CurrentUserContext) -> Result<()> {
    match cli.command {
        Commands::Stages { domain, json } => handle_stages(domain.as_deref(), json),
        Commands::Projects { subcommand } => handle_projects(subcommand, conn, user),
        Commands::Opps { subcommand } => handle_opps(subcommand, conn, user),
    }
}

fn handle_stages(domain: Option<&str>, json: bool) -> Result<()> {
    let domains = match domain {
        None => vec![Domain::Delivery, Domain::Sales],
        Some(name) => match name.parse::<Domain>() {
            Ok(d) => vec![d],
            Err(e) => return user_error(e),
        },
    };

    if json {
        let catalogs: Vec<_> = domains.iter().map(|d| d.catalog()).collect();
        println!("{}", serde_json::to_string_pretty(&catalogs)?);
        return Ok(());
    }

    let tty = is_tty();
    for (i, domain) in domains.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{} stages:", domain.as_str());
        print!("{}", format_catalog(domain.catalog(), tty));
    }
    Ok(())
}

fn handle_projects(cmd: ProjectCommands, conn: &Connection, user: &CurrentUserContext) -> Result<()> {
    let store = SqliteStore::new(conn);
    let repo: Repository<Project> = Repository::new(&store);

    match cmd {
        ProjectCommands::Add { name, stage, owner } => {
            if let Err(e) = validate_non_empty(&name, "Project name") {
                return user_error(e);
            }
            let mut project = Project::new(name.trim().to_string());
            project.stage = Some(initial_stage::<Project>(stage)?);
            project.owner = owner.or_else(|| user.user_id.clone());

            let project = repo.create(&project).context("Failed to create project")?;
            println!(
                "Created project {} '{}' at stage {}",
                display_id(project.id),
                project.name,
                stage_label(Project::catalog(), project.stage())
            );
            Ok(())
        }
        ProjectCommands::List { json } => {
            let projects = repo.list().context("Failed to list projects")?;
            if json {
                let rows: Vec<_> = projects.iter().map(entity_json).collect::<Result<_>>()?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", format_project_table(&projects, is_tty()));
            }
            Ok(())
        }
        ProjectCommands::Show { id, json } => {
            let project = load(&repo, parse_id(&id)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entity_json(&project)?)?);
            } else {
                println!("Project {}: {}", display_id(project.id), project.name);
                println!("Owner:    {}", project.owner.as_deref().unwrap_or("-"));
                println!("Created:  {}", format_timestamp(project.created_ts));
                println!("Modified: {}", format_timestamp(project.modified_ts));
                print_timeline(&project);
            }
            Ok(())
        }
        ProjectCommands::Stage { id, stage } => handle_stage_change(&repo, user, &id, &stage),
        ProjectCommands::History { id } => handle_history(&repo, &id),
        ProjectCommands::Delete { id, yes } => handle_delete(&repo, user, &id, yes),
    }
}

fn handle_opps(cmd: OppCommands, conn: &Connection, user: &CurrentUserContext) -> Result<()> {
    let store = SqliteStore::new(conn);
    let repo: Repository<Opportunity> = Repository::new(&store);

    match cmd {
        OppCommands::Add { name, customer, stage, probability, owner } => {
            if let Err(e) = validate_non_empty(&name, "Opportunity name") {
                return user_error(e);
            }
            let mut opp = Opportunity::new(name.trim().to_string());
            opp.customer = customer;
            opp.stage = Some(initial_stage::<Opportunity>(stage)?);
            opp.owner = owner.or_else(|| user.user_id.clone());
            if let Some(value) = probability {
                opp.probability = match validate_probability(&value) {
                    Ok(p) => p,
                    Err(e) => return user_error(e),
                };
            }

            let opp = repo.create(&opp).context("Failed to create opportunity")?;
            println!(
                "Created opportunity {} '{}' at stage {}",
                display_id(opp.id),
                opp.name,
                stage_label(Opportunity::catalog(), opp.stage())
            );
            Ok(())
        }
        OppCommands::List { json } => {
            let opps = repo.list().context("Failed to list opportunities")?;
            if json {
                let rows: Vec<_> = opps.iter().map(entity_json).collect::<Result<_>>()?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", format_opportunity_table(&opps, is_tty()));
            }
            Ok(())
        }
        OppCommands::Show { id, json } => {
            let opp = load(&repo, parse_id(&id)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entity_json(&opp)?)?);
            } else {
                println!("Opportunity {}: {}", display_id(opp.id), opp.name);
                println!("Customer:    {}", opp.customer.as_deref().unwrap_or("-"));
                println!("Owner:       {}", opp.owner.as_deref().unwrap_or("-"));
                println!("Probability: {}%", opp.probability);
                println!("Created:     {}", format_timestamp(opp.created_ts));
                println!("Modified:    {}", format_timestamp(opp.modified_ts));
                print_timeline(&opp);
            }
            Ok(())
        }
        OppCommands::Stage { id, stage } => handle_stage_change(&repo, user, &id, &stage),
        OppCommands::Won { id } => handle_stage_change(&repo, user, &id, "won"),
        OppCommands::Lost { id } => handle_stage_change(&repo, user, &id, "lost"),
        OppCommands::Probability { id, value } => {
            let id = parse_id(&id)?;
            let probability = match validate_probability(&value) {
                Ok(p) => p,
                Err(e) => return user_error(e),
            };
            let opp = repo
                .set_probability(id, probability)
                .map_err(|e| mutation_error::<Opportunity>(e, id))?;
            println!("Opportunity {} probability set to {}%", id, opp.probability);
            Ok(())
        }
        OppCommands::History { id } => handle_history(&repo, &id),
        OppCommands::Delete { id, yes } => handle_delete(&repo, user, &id, yes),
    }
}

/// Singular noun used in messages
fn noun<T: Tracked>() -> &'static str {
    match T::DOMAIN {
        Domain::Delivery => "Project",
        Domain::Sales => "Opportunity",
    }
}

fn display_id(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string())
}

fn parse_id(id: &str) -> Result<i64> {
    match validate_entity_id(id) {
        Ok(id) => Ok(id),
        Err(e) => user_error(e),
    }
}

/// Validate a requested initial stage, or fall back to the catalog default
fn initial_stage<T: Tracked>(stage: Option<String>) -> Result<String> {
    let catalog = T::catalog();
    match stage {
        None => Ok(catalog.default_stage().id.clone()),
        Some(stage) => {
            let stage = stage.trim().to_string();
            if catalog.contains(&stage) {
                Ok(stage)
            } else {
                user_error(format!(
                    "'{}' is not a {} stage (valid stages: {})",
                    stage,
                    catalog.domain().as_str(),
                    catalog.ids().join(", ")
                ))
            }
        }
    }
}

fn load<T: Tracked>(repo: &Repository<T>, id: i64) -> Result<T> {
    match repo.get(id)? {
        Some(entity) => Ok(entity),
        None => user_error(format!("{} {} not found", noun::<T>(), id)),
    }
}

fn entity_json<T: Tracked>(entity: &T) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(entity)?;
    if let serde_json::Value::Object(map) = &mut value {
        map.insert("stage_label".to_string(), serde_json::json!(stage_label(T::catalog(), entity.stage())));
        map.insert("progress".to_string(), progress_json(&progress(T::catalog(), entity.stage())));
    }
    Ok(value)
}

fn print_timeline<T: Tracked>(entity: &T) {
    println!();
    print!("{}", format_timeline(T::catalog(), &progress(T::catalog(), entity.stage()), is_tty()));
}

/// Turn a mutation failure into a user error where the user can fix it
fn mutation_error<T: Tracked>(err: MutationError, id: i64) -> anyhow::Error {
    match err {
        MutationError::InvalidStage { .. } | MutationError::InvalidProbability(_) => {
            UserError(err.to_string()).into()
        }
        MutationError::Persistence(PersistenceError::NotFound { .. }) => {
            UserError(format!("{} {} not found", noun::<T>(), id)).into()
        }
        MutationError::Persistence(e) => {
            anyhow::Error::new(e).context(format!("Failed to update {} {}", noun::<T>().to_lowercase(), id))
        }
    }
}

fn handle_stage_change<T: Tracked>(
    repo: &Repository<T>,
    user: &CurrentUserContext,
    id: &str,
    stage: &str,
) -> Result<()> {
    let id = parse_id(id)?;
    let mutator = StageMutator::new(repo).acting_as(user.clone());
    let entity = mutator
        .advance(id, stage)
        .map_err(|e| mutation_error::<T>(e, id))?;
    let progress = progress(T::catalog(), entity.stage());
    println!(
        "{} {} moved to {} ({:.0}%)",
        noun::<T>(),
        id,
        stage_label(T::catalog(), entity.stage()),
        progress.percent
    );
    Ok(())
}

fn handle_history<T: Tracked>(repo: &Repository<T>, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    load(repo, id)?;
    let events = StageMutator::new(repo)
        .history(id)
        .map_err(|e| mutation_error::<T>(e, id))?;
    print!("{}", format_history(T::catalog(), &events));
    Ok(())
}

fn handle_delete<T: Tracked>(
    repo: &Repository<T>,
    user: &CurrentUserContext,
    id: &str,
    yes: bool,
) -> Result<()> {
    let id = parse_id(id)?;
    let entity = load(repo, id)?;

    if !user.can_modify(&entity) {
        return user_error(format!(
            "Permission denied: {} {} is owned by '{}'",
            noun::<T>().to_lowercase(),
            id,
            entity.owner().unwrap_or("-")
        ));
    }

    if !yes && !confirm(&format!("Delete {} {}?", noun::<T>().to_lowercase(), id))? {
        println!("Cancelled.");
        return Ok(());
    }

    repo.delete(id)
        .with_context(|| format!("Failed to delete {} {}", noun::<T>().to_lowercase(), id))?;
    println!("Deleted {} {}", noun::<T>().to_lowercase(), id);
    Ok(())
}

/// Ask a yes/no question on stderr; anything but yes declines
fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N]: ", question);
    std::io::Write::flush(&mut std::io::stderr())
        .map_err(|e| anyhow::anyhow!("Failed to flush stderr: {}", e))?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
