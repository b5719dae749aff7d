mod config;
mod display;
mod executor;
mod reference;

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use marmot_core::provider::{Diagnostic, Provider};
use marmot_core::resource::{Resource, ResourceId};
use marmot_core::schema::ResourceSchema;
use marmot_provider::MarmotProvider;
use marmot_provider::resources;
use marmot_state::local::DEFAULT_STATE_FILE;
use marmot_state::{StateFile, StateLock, StateStore, StoreLocation, open_store};

use crate::config::ConfigFile;
use crate::display::print_plan;
use crate::executor::{
    ApplyReport, apply_plan, build_plan, destroy_plan, persist, record, refresh_state,
};
use crate::reference::{ReferenceResolver, check_references};

#[derive(Parser)]
#[command(name = "marmot")]
#[command(about = "Manage Marmot catalog assets, glossary terms and lineage as code", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, short, global = true, env = "MARMOT_CONFIG", default_value = "marmot.json")]
    config: PathBuf,

    /// Path to the state file
    #[arg(long, global = true, env = "MARMOT_STATE", default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate,
    /// Show execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired state
    Apply {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Destroy every resource recorded in state
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Update state from the catalog
    Refresh,
    /// Bring an existing catalog entity under management
    Import {
        /// Resource type (e.g. marmot_asset)
        resource_type: String,
        /// Local resource name
        name: String,
        /// Catalog identifier of the entity
        id: String,
    },
    /// Release a stuck state lock
    ForceUnlock {
        /// Lock ID reported by the failed command
        lock_id: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Validate => run_validate(&cli.config),
        Commands::Plan => run_plan(&cli).await,
        Commands::Apply { auto_approve } => run_apply(&cli, *auto_approve).await,
        Commands::Destroy { auto_approve } => run_destroy(&cli, *auto_approve).await,
        Commands::Refresh => run_refresh(&cli).await,
        Commands::Import {
            resource_type,
            name,
            id,
        } => run_import(&cli, ResourceId::new(resource_type, name), id).await,
        Commands::ForceUnlock { lock_id } => run_force_unlock(&cli.state, lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Check types, schemas and reference order of the declared resources
fn validate_resources(
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
    resolver: &ReferenceResolver,
) -> Result<(), String> {
    let mut errors = Vec::new();

    for resource in resources {
        match schemas.get(&resource.id.resource_type) {
            Some(schema) => {
                if let Err(type_errors) = schema.validate(&resource.attributes) {
                    errors.extend(
                        type_errors
                            .into_iter()
                            .map(|e| format!("{}: {}", resource.id, e)),
                    );
                }
            }
            None => errors.push(format!(
                "{}: Unknown resource type: {}",
                resource.id, resource.id.resource_type
            )),
        }
    }

    errors.extend(check_references(resolver, resources));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n  {}", errors.join("\n  ")))
    }
}

fn run_validate(config_path: &Path) -> Result<(), String> {
    println!("{}", "Validating...".cyan());

    let config = ConfigFile::load(config_path)?;
    let resources = config.resources()?;
    let resolver = ReferenceResolver::new()?;

    if let Err(diagnostics) = config.provider_config().validate() {
        let details: Vec<_> = diagnostics.iter().map(|d| d.to_string()).collect();
        return Err(format!("Validation failed:\n  {}", details.join("\n  ")));
    }
    validate_resources(&resources, &resources::schemas(), &resolver)?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );
    for resource in &resources {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(cli: &Cli) -> Result<(), String> {
    let config = ConfigFile::load(&cli.config)?;
    let resources = config.resources()?;
    let resolver = ReferenceResolver::new()?;
    let schemas = resources::schemas();
    validate_resources(&resources, &schemas, &resolver)?;

    let provider = get_provider(&config)?;
    let store = open_state(&cli.state)?;
    let lock = acquire_lock(store.as_ref(), "plan").await?;

    let result = plan_locked(&provider, store.as_ref(), &resources, &schemas, &resolver).await;

    release_lock(store.as_ref(), &lock).await;
    result
}

async fn plan_locked(
    provider: &MarmotProvider,
    store: &dyn StateStore,
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
    resolver: &ReferenceResolver,
) -> Result<(), String> {
    let mut state = load_state(store).await?;
    refresh_state(provider, &mut state).await?;
    let plan = build_plan(resources, &state, schemas, resolver);
    print_plan(&plan, schemas, resolver);
    Ok(())
}

async fn run_apply(cli: &Cli, auto_approve: bool) -> Result<(), String> {
    let config = ConfigFile::load(&cli.config)?;
    let resources = config.resources()?;
    let resolver = ReferenceResolver::new()?;
    let schemas = resources::schemas();
    validate_resources(&resources, &schemas, &resolver)?;

    let provider = get_provider(&config)?;
    let store = open_state(&cli.state)?;
    let lock = acquire_lock(store.as_ref(), "apply").await?;

    let result = apply_locked(
        &provider,
        store.as_ref(),
        &resources,
        &schemas,
        &resolver,
        auto_approve,
    )
    .await;

    release_lock(store.as_ref(), &lock).await;
    result
}

async fn apply_locked(
    provider: &MarmotProvider,
    store: &dyn StateStore,
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
    resolver: &ReferenceResolver,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = load_state(store).await?;
    let removed = refresh_state(provider, &mut state).await?;
    let plan = build_plan(resources, &state, schemas, resolver);

    if plan.is_empty() {
        if !removed.is_empty() {
            persist(store, &mut state).await?;
        }
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan, schemas, resolver);
    println!();

    if !auto_approve && !confirm("Do you want to perform these actions?")? {
        println!();
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let report = apply_plan(&plan, provider, store, &mut state, resolver).await?;
    finish("Apply", "changes applied", &report)
}

async fn run_destroy(cli: &Cli, auto_approve: bool) -> Result<(), String> {
    let config = ConfigFile::load(&cli.config)?;
    let resolver = ReferenceResolver::new()?;
    let provider = get_provider(&config)?;
    let store = open_state(&cli.state)?;
    let lock = acquire_lock(store.as_ref(), "destroy").await?;

    let result = destroy_locked(&provider, store.as_ref(), &resolver, auto_approve).await;

    release_lock(store.as_ref(), &lock).await;
    result
}

async fn destroy_locked(
    provider: &MarmotProvider,
    store: &dyn StateStore,
    resolver: &ReferenceResolver,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = load_state(store).await?;
    let removed = refresh_state(provider, &mut state).await?;

    if state.resources.is_empty() {
        if !removed.is_empty() {
            persist(store, &mut state).await?;
        }
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    let plan = destroy_plan(&state);

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!();
    println!("{}", "Destroying resources...".red().bold());
    println!();

    let report = apply_plan(&plan, provider, store, &mut state, resolver).await?;
    finish("Destroy", "resources destroyed", &report)
}

async fn run_refresh(cli: &Cli) -> Result<(), String> {
    let config = ConfigFile::load(&cli.config)?;
    let provider = get_provider(&config)?;
    let store = open_state(&cli.state)?;
    let lock = acquire_lock(store.as_ref(), "refresh").await?;

    let result = refresh_locked(&provider, store.as_ref()).await;

    release_lock(store.as_ref(), &lock).await;
    result
}

async fn refresh_locked(provider: &MarmotProvider, store: &dyn StateStore) -> Result<(), String> {
    let mut state = load_state(store).await?;
    let removed = refresh_state(provider, &mut state).await?;
    persist(store, &mut state).await?;

    println!(
        "{}",
        format!("✓ {} resources refreshed.", state.resources.len())
            .green()
            .bold()
    );
    for id in removed {
        println!(
            "  {} {} no longer exists; removed from state",
            "!".yellow().bold(),
            id
        );
    }
    Ok(())
}

async fn run_import(cli: &Cli, id: ResourceId, identifier: &str) -> Result<(), String> {
    let config = ConfigFile::load(&cli.config)?;
    let provider = get_provider(&config)?;
    let store = open_state(&cli.state)?;
    let lock = acquire_lock(store.as_ref(), "import").await?;

    let result = import_locked(&provider, store.as_ref(), &id, identifier).await;

    release_lock(store.as_ref(), &lock).await;
    result
}

async fn import_locked(
    provider: &MarmotProvider,
    store: &dyn StateStore,
    id: &ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let mut state = load_state(store).await?;
    if let Some(existing) = state.find_resource(id) {
        return Err(format!(
            "{} is already managed (id: {})",
            id,
            existing.identifier.as_deref().unwrap_or("unknown")
        ));
    }

    let imported = provider
        .import(id, identifier)
        .await
        .map_err(|e| format!("Failed to import {}: {}", id, Diagnostic::from(&e)))?;
    record(&mut state, &imported, provider.name());
    persist(store, &mut state).await?;

    println!(
        "{}",
        format!("✓ Imported {} (id: {})", id, identifier).green().bold()
    );
    Ok(())
}

async fn run_force_unlock(state_path: &Path, lock_id: &str) -> Result<(), String> {
    let store = open_state(state_path)?;
    store
        .force_unlock(lock_id)
        .await
        .map_err(|e| format!("Failed to unlock state: {}", e))?;
    println!("{}", format!("Lock {} has been released.", lock_id).green());
    Ok(())
}

fn get_provider(config: &ConfigFile) -> Result<MarmotProvider, String> {
    MarmotProvider::from_config(&config.provider_config()).map_err(|diagnostics| {
        let details: Vec<_> = diagnostics.iter().map(|d| d.to_string()).collect();
        details.join("\n  ")
    })
}

fn open_state(state_path: &Path) -> Result<Box<dyn StateStore>, String> {
    open_store(&StoreLocation::local(state_path))
        .map_err(|e| format!("Failed to open state: {}", e))
}

async fn load_state(store: &dyn StateStore) -> Result<StateFile, String> {
    store
        .load()
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| format!("Failed to read state: {}", e))
}

async fn acquire_lock(store: &dyn StateStore, operation: &str) -> Result<StateLock, String> {
    store.lock(operation).await.map_err(|e| {
        format!(
            "{}\nIf no other process is running, release it with `marmot force-unlock <lock-id>`.",
            e
        )
    })
}

async fn release_lock(store: &dyn StateStore, lock: &StateLock) {
    if let Err(e) = store.unlock(lock).await {
        eprintln!(
            "{} Failed to release lock {}: {}",
            "Warning:".yellow().bold(),
            lock.id,
            e
        );
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.bold());
    println!("  Type 'yes' to confirm.");
    println!();
    print!("  Enter a value: ");
    io::stdout()
        .flush()
        .map_err(|e| format!("Failed to flush stdout: {}", e))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| format!("Failed to read input: {}", e))?;

    Ok(input.trim() == "yes")
}

/// Print the outcome of a run; any failed effect makes the command fail
fn finish(operation: &str, noun: &str, report: &ApplyReport) -> Result<(), String> {
    println!();
    if report.failed == 0 {
        println!(
            "{}",
            format!("{} complete! {} {}.", operation, report.succeeded, noun)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "{} failed. {} succeeded, {} failed.",
            operation, report.succeeded, report.failed
        ))
    }
}
