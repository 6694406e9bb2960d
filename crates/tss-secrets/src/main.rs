//! tss-secret - Declarative secrets against a secret server
//!
//! Commands:
//! - plan <CONFIG>: Show what apply would change
//! - apply <CONFIG>: Create, update or replace the secret
//! - refresh <CONFIG>: Pull the server's copy into stored state
//! - destroy <CONFIG>: Delete the secret
//! - field: Print one field of an existing secret
//! - password: Generate a password for a template field
//! - template: Manage templates on the local server
//! - folder: Manage folders on the local server

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tss_core::{Config, Paths};
use tss_secrets::datasource::{read_field, SecretLookup};
use tss_secrets::password::GeneratedPassword;
use tss_secrets::plan::{plan, Plan, PlanAction};
use tss_secrets::resource::{self, SecretConfig, SecretState};
use tss_secrets::store::Folder;
use tss_secrets::{FileServer, RemoteClient, RemoteError, Template};

#[derive(Parser)]
#[command(name = "tss-secret")]
#[command(about = "Keep declared secrets in step with a secret server")]
#[command(version)]
#[command(after_help = r#"CONFIGURATION:
    A secret is declared as JSON:
    {
      "name": "db01",
      "secret_template_id": 6001,
      "item": [
        { "field": "username", "value": "root" },
        { "field": "private-key", "value": "<base64>", "file_encoded": true }
      ]
    }

    Remove an item from the list to clear that field on the server.

ENVIRONMENT:
    TSS_SERVER_ROOT   Directory of the local secret server
    TSS_STATE_DIR     Directory for stored state
    TSS_LOG           Log filter when RUST_LOG is unset"#)]
struct Cli {
    /// Secret server directory (overrides configuration)
    #[arg(long, global = true)]
    server: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what apply would change
    Plan {
        /// Secret configuration file
        config: PathBuf,
        /// State file (default: <state dir>/<config name>.json)
        #[arg(long)]
        state: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create, update or replace the secret to match the configuration
    Apply {
        config: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Pull the server's copy of the secret into stored state
    Refresh {
        config: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Delete the secret from the server and forget its state
    Destroy {
        config: PathBuf,
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Print one field of an existing secret
    Field {
        /// Secret id (wins over --path)
        #[arg(long)]
        id: Option<i64>,
        /// Folder path and name, e.g. /infra/db/prod
        #[arg(long)]
        path: Option<String>,
        /// Field slug
        #[arg(long)]
        field: String,
        /// Don't print trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,
    },

    /// Generate a password for a template's password field
    Password {
        /// Template id
        #[arg(long)]
        template: i64,
        /// Password field slug
        #[arg(long)]
        field: String,
        /// Keep the generated password here and reuse it on later runs
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Manage templates on the local server
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Add a folder on the local server
    Folder {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        /// Parent folder id (omit for top level)
        #[arg(long)]
        parent: Option<i64>,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Add or replace a template from a JSON file
    Add { file: PathBuf },
    /// Show a template
    Show { id: i64 },
    /// List templates
    List {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = Paths::new();
    let config = Config::load(&paths)?;
    init_logging(config.log_filter());

    let server_root = cli.server.unwrap_or_else(|| config.server_root(&paths));
    let server = FileServer::new(&server_root);
    let state_dir = config.state_dir(&paths);

    match cli.command {
        Commands::Plan { config, state, json } => {
            let state = state_path(&state_dir, &config, state);
            cmd_plan(&server, &config, &state, json)
        }
        Commands::Apply { config, state } => {
            let state = state_path(&state_dir, &config, state);
            cmd_apply(&server, &config, &state)
        }
        Commands::Refresh { config, state } => {
            let state = state_path(&state_dir, &config, state);
            cmd_refresh(&server, &state)
        }
        Commands::Destroy { config, state } => {
            let state = state_path(&state_dir, &config, state);
            cmd_destroy(&server, &state)
        }
        Commands::Field {
            id,
            path,
            field,
            no_newline,
        } => cmd_field(&server, SecretLookup { id, path }, &field, no_newline),
        Commands::Password {
            template,
            field,
            state,
        } => cmd_password(&server, template, &field, state.as_deref()),
        Commands::Template { command } => match command {
            TemplateCommands::Add { file } => cmd_template_add(&server, &file),
            TemplateCommands::Show { id } => cmd_template_show(&server, id),
            TemplateCommands::List { json } => cmd_template_list(&server, json),
        },
        Commands::Folder { id, name, parent } => cmd_folder(&server, id, name, parent),
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Where state for a configuration file lives
fn state_path(state_dir: &Path, config: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let stem = config
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "secret".to_string());
        state_dir.join(format!("{}.json", stem))
    })
}

fn load_config(path: &Path) -> Result<SecretConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse configuration: {}", path.display()))
}

fn load_state(path: &Path) -> Result<Option<SecretState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state: {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state: {}", path.display()))?;
    Ok(Some(state))
}

fn save_state<T: serde::Serialize>(path: &Path, state: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(state)?)
        .with_context(|| format!("Failed to write state: {}", path.display()))
}

/// Stored state refreshed from the server, if there is any
fn refreshed_state(server: &FileServer, path: &Path) -> Result<Option<SecretState>> {
    match load_state(path)? {
        Some(state) => Ok(Some(
            resource::read(server, &state).context("Failed to refresh secret")?,
        )),
        None => Ok(None),
    }
}

fn print_plan(plan: &Plan) {
    match plan.action {
        PlanAction::NoOp => {
            println!("No changes. The secret matches the configuration.");
            return;
        }
        PlanAction::Create => {
            println!("The secret will be created.");
            return;
        }
        PlanAction::Replace => println!("The secret will be replaced:"),
        PlanAction::Update => println!("The secret will be updated in place:"),
    }

    println!();
    for change in &plan.changes {
        let (old, new) = if change.sensitive {
            ("(sensitive)", "(sensitive)")
        } else {
            (change.old.as_str(), change.new.as_str())
        };
        let marker = if change.forces_new { "  # forces replacement" } else { "" };
        println!("  ~ {}: {:?} -> {:?}{}", change.path, old, new, marker);
    }
}

/// Show what apply would change
fn cmd_plan(server: &FileServer, config: &Path, state: &Path, json: bool) -> Result<()> {
    let desired = load_config(config)?;
    let current = refreshed_state(server, state)?;
    let plan = plan(&desired, current.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

/// Bring the server in line with the configuration
fn cmd_apply(server: &FileServer, config: &Path, state_file: &Path) -> Result<()> {
    let desired = load_config(config)?;
    let current = refreshed_state(server, state_file)?;
    let plan = plan(&desired, current.as_ref());
    print_plan(&plan);

    let applied = match (plan.action, current) {
        (PlanAction::NoOp, Some(state)) => state,
        (PlanAction::Update, Some(state)) => resource::update(server, &desired, &state)
            .with_context(|| format!("Failed to update secret '{}'", desired.name))?,
        (PlanAction::Replace, Some(state)) => {
            resource::delete(server, &state)
                .with_context(|| format!("Failed to delete secret '{}'", state.secret.name))?;
            // The old id is gone; a failed create must leave a plain create behind
            fs::remove_file(state_file)
                .with_context(|| format!("Failed to remove state: {}", state_file.display()))?;
            resource::create(server, &desired)
                .with_context(|| format!("Failed to create secret '{}'", desired.name))?
        }
        _ => resource::create(server, &desired)
            .with_context(|| format!("Failed to create secret '{}'", desired.name))?,
    };

    save_state(state_file, &applied)?;
    if plan.has_changes() {
        println!();
        println!(
            "success: Secret '{}' applied (ID {})",
            applied.secret.name, applied.id
        );
    }
    Ok(())
}

/// Refresh stored state from the server
fn cmd_refresh(server: &FileServer, state_file: &Path) -> Result<()> {
    let Some(state) = refreshed_state(server, state_file)? else {
        bail!("No state at {}. Run apply first.", state_file.display());
    };

    save_state(state_file, &state)?;
    println!("success: Refreshed secret '{}' (ID {})", state.secret.name, state.id);
    Ok(())
}

/// Delete the secret and its state
fn cmd_destroy(server: &FileServer, state_file: &Path) -> Result<()> {
    let Some(state) = load_state(state_file)? else {
        println!("Nothing to destroy.");
        return Ok(());
    };

    resource::delete(server, &state)
        .with_context(|| format!("Failed to delete secret '{}'", state.secret.name))?;
    fs::remove_file(state_file)?;

    println!("success: Secret deleted: {}", state.secret.name);
    Ok(())
}

/// Print one field of a secret
fn cmd_field(server: &FileServer, lookup: SecretLookup, field: &str, no_newline: bool) -> Result<()> {
    let value = read_field(server, &lookup, field)?;

    if no_newline {
        print!("{}", value.value);
    } else {
        println!("{}", value.value);
    }
    Ok(())
}

/// Generate a password, reusing a stored one for the same field
fn cmd_password(
    server: &FileServer,
    template_id: i64,
    field: &str,
    state_file: Option<&Path>,
) -> Result<()> {
    if let Some(path) = state_file.filter(|p| p.exists()) {
        let content = fs::read_to_string(path)?;
        let stored: GeneratedPassword = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state: {}", path.display()))?;
        if stored.matches(template_id, field) {
            println!("{}", stored.value);
            return Ok(());
        }
    }

    let generated = GeneratedPassword::generate(server, template_id, field)?;
    if let Some(path) = state_file {
        save_state(path, &generated)?;
    }
    println!("{}", generated.value);
    Ok(())
}

fn cmd_template_add(server: &FileServer, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read template: {}", file.display()))?;
    let template: Template = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse template: {}", file.display()))?;
    template.validate()?;

    server.add_template(&template)?;
    println!("success: Template stored: {} ({})", template.id, template.name);
    Ok(())
}

fn cmd_template_show(server: &FileServer, id: i64) -> Result<()> {
    let template = match server.secret_template(id) {
        Ok(template) => template,
        Err(RemoteError::NotFound { .. }) => bail!("Template not found: {}", id),
        Err(e) => return Err(e.into()),
    };

    println!("{} ({})", template.name, template.id);
    println!();
    for field in &template.fields {
        let mut kinds = Vec::new();
        if field.is_file {
            kinds.push("file");
        }
        if field.is_password {
            kinds.push("password");
        }
        if field.is_notes {
            kinds.push("notes");
        }
        println!("  {:<24} id={:<6} {}", field.slug, field.field_id, kinds.join(","));
    }
    if let Some(mapping) = &template.ssh_key_mapping {
        println!();
        println!("  SSH keys: public={} private={}", mapping.public_key, mapping.private_key);
        if let Some(passphrase) = &mapping.passphrase {
            println!("  SSH passphrase: {}", passphrase);
        }
    }
    Ok(())
}

fn cmd_template_list(server: &FileServer, json: bool) -> Result<()> {
    let templates = server.templates()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!("No templates stored in {}", server.root().display());
        return Ok(());
    }

    for template in &templates {
        println!("  {:<8} {}", template.id, template.name);
    }
    Ok(())
}

fn cmd_folder(server: &FileServer, id: i64, name: String, parent_id: Option<i64>) -> Result<()> {
    server.add_folder(Folder {
        id,
        name: name.clone(),
        parent_id,
    })?;
    println!("success: Folder stored: {} ({})", name, id);
    Ok(())
}
