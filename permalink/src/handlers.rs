use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use permalink_core::catalog::CatalogSnapshot;
use permalink_core::config::{self, CONFIG_FILE_NAME, DATABASE_FILE_NAME, LOG_ENV_VAR, Settings};
use permalink_core::data::{Database, Resolution, RewriteFilter};
use permalink_core::reindex::{ReindexOptions, execute_reindex};
use permalink_core::report::{ReportFormat, generate_reindex_report, render_rewrites, save_report};
use permalink_engine::catalog::{CategoryId, DEFAULT_STORE_ID, EntityId, Scope, StoreId};
use permalink_engine::{
    CategoryUrlRewriteGenerator, EntityType, GeneratedRewrites, ProductUrlRewriteGenerator,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `-v` forces debug output for the workspace crates.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("permalink=debug,permalink_core=debug,permalink_engine=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn parse_report_format(value: &str) -> Result<ReportFormat> {
    ReportFormat::from_str(value).ok_or_else(|| anyhow!("Unknown format '{}'", value))
}

fn format_arg(args: &ArgMatches) -> Result<ReportFormat> {
    parse_report_format(
        args.get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("text"),
    )
}

fn load_settings() -> Result<Settings> {
    let path = config::config_path();
    debug!("Loading settings from {}", path.display());
    Settings::load(&path).with_context(|| format!("Failed to read settings {}", path.display()))
}

/// Opens the database configured in `settings`; it must have been created by `init`.
pub fn open_database(settings: &Settings) -> Result<Database> {
    if !Database::exists(&settings.database) {
        bail!(
            "No database at {}. Run `permalink init` first.",
            settings.database.display()
        );
    }
    Database::new(&settings.database)
        .with_context(|| format!("Failed to open database {}", settings.database.display()))
}

fn load_catalog(path: &Path) -> Result<CatalogSnapshot> {
    CatalogSnapshot::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

// Init

/// What [`initialize`] created under the config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub settings_path: PathBuf,
    pub database_path: PathBuf,
    pub database_replaced: bool,
}

/// Writes default settings and a fresh database into `config_dir`.
///
/// Existing files are only replaced when `force` is set.
pub fn initialize(config_dir: &Path, force: bool) -> Result<InitOutcome> {
    let settings_path = config_dir.join(CONFIG_FILE_NAME);
    let database_path = config_dir.join(DATABASE_FILE_NAME);

    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    if !settings_path.exists() || force {
        let settings = Settings {
            database: database_path.clone(),
            ..Settings::default()
        };
        settings.save(&settings_path)?;
    }

    let mut database_replaced = false;
    if Database::exists(&database_path) && force {
        Database::drop(&database_path)?;
        database_replaced = true;
    }
    Database::new(&database_path)?;

    Ok(InitOutcome {
        settings_path,
        database_path,
        database_replaced,
    })
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  PERMALINK INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or("~/.config/permalink/");
    let config_dir = config::expand_path(dir);
    let mut force = args.get_flag("force");

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let settings_path = config_dir.join(CONFIG_FILE_NAME);
    let database_path = config_dir.join(DATABASE_FILE_NAME);
    if !force && (settings_path.exists() || database_path.exists()) {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Existing installation found:");
        for path in [&settings_path, &database_path] {
            if path.exists() {
                println!(
                    "  {} {}",
                    "•".yellow(),
                    path.display().to_string().bright_white()
                );
            }
        }
        println!();
        println!(
            "{}",
            "Overwriting resets settings and removes every stored rewrite.".yellow()
        );

        let response = print_prompt("Do you want to overwrite it? [y/N]:")?;
        println!();
        if response == "y" || response == "yes" {
            force = true;
        } else {
            println!("{} Keeping existing files", "→".blue());
        }
    }

    let outcome = initialize(&config_dir, force)?;
    if outcome.database_replaced {
        println!("{} Existing database removed", "✓".green().bold());
    }

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Settings: {}",
        "✓".green().bold(),
        outcome.settings_path.display().to_string().bright_white()
    );
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        outcome.database_path.display().to_string().bright_white()
    );
    if outcome.settings_path != config::config_path() {
        println!(
            "{} Set {}={} to use this location",
            "ℹ".blue(),
            config::CONFIG_ENV_VAR,
            outcome.settings_path.display()
        );
    }
    println!();
    Ok(())
}

// Generate

/// Which entity a dry run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateTarget {
    Product(EntityId),
    Category(CategoryId),
}

/// Runs the generators against a snapshot without any storage.
pub fn generate_for_catalog(
    catalog: &CatalogSnapshot,
    target: GenerateTarget,
    store: Option<StoreId>,
    root_category_id: Option<CategoryId>,
    settings: &Settings,
) -> Result<GeneratedRewrites> {
    let scopes = Arc::new(catalog.scope_generator(settings.rewrite.clone()));
    let scope = store.map(Scope::for_store).unwrap_or(Scope::Global);

    let generated = match target {
        GenerateTarget::Product(id) => {
            let product = catalog
                .product(id)
                .ok_or_else(|| anyhow!("Product {} is not in the catalog", id))?;
            match scope {
                Scope::Global => {
                    ProductUrlRewriteGenerator::new(scopes).generate(product, root_category_id)?
                }
                Scope::Store(_) => scopes.generate(product, scope, root_category_id)?,
            }
        }
        GenerateTarget::Category(id) => {
            let category = catalog
                .category(id)
                .ok_or_else(|| anyhow!("Category {} is not in the catalog", id))?;
            match scope {
                Scope::Global => CategoryUrlRewriteGenerator::new(scopes).generate(category)?,
                Scope::Store(_) => scopes.generate_category(category, scope)?,
            }
        }
    };

    Ok(generated)
}

pub fn handle_generate(args: &ArgMatches) -> Result<()> {
    let settings = load_settings()?;
    let format = format_arg(args)?;
    let catalog_path = args
        .get_one::<PathBuf>("catalog")
        .ok_or_else(|| anyhow!("--catalog is required"))?;
    let catalog = load_catalog(catalog_path)?;

    let target = match (
        args.get_one::<u64>("product"),
        args.get_one::<u64>("category"),
    ) {
        (Some(id), _) => GenerateTarget::Product(*id),
        (None, Some(id)) => GenerateTarget::Category(*id),
        (None, None) => bail!("Either --product or --category must be provided"),
    };
    let store = args.get_one::<u32>("store").copied();
    let root = args.get_one::<u64>("root-category").copied();

    let generated = generate_for_catalog(&catalog, target, store, root, &settings)?;

    print!("{}", render_rewrites(generated.rewrites.as_slice(), format)?);
    for warning in &generated.warnings {
        eprintln!("{} {}", "⚠".yellow().bold(), warning);
    }
    Ok(())
}

// Reindex

pub async fn handle_reindex(args: &ArgMatches, quiet: bool) -> Result<()> {
    let settings = load_settings()?;
    let format = format_arg(args)?;
    let catalog_path = args
        .get_one::<PathBuf>("catalog")
        .ok_or_else(|| anyhow!("--catalog is required"))?;
    let catalog = load_catalog(catalog_path)?;
    let db = open_database(&settings)?;

    if !quiet {
        println!(
            "\n🔗 Reindexing {} categories and {} products",
            catalog.categories.len(),
            catalog.products.len()
        );
        println!("Database: {}\n", settings.database.display());
    }

    let options = ReindexOptions {
        catalog,
        catalog_label: catalog_path.display().to_string(),
        rewrite: settings.rewrite.clone(),
        root_category_id: args.get_one::<u64>("root-category").copied(),
        products_only: args.get_flag("products-only"),
        queue_capacity: settings.queue_capacity,
        show_progress_bars: !quiet,
    };

    let progress_callback = Arc::new(|msg: String| {
        eprintln!("{}", msg);
    });

    let (_db, summary) = execute_reindex(db, options, Some(progress_callback))
        .await
        .context("Reindex failed")?;

    let report = generate_reindex_report(&summary, format)?;
    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}

// List

pub fn build_filter(args: &ArgMatches) -> RewriteFilter {
    RewriteFilter {
        store_id: args.get_one::<u32>("store").copied(),
        entity_type: args
            .get_one::<String>("entity-type")
            .and_then(|t| EntityType::parse(t)),
        entity_id: args.get_one::<u64>("entity-id").copied(),
        redirects_only: args.get_flag("redirects"),
    }
}

pub fn handle_list(args: &ArgMatches) -> Result<()> {
    let settings = load_settings()?;
    let format = format_arg(args)?;
    let db = open_database(&settings)?;

    let rewrites = db.list_rewrites(&build_filter(args))?;
    print!("{}", render_rewrites(&rewrites, format)?);
    Ok(())
}

// Resolve

pub fn format_resolution(resolution: &Resolution) -> String {
    let mut out = String::new();
    for (i, hop) in resolution.hops.iter().enumerate() {
        let marker = if hop.redirect_type.is_redirect() {
            format!("{}", hop.redirect_type.code()).yellow()
        } else {
            "internal".green()
        };
        out.push_str(&format!(
            "  {}. [store {}] {} → {} ({}, {} {})\n",
            i + 1,
            hop.store_id,
            hop.request_path.bold(),
            hop.target_path,
            marker,
            hop.entity_type,
            hop.entity_id
        ));
    }
    if resolution.loop_detected {
        out.push_str(&format!("  {} redirect loop detected\n", "✗".red().bold()));
    }
    out.push_str(&format!(
        "{} {}\n",
        "Target:".blue(),
        resolution.target_path.bright_white()
    ));
    out
}

/// Resolves `path` in `store`, or in the global store when none is given.
pub fn resolve_path(db: &Database, path: &str, store: Option<StoreId>) -> Result<Resolution> {
    let store = store.unwrap_or(DEFAULT_STORE_ID);
    let resolution = db
        .resolve(path, store)?
        .ok_or_else(|| anyhow!("No rewrite for '{}' in store {}", path, store))?;
    Ok(resolution)
}

pub fn handle_resolve(args: &ArgMatches) -> Result<()> {
    let settings = load_settings()?;
    let db = open_database(&settings)?;
    let path = args
        .get_one::<String>("PATH")
        .ok_or_else(|| anyhow!("PATH is required"))?;

    let resolution = resolve_path(&db, path, args.get_one::<u32>("store").copied())?;
    print!("{}", format_resolution(&resolution));
    if resolution.loop_detected {
        bail!(
            "Redirect loop for '{}' in store {}",
            path,
            resolution.store_id
        );
    }
    Ok(())
}
