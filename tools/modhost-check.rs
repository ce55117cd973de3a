//! Check module folders without starting anything
//!
//! Discovers and resolves the modules under one or more module roots and
//! prints the load plan together with any descriptors that were skipped.
//! Exits non-zero when discovery or resolution fails.

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

use modhost::config::HostConfig;
use modhost::module::{BootPlan, ModuleManager, StartupRegistry};
use modhost::utils::init_logging;

#[derive(Parser, Debug)]
#[command(name = "modhost-check", about = "Discover and resolve modules without starting them")]
struct Args {
    /// Module root directories (defaults to `module_dirs` from the config)
    dirs: Vec<PathBuf>,

    /// Host configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log filter (e.g. "debug", "modhost=trace"); RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_filter: String,

    /// Treat any descriptor parse failure as fatal
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(Some(&args.log_filter));

    let mut config = match &args.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if args.strict {
        config.fail_on_parse_error = true;
    }
    let roots = if args.dirs.is_empty() {
        config.module_dirs.clone()
    } else {
        args.dirs.clone()
    };

    let manager: ModuleManager<()> = ModuleManager::new(StartupRegistry::new()).with_config(config);
    let BootPlan {
        plan,
        parse_failures,
    } = manager.plan(&roots).await?;

    if args.json {
        let modules: Vec<_> = plan
            .order()
            .iter()
            .map(|definition| {
                json!({
                    "id": definition.id().to_string(),
                    "entry_point": definition.entry(),
                    "source_dir": definition.source_dir(),
                    "depends_on": plan
                        .dependencies_of(definition.id())
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        let output = json!({
            "load_order": modules,
            "parse_failures": parse_failures,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Load order ({} modules):", plan.len());
    for (index, definition) in plan.order().iter().enumerate() {
        let deps = plan.dependencies_of(definition.id());
        if deps.is_empty() {
            println!("  {:>3}. {}", index + 1, definition.id());
        } else {
            let deps: Vec<String> = deps.iter().map(ToString::to_string).collect();
            println!(
                "  {:>3}. {} (after {})",
                index + 1,
                definition.id(),
                deps.join(", ")
            );
        }
    }

    if !parse_failures.is_empty() {
        println!();
        println!("Skipped descriptors ({}):", parse_failures.len());
        for failure in &parse_failures {
            println!("  - {}", failure);
        }
    }

    Ok(())
}
