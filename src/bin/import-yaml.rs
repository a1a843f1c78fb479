use clap::Parser;
use kitbox::config::{self, StoreKind};
use kitbox::import::{import_inventory, load_inventory_file};
use kitbox::Registry;
use std::path::PathBuf;
use std::sync::Arc;

// cargo run --bin import-yaml -- seed/kitbox.yaml --dry-run

#[derive(Debug, Parser)]
#[command(name = "import-yaml", version, about = "Import locations and gear from a YAML file")]
struct Args {
    /// YAML file with `locations` and `gear`
    file: PathBuf,

    /// DB URL (defaults to $DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Run the import against an in-memory store and only report the result
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut cfg = config::Config::from_env()?;
    if let Some(url) = args.database_url {
        cfg.database_url = url;
    }
    if args.dry_run {
        cfg.store = StoreKind::Memory;
    }

    let doc = load_inventory_file(&args.file)?;
    let registry = Registry::connect(Arc::new(cfg)).await?;

    let summary = import_inventory(&registry, &doc)
        .await
        .map_err(|e| anyhow::anyhow!("import failed: {e:#}"))?;

    println!("✓ Import complete from {}", args.file.display());
    println!("  locations: {}", summary.locations);
    println!("  gear:      {}", summary.gear);
    if args.dry_run {
        println!("  (dry run, nothing was written)");
    }

    Ok(())
}
