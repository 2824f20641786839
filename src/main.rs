use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cityquery::config::{CliOverrides, CompilerConfig};
use cityquery::dialect::DialectKind;
use cityquery::{Query, SchemaMapping};

/// CityQuery - compile a city model query into SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Schema mapping (YAML)
    #[arg(long)]
    mapping: PathBuf,

    /// Query to compile (YAML)
    #[arg(long)]
    query: PathBuf,

    /// Compiler configuration (YAML); environment variables are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target dialect (postgis, oracle)
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// SRID of the database SRS
    #[arg(long)]
    srid: Option<i32>,

    /// Print the SQL text only, without parameters
    #[arg(long)]
    sql_only: bool,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        CliOverrides {
            dialect: cli.dialect,
            srid: cli.srid,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // .env values are picked up like regular environment variables
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => CompilerConfig::from_env().context("Invalid environment configuration")?,
    };
    config
        .merge_cli(CliOverrides::from(&cli))
        .context("Invalid command line configuration")?;

    let mapping = SchemaMapping::from_yaml_file(&cli.mapping)
        .with_context(|| format!("Failed to load schema mapping {}", cli.mapping.display()))?;
    log::info!(
        "Loaded schema mapping with {} feature types",
        mapping.feature_types().len()
    );

    let query = Query::from_yaml_file(&cli.query)
        .with_context(|| format!("Failed to read query {}", cli.query.display()))?;

    let statement = cityquery::compile(&mapping, &query, &config)?;
    log::info!(
        "Compiled query for {} ({} parameters)",
        config.dialect,
        statement.parameters.len()
    );

    if cli.sql_only {
        println!("{}", statement.sql);
    } else {
        println!("{}", serde_json::to_string_pretty(&statement)?);
    }
    Ok(())
}
