//! Command-line interface for docbridge
//!
//! # Usage Examples
//!
//! ```bash
//! # Show how stored documents look to the query engine
//! mongoexport --db shop --collection orders | docbridge decode
//!
//! # Show the documents a JSON payload would be stored as
//! echo '{"sku": "A-1", "qty": 12345678901}' | docbridge encode
//!
//! # Query and ping a connection from the config file
//! docbridge --config docbridge.toml find --connection local --collection orders \
//!   --filter '{"status": "open"}' --limit 10
//! docbridge --config docbridge.toml ping --connection local
//! ```

use anyhow::Context;
use bson::Bson;
use clap::{Parser, Subcommand};
use docbridge::mongodb::MongoStore;
use docbridge::{
    ConversionOpts, DocbridgeConfig, FindArgs, Handle, HandleRegistry, OperationGlue,
};
use docbridge_core::{sequence_from_json, AtomicValue, MapValue, Sequence};
use document_types::{bson_to_doc, decode, doc_to_bson, encode, ConversionOptions};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docbridge")]
#[command(about = "Convert between query-engine sequences and MongoDB documents")]
#[command(long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "DOCBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    conversion: ConversionOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode extended-JSON documents (one per line) to host sequences
    Decode {
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Encode JSON values to documents, printed as relaxed extended JSON
    Encode {
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Find documents through a configured connection
    Find {
        /// Connection name from the config file
        #[arg(long)]
        connection: String,

        #[arg(long)]
        collection: String,

        /// Filter as a JSON object
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Ping a configured connection
    Ping {
        /// Connection name from the config file
        #[arg(long)]
        connection: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DocbridgeConfig::load(cli.config.as_deref()).with_context(|| {
        format!("Failed to load configuration from {:?}", cli.config)
    })?;
    config.apply_overrides(&cli.conversion)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = config.conversion_options();
    match cli.command {
        Commands::Decode { input } => decode_documents(input.as_deref(), &options),
        Commands::Encode { input } => encode_values(input.as_deref(), &options),
        Commands::Find {
            connection,
            collection,
            filter,
            limit,
        } => {
            let (glue, handle) = connect(&config, &connection, options).await?;
            let filter = match filter {
                Some(text) => {
                    let json: serde_json::Value =
                        serde_json::from_str(&text).context("Failed to parse --filter")?;
                    sequence_from_json(&json)
                }
                None => Sequence::empty(),
            };
            let args = FindArgs {
                limit,
                ..FindArgs::default()
            };
            let found = glue.find(&handle, &collection, &filter, &args).await?;
            for item in &found {
                println!("{item}");
            }
            tracing::info!("Found {} documents in '{}'", found.len(), collection);
            Ok(())
        }
        Commands::Ping { connection } => {
            let (glue, handle) = connect(&config, &connection, options).await?;
            let mut command = MapValue::new();
            command.insert("ping", Sequence::singleton(AtomicValue::Int(1)));
            let reply = glue.run_command(&handle, &Sequence::singleton(command)).await?;
            println!("{reply}");
            Ok(())
        }
    }
}

fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open input file {path:?}"))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    })
}

fn decode_documents(input: Option<&Path>, options: &ConversionOptions) -> anyhow::Result<()> {
    for (index, line) in open_input(input)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let json: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {}", index + 1))?;
        let bson = Bson::try_from(json)
            .with_context(|| format!("Invalid extended JSON on line {}", index + 1))?;
        let value = bson_to_doc(&bson, options)
            .with_context(|| format!("Failed to convert line {}", index + 1))?;
        let sequence = decode(&value, options)
            .with_context(|| format!("Failed to decode line {}", index + 1))?;
        println!("{sequence}");
    }
    Ok(())
}

fn encode_values(input: Option<&Path>, options: &ConversionOptions) -> anyhow::Result<()> {
    let mut text = String::new();
    open_input(input)?.read_to_string(&mut text)?;
    let stream = serde_json::Deserializer::from_str(&text).into_iter::<serde_json::Value>();
    for (index, json) in stream.enumerate() {
        let json = json.with_context(|| format!("Invalid JSON value #{}", index + 1))?;
        let value = encode(&sequence_from_json(&json), options)
            .with_context(|| format!("Failed to encode value #{}", index + 1))?;
        let bson = doc_to_bson(&value, options)
            .with_context(|| format!("Failed to convert value #{}", index + 1))?;
        println!("{}", bson.into_relaxed_extjson());
    }
    Ok(())
}

async fn connect(
    config: &DocbridgeConfig,
    name: &str,
    options: ConversionOptions,
) -> anyhow::Result<(OperationGlue, Handle)> {
    let connection = config
        .connection(name)
        .ok_or_else(|| anyhow::anyhow!("No connection named '{name}' in configuration"))?;
    let store = MongoStore::connect(&connection.uri, &connection.database)
        .await
        .with_context(|| format!("Failed to connect to '{name}'"))?;

    let registry = Arc::new(HandleRegistry::new());
    let handle = registry.register(name, Arc::new(store));
    Ok((OperationGlue::new(registry, options), handle))
}
