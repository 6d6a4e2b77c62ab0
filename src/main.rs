use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};

use marginalia::anchor::Namespace;
use marginalia::document::canonical_identity;
use marginalia::storage::DiskStore;
use marginalia::store::AnchorStore;

#[derive(Parser)]
#[command(name = "marginalia", about = "Inspect stored document annotations")]
struct Cli {
    /// Data directory override (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored annotations for a document
    List {
        document: PathBuf,
        /// Restrict to one kind (highlights, marks, comments,
        /// sticky_notes, drawings)
        #[arg(long)]
        kind: Option<String>,
    },
    /// Dump a document's stored annotations as JSON
    Export {
        document: PathBuf,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove every stored annotation of one kind
    Clear {
        document: PathBuf,
        #[arg(long)]
        kind: String,
        /// Required confirmation for the destructive clear
        #[arg(long)]
        yes: bool,
    },
}

fn parse_kind(input: &str) -> Result<Namespace> {
    for ns in Namespace::ALL {
        if ns.key_prefix() == input {
            return Ok(ns);
        }
    }
    bail!(
        "unknown kind {input:?}; expected one of: {}",
        Namespace::ALL.map(|ns| ns.key_prefix()).join(", ")
    )
}

fn open_store(document: &Path, data_dir: Option<PathBuf>) -> Result<AnchorStore> {
    let storage = match data_dir {
        Some(dir) => DiskStore::open(dir)?,
        None => DiskStore::open_default()?,
    };
    let identity = canonical_identity(document);
    Ok(AnchorStore::open(identity, Box::new(storage)))
}

fn main() -> Result<()> {
    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create("marginalia.log")?,
    )?;

    marginalia::config::load_settings();

    let cli = Cli::parse();

    match cli.command {
        Command::List { document, kind } => {
            let store = open_store(&document, cli.data_dir)?;
            let kinds: Vec<Namespace> = match kind {
                Some(kind) => vec![parse_kind(&kind)?],
                None => Namespace::ALL.to_vec(),
            };
            for ns in kinds {
                let summaries = store.list_summaries(ns);
                if summaries.is_empty() {
                    continue;
                }
                println!("{ns} ({}):", summaries.len());
                for summary in summaries {
                    println!(
                        "  [{}] p.{} {} {}",
                        summary.index, summary.page, summary.color, summary.text
                    );
                }
            }
        }
        Command::Export { document, out } => {
            let store = open_store(&document, cli.data_dir)?;
            let mut export = serde_json::Map::new();
            for ns in Namespace::ALL {
                export.insert(
                    ns.key_prefix().to_string(),
                    serde_json::to_value(store.anchors(ns))?,
                );
            }
            let json = serde_json::to_string_pretty(&export)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!("Exported annotations for {document:?} to {path:?}");
                }
                None => println!("{json}"),
            }
        }
        Command::Clear { document, kind, yes } => {
            let ns = parse_kind(&kind)?;
            if !yes {
                bail!("refusing to clear {ns} without --yes");
            }
            let mut store = open_store(&document, cli.data_dir)?;
            let removed = store.clear_all(ns);
            println!("Removed {removed} {ns}");
        }
    }

    Ok(())
}
