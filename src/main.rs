use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use docshape::{CrossRef, Document, LookupCache, ReshapeOptions, Reshaper, Resolvers};

#[derive(Parser)]
#[command(name = "docshape", about = "Infer structure in decoded scholarly documents")]
struct Cli {
    /// Document JSON to reshape ("-" reads stdin)
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Link numeric [N] markers to references and group citations
    #[arg(long, env = "DOCSHAPE_RESHAPE_CITATIONS")]
    reshape_citations: bool,

    /// Bibliography lookups in flight at once
    #[arg(long)]
    max_concurrent_lookups: Option<usize>,

    /// Options JSON file; command-line flags take precedence
    #[arg(long)]
    options: Option<PathBuf>,

    /// Skip network lookups; bibliography entries stay as text
    #[arg(long)]
    offline: bool,

    /// Do not read or write the lookup cache
    #[arg(long)]
    no_cache: bool,

    /// Contact address sent to CrossRef for the polite pool
    #[arg(long, env = "CROSSREF_MAILTO")]
    mailto: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let options = load_options(&cli)?;
    let resolvers = build_resolvers(&cli);

    let document = read_document(&cli.file)?;
    let reshaped = Reshaper::new(resolvers, options)
        .reshape(document)
        .context("Reshape failed")?;
    print_output(&reshaped, cli.pretty)
}

fn load_options(cli: &Cli) -> Result<ReshapeOptions> {
    let mut options = match &cli.options {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options: {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Invalid options file: {}", path.display()))?
        }
        None => ReshapeOptions::default(),
    };
    if cli.reshape_citations {
        options.reshape_citations = true;
    }
    if let Some(n) = cli.max_concurrent_lookups {
        options.max_concurrent_lookups = n;
    }
    Ok(options)
}

fn build_resolvers(cli: &Cli) -> Resolvers {
    if cli.offline {
        return Resolvers::offline();
    }
    let mut crossref = CrossRef::new(cli.mailto.clone());
    if !cli.no_cache {
        match LookupCache::open() {
            Ok(cache) => crossref = crossref.with_cache(cache),
            Err(e) => log::warn!("Lookup cache unavailable, continuing without it: {e}"),
        }
    }
    Resolvers::with_backend(Arc::new(crossref))
}

fn read_document(path: &PathBuf) -> Result<Document> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?
    };
    serde_json::from_str(&json).context("Input is not a valid document")
}

fn print_output(document: &Document, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    println!("{json}");
    Ok(())
}
