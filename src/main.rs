use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ctxmap_core::{to_json, MapConfig, OutputFormat};
use ctxmap_engine::language::LanguageRegistry;
use ctxmap_engine::walker::FileReport;
use ctxmap_engine::{FindRequest, MapRequest, RepoMapper};

const CONFIG_FILE: &str = ".ctxmap.toml";

#[derive(Parser)]
#[command(
    name = "ctxmap",
    version,
    about = "Rank-ordered repository maps for size-constrained consumers",
    long_about = "ctxmap parses a source tree with tree-sitter, ranks files with personalized\n\
                   PageRank, and prints the most important definitions within a token budget.\n\n\
                   Examples:\n  \
                     ctxmap map --chat src/main.rs        Map centered on a file in focus\n  \
                     ctxmap map --max-tokens 2048 src     Map a subtree with a smaller budget\n  \
                     ctxmap find User --references        Show definitions and uses of a symbol\n  \
                     ctxmap init                          Write a commented .ctxmap.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Repository root (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Path to configuration file (default: <root>/.ctxmap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Rendered map or navigation summary (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Log engine progress at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print a ranked, token-budgeted map of the repository
    #[command(long_about = "Print a ranked, token-budgeted map of the repository.\n\n\
        Files in focus (--chat) and mentioned identifiers (--mention) are boosted.\n\n\
        Examples:\n  ctxmap map\n  ctxmap map --chat app.py --mention User --max-tokens 1024")]
    Map {
        /// Files or directories to scan (default: the whole root)
        paths: Vec<PathBuf>,

        /// Files currently in focus, relative to the root
        #[arg(long = "chat")]
        chat: Vec<String>,

        /// Identifiers to boost
        #[arg(long = "mention")]
        mention: Vec<String>,

        /// Additional exclusion patterns
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Token budget (default: map.max_map_tokens)
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Print skipped files and the reason to stderr
        #[arg(long)]
        report: bool,
    },
    /// Locate the definitions and references of a symbol
    #[command(long_about = "Locate the definitions and references of a symbol.\n\n\
        Several symbols can be given separated by commas.\n\n\
        Examples:\n  ctxmap find User\n  ctxmap find User,format_name --references --source-file main.py")]
    Find {
        /// Exact symbol name, or a comma-separated list
        symbol: String,

        /// Files or directories to scan (default: the whole root)
        paths: Vec<PathBuf>,

        /// File in focus; nearby results rank first
        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Additional exclusion patterns
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Also show references
        #[arg(long)]
        references: bool,
    },
    /// Create a default .ctxmap.toml configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# ctxmap configuration

[map]
# Token budget when --max-tokens is not given.
# max_map_tokens = 8192
# Files larger than this many bytes are skipped.
# max_file_size = 1048576
# respect_gitignore = false
# Extra exclusions, matched against every path component.
# excludes = ["fixtures", "*.generated.*"]

[ranking]
# damping = 0.85
# chat_seed_weight = 100.0
# mention_boost = 10.0
# chat_file_boost = 20.0
# max_iterations = 100
# tolerance = 1e-6

[navigation]
# Context lines around definitions and references in `ctxmap find`.
# definition_pad = 8
# reference_pad = 4
# snippets = true
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOutput<'a> {
    map: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a FileReport>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Init = cli.command {
        return run_init(&cli.root);
    }

    let config = load_config(&cli.root, cli.config.as_deref())?;
    tracing::debug!(root = %cli.root.display(), format = %cli.format, "starting");

    let registry = Arc::new(LanguageRegistry::with_defaults());
    let mapper = RepoMapper::new(&cli.root, registry)?.with_config(config)?;

    match cli.command {
        Command::Map {
            paths,
            chat,
            mention,
            exclude,
            max_tokens,
            report,
        } => {
            let request = MapRequest {
                paths,
                chat_fnames: chat.into_iter().collect(),
                mentioned_idents: mention.into_iter().collect(),
                excludes: exclude,
                max_tokens,
            };
            let (map, file_report) = mapper.get_repo_map(&request)?;

            match cli.format {
                OutputFormat::Json => {
                    let output = MapOutput {
                        map: &map,
                        report: report.then_some(&file_report),
                    };
                    println!("{}", to_json(&output)?);
                }
                OutputFormat::Text => {
                    println!("{map}");
                    if report {
                        print_report(&file_report);
                    }
                }
            }
        }
        Command::Find {
            symbol,
            paths,
            source_file,
            exclude,
            references,
        } => {
            let names: Vec<String> = symbol
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                miette::bail!("no symbol name given");
            }

            let request = FindRequest {
                paths,
                source_file,
                excludes: exclude,
            };
            if let [name] = names.as_slice() {
                let nav = mapper.find_symbol(name, &request)?;
                match cli.format {
                    OutputFormat::Json => {
                        println!("{}", to_json(&nav)?);
                    }
                    OutputFormat::Text => println!("{}", nav.render(references)),
                }
            } else {
                let result = mapper.find_symbols(&names, &request)?;
                match cli.format {
                    OutputFormat::Json => {
                        println!("{}", to_json(&result)?);
                    }
                    OutputFormat::Text => println!("{}", result.render(references)),
                }
            }
        }
        Command::Init => {}
    }

    Ok(())
}

fn load_config(root: &Path, explicit: Option<&Path>) -> Result<MapConfig> {
    let config = match explicit {
        Some(path) => MapConfig::from_file(path)?,
        None => {
            let default_path = root.join(CONFIG_FILE);
            if default_path.exists() {
                MapConfig::from_file(&default_path)?
            } else {
                MapConfig::default()
            }
        }
    };
    Ok(config)
}

fn run_init(root: &Path) -> Result<()> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        miette::bail!("{} already exists", path.display());
    }
    std::fs::write(&path, DEFAULT_CONFIG).into_diagnostic()?;
    println!("Created {} with default configuration", path.display());
    Ok(())
}

fn print_report(report: &FileReport) {
    eprintln!(
        "{} files considered, {} definitions, {} references",
        report.total_files_considered, report.definition_matches, report.reference_matches
    );
    if report.excluded.is_empty() {
        return;
    }
    eprintln!("Excluded:");
    for (file, reason) in &report.excluded {
        eprintln!("  {file}: {reason}");
    }
}
