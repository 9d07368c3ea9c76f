use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use patternlens::detect::{CancellationToken, DetectedPattern, DetectorCache, EngineConfig, scan};
use patternlens::semantic::Compilation;
use patternlens::syntax::SyntaxTree;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source files to scan
    #[arg(value_name = "FILE", required = true)]
    files: Vec<String>,

    /// Metadata name of the pattern engine type
    #[arg(long, value_name = "NAME", default_value = "System.Text.RegularExpressions.Regex")]
    engine_type: String,

    /// Simple name of the options flag type
    #[arg(long, value_name = "NAME", default_value = "RegexOptions")]
    options_type: String,

    /// Do not add the bundled regex engine declarations
    #[arg(long)]
    no_prelude: bool,

    /// Log detector activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(path: &str, tree: &SyntaxTree, pattern: &DetectedPattern) {
    let position = tree.text().line_position(pattern.span.start);
    match &pattern.tree {
        Ok(parsed) => {
            println!(
                "{path}:{position}: pattern \"{}\" [{}]",
                parsed.text().escape_debug(),
                pattern.options
            );
            for diagnostic in parsed.diagnostics() {
                let at = tree.text().line_position(parsed.source_span(&diagnostic.span).start);
                println!("    {path}:{at}: {}", diagnostic.kind);
            }
        }
        Err(err) => println!("{path}:{position}: pattern [{}]: {err}", pattern.options),
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mut failed = false;
    let mut trees = Vec::new();
    for path in &args.files {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        match SyntaxTree::parse_with_path(Some(path.clone()), text) {
            Ok(tree) => trees.push(tree),
            Err(err) => {
                eprintln!("{path}:{err}");
                failed = true;
            }
        }
    }
    let user_trees = trees.len();

    let compilation = if args.no_prelude {
        Compilation::new(trees)
    } else {
        Compilation::with_prelude(trees).context("bundled prelude failed to parse")?
    };
    let config = EngineConfig {
        engine_type: args.engine_type,
        options_type: args.options_type,
        ..EngineConfig::default()
    };
    let cache = DetectorCache::new(config).context("invalid engine configuration")?;
    let cancel = CancellationToken::new();

    for index in 0..user_trees {
        let model = compilation.semantic_model(index);
        let tree = model.tree();
        let path = tree.path().unwrap_or("<input>");
        if cache.get(&model).is_none() {
            warn!("{path}: engine type {} is not declared", cache.config().engine_type);
            continue;
        }
        for pattern in scan(&cache, &model, &cancel)? {
            report(path, tree, &pattern);
        }
        cache.evict(&model);
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run(args)
}
