//! node-composer CLI
//!
//! Usage:
//!   node-composer [OPTIONS] [PAGE]
//!
//! Options:
//!   -s, --script <FILE>  Composition script to run against the page (TOML format)
//!   -c, --config <FILE>  Settings file (TOML format)
//!       --compact        Print the resulting tree on one line
//!   -d, --debug          Debug logging
//!   -g, --grammar        Show markup, query and script reference
//!   -h, --help           Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use node_composer::{parse, Engine, HookTable, MemorySink, Script, Settings};

#[derive(Parser, Debug)]
#[command(name = "node-composer")]
#[command(about = "Compose and tear down view fragments against a host tree")]
struct Cli {
    /// Page file with templates and the initial tree (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Composition script to run against the page (TOML format)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Settings file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the resulting tree on one line
    #[arg(long)]
    compact: bool,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    /// Show markup, query and script reference
    #[arg(short, long)]
    grammar: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("node_composer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("node_composer=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!("node-composer starting with args: {:?}", cli);

    if cli.grammar {
        print_grammar();
        return ExitCode::SUCCESS;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return ExitCode::SUCCESS;
    }

    let mut settings = match &cli.config {
        Some(path) => match Settings::from_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };
    if cli.compact {
        settings.markup.pretty_print = false;
    }

    let script = match &cli.script {
        Some(path) => match Script::from_file(path) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("Error loading script '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    let page = match parse(&source) {
        Ok(page) => page,
        Err(errors) => {
            for error in &errors {
                eprint!("{}", error.format(&source, &filename));
            }
            return ExitCode::FAILURE;
        }
    };

    // File-backed templates are relative to the page
    let base_path = cli
        .input
        .as_ref()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or_default();
    let diagnostics = MemorySink::new();
    let mut engine = Engine::default()
        .with_config(settings.engine.clone())
        .with_sink(LoggingSink::new(diagnostics.clone()))
        .with_base_path(base_path);

    if let Err(e) = engine.load_page(&page) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(script) = script {
        let report = script.run(&mut engine, &HookTable::default());
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            diagnostics = diagnostics.len(),
            "script finished"
        );
    }

    print!("{}", engine.render(&settings.markup));
    if !settings.markup.pretty_print {
        println!();
    }
    ExitCode::SUCCESS
}

/// Forwards diagnostics to `tracing` and keeps a copy for the summary
struct LoggingSink {
    memory: MemorySink,
    tracing: node_composer::TracingSink,
}

impl LoggingSink {
    fn new(memory: MemorySink) -> Self {
        Self {
            memory,
            tracing: node_composer::TracingSink,
        }
    }
}

impl node_composer::DiagnosticSink for LoggingSink {
    fn report(&mut self, diagnostic: &node_composer::Diagnostic, mode: node_composer::VocalMode) {
        self.tracing.report(diagnostic, mode);
        self.memory.report(diagnostic, mode);
    }
}

fn print_intro() {
    println!(
        r#"node-composer - compose and tear down view fragments against a host tree

USAGE:
    node-composer [OPTIONS] [PAGE]
    echo '<markup>' | node-composer

OPTIONS:
    -s, --script     Composition script (TOML file)
    -c, --config     Settings (TOML file)
    --compact        Print the resulting tree on one line
    -d, --debug      Debug logging
    -g, --grammar    Show markup, query and script reference
    -h, --help       Print help

QUICK START:
    echo 'template "row-tpl" {{ li.row }}  ul.list' | node-composer

Run --grammar for the syntax reference."#
    );
}

fn print_grammar() {
    println!(
        r##"NODE COMPOSER REFERENCE
=======================

MARKUP
------
tag#id.class [attr: "value", flag] {{ children }}
"text"                              Text node (\" \\ \n \t escapes)
// line comment, /* block comment */

TEMPLATES
---------
template "row-tpl" {{ li.row {{ span.name }} }}   Inline template
template "dialog" from "dialog.view"            Loaded from file on first use

Templates are referenced as "row-tpl" or "#row-tpl".

QUERIES
-------
tag  *  #id  .class  [attr]  [attr=value]       Compound selectors
a b                                             b anywhere below a
a > b                                           b directly below a
a, b                                            either

SCRIPTS
-------
[[step]]
[step.compose]
id = "row1"
wrapper = ".list"
template = "#row-tpl"
before_unset = "log"
values = [{{ wrapper = ".name", text = "Alice" }}]

[[step]]
remove = "#row1"

[[step]]
empty = ".list"

Compose fields: id, wrapper, template, values, children, incremental,
replace_wrapper, after_insert, before_unset. Hooks: log."##
    );
}
