use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use regrep::grep::{Grep, GrepOptions};
use regrep::index::IndexReader;
use regrep::index::build::{STDIN_NAME, build_from_reader, build_index, resolve_roots};
use regrep::output::Printer;
use regrep::query::Pattern;
use regrep::utils::{AppConfig, index_file};
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "regrep")]
#[command(about = "grep over a file tree, narrowed by a trigram index")]
#[command(
    long_about = "Searches files under TARGET for PATTERN, a regular expression. \
    The index is rebuilt on every run and stored in $REGREPINDEX, or \
    $HOME/.regrepindex when that is unset or empty. Without a target, \
    standard input is searched."
)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Regular expression to search for
    pattern: String,

    /// Files or directories to search (standard input when omitted)
    targets: Vec<PathBuf>,

    /// Print only a count of matching lines per file
    #[arg(short = 'c')]
    count: bool,

    /// Omit file names from output
    #[arg(short = 'h')]
    no_filename: bool,

    /// Case-insensitive search
    #[arg(short = 'i')]
    ignore_case: bool,

    /// Print only names of files with a match
    #[arg(short = 'l')]
    files_with_matches: bool,

    /// Prefix each line with its line number
    #[arg(short = 'n')]
    line_number: bool,

    /// Write results to this file instead of standard output
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// When to colour output
    #[arg(long, value_enum, default_value_t = ColorWhen::Never)]
    color: ColorWhen,

    /// Log the compiled query and candidate counts
    #[arg(long)]
    verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorWhen {
    Never,
    Auto,
    Always,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    regrep::logging::init(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("regrep: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Build the index, query it and grep the candidates. Returns whether
/// anything matched.
fn run(cli: Cli) -> Result<bool> {
    let config = AppConfig::load()?;

    // Fail on a bad pattern before any index work.
    let pattern = Pattern::new(&cli.pattern, cli.ignore_case)?;
    let query = pattern.query(config.compiler);
    debug!("query: {}", query);
    debug!("required trigrams: {}", query.required_trigrams());

    let index_path = index_file()?;
    info!("starting index build at {}", index_path.display());

    let stdin_content = if cli.targets.is_empty() {
        let mut content = Vec::new();
        std::io::stdin()
            .read_to_end(&mut content)
            .context("Failed to read standard input")?;
        build_from_reader(&index_path, STDIN_NAME, content.as_slice(), &config.index)?;
        Some(content)
    } else {
        let roots = resolve_roots(&cli.targets);
        let show_progress = !cli.verbose && std::io::stderr().is_terminal();
        build_index(&index_path, &roots, &config.index, show_progress)?;
        None
    };
    info!("done with index build");

    let reader = IndexReader::open(&index_path)?;
    let candidates = reader.posting_query(&query)?;
    debug!("post query identified {} possible files", candidates.len());

    let out: Box<dyn WriteColor> = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(NoColor::new(BufWriter::new(file)))
        }
        None => Box::new(StandardStream::stdout(color_choice(cli.color))),
    };

    let options = GrepOptions {
        count: cli.count,
        names_only: cli.files_with_matches,
        line_numbers: cli.line_number,
        no_filename: cli.no_filename,
    };
    let mut grep = Grep::new(pattern.regex(), options, reader.max_line_len(), Printer::new(out));

    for id in candidates {
        match &stdin_content {
            Some(content) => grep.content(STDIN_NAME, content)?,
            None => grep.file(reader.name(id)?)?,
        }
    }

    grep.finish()
}

fn color_choice(when: ColorWhen) -> ColorChoice {
    match when {
        ColorWhen::Never => ColorChoice::Never,
        ColorWhen::Always => ColorChoice::Always,
        ColorWhen::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
        ColorWhen::Auto => ColorChoice::Never,
    }
}
