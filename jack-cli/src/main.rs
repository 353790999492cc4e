//! Entrypoint for CLI
use std::{
    error::Error,
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process,
    time::Instant,
};

use clap::{Parser, Subcommand};
use jack_compiler::{
    batch::{self, BatchConf},
    lex::{write_tokens_xml, Tokenizer},
    trivia::strip_comments,
};
use log::{error, info, LevelFilter};

/// Compiler from Jack classes to stack VM code.
#[derive(Parser, Debug)]
#[command(name = "jackc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log each compiled subroutine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile a source file, or every source file in a directory
    Compile {
        path: PathBuf,

        /// Compile the remaining files after a failure
        #[arg(short, long)]
        keep_going: bool,
    },
    /// Print the token stream of a source file as XML
    Tokens {
        file: PathBuf,

        /// Write to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn run_compiler(path: &Path, keep_going: bool) -> bool {
    let conf = BatchConf {
        keep_going,
        ..BatchConf::default()
    };

    let start = Instant::now();
    let report = match batch::compile_path(path, &conf) {
        Ok(report) => report,
        Err(err) => {
            error!("{err}");
            return false;
        }
    };

    info!(
        "compiled {} file(s) in {}ms",
        report.compiled.len(),
        start.elapsed().as_nanos() as f64 / 1000000.0
    );

    for err in &report.failed {
        error!("{err}");
    }

    report.is_success()
}

fn run_tokenizer(file: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let source_code = fs::read_to_string(file)?;
    let stripped = strip_comments(&source_code);
    let tokenizer = Tokenizer::new(&stripped);

    match output {
        Some(path) => {
            let mut out = BufWriter::new(fs::File::create(path)?);
            write_tokens_xml(tokenizer, &mut out)?;
            out.flush()?;
            info!("wrote tokens to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_tokens_xml(tokenizer, &mut out)?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    simple_logger::SimpleLogger::new().with_level(level).env().init()?;

    let ok = match cli.command {
        Cmd::Compile { path, keep_going } => run_compiler(&path, keep_going),
        Cmd::Tokens { file, output } => match run_tokenizer(&file, output.as_deref()) {
            Ok(()) => true,
            Err(err) => {
                error!("{}: {err}", file.display());
                false
            }
        },
    };

    if !ok {
        process::exit(1)
    }

    Ok(())
}
