use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser as _, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};
use quill_lang::{Interpreter, Lexer, Parser, Script, ScriptMode, Value, compile};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

mod print;

#[derive(clap::Parser)]
#[command(name = "quill", version, about = "Run and inspect Quill scripts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Print interpreter diagnostics to stderr (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a script
    Run {
        file: PathBuf,
        /// Override the `// @mode:` header (ast, ir or both)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Display the token stream of a file
    Tokens { file: PathBuf },
    /// Display the syntax tree of a file
    Ast { file: PathBuf },
}

// ─── Logging ──────────────────────────────────────────────────────────────────

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// An interpreter whose script output goes straight to the terminal.
fn interpreter() -> Interpreter {
    let mut interp = Interpreter::new();
    interp.set_log_sink(|msg| println!("{msg}"));
    interp.set_warn_sink(|msg| eprintln!("{msg}"));
    interp.set_error_sink(|msg| eprintln!("{msg}"));
    interp
}

fn read_file(path: &Path) -> Result<String, ExitCode> {
    match fs::read_to_string(path) {
        Ok(source) => {
            if source.trim().is_empty() {
                print::warning_message("File is empty");
            }
            Ok(source)
        }
        Err(e) => {
            print::error_message(&format!("Problem reading {}: {e}", path.display()));
            Err(ExitCode::FAILURE)
        }
    }
}

fn run(path: &Path, mode: Option<&str>) -> Result<(), ExitCode> {
    let filename = path.display().to_string();
    let mut script = Script::from_source(read_file(path)?);
    if let Some(mode) = mode {
        script.mode = ScriptMode::parse(mode);
    }
    log::debug!("running '{}' in {} mode", script.name, script.mode);

    let program = compile(&script.source).map_err(|errors| {
        print::errors(&filename, &script.source, &errors);
        ExitCode::FAILURE
    })?;
    interpreter().execute(&program.statements).map_err(|e| {
        print::runtime_error(&filename, &script.source, &e);
        ExitCode::FAILURE
    })?;
    Ok(())
}

fn tokens(path: &Path) -> Result<(), ExitCode> {
    let source = read_file(path)?;
    let (tokens, errors) = Lexer::new(&source).tokenize();
    print::tokens(&tokens);
    if errors.is_empty() {
        Ok(())
    } else {
        print::errors(&path.display().to_string(), &source, &errors);
        Err(ExitCode::FAILURE)
    }
}

fn ast(path: &Path) -> Result<(), ExitCode> {
    let filename = path.display().to_string();
    let source = read_file(path)?;
    let (tokens, lex_errors) = Lexer::new(&source).tokenize();
    let (statements, parse_errors) = Parser::new(tokens).parse();
    print::ast(&statements);
    if lex_errors.is_empty() && parse_errors.is_empty() {
        return Ok(());
    }
    print::errors(&filename, &source, &lex_errors);
    print::errors(&filename, &source, &parse_errors);
    Err(ExitCode::FAILURE)
}

/// Definitions persist between lines; a failed line leaves earlier state intact.
fn repl() -> Result<(), ExitCode> {
    let mut rl = DefaultEditor::new().map_err(|e| {
        print::error_message(&format!("Cannot start REPL: {e}"));
        ExitCode::FAILURE
    })?;
    let mut interp = interpreter();

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                match compile(&line) {
                    Ok(program) => match interp.execute(&program.statements) {
                        Ok(Value::Null) => {}
                        Ok(value) => println!("{value}"),
                        Err(e) => print::runtime_error("REPL", &line, &e),
                    },
                    Err(errors) => print::errors("REPL", &line, &errors),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => {
                print::error_message(&format!("{e:?}"));
                return Err(ExitCode::FAILURE);
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Some(Command::Run { file, mode }) => run(file, mode.as_deref()),
        Some(Command::Tokens { file }) => tokens(file),
        Some(Command::Ast { file }) => ast(file),
        None => {
            println!("Quill ({})", env!("CARGO_PKG_VERSION"));
            repl()
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}
