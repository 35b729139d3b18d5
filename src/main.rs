// Wich CLI

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use target_lexicon::HOST;

use wich::ast::Script;
use wich::compiler;
use wich::driver::{self, DriverConfig};
use wich::error_handler::{ErrorHandler, Severity, WichError};
use wich::semantic::semantic_symbols::SymbolTable;
use wich::{Backend, backend_from_name, parser, semantic};

#[derive(Parser)]
#[command(name = "wich", about = "Wich to C translator", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a .w file to C
    Translate {
        file: PathBuf,
        /// Code generation backend: plain or refcounting
        #[arg(long, default_value = "plain")]
        backend: String,
        /// Write the C code here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the scope tree with every symbol and its type
    Symbols {
        file: PathBuf,
        /// Also print the predefined scope
        #[arg(long)]
        predefined: bool,
    },
    /// Parse and type check only
    Check { file: PathBuf },
    /// Translate, then compile against the C runtime
    Build(BuildArgs),
    /// Build, then run the program
    Run(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    file: PathBuf,
    /// Directory holding wich.h and wich.c
    #[arg(long, env = "WICH_RUNTIME")]
    runtime: PathBuf,
    /// Where the generated C and the executable go
    #[arg(long = "work-dir", env = "WICH_WORK_DIR", default_value = "/tmp")]
    work_dir: PathBuf,
    /// Code generation backend: plain or refcounting
    #[arg(long, default_value = "refcounting")]
    backend: String,
    /// Target triple for the C compiler, defaults to the host
    #[arg(long)]
    target: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ok = match cli.cmd {
        Commands::Translate {
            file,
            backend,
            output,
        } => translate(&file, &backend, output.as_deref()),
        Commands::Symbols { file, predefined } => symbols(&file, predefined),
        Commands::Check { file } => check(&file),
        Commands::Build(args) => build(&args, false),
        Commands::Run(args) => build(&args, true),
    };
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn progress(stages: &[&str]) -> ProgressBar {
    let pb = ProgressBar::new(stages.len() as u64);
    let bar_style = ProgressStyle::with_template("PIPELINE [{bar:40.green}] {msg:.bold}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━-");
    pb.set_style(bar_style);
    pb
}

fn read_source(file: &Path) -> Option<String> {
    match fs::read_to_string(file) {
        Ok(src) => Some(src),
        Err(e) => {
            print_failure("Read", &format!("cannot read {}: {}", file.display(), e));
            None
        }
    }
}

fn parse_backend(name: &str) -> Option<Backend> {
    let mut errors = ErrorHandler::default();
    let backend = backend_from_name(name, &mut errors);
    if backend.is_none() {
        print_error("Options", errors.errors());
    }
    backend
}

//prints the diagnostics a stage added, returns false when any of them is an error
fn report(pb: &ProgressBar, stage: &str, errors: &ErrorHandler, from: usize) -> bool {
    let new = &errors.diagnostics()[from..];
    let failed = new.iter().any(|d| d.severity == Severity::Error);
    pb.suspend(|| {
        let warnings: Vec<&WichError> = new
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect();
        if !warnings.is_empty() {
            print_warning(stage, warnings.into_iter());
        }
        if failed {
            print_error(stage, new.iter().filter(|d| d.severity == Severity::Error));
        }
    });
    !failed
}

//parsing and both semantic passes; None once a stage reported errors
fn front_end(pb: &ProgressBar, src: &str, errors: &mut ErrorHandler) -> Option<(Script, SymbolTable)> {
    pb.set_message("Parsing");
    let mut script = parser::parse_script(src, errors);
    pb.inc(1);
    if !report(pb, "Parsing", errors, 0) {
        return None;
    }

    pb.set_message("Semantic");
    let seen = errors.diagnostics().len();
    let symtab = semantic::analyze(&mut script, errors);
    pb.inc(1);
    if !report(pb, "Semantic", errors, seen) {
        return None;
    }
    Some((script, symtab))
}

fn generate_c(pb: &ProgressBar, file: &Path, backend: Backend) -> Option<String> {
    let src = read_source(file)?;
    let mut errors = ErrorHandler::new(&src);
    let (script, symtab) = front_end(pb, &src, &mut errors)?;

    pb.set_message("Codegen");
    let seen = errors.diagnostics().len();
    let c_source = match compiler::generate(&script, &symtab, backend, &mut errors) {
        Ok(c) => c,
        Err(e) => {
            pb.suspend(|| print_failure("Codegen", &e.to_string()));
            return None;
        }
    };
    pb.inc(1);
    report(pb, "Codegen", &errors, seen);
    Some(c_source)
}

fn translate(file: &Path, backend: &str, output: Option<&Path>) -> bool {
    let Some(backend) = parse_backend(backend) else {
        return false;
    };
    let pb = progress(&["Parsing", "Semantic", "Codegen"]);
    let Some(c_source) = generate_c(&pb, file, backend) else {
        pb.abandon();
        return false;
    };
    pb.finish_and_clear();
    match output {
        Some(path) => match fs::write(path, &c_source) {
            Ok(()) => {
                eprintln!(
                    "{} Wrote {} ({} backend)",
                    style("✔").green().bold(),
                    style(path.display()).yellow(),
                    backend.name()
                );
                true
            }
            Err(e) => {
                print_failure("Write", &format!("cannot write {}: {}", path.display(), e));
                false
            }
        },
        None => {
            print!("{}", c_source);
            true
        }
    }
}

fn symbols(file: &Path, predefined: bool) -> bool {
    let Some(src) = read_source(file) else {
        return false;
    };
    let mut errors = ErrorHandler::new(&src);
    let mut script = parser::parse_script(&src, &mut errors);
    let pb = ProgressBar::hidden();
    if !report(&pb, "Parsing", &errors, 0) {
        return false;
    }
    let seen = errors.diagnostics().len();
    let symtab = semantic::analyze(&mut script, &mut errors);
    let ok = report(&pb, "Semantic", &errors, seen);
    if predefined {
        print!("{}", symtab.dump(symtab.predefined()));
    }
    print!("{}", symtab.dump(symtab.global()));
    ok
}

fn check(file: &Path) -> bool {
    let Some(src) = read_source(file) else {
        return false;
    };
    let pb = progress(&["Parsing", "Semantic"]);
    let mut errors = ErrorHandler::new(&src);
    if front_end(&pb, &src, &mut errors).is_none() {
        pb.abandon();
        return false;
    }
    pb.finish_and_clear();
    println!("{} No errors found in {}", style("✔").green().bold(), style(file.display()).yellow());
    true
}

fn build(args: &BuildArgs, run: bool) -> bool {
    let Some(backend) = parse_backend(&args.backend) else {
        return false;
    };
    let config = DriverConfig {
        backend,
        runtime_dir: args.runtime.clone(),
        work_dir: args.work_dir.clone(),
        target: args.target.clone().unwrap_or_else(|| HOST.to_string()),
    };
    print_header(&config);

    let stages: &[&str] = if run {
        &["Parsing", "Semantic", "Codegen", "C compile", "Run"]
    } else {
        &["Parsing", "Semantic", "Codegen", "C compile"]
    };
    let pb = progress(stages);
    let Some(c_source) = generate_c(&pb, &args.file, backend) else {
        pb.abandon();
        return false;
    };

    pb.set_message("C compile");
    let exe = match driver::build(&config, &args.file, &c_source) {
        Ok(exe) => exe,
        Err(e) => {
            pb.abandon();
            print_failure("C compile", &format!("{:#}", e));
            return false;
        }
    };
    pb.inc(1);

    if !run {
        pb.finish_and_clear();
        println!(
            "{} Build finished successfully! Binary at: {}",
            style("✔").green().bold(),
            style(exe.display()).yellow()
        );
        return true;
    }

    pb.set_message("Run");
    let result = driver::run_executable(&exe);
    pb.inc(1);
    pb.finish_and_clear();
    match result {
        Ok(output) => {
            print!("{}", output);
            true
        }
        Err(e) => {
            print_failure("Run", &format!("{:#}", e));
            false
        }
    }
}

fn print_header(config: &DriverConfig) {
    let title = format!(
        "{} {} {}",
        style("wich").cyan().bold(),
        style("•").white().bold(),
        style(format!("{} backend, {}", config.backend.name(), config.target)).yellow()
    );
    eprintln!(
        "{line}\n{title}\n{line}",
        line = style("━").dim().to_string().repeat(60),
        title = title
    );
}

fn print_error<'e>(phase: &str, errors: impl Iterator<Item = &'e WichError>) {
    eprintln!();
    eprintln!("{} Stage: {}", style("✘").red().bold(), style(phase).red().bold());
    for error in errors {
        eprint!("{}", error);
    }
}

fn print_warning<'e>(phase: &str, warnings: impl Iterator<Item = &'e WichError>) {
    eprintln!();
    eprintln!("{} Stage: {}", style("!").yellow().bold(), style(phase).yellow().bold());
    for warning in warnings {
        eprint!("{}", warning);
    }
}

fn print_failure(phase: &str, message: &str) {
    eprintln!();
    eprintln!("{} Stage: {}", style("✘").red().bold(), style(phase).red().bold());
    eprintln!("{}", message);
}
