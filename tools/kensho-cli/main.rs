use chrono::NaiveDate;
use clap::Parser;
use kensho::interpreter::DATE_FORMAT;
use kensho::prelude::*;
use std::io::{self, Write};
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Evaluates a form configuration against a values snapshot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the form configuration JSON file
    config_path: Option<String>,
    /// Optional path to a JSON object of field values
    values_path: Option<String>,

    /// Evaluation date (YYYY-MM-DD) used for `currentDate` and age checks
    #[arg(long)]
    today: Option<String>,

    /// Attempt a submission and print the payload or the errors
    #[arg(short, long)]
    submit: bool,

    /// Print why each conditional field is shown or hidden
    #[arg(short, long)]
    explain: bool,

    /// Run in interactive mode to be prompted for inputs
    #[arg(short = 'i', long, help = "Run in interactive 'human' mode")]
    human: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive(Level::WARN.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if cli.human {
        run_interactive(cli);
    } else {
        run_non_interactive(cli);
    }
}

fn run_evaluation(config_path: String, values_path: Option<String>, options: &Cli) {
    let total_start = Instant::now();

    // --- 1. Interpreter ---
    let mut builder = Interpreter::builder();
    if let Some(today) = &options.today {
        let date = NaiveDate::parse_from_str(today, DATE_FORMAT)
            .unwrap_or_else(|e| exit_with_error(&format!("Invalid --today '{}': {}", today, e)));
        builder = builder.with_today(date);
    }
    let interpreter = builder.build();

    // --- 2. Loading ---
    let load_start = Instant::now();
    let load = FormLoader::new(&interpreter)
        .load_file(&config_path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load form: {}", e)));
    let values = match values_path {
        Some(path) => Environment::from_file(&path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load values: {}", e))),
        None => {
            println!("No values file provided. Starting from an empty form.");
            Environment::new()
        }
    };
    let load_duration = load_start.elapsed();

    println!(
        "\nLoaded '{}': {} step(s), {} field(s)",
        load.form.title.as_deref().unwrap_or("untitled form"),
        load.form.steps().len(),
        load.form.field_count()
    );
    for issue in &load.issues {
        println!("  ! {}", issue);
    }

    // --- 3. Session ---
    let eval_start = Instant::now();
    let mut session = FormSession::with_values(load.form, interpreter.clone(), values);

    for step in session.form().steps() {
        let marker = if session.is_step_visible(&step.id) { "+" } else { "-" };
        println!("\n[{}] Step '{}' {}", marker, step.id, step.label);
        for field in &step.fields {
            let marker = if session.is_visible(&field.name) { "+" } else { "-" };
            let value = session.value(&field.name);
            match session.error(&field.name) {
                Some(error) => println!("  [{}] {} = {}  ({})", marker, field.name, value, error),
                None => println!("  [{}] {} = {}", marker, field.name, value),
            }
            if options.explain {
                if let Some(Ok(expr)) = field.visibility.as_ref().map(Rule::expression) {
                    let trace = interpreter.explain(expr, session.values());
                    println!("        because {}", TraceFormatter::format_trace(&trace));
                }
            }
        }
    }

    if options.submit {
        println!("\nSubmitting...");
        match session.submit() {
            Ok(submission) => {
                let pretty = serde_json::to_string_pretty(&submission.to_json())
                    .unwrap_or_else(|e| exit_with_error(&format!("Failed to render payload: {}", e)));
                println!("  -> Accepted\n{}", pretty);
            }
            Err(rejection) => {
                println!("  -> {}", rejection);
                for error in &rejection.errors {
                    println!("     {}: {}", error.field, error.message);
                }
            }
        }
    }
    let eval_duration = eval_start.elapsed();

    println!("\n--- Performance Summary ---");
    println!("File Loading:         {:?}", load_duration);
    println!("Evaluation:           {:?}", eval_duration);
    println!("-----------------------------");
    println!("Total Execution:      {:?}", total_start.elapsed());
    println!();
}

/// Runs the CLI in non-interactive mode, taking all arguments from the command line.
fn run_non_interactive(cli: Cli) {
    let config_path = cli.config_path.clone().unwrap_or_else(|| {
        exit_with_error("Config path is required in non-interactive mode.");
    });
    run_evaluation(config_path, cli.values_path.clone(), &cli);
}

/// Runs the CLI in an interactive, human-friendly mode with prompts.
fn run_interactive(mut cli: Cli) {
    println!("--- Kensho Interactive Mode ---");

    let config_path = prompt_for_input("Enter form config path", Some("data/form.json"));
    let values_path = prompt_for_input("Enter values path (optional)", Some(""));
    let today = prompt_for_input("Enter evaluation date (optional, YYYY-MM-DD)", Some(""));
    if !today.is_empty() {
        cli.today = Some(today);
    }
    cli.submit = prompt_for_input("Attempt submission? (y/n)", Some("y")) == "y";

    let values_path = if values_path.is_empty() {
        None
    } else {
        Some(values_path)
    };
    run_evaluation(config_path, values_path, &cli);
}

/// A helper function to prompt the user and read a line of input.
fn prompt_for_input(prompt_text: &str, default: Option<&str>) -> String {
    let mut line = String::new();
    let default_prompt = default
        .filter(|d| !d.is_empty())
        .map_or("".to_string(), |d| format!(" [default: {}]", d));

    print!("> {}{}: ", prompt_text, default_prompt);
    if let Err(e) = io::stdout().flush() {
        exit_with_error(&format!("Failed to write prompt: {}", e));
    }
    if let Err(e) = io::stdin().read_line(&mut line) {
        exit_with_error(&format!("Failed to read line: {}", e));
    }
    let trimmed = line.trim().to_string();

    if trimmed.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        trimmed
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
