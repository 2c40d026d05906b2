use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::Level;

use data_display::{Control, ControlKind, DataDisplay, Document, Evaluator, Form, Settings};

/// Evaluate display conditions against form fields.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one condition and print the reset and condition actions as JSON
    Eval {
        /// Condition text, e.g. "{age} is greater than 17"
        condition: String,
        /// Reset script run before the condition (defaults to hiding)
        #[arg(long)]
        reset: Option<String>,
        /// Text field as name=value (repeatable)
        #[arg(short, long = "field", value_parser = parse_pair)]
        fields: Vec<(String, String)>,
        /// Checked checkbox as name=value (repeatable)
        #[arg(short, long = "checked", value_parser = parse_pair)]
        checked: Vec<(String, String)>,
    },
    /// Bind a JSON document, apply field changes and print the resulting document
    Run {
        /// Document JSON: {"form": [controls], "elements": [{"id", "attrs"}]}
        document: PathBuf,
        /// Settings JSON file
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Field change as name=value, applied in order (repeatable)
        #[arg(long = "set", value_parser = parse_pair)]
        changes: Vec<(String, String)>,
        /// Destroy the bindings before printing
        #[arg(long)]
        destroy: bool,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Eval {
            condition,
            reset,
            fields,
            checked,
        } => {
            let mut form = Form::new();
            for (name, value) in fields {
                form = form.with(Control::text(name, value));
            }
            for (name, value) in checked {
                form = form.with(Control::checkable(ControlKind::Checkbox, name, value, true));
            }
            let evaluator = Evaluator::default();
            let out = json!({
                "reset": evaluator.reset(reset.as_deref(), &form),
                "actions": evaluator.evaluate(&condition, &form),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Run {
            document,
            settings,
            changes,
            destroy,
        } => {
            let mut doc = Document::from_json(&std::fs::read_to_string(&document)?)?;
            let settings = match settings {
                Some(path) => Settings::from_json(&std::fs::read_to_string(path)?)?,
                None => Settings::default(),
            };
            let mut display = DataDisplay::new(settings);
            display.bind(&mut doc);
            for (name, value) in &changes {
                if !doc.set_field(name, value) {
                    return Err(format!("no control named `{name}`").into());
                }
                display.notify(&mut doc, name, "change", Instant::now());
            }
            display.flush(&mut doc);
            if destroy {
                display.destroy(&mut doc);
            }
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}
