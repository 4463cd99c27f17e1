use std::{
    io::{IsTerminal, stderr},
    path::PathBuf,
    process,
};

use automata::{Layout, Options, RunError, RunEvent, Trace, load, loader::log::LogEntry};
use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "dfa-sim")]
#[command(about = "Run test strings through a DFA described in a text file")]
#[command(version)]
struct Cli {
    /// Description file: accepting states, start state, optional state list,
    /// transitions, then one test string per line
    file: PathBuf,

    /// How to read the description
    #[arg(short, long, value_enum, default_value = "auto")]
    layout: LayoutArg,

    /// Print every state visited while running each test string
    #[arg(short, long)]
    trace: bool,

    /// Print the transition table before running
    #[arg(long)]
    table: bool,

    /// Emit a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Do not warn when a legacy third line only looks like a transition list
    #[arg(long)]
    allow_ambiguous: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Auto,
    Legacy,
    Sectioned,
}

impl From<LayoutArg> for Layout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Auto => Layout::Auto,
            LayoutArg::Legacy => Layout::Legacy,
            LayoutArg::Sectioned => Layout::Sectioned,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    results: Vec<Outcome<'a>>,
    diagnostics: &'a [LogEntry],
}

#[derive(Serialize)]
struct Outcome<'a> {
    input: &'a str,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<Vec<RunEvent>>,
}

fn main() {
    let cli = Cli::parse();

    let src = match std::fs::read_to_string(&cli.file) {
        Ok(ok) => ok,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", cli.file.display());
            process::exit(1);
        }
    };

    let options = Options {
        layout: cli.layout.into(),
        flag_ambiguity: !cli.allow_ambiguous,
    };
    let loaded = load(&src, options);

    if !cli.json {
        let color = stderr().is_terminal();
        for log in loaded.logs.display_with(&src, color) {
            eprintln!("{log}")
        }
        if cli.table {
            println!("{}", loaded.dfa);
        }
    }

    let mut results = Vec::new();
    let mut failure = None;
    for test in &loaded.tests {
        let mut trace = Trace::new();
        let accepted = match loaded.dfa.run_observed(test, &mut trace) {
            Ok(ok) => ok,
            Err(err) => {
                failure = Some(err);
                break;
            }
        };

        if !cli.json {
            if cli.trace {
                for event in trace.displayable_with(&loaded.dfa) {
                    println!("  {event}");
                }
            }
            println!(
                "The string '{test}' is {} by the DFA.",
                if accepted { "accepted" } else { "rejected" }
            );
        }

        results.push(Outcome {
            input: test,
            accepted,
            trace: cli.trace.then(|| trace.into_events()),
        });
    }

    if cli.json {
        let report = Report {
            results,
            diagnostics: loaded.logs.entries(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: {err}");
                process::exit(1);
            }
        }
    }

    // an empty test list never reaches run, check the start state anyway
    if loaded.dfa.start().is_none() {
        failure = Some(RunError::MissingStartState);
    }
    if let Some(err) = failure {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
