/// CLI tool for driving a form definition against its remote evaluators
use param_cascade::{diagnostic, initialize, load_form, CascadeTrace, Form, NodeRole, Widget};
use serde::Serialize;
use std::env;
use std::io::{self, Read};
use std::process;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  param-cascade <form.json> [name=value ...] [options]");
    eprintln!("  param-cascade - [name=value ...] [options]    Read the definition from stdin");
    eprintln!("  param-cascade --help                          Show this help message");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --init      Refresh every cascading parameter before applying values");
    eprintln!("  --trace     Print the cascade trace of every change as JSON");
    eprintln!();
    eprintln!("Each name=value sets a parameter (comma separated keys for choices)");
    eprintln!("and cascades the change. The final form state is printed as JSON.");
    eprintln!("Set RUST_LOG=debug to follow the requests.");
}

#[derive(Serialize)]
struct ParameterState<'a> {
    name: &'a str,
    role: NodeRole,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    widget: Option<&'a Widget>,
}

fn form_state(form: &Form) -> Vec<ParameterState<'_>> {
    form.nodes()
        .map(|(_, node)| ParameterState {
            name: node.name(),
            role: node.role(),
            value: node.value().to_string(),
            widget: node.widget(),
        })
        .collect()
}

fn print_trace(trace: &CascadeTrace) {
    match serde_json::to_string_pretty(trace) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing trace: {}", e),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    if args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(0);
    }

    let trace_enabled = args.iter().any(|a| a == "--trace");
    let init = args.iter().any(|a| a == "--init");

    // Read definition
    let source = if args[1] == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).unwrap_or_else(|e| {
            eprintln!("Error reading from stdin: {}", e);
            process::exit(1);
        });
        buffer
    } else {
        tokio::fs::read_to_string(&args[1]).await.unwrap_or_else(|e| {
            eprintln!("Error reading file '{}': {}", args[1], e);
            process::exit(1);
        })
    };

    let source_name = if args[1] == "-" { "<stdin>" } else { &args[1] };

    let mut form = load_form(&source).unwrap_or_else(|e| {
        eprint!("{}", diagnostic::report_error(source_name, &source, &e));
        process::exit(1);
    });

    if init {
        for trace in initialize(&mut form).await {
            if trace_enabled {
                print_trace(&trace);
            }
        }
    }

    for assignment in args[2..].iter().filter(|a| !a.starts_with("--")) {
        let Some((name, value)) = assignment.split_once('=') else {
            eprintln!("Expected name=value, got '{}'", assignment);
            process::exit(1);
        };
        let Some(id) = form.find(name) else {
            eprintln!("Unknown parameter '{}'", name);
            process::exit(1);
        };

        match form.set_value(id, value).await {
            Ok(trace) => {
                if trace_enabled {
                    print_trace(&trace);
                }
            }
            Err(e) => {
                eprint!("{}", diagnostic::report_error(source_name, &source, &param_cascade::Error::from(e)));
                process::exit(1);
            }
        }
    }

    match serde_json::to_string_pretty(&form_state(&form)) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing form state: {}", e);
            process::exit(1);
        }
    }
}
