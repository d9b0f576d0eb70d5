// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Verkko CLI
//!
//! Sends one request and prints the normalized response as JSON.

use std::env;
use std::process::ExitCode;

use anyhow::{bail, Context};

use verkko::{QuerySpec, RequestOptions, RequestSpec};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "verkko=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "get" => {
            if args.len() < 3 {
                eprintln!("Usage: verkko get <url> [--xpath EXPR]... [--debug]");
                return ExitCode::from(1);
            }
            get_command(&args[2], &args[3..]).await
        }
        "run" => {
            if args.len() < 3 {
                eprintln!("Usage: verkko run <options.json>");
                return ExitCode::from(1);
            }
            run_command(&args[2]).await
        }
        "--help" | "-h" | "help" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "--version" | "-v" | "version" => {
            println!("verkko {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            return ExitCode::from(1);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Verkko - HTTP request builder with XPath extraction

USAGE:
    verkko <COMMAND> [OPTIONS]

COMMANDS:
    get <url>               Send a GET request
        --xpath <EXPR>      Extract values; repeat for several expressions
        --debug             Log the request and response summary
    run <options.json>      Send a request described by an options file
    help                    Show this help message
    version                 Show version information

EXAMPLES:
    verkko get https://example.com --xpath "//h1/trim()"
    verkko get "https://example.com/search?q=rust" --xpath "//a/@href" --xpath "//title"
    verkko run request.json

Set RUST_LOG=verkko=debug for wire-level details.
"#
    );
}

async fn get_command(url: &str, rest: &[String]) -> anyhow::Result<()> {
    let mut expressions = Vec::new();
    let mut debug = false;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--xpath" => match iter.next() {
                Some(expr) => expressions.push(expr.clone()),
                None => bail!("--xpath needs an expression"),
            },
            "--debug" => debug = true,
            other => bail!("unknown option '{}'", other),
        }
    }

    let mut spec = RequestSpec::new(url).debug(debug);
    spec = match expressions.len() {
        0 => spec,
        1 => spec.xpath(expressions.remove(0)),
        _ => spec.extract(QuerySpec::keyed(
            expressions.into_iter().map(|e| (e.clone(), e)),
        )),
    };
    send(spec).await
}

async fn run_command(path: &str) -> anyhow::Result<()> {
    let spec = RequestOptions::from_path(path)
        .with_context(|| format!("failed to load options from {}", path))?
        .into_request()?;
    send(spec).await
}

async fn send(spec: RequestSpec) -> anyhow::Result<()> {
    let response = spec.execute().await.context("request failed")?;
    println!("{}", serde_json::to_string_pretty(&response.to_json())?);
    Ok(())
}
