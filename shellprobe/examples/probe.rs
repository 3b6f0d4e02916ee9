//! Run a single probe from the command line.
//!
//! The configuration record is read as JSON, either from `--config <FILE>`
//! or from individual flags.
//!
//! # Usage
//!
//! From a record file:
//! ```bash
//! cargo run --example probe -- --config target.json --timeout 10
//! ```
//!
//! From flags:
//! ```bash
//! cargo run --example probe -- --host 10.0.0.5 --port 23 --mode telnet \
//!     --user alice --password secret --command whoami --expect alice
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use shellprobe::{ProbeBuilder, ProbeConfig, ProbeMode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = if let Some(path) = &args.config {
        let record = std::fs::read_to_string(path)?;
        ProbeConfig::from_json(&record)?
    } else {
        let mode = match args.mode.as_str() {
            "telnet" => ProbeMode::Telnet,
            "line" => ProbeMode::Line,
            other => {
                eprintln!("Error: unknown mode '{}' (expected telnet or line)", other);
                std::process::exit(2);
            }
        };

        ProbeBuilder::new(&args.host)
            .port(args.port)
            .username(&args.user)
            .password(&args.password)
            .command(&args.command)
            .expected_output(&args.expect)
            .mode(mode)
            .build()?
    };

    println!(
        "Probing {} ({:?}) with a {}s budget...",
        config.address(),
        config.mode,
        args.timeout
    );

    match shellprobe::run_with_timeout(&config, Duration::from_secs(args.timeout)).await {
        Ok(report) => {
            println!("PASS in {:?}", report.elapsed);
            for line in report.lines() {
                println!("  | {}", line);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("FAIL: {}", e);
            if let shellprobe::Error::Probe(probe_err) = &e {
                if let Some(observed) = probe_err.observed() {
                    eprintln!("Observed:\n{}", observed);
                }
            }
            std::process::exit(1);
        }
    }
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    config: Option<PathBuf>,
    host: String,
    port: u16,
    mode: String,
    user: String,
    password: String,
    command: String,
    expect: String,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            config: None,
            host: "localhost".to_string(),
            port: 23,
            mode: "telnet".to_string(),
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: String::new(),
            command: "whoami".to_string(),
            expect: String::new(),
            timeout: 10,
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = args.get(i + 1).cloned();
            match (flag, value) {
                ("--config" | "-c", Some(v)) => parsed.config = Some(PathBuf::from(v)),
                ("--host" | "-h", Some(v)) => parsed.host = v,
                ("--port" | "-p", Some(v)) => parsed.port = v.parse().unwrap_or(23),
                ("--mode" | "-m", Some(v)) => parsed.mode = v,
                ("--user" | "-u", Some(v)) => parsed.user = v,
                ("--password" | "-P", Some(v)) => parsed.password = v,
                ("--command" | "-x", Some(v)) => parsed.command = v,
                ("--expect" | "-e", Some(v)) => parsed.expect = v,
                ("--timeout" | "-t", Some(v)) => parsed.timeout = v.parse().unwrap_or(10),
                ("--help", _) => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown or incomplete argument: {}", flag);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"shellprobe probe example

USAGE:
    cargo run --example probe -- [OPTIONS]

OPTIONS:
    -c, --config <FILE>      JSON configuration record (overrides the flags below)
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        Target port [default: 23]
    -m, --mode <MODE>        telnet or line [default: telnet]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password
    -x, --command <CMD>      Command to run [default: whoami]
    -e, --expect <TEXT>      Expected output [default: empty]
    -t, --timeout <SECS>     Overall deadline [default: 10]
    --help                   Print this help message

RECORD FORMAT:
    {{"server": "10.0.0.5", "port": 23, "username": "alice", "password": "secret",
      "command": "whoami", "expected_output": "alice", "mode": "telnet"}}
"#
        );
    }
}
