//! Chat server binary
//!
//! Usage:
//!   cargo run                          # listen on 127.0.0.1:5050
//!   cargo run -- --port 6000           # listen on a specific port
//!   cargo run -- --bind 0.0.0.0:5050   # listen on a specific address

use std::env;

use parley::{ChatServer, ServerConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match parse_config(&args) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = ChatServer::start(config).await {
        error!("server failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}

/// Parse CLI flags; `Ok(None)` means help was requested
fn parse_config(args: &[String]) -> Result<Option<ServerConfig>, String> {
    let mut config = ServerConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(None),
            "--port" => {
                let value = flag_value(args, i, "--port")?;
                let port = value
                    .parse()
                    .map_err(|_| format!("Invalid port: {}", value))?;
                config.bind_addr.set_port(port);
                i += 2;
            }
            "--bind" => {
                let value = flag_value(args, i, "--bind")?;
                config.bind_addr = value
                    .parse()
                    .map_err(|_| format!("Invalid bind address: {}", value))?;
                i += 2;
            }
            "--max-conn" => {
                let value = flag_value(args, i, "--max-conn")?;
                config.max_connections = value
                    .parse()
                    .map_err(|_| format!("Invalid connection limit: {}", value))?;
                i += 2;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(Some(config))
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a String, String> {
    args.get(i + 1)
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn print_usage() {
    println!("Parley - line-protocol chat server");
    println!();
    println!("USAGE:");
    println!("    parley [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>       Port to listen on (default: 5050)");
    println!("    --bind <ADDR>       Address to bind (default: 127.0.0.1:5050)");
    println!("    --max-conn <NUM>    Maximum connections (default: 1000)");
    println!("    --help              Show this help message");
    println!();
    println!("Connect with any line client, e.g.:");
    println!("    nc 127.0.0.1 5050");
    println!("and type HELP for the command list.");
}
