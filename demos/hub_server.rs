//! SSE hub server example
//!
//! Run with: cargo run --example hub_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example hub_server                    # binds to 0.0.0.0:8080
//!   cargo run --example hub_server localhost          # binds to 127.0.0.1:8080
//!   cargo run --example hub_server 127.0.0.1:9000     # binds to 127.0.0.1:9000
//!
//! ## Subscribe
//!
//!   curl -N http://localhost:8080/sse
//!
//! ## Publish
//!
//!   curl -X POST http://localhost:8080/broadcast \
//!        -H 'Content-Type: application/json' \
//!        -d '{"event":"greeting","data":"hello\nworld"}'
//!
//! The server also publishes a `tick` event every few seconds.

use std::net::SocketAddr;
use std::time::Duration;

use sse_hub::{HubServer, ServerConfig};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8080
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8080
/// - "0.0.0.0:9000" -> 0.0.0.0:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8080;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: hub_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8080)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sse_hub=debug".parse()?)
                .add_directive("hub_server=debug".parse()?),
        )
        .init();

    println!("Starting SSE hub on {}", config.bind_addr);
    println!();
    println!("Subscribe: curl -N http://{}/sse", config.bind_addr);
    println!(
        "Publish:   curl -X POST http://{}/broadcast -H 'Content-Type: application/json' -d '{{\"event\":\"hi\",\"data\":\"there\"}}'",
        config.bind_addr
    );
    println!();

    let server = HubServer::new(config);

    let hub = server.hub().clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        let mut n: u64 = 0;
        loop {
            ticker.tick().await;
            n += 1;
            if hub.publish("tick", n.to_string()).await.is_err() {
                break;
            }
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
