//! emberkv server entry point.
//!
//! Parses flags, loads the snapshot, binds the listener and accepts
//! connections. Load-then-serve ordering matters: the snapshot loader runs
//! to completion before any connection can touch the store.

use anyhow::Context;
use emberkv::commands::Dispatcher;
use emberkv::config::ServerConfig;
use emberkv::connection::{handle_connection, ConnectionStats};
use emberkv::storage::{self, SnapshotError, Store};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn print_help() {
    println!(
        r#"
emberkv - A Minimal In-Memory Key-Value Server

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    --dir <PATH>           Snapshot directory (default: /tmp/redis-data)
    --dbfilename <NAME>    Snapshot file name (default: dump.rdb)
    --host <HOST>          Host to bind to (default: 127.0.0.1)
    --port <PORT>          Port to listen on (default: 6379)
    -v, --version          Print version information
        --help             Print this help message

CONNECTING:
    Use redis-cli or any Redis client:
    $ redis-cli -p 6379
    127.0.0.1:6379> PING
    PONG
    127.0.0.1:6379> SET name ember
    OK
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help") {
        print_help();
        return Ok(());
    }
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("emberkv {}", emberkv::VERSION);
        return Ok(());
    }

    let config = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_help();
            std::process::exit(1);
        }
    };

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    // Build the startup context once; everything downstream borrows it
    let store = Arc::new(Store::new());
    let config = Arc::new(config);

    load_snapshot(&config, &store);

    let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::clone(&config));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, dispatcher, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Seeds the store from `<dir>/<dbfilename>`. Never fatal: the server
/// starts with whatever the loader managed to apply.
fn load_snapshot(config: &ServerConfig, store: &Store) {
    let path = config.snapshot_path();

    match storage::load_snapshot_file(&path, store) {
        Ok(count) => {
            info!(path = %path.display(), keys = count, "Loaded snapshot");
        }
        Err(SnapshotError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot file, starting empty");
        }
        Err(SnapshotError::Io(e)) => {
            warn!(path = %path.display(), error = %e, "Could not read snapshot, starting empty");
        }
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                keys = store.len(),
                "Snapshot load failed, keeping entries applied so far"
            );
        }
    }
}

/// Accepts incoming connections forever. Transient accept failures are
/// logged and the loop continues.
async fn accept_loop(listener: TcpListener, dispatcher: Dispatcher, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let dispatcher = dispatcher.clone();
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, dispatcher, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
