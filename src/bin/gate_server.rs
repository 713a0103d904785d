//! Gate Server
//!
//! Serves a static site with the dashboard gate in front of it and the
//! `/api/auth/*` endpoints beside it. Accounts live in memory.
//!
//! # Usage
//!
//! ```bash
//! # Serve ./public on 0.0.0.0:3000
//! gate-server
//!
//! # Create one demo account per role (employee@example.com, ...)
//! gate-server --seed-demo 'demo password'
//! ```
//!
//! All other settings come from `GATE_*` environment variables, see
//! `GateConfig::from_env`.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use specyf_gate::http::{auth_routes, GateRegistry, GatedRouter};
use specyf_gate::observability::{self, ObservabilityConfig, SecurityEvent};
use specyf_gate::{GateConfig, MemoryDirectory, Role};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

fn print_usage(program: &str) {
    eprintln!(
        r#"Gate Server

Serve a static site behind role-based session gating.

USAGE:
    {program} [OPTIONS]

OPTIONS:
    --seed-demo <PASSWORD>  Create one account per role (<role>@example.com)
    --help, -h              Show this help message

ENVIRONMENT:
    GATE_LISTEN_ADDR        Listen address (default: 0.0.0.0:3000)
    GATE_STATIC_DIR         Static site directory (default: ./public)
    GATE_LOGIN_PATH         Login page (default: /login.html)
    RUST_LOG, LOG_FORMAT    Logging filter and format (pretty, json, compact)
"#
    );
}

struct Args {
    seed_password: Option<String>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "gate-server".to_string());
    let mut parsed = Args { seed_password: None };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed-demo" => {
                let password = args
                    .next()
                    .ok_or_else(|| "--seed-demo requires a password".to_string())?;
                parsed.seed_password = Some(password);
            }
            "--help" | "-h" => {
                print_usage(&program);
                return Ok(None);
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(Some(parsed))
}

fn seed_demo_accounts(directory: &MemoryDirectory, password: &str) {
    for role in Role::ALL {
        let email = format!("{}@example.com", role);
        match directory.provision(&email, password, &format!("Demo {}", role), role) {
            Ok(principal) => {
                tracing::info!(email = %email, user_id = %principal.id, "Seeded demo account")
            }
            Err(err) => tracing::warn!(email = %email, error = %err, "Could not seed demo account"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = observability::init(ObservabilityConfig::from_env()) {
        eprintln!("error: {}", err);
        return ExitCode::FAILURE;
    }

    let config = GateConfig::from_env();
    let directory = MemoryDirectory::new();
    if let Some(password) = &args.seed_password {
        seed_demo_accounts(&directory, password);
    }

    let registry = Arc::new(GateRegistry::new(
        Arc::new(directory.clone()),
        Arc::new(directory),
        config.clone(),
    ));

    // Idle client gates are swept at a fraction of the timeout
    let sweeper = {
        let registry = registry.clone();
        let idle_timeout = config.client_idle_timeout;
        tokio::spawn(async move {
            let period = idle_timeout.max(std::time::Duration::from_secs(4)) / 4;
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                registry.evict_idle(idle_timeout);
            }
        })
    };

    let app = auth_routes()
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_gate(registry)
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(addr = %config.listen_addr, error = %err, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    specyf_gate::security_event!(
        SecurityEvent::SystemStartup,
        addr = %config.listen_addr,
        static_dir = %config.static_dir.display(),
        "Gate server listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();

    specyf_gate::security_event!(SecurityEvent::SystemShutdown, "Gate server stopped");

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Server error");
            ExitCode::FAILURE
        }
    }
}
