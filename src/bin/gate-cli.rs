use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use route_gate::config::{load_config, GatewayConfig};
use route_gate::http::request::normalize_path;
use route_gate::policy::{ClaimTokenResolver, Decision, PolicyEngine, TrustResolver};
use route_gate::routing::RouteGroup;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Inspect a route-gate configuration offline", long_about = None)]
struct Cli {
    /// Configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the decision for a path and session token
    Check {
        /// Request path, e.g. /users/42
        #[arg(short, long)]
        path: String,
        /// Raw session token (omit for an anonymous caller)
        #[arg(short, long)]
        token: Option<String>,
    },
    /// List route groups in evaluation order
    Routes,
    /// Load and validate the configuration
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = match PolicyEngine::from_config(&config.routes) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output = match cli.command {
        Commands::Check { path, token } => {
            let normalized = match normalize_path(&path) {
                Ok(normalized) => normalized,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let trust = ClaimTokenResolver.resolve(token.as_deref());
            let eval = engine.evaluate(&normalized, trust);
            let location = match eval.decision {
                Decision::Allow => Value::Null,
                Decision::RedirectToLogin => json!(config.redirects.login),
                Decision::RedirectToDefault => json!(config.redirects.default),
            };
            json!({
                "path": normalized,
                "trust": trust,
                "group": eval.group.map_or("default", |g| g.as_str()),
                "decision": eval.decision,
                "location": location,
            })
        }
        Commands::Routes => {
            let groups: Vec<Value> = RouteGroup::PRIORITY
                .iter()
                .map(|group| {
                    let templates: Vec<&str> = engine
                        .table()
                        .patterns(*group)
                        .iter()
                        .map(|p| p.template())
                        .collect();
                    json!({ "group": group, "templates": templates })
                })
                .collect();
            json!({ "groups": groups, "default": "allow" })
        }
        Commands::Validate => json!({ "valid": true, "templates": engine.table().len() }),
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(path: Option<&Path>) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(GatewayConfig::default()),
    }
}
