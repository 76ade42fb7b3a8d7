use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use route_engine::routing::{parse_routes, PayloadFormat, RequestAttributes};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Management CLI for the route engine", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check engine and route table status
    Status,
    /// List routes of the current snapshot
    Routes,
    /// Resolve a request to a route
    Lookup {
        /// Request path
        path: String,
        #[arg(long)]
        host: Option<String>,
        /// Header as `name=value` (repeatable)
        #[arg(long = "header", value_parser = parse_pair)]
        headers: Vec<(String, String)>,
        /// Query parameter as `name=value` (repeatable)
        #[arg(long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
    },
    /// Push a route document to the engine
    Push {
        file: PathBuf,
        /// Payload format (json or toml); inferred from the extension by default
        #[arg(long)]
        format: Option<PayloadFormat>,
    },
    /// Validate a route document locally without contacting the engine
    Validate {
        file: PathBuf,
        #[arg(long)]
        format: Option<PayloadFormat>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

fn resolve_format(file: &std::path::Path, format: Option<PayloadFormat>) -> PayloadFormat {
    format
        .or_else(|| PayloadFormat::from_path(file))
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Routes => {
            client.get(format!("{}/admin/routes", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Lookup { path, host, headers: req_headers, query } => {
            let mut attrs = RequestAttributes::for_path(path);
            if let Some(host) = host {
                attrs = attrs.with_host(host);
            }
            for (name, value) in req_headers {
                attrs = attrs.with_header(name, value);
            }
            for (name, value) in query {
                attrs = attrs.with_query(name, value);
            }
            client.post(format!("{}/admin/lookup", cli.url))
                .headers(headers)
                .json(&attrs)
                .send()
                .await?
        }
        Commands::Push { file, format } => {
            let format = resolve_format(&file, format);
            let body = std::fs::read(&file)?;
            client.post(format!("{}/admin/routes?format={}", cli.url, format))
                .headers(headers)
                .body(body)
                .send()
                .await?
        }
        Commands::Validate { file, format } => return validate(&file, format),
    };

    print_response(res).await
}

fn validate(file: &std::path::Path, format: Option<PayloadFormat>) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read(file)?;
    match parse_routes(&raw, resolve_format(file, format)) {
        Ok(routes) => {
            println!("{} routes OK", routes.len());
            for route in routes {
                println!(
                    "  {:<24} {:<32} -> {} (priority {})",
                    route.id, route.predicate.path_prefix, route.target, route.priority
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Invalid route document ({}): {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(text);

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        eprintln!("{}", pretty);
        std::process::exit(1);
    }

    println!("{}", pretty);
    Ok(())
}
