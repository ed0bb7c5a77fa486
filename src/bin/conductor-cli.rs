use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conductor-cli")]
#[command(about = "Management CLI for the reload conductor", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:34015")]
    url: String,

    /// API key, when the daemon requires one
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lock state, pending change sets and liveness
    Status,
    /// Add or update routes from a JSON file (a route list or a full batch)
    Add {
        file: PathBuf,
        /// Change set id; generated when omitted in batched mode
        #[arg(long)]
        id: Option<String>,
        /// Queue for the next reload cycle instead of reloading now
        #[arg(long)]
        batched: bool,
    },
    /// Remove routes by id
    Remove {
        #[arg(required = true)]
        routes: Vec<String>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        batched: bool,
    },
    /// Rescan fragments and rebuild the active config
    Regenerate,
    /// Take the reload lock
    Lock,
    /// Reload the proxy (lock must be held)
    Reload,
    /// Release the reload lock
    Release {
        /// Mark unreloaded change sets as failed
        #[arg(long)]
        failed: bool,
    },
    /// Run one lock → reload → release cycle
    Cycle,
    /// Query a change set
    Changeset { id: String },
    /// Put the node in rotation
    Live,
    /// Take the node out of rotation
    NotLive,
    /// Start the proxy
    Start,
    /// Kill the proxy
    Kill,
    /// Probe /health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let post = |path: &str| client.post(format!("{}/v1{}", base, path)).headers(headers.clone());

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/v1/status", base))
                .headers(headers.clone())
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Add { file, id, batched } => {
            let content = std::fs::read_to_string(&file)?;
            let parsed: Value = serde_json::from_str(&content)?;
            let batch = build_batch(parsed, id, batched);
            print_response(post("/routes").json(&batch).send().await?).await?;
        }
        Commands::Remove { routes, id, batched } => {
            let routes: Vec<Value> = routes.into_iter().map(|r| json!({ "id": r })).collect();
            let batch = build_batch(Value::Array(routes), id, batched);
            print_response(post("/routes/remove").json(&batch).send().await?).await?;
        }
        Commands::Regenerate => print_response(post("/config/regenerate").send().await?).await?,
        Commands::Lock => print_response(post("/reload/lock").send().await?).await?,
        Commands::Reload => print_response(post("/reload").send().await?).await?,
        Commands::Release { failed } => {
            let outcome = if failed { "failure" } else { "success" };
            let res = post("/reload/release").json(&json!({ "outcome": outcome })).send().await?;
            print_response(res).await?;
        }
        Commands::Cycle => {
            let res = post("/reload/lock").send().await?;
            if !res.status().is_success() {
                return print_response(res).await;
            }
            let reload = post("/reload").send().await?;
            let outcome = if reload.status().is_success() { "success" } else { "failure" };
            print_response(reload).await?;
            let res = post("/reload/release").json(&json!({ "outcome": outcome })).send().await?;
            print_response(res).await?;
        }
        Commands::Changeset { id } => {
            let res = client
                .get(format!("{}/v1/changesets/{}", base, id))
                .headers(headers.clone())
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Live => print_response(post("/live").send().await?).await?,
        Commands::NotLive => {
            let res = client
                .delete(format!("{}/v1/live", base))
                .headers(headers.clone())
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Start => print_response(post("/proxy/start").send().await?).await?,
        Commands::Kill => print_response(post("/proxy/kill").send().await?).await?,
        Commands::Health => {
            let res = client.head(format!("{}/health", base)).send().await?;
            println!("{}", if res.status().is_success() { "live" } else { "not live" });
        }
    }

    Ok(())
}

/// Wrap a route list (or complete an existing batch) with id and mode.
fn build_batch(parsed: Value, id: Option<String>, batched: bool) -> Value {
    let mut batch = match parsed {
        Value::Array(routes) => json!({ "routes": routes }),
        other => other,
    };

    let id = id.or_else(|| batched.then(|| uuid::Uuid::new_v4().to_string()));
    if let Some(obj) = batch.as_object_mut() {
        if let Some(id) = id {
            obj.insert("id".to_string(), Value::String(id));
        }
        if batched {
            obj.insert("mode".to_string(), Value::String("batched".to_string()));
        }
    }
    batch
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: conductor API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
