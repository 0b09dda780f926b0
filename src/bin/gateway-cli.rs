use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the contract gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8040", env = "GATEWAY_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured networks
    Networks,
    /// List configured identities
    Users,
    /// List compiled contracts
    Contracts,
    /// List recorded deployments
    Metadata,
    /// Show the block explorer of a network
    Explorer { network: String },
    /// Upload and compile a Solidity source file
    Compile { file: PathBuf },
    /// Deploy a compiled contract and wait for confirmation
    Deploy {
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        contract: String,
        #[arg(short = 'u', long)]
        user: String,
        /// Constructor arguments, each parsed as JSON when possible
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Networks => client.get(format!("{base}/networks")).send().await?,
        Commands::Users => client.get(format!("{base}/users")).send().await?,
        Commands::Contracts => {
            client
                .get(format!("{base}/contracts/compiled_contracts"))
                .send()
                .await?
        }
        Commands::Metadata => client.get(format!("{base}/contracts/metadata")).send().await?,
        Commands::Explorer { network } => {
            client
                .get(format!("{base}/explorer"))
                .query(&[("network", network)])
                .send()
                .await?
        }
        Commands::Compile { file } => {
            let filename = file
                .file_name()
                .and_then(|f| f.to_str())
                .ok_or("file path has no file name")?
                .to_string();
            let content = tokio::fs::read(&file).await?;
            let part = reqwest::multipart::Part::bytes(content).file_name(filename);
            let form = reqwest::multipart::Form::new().part("file", part);
            client
                .post(format!("{base}/contracts/compile"))
                .multipart(form)
                .send()
                .await?
        }
        Commands::Deploy {
            network,
            contract,
            user,
            args,
        } => {
            let constructor_args: Vec<Value> = args.iter().map(|a| parse_arg(a)).collect();
            client
                .post(format!("{base}/contracts/deploy"))
                .json(&json!({
                    "network_name": network,
                    "contract_name": contract,
                    "user": user,
                    "constructor_args": constructor_args,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

/// `42` and `true` stay typed; anything that is not JSON is a string.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
