use anyhow::{anyhow, Context, Result};
use chaos_reviewer::bridge::Bridge;
use chaos_reviewer::config::{self, Config};
use chaos_reviewer::keyring;
use chaos_reviewer::llm::{PromptStyle, ProviderChain};
use chaos_reviewer::reply::Reviewer;
use chaos_reviewer::util::mask_tail;
use chaos_reviewer::{logging, server, transport};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "chaos",
    about = "Paste a build or test log, get a one-line fix and a remark",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Plain, professional wording for generated text
    #[arg(long, global = true)]
    neutral: bool,

    /// Never call a language model; use the built-in fix table only
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one message (argument, or stdin when omitted) and exit
    Triage {
        text: Option<String>,
    },
    /// Interactive chat on stdin/stdout; end each message with an empty line
    Chat,
    /// Run the webhook (POST /chaos, GET /health)
    Serve {
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: SocketAddr,
    },
    /// Poll the shared request document and write replies back
    Bridge,
    /// Show configuration and check which provider answers
    Doctor,
    /// Store the ASI:One API key in the system keychain
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    if let Commands::Setup = cli.command {
        return config::setup_api_key_interactive().map_err(|e| anyhow!(e));
    }

    let config = Config::load();
    let reviewer = build_reviewer(&config, &cli.global);

    match cli.command {
        Commands::Triage { text } => run_triage(&reviewer, text).await,
        Commands::Chat => {
            transport::run_chat(
                &reviewer,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
            Ok(())
        }
        Commands::Serve { addr } => server::serve(Arc::new(reviewer), addr).await,
        Commands::Bridge => {
            let mut bridge =
                Bridge::from_config(&config).context("bridge needs request and response URLs")?;
            bridge.run(&reviewer).await
        }
        Commands::Doctor => run_doctor(&config, &reviewer).await,
        Commands::Setup => Ok(()),
    }
}

fn build_reviewer(config: &Config, global: &GlobalArgs) -> Reviewer {
    let chain = if global.offline {
        info!("offline mode; providers disabled");
        ProviderChain::offline()
    } else {
        ProviderChain::from_config(config)
    };
    let style = if global.neutral {
        PromptStyle::Neutral
    } else {
        config.prompt_style()
    };
    Reviewer::new(chain, style)
}

async fn run_triage(reviewer: &Reviewer, text: Option<String>) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read stdin")?;
            buffer
        }
    };

    match reviewer.respond(&text).await {
        Some(reply) => {
            for line in reply.lines() {
                println!("{}", line);
            }
        }
        None => info!("nothing to triage"),
    }
    Ok(())
}

async fn run_doctor(config: &Config, reviewer: &Reviewer) -> Result<()> {
    println!();
    println!("  chaos-reviewer {}", env!("CARGO_PKG_VERSION"));
    println!("  config:   {}", Config::config_location());
    println!("  keychain: {}", keyring::credentials_store_label());
    println!("  style:    {:?}", reviewer.style());
    match config.api_key() {
        Some(key) => println!("  ASI:One:  key {} | model {}", mask_tail(&key, 6), config.asi1_model),
        None => println!("  ASI:One:  no key"),
    }
    match &config.ollama_base_url {
        Some(base) => println!("  Ollama:   {} | model {}", base, config.ollama_model),
        None => println!("  Ollama:   not configured"),
    }
    println!();

    let chain = reviewer.chain();
    if chain.is_empty() {
        println!("  no providers; replies use the built-in fix table");
        println!();
        return Ok(());
    }

    println!("  pinging {} provider adapter(s)...", chain.len());
    match chain.ping().await {
        Some(generated) => println!("  + {} answered: {}", generated.provider, generated.text),
        None => println!("  x no provider answered; replies use the built-in fix table"),
    }
    println!();
    Ok(())
}
