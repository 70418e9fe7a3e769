//! modelfile-client - command line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use modelfile_client::{
    Client, ClientConfig, CreateRequest, CreateResponse, config::normalize_host,
    digest::digest_file,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modelfile-client")]
#[command(about = "Create models from modelfiles, uploading local weights as blobs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override server host (e.g. http://127.0.0.1:11434)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "json", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a model from a modelfile
    Create {
        /// Name of the model to create
        model: String,

        /// Modelfile to read
        #[arg(short, long, default_value = "Modelfile")]
        file: PathBuf,

        /// Quantization level to apply on the server
        #[arg(short, long)]
        quantize: Option<String>,

        /// Wait for the final status instead of printing progress
        #[arg(long)]
        no_stream: bool,
    },
    /// Print the blob digest of a file
    Digest {
        file: PathBuf,
    },
    /// Upload a file as a blob unless the server already has it
    PushBlob {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
    }

    // Load configuration
    let mut config = ClientConfig::load(cli.config).context("Failed to load configuration")?;

    // CLI overrides
    if let Some(host) = cli.host {
        config.host = normalize_host(&host);
    }

    config.validate().context("Invalid configuration")?;

    tracing::debug!(
        host = %config.host,
        timeout_secs = config.timeout_secs,
        upload_chunk_size = config.upload_chunk_size,
        "Configuration loaded"
    );

    match cli.command {
        Command::Digest { file } => {
            let digest = digest_file(&file, config.upload_chunk_size)
                .await
                .with_context(|| format!("Failed to digest {:?}", file))?;
            println!("{}", digest);
        }
        Command::PushBlob { file } => {
            let client = Client::new(&config).context("Failed to create client")?;
            let digest = client
                .ensure_blob(&file)
                .await
                .with_context(|| format!("Failed to push blob {:?}", file))?;
            println!("{}", digest);
        }
        Command::Create {
            model,
            file,
            quantize,
            no_stream,
        } => {
            let client = Client::new(&config).context("Failed to create client")?;

            let mut request = CreateRequest::from_path(&model, file).streaming(!no_stream);
            if let Some(level) = quantize {
                request = request.quantize(level);
            }

            let response = client
                .create(request)
                .await
                .with_context(|| format!("Failed to create model '{}'", model))?;

            match response {
                CreateResponse::Single(resp) => println!("{}", resp.status),
                CreateResponse::Stream(mut events) => {
                    while let Some(event) = events.next().await {
                        let event = event.context("Model creation failed")?;
                        match (event.completed, event.total) {
                            (Some(done), Some(total)) => {
                                println!("{} {}/{}", event.status, done, total)
                            }
                            _ => println!("{}", event.status),
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
