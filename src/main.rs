use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use revai_stream::{ClientConfig, RevAiClient, SessionConfig, StreamError};

/// Stream an audio file to Rev.ai and print transcripts as JSON lines
#[derive(Parser, Debug)]
#[command(name = "revai-stream")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Audio file to stream
    #[arg(value_name = "AUDIO")]
    audio: PathBuf,

    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Content type of the audio
    #[arg(long, default_value = "audio/x-wav")]
    content_type: String,

    /// Metadata attached to the session
    #[arg(long)]
    metadata: Option<String>,

    /// Mask profanity in transcripts
    #[arg(long)]
    filter_profanity: bool,

    /// Drop disfluencies ("um", "uh") from transcripts
    #[arg(long)]
    remove_disfluencies: bool,

    /// Custom vocabulary to apply
    #[arg(long)]
    custom_vocabulary_id: Option<String>,

    /// Bytes per audio frame
    #[arg(long, default_value_t = 64_000)]
    chunk_size: usize,

    /// Pause between audio frames, in milliseconds
    #[arg(long, default_value_t = 900)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    if cli.chunk_size == 0 {
        anyhow::bail!("--chunk-size must be greater than zero");
    }

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ClientConfig::from_file(path)?
        }
        None => ClientConfig::from_env()?,
    };

    let mut session = SessionConfig::new(cli.content_type.clone())
        .with_filter_profanity(cli.filter_profanity)
        .with_remove_disfluencies(cli.remove_disfluencies);
    if let Some(metadata) = &cli.metadata {
        session = session.with_metadata(metadata.clone());
    }
    if let Some(id) = &cli.custom_vocabulary_id {
        session = session.with_custom_vocabulary_id(id.clone());
    }

    let mut audio = tokio::fs::File::open(&cli.audio)
        .await
        .with_context(|| format!("Failed to open {}", cli.audio.display()))?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, shutting down");
            ctrl_c_cancel.cancel();
        }
    });

    let client = RevAiClient::new(config);
    let conn = Arc::new(client.stream().dial(&session, &cancel).await?);

    let reader_conn = conn.clone();
    let reader = tokio::spawn(async move {
        loop {
            match reader_conn.receive().await {
                Ok(Some(message)) => match serde_json::to_string(&message) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("Failed to encode transcript: {}", e),
                },
                Ok(None) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    });

    let interval = Duration::from_millis(cli.interval_ms);
    let mut buffer = vec![0u8; cli.chunk_size];
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let read = audio
            .read(&mut buffer)
            .await
            .with_context(|| format!("Failed to read {}", cli.audio.display()))?;
        if read == 0 {
            conn.signal_end_of_input().await?;
            break;
        }

        match conn.write_audio(buffer[..read].to_vec()).await {
            Ok(()) => {}
            // The session ended underneath us; the reader reports why
            Err(StreamError::InvalidState { .. }) => break,
            Err(e) => return Err(e.into()),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    let outcome = if cancel.is_cancelled() {
        conn.close().await?;
        reader.await?
    } else {
        tokio::select! {
            result = reader => result?,
            _ = cancel.cancelled() => {
                conn.close().await?;
                Ok(())
            }
        }
    };

    conn.close().await?;

    match outcome {
        Ok(()) => {
            info!("Stream finished");
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            Err(anyhow!(e).context("Session ended; a new session may succeed"))
        }
        Err(e) => Err(e.into()),
    }
}
