//! CLI binary for Lucy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lucy::senses::{Mimic3Tts, Senses, TtsProvider, decode_audio_bytes};
use lucy::tools::{Automation, Capabilities, XdotoolAutomation, register_default_tools};
use lucy::{LucyConfig, Orchestrator, TurnStage, llm, lucy_dirs};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Lucy: voice and text assistant with tools.
#[derive(Parser)]
#[command(name = "lucy", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session user for history and facts.
    #[arg(short, long)]
    user: Option<String>,

    /// Model override for this session.
    #[arg(short, long)]
    model: Option<String>,

    /// Synthesize replies with mimic3.
    #[arg(long)]
    speak: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Interactive text conversation.
    Chat,

    /// Run a single turn and print the reply.
    Ask {
        /// What to say.
        text: Vec<String>,

        /// Write the spoken reply to this WAV file (needs --speak).
        #[arg(long)]
        wav_out: Option<PathBuf>,
    },

    /// Run a voice turn from an audio file (any format ffmpeg reads).
    Listen {
        /// Audio file to transcribe.
        file: PathBuf,
    },

    /// List models served by the configured backend.
    Models,

    /// List registered tools.
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(LucyConfig::default_config_path);
    let config = LucyConfig::load_or_default(&config_path)?;

    match cli.command {
        None | Some(Command::Chat) => run_chat(&cli, &config).await,
        Some(Command::Ask { ref text, ref wav_out }) => {
            run_ask(&cli, &config, &text.join(" "), wav_out.as_deref()).await
        }
        Some(Command::Listen { ref file }) => run_listen(&cli, &config, file).await,
        Some(Command::Models) => list_models(&config).await,
        Some(Command::Tools) => list_tools(&config),
    }
}

/// Log to stderr and to a daily file under the logs directory.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lucy=info,lucy_search=warn"));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let logs = lucy_dirs::logs_dir();
    if std::fs::create_dir_all(&logs).is_err() {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return None;
    }
    let (file, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs, "lucy.log"));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();
    Some(guard)
}

fn capabilities(config: &LucyConfig) -> Capabilities {
    let timeout = Duration::from_secs(config.tools.window_timeout_secs);
    let automation = XdotoolAutomation::detect(timeout).map(|a| Arc::new(a) as Arc<dyn Automation>);
    Capabilities {
        vision: None,
        automation,
    }
}

fn build_orchestrator(cli: &Cli, config: &LucyConfig) -> anyhow::Result<Orchestrator> {
    let tts = cli
        .speak
        .then(|| Arc::new(Mimic3Tts::new(&config.tts)) as Arc<dyn TtsProvider>);
    let senses = Senses::new(None, tts);
    Ok(Orchestrator::from_config(config, capabilities(config), senses)?)
}

async fn run_chat(cli: &Cli, config: &LucyConfig) -> anyhow::Result<()> {
    println!("Lucy v{}", env!("CARGO_PKG_VERSION"));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<TurnStage>(16);
    let orchestrator = build_orchestrator(cli, config)?.with_status(tx);
    tokio::spawn(async move {
        while let Some(stage) = rx.recv().await {
            eprintln!("  {}", stage.label());
        }
    });

    println!("Escribí tu mensaje. Ctrl+D para salir.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let turn = orchestrator
            .process_text(&line, cli.user.as_deref(), cli.model.as_deref())
            .await;
        println!("\nLucy: {}\n", turn.reply);
    }
    Ok(())
}

async fn run_ask(
    cli: &Cli,
    config: &LucyConfig,
    text: &str,
    wav_out: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(cli, config)?;
    let turn = orchestrator
        .process_text(text, cli.user.as_deref(), cli.model.as_deref())
        .await;
    println!("{}", turn.reply);
    if !turn.tools_used.is_empty() {
        eprintln!("tools: {}", turn.tools_used.join(", "));
    }
    if let Some(path) = wav_out {
        if turn.reply_wav.is_empty() {
            anyhow::bail!("no audio was synthesized (use --speak and install mimic3)");
        }
        tokio::fs::write(path, &turn.reply_wav).await?;
        eprintln!("audio: {}", path.display());
    }
    Ok(())
}

async fn run_listen(cli: &Cli, config: &LucyConfig, file: &std::path::Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file).await?;
    let (samples, sample_rate) = decode_audio_bytes(&bytes, config.audio.sample_rate).await?;
    tracing::info!(samples = samples.len(), sample_rate, "audio decoded");

    let orchestrator = build_orchestrator(cli, config)?;
    let turn = orchestrator
        .process_audio(&samples, sample_rate, cli.user.as_deref(), cli.model.as_deref())
        .await;
    if !turn.transcript.is_empty() {
        eprintln!("transcript: {}", turn.transcript);
    }
    println!("{}", turn.reply);
    Ok(())
}

async fn list_models(config: &LucyConfig) -> anyhow::Result<()> {
    let provider = llm::build_provider(config, Vec::new())?;
    for model in provider.list_models().await? {
        println!("{model}");
    }
    Ok(())
}

fn list_tools(config: &LucyConfig) -> anyhow::Result<()> {
    let registry = register_default_tools(config, capabilities(config))?;
    for name in registry.names() {
        let description = registry
            .get(name)
            .map(|h| h.description().to_owned())
            .unwrap_or_default();
        println!("{name:<22} {description}");
    }
    Ok(())
}
