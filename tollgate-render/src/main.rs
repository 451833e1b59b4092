use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tollgate_core::{LogFormat, TollgateConfig};
use tollgate_observability::{AccessFileConfig, AccessFileWriter, formatter_for};
use tollgate_render::{LineSink, StreamSink, render_lines};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tollgate-render", version, about = "Render request records as access-log lines")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/tollgate/tollgate.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output format (overrides the config file)
    #[arg(short, long)]
    format: Option<LogFormat>,

    /// JSON-lines input file. Reads stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Access log file (overrides the config file). Writes stdout when neither is set.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ── stdout is reserved for access-log lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // ── Config ──
    let mut config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        TollgateConfig::load(&cli.config)?
    } else {
        TollgateConfig::default()
    };
    if let Some(format) = cli.format {
        config.access_log.format = format;
    }
    if let Some(output) = cli.output {
        config.access_log.file_path = Some(output);
    }

    let formatter = formatter_for(config.access_log.format);

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut sink: Box<dyn LineSink> = match AccessFileConfig::from_access_log(&config.access_log) {
        Some(file_config) => Box::new(AccessFileWriter::new(file_config)?),
        None => Box::new(StreamSink(io::stdout().lock())),
    };

    let summary = render_lines(input, formatter.as_ref(), sink.as_mut())?;
    info!(
        format = ?config.access_log.format,
        rendered = summary.rendered,
        skipped = summary.skipped,
        "Done"
    );

    if summary.skipped > 0 {
        anyhow::bail!("{} record(s) could not be formatted", summary.skipped);
    }
    Ok(())
}
