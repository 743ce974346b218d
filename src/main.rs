use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

use podsync::logging::{Verbosity, init_logging};
use podsync::{
    Config, DownloadError, DownloadOutcome, Downloader, FfmpegTranscoder, Id3Tagger,
    PartialConfig, ProgressEvent, ProgressReporter, ReqwestClient, SharedProgressReporter,
    SourceRegistry,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "[>] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static STOP: Emoji<'_, '_> = Emoji("⏹️  ", "[-] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Exit status for a run interrupted with Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Download podcast episodes from player.fm, Podbean, YouTube or direct links
#[derive(Parser, Debug)]
#[command(name = "podsync")]
#[command(about = "Download podcast episodes, re-timed and tagged")]
#[command(version)]
struct Args {
    /// TOML config file with defaults and per-series overrides
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More output; repeat for even more (-vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a single episode
    Download {
        /// Episode page, video or audio file URL
        url: String,

        /// Output directory, overriding the config file
        path: Option<PathBuf>,

        /// Playback speed factor, e.g. 1.5
        #[arg(short, long)]
        speedup: Option<f64>,
    },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "  {GEAR}[{{bar:30.cyan/blue}}] {{percent:>3}}% {{wide_msg}}"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▓░")
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::SourceResolved { url, source_name } => {
                self.bar.set_message(format!(
                    "{SEARCH}Reading {} via {}",
                    url.cyan(),
                    source_name.bold()
                ));
            }

            ProgressEvent::MetadataRead {
                series_title,
                episode_title,
            } => {
                self.bar.println(format!(
                    "{HEADPHONES}{} • {}",
                    series_title.bold().green(),
                    truncate_title(&episode_title, 60)
                ));
            }

            ProgressEvent::TranscodeStarted {
                destination,
                duration_seconds,
            } => {
                match duration_seconds {
                    Some(total) => {
                        self.bar.set_style(bar_style());
                        self.bar.set_length(total);
                        self.bar.set_position(0);
                    }
                    None => self.bar.set_style(spinner_style()),
                }
                let name = destination
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.bar
                    .set_message(format!("{GEAR}{}", truncate_title(&name, 50)));
            }

            ProgressEvent::TranscodeProgress {
                processed_seconds,
                duration_seconds,
            } => match duration_seconds {
                Some(total) => {
                    self.bar.set_position(processed_seconds.min(total));
                }
                None => {
                    self.bar
                        .set_message(format!("{GEAR}{} processed", clock(processed_seconds)));
                }
            },

            ProgressEvent::TranscodeCompleted { .. } => {
                self.bar.set_style(spinner_style());
                self.bar.set_message("Writing tags".to_string());
            }

            ProgressEvent::TranscodeTerminated { destination } => {
                self.bar.abandon_with_message(format!(
                    "{STOP}{} partial file left at {}",
                    "Interrupted:".yellow().bold(),
                    destination.display().to_string().yellow()
                ));
            }

            ProgressEvent::TranscodeFailed { error } => {
                self.bar.abandon_with_message(format!(
                    "{FAILURE}{}",
                    truncate_title(error.lines().next().unwrap_or_default(), 70).red()
                ));
            }

            ProgressEvent::Tagged { destination } => {
                self.bar.finish_and_clear();
                println!(
                    "{SUCCESS}{} {}",
                    "Saved".bold().green(),
                    destination.display().to_string().cyan()
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Seconds as `h:mm:ss` or `m:ss`
fn clock(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

async fn run(args: Args, verbosity: Verbosity) -> Result<DownloadOutcome> {
    let Command::Download {
        url,
        path,
        speedup,
    } = args.command;

    let command_line = PartialConfig {
        download_path: path,
        verbose: (args.verbose > 0).then_some(args.verbose),
        speedup,
    };
    let config = Config::load(command_line, args.config.as_deref())
        .context("Failed to load configuration")?;
    verbosity.set(config.for_series(None)?.verbose);

    let reporter: SharedProgressReporter = Arc::new(IndicatifReporter::new());
    let downloader = Downloader::new(
        SourceRegistry::with_defaults(ReqwestClient::new()),
        FfmpegTranscoder::default(),
        Id3Tagger,
        reporter,
    )
    .with_verbosity(verbosity);

    downloader
        .download(&config, &url)
        .await
        .with_context(|| format!("Failed to download {url}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let verbosity = init_logging(args.verbose);

    println!(
        "\n{}{} {}\n",
        MICROPHONE,
        "podsync".bold().magenta(),
        "- Podcast Downloader".dimmed()
    );

    match run(args, verbosity).await {
        Ok(DownloadOutcome::Completed { path }) => {
            let folder = path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("\n{FOLDER}Output: {}\n", folder.cyan());
            ExitCode::SUCCESS
        }
        Ok(DownloadOutcome::Cancelled { .. }) => ExitCode::from(EXIT_INTERRUPTED),
        Err(error) => {
            eprintln!("\n{FAILURE}{} {error:#}", "Error:".red().bold());
            if let Some(snapshot) = error
                .downcast_ref::<DownloadError>()
                .and_then(|e| match e {
                    DownloadError::Source(source) => source.snapshot(),
                    _ => None,
                })
            {
                eprintln!(
                    "  Page saved for inspection: {}",
                    snapshot.display().to_string().yellow()
                );
            }
            ExitCode::FAILURE
        }
    }
}
