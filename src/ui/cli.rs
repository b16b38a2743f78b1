//! Command-line interface implementation

use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::plan::{AnalysisResponse, SegmentPlan, TrackSummary};
use crate::radio::RadioStateUpdate;

/// Command-line arguments for r-radiocli
#[derive(Parser, Debug)]
#[command(author, version, about = "AI radio: plays planned song segments with spoken commentary", long_about = None)]
pub struct Args {
    /// Segmentation service response (JSON, optionally in a ```json fence)
    #[arg(short, long)]
    pub plan: PathBuf,

    /// Track list the plan was generated from; remaps segment ids by position
    #[arg(short, long)]
    pub tracks: Option<PathBuf>,

    /// Remote playback device id
    #[arg(short, long, env = "RADIOCLI_DEVICE_ID")]
    pub device_id: Option<String>,

    /// Web API access token
    #[arg(short, long, env = "RADIOCLI_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    /// Web API base URL
    #[arg(long, env = "RADIOCLI_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Config file path
    #[arg(short, long, env = "RADIOCLI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use the simulated device instead of the Web API
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Overrides file settings with values given on the command line.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(device_id) = &self.device_id {
            settings.device_id = Some(device_id.clone());
        }
        if let Some(token) = &self.access_token {
            settings.access_token = Some(token.clone());
            // A token from the command line carries no known expiry
            settings.access_token_expires_at = None;
        }
        if let Some(url) = &self.api_base_url {
            settings.api_base_url = url.clone();
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::default_path)
    }
}

/// Reads a plan file, remapping it onto `tracks_path` when given.
pub fn read_plan(plan_path: &Path, tracks_path: Option<&Path>) -> Result<SegmentPlan, Box<dyn Error>> {
    let response = AnalysisResponse::parse(&fs::read_to_string(plan_path)?)?;
    let plan = match tracks_path {
        Some(path) => {
            let tracks: Vec<TrackSummary> = serde_json::from_str(&fs::read_to_string(path)?)?;
            SegmentPlan::from_analysis(&response, &tracks)?
        }
        None => SegmentPlan::from_analysis_untracked(&response)?,
    };
    Ok(plan)
}

/// Formats seconds as `m:ss`.
pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli { args: Args::parse() }
    }

    /// Display the plan about to be played
    pub fn display_plan(&self, plan: &SegmentPlan) {
        println!("\nRadio plan:");
        println!("{:<5} {:<30} {:<15} {}", "#", "Track", "Window", "ID");
        println!("{}", "-".repeat(80));

        for (index, segment) in plan.segments().iter().enumerate() {
            let name = if segment.track_name.chars().count() > 28 {
                format!("{:.25}...", segment.track_name)
            } else {
                segment.track_name.clone()
            };
            let window = format!(
                "{}-{}",
                format_seconds(segment.start_offset_seconds),
                format_seconds(segment.end_offset_seconds)
            );
            println!("{:<5} {:<30} {:<15} {}", index + 1, name, window, segment.track_id);
            if let Some(entry) = plan.commentary_after(index) {
                println!("      [commentary] {}", entry.text);
            }
        }
        println!(
            "\n{} segments, {} of music, {} commentary breaks\n",
            plan.len(),
            format_seconds(plan.total_music_seconds()),
            plan.commentary_count()
        );
        println!("Press Ctrl+C to stop the show");
    }

    /// Line to print for a state update, if any
    pub fn format_update(&self, update: &RadioStateUpdate) -> Option<String> {
        match update {
            RadioStateUpdate::PhaseChanged { phase, index: Some(index) } => {
                Some(format!("[{}] {}", index + 1, phase))
            }
            RadioStateUpdate::PhaseChanged { phase, index: None } => Some(format!("[-] {}", phase)),
            RadioStateUpdate::Progress { .. } => None,
            RadioStateUpdate::CommentaryStarted { after_index, .. } => {
                Some(format!("[{}] on air", after_index + 1))
            }
            RadioStateUpdate::Error(message) => Some(format!("Error: {}", message)),
            RadioStateUpdate::Stopped => Some("Radio stopped.".to_string()),
        }
    }

    /// Display a state update
    pub fn display_update(&self, update: &RadioStateUpdate) {
        if let Some(line) = self.format_update(update) {
            println!("{}", line);
        }
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
