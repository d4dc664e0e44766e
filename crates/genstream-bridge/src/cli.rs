use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "genstream-bridge", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// Buffering margin (seconds) between "now" and the first scheduled segment
    #[arg(long, default_value_t = 2.0)]
    pub lookahead_seconds: f64,

    /// Extra scheduling window past the lookahead (seconds)
    #[arg(long, default_value_t = 1.0)]
    pub horizon_slack_seconds: f64,

    /// Max start-time slip (seconds) before the scheduler resyncs the timeline
    #[arg(long, default_value_t = 0.1)]
    pub underrun_tolerance_seconds: f64,

    /// Control tick interval in milliseconds
    #[arg(long, default_value_t = 20)]
    pub control_tick_ms: u64,

    /// Scheduler tick interval in milliseconds
    #[arg(long, default_value_t = 50)]
    pub scheduler_tick_ms: u64,

    /// Fallback prompt used when no external prompt list is supplied
    #[arg(long, default_value = "ambient soundscape")]
    pub prompt: String,

    /// Weight of the fallback prompt
    #[arg(long, default_value_t = 1.0)]
    pub prompt_weight: f64,

    /// Musical scale wire name, e.g. C_MAJOR_A_MINOR
    #[arg(long)]
    pub scale: Option<String>,

    #[arg(long)]
    pub brightness: Option<f64>,

    #[arg(long)]
    pub density: Option<f64>,

    /// Generation seed; 0 means automatic
    #[arg(long)]
    pub seed: Option<f64>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub guidance: Option<f64>,

    #[arg(long)]
    pub top_k: Option<f64>,

    #[arg(long)]
    pub bpm: Option<f64>,

    /// Mute the bass track
    #[arg(long)]
    pub mute_bass: bool,

    /// Mute the drums track
    #[arg(long)]
    pub mute_drums: bool,

    /// Keep only bass and drums
    #[arg(long)]
    pub only_bass_and_drums: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the control loop against the built-in simulated generator
    Run {
        /// Stop automatically after this many seconds (runs until Ctrl-C when absent)
        #[arg(long)]
        duration_seconds: Option<u64>,
    },

    /// List output devices and exit
    ListDevices,

    /// Print the resolved static configuration as JSON and exit
    DumpConfig,
}
