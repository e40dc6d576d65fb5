use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "failtriage")]
#[command(about = "Deterministic test-failure triage for CI", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify failing tests and decide whether the build should fail
    Analyze {
        /// TestNG or JUnit XML reports (paths or glob patterns)
        #[arg(required = true)]
        reports: Vec<String>,

        /// Framework logs to correlate with failures (repeatable)
        #[arg(short, long = "log")]
        logs: Vec<PathBuf>,

        /// Application (system under test) logs (repeatable)
        #[arg(long = "app-log")]
        app_logs: Vec<PathBuf>,

        /// Rule pack to use instead of detecting the framework
        #[arg(long)]
        framework: Option<String>,

        /// JSON file of advisory AI classifications keyed by test id
        #[arg(long = "ai-signals")]
        ai_signals: Option<PathBuf>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CI platform annotations are rendered for
        #[arg(short, long, value_enum)]
        platform: Option<PlatformChoice>,

        /// Configuration file (defaults to .failtriage.toml discovery)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// History snapshot file (overrides the configured path)
        #[arg(long, env = "FAILTRIAGE_HISTORY")]
        history: Option<PathBuf>,

        /// Do not read or write failure history
        #[arg(long = "no-history")]
        no_history: bool,

        /// Disable colors and Unicode markers
        #[arg(long)]
        plain: bool,

        /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect or prune the failure history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Inspect rule packs
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List recorded failure signatures
    Show {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// History snapshot file
        #[arg(long, env = "FAILTRIAGE_HISTORY")]
        history: Option<PathBuf>,

        /// Only signatures of this test id
        #[arg(long)]
        test: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Drop signatures not seen within the retention window
    Cleanup {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// History snapshot file
        #[arg(long, env = "FAILTRIAGE_HISTORY")]
        history: Option<PathBuf>,

        /// Retention window in days (defaults to the configured value)
        #[arg(long = "retention-days")]
        retention_days: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// List the packs that resolve for every known framework
    List {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the rules of the pack resolved for a framework
    Show {
        framework: String,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Terminal,
}

impl From<OutputFormat> for crate::io::output::OutputFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Json => crate::io::output::OutputFormat::Json,
            OutputFormat::Markdown => crate::io::output::OutputFormat::Markdown,
            OutputFormat::Terminal => crate::io::output::OutputFormat::Terminal,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformChoice {
    /// Detect from GITHUB_ACTIONS, GITLAB_CI or TF_BUILD
    Auto,
    Github,
    Gitlab,
    Azure,
    Markdown,
    Plain,
}

impl PlatformChoice {
    /// `None` for `auto`.
    pub fn platform(self) -> Option<crate::ci::Platform> {
        use crate::ci::Platform;
        match self {
            PlatformChoice::Auto => None,
            PlatformChoice::Github => Some(Platform::Github),
            PlatformChoice::Gitlab => Some(Platform::Gitlab),
            PlatformChoice::Azure => Some(Platform::Azure),
            PlatformChoice::Markdown => Some(Platform::Markdown),
            PlatformChoice::Plain => Some(Platform::Plain),
        }
    }
}
