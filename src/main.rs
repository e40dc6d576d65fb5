use anyhow::Result;
use clap::Parser;
use failtriage::cli::{Cli, Commands, HistoryCommand, RulesCommand};
use failtriage::commands::{self, AnalyzeConfig};
use failtriage::formatting::FormattingConfig;
use failtriage::observability::{init_logging, install_panic_hook};

fn main() {
    install_panic_hook();
    let cli = Cli::parse();
    init_logging(verbosity_of(&cli.command));

    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}

fn verbosity_of(command: &Commands) -> u8 {
    match command {
        Commands::Analyze { verbosity, .. } => *verbosity,
        _ => 0,
    }
}

// Pure function to pick formatting from the --plain flag and environment
fn create_formatting_config(plain: bool) -> FormattingConfig {
    if plain {
        FormattingConfig::plain()
    } else {
        FormattingConfig::from_env()
    }
}

fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Analyze {
            reports,
            logs,
            app_logs,
            framework,
            ai_signals,
            format,
            output,
            platform,
            config,
            history,
            no_history,
            plain,
            verbosity: _,
        } => commands::handle_analyze(AnalyzeConfig {
            reports,
            logs,
            app_logs,
            framework,
            ai_signals,
            format,
            output,
            platform,
            config,
            history,
            no_history,
            formatting_config: create_formatting_config(plain),
        }),
        Commands::Init { force } => commands::init_config(force).map(|_| 0),
        Commands::History { command } => match command {
            HistoryCommand::Show {
                config,
                history,
                test,
                json,
            } => commands::show_history(config, history, test, json).map(|_| 0),
            HistoryCommand::Cleanup {
                config,
                history,
                retention_days,
            } => commands::cleanup_history(config, history, retention_days).map(|_| 0),
        },
        Commands::Rules { command } => match command {
            RulesCommand::List { config } => commands::list_rule_packs(config).map(|_| 0),
            RulesCommand::Show { framework, config } => {
                commands::show_rule_pack(&framework, config).map(|_| 0)
            }
        },
    }
}
