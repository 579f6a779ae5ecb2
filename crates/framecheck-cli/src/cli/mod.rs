mod commands;
mod helpers;

use clap::Parser;
use framecheck_core::domain::CheckError;

pub fn run_from_env() -> i32 {
    let args = std::env::args().collect::<Vec<_>>();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let check_error = error.as_check_error();
            for line in check_error.diagnostic_lines() {
                eprintln!("{}", line);
            }
            check_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "framecheck",
    version,
    about = "Frame-by-frame regression checks for image and table outputs"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Compare two image files
    Image(commands::ImageArgs),
    /// Compare every frame image of a result directory against ground truth
    Folders(commands::FoldersArgs),
    /// Compare frame-aligned columns of two CSV tables
    Table(commands::TableArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Image(args) => commands::run_image_command(args),
        CliCommand::Folders(args) => commands::run_folders_command(args),
        CliCommand::Table(args) => commands::run_table_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(CheckError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CheckError> for CliError {
    fn from(error: CheckError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_check_error(&self) -> CheckError {
        match self {
            Self::Usage(message) => CheckError::invalid_input("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => CheckError::io("IO.CLI", format!("{error:#}")),
        }
    }
}
