mod commands;
mod helpers;

use clap::Parser;
use hysplit_core::domain::PipelineError;

pub fn run_from_env() -> i32 {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let pipeline_error = error.as_pipeline_error();
            eprintln!("{}", pipeline_error.diagnostic_line());
            if let Some(summary_line) = pipeline_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            pipeline_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("hysplit-web".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
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
    name = "hysplit-web",
    version,
    about = "Run HYSPLIT simulations and publish their contours"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run trajectory and concentration phases for one release
    Run(commands::RunArgs),
    /// Print a template control file bound to release parameters
    Bind(commands::BindArgs),
    /// Contour and store the outputs of a catalog site
    Postprocess(commands::PostprocessArgs),
    /// Print the stored metadata document of a simulation
    Metadata(commands::MetadataArgs),
    /// Print the stored contour topology of one slice
    Contours(commands::ContoursArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_simulation_command(args),
        CliCommand::Bind(args) => commands::run_bind_command(args),
        CliCommand::Postprocess(args) => commands::run_postprocess_command(args),
        CliCommand::Metadata(args) => commands::run_metadata_command(args),
        CliCommand::Contours(args) => commands::run_contours_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Pipeline(PipelineError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_pipeline_error(&self) -> PipelineError {
        match self {
            Self::Usage(message) => {
                PipelineError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Pipeline(error) => error.clone(),
            Self::Internal(error) => PipelineError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
