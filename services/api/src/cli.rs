use crate::demo::{run_demo, run_parse, DemoArgs, ParseArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use credential_verify::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "credential-verify",
    about = "Run and exercise the professional credential verification service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run the certificate attribute parser over a text transcript
    Parse(ParseArgs),
    /// Walk through every verification strategy and a review against in-memory stores
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Parse(args) => run_parse(args),
        Command::Demo(args) => run_demo(args),
    }
}
