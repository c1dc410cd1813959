use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "courtfetch")]
#[command(about = "Budget-aware court document acquisition", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $COURTFETCH_CONFIG or config/courtfetch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API and the periodic download loop
    Serve(ServeArgs),
    /// Evaluate a JSON array of discovered items and queue matches
    Evaluate(EvaluateArgs),
    /// Download one batch of queued documents
    Process(ProcessArgs),
    /// Print queue, spend and session status
    Status,
    /// Walk the authentication chain and report the outcome
    Login(LoginArgs),
    /// Fetch and bill a docket sheet
    Docket(DocketArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct EvaluateArgs {
    /// File holding a JSON array of items
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ProcessArgs {
    /// Items to process (defaults to discovery.batch_size)
    #[arg(long)]
    pub max_count: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Court whose site validates the session
    pub court: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DocketArgs {
    pub court: String,
    pub case_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["courtfetch", "process", "--max-count", "3"]);
        assert!(matches!(cli.command, Commands::Process(ProcessArgs { max_count: Some(3) })));

        let cli = Cli::parse_from(["courtfetch", "--config", "x.toml", "docket", "cacd", "2:24-cv-1"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Commands::Docket(args) => {
                assert_eq!(args.court, "cacd");
                assert_eq!(args.case_number, "2:24-cv-1");
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::parse_from(["courtfetch", "serve", "--address", "127.0.0.1:9000"]);
        assert!(matches!(cli.command, Commands::Serve(ServeArgs { address: Some(_) })));
    }
}
