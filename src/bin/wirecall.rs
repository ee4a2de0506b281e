use clap::Parser;
use tracing_subscriber::EnvFilter;

use wirecall::cli::{Cli, CliTool};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = CliTool::new().run(cli).await;
    std::process::exit(code);
}
