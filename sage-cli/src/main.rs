use clap::Parser;
use sage_cli::{Cli, Command, LogFormat, env_file_problem};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_problem = env_file_problem(dotenvy::dotenv());
    let cli = Cli::parse();

    let logging = match (cli.global.log_format, cli.command()) {
        (LogFormat::Json, _) => sage_telemetry::init_json("sage"),
        (LogFormat::Text, Command::Chat) => sage_telemetry::init_with_level("sage", "warn"),
        (LogFormat::Text, _) => sage_telemetry::init_telemetry("sage"),
    };
    if let Err(e) = logging {
        eprintln!("failed to initialise logging: {e}");
    }
    if let Some(e) = env_problem {
        tracing::warn!(error = %e, "could not load .env file");
    }

    sage_cli::run(cli).await
}
