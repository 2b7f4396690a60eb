use anyhow::Result;
use clap::Parser;
use tracing::info;
use workorder_lifecycle::LifecycleError;
use workorder_ops::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(data = %cli.data.display(), "workorder-ops starting");

    match run(cli).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => match err.downcast_ref::<LifecycleError>() {
            // Domain errors go to stdout in their structured form
            Some(lifecycle) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&lifecycle.to_structured())?
                );
                std::process::exit(1);
            }
            None => Err(err),
        },
    }
}
