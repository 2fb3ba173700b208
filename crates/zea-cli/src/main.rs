//! ZEA node CLI application.

mod cli;

use clap::Parser as _;
use cli::{Cli, Commands, params_dir_or_default};
use rand::rngs::OsRng;
use zea_proofs::{CircuitKind, ParamsRegistry};

fn init_tracing() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_target(false)
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize tracing: {:?}", e))?;
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> eyre::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Node { args } => zea_node::node::run(args.into_config())
            .await
            .map_err(eyre::Report::from),
        Commands::Setup { params_dir } => {
            let dir = params_dir_or_default(params_dir);
            tokio::task::spawn_blocking(move || {
                ParamsRegistry::load_or_generate(&dir, &CircuitKind::ALL, &mut OsRng)
                    .map(|_| ())
                    .map_err(eyre::Report::from)
            })
            .await
            .map_err(|e| eyre::eyre!("setup interrupted: {e}"))?
        }
    };

    if let Err(e) = res {
        tracing::error!("Error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
