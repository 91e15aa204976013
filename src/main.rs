use anyhow::Result as AnyResult;
use clap::Parser;
use multi_faas_operato_rs::{
    cli::{Cli, Commands, SchemaCommands, StateCommands},
    consts::{DISPLAY_NAME, PKG_VERSION},
    main_actions,
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var(
            "RUST_LOG",
            "multi_faas_operato_rs=info,reqwest=off,hyper=off",
        );
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_level(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

async fn run(cli: Cli) -> AnyResult<()> {
    let Cli {
        gateway_url,
        state_dir,
        credentials,
        command,
    } = cli;

    match command {
        Commands::Deploy { config, function } => {
            let session = main_actions::create_session(
                gateway_url,
                &state_dir,
                credentials,
                &config.config_file,
            )
            .await?;
            main_actions::deploy(session, function).await
        }
        Commands::Remove { config, function } => {
            let session = main_actions::create_session(
                gateway_url,
                &state_dir,
                credentials,
                &config.config_file,
            )
            .await?;
            main_actions::remove(session, function).await
        }
        Commands::Invoke {
            config,
            function,
            region,
            namespace,
            mode,
            event,
        } => {
            let session = main_actions::create_session(
                gateway_url,
                &state_dir,
                credentials,
                &config.config_file,
            )
            .await?;
            main_actions::invoke(session, function, region, namespace, mode, event).await
        }
        Commands::Log {
            config,
            function,
            region,
            namespace,
            qualifier,
        } => {
            let session = main_actions::create_session(
                gateway_url,
                &state_dir,
                credentials,
                &config.config_file,
            )
            .await?;
            main_actions::log(session, function, region, namespace, qualifier).await
        }
        Commands::State { command } => match command {
            StateCommands::Print { config } => {
                let session = main_actions::create_session(
                    gateway_url,
                    &state_dir,
                    credentials,
                    &config.config_file,
                )
                .await?;
                main_actions::print_state(session).await
            }
        },
        Commands::Schema { command } => match command {
            SchemaCommands::Print {} => main_actions::print_schema(),
            SchemaCommands::Write { file } => main_actions::write_schema_to_file(file).await,
        },
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    tracing::debug!(version = PKG_VERSION, "{DISPLAY_NAME}");

    if let Err(error) = run(cli).await {
        tracing::error!("{error:#}");
        std::process::exit(1);
    }
}
