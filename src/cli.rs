use std::path::PathBuf;

use crate::{
    consts::{
        APP_ID_ENV_VAR, GATEWAY_DEFAULT_URL, GATEWAY_URL_ENV_VAR, SECRET_ID_ENV_VAR,
        SECRET_KEY_ENV_VAR, STATE_DEFAULT_DIR, STATE_DIR_ENV_VAR, TOKEN_ENV_VAR,
    },
    types::InvocationMode,
};
use clap::{Args, Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The URL of the platform gateway
    #[clap(short, long, global = true, env = GATEWAY_URL_ENV_VAR, default_value = GATEWAY_DEFAULT_URL)]
    pub gateway_url: Url,

    /// The directory holding the state of deployed instances
    #[clap(short, long, global = true, env = STATE_DIR_ENV_VAR, default_value = STATE_DEFAULT_DIR)]
    pub state_dir: PathBuf,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct CredentialArgs {
    #[clap(long, global = true, env = SECRET_ID_ENV_VAR, hide_env_values = true)]
    pub secret_id: Option<String>,

    #[clap(long, global = true, env = SECRET_KEY_ENV_VAR, hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Session token of temporary credentials
    #[clap(long, global = true, env = TOKEN_ENV_VAR, hide_env_values = true)]
    pub token: Option<String>,

    #[clap(long, global = true, env = APP_ID_ENV_VAR)]
    pub app_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// The path to the serverless.yml describing the application
    #[clap(short = 'f', long, default_value = "serverless.yml")]
    pub config_file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploys the functions and triggers of an application
    #[clap(visible_alias = "d")]
    Deploy {
        #[command(flatten)]
        config: ConfigArgs,
        /// Only deploy this function-key and the triggers bound to it
        #[clap(long)]
        function: Option<String>,
    },
    /// Removes the deployed functions of an application
    #[clap(visible_alias = "rm")]
    Remove {
        #[command(flatten)]
        config: ConfigArgs,
        /// Only remove this function, by function-key or name
        #[clap(long)]
        function: Option<String>,
    },
    /// Invokes a deployed function
    #[clap(visible_alias = "i")]
    Invoke {
        #[command(flatten)]
        config: ConfigArgs,
        /// The function-key or name of the function
        #[clap(long)]
        function: String,
        /// Overrides the region recorded in state
        #[clap(short, long)]
        region: Option<String>,
        #[clap(short, long)]
        namespace: Option<String>,
        #[clap(short, long, value_enum, default_value_t = InvocationMode::default())]
        mode: InvocationMode,
        /// JSON payload passed to the function
        #[clap(short, long)]
        event: Option<String>,
    },
    /// Prints the logs of a deployed function
    #[clap(visible_alias = "l")]
    Log {
        #[command(flatten)]
        config: ConfigArgs,
        /// The function-key or name of the function
        #[clap(long)]
        function: String,
        /// Overrides the region recorded in state
        #[clap(short, long)]
        region: Option<String>,
        #[clap(short, long)]
        namespace: Option<String>,
        /// Version qualifier, defaults to $LATEST
        #[clap(short, long)]
        qualifier: Option<String>,
    },
    /// Persisted state commands
    #[clap(visible_alias = "st")]
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// JSON schema of the serverless.yml document
    #[clap(visible_alias = "sc")]
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Prints the persisted state of an application instance
    #[clap(visible_alias = "p")]
    Print {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Writes the schema to a file
    #[clap(visible_alias = "w")]
    Write {
        /// The path to the file to write the schema to
        #[clap(short, long)]
        file: PathBuf,
    },
    /// Prints the schema to stdout
    #[clap(visible_alias = "p")]
    Print {},
}

// https://docs.rs/clap/latest/clap/_derive/index.html#arg-attributes

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_with_scope_parses() {
        let cli = Cli::try_parse_from([
            "multi-faas",
            "deploy",
            "-f",
            "app.yml",
            "--function",
            "b",
        ])
        .unwrap();

        assert_eq!(cli.gateway_url.as_str(), "http://gateway.multi-faas:8080/");
        match cli.command {
            Commands::Deploy { config, function } => {
                assert_eq!(config.config_file, PathBuf::from("app.yml"));
                assert_eq!(function.as_deref(), Some("b"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn invoke_mode_defaults_to_async() {
        let cli = Cli::try_parse_from(["multi-faas", "i", "--function", "a", "-m", "sync"]).unwrap();
        match cli.command {
            Commands::Invoke { mode, .. } => assert_eq!(mode, InvocationMode::Sync),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["multi-faas", "invoke", "--function", "a"]).unwrap();
        match cli.command {
            Commands::Invoke { mode, .. } => assert_eq!(mode, InvocationMode::Async),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
