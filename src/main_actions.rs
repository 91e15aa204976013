use crate::{
    app::defs::ServerlessConfig,
    cli::CredentialArgs,
    client::{credentials::StaticCredentialProvider, http::PlatformClient, CredentialProvider},
    operator::{Collaborators, InvokeOptions, LogOptions, Operator},
    state::FileStateStore,
    types::{Instance, InvocationMode},
};
use anyhow::{Context, Ok, Result as AnyResult};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{trace_span, Instrument};
use url::Url;

/// Everything needed to talk to the platform on behalf of one instance.
pub struct Session {
    pub config: ServerlessConfig,
    pub operator: Operator,
}

pub async fn read_config_from_file(path: &Path) -> AnyResult<ServerlessConfig> {
    let config = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config = serde_yaml::from_str(&config).context("Failed to parse config")?;
    Ok(config)
}

pub async fn create_session(
    gateway_url: Url,
    state_dir: &Path,
    credentials: CredentialArgs,
    config_file: &Path,
) -> AnyResult<Session> {
    let config = read_config_from_file(config_file).await?;
    let instance = Instance::from(&config);

    let credentials: Arc<dyn CredentialProvider> = Arc::new(StaticCredentialProvider::new(
        credentials.secret_id,
        credentials.secret_key,
        credentials.token,
        credentials.app_id,
    ));

    let client = Arc::new(PlatformClient::new(
        gateway_url.to_string(),
        credentials.clone(),
    ));
    let state = FileStateStore::for_instance(state_dir, &instance);

    tracing::info!(%instance, %gateway_url, state = %state.path().display(), "Running with current config.");

    let operator = Operator::new(Collaborators {
        credentials,
        storage: client.clone(),
        functions: client.clone(),
        triggers: client,
        state: Arc::new(state),
    });

    Ok(Session { config, operator })
}

fn print_json<T: Serialize>(value: &T) -> AnyResult<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

pub async fn deploy(session: Session, function: Option<String>) -> AnyResult<()> {
    let span = trace_span!("Deploy", app = %session.config.app);
    let outputs = session
        .operator
        .deploy(&session.config, function.as_deref())
        .instrument(span)
        .await
        .context("Failed to deploy")?;

    print_json(&outputs)
}

pub async fn remove(session: Session, function: Option<String>) -> AnyResult<()> {
    let span = trace_span!("Remove", app = %session.config.app);
    let removed = session
        .operator
        .remove(function.as_deref())
        .instrument(span)
        .await
        .context("Failed to remove")?;

    if !removed {
        tracing::warn!("Some functions were already gone.");
    }

    Ok(())
}

pub async fn invoke(
    session: Session,
    function: String,
    region: Option<String>,
    namespace: Option<String>,
    mode: InvocationMode,
    event: Option<String>,
) -> AnyResult<()> {
    let event = event
        .map(|event| serde_json::from_str(&event))
        .transpose()
        .context("Failed to parse event")?;

    let result = session
        .operator
        .invoke_function(InvokeOptions {
            region,
            namespace,
            function,
            mode,
            event,
        })
        .await
        .context("Failed to invoke function")?;

    print_json(&result)
}

pub async fn log(
    session: Session,
    function: String,
    region: Option<String>,
    namespace: Option<String>,
    qualifier: Option<String>,
) -> AnyResult<()> {
    let logs = session
        .operator
        .get_function_log(LogOptions {
            region,
            namespace,
            function,
            qualifier,
        })
        .await
        .context("Failed to get logs")?;

    print_json(&logs)
}

pub async fn print_state(session: Session) -> AnyResult<()> {
    let state = session
        .operator
        .get_state()
        .await
        .context("Failed to read state")?;

    print_json(&state)
}

pub fn generate_schema_yaml() -> AnyResult<String> {
    ServerlessConfig::schema_yaml_string().context("Failed to generate schema")
}

pub fn print_schema() -> AnyResult<()> {
    println!("{}", generate_schema_yaml()?);
    Ok(())
}

pub async fn write_schema_to_file(path: PathBuf) -> AnyResult<()> {
    let schema = generate_schema_yaml()?;
    tokio::fs::write(path, schema)
        .await
        .context("Failed to write schema to file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_file_is_read_with_default_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serverless.yml");
        tokio::fs::write(
            &path,
            "app: demo\nname: multi\ninputs:\n  functions:\n    a:\n      handler: index.main\n",
        )
        .await
        .unwrap();

        let config = read_config_from_file(&path).await.unwrap();

        assert_eq!(config.stage, "dev");
        assert_eq!(Instance::from(&config).to_string(), "demo-dev-multi");
        assert!(config.inputs.functions.contains_key("a"));
    }

    #[tokio::test]
    async fn schema_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");

        write_schema_to_file(path.clone()).await.unwrap();

        let schema = tokio::fs::read_to_string(path).await.unwrap();
        assert!(schema.contains("ServerlessConfig"));
        assert!(schema.contains("functions"));
    }
}
