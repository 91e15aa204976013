mod errors;

pub use errors::*;

use crate::{
    app::defs::ServerlessConfig,
    client::{
        errors::StateError, CredentialProvider, FunctionCompute, ObjectStorage, StateStore,
        TriggerManager,
    },
    consts::{DEFAULT_LOG_QUALIFIER, DEFAULT_NAMESPACE, DEFAULT_REGION},
    formatter::{format_inputs, FormatOptions, FormatOutputs},
    packager::Packager,
    types::{
        FunctionOutput, FunctionRequest, Instance, InvocationMode, InvokeParams, LogParams,
        Outputs, PersistedState, TriggerOutput, TriggerRequest,
    },
    utils::merge_by_key,
};
use either::Either::{Left, Right};
use futures::future::join_all;
use itertools::Itertools;
use serde_json::{json, Value};
use std::{future::Future, path::PathBuf, sync::Arc};
use tracing::{trace_span, Instrument};

/// Runs every future to completion and returns the first error, if any.
async fn join_all_ok<T, E>(
    futures: impl IntoIterator<Item = impl Future<Output = Result<T, E>>>,
) -> Result<Vec<T>, E> {
    join_all(futures).await.into_iter().collect()
}

/// Folds trigger outputs of several requests into one entry per function.
fn group_by_function(outputs: impl IntoIterator<Item = TriggerOutput>) -> Vec<TriggerOutput> {
    let mut grouped: Vec<TriggerOutput> = Vec::new();

    for output in outputs {
        match grouped.iter_mut().find(|entry| entry.name == output.name) {
            Some(entry) => entry.triggers.extend(output.triggers),
            None => grouped.push(output),
        }
    }

    grouped
}

fn attach_triggers(functions: &mut [FunctionOutput], triggers: &[TriggerOutput]) {
    for function in functions.iter_mut() {
        function.triggers = triggers
            .iter()
            .find(|output| output.name == function.name)
            .map(|output| output.triggers.clone())
            .unwrap_or_default();
    }
}

/// How a selection scope addresses persisted functions. A function-key
/// match takes precedence over a resolved name match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope<'a> {
    Key(&'a str),
    Name(&'a str),
}

impl<'a> Scope<'a> {
    fn new(functions: &[FunctionOutput], selected: &'a str) -> Self {
        if functions
            .iter()
            .any(|function| function.key.as_deref() == Some(selected))
        {
            Scope::Key(selected)
        } else {
            Scope::Name(selected)
        }
    }

    fn matches(&self, function: &FunctionOutput) -> bool {
        match *self {
            Scope::Key(key) => function.key.as_deref() == Some(key),
            Scope::Name(name) => function.name == name,
        }
    }
}

/// Maps a function-key to the resolved name recorded in state.
/// Unknown keys are used as literal function names.
fn resolve_function_name(state: &PersistedState, function: &str) -> String {
    let scope = Scope::new(&state.functions, function);
    state
        .functions
        .iter()
        .find(|output| scope.matches(output))
        .map(|output| output.name.clone())
        .unwrap_or_else(|| function.to_string())
}

/// Everything the operator talks to.
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub functions: Arc<dyn FunctionCompute>,
    pub triggers: Arc<dyn TriggerManager>,
    pub state: Arc<dyn StateStore>,
}

pub struct InvokeOptions {
    pub region: Option<String>,
    pub namespace: Option<String>,
    /// function-key or resolved function name
    pub function: String,
    pub mode: InvocationMode,
    pub event: Option<Value>,
}

pub struct LogOptions {
    pub region: Option<String>,
    pub namespace: Option<String>,
    /// function-key or resolved function name
    pub function: String,
    pub qualifier: Option<String>,
}

pub struct Operator {
    credentials: Arc<dyn CredentialProvider>,
    functions: Arc<dyn FunctionCompute>,
    triggers: Arc<dyn TriggerManager>,
    state: Arc<dyn StateStore>,
    packager: Packager,
}

impl Operator {
    pub fn new(collaborators: Collaborators) -> Self {
        let packager = Packager::new(collaborators.storage.clone());
        Self::with_packager(collaborators, packager)
    }

    pub fn new_with_workspace_root(collaborators: Collaborators, workspace_root: PathBuf) -> Self {
        let packager = Packager::with_workspace_root(collaborators.storage.clone(), workspace_root);
        Self::with_packager(collaborators, packager)
    }

    fn with_packager(collaborators: Collaborators, packager: Packager) -> Self {
        Self {
            credentials: collaborators.credentials,
            functions: collaborators.functions,
            triggers: collaborators.triggers,
            state: collaborators.state,
            packager,
        }
    }

    /// Deploys the declared functions and triggers, or only the selected
    /// function-key and the triggers bound to it, and merges the results into
    /// persisted state.
    pub async fn deploy(
        &self,
        config: &ServerlessConfig,
        selected: Option<&str>,
    ) -> Result<Outputs, DeployError> {
        let credentials = self
            .credentials
            .credentials()
            .map_err(DeployError::Credential)?;

        let instance = Instance::from(config);

        tracing::info!(%instance, selected = selected.unwrap_or("*"), "Deploying.");

        let state = self.state.read().await.map_err(DeployError::ReadState)?;

        let FormatOutputs {
            region,
            function_requests,
            trigger_requests,
        } = format_inputs(
            &self.packager,
            FormatOptions {
                app: &config.inputs,
                app_id: &credentials.app_id,
                instance: &instance,
                state: &state,
                selected,
            },
        )
        .instrument(trace_span!("FormatInputs", %instance))
        .await
        .map_err(DeployError::Format)?;

        let count = function_requests.len();
        let mut functions = self
            .deploy_functions(&region, &function_requests)
            .instrument(trace_span!("DeployFunctions", %region, count))
            .await
            .map_err(DeployError::Functions)?;

        let count = trigger_requests.len();
        let triggers = self
            .create_triggers(&region, &trigger_requests)
            .instrument(trace_span!("CreateTriggers", %region, count))
            .await
            .map_err(DeployError::Triggers)?;

        attach_triggers(&mut functions, &triggers);

        let merged = merge_state(state, &region, functions.clone(), triggers.clone());

        self.state
            .write(&merged)
            .await
            .map_err(DeployError::WriteState)?;

        tracing::info!(%instance, functions = functions.len(), triggers = triggers.len(), "Deployed.");

        Ok(Outputs {
            region,
            functions,
            triggers,
        })
    }

    async fn deploy_functions(
        &self,
        region: &str,
        requests: &[FunctionRequest],
    ) -> Result<Vec<FunctionOutput>, RemoteCallError> {
        join_all_ok(requests.iter().map(|request| async move {
            tracing::info!(name = %request.name, key = %request.key, "Deploying function.");

            let mut output = self
                .functions
                .deploy(region, request)
                .await
                .map_err(|error| {
                    tracing::error!(name = %request.name, %error, "Failed to deploy function.");
                    RemoteCallError::new("Deploy function", &request.name, error)
                })?;

            output.key = Some(request.key.clone());
            output.region.get_or_insert_with(|| region.to_string());

            Ok::<_, RemoteCallError>(output)
        }))
        .await
    }

    async fn create_triggers(
        &self,
        region: &str,
        requests: &[TriggerRequest],
    ) -> Result<Vec<TriggerOutput>, RemoteCallError> {
        let outputs = join_all_ok(requests.iter().map(|request| async move {
            let target = trigger_target(request);
            tracing::info!(kind = %request.kind(), %target, "Creating trigger.");

            self.triggers
                .create(region, request)
                .await
                .map_err(|error| {
                    tracing::error!(kind = %request.kind(), %target, %error, "Failed to create trigger.");
                    RemoteCallError::new("Create trigger", target, error)
                })
        }))
        .await?;

        Ok(group_by_function(outputs.into_iter().flatten()))
    }

    /// Removes every persisted function, or only the one matching `selected`.
    /// Returns whether all deletions were confirmed by the platform.
    pub async fn remove(&self, selected: Option<&str>) -> Result<bool, RemoveError> {
        self.credentials
            .credentials()
            .map_err(RemoveError::Credential)?;

        let state = self.state.read().await.map_err(RemoveError::ReadState)?;
        let PersistedState {
            region: state_region,
            functions,
            triggers,
        } = state;

        let (scheduled, retained): (Vec<FunctionOutput>, Vec<FunctionOutput>) = match selected {
            Some(selected) => {
                let scope = Scope::new(&functions, selected);
                functions.into_iter().partition_map(|function| {
                    if scope.matches(&function) {
                        Left(function)
                    } else {
                        Right(function)
                    }
                })
            }
            None => (functions, Vec::new()),
        };

        if let Some(selected) = selected {
            if scheduled.is_empty() {
                tracing::error!(function = %selected, "Selected function does not exist.");
                return Err(RemoveError::FunctionNotFound(selected.to_string()));
            }
        }

        let count = scheduled.len();
        let removed = join_all_ok(scheduled.iter().map(|function| {
            let region = function
                .region
                .clone()
                .or_else(|| state_region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_string());

            async move {
                let namespace = function.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
                tracing::info!(name = %function.name, %region, %namespace, "Removing function.");

                self.functions
                    .remove(&region, namespace, &function.name)
                    .await
                    .map_err(|error| {
                        tracing::error!(name = %function.name, %error, "Failed to remove function.");
                        RemoteCallError::new("Remove function", &function.name, error)
                    })
            }
        }))
        .instrument(trace_span!("RemoveFunctions", count))
        .await
        .map_err(RemoveError::Functions)?;

        let triggers = triggers
            .into_iter()
            .filter(|output| !scheduled.iter().any(|function| function.name == output.name))
            .collect();

        self.state
            .write(&PersistedState {
                region: state_region,
                functions: retained,
                triggers,
            })
            .await
            .map_err(RemoveError::WriteState)?;

        Ok(removed.into_iter().all(|removed| removed))
    }

    pub async fn invoke_function(&self, options: InvokeOptions) -> Result<Value, InvokeError> {
        self.credentials
            .credentials()
            .map_err(InvokeError::Credential)?;

        let state = self.state.read().await.map_err(InvokeError::ReadState)?;

        let region = options
            .region
            .or_else(|| state.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let function_name = resolve_function_name(&state, &options.function);
        let (invocation_type, log_type) = options.mode.into();

        let params = InvokeParams {
            function_name,
            namespace: options
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            invocation_type,
            log_type,
            client_context: options.event.unwrap_or_else(|| json!({})),
        };

        tracing::info!(name = %params.function_name, %region, mode = ?options.mode, "Invoking function.");

        self.functions
            .invoke(&region, &params)
            .await
            .map_err(|error| {
                InvokeError::Invoke(RemoteCallError::new(
                    "Invoke function",
                    &params.function_name,
                    error,
                ))
            })
    }

    pub async fn get_function_log(&self, options: LogOptions) -> Result<Vec<Value>, LogError> {
        self.credentials
            .credentials()
            .map_err(LogError::Credential)?;

        let state = self.state.read().await.map_err(LogError::ReadState)?;

        let region = options
            .region
            .or_else(|| state.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let params = LogParams {
            function_name: resolve_function_name(&state, &options.function),
            namespace: options
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            qualifier: options
                .qualifier
                .unwrap_or_else(|| DEFAULT_LOG_QUALIFIER.to_string()),
        };

        self.functions
            .logs(&region, &params)
            .await
            .map_err(|error| {
                LogError::Logs(RemoteCallError::new(
                    "Get logs of",
                    &params.function_name,
                    error,
                ))
            })
    }

    pub async fn get_state(&self) -> Result<PersistedState, StateError> {
        self.state.read().await
    }
}

fn trigger_target(request: &TriggerRequest) -> String {
    match request {
        TriggerRequest::Apigw(apigw) => apigw.parameters.service_name.clone(),
        TriggerRequest::Event(event) => event.function.function_name.clone(),
    }
}

/// Folds a deploy's results into the previous state.
///
/// Functions and triggers are merged by name. A function deployed in this
/// run that no longer has triggers loses its stale trigger entry.
fn merge_state(
    previous: PersistedState,
    region: &str,
    functions: Vec<FunctionOutput>,
    triggers: Vec<TriggerOutput>,
) -> PersistedState {
    let stale: Vec<String> = functions
        .iter()
        .filter(|function| function.triggers.is_empty())
        .map(|function| function.name.clone())
        .collect();

    let mut merged_triggers = merge_by_key(triggers, previous.triggers, |t| t.name.clone());
    merged_triggers.retain(|output| !stale.contains(&output.name));

    let mut merged_functions = merge_by_key(functions, previous.functions, |f| f.name.clone());
    attach_triggers(&mut merged_functions, &merged_triggers);

    PersistedState {
        region: Some(region.to_string()),
        functions: merged_functions,
        triggers: merged_triggers,
    }
}
