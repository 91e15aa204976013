use crate::app::defs::VpcConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Identifies one deployed application instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Application id
    pub app: String,
    pub stage: String,
    /// Application instance name
    pub name: String,
}

impl Instance {
    pub fn new(app: String, stage: String, name: String) -> Self {
        Self { app, stage, name }
    }

    /// Name a function gets when its spec does not set one.
    /// Stable for the same instance and function-key across deploys.
    pub fn derive_function_name(&self, function_key: &str) -> String {
        format!("{}-{}-{}-{}", self.name, self.stage, self.app, function_key)
    }
}

impl std::fmt::Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.app, self.stage, self.name)
    }
}

/// A fully resolved request to create or update one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    /// function-key the request was built from
    #[serde(skip)]
    pub key: String,

    pub name: String,

    pub namespace: String,

    pub runtime: String,

    pub description: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub function_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,

    /// Filled in by the packager
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<FunctionCode>,

    #[serde(skip)]
    pub image: Option<crate::app::defs::ImageConfig>,

    #[serde(skip)]
    pub sub_path: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub variables: BTreeMap<String, String>,
}

/// Where the platform finds a function's code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionCode {
    Artifact(CodeArtifact),
    Image(ImageCode),
}

/// An uploaded archive. `bucket` is the name without the app id suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub bucket: String,
    pub object: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCode {
    pub image_type: String,

    pub image_url: String,

    /// Only present for enterprise registries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

/// Resolved identity of a declared function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionIdentity {
    pub name: String,
    pub function_type: Option<String>,
    pub namespace: String,
}

/// function-key -> resolved identity, for every declared function.
pub type FunctionNameMap = BTreeMap<String, FunctionIdentity>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerRequest {
    Apigw(ApigwTriggerRequest),
    Event(EventTriggerRequest),
}

impl TriggerRequest {
    pub fn kind(&self) -> &str {
        match self {
            TriggerRequest::Apigw(request) => &request.kind,
            TriggerRequest::Event(request) => &request.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApigwTriggerRequest {
    #[serde(rename = "type")]
    pub kind: String,

    pub namespace: String,

    pub parameters: ApigwTriggerParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApigwTriggerParameters {
    pub service_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    /// Whether `service_id` was given in the input rather than found in state.
    /// Explicit ids are never migrated by the platform.
    pub is_input_service_id: bool,

    pub endpoints: Vec<ResolvedApi>,

    /// Gateway state from the previous deploy, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_state: Option<TriggerRecord>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedApi {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    pub function: ResolvedFunctionRef,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFunctionRef {
    pub function_name: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub function_type: Option<String>,

    pub function_namespace: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_qualifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTriggerRequest {
    #[serde(rename = "type")]
    pub kind: String,

    pub namespace: String,

    pub function: ResolvedFunctionRef,

    pub parameters: Value,
}

/// A function as reported by the platform and kept in state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionOutput {
    /// function-key the function was deployed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub function_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default)]
    pub triggers: Vec<TriggerRecord>,
}

/// Triggers the platform created for one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TriggerOutput {
    /// Resolved name of the function the triggers invoke
    pub name: String,

    #[serde(default)]
    pub triggers: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

/// The document persisted between invocations for one instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default)]
    pub functions: Vec<FunctionOutput>,

    #[serde(default)]
    pub triggers: Vec<TriggerOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    pub region: String,
    pub functions: Vec<FunctionOutput>,
    pub triggers: Vec<TriggerOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InvocationMode {
    Sync,
    #[default]
    Async,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationType {
    RequestResponse,
    Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    Tail,
    None,
}

impl From<InvocationMode> for (InvocationType, LogType) {
    fn from(mode: InvocationMode) -> Self {
        match mode {
            InvocationMode::Sync => (InvocationType::RequestResponse, LogType::Tail),
            InvocationMode::Async => (InvocationType::Event, LogType::None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeParams {
    pub function_name: String,
    pub namespace: String,
    pub invocation_type: InvocationType,
    pub log_type: LogType,
    pub client_context: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogParams {
    pub function_name: String,
    pub namespace: String,
    pub qualifier: String,
}
