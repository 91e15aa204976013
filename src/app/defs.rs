use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The `serverless.yml` document.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct ServerlessConfig {
    /// app is the application id the instance belongs to
    pub app: String,

    /// stage of the instance, e.g. dev or prod
    #[serde(default = "default_stage")]
    pub stage: String,

    /// name of the application instance
    pub name: String,

    /// inputs describing the functions and triggers to deploy
    pub inputs: AppSpec,
}

fn default_stage() -> String {
    String::from("dev")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// src is the shared code bundle, either a path or an object naming an existing artifact
    pub src: Option<SrcRef>,

    /// region to deploy to
    pub region: Option<String>,

    /// namespace shared by all functions
    pub namespace: Option<String>,

    /// runtime shared by all functions
    pub runtime: Option<String>,

    /// description shared by all functions
    pub description: Option<String>,

    /// type shared by all functions, e.g. Event or HTTP
    #[serde(rename = "type")]
    pub function_type: Option<String>,

    /// functions keyed by their function-key
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSpec>,

    /// triggers bound to the declared functions
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(untagged)]
pub enum SrcRef {
    /// Path to a zip bundle or a directory
    Path(String),
    Object(SrcObject),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
pub struct SrcObject {
    /// src is the local path of the bundle
    pub src: Option<String>,

    /// bucket holding the bundle, with or without the trailing app id
    pub bucket: Option<String>,

    /// object is the key of an already uploaded bundle
    pub object: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// name overrides the derived function name
    pub name: Option<String>,

    pub handler: Option<String>,

    pub runtime: Option<String>,

    pub namespace: Option<String>,

    pub description: Option<String>,

    #[serde(rename = "type")]
    pub function_type: Option<String>,

    /// memorySize in MB
    pub memory_size: Option<u32>,

    /// timeout in seconds
    pub timeout: Option<u32>,

    /// environment variables, as a list of pairs or a mapping
    pub environment: Option<KeyValues>,

    /// tags, as a list of pairs or a mapping
    pub tags: Option<KeyValues>,

    pub vpc: Option<VpcConfig>,

    /// image deploys a container image instead of packaged code
    pub image: Option<ImageConfig>,

    /// subPath selects a directory of the shared bundle as this function's code
    pub sub_path: Option<String>,

    /// Any other field is passed to the platform untouched
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(untagged)]
pub enum KeyValues {
    List(Vec<KeyValue>),
    Map(BTreeMap<String, String>),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfig {
    pub vpc_id: String,
    pub subnet_id: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// imageType is personal or enterprise
    pub image_type: String,

    /// imageUrl is the fully-qualified image reference
    pub image_url: String,

    /// registryId is only set for enterprise registries
    pub registry_id: Option<String>,

    pub command: Option<String>,

    pub args: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct TriggerSpec {
    /// type of the trigger, e.g. apigw, timer, cos
    #[serde(rename = "type")]
    pub kind: String,

    /// function-key the trigger invokes. Unused for apigw triggers.
    pub function: Option<String>,

    /// parameters specific to the trigger type
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApigwParameters {
    /// name of the gateway service
    pub name: String,

    /// id of an existing gateway service
    pub id: Option<String>,

    /// qualifier of the functions the endpoints bind to
    pub qualifier: Option<String>,

    #[serde(default)]
    pub apis: Vec<ApiSpec>,

    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct ApiSpec {
    pub path: Option<String>,

    pub method: Option<String>,

    /// function-key the route invokes
    pub function: String,

    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

/// Trigger specs split by how their function references resolve.
#[derive(Debug, PartialEq, Clone)]
pub enum TriggerKind {
    Apigw(ApigwParameters),
    Event { kind: String, function: String },
}
