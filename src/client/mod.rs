pub mod credentials;
pub mod errors;
pub mod http;

use crate::types::{
    FunctionOutput, FunctionRequest, InvokeParams, LogParams, PersistedState, TriggerOutput,
    TriggerRequest,
};
use async_trait::async_trait;
use errors::{CredentialError, RemoteError, StateError};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub secret_id: String,
    pub secret_key: String,
    pub token: Option<String>,
    pub app_id: String,
}

pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, CredentialError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRule {
    pub id: String,
    pub status: String,
    pub expiration_days: u32,
    pub abort_incomplete_multipart_upload_days: u32,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Creates the bucket with the given lifecycle unless it already exists.
    async fn ensure_bucket(
        &self,
        region: &str,
        bucket: &str,
        lifecycle: &[LifecycleRule],
    ) -> Result<(), RemoteError>;

    async fn upload(
        &self,
        region: &str,
        bucket: &str,
        key: &str,
        file: &Path,
    ) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait FunctionCompute: Send + Sync {
    async fn deploy(
        &self,
        region: &str,
        request: &FunctionRequest,
    ) -> Result<FunctionOutput, RemoteError>;

    async fn remove(
        &self,
        region: &str,
        namespace: &str,
        function_name: &str,
    ) -> Result<bool, RemoteError>;

    async fn invoke(&self, region: &str, params: &InvokeParams) -> Result<Value, RemoteError>;

    async fn logs(&self, region: &str, params: &LogParams) -> Result<Vec<Value>, RemoteError>;
}

#[async_trait]
pub trait TriggerManager: Send + Sync {
    /// Creates or updates one trigger. A gateway trigger can bind several
    /// functions, so one output is returned per function.
    async fn create(
        &self,
        region: &str,
        request: &TriggerRequest,
    ) -> Result<Vec<TriggerOutput>, RemoteError>;
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read(&self) -> Result<PersistedState, StateError>;

    async fn write(&self, state: &PersistedState) -> Result<(), StateError>;
}
