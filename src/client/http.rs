use super::{
    errors::RemoteError, CredentialProvider, FunctionCompute, LifecycleRule, ObjectStorage,
    TriggerManager,
};
use crate::{
    types::{
        FunctionOutput, FunctionRequest, InvokeParams, LogParams, TriggerOutput, TriggerRequest,
    },
    utils::remove_trailling_slash,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{path::Path, sync::Arc};

const SESSION_TOKEN_HEADER: &str = "X-Session-Token";
const APP_ID_HEADER: &str = "X-App-Id";

/// Talks to the platform gateway that fronts object storage, function
/// compute and triggers.
pub struct PlatformClient {
    client: reqwest::Client,
    /// Base URL of the platform gateway
    /// e.g. http://gateway.multi-faas:8080
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl PlatformClient {
    pub fn new(base_url: String, credentials: Arc<dyn CredentialProvider>) -> Self {
        let base_url = remove_trailling_slash(&base_url);
        Self {
            client: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    fn get_region_url(&self, region: &str) -> String {
        format!("{}/regions/{}", self.base_url, region)
    }

    fn get_bucket_url(&self, region: &str, bucket: &str) -> String {
        format!("{}/buckets/{}", self.get_region_url(region), bucket)
    }

    fn get_object_url(&self, region: &str, bucket: &str, key: &str) -> String {
        format!(
            "{}/objects/{}",
            self.get_bucket_url(region, bucket),
            key.trim_start_matches('/')
        )
    }

    fn get_functions_url(&self, region: &str, namespace: &str) -> String {
        format!(
            "{}/namespaces/{}/functions",
            self.get_region_url(region),
            namespace
        )
    }

    fn get_function_url(&self, region: &str, namespace: &str, function_name: &str) -> String {
        format!(
            "{}/{}",
            self.get_functions_url(region, namespace),
            function_name
        )
    }

    fn get_triggers_url(&self, region: &str) -> String {
        format!("{}/triggers", self.get_region_url(region))
    }

    fn status_code_into_result(status_code: StatusCode) -> Result<(), RemoteError> {
        match status_code {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                Ok(())
            }
            status_code => Err(status_code.into()),
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder, RemoteError> {
        let credentials = self
            .credentials
            .credentials()
            .map_err(RemoteError::Credential)?;

        let mut builder = builder
            .basic_auth(&credentials.secret_id, Some(&credentials.secret_key))
            .header(APP_ID_HEADER, &credentials.app_id);

        if let Some(token) = &credentials.token {
            builder = builder.header(SESSION_TOKEN_HEADER, token);
        }

        Ok(builder)
    }

    fn json_body<B: Serialize>(
        builder: RequestBuilder,
        body: &B,
    ) -> Result<RequestBuilder, RemoteError> {
        let body = serde_json::to_vec(body)?;
        Ok(builder
            .header("Content-Type", "application/json")
            .body(body))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(StatusCode, Vec<u8>), RemoteError> {
        let req = self
            .authorize(builder)?
            .build()
            .map_err(RemoteError::HttpBuilderError)?;

        tracing::debug!(method = %req.method(), url = %req.url(), "Sending request.");

        let resp = self
            .client
            .execute(req)
            .await
            .map_err(RemoteError::HttpError)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(RemoteError::HttpError)?;

        Ok((status, bytes.to_vec()))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let (status, bytes) = self.execute(builder).await?;
        Self::status_code_into_result(status)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ObjectStorage for PlatformClient {
    async fn ensure_bucket(
        &self,
        region: &str,
        bucket: &str,
        lifecycle: &[LifecycleRule],
    ) -> Result<(), RemoteError> {
        let url = self.get_bucket_url(region, bucket);

        let builder = Self::json_body(self.client.put(url), &lifecycle)?;
        let (status, _) = self.execute(builder).await?;

        match status {
            StatusCode::CONFLICT => {
                tracing::debug!(%bucket, "Bucket already exists.");
                Ok(())
            }
            status => Self::status_code_into_result(status),
        }
    }

    async fn upload(
        &self,
        region: &str,
        bucket: &str,
        key: &str,
        file: &Path,
    ) -> Result<(), RemoteError> {
        let url = self.get_object_url(region, bucket, key);

        let body = tokio::fs::read(file).await.map_err(RemoteError::ReadFile)?;

        let builder = self
            .client
            .put(url)
            .header("Content-Type", "application/zip")
            .body(body);

        let (status, _) = self.execute(builder).await?;
        Self::status_code_into_result(status)
    }
}

#[async_trait]
impl FunctionCompute for PlatformClient {
    async fn deploy(
        &self,
        region: &str,
        request: &FunctionRequest,
    ) -> Result<FunctionOutput, RemoteError> {
        let url = self.get_function_url(region, &request.namespace, &request.name);

        let builder = Self::json_body(self.client.put(url), request)?;
        self.execute_json(builder).await
    }

    async fn remove(
        &self,
        region: &str,
        namespace: &str,
        function_name: &str,
    ) -> Result<bool, RemoteError> {
        let url = self.get_function_url(region, namespace, function_name);

        let (status, _) = self.execute(self.client.delete(url)).await?;

        match status {
            StatusCode::NOT_FOUND => {
                tracing::warn!(%function_name, "Function does not exist. Skipping.");
                Ok(false)
            }
            status => Self::status_code_into_result(status).map(|_| true),
        }
    }

    async fn invoke(&self, region: &str, params: &InvokeParams) -> Result<Value, RemoteError> {
        let url = format!(
            "{}/invocations",
            self.get_function_url(region, &params.namespace, &params.function_name)
        );

        let builder = Self::json_body(self.client.post(url), params)?;
        self.execute_json(builder).await
    }

    async fn logs(&self, region: &str, params: &LogParams) -> Result<Vec<Value>, RemoteError> {
        let url = format!(
            "{}/logs",
            self.get_function_url(region, &params.namespace, &params.function_name)
        );

        let builder = self
            .client
            .get(url)
            .query(&[("qualifier", params.qualifier.as_str())]);

        self.execute_json(builder).await
    }
}

#[async_trait]
impl TriggerManager for PlatformClient {
    async fn create(
        &self,
        region: &str,
        request: &TriggerRequest,
    ) -> Result<Vec<TriggerOutput>, RemoteError> {
        let url = self.get_triggers_url(region);

        let builder = Self::json_body(self.client.post(url), request)?;
        self.execute_json(builder).await
    }
}
