//! Recording in-memory collaborators for unit tests.

use crate::{
    client::{
        credentials::StaticCredentialProvider,
        errors::{RemoteError, StateError},
        FunctionCompute, LifecycleRule, ObjectStorage, StateStore, TriggerManager,
    },
    types::{
        FunctionOutput, FunctionRequest, InvokeParams, LogParams, PersistedState, TriggerOutput,
        TriggerRecord, TriggerRequest,
    },
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::{
    io::{Cursor, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};
use zip::{write::SimpleFileOptions, ZipArchive, ZipWriter};

pub const APP_ID: &str = "1250000000";

pub fn credentials() -> StaticCredentialProvider {
    StaticCredentialProvider::new(
        Some("secret-id".into()),
        Some("secret-key".into()),
        None,
        Some(APP_ID.into()),
    )
}

pub fn request(key: &str) -> FunctionRequest {
    FunctionRequest {
        key: key.to_string(),
        name: key.to_string(),
        namespace: String::from("default"),
        runtime: String::from("Nodejs12.16"),
        description: String::new(),
        function_type: None,
        handler: Some(String::from("index.main")),
        memory_size: None,
        timeout: None,
        environment: None,
        tags: None,
        vpc_config: None,
        code: None,
        image: None,
        sub_path: None,
        extra: Map::new(),
    }
}

pub fn write_tree(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

pub fn write_zip(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (entry, content) in files {
        zip.start_file(entry.to_string(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

pub fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub bucket: String,
    pub key: String,
    pub entries: Vec<String>,
}

/// Storage, function compute and trigger manager in one recorder.
#[derive(Default)]
pub struct MockPlatform {
    fail_buckets: bool,
    fail_uploads: bool,
    /// Function name whose deploy or remove fails
    fail_function: Option<String>,
    fail_triggers: bool,
    buckets: Mutex<Vec<String>>,
    lifecycles: Mutex<Vec<LifecycleRule>>,
    uploads: Mutex<Vec<RecordedUpload>>,
    deployed: Mutex<Vec<FunctionRequest>>,
    removed: Mutex<Vec<String>>,
    triggers: Mutex<Vec<TriggerRequest>>,
    invocations: Mutex<Vec<InvokeParams>>,
    calls: AtomicUsize,
}

impl MockPlatform {
    pub fn failing_buckets() -> Self {
        Self {
            fail_buckets: true,
            ..Default::default()
        }
    }

    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Default::default()
        }
    }

    pub fn failing_function(name: &str) -> Self {
        Self {
            fail_function: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_triggers() -> Self {
        Self {
            fail_triggers: true,
            ..Default::default()
        }
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn buckets(&self) -> Vec<String> {
        self.buckets.lock().unwrap().clone()
    }

    /// Lifecycle rules received by every bucket creation
    pub fn lifecycles(&self) -> Vec<LifecycleRule> {
        self.lifecycles.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deployed(&self) -> Vec<FunctionRequest> {
        self.deployed.lock().unwrap().clone()
    }

    pub fn deployed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .deployed()
            .into_iter()
            .map(|request| request.name)
            .collect();
        names.sort();
        names
    }

    pub fn removed(&self) -> Vec<String> {
        let mut removed = self.removed.lock().unwrap().clone();
        removed.sort();
        removed
    }

    pub fn triggers(&self) -> Vec<TriggerRequest> {
        self.triggers.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> Vec<InvokeParams> {
        self.invocations.lock().unwrap().clone()
    }

    fn fails_for(&self, function_name: &str) -> bool {
        self.fail_function.as_deref() == Some(function_name)
    }
}

#[async_trait]
impl ObjectStorage for MockPlatform {
    async fn ensure_bucket(
        &self,
        _region: &str,
        bucket: &str,
        lifecycle: &[LifecycleRule],
    ) -> Result<(), RemoteError> {
        self.record_call();
        if self.fail_buckets {
            return Err(RemoteError::Unauthorized);
        }
        self.buckets.lock().unwrap().push(bucket.to_string());
        self.lifecycles.lock().unwrap().extend_from_slice(lifecycle);
        Ok(())
    }

    async fn upload(
        &self,
        _region: &str,
        bucket: &str,
        key: &str,
        file: &Path,
    ) -> Result<(), RemoteError> {
        self.record_call();
        if self.fail_uploads {
            return Err(RemoteError::InternalServerError);
        }
        let bytes = std::fs::read(file).map_err(RemoteError::ReadFile)?;
        self.uploads.lock().unwrap().push(RecordedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            entries: zip_entry_names(&bytes),
        });
        Ok(())
    }
}

#[async_trait]
impl FunctionCompute for MockPlatform {
    async fn deploy(
        &self,
        region: &str,
        request: &FunctionRequest,
    ) -> Result<FunctionOutput, RemoteError> {
        self.record_call();
        if self.fails_for(&request.name) {
            return Err(RemoteError::InternalServerError);
        }
        self.deployed.lock().unwrap().push(request.clone());
        Ok(FunctionOutput {
            key: None,
            name: request.name.clone(),
            function_type: request.function_type.clone().or(Some(String::from("Event"))),
            namespace: Some(request.namespace.clone()),
            runtime: Some(request.runtime.clone()),
            handler: request.handler.clone(),
            memory_size: request.memory_size.or(Some(128)),
            timeout: request.timeout.or(Some(3)),
            region: Some(region.to_string()),
            triggers: Vec::new(),
        })
    }

    async fn remove(
        &self,
        _region: &str,
        _namespace: &str,
        function_name: &str,
    ) -> Result<bool, RemoteError> {
        self.record_call();
        if self.fails_for(function_name) {
            return Err(RemoteError::InternalServerError);
        }
        self.removed.lock().unwrap().push(function_name.to_string());
        Ok(true)
    }

    async fn invoke(&self, _region: &str, params: &InvokeParams) -> Result<Value, RemoteError> {
        self.record_call();
        self.invocations.lock().unwrap().push(params.clone());
        Ok(json!({ "functionName": params.function_name, "result": "ok" }))
    }

    async fn logs(&self, _region: &str, params: &LogParams) -> Result<Vec<Value>, RemoteError> {
        self.record_call();
        Ok(vec![json!({
            "functionName": params.function_name,
            "qualifier": params.qualifier,
        })])
    }
}

#[async_trait]
impl TriggerManager for MockPlatform {
    async fn create(
        &self,
        _region: &str,
        request: &TriggerRequest,
    ) -> Result<Vec<TriggerOutput>, RemoteError> {
        self.record_call();
        if self.fail_triggers {
            return Err(RemoteError::BadRequest);
        }
        self.triggers.lock().unwrap().push(request.clone());

        let outputs = match request {
            TriggerRequest::Apigw(apigw) => {
                let parameters = &apigw.parameters;
                let record = TriggerRecord {
                    kind: Some(apigw.kind.clone()),
                    service_id: Some(
                        parameters
                            .service_id
                            .clone()
                            .unwrap_or_else(|| format!("service-{}", parameters.service_name)),
                    ),
                    service_name: Some(parameters.service_name.clone()),
                    extra: Map::new(),
                };
                parameters
                    .endpoints
                    .iter()
                    .map(|endpoint| TriggerOutput {
                        name: endpoint.function.function_name.clone(),
                        triggers: vec![record.clone()],
                    })
                    .collect()
            }
            TriggerRequest::Event(event) => vec![TriggerOutput {
                name: event.function.function_name.clone(),
                triggers: vec![TriggerRecord {
                    kind: Some(event.kind.clone()),
                    ..Default::default()
                }],
            }],
        };

        Ok(outputs)
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<PersistedState>,
    writes: AtomicUsize,
}

impl MemoryStateStore {
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(state),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> PersistedState {
        self.state.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self) -> Result<PersistedState, StateError> {
        Ok(self.state())
    }

    async fn write(&self, state: &PersistedState) -> Result<(), StateError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = state.clone();
        Ok(())
    }
}
