pub mod archive;

use crate::{
    app::defs::{ImageConfig, SrcRef},
    client::{errors::RemoteError, LifecycleRule, ObjectStorage},
    consts::{default_bucket_name, COMPONENT_NAME, LIFECYCLE_EXPIRATION_DAYS, LIFECYCLE_RULE_ID},
    types::{CodeArtifact, FunctionCode, FunctionRequest, ImageCode},
    utils::{random_id, remove_app_id},
};
use archive::ArchiveError;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use thiserror::Error as ThisError;
use tracing::{trace_span, Instrument};

const WORKSPACE_PREFIX: &str = "multi-faas-";

#[derive(ThisError, Debug)]
pub enum PackageError {
    #[error("No local code bundle configured for function {0}")]
    MissingSource(String),
    #[error("Code bundle {0} does not exist")]
    SourceNotFound(PathBuf),
    #[error("Sub-path {sub_path} of function {key} must be relative and stay inside the bundle")]
    InvalidSubPath { key: String, sub_path: String },
    #[error("Sub-path {sub_path} of function {key} does not exist in the bundle")]
    SubPathNotFound { key: String, sub_path: String },
    #[error("Failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("Failed to unpack bundle {path}: {error}")]
    Unpack {
        path: PathBuf,
        #[source]
        error: ArchiveError,
    },
    #[error("Failed to archive {path}: {error}")]
    Repack {
        path: PathBuf,
        #[source]
        error: ArchiveError,
    },
    #[error("Packaging task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
    #[error("Failed to create bucket {bucket}: {error}")]
    Bucket {
        bucket: String,
        #[source]
        error: RemoteError,
    },
    #[error("Failed to upload {object} to bucket {bucket}: {error}")]
    Upload {
        bucket: String,
        object: String,
        #[source]
        error: RemoteError,
    },
}

pub fn bucket_lifecycle() -> Vec<LifecycleRule> {
    vec![LifecycleRule {
        id: LIFECYCLE_RULE_ID.to_string(),
        status: String::from("Enabled"),
        expiration_days: LIFECYCLE_EXPIRATION_DAYS,
        abort_incomplete_multipart_upload_days: LIFECYCLE_EXPIRATION_DAYS,
    }]
}

fn object_name(function_key: Option<&str>) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    match function_key {
        Some(key) => format!("/{COMPONENT_NAME}_{key}_{}-{timestamp}.zip", random_id(8)),
        None => format!("/{COMPONENT_NAME}_{}-{timestamp}.zip", random_id(8)),
    }
}

fn is_contained(sub_path: &str) -> bool {
    let path = Path::new(sub_path);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

async fn blocking<F, T>(task: F) -> Result<T, PackageError>
where
    F: FnOnce() -> Result<T, PackageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(PackageError::Task)?
}

impl From<&ImageConfig> for ImageCode {
    fn from(value: &ImageConfig) -> Self {
        ImageCode {
            image_type: value.image_type.clone(),
            image_url: value.image_url.clone(),
            registry_id: value.registry_id.clone(),
            command: value.command.clone(),
            args: value.args.clone(),
        }
    }
}

/// Turns the shared bundle into uploaded code artifacts.
pub struct Packager {
    storage: Arc<dyn ObjectStorage>,
    /// Temporary workspaces are created below this directory
    workspace_root: PathBuf,
}

impl Packager {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self::with_workspace_root(storage, std::env::temp_dir())
    }

    pub fn with_workspace_root(storage: Arc<dyn ObjectStorage>, workspace_root: PathBuf) -> Self {
        Self {
            storage,
            workspace_root,
        }
    }

    /// Resolves the code of every function, uploading each distinct
    /// (bundle, sub-path) at most once. Any failure aborts the whole run.
    pub async fn package_and_upload(
        &self,
        bundle: Option<&SrcRef>,
        app_id: &str,
        region: &str,
        functions: &[FunctionRequest],
    ) -> Result<BTreeMap<String, FunctionCode>, PackageError> {
        let source = bundle.map(SrcRef::to_src_object).unwrap_or_default();

        let bucket_name = match source.bucket {
            Some(ref bucket) => remove_app_id(bucket, app_id),
            None => default_bucket_name(region),
        };
        let bucket = format!("{bucket_name}-{app_id}");

        let needs_upload =
            source.object.is_none() && functions.iter().any(|function| function.image.is_none());

        if needs_upload && source.bucket.is_none() {
            tracing::info!(%bucket, "Ensuring code bucket exists.");

            self.storage
                .ensure_bucket(region, &bucket, &bucket_lifecycle())
                .await
                .map_err(|error| PackageError::Bucket {
                    bucket: bucket.clone(),
                    error,
                })?;
        }

        let mut run = PackagingRun {
            packager: self,
            region,
            bucket,
            bucket_name: bucket_name.clone(),
            source: source.src.map(PathBuf::from),
            workspace: None,
            bundle_archive: None,
            uploads: HashMap::new(),
        };

        let mut codes = BTreeMap::new();
        for function in functions {
            let key = &function.key;

            let code = match (&function.image, &source.object) {
                (Some(image), _) => {
                    tracing::info!(%key, image = %image.image_url, "Using image. Skipping upload.");
                    FunctionCode::Image(ImageCode::from(image))
                }
                (None, Some(object)) => {
                    if function.sub_path.is_some() {
                        tracing::warn!(%key, "Bundle is already uploaded. Ignoring sub-path.");
                    }
                    FunctionCode::Artifact(CodeArtifact {
                        bucket: bucket_name.clone(),
                        object: object.clone(),
                    })
                }
                (None, None) => FunctionCode::Artifact(
                    run.artifact_for(function)
                        .instrument(trace_span!("PackageFunction", %key))
                        .await?,
                ),
            };

            codes.insert(key.clone(), code);
        }

        Ok(codes)
    }
}

/// State of one packaging run. Dropping it removes its workspace.
struct PackagingRun<'a> {
    packager: &'a Packager,
    region: &'a str,
    bucket: String,
    bucket_name: String,
    source: Option<PathBuf>,
    workspace: Option<TempDir>,
    bundle_archive: Option<PathBuf>,
    /// sub-path (None for the whole bundle) -> uploaded artifact
    uploads: HashMap<Option<String>, CodeArtifact>,
}

impl PackagingRun<'_> {
    fn new_workspace(&self) -> Result<TempDir, PackageError> {
        tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.packager.workspace_root)
            .map_err(PackageError::Workspace)
    }

    fn source(&self, function_key: &str) -> Result<PathBuf, PackageError> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| PackageError::MissingSource(function_key.to_string()))?;

        if !source.exists() {
            return Err(PackageError::SourceNotFound(source));
        }

        Ok(source)
    }

    async fn artifact_for(
        &mut self,
        function: &FunctionRequest,
    ) -> Result<CodeArtifact, PackageError> {
        let cache_key = function.sub_path.clone();

        if let Some(artifact) = self.uploads.get(&cache_key) {
            tracing::info!(object = %artifact.object, "Code already uploaded in this run. Reusing.");
            return Ok(artifact.clone());
        }

        let artifact = match function.sub_path {
            None => {
                let archive = self.bundle_archive(&function.key).await?;
                self.upload(&archive, object_name(None)).await?
            }
            Some(ref sub_path) => self.repackage_and_upload(&function.key, sub_path).await?,
        };

        self.uploads.insert(cache_key, artifact.clone());

        Ok(artifact)
    }

    /// Path of the whole bundle as a zip. Directories are archived once per run.
    async fn bundle_archive(&mut self, function_key: &str) -> Result<PathBuf, PackageError> {
        if let Some(ref archive) = self.bundle_archive {
            return Ok(archive.clone());
        }

        let source = self.source(function_key)?;

        let archive = if source.is_dir() {
            let workspace = match self.workspace.take() {
                Some(workspace) => workspace,
                None => self.new_workspace()?,
            };
            let archive = workspace.path().join("bundle.zip");
            self.workspace = Some(workspace);

            tracing::info!(source = %source.display(), "Archiving bundle directory.");

            let dest = archive.clone();
            blocking(move || {
                archive::zip_dir(&source, &dest).map_err(|error| PackageError::Repack {
                    path: source,
                    error,
                })
            })
            .await?;

            archive
        } else {
            source
        };

        self.bundle_archive = Some(archive.clone());

        Ok(archive)
    }

    /// Extracts `sub_path` from the bundle into a private workspace, archives
    /// it alone and uploads it. The workspace is removed on return.
    async fn repackage_and_upload(
        &self,
        function_key: &str,
        sub_path: &str,
    ) -> Result<CodeArtifact, PackageError> {
        if !is_contained(sub_path) {
            return Err(PackageError::InvalidSubPath {
                key: function_key.to_string(),
                sub_path: sub_path.to_string(),
            });
        }

        let source = self.source(function_key)?;
        let workspace = self.new_workspace()?;

        let code_dir = if source.is_dir() {
            source.join(sub_path)
        } else {
            let unpacked = workspace.path().join("unpacked");

            tracing::info!(bundle = %source.display(), "Unpacking bundle.");

            let dest = unpacked.clone();
            blocking(move || {
                archive::unzip(&source, &dest).map_err(|error| PackageError::Unpack {
                    path: source,
                    error,
                })
            })
            .await?;

            unpacked.join(sub_path)
        };

        if !code_dir.is_dir() {
            return Err(PackageError::SubPathNotFound {
                key: function_key.to_string(),
                sub_path: sub_path.to_string(),
            });
        }

        let archive = workspace.path().join(format!("{function_key}.zip"));

        tracing::info!(%sub_path, "Repackaging sub-path.");

        let dest = archive.clone();
        blocking(move || {
            archive::zip_dir(&code_dir, &dest).map_err(|error| PackageError::Repack {
                path: code_dir,
                error,
            })
        })
        .await?;

        self.upload(&archive, object_name(Some(function_key))).await
    }

    async fn upload(&self, archive: &Path, object: String) -> Result<CodeArtifact, PackageError> {
        let bucket = &self.bucket;

        tracing::info!(%object, %bucket, "Uploading code.");

        self.packager
            .storage
            .upload(self.region, bucket, &object, archive)
            .await
            .map_err(|error| PackageError::Upload {
                bucket: bucket.clone(),
                object: object.clone(),
                error,
            })?;

        Ok(CodeArtifact {
            bucket: self.bucket_name.clone(),
            object,
        })
    }
}
