use crate::{
    client::errors::{CredentialError, RemoteError, StateError},
    formatter::FormatError,
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum DeployError {
    #[error("Failed to get credentials: {0}")]
    Credential(#[source] CredentialError),
    #[error("Failed to read state: {0}")]
    ReadState(#[source] StateError),
    #[error("Failed to format inputs: {0}")]
    Format(#[source] FormatError),
    #[error("Failed to deploy functions: {0}")]
    Functions(#[source] RemoteCallError),
    #[error("Failed to create triggers: {0}")]
    Triggers(#[source] RemoteCallError),
    #[error("Failed to write state: {0}")]
    WriteState(#[source] StateError),
}

#[derive(ThisError, Debug)]
pub enum RemoveError {
    #[error("Failed to get credentials: {0}")]
    Credential(#[source] CredentialError),
    #[error("Failed to read state: {0}")]
    ReadState(#[source] StateError),
    #[error("Function {0} does not exist")]
    FunctionNotFound(String),
    #[error("Failed to remove functions: {0}")]
    Functions(#[source] RemoteCallError),
    #[error("Failed to write state: {0}")]
    WriteState(#[source] StateError),
}

#[derive(ThisError, Debug)]
pub enum InvokeError {
    #[error("Failed to get credentials: {0}")]
    Credential(#[source] CredentialError),
    #[error("Failed to read state: {0}")]
    ReadState(#[source] StateError),
    #[error("Failed to invoke function: {0}")]
    Invoke(#[source] RemoteCallError),
}

#[derive(ThisError, Debug)]
pub enum LogError {
    #[error("Failed to get credentials: {0}")]
    Credential(#[source] CredentialError),
    #[error("Failed to read state: {0}")]
    ReadState(#[source] StateError),
    #[error("Failed to get logs: {0}")]
    Logs(#[source] RemoteCallError),
}

/// A failed platform call with the operation and resource it targeted.
#[derive(ThisError, Debug)]
#[error("{operation} {target}: {error}")]
pub struct RemoteCallError {
    pub operation: &'static str,
    pub target: String,
    #[source]
    pub error: RemoteError,
}

impl RemoteCallError {
    pub fn new(operation: &'static str, target: impl Into<String>, error: RemoteError) -> Self {
        Self {
            operation,
            target: target.into(),
            error,
        }
    }
}
