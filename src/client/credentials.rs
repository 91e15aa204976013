use super::{errors::CredentialError, CredentialProvider, Credentials};
use crate::consts::CREDENTIAL_HINT;

/// Reads short-lived credentials handed over by the caller.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    secret_id: Option<String>,
    secret_key: Option<String>,
    token: Option<String>,
    app_id: Option<String>,
}

impl StaticCredentialProvider {
    pub fn new(
        secret_id: Option<String>,
        secret_key: Option<String>,
        token: Option<String>,
        app_id: Option<String>,
    ) -> Self {
        Self {
            secret_id,
            secret_key,
            token,
            app_id,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|value| !value.trim().is_empty())
}

impl CredentialProvider for StaticCredentialProvider {
    fn credentials(&self) -> Result<Credentials, CredentialError> {
        match (
            non_empty(&self.secret_id),
            non_empty(&self.secret_key),
            non_empty(&self.app_id),
        ) {
            (Some(secret_id), Some(secret_key), Some(app_id)) => Ok(Credentials {
                secret_id,
                secret_key,
                token: non_empty(&self.token),
                app_id,
            }),
            _ => Err(CredentialError {
                hint: CREDENTIAL_HINT.to_string(),
            }),
        }
    }
}
