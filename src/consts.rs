use const_format::concatcp;

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DISPLAY_NAME: &str = "Multi-FaaS OperatoRS";

const ENV_VAR_PREFIX: &str = "MULTI_FAAS_";

pub const GATEWAY_URL_ENV_VAR: &str = concatcp!(ENV_VAR_PREFIX, "GATEWAY_URL");
pub const GATEWAY_DEFAULT_URL: &str = "http://gateway.multi-faas:8080";

pub const STATE_DIR_ENV_VAR: &str = concatcp!(ENV_VAR_PREFIX, "STATE_DIR");
pub const STATE_DEFAULT_DIR: &str = ".multi-faas";

pub const SECRET_ID_ENV_VAR: &str = concatcp!(ENV_VAR_PREFIX, "SECRET_ID");
pub const SECRET_KEY_ENV_VAR: &str = concatcp!(ENV_VAR_PREFIX, "SECRET_KEY");
pub const TOKEN_ENV_VAR: &str = concatcp!(ENV_VAR_PREFIX, "TOKEN");
pub const APP_ID_ENV_VAR: &str = concatcp!(ENV_VAR_PREFIX, "APP_ID");

pub const COMPONENT_NAME: &str = "multi-scf";

pub const DEFAULT_REGION: &str = "ap-guangzhou";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_RUNTIME: &str = "Nodejs12.16";
pub const DEFAULT_DESCRIPTION: &str = "This is a function created by serverless component";

/// Qualifier used for gateway endpoints when none is configured.
pub const DEFAULT_APIGW_QUALIFIER: &str = "$DEFAULT";
/// Version qualifier used when fetching function logs.
pub const DEFAULT_LOG_QUALIFIER: &str = "$LATEST";

pub const APIGW_TRIGGER_TYPE: &str = "apigw";

const DEFAULT_BUCKET_PREFIX: &str = "sls-cloudfunction-";
const DEFAULT_BUCKET_SUFFIX: &str = "-code";

pub const LIFECYCLE_RULE_ID: &str = "deleteObject";
pub const LIFECYCLE_EXPIRATION_DAYS: u32 = 10;

pub fn default_bucket_name(region: &str) -> String {
    format!("{DEFAULT_BUCKET_PREFIX}{region}{DEFAULT_BUCKET_SUFFIX}")
}

pub const CREDENTIAL_HINT: &str = concatcp!(
    "Unable to obtain access credentials. The account may be a sub-account without ",
    "the deployment role, or the credentials are not set. Set ",
    SECRET_ID_ENV_VAR,
    ", ",
    SECRET_KEY_ENV_VAR,
    " and ",
    APP_ID_ENV_VAR,
    " and make sure the role exists."
);
