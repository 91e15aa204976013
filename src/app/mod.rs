pub mod defs;
pub mod impls;

use defs::ServerlessConfig;
use schemars::schema::RootSchema;

impl ServerlessConfig {
    pub fn schema() -> RootSchema {
        schemars::schema_for!(ServerlessConfig)
    }

    pub fn schema_yaml_string() -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&Self::schema())
    }
}
