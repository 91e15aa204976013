use super::defs::{
    ApigwParameters, AppSpec, FunctionSpec, KeyValues, ServerlessConfig, SrcObject, SrcRef,
    TriggerKind, TriggerSpec,
};
use crate::consts::{
    APIGW_TRIGGER_TYPE, DEFAULT_DESCRIPTION, DEFAULT_NAMESPACE, DEFAULT_REGION, DEFAULT_RUNTIME,
};
use crate::types::{Environment, FunctionRequest, Instance};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum TriggerKindError {
    #[error("Trigger of type {0} has no function")]
    MissingFunction(String),
    #[error("Invalid apigw parameters: {0}")]
    ApigwParameters(#[source] serde_json::Error),
}

/// Defaults shared by every function of an application.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedDefaults {
    pub namespace: String,
    pub runtime: String,
    pub description: String,
    pub function_type: Option<String>,
}

impl From<&AppSpec> for SharedDefaults {
    fn from(value: &AppSpec) -> Self {
        Self {
            namespace: value.to_namespace(),
            runtime: value
                .runtime
                .clone()
                .unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
            description: value
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            function_type: value.function_type.clone(),
        }
    }
}

impl From<&ServerlessConfig> for Instance {
    fn from(value: &ServerlessConfig) -> Self {
        Instance::new(value.app.clone(), value.stage.clone(), value.name.clone())
    }
}

impl AppSpec {
    pub fn to_region(&self) -> String {
        self.region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn to_namespace(&self) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }
}

impl SrcRef {
    pub fn to_src_object(&self) -> SrcObject {
        match self {
            SrcRef::Path(path) => SrcObject {
                src: Some(path.clone()),
                ..Default::default()
            },
            SrcRef::Object(object) => object.clone(),
        }
    }
}

impl KeyValues {
    /// Normalizes the list-of-pairs form into a mapping. Later pairs win.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self {
            KeyValues::List(pairs) => pairs
                .iter()
                .map(|pair| (pair.key.clone(), pair.value.clone()))
                .collect(),
            KeyValues::Map(map) => map.clone(),
        }
    }
}

impl FunctionSpec {
    pub fn to_name(&self, instance: &Instance, function_key: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| instance.derive_function_name(function_key))
    }

    fn to_environment(&self) -> Option<Environment> {
        self.environment.as_ref().map(|environment| Environment {
            variables: environment.to_map(),
        })
    }

    fn to_tags(&self) -> Option<BTreeMap<String, String>> {
        self.tags.as_ref().map(KeyValues::to_map)
    }

    /// Overlays this function's fields onto the shared defaults.
    /// Function-level values take precedence.
    pub fn to_request(
        &self,
        function_key: &str,
        name: String,
        defaults: &SharedDefaults,
    ) -> FunctionRequest {
        FunctionRequest {
            key: function_key.to_string(),
            name,
            namespace: self
                .namespace
                .clone()
                .unwrap_or_else(|| defaults.namespace.clone()),
            runtime: self
                .runtime
                .clone()
                .unwrap_or_else(|| defaults.runtime.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| defaults.description.clone()),
            function_type: self
                .function_type
                .clone()
                .or_else(|| defaults.function_type.clone()),
            handler: self.handler.clone(),
            memory_size: self.memory_size,
            timeout: self.timeout,
            environment: self.to_environment(),
            tags: self.to_tags(),
            vpc_config: self.vpc.clone(),
            code: None,
            image: self.image.clone(),
            sub_path: self.sub_path.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl TryFrom<&TriggerSpec> for TriggerKind {
    type Error = TriggerKindError;

    fn try_from(value: &TriggerSpec) -> Result<Self, Self::Error> {
        if value.kind == APIGW_TRIGGER_TYPE {
            let parameters: ApigwParameters = serde_json::from_value(value.parameters.clone())
                .map_err(TriggerKindError::ApigwParameters)?;
            return Ok(TriggerKind::Apigw(parameters));
        }

        let function = value
            .function
            .clone()
            .ok_or_else(|| TriggerKindError::MissingFunction(value.kind.clone()))?;

        Ok(TriggerKind::Event {
            kind: value.kind.clone(),
            function,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::defs::{KeyValue, VpcConfig};
    use serde_json::json;

    fn instance() -> Instance {
        Instance::new("app".into(), "dev".into(), "multi".into())
    }

    #[test]
    fn list_pairs_normalize_to_map() {
        let values = KeyValues::List(vec![
            KeyValue {
                key: "A".into(),
                value: "1".into(),
            },
            KeyValue {
                key: "B".into(),
                value: "2".into(),
            },
            KeyValue {
                key: "A".into(),
                value: "3".into(),
            },
        ]);

        let map = values.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["A"], "3");
        assert_eq!(map["B"], "2");
    }

    #[test]
    fn function_fields_override_defaults() {
        let app = AppSpec {
            namespace: Some("shared".into()),
            runtime: Some("Python3.6".into()),
            ..Default::default()
        };
        let defaults = SharedDefaults::from(&app);

        let spec = FunctionSpec {
            runtime: Some("Go1".into()),
            vpc: Some(VpcConfig {
                vpc_id: "vpc-1".into(),
                subnet_id: "subnet-1".into(),
            }),
            ..Default::default()
        };

        let request = spec.to_request("a", spec.to_name(&instance(), "a"), &defaults);
        assert_eq!(request.name, "multi-dev-app-a");
        assert_eq!(request.namespace, "shared");
        assert_eq!(request.runtime, "Go1");
        assert_eq!(request.description, DEFAULT_DESCRIPTION);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["vpcConfig"]["vpcId"], "vpc-1");
        assert!(body.get("vpc").is_none());
        assert!(body.get("subPath").is_none());
    }

    #[test]
    fn explicit_name_wins_over_derived() {
        let spec = FunctionSpec {
            name: Some("custom".into()),
            ..Default::default()
        };
        assert_eq!(spec.to_name(&instance(), "a"), "custom");
    }

    #[test]
    fn environment_accepts_both_forms() {
        let spec: FunctionSpec = serde_yaml::from_str(
            r#"
environment:
  - key: K
    value: V
tags:
  team: core
publish: true
"#,
        )
        .unwrap();

        let request = spec.to_request("a", "a".into(), &SharedDefaults::from(&AppSpec::default()));
        assert_eq!(request.environment.unwrap().variables["K"], "V");
        assert_eq!(request.tags.unwrap()["team"], "core");
        assert_eq!(request.extra["publish"], json!(true));
    }

    #[test]
    fn trigger_kind_requires_function_for_events() {
        let spec = TriggerSpec {
            kind: "timer".into(),
            function: None,
            parameters: json!({}),
        };
        assert!(matches!(
            TriggerKind::try_from(&spec),
            Err(TriggerKindError::MissingFunction(kind)) if kind == "timer"
        ));
    }

    #[test]
    fn apigw_parameters_are_parsed() {
        let spec = TriggerSpec {
            kind: "apigw".into(),
            function: None,
            parameters: json!({
                "name": "svc1",
                "protocols": ["http"],
                "apis": [{ "path": "/", "method": "GET", "function": "a" }]
            }),
        };

        let TriggerKind::Apigw(parameters) = TriggerKind::try_from(&spec).unwrap() else {
            panic!("expected apigw trigger");
        };
        assert_eq!(parameters.name, "svc1");
        assert_eq!(parameters.apis[0].function, "a");
        assert_eq!(parameters.extra["protocols"], json!(["http"]));
    }
}
