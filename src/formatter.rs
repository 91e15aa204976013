use crate::{
    app::{defs::AppSpec, impls::SharedDefaults},
    packager::{PackageError, Packager},
    triggers::{TriggerError, TriggerResolver},
    types::{
        FunctionIdentity, FunctionNameMap, FunctionRequest, Instance, PersistedState,
        TriggerRequest,
    },
};
use thiserror::Error as ThisError;
use tracing::{trace_span, Instrument};

#[derive(ThisError, Debug)]
pub enum FormatError {
    #[error("Function {0} does not exist")]
    FunctionNotFound(String),
    #[error("Failed to resolve triggers: {0}")]
    Trigger(#[source] TriggerError),
    #[error("Failed to package code: {0}")]
    Package(#[source] PackageError),
}

pub struct FormatOptions<'a> {
    pub app: &'a AppSpec,
    pub app_id: &'a str,
    pub instance: &'a Instance,
    /// State of the previous deploy, used to find existing gateway services
    pub state: &'a PersistedState,
    /// Restricts the run to one function-key
    pub selected: Option<&'a str>,
}

#[derive(Debug)]
pub struct FormatOutputs {
    pub region: String,
    pub function_requests: Vec<FunctionRequest>,
    pub trigger_requests: Vec<TriggerRequest>,
}

/// Builds one request per declared function plus the name map of all of them.
pub fn build_function_requests(
    app: &AppSpec,
    instance: &Instance,
) -> (Vec<FunctionRequest>, FunctionNameMap) {
    let defaults = SharedDefaults::from(app);

    let mut function_names = FunctionNameMap::new();
    let requests = app
        .functions
        .iter()
        .map(|(key, function)| {
            let request = function.to_request(key, function.to_name(instance, key), &defaults);

            function_names.insert(
                key.clone(),
                FunctionIdentity {
                    name: request.name.clone(),
                    function_type: request.function_type.clone(),
                    namespace: request.namespace.clone(),
                },
            );

            request
        })
        .collect();

    (requests, function_names)
}

fn select_requests(
    requests: Vec<FunctionRequest>,
    selected: Option<&str>,
) -> Result<Vec<FunctionRequest>, FormatError> {
    let Some(selected) = selected else {
        return Ok(requests);
    };

    let requests: Vec<FunctionRequest> = requests
        .into_iter()
        .filter(|request| request.key == selected)
        .collect();

    if requests.is_empty() {
        tracing::error!(function = %selected, "Selected function does not exist.");
        return Err(FormatError::FunctionNotFound(selected.to_string()));
    }

    Ok(requests)
}

/// Normalizes the application spec into concrete function and trigger
/// requests. Code is packaged and uploaded for the selected functions.
/// Nothing remote is touched when the input is invalid.
pub async fn format_inputs(
    packager: &Packager,
    options: FormatOptions<'_>,
) -> Result<FormatOutputs, FormatError> {
    let FormatOptions {
        app,
        app_id,
        instance,
        state,
        selected,
    } = options;

    let region = app.to_region();
    let namespace = app.to_namespace();

    let (requests, function_names) = build_function_requests(app, instance);
    let mut function_requests = select_requests(requests, selected)?;

    let trigger_requests = TriggerResolver {
        function_names: &function_names,
        previous_triggers: &state.triggers,
        namespace: &namespace,
        selected,
    }
    .resolve(&app.triggers)
    .map_err(FormatError::Trigger)?;

    let count = function_requests.len();
    let mut codes = packager
        .package_and_upload(app.src.as_ref(), app_id, &region, &function_requests)
        .instrument(trace_span!("PackageCode", count))
        .await
        .map_err(FormatError::Package)?;

    for request in function_requests.iter_mut() {
        request.code = codes.remove(&request.key);
    }

    Ok(FormatOutputs {
        region,
        function_requests,
        trigger_requests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::defs::{FunctionSpec, SrcRef, TriggerSpec},
        testing::{write_zip, MockPlatform, APP_ID},
        types::FunctionCode,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn instance() -> Instance {
        Instance::new("app".into(), "dev".into(), "multi".into())
    }

    fn app(src: Option<SrcRef>) -> AppSpec {
        AppSpec {
            src,
            region: Some("ap-shanghai".into()),
            functions: [("a", FunctionSpec::default()), ("b", FunctionSpec::default())]
                .into_iter()
                .map(|(key, spec)| (key.to_string(), spec))
                .collect(),
            triggers: vec![TriggerSpec {
                kind: "apigw".into(),
                function: None,
                parameters: json!({ "name": "svc1", "apis": [{ "path": "/", "function": "a" }] }),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn derived_names_are_stable() {
        let app = app(None);

        let (first, first_names) = build_function_requests(&app, &instance());
        let (second, second_names) = build_function_requests(&app, &instance());

        assert_eq!(first, second);
        assert_eq!(first_names, second_names);
        assert_eq!(first_names["a"].name, "multi-dev-app-a");
    }

    #[tokio::test]
    async fn selection_of_unknown_function_fails_without_remote_calls() {
        let platform = Arc::new(MockPlatform::default());
        let packager = Packager::new(platform.clone());
        let app = app(Some(SrcRef::Path("/does/not/matter.zip".into())));

        let error = format_inputs(
            &packager,
            FormatOptions {
                app: &app,
                app_id: APP_ID,
                instance: &instance(),
                state: &PersistedState::default(),
                selected: Some("missing"),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, FormatError::FunctionNotFound(ref key) if key == "missing"));
        assert_eq!(platform.calls(), 0);
    }

    #[tokio::test]
    async fn selected_function_gets_code_and_filtered_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_zip(dir.path(), "bundle.zip", &[("index.js", "main")]);
        let platform = Arc::new(MockPlatform::default());
        let packager = Packager::with_workspace_root(platform.clone(), dir.path().to_path_buf());
        let app = app(Some(SrcRef::Path(bundle.display().to_string())));

        let outputs = format_inputs(
            &packager,
            FormatOptions {
                app: &app,
                app_id: APP_ID,
                instance: &instance(),
                state: &PersistedState::default(),
                selected: Some("b"),
            },
        )
        .await
        .unwrap();

        assert_eq!(outputs.region, "ap-shanghai");
        assert_eq!(outputs.function_requests.len(), 1);
        assert_eq!(outputs.function_requests[0].name, "multi-dev-app-b");
        assert!(matches!(
            outputs.function_requests[0].code,
            Some(FunctionCode::Artifact(_))
        ));
        assert!(outputs.trigger_requests.is_empty());
    }

    #[tokio::test]
    async fn invalid_trigger_fails_before_packaging() {
        let platform = Arc::new(MockPlatform::default());
        let packager = Packager::new(platform.clone());
        let mut app = app(Some(SrcRef::Path("/bundle.zip".into())));
        app.triggers.push(TriggerSpec {
            kind: "timer".into(),
            function: Some("ghost".into()),
            parameters: json!({}),
        });

        let error = format_inputs(
            &packager,
            FormatOptions {
                app: &app,
                app_id: APP_ID,
                instance: &instance(),
                state: &PersistedState::default(),
                selected: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, FormatError::Trigger(_)));
        assert_eq!(platform.calls(), 0);
    }
}
