use crate::{
    app::{
        defs::{ApigwParameters, TriggerKind, TriggerSpec},
        impls::TriggerKindError,
    },
    consts::{APIGW_TRIGGER_TYPE, DEFAULT_APIGW_QUALIFIER},
    types::{
        ApigwTriggerParameters, ApigwTriggerRequest, EventTriggerRequest, FunctionNameMap,
        ResolvedApi, ResolvedFunctionRef, TriggerOutput, TriggerRecord, TriggerRequest,
    },
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum TriggerError {
    #[error("Trigger #{index} ({kind}) is invalid: {error}")]
    Invalid {
        index: usize,
        kind: String,
        #[source]
        error: TriggerKindError,
    },
    #[error("Trigger #{index} ({kind}) references undeclared function {key}")]
    UnknownFunction {
        index: usize,
        kind: String,
        key: String,
    },
}

/// Finds the gateway service registered under `service_name` by a previous deploy.
pub fn find_apigw_state<'a>(
    service_name: &str,
    triggers: &'a [TriggerOutput],
) -> Option<&'a TriggerRecord> {
    triggers
        .iter()
        .flat_map(|output| output.triggers.iter())
        .find(|record| {
            record.service_id.is_some() && record.service_name.as_deref() == Some(service_name)
        })
}

/// Resolves function-keys in trigger specs against the name map.
///
/// With a selection scope only triggers bound to the selected key survive.
/// Gateway triggers keep the routes bound to it and are dropped when none
/// remain.
pub struct TriggerResolver<'a> {
    pub function_names: &'a FunctionNameMap,
    pub previous_triggers: &'a [TriggerOutput],
    pub namespace: &'a str,
    pub selected: Option<&'a str>,
}

impl TriggerResolver<'_> {
    pub fn resolve(&self, triggers: &[TriggerSpec]) -> Result<Vec<TriggerRequest>, TriggerError> {
        let mut requests = Vec::new();

        for (index, spec) in triggers.iter().enumerate() {
            let kind = TriggerKind::try_from(spec).map_err(|error| TriggerError::Invalid {
                index,
                kind: spec.kind.clone(),
                error,
            })?;

            let request = match kind {
                TriggerKind::Apigw(parameters) => self
                    .resolve_apigw(index, parameters)?
                    .map(TriggerRequest::Apigw),
                TriggerKind::Event { kind, function } => self
                    .resolve_event(index, kind, &function, spec)?
                    .map(TriggerRequest::Event),
            };

            match request {
                Some(request) => requests.push(request),
                None => {
                    tracing::debug!(index, kind = %spec.kind, "Trigger not selected. Skipping.");
                }
            }
        }

        Ok(requests)
    }

    fn is_selected(&self, function_key: &str) -> bool {
        self.selected.map_or(true, |selected| selected == function_key)
    }

    fn function_ref(
        &self,
        index: usize,
        kind: &str,
        function_key: &str,
        qualifier: Option<String>,
    ) -> Result<ResolvedFunctionRef, TriggerError> {
        let identity =
            self.function_names
                .get(function_key)
                .ok_or_else(|| TriggerError::UnknownFunction {
                    index,
                    kind: kind.to_string(),
                    key: function_key.to_string(),
                })?;

        Ok(ResolvedFunctionRef {
            function_name: identity.name.clone(),
            function_type: identity.function_type.clone(),
            function_namespace: identity.namespace.clone(),
            function_qualifier: qualifier,
        })
    }

    fn resolve_event(
        &self,
        index: usize,
        kind: String,
        function_key: &str,
        spec: &TriggerSpec,
    ) -> Result<Option<EventTriggerRequest>, TriggerError> {
        let function = self.function_ref(index, &kind, function_key, None)?;

        if !self.is_selected(function_key) {
            return Ok(None);
        }

        Ok(Some(EventTriggerRequest {
            kind,
            namespace: self.namespace.to_string(),
            function,
            parameters: spec.parameters.clone(),
        }))
    }

    fn resolve_apigw(
        &self,
        index: usize,
        parameters: ApigwParameters,
    ) -> Result<Option<ApigwTriggerRequest>, TriggerError> {
        let service_name = parameters.name;
        let old_state = find_apigw_state(&service_name, self.previous_triggers).cloned();

        let is_input_service_id = parameters.id.is_some();
        let service_id = parameters.id.or_else(|| {
            old_state
                .as_ref()
                .and_then(|state| state.service_id.clone())
        });

        if let Some(ref service_id) = service_id {
            tracing::info!(%service_name, %service_id, is_input_service_id, "Using existing gateway service.");
        }

        let qualifier = parameters
            .qualifier
            .unwrap_or_else(|| DEFAULT_APIGW_QUALIFIER.to_string());

        let mut endpoints = Vec::new();
        for api in parameters.apis {
            let function =
                self.function_ref(index, APIGW_TRIGGER_TYPE, &api.function, Some(qualifier.clone()))?;

            if self.is_selected(&api.function) {
                endpoints.push(ResolvedApi {
                    path: api.path,
                    method: api.method,
                    function,
                    extra: api.extra,
                });
            }
        }

        if self.selected.is_some() && endpoints.is_empty() {
            return Ok(None);
        }

        Ok(Some(ApigwTriggerRequest {
            kind: APIGW_TRIGGER_TYPE.to_string(),
            namespace: self.namespace.to_string(),
            parameters: ApigwTriggerParameters {
                service_name,
                service_id,
                is_input_service_id,
                endpoints,
                old_state,
                extra: parameters.extra,
            },
        }))
    }
}
