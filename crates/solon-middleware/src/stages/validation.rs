//! Request and response validation against the operation's contract.
//!
//! Request validation coerces raw path and query strings into their
//! declared types and checks the body against the request schema. Every
//! problem is collected, so one 400 response lists all offending fields as
//! `location.field: reason` (for example `path.userId: expected integer`).
//!
//! Response validation checks what a handler returned. In
//! [`ResponseValidationMode::Observe`] a mismatch is only logged and
//! counted; in [`ResponseValidationMode::Strict`] it turns the response
//! into a 500.

use serde_json::Value;
use solon_core::{FieldErrors, Operation, ParamValues, SolonError, SolonResult};
use solon_router::Params;
use solon_telemetry::metrics::record_validation_failure;
use tracing::warn;

/// How response mismatches are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseValidationMode {
    /// Log and count mismatches, send the response unchanged.
    #[default]
    Observe,
    /// Replace a mismatching response with a 500.
    Strict,
}

/// Typed parameters produced by a successful request validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParams {
    /// Path parameters, coerced to their declared types.
    pub path: ParamValues,
    /// Query parameters; declared ones are typed, others kept as strings.
    pub query: ParamValues,
}

/// Contract-driven validator.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    validate_responses: bool,
    response_mode: ResponseValidationMode,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            validate_responses: true,
            response_mode: ResponseValidationMode::Observe,
        }
    }
}

impl Validator {
    /// Creates a validator that observes response mismatches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response mode.
    #[must_use]
    pub fn with_response_mode(mut self, mode: ResponseValidationMode) -> Self {
        self.response_mode = mode;
        self
    }

    /// Turns response checking on or off.
    #[must_use]
    pub fn with_response_validation(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }

    /// Returns the response mode.
    #[must_use]
    pub const fn response_mode(&self) -> ResponseValidationMode {
        self.response_mode
    }

    /// Validates path parameters, the query string and the body.
    pub fn validate_request(
        &self,
        operation: &Operation,
        path_params: &Params,
        query: Option<&str>,
        body: &[u8],
    ) -> SolonResult<ValidatedParams> {
        let mut errors = FieldErrors::new();

        let path = coerce_path(operation, path_params, &mut errors);
        let query = coerce_query(operation, query.unwrap_or(""), &mut errors);

        if let Some(schema) = operation.request_schema() {
            if body.is_empty() {
                errors.extend(schema.validate(&Value::Null, "body"));
            } else {
                match serde_json::from_slice::<Value>(body) {
                    Ok(value) => errors.extend(schema.validate(&value, "body")),
                    Err(e) => errors.add("body", format!("invalid JSON: {e}")),
                }
            }
        }

        if errors.is_empty() {
            Ok(ValidatedParams { path, query })
        } else {
            record_validation_failure("request");
            Err(SolonError::validation(errors))
        }
    }

    /// Checks a handler's response against the schema declared for
    /// `status`.
    ///
    /// Returns an error only in strict mode. Operations without a schema
    /// for the status are not checked.
    pub fn check_response(
        &self,
        operation: &Operation,
        status: u16,
        body: Option<&Value>,
    ) -> SolonResult<()> {
        if !self.validate_responses {
            return Ok(());
        }
        let Some(schema) = operation.response_schema(status) else {
            return Ok(());
        };

        let errors = schema.validate(body.unwrap_or(&Value::Null), "response");
        if errors.is_empty() {
            return Ok(());
        }

        record_validation_failure("response");
        warn!(
            operation_id = operation.id(),
            http.status_code = status,
            errors = %errors,
            mode = ?self.response_mode,
            "Response does not match its schema"
        );

        match self.response_mode {
            ResponseValidationMode::Observe => Ok(()),
            ResponseValidationMode::Strict => Err(SolonError::handler(
                operation.id(),
                anyhow::anyhow!("response failed validation: {errors}"),
            )),
        }
    }
}

fn coerce_path(operation: &Operation, params: &Params, errors: &mut FieldErrors) -> ParamValues {
    let mut values = ParamValues::new();
    for (name, raw) in params.iter() {
        let param_type = operation.path_param_type(name);
        match param_type.coerce(raw) {
            Some(value) => {
                values.insert(name.to_string(), value);
            }
            None => errors.add(format!("path.{name}"), format!("expected {param_type}")),
        }
    }
    values
}

fn coerce_query(operation: &Operation, raw: &str, errors: &mut FieldErrors) -> ParamValues {
    let pairs = match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
        Ok(pairs) => pairs,
        Err(e) => {
            errors.add("query", format!("malformed query string: {e}"));
            return ParamValues::new();
        }
    };

    let mut values = ParamValues::new();
    for declared in operation.query_params() {
        let name = declared.name.as_str();
        match pairs.iter().find(|(key, _)| key == name) {
            Some((_, raw)) => match declared.param_type.coerce(raw) {
                Some(value) => {
                    values.insert(name.to_string(), value);
                }
                None => errors.add(
                    format!("query.{name}"),
                    format!("expected {}", declared.param_type),
                ),
            },
            None if declared.required => {
                errors.add(format!("query.{name}"), "required parameter is missing");
            }
            None => {}
        }
    }

    // Undeclared parameters pass through untyped; the first occurrence wins.
    for (key, value) in pairs {
        if !values.contains_key(&key) && operation.query_params().all(|p| p.name != key) {
            values.insert(key, Value::String(value));
        }
    }

    values
}
