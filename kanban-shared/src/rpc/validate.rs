/// Request shape validation interceptor
///
/// Each method registers a predicate over its JSON body; the predicate
/// decodes the body into the method's request message and runs its
/// `validator` rules. All field failures come back in one
/// `validation_failed` status. Methods without a predicate pass through.
///
/// # Example
///
/// ```
/// use kanban_shared::rpc::validate::ShapeValidator;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct CreateThing {
///     #[validate(length(min = 1))]
///     name: String,
/// }
///
/// let validator = ShapeValidator::new().check::<CreateThing>("things.ThingService/CreateThing");
/// assert!(validator.covers("things.ThingService/CreateThing"));
/// ```

use super::chain::{handler_fn, Handler, Interceptor};
use crate::error::{FieldViolation, Status};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

type Check = fn(&Value) -> Result<(), Status>;

#[derive(Clone, Default)]
pub struct ShapeValidator {
    checks: Arc<HashMap<&'static str, Check>>,
}

impl ShapeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` as the shape of `method`
    pub fn check<T>(mut self, method: &'static str) -> Self
    where
        T: DeserializeOwned + Validate + 'static,
    {
        Arc::make_mut(&mut self.checks).insert(method, validate_as::<T>);
        self
    }

    pub fn covers(&self, method: &str) -> bool {
        self.checks.contains_key(method)
    }

    pub fn validate(&self, method: &str, body: &Value) -> Result<(), Status> {
        match self.checks.get(method) {
            Some(check) => check(body),
            None => Ok(()),
        }
    }
}

/// Decodes `body` as `T` and runs its validation rules
pub fn validate_as<T>(body: &Value) -> Result<(), Status>
where
    T: DeserializeOwned + Validate,
{
    let message = decode::<T>(body)?;
    message.validate()?;
    Ok(())
}

/// Decodes a request body, reporting malformed input as a body violation
pub fn decode<T: DeserializeOwned>(body: &Value) -> Result<T, Status> {
    T::deserialize(body).map_err(|e| {
        Status::validation(vec![FieldViolation::new("body", "malformed", e.to_string())])
    })
}

impl Interceptor for ShapeValidator {
    fn wrap(&self, next: Handler) -> Handler {
        let validator = self.clone();
        handler_fn(move |req| {
            let result = validator.validate(&req.method, &req.body);
            let next = next.clone();
            async move {
                if let Err(status) = result {
                    tracing::debug!(
                        method = %req.method,
                        violations = status.details.len(),
                        "Request rejected by shape validation"
                    );
                    return Err(status);
                }
                next(req).await
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use crate::rpc::chain::RpcRequest;
    use crate::rpc::context::RequestContext;
    use crate::rpc::metadata::Metadata;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct MoveThing {
        #[validate(range(min = 1, message = "id must be positive"))]
        id: i64,
        #[validate(range(min = 1, message = "newPosition must be at least 1"))]
        new_position: i64,
    }

    const METHOD: &str = "things.ThingService/MoveThing";

    fn request(body: Value) -> RpcRequest {
        RpcRequest {
            method: METHOD.to_string(),
            metadata: Metadata::new(),
            body,
            context: RequestContext::new("r", tokio::time::Instant::now()),
        }
    }

    #[test]
    fn test_all_failures_are_aggregated() {
        let validator = ShapeValidator::new().check::<MoveThing>(METHOD);
        let err = validator
            .validate(METHOD, &json!({"id": 0, "newPosition": 0}))
            .unwrap_err();

        assert_eq!(err.code, Code::ValidationFailed);
        assert_eq!(err.details.len(), 2);
    }

    #[test]
    fn test_malformed_body() {
        let validator = ShapeValidator::new().check::<MoveThing>(METHOD);
        let err = validator.validate(METHOD, &json!({"id": "x"})).unwrap_err();
        assert_eq!(err.details[0].field, "body");
        assert_eq!(err.details[0].code, "malformed");
    }

    #[test]
    fn test_unregistered_method_passes() {
        let validator = ShapeValidator::new();
        assert!(validator.validate("other/Method", &Value::Null).is_ok());
    }

    #[tokio::test]
    async fn test_interceptor_short_circuits() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = reached.clone();
        let terminal = handler_fn(move |_req| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
        });

        let chain = ShapeValidator::new().check::<MoveThing>(METHOD).wrap(terminal);
        let err = chain(request(json!({"id": 1, "newPosition": 0}))).await.unwrap_err();

        assert_eq!(err.code, Code::ValidationFailed);
        assert!(!reached.load(Ordering::SeqCst));

        chain(request(json!({"id": 1, "newPosition": 3}))).await.unwrap();
        assert!(reached.load(Ordering::SeqCst));
    }
}
