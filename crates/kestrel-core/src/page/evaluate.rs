//! JavaScript evaluation.

use kestrel_cdp::protocol::runtime::{
    CallFunctionOnParams, CallFunctionOnResult, EvaluateParams, EvaluateResult, RemoteObject,
};
use serde_json::Value;

use super::Page;
use crate::error::PageError;

impl Page {
    /// Evaluate `expression` on the page and return its value.
    ///
    /// Promises are awaited; the result is transferred by value. A
    /// thrown exception surfaces as [`PageError::Script`] carrying the
    /// exception summary.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value, PageError> {
        let session = self.session().await?;
        let result: EvaluateResult = session
            .send_command(
                "Runtime.evaluate",
                Some(EvaluateParams::by_value(expression)),
            )
            .await?;

        if let Some(details) = result.exception_details {
            return Err(PageError::Script(details.message()));
        }
        Ok(result.result.value.unwrap_or(Value::Null))
    }

    /// Call `function_declaration` with JSON arguments and return its
    /// value.
    ///
    /// Arguments are embedded by value; use handles for DOM nodes.
    pub async fn evaluate_with_args(
        &self,
        function_declaration: &str,
        args: Vec<Value>,
    ) -> Result<Value, PageError> {
        let serialized: Vec<String> = args
            .iter()
            .map(|arg| serde_json::to_string(arg).unwrap_or_else(|_| "null".to_string()))
            .collect();
        let expression = format!("({function_declaration})({})", serialized.join(", "));
        self.evaluate(expression).await
    }

    /// Evaluate `expression` and keep the result as an opaque handle
    /// for follow-up calls.
    pub async fn evaluate_handle(
        &self,
        expression: impl Into<String>,
    ) -> Result<RemoteObject, PageError> {
        let session = self.session().await?;
        let result: EvaluateResult = session
            .send_command(
                "Runtime.evaluate",
                Some(EvaluateParams {
                    expression: expression.into(),
                    return_by_value: Some(false),
                    await_promise: Some(true),
                    user_gesture: None,
                }),
            )
            .await?;

        if let Some(details) = result.exception_details {
            return Err(PageError::Script(details.message()));
        }
        Ok(result.result)
    }

    /// Run a function with an element handle as `this`, returning by
    /// value.
    pub(crate) async fn call_on_object(
        &self,
        object_id: &str,
        function_declaration: &str,
        arguments: Vec<kestrel_cdp::protocol::runtime::CallArgument>,
    ) -> Result<Value, PageError> {
        let session = self.session().await?;
        let result: CallFunctionOnResult = session
            .send_command(
                "Runtime.callFunctionOn",
                Some(CallFunctionOnParams {
                    function_declaration: function_declaration.to_string(),
                    object_id: Some(object_id.to_string()),
                    arguments: Some(arguments),
                    return_by_value: Some(true),
                    await_promise: Some(true),
                }),
            )
            .await?;

        if let Some(details) = result.exception_details {
            return Err(PageError::Script(details.message()));
        }
        Ok(result.result.value.unwrap_or(Value::Null))
    }
}
