//! Runtime domain types.
//!
//! JavaScript evaluation, remote object handles, and runtime bindings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A handle to a JavaScript object living in the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// JS type (`object`, `string`, `number`, `undefined`, ...).
    #[serde(rename = "type")]
    pub object_type: String,
    /// Object subtype (`node`, `array`, `null`, ...).
    pub subtype: Option<String>,
    /// Class name for objects.
    pub class_name: Option<String>,
    /// Primitive value, transferred by value.
    pub value: Option<Value>,
    /// String representation for values that do not round-trip JSON.
    pub unserializable_value: Option<String>,
    /// Preview description.
    pub description: Option<String>,
    /// Handle id for by-reference results.
    pub object_id: Option<String>,
}

/// Exception information attached to failed evaluations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception id.
    pub exception_id: i64,
    /// One-line summary.
    pub text: String,
    /// Line number of the throw site.
    pub line_number: i64,
    /// Column number of the throw site.
    pub column_number: i64,
    /// The thrown value.
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Best human-readable description of the exception.
    pub fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| self.text.clone())
    }
}

/// Parameters for `Runtime.evaluate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// Expression to evaluate.
    pub expression: String,
    /// Transfer the result by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    /// Await the result if it is a promise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    /// Run with user gesture semantics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
}

impl EvaluateParams {
    /// By-value, promise-awaiting evaluation of `expression`.
    pub fn by_value(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            return_by_value: Some(true),
            await_promise: Some(true),
            user_gesture: None,
        }
    }
}

/// Result of `Runtime.evaluate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    /// Evaluation result.
    pub result: RemoteObject,
    /// Present when the evaluation threw.
    pub exception_details: Option<ExceptionDetails>,
}

/// One argument of a `Runtime.callFunctionOn` call.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    /// Primitive argument value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Handle argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl CallArgument {
    /// A by-value argument.
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            object_id: None,
        }
    }

    /// A by-reference argument.
    pub fn object(object_id: impl Into<String>) -> Self {
        Self {
            value: None,
            object_id: Some(object_id.into()),
        }
    }
}

/// Parameters for `Runtime.callFunctionOn`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnParams {
    /// Function declaration to call.
    pub function_declaration: String,
    /// Object whose `this` the function runs with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Call arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<CallArgument>>,
    /// Transfer the result by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    /// Await the result if it is a promise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

/// Result of `Runtime.callFunctionOn`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionOnResult {
    /// Call result.
    pub result: RemoteObject,
    /// Present when the call threw.
    pub exception_details: Option<ExceptionDetails>,
}

/// Parameters for `Runtime.getProperties`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPropertiesParams {
    /// Object to enumerate.
    pub object_id: String,
    /// Only own properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_properties: Option<bool>,
}

/// One property descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Property value, absent for accessors.
    pub value: Option<RemoteObject>,
    /// Whether the property is enumerable.
    pub enumerable: Option<bool>,
}

/// Result of `Runtime.getProperties`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPropertiesResult {
    /// Property descriptors.
    pub result: Vec<PropertyDescriptor>,
}

/// Parameters for `Runtime.addBinding`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBindingParams {
    /// Name installed on `window`.
    pub name: String,
}

/// Parameters for `Runtime.releaseObject`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseObjectParams {
    /// Handle to release.
    pub object_id: String,
}

/// Event: `Runtime.bindingCalled`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingCalledEvent {
    /// Binding name.
    pub name: String,
    /// Stringified payload the page passed.
    pub payload: String,
    /// Execution context the call came from.
    pub execution_context_id: i64,
}
