//! Runtime bindings: expose host functions to page JavaScript.
//!
//! `expose_function("fetchToken", f)` installs `window.fetchToken(...)`
//! returning a promise. Calls travel over `Runtime.bindingCalled`; the
//! callback runs host-side and its result resolves the page promise via
//! an injected delivery hook.

use std::sync::Arc;

use kestrel_cdp::protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use kestrel_cdp::protocol::runtime::{AddBindingParams, BindingCalledEvent};
use serde_json::Value;
use tracing::{debug, warn};

use super::Page;
use crate::error::PageError;

/// Host callback invoked with the page-supplied arguments.
pub type BindingCallback = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

#[derive(serde::Deserialize)]
struct BindingPayload {
    seq: u64,
    args: Vec<Value>,
}

/// The page-side shim: wraps the raw CDP binding into a promise-returning
/// function with a per-call sequence number.
fn binding_shim(name: &str) -> String {
    format!(
        r#"(() => {{
  const binding = window["{name}"];
  const wrapper = (...args) => {{
    const me = window["{name}"];
    if (!me.callbacks) {{ me.callbacks = new Map(); me.seq = 0; }}
    const seq = ++me.seq;
    binding(JSON.stringify({{seq, args}}));
    return new Promise((resolve, reject) => me.callbacks.set(seq, {{resolve, reject}}));
  }};
  wrapper.deliver = (seq, result) => {{
    const pending = wrapper.callbacks && wrapper.callbacks.get(seq);
    if (pending) {{ wrapper.callbacks.delete(seq); pending.resolve(result); }}
  }};
  window["{name}"] = wrapper;
}})()"#
    )
}

impl Page {
    /// Install `window.<name>` forwarding calls to `callback`.
    ///
    /// The binding survives navigations: the shim re-installs on every
    /// new document.
    pub async fn expose_function<F>(&self, name: &str, callback: F) -> Result<(), PageError>
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.expose_callback(name, Arc::new(callback)).await
    }

    /// [`Page::expose_function`] with a shared callback, for contexts
    /// propagating one binding across many pages.
    pub(crate) async fn expose_callback(
        &self,
        name: &str,
        callback: BindingCallback,
    ) -> Result<(), PageError> {
        let session = self.session().await?;

        session
            .send_command::<_, serde_json::Value>(
                "Runtime.addBinding",
                Some(AddBindingParams {
                    name: name.to_string(),
                }),
            )
            .await?;

        let shim = binding_shim(name);
        session
            .send_command::<_, serde_json::Value>(
                "Page.addScriptToEvaluateOnNewDocument",
                Some(AddScriptToEvaluateOnNewDocumentParams {
                    source: shim.clone(),
                }),
            )
            .await?;
        // Install on the current document too.
        self.evaluate(shim).await?;

        let binding_name = name.to_string();
        let session_id = session.session_id().to_string();
        self.router().on(
            &session_id,
            "Runtime.bindingCalled",
            move |event| {
                let Some(called) = event.parse_params::<BindingCalledEvent>() else {
                    return;
                };
                if called.name != binding_name {
                    return;
                }
                let Ok(payload) = serde_json::from_str::<BindingPayload>(&called.payload) else {
                    warn!(name = %binding_name, "Malformed binding payload");
                    return;
                };

                debug!(name = %binding_name, seq = payload.seq, "Binding called");
                let result = callback(payload.args);
                let session = session.clone();
                let binding_name = binding_name.clone();
                // Resolve the page promise off the dispatch path.
                tokio::spawn(async move {
                    let result_literal = serde_json::to_string(&result)
                        .unwrap_or_else(|_| "null".to_string());
                    let expression = format!(
                        "window[{}].deliver({}, {result_literal})",
                        serde_json::to_string(&binding_name).unwrap_or_default(),
                        payload.seq,
                    );
                    let delivered = session
                        .send_command::<_, serde_json::Value>(
                            "Runtime.evaluate",
                            Some(kestrel_cdp::protocol::runtime::EvaluateParams::by_value(
                                expression,
                            )),
                        )
                        .await;
                    if delivered.is_err() {
                        warn!(name = %binding_name, "Failed to deliver binding result");
                    }
                });
            },
        );

        Ok(())
    }
}
