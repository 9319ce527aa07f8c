//! DOM queries and element handles.

use std::time::Duration;

use kestrel_cdp::protocol::dom::{GetContentQuadsParams, GetContentQuadsResult};
use kestrel_cdp::protocol::runtime::{
    CallArgument, CallFunctionOnParams, CallFunctionOnResult, GetPropertiesParams,
    GetPropertiesResult,
};
use kestrel_cdp::CdpSession;
use serde_json::Value;
use tokio::time::{sleep, Instant};

use super::selector::{self, ParsedSelector, SelectorKind};
use super::Page;
use crate::error::PageError;

/// Poll interval for selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Element states a wait can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Present in the DOM.
    Attached,
    /// Present, displayed, and has a non-empty box.
    Visible,
    /// Absent, or present but not visible.
    Hidden,
}

/// A handle to one element in the page.
#[derive(Debug, Clone)]
pub struct ElementHandle {
    session: CdpSession,
    object_id: String,
    selector: String,
}

impl ElementHandle {
    pub(crate) fn new(session: CdpSession, object_id: String, selector: String) -> Self {
        Self {
            session,
            object_id,
            selector,
        }
    }

    /// The remote object id backing this handle.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// The selector that produced this handle.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Run `function_declaration` with this element as `this`.
    pub async fn call(
        &self,
        function_declaration: &str,
        arguments: Vec<CallArgument>,
    ) -> Result<Value, PageError> {
        let result: CallFunctionOnResult = self
            .session
            .send_command(
                "Runtime.callFunctionOn",
                Some(CallFunctionOnParams {
                    function_declaration: function_declaration.to_string(),
                    object_id: Some(self.object_id.clone()),
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

    /// The element's lowercase tag name.
    pub async fn tag_name(&self) -> Result<String, PageError> {
        let value = self
            .call("function() { return this.tagName.toLowerCase(); }", vec![])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// One attribute value.
    pub async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        let value = self
            .call(
                "function(name) { return this.getAttribute(name); }",
                vec![CallArgument::value(Value::String(name.to_string()))],
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// The element's text content.
    pub async fn text_content(&self) -> Result<Option<String>, PageError> {
        let value = self
            .call("function() { return this.textContent; }", vec![])
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// The element's serialized markup.
    pub async fn outer_html(&self) -> Result<String, PageError> {
        let value = self
            .call("function() { return this.outerHTML; }", vec![])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Whether the element is rendered with a non-empty box.
    pub async fn is_visible(&self) -> Result<bool, PageError> {
        let value = self
            .call(
                "function() {\
                   const style = window.getComputedStyle(this);\
                   if (style.visibility === 'hidden' || style.display === 'none') return false;\
                   const rect = this.getBoundingClientRect();\
                   return rect.width > 0 && rect.height > 0;\
                 }",
                vec![],
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Whether a checkbox/radio is currently checked.
    pub async fn is_checked(&self) -> Result<bool, PageError> {
        let value = self
            .call("function() { return !!this.checked; }", vec![])
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Scroll the element into the center of the viewport.
    pub async fn scroll_into_view(&self) -> Result<(), PageError> {
        self.call(
            "function() { this.scrollIntoView({block: 'center', inline: 'center'}); }",
            vec![],
        )
        .await?;
        Ok(())
    }

    /// Focus the element.
    pub async fn focus(&self) -> Result<(), PageError> {
        self.session
            .send_command::<_, serde_json::Value>(
                "DOM.focus",
                Some(kestrel_cdp::protocol::dom::FocusParams {
                    object_id: Some(self.object_id.clone()),
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    /// The centroid of the element's first content quad, in viewport
    /// coordinates.
    pub async fn click_point(&self) -> Result<(f64, f64), PageError> {
        let result: GetContentQuadsResult = self
            .session
            .send_command(
                "DOM.getContentQuads",
                Some(GetContentQuadsParams {
                    object_id: Some(self.object_id.clone()),
                    ..Default::default()
                }),
            )
            .await?;

        let quad = result
            .quads
            .first()
            .filter(|quad| quad.len() == 8)
            .ok_or_else(|| PageError::NoBoundingBox(self.selector.clone()))?;

        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
        Ok((x, y))
    }
}

fn query_expression(parsed: &ParsedSelector, all: bool) -> String {
    let literal = serde_json::to_string(&parsed.value).unwrap_or_else(|_| "\"\"".to_string());
    match (parsed.kind, all) {
        (SelectorKind::Css, false) => format!("document.querySelector({literal})"),
        (SelectorKind::Css, true) => {
            format!("Array.from(document.querySelectorAll({literal}))")
        }
        (SelectorKind::XPath, false) => format!(
            "document.evaluate({literal}, document, null, \
             XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        ),
        (SelectorKind::XPath, true) => format!(
            "(() => {{\
               const it = document.evaluate({literal}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);\
               const out = [];\
               for (let i = 0; i < it.snapshotLength; i++) out.push(it.snapshotItem(i));\
               return out;\
             }})()"
        ),
    }
}

impl Page {
    /// Find the first element matching `selector`, or `None`.
    ///
    /// The selector grammar is described in [`selector`](super::selector).
    pub async fn query(&self, selector_str: &str) -> Result<Option<ElementHandle>, PageError> {
        let parsed = selector::parse(selector_str)?;

        if let Some(index) = parsed.index {
            let all = self.query_parsed_all(&parsed, selector_str).await?;
            return Ok(all.into_iter().nth(index));
        }

        let session = self.session().await?;
        let object = self
            .evaluate_handle(query_expression(&parsed, false))
            .await?;
        Ok(object
            .object_id
            .map(|id| ElementHandle::new(session, id, selector_str.to_string())))
    }

    /// Find all elements matching `selector`, in document order.
    pub async fn query_all(&self, selector_str: &str) -> Result<Vec<ElementHandle>, PageError> {
        let parsed = selector::parse(selector_str)?;
        let all = self.query_parsed_all(&parsed, selector_str).await?;
        Ok(match parsed.index {
            Some(index) => all.into_iter().nth(index).into_iter().collect(),
            None => all,
        })
    }

    async fn query_parsed_all(
        &self,
        parsed: &ParsedSelector,
        selector_str: &str,
    ) -> Result<Vec<ElementHandle>, PageError> {
        let session = self.session().await?;
        let array = self.evaluate_handle(query_expression(parsed, true)).await?;
        let Some(array_id) = array.object_id else {
            return Ok(Vec::new());
        };

        let properties: GetPropertiesResult = session
            .send_command(
                "Runtime.getProperties",
                Some(GetPropertiesParams {
                    object_id: array_id,
                    own_properties: Some(true),
                }),
            )
            .await?;

        let mut handles = Vec::new();
        for descriptor in properties.result {
            // Array elements enumerate with numeric names; skip length
            // and friends.
            if descriptor.name.bytes().all(|b| b.is_ascii_digit()) {
                if let Some(object_id) = descriptor.value.and_then(|v| v.object_id) {
                    handles.push(ElementHandle::new(
                        session.clone(),
                        object_id,
                        selector_str.to_string(),
                    ));
                }
            }
        }
        Ok(handles)
    }

    /// Poll until `selector` reaches `state` or `deadline` elapses.
    ///
    /// Resolves with the handle for `Attached`/`Visible`, and `None`
    /// for a satisfied `Hidden` wait.
    pub async fn wait_for_selector(
        &self,
        selector_str: &str,
        state: ElementState,
        deadline: Duration,
    ) -> Result<Option<ElementHandle>, PageError> {
        self.check_open()?;
        let started = Instant::now();
        let mut saw_invisible = false;

        loop {
            let found = self.query(selector_str).await?;
            match (state, found) {
                (ElementState::Attached, Some(handle)) => return Ok(Some(handle)),
                (ElementState::Visible, Some(handle)) => {
                    if handle.is_visible().await? {
                        return Ok(Some(handle));
                    }
                    saw_invisible = true;
                }
                (ElementState::Hidden, None) => return Ok(None),
                (ElementState::Hidden, Some(handle)) => {
                    if !handle.is_visible().await? {
                        return Ok(None);
                    }
                }
                (_, None) => {}
            }

            if started.elapsed() >= deadline {
                return Err(if saw_invisible {
                    PageError::ElementNotVisible(selector_str.to_string())
                } else {
                    PageError::ElementNotFound(selector_str.to_string())
                });
            }
            sleep(POLL_INTERVAL.min(deadline.saturating_sub(started.elapsed()))).await;
        }
    }

    /// Find `selector` or fail with `ElementNotFound` after `deadline`.
    pub(crate) async fn require_element(
        &self,
        selector_str: &str,
        deadline: Duration,
    ) -> Result<ElementHandle, PageError> {
        self.wait_for_selector(selector_str, ElementState::Attached, deadline)
            .await?
            .ok_or_else(|| PageError::ElementNotFound(selector_str.to_string()))
    }
}
