//! Synthetic input: mouse and keyboard.

use std::time::Duration;

use kestrel_cdp::protocol::input::{DispatchKeyEventParams, DispatchMouseEventParams};
use kestrel_cdp::protocol::runtime::CallArgument;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::instrument;

use super::Page;
use crate::error::PageError;

/// Default deadline for element resolution in input methods.
const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    /// Primary button.
    #[default]
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
}

impl MouseButton {
    fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
        }
    }
}

/// Keyboard modifiers, encoded per the Input domain bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Alt / Option.
    Alt,
    /// Control.
    Control,
    /// Meta / Command.
    Meta,
    /// Shift.
    Shift,
}

impl Modifier {
    fn bit(self) -> u32 {
        match self {
            Self::Alt => 1,
            Self::Control => 2,
            Self::Meta => 4,
            Self::Shift => 8,
        }
    }
}

pub(crate) fn modifier_mask(modifiers: &[Modifier]) -> u32 {
    modifiers.iter().fold(0, |mask, m| mask | m.bit())
}

/// Options for [`Page::click`].
#[derive(Debug, Clone)]
pub struct ClickOptions {
    /// Button to press.
    pub button: MouseButton,
    /// Click count; 2 for a double-click.
    pub count: u32,
    /// Held modifiers.
    pub modifiers: Vec<Modifier>,
    /// Offset from the element's top-left instead of the quad centroid.
    pub position: Option<(f64, f64)>,
    /// Skip scrolling the element into view first.
    pub force: bool,
    /// Deadline for finding the element.
    pub timeout: Duration,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            count: 1,
            modifiers: Vec::new(),
            position: None,
            force: false,
            timeout: DEFAULT_INPUT_TIMEOUT,
        }
    }
}

/// How [`Page::select_option`] interprets its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectBy {
    /// Match `<option value>`.
    Value,
    /// Match the option's visible text.
    Text,
    /// Match the option's index.
    Index,
}

impl Page {
    /// Click the first element matching `selector`.
    ///
    /// Scrolls the element into view (unless `force`), computes the
    /// click point from the content-quad centroid, and dispatches a
    /// press/release pair with identical coordinates. A double-click is
    /// one pair with `count = 2`.
    #[instrument(level = "debug", skip(self, options), fields(selector = %selector))]
    pub async fn click(&self, selector: &str, options: ClickOptions) -> Result<(), PageError> {
        let element = self.require_element(selector, options.timeout).await?;

        if !options.force {
            element.scroll_into_view().await?;
        }

        let (x, y) = match options.position {
            Some((dx, dy)) => {
                let rect = element
                    .call(
                        "function() { const r = this.getBoundingClientRect(); return {x: r.x, y: r.y}; }",
                        vec![],
                    )
                    .await?;
                (
                    rect["x"].as_f64().unwrap_or(0.0) + dx,
                    rect["y"].as_f64().unwrap_or(0.0) + dy,
                )
            }
            None => element.click_point().await?,
        };

        let modifiers = modifier_mask(&options.modifiers);
        let session = self.session().await?;
        for event_type in ["mousePressed", "mouseReleased"] {
            session
                .send_command::<_, serde_json::Value>(
                    "Input.dispatchMouseEvent",
                    Some(DispatchMouseEventParams {
                        event_type: event_type.to_string(),
                        x,
                        y,
                        modifiers: Some(modifiers),
                        button: Some(options.button.as_str().to_string()),
                        click_count: Some(options.count),
                        delta_x: None,
                        delta_y: None,
                    }),
                )
                .await?;
        }
        Ok(())
    }

    /// Double-click shorthand.
    pub async fn dblclick(&self, selector: &str) -> Result<(), PageError> {
        self.click(
            selector,
            ClickOptions {
                count: 2,
                ..ClickOptions::default()
            },
        )
        .await
    }

    /// Type `text` into the element, one key event pair per character,
    /// with `delay` between characters.
    #[instrument(level = "debug", skip(self, text), fields(selector = %selector, len = text.len()))]
    pub async fn type_text(
        &self,
        selector: &str,
        text: &str,
        delay: Duration,
    ) -> Result<(), PageError> {
        let element = self
            .require_element(selector, DEFAULT_INPUT_TIMEOUT)
            .await?;
        element.focus().await?;
        let session = self.session().await?;

        let mut first = true;
        for ch in text.chars() {
            if !first && !delay.is_zero() {
                sleep(delay).await;
            }
            first = false;

            let ch_text = ch.to_string();
            session
                .send_command::<_, serde_json::Value>(
                    "Input.dispatchKeyEvent",
                    Some(DispatchKeyEventParams {
                        event_type: "keyDown".to_string(),
                        text: Some(ch_text.clone()),
                        unmodified_text: Some(ch_text.clone()),
                        key: Some(ch_text.clone()),
                        ..Default::default()
                    }),
                )
                .await?;
            session
                .send_command::<_, serde_json::Value>(
                    "Input.dispatchKeyEvent",
                    Some(DispatchKeyEventParams {
                        event_type: "keyUp".to_string(),
                        key: Some(ch_text),
                        ..Default::default()
                    }),
                )
                .await?;
        }
        Ok(())
    }

    /// Press one named key (e.g. `Enter`, `Tab`, `ArrowDown`, `a`).
    pub async fn press(&self, key: &str, modifiers: &[Modifier]) -> Result<(), PageError> {
        let session = self.session().await?;
        let descriptor = key_descriptor(key);
        let mask = modifier_mask(modifiers);

        session
            .send_command::<_, serde_json::Value>(
                "Input.dispatchKeyEvent",
                Some(DispatchKeyEventParams {
                    event_type: if descriptor.text.is_some() {
                        "keyDown".to_string()
                    } else {
                        "rawKeyDown".to_string()
                    },
                    modifiers: Some(mask),
                    text: descriptor.text.clone(),
                    unmodified_text: descriptor.text.clone(),
                    key: Some(descriptor.key.clone()),
                    code: descriptor.code.clone(),
                    windows_virtual_key_code: descriptor.key_code,
                }),
            )
            .await?;
        session
            .send_command::<_, serde_json::Value>(
                "Input.dispatchKeyEvent",
                Some(DispatchKeyEventParams {
                    event_type: "keyUp".to_string(),
                    modifiers: Some(mask),
                    key: Some(descriptor.key),
                    code: descriptor.code,
                    windows_virtual_key_code: descriptor.key_code,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    /// Set an input's value directly and fire bubbling `input` and
    /// `change` events.
    #[instrument(level = "debug", skip(self, value), fields(selector = %selector))]
    pub async fn fill(&self, selector: &str, value: &str) -> Result<(), PageError> {
        let element = self
            .require_element(selector, DEFAULT_INPUT_TIMEOUT)
            .await?;
        element.focus().await?;
        element
            .call(
                "function(value) {\
                   this.value = value;\
                   this.dispatchEvent(new Event('input', {bubbles: true}));\
                   this.dispatchEvent(new Event('change', {bubbles: true}));\
                 }",
                vec![CallArgument::value(Value::String(value.to_string()))],
            )
            .await?;
        Ok(())
    }

    /// Check a checkbox/radio if it is not already checked.
    pub async fn check(&self, selector: &str) -> Result<(), PageError> {
        self.set_checked(selector, true).await
    }

    /// Uncheck a checkbox if it is currently checked.
    pub async fn uncheck(&self, selector: &str) -> Result<(), PageError> {
        self.set_checked(selector, false).await
    }

    async fn set_checked(&self, selector: &str, desired: bool) -> Result<(), PageError> {
        let element = self
            .require_element(selector, DEFAULT_INPUT_TIMEOUT)
            .await?;
        if element.is_checked().await? != desired {
            self.click(selector, ClickOptions::default()).await?;
        }
        Ok(())
    }

    /// Select options of a `<select>` element; returns the values that
    /// ended up selected.
    #[instrument(level = "debug", skip(self, values), fields(selector = %selector))]
    pub async fn select_option(
        &self,
        selector: &str,
        values: &[&str],
        by: SelectBy,
    ) -> Result<Vec<String>, PageError> {
        let element = self
            .require_element(selector, DEFAULT_INPUT_TIMEOUT)
            .await?;

        let mode = match by {
            SelectBy::Value => "value",
            SelectBy::Text => "text",
            SelectBy::Index => "index",
        };
        let wanted: Vec<Value> = values
            .iter()
            .map(|v| Value::String((*v).to_string()))
            .collect();

        let selected = element
            .call(
                "function(mode, wanted) {\
                   const matches = (option, i) => {\
                     if (mode === 'value') return wanted.includes(option.value);\
                     if (mode === 'text') return wanted.includes(option.textContent.trim());\
                     return wanted.includes(String(i));\
                   };\
                   const picked = [];\
                   for (let i = 0; i < this.options.length; i++) {\
                     const option = this.options[i];\
                     option.selected = matches(option, i);\
                     if (option.selected) picked.push(option.value);\
                     if (picked.length && !this.multiple) break;\
                   }\
                   this.dispatchEvent(new Event('input', {bubbles: true}));\
                   this.dispatchEvent(new Event('change', {bubbles: true}));\
                   return picked;\
                 }",
                vec![
                    CallArgument::value(Value::String(mode.to_string())),
                    CallArgument::value(json!(wanted)),
                ],
            )
            .await?;

        Ok(selected
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

struct KeyDescriptor {
    key: String,
    code: Option<String>,
    text: Option<String>,
    key_code: Option<u32>,
}

/// Resolve a named key to its DOM `key`/`code`/virtual-key fields.
fn key_descriptor(key: &str) -> KeyDescriptor {
    let named = |key: &str, code: &str, key_code: u32, text: Option<&str>| KeyDescriptor {
        key: key.to_string(),
        code: Some(code.to_string()),
        text: text.map(str::to_string),
        key_code: Some(key_code),
    };

    match key {
        "Enter" => named("Enter", "Enter", 13, Some("\r")),
        "Tab" => named("Tab", "Tab", 9, None),
        "Escape" => named("Escape", "Escape", 27, None),
        "Backspace" => named("Backspace", "Backspace", 8, None),
        "Delete" => named("Delete", "Delete", 46, None),
        "ArrowUp" => named("ArrowUp", "ArrowUp", 38, None),
        "ArrowDown" => named("ArrowDown", "ArrowDown", 40, None),
        "ArrowLeft" => named("ArrowLeft", "ArrowLeft", 37, None),
        "ArrowRight" => named("ArrowRight", "ArrowRight", 39, None),
        "Home" => named("Home", "Home", 36, None),
        "End" => named("End", "End", 35, None),
        "PageUp" => named("PageUp", "PageUp", 33, None),
        "PageDown" => named("PageDown", "PageDown", 34, None),
        "Shift" => named("Shift", "ShiftLeft", 16, None),
        "Control" => named("Control", "ControlLeft", 17, None),
        "Alt" => named("Alt", "AltLeft", 18, None),
        "Meta" => named("Meta", "MetaLeft", 91, None),
        " " | "Space" => named(" ", "Space", 32, Some(" ")),
        other => {
            // Printable single characters carry themselves as text.
            let text = (other.chars().count() == 1).then(|| other.to_string());
            KeyDescriptor {
                key: other.to_string(),
                code: None,
                text,
                key_code: None,
            }
        }
    }
}
