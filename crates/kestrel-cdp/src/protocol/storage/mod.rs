//! Storage domain types.
//!
//! Context-scoped cookie access. Unlike `Network.*Cookies`, these take a
//! `browserContextId` and work without an attached page session.

use serde::{Deserialize, Serialize};

use super::network::{Cookie, CookieParam};

/// Parameters for `Storage.getCookies`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesParams {
    /// Context to read; absent means the default context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

/// Result of `Storage.getCookies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesResult {
    /// All cookies of the context.
    pub cookies: Vec<Cookie>,
}

/// Parameters for `Storage.setCookies`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookiesParams {
    /// Cookies to install.
    pub cookies: Vec<CookieParam>,
    /// Context to write; absent means the default context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

/// Parameters for `Storage.clearCookies`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClearCookiesParams {
    /// Context to clear; absent means the default context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}
