//! DOM domain types.
//!
//! Document/node access, queries, attributes, and geometry.

use serde::{Deserialize, Serialize};

/// A DOM node as described by the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node id, scoped to the session's current document.
    pub node_id: i64,
    /// Backend node id, stable across document lifetime.
    pub backend_node_id: i64,
    /// Node type (1 = element, 3 = text, 9 = document).
    pub node_type: i64,
    /// Node name, e.g. `DIV`.
    pub node_name: String,
    /// Local (lowercase) name.
    pub local_name: String,
    /// Node value for text nodes.
    pub node_value: String,
    /// Flat `[name, value, ...]` attribute list.
    pub attributes: Option<Vec<String>>,
    /// Child count.
    pub child_node_count: Option<i64>,
}

/// Parameters for `DOM.getDocument`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentParams {
    /// Depth of the subtree to return; 0 means just the node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
}

/// Result of `DOM.getDocument`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentResult {
    /// The document root node.
    pub root: Node,
}

/// Parameters for `DOM.querySelector`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorParams {
    /// Node to query under.
    pub node_id: i64,
    /// CSS selector.
    pub selector: String,
}

/// Result of `DOM.querySelector`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorResult {
    /// Matching node id; 0 when nothing matched.
    pub node_id: i64,
}

/// Parameters for `DOM.querySelectorAll`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorAllParams {
    /// Node to query under.
    pub node_id: i64,
    /// CSS selector.
    pub selector: String,
}

/// Result of `DOM.querySelectorAll`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorAllResult {
    /// Matching node ids in document order.
    pub node_ids: Vec<i64>,
}

/// Parameters for `DOM.describeNode`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DescribeNodeParams {
    /// Node id to describe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    /// Backend node id to describe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
    /// Remote object to describe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

/// Result of `DOM.describeNode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeNodeResult {
    /// Node description.
    pub node: Node,
}

/// Parameters for `DOM.resolveNode`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolveNodeParams {
    /// Node id to resolve into a remote object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    /// Backend node id to resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
}

/// Result of `DOM.resolveNode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveNodeResult {
    /// Handle to the node's JS wrapper.
    pub object: super::runtime::RemoteObject,
}

/// Parameters for `DOM.requestNode`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestNodeParams {
    /// Remote object to convert into a node id.
    pub object_id: String,
}

/// Result of `DOM.requestNode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestNodeResult {
    /// Node id for the object.
    pub node_id: i64,
}

/// Parameters for `DOM.focus`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FocusParams {
    /// Node to focus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    /// Backend node to focus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
    /// Remote object to focus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

/// Parameters for `DOM.getOuterHTML`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtmlParams {
    /// Node to serialize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    /// Backend node to serialize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
}

/// Result of `DOM.getOuterHTML`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtmlResult {
    /// Serialized markup.
    pub outer_html: String,
}

/// Parameters for `DOM.setAttributeValue`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAttributeValueParams {
    /// Element to mutate.
    pub node_id: i64,
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

/// Parameters for `DOM.removeAttribute`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAttributeParams {
    /// Element to mutate.
    pub node_id: i64,
    /// Attribute to remove.
    pub name: String,
}

/// A quad: four (x, y) corner pairs in viewport coordinates.
pub type Quad = Vec<f64>;

/// Parameters for `DOM.getBoxModel`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetBoxModelParams {
    /// Node to measure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    /// Backend node to measure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
    /// Remote object to measure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

/// Box model of an element.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxModel {
    /// Content box quad.
    pub content: Quad,
    /// Padding box quad.
    pub padding: Quad,
    /// Border box quad.
    pub border: Quad,
    /// Margin box quad.
    pub margin: Quad,
    /// Content width.
    pub width: i64,
    /// Content height.
    pub height: i64,
}

/// Result of `DOM.getBoxModel`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBoxModelResult {
    /// The element's box model.
    pub model: BoxModel,
}

/// Parameters for `DOM.getContentQuads`.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetContentQuadsParams {
    /// Node to measure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    /// Backend node to measure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_node_id: Option<i64>,
    /// Remote object to measure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

/// Result of `DOM.getContentQuads`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetContentQuadsResult {
    /// One quad per border box fragment; empty when detached/invisible.
    pub quads: Vec<Quad>,
}
