//! Knowledge-graph records and the shown-set state behind the demo app.
//!
//! The page embeds the whole graph as JSON. [`Explorer`] decides which part
//! of it is visible: the roots at first, growing by one hop around every
//! clicked node.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::components::force_graph::{
	EdgeAccessors, LayoutConfig, NodeIdentity, Presentation, name_to_color,
};

/// A node of the knowledge graph.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KgNode {
	/// Numeric node id.
	pub id: u64,
	/// Kind, e.g. `JavaClass`.
	pub label: String,
	/// Free-form properties; see [`node_text`].
	#[serde(default)]
	pub properties: HashMap<String, Value>,
}

impl NodeIdentity for KgNode {
	fn node_id(&self) -> String {
		self.id.to_string()
	}
}

/// A directed relation between two nodes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KgRelation {
	/// Relation id.
	pub id: String,
	/// Source node id.
	pub source: u64,
	/// Target node id.
	pub target: u64,
	/// Relation types, e.g. `calls`.
	#[serde(default)]
	pub types: Vec<String>,
}

/// Payload embedded in `<script id="graph-data">`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphPayload {
	/// Every node of the graph.
	#[serde(default)]
	pub nodes: Vec<KgNode>,
	/// Every relation of the graph.
	#[serde(default)]
	pub relations: Vec<KgRelation>,
	/// Layout constants for the canvas.
	#[serde(default)]
	pub layout: LayoutConfig,
	/// Nodes shown initially. Empty shows everything.
	#[serde(default)]
	pub roots: Vec<u64>,
}

/// Property keys tried for a node's display text, highest priority first.
const TEXT_KEYS: [&str; 4] = ["name", "title", "_title", "_names"];

/// Longest display text kept as is, in characters.
const TEXT_MAX: usize = 10;
/// Characters kept when the text is cut.
const TEXT_CUT: usize = 8;

fn property_text(value: &Value) -> Option<String> {
	let text = match value {
		Value::String(s) => s.clone(),
		Value::Number(n) => n.to_string(),
		Value::Array(items) => items
			.iter()
			.map(|v| match v {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			})
			.collect::<Vec<_>>()
			.join(","),
		_ => return None,
	};
	(!text.is_empty()).then_some(text)
}

/// Replaces every `<...>` tag with a space. An unclosed `<` is kept.
fn strip_tags(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	let mut rest = s;
	while let Some(start) = rest.find('<') {
		let Some(len) = rest[start..].find('>') else {
			break;
		};
		out.push_str(&rest[..start]);
		out.push(' ');
		rest = &rest[start + len + 1..];
	}
	out.push_str(rest);
	out
}

/// Short text drawn inside a node.
pub fn node_text(node: &KgNode) -> String {
	let raw = TEXT_KEYS
		.iter()
		.find_map(|key| node.properties.get(*key).and_then(property_text))
		.unwrap_or_default();
	let text = strip_tags(&raw);
	let text = text.trim();
	if text.chars().count() > TEXT_MAX {
		let mut cut: String = text.chars().take(TEXT_CUT).collect();
		cut.push_str("...");
		cut
	} else {
		text.to_string()
	}
}

/// Text drawn on a relation: its types, comma separated.
pub fn relation_text(relation: &KgRelation) -> String {
	relation.types.join(",")
}

/// How the canvas reads relation records.
pub fn relation_accessors() -> EdgeAccessors<KgRelation> {
	EdgeAccessors::new(
		|r: &KgRelation| r.id.clone(),
		relation_text,
		|r: &KgRelation| r.source.to_string(),
		|r: &KgRelation| r.target.to_string(),
	)
}

/// How the canvas draws node records.
pub fn node_presentation() -> Presentation<KgNode> {
	Presentation::new(
		|n: &KgNode| name_to_color(&n.label).to_css(),
		|n: &KgNode| n.label.clone(),
		node_text,
	)
}

/// Loaded graph plus which part of it is on screen.
#[derive(Clone, Debug, Default)]
pub struct Explorer {
	nodes: Vec<Arc<KgNode>>,
	relations: Vec<Arc<KgRelation>>,
	shown: HashSet<u64>,
	selected: Option<u64>,
}

impl Explorer {
	/// Loads `payload`, showing its roots.
	pub fn new(payload: GraphPayload) -> Self {
		let known: HashSet<u64> = payload.nodes.iter().map(|n| n.id).collect();
		let shown = if payload.roots.is_empty() {
			known
		} else {
			payload
				.roots
				.iter()
				.copied()
				.filter(|id| known.contains(id))
				.collect()
		};
		Self {
			nodes: payload.nodes.into_iter().map(Arc::new).collect(),
			relations: payload.relations.into_iter().map(Arc::new).collect(),
			shown,
			selected: None,
		}
	}

	/// Shown nodes, in load order.
	pub fn shown_nodes(&self) -> Vec<Arc<KgNode>> {
		self.nodes
			.iter()
			.filter(|n| self.shown.contains(&n.id))
			.cloned()
			.collect()
	}

	/// Relations whose endpoints are both shown.
	pub fn shown_relations(&self) -> Vec<Arc<KgRelation>> {
		self.relations
			.iter()
			.filter(|r| self.shown.contains(&r.source) && self.shown.contains(&r.target))
			.cloned()
			.collect()
	}

	/// Whether node `id` is on screen.
	pub fn is_shown(&self, id: u64) -> bool {
		self.shown.contains(&id)
	}

	/// Shows every direct neighbour of `id`. Returns how many became visible.
	pub fn expand(&mut self, id: u64) -> usize {
		let neighbours: Vec<u64> = self
			.relations
			.iter()
			.filter_map(|r| {
				if r.source == id {
					Some(r.target)
				} else if r.target == id {
					Some(r.source)
				} else {
					None
				}
			})
			.collect();
		let known: HashSet<u64> = self.nodes.iter().map(|n| n.id).collect();
		let before = self.shown.len();
		self.shown
			.extend(neighbours.into_iter().filter(|n| known.contains(n)));
		let added = self.shown.len() - before;
		debug!("expanded node {id}: {added} new neighbours");
		added
	}

	/// Marks `id` as the selected node and expands around it.
	pub fn select(&mut self, id: u64) {
		self.selected = Some(id);
		self.expand(id);
	}

	/// The most recently selected node.
	pub fn selected(&self) -> Option<u64> {
		self.selected
	}
}
