//! Reciprocal edge detection.

use std::collections::HashSet;

use super::model::{EdgeVariant, GraphEdge};

/// Marks every edge whose reverse is also present as [`EdgeVariant::Repeated`]
/// and every other edge as [`EdgeVariant::Single`].
///
/// Runs from scratch, so an edge whose partner went away falls back to
/// `Single`. Self-loops are their own reverse and stay `Single`.
pub fn classify_edges<R>(edges: &mut [GraphEdge<R>]) {
	let directed: HashSet<(usize, usize)> = edges
		.iter()
		.filter(|e| !e.is_self_loop())
		.map(|e| (e.source, e.target))
		.collect();

	for edge in edges.iter_mut() {
		edge.variant = if !edge.is_self_loop() && directed.contains(&(edge.target, edge.source)) {
			EdgeVariant::Repeated
		} else {
			EdgeVariant::Single
		};
	}
}
