//! Connected components of the retained graph.
//!
//! Labels drive the adaptive many-body strength: disconnected subgraphs push
//! each other apart harder than nodes that belong together. The map is rebuilt
//! after every diff; removals can split components, so it is never patched.

use std::collections::{HashMap, VecDeque};

use super::config::LayoutConfig;
use super::model::{GraphEdge, GraphNode};

/// Component label per node id.
#[derive(Clone, Debug, Default)]
pub struct ComponentMap {
	labels: HashMap<String, usize>,
	count: usize,
}

impl ComponentMap {
	/// Partitions `nodes` into connected components, treating edges as
	/// undirected.
	///
	/// Labels start at 0 and follow discovery order: nodes are visited in
	/// input order and each unvisited one starts a breadth-first sweep.
	pub fn compute<N, R>(nodes: &[GraphNode<N>], edges: &[GraphEdge<R>]) -> Self {
		let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
		for edge in edges {
			if edge.source >= nodes.len() || edge.target >= nodes.len() {
				continue;
			}
			adjacency[edge.source].push(edge.target);
			adjacency[edge.target].push(edge.source);
		}

		let mut component: Vec<Option<usize>> = vec![None; nodes.len()];
		let mut queue = VecDeque::new();
		let mut count = 0;
		for start in 0..nodes.len() {
			if component[start].is_some() {
				continue;
			}
			component[start] = Some(count);
			queue.push_back(start);
			while let Some(current) = queue.pop_front() {
				for &next in &adjacency[current] {
					if component[next].is_none() {
						component[next] = Some(count);
						queue.push_back(next);
					}
				}
			}
			count += 1;
		}

		let labels = nodes
			.iter()
			.zip(component)
			.filter_map(|(node, label)| Some((node.id().to_string(), label?)))
			.collect();
		Self { labels, count }
	}

	/// Component of node `id`, if it was part of the last computation.
	pub fn label(&self, id: &str) -> Option<usize> {
		self.labels.get(id).copied()
	}

	/// Number of components.
	pub fn count(&self) -> usize {
		self.count
	}

	/// Labels aligned with `nodes`, `None` for ids this map has not seen.
	pub fn labels_for<N>(&self, nodes: &[GraphNode<N>]) -> Vec<Option<usize>> {
		nodes.iter().map(|n| self.label(n.id())).collect()
	}
}

/// Many-body strength between two nodes given their component labels.
///
/// An unknown label falls back to the weak default: a mis-tuned force only
/// degrades the picture.
pub fn charge_between(a: Option<usize>, b: Option<usize>, config: &LayoutConfig) -> f64 {
	match (a, b) {
		(Some(a), Some(b)) if a == b => config.charge_same_component,
		(Some(_), Some(_)) => config.charge_cross_component,
		_ => config.charge_unknown,
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use proptest::prelude::*;

	use super::super::model::tests::{accessors, arb_edges, arb_nodes, recs, rels};
	use super::super::model::{Seeder, reconcile_edges, reconcile_nodes};
	use super::*;

	fn components(
		ids: &[&'static str],
		edges: &[(&'static str, &'static str, &'static str)],
	) -> ComponentMap {
		let mut seeder = Seeder::new(10.0);
		let (mut nodes, mut retained) = (Vec::new(), Vec::new());
		reconcile_nodes(&mut nodes, &recs(ids), &mut seeder);
		reconcile_edges(&mut retained, &rels(edges), &accessors(), &nodes);
		ComponentMap::compute(&nodes, &retained)
	}

	#[test]
	fn labels_follow_discovery_order() {
		let map = components(&["A", "B", "C", "D", "E"], &[("1", "D", "B"), ("2", "E", "C")]);
		assert_eq!(map.count(), 3);
		assert_eq!(map.label("A"), Some(0));
		assert_eq!(map.label("B"), Some(1));
		assert_eq!(map.label("D"), Some(1));
		assert_eq!(map.label("C"), Some(2));
		assert_eq!(map.label("E"), Some(2));
	}

	#[test]
	fn direction_is_ignored() {
		let map = components(&["A", "B", "C"], &[("1", "A", "B"), ("2", "C", "B")]);
		assert_eq!(map.count(), 1);
		assert!(["A", "B", "C"].iter().all(|id| map.label(id) == Some(0)));
	}

	/// Undirected reachability between `ids` by brute-force transitive closure.
	fn reachability(ids: &[&str], edges: &[(&str, &str, &str)]) -> Vec<Vec<bool>> {
		let n = ids.len();
		let idx = |id: &str| ids.iter().position(|x| *x == id);
		let mut reach = vec![vec![false; n]; n];
		for (i, row) in reach.iter_mut().enumerate() {
			row[i] = true;
		}
		for &(_, s, t) in edges {
			if let (Some(s), Some(t)) = (idx(s), idx(t)) {
				reach[s][t] = true;
				reach[t][s] = true;
			}
		}
		for k in 0..n {
			for i in 0..n {
				for j in 0..n {
					if reach[i][k] && reach[k][j] {
						reach[i][j] = true;
					}
				}
			}
		}
		reach
	}

	#[test]
	fn same_label_iff_reachable() {
		let ids = ["A", "B", "C", "D", "E", "F"];
		let edges = [("1", "A", "B"), ("2", "B", "C"), ("3", "D", "E"), ("4", "F", "F")];
		let map = components(&ids, &edges);
		let reach = reachability(&ids, &edges);
		for (i, a) in ids.iter().enumerate() {
			assert!(map.label(a).is_some());
			for (j, b) in ids.iter().enumerate() {
				assert_eq!(map.label(a) == map.label(b), reach[i][j], "{a} {b}");
			}
		}
		assert_eq!(map.count(), 3);
	}

	proptest! {
		#[test]
		fn labels_partition_by_reachability(ids in arb_nodes(), edges in arb_edges()) {
			let map = components(&ids, &edges);
			let reach = reachability(&ids, &edges);
			for (i, a) in ids.iter().enumerate() {
				prop_assert!(map.label(a).is_some());
				for (j, b) in ids.iter().enumerate() {
					prop_assert_eq!(map.label(a) == map.label(b), reach[i][j], "{} {}", a, b);
				}
			}
			let distinct: HashSet<usize> = ids.iter().filter_map(|id| map.label(id)).collect();
			prop_assert_eq!(distinct.len(), map.count());
			prop_assert!(distinct.iter().all(|&label| label < map.count()));
		}
	}

	#[test]
	fn removal_splits_a_component() {
		let map = components(&["A", "C"], &[("1", "A", "B"), ("2", "B", "C")]);
		assert_ne!(map.label("A"), map.label("C"));
	}

	#[test]
	fn empty_graph_has_no_components() {
		let map = components(&[], &[]);
		assert_eq!(map.count(), 0);
		assert_eq!(map.label("A"), None);
	}

	#[test]
	fn adaptive_charge() {
		let config = LayoutConfig::default();
		assert_eq!(charge_between(Some(0), Some(0), &config), -10.0);
		assert_eq!(charge_between(Some(0), Some(1), &config), -80.0);
		assert_eq!(charge_between(None, Some(1), &config), -10.0);
		assert_eq!(charge_between(Some(2), None, &config), -10.0);
	}
}
