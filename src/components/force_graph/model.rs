//! Retained graph model and the diff engine that reconciles it.
//!
//! The engine keeps its own node and edge lists between updates. Each update
//! supplies a *desired* set; [`reconcile_nodes`] and [`reconcile_edges`] bring
//! the retained lists in line with it while carrying forward the physics
//! state of every element that survives.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::Arc;

use log::trace;

use super::types::{EdgeAccessors, NodeIdentity};

/// A node as retained by the engine.
#[derive(Debug)]
pub struct GraphNode<N> {
	/// The caller's record. Refreshed on every update that still contains it.
	pub raw: Arc<N>,
	id: String,
	serial: u64,
	/// World x.
	pub x: f64,
	/// World y.
	pub y: f64,
	/// Velocity along x.
	pub vx: f64,
	/// Velocity along y.
	pub vy: f64,
	/// Pinned x. While set, the integrator holds the node at this position.
	pub fx: Option<f64>,
	/// Pinned y.
	pub fy: Option<f64>,
}

impl<N> GraphNode<N> {
	/// Stable identity string.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Creation number of this retained object. Unchanged for as long as the
	/// node survives successive diffs.
	pub fn serial(&self) -> u64 {
		self.serial
	}

	/// Whether either coordinate is pinned.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}

	/// Forces the node to `(x, y)` until [`GraphNode::unpin`] is called.
	pub fn pin(&mut self, x: f64, y: f64) {
		self.fx = Some(x);
		self.fy = Some(y);
	}

	/// Returns the node to free simulation.
	pub fn unpin(&mut self) {
		self.fx = None;
		self.fy = None;
	}
}

/// Rendering variant of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeVariant {
	/// No reverse edge is present.
	Single,
	/// A reverse edge is present; drawn as an offset curve.
	Repeated,
}

/// Geometry the renderer should use for an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeShape {
	/// Line between the endpoints.
	Straight,
	/// Quadratic curve bent to one side.
	Curved,
	/// Loop drawn beside the node.
	SelfLoop,
}

/// An edge as retained by the engine.
///
/// `source` and `target` index into the engine's current node list. They are
/// re-resolved on every diff and never own the nodes.
#[derive(Debug)]
pub struct GraphEdge<R> {
	/// The caller's record.
	pub raw: Arc<R>,
	id: String,
	text: String,
	source_id: String,
	target_id: String,
	/// Index of the source node.
	pub source: usize,
	/// Index of the target node.
	pub target: usize,
	/// Single or reciprocal.
	pub variant: EdgeVariant,
	/// Source x as of the last tick.
	pub x1: f64,
	/// Source y as of the last tick.
	pub y1: f64,
	/// Target x as of the last tick.
	pub x2: f64,
	/// Target y as of the last tick.
	pub y2: f64,
}

impl<R> GraphEdge<R> {
	/// Stable identity string.
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Display text, refreshed with the record.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Id of the source node.
	pub fn source_id(&self) -> &str {
		&self.source_id
	}

	/// Id of the target node.
	pub fn target_id(&self) -> &str {
		&self.target_id
	}

	/// Whether both ends are the same node.
	pub fn is_self_loop(&self) -> bool {
		self.source_id == self.target_id
	}

	/// Drawing geometry derived from the endpoints and variant.
	pub fn shape(&self) -> EdgeShape {
		if self.is_self_loop() {
			EdgeShape::SelfLoop
		} else if self.variant == EdgeVariant::Repeated {
			EdgeShape::Curved
		} else {
			EdgeShape::Straight
		}
	}

	/// Copies the current positions of the resolved endpoints.
	pub fn update_endpoints<N>(&mut self, nodes: &[GraphNode<N>]) {
		if let (Some(s), Some(t)) = (nodes.get(self.source), nodes.get(self.target)) {
			(self.x1, self.y1, self.x2, self.y2) = (s.x, s.y, t.x, t.y);
		}
	}
}

/// Which memberships an update changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
	/// Nodes were added or removed.
	pub nodes_changed: bool,
	/// Edges were added, removed or rewired.
	pub edges_changed: bool,
}

impl Reconciled {
	/// Whether anything changed.
	pub fn any(self) -> bool {
		self.nodes_changed || self.edges_changed
	}
}

/// Golden angle used to lay fresh nodes out on a spiral.
const INITIAL_ANGLE: f64 = PI * (3.0 - 2.236_067_977_499_79);

/// Hands out serials and initial positions for freshly created nodes.
#[derive(Clone, Debug)]
pub struct Seeder {
	next_serial: u64,
	initial_radius: f64,
}

impl Seeder {
	/// Seeder whose first node sits `initial_radius` from the origin.
	pub fn new(initial_radius: f64) -> Self {
		Self {
			next_serial: 0,
			initial_radius,
		}
	}

	/// Creates a free node at the next point of the placement spiral.
	pub fn spawn<N>(&mut self, id: String, raw: Arc<N>) -> GraphNode<N> {
		let serial = self.next_serial;
		self.next_serial += 1;
		let radius = self.initial_radius * (0.5 + serial as f64).sqrt();
		let angle = serial as f64 * INITIAL_ANGLE;
		GraphNode {
			raw,
			id,
			serial,
			x: radius * angle.cos(),
			y: radius * angle.sin(),
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
		}
	}
}

/// Reconciles the retained node list against the desired records.
///
/// Survivors keep their object and physics state; their `raw` is refreshed.
/// New ids are appended in desired order. The first of several records with
/// the same id wins. Returns whether membership changed.
pub fn reconcile_nodes<N: NodeIdentity>(
	retained: &mut Vec<GraphNode<N>>,
	desired: &[Arc<N>],
	seeder: &mut Seeder,
) -> bool {
	let mut wanted: HashMap<String, &Arc<N>> = HashMap::with_capacity(desired.len());
	let mut order = Vec::with_capacity(desired.len());
	for raw in desired {
		let id = raw.node_id();
		if !wanted.contains_key(&id) {
			order.push(id.clone());
			wanted.insert(id, raw);
		}
	}

	let before = retained.len();
	retained.retain_mut(|node| match wanted.get(node.id()) {
		Some(&raw) => {
			node.raw = Arc::clone(raw);
			true
		}
		None => false,
	});
	let mut changed = retained.len() != before;

	let kept: HashSet<String> = retained.iter().map(|n| n.id.clone()).collect();
	for id in order {
		if kept.contains(&id) {
			continue;
		}
		if let Some(&raw) = wanted.get(&id) {
			let raw = Arc::clone(raw);
			retained.push(seeder.spawn(id, raw));
			changed = true;
		}
	}
	changed
}

/// Reconciles the retained edge list against the desired records.
///
/// Endpoints are looked up in `nodes`, which must already be reconciled.
/// Edges with a missing endpoint are dropped without error; they come back
/// once a later update supplies both the edge and the endpoint. Surviving
/// edges re-resolve their endpoint indices. Returns whether membership
/// changed or a surviving edge now connects a different pair of ids.
pub fn reconcile_edges<N, R>(
	retained: &mut Vec<GraphEdge<R>>,
	desired: &[Arc<R>],
	accessors: &EdgeAccessors<R>,
	nodes: &[GraphNode<N>],
) -> bool {
	let index: HashMap<&str, usize> = nodes
		.iter()
		.enumerate()
		.map(|(i, n)| (n.id(), i))
		.collect();

	let mut wanted: HashMap<String, &Arc<R>> = HashMap::with_capacity(desired.len());
	let mut order = Vec::with_capacity(desired.len());
	for raw in desired {
		let id = (accessors.id)(raw);
		if !wanted.contains_key(&id) {
			order.push(id.clone());
			wanted.insert(id, raw);
		}
	}

	let before: HashSet<String> = retained.iter().map(|e| e.id.clone()).collect();

	let mut rewired = false;
	retained.retain_mut(|edge| {
		let Some(&raw) = wanted.get(edge.id()) else {
			return false;
		};
		let (source_id, target_id) = ((accessors.source_id)(raw), (accessors.target_id)(raw));
		match (index.get(source_id.as_str()), index.get(target_id.as_str())) {
			(Some(&source), Some(&target)) => {
				if edge.source_id != source_id || edge.target_id != target_id {
					trace!("edge {} rewired to {source_id} -> {target_id}", edge.id);
					rewired = true;
				}
				edge.raw = Arc::clone(raw);
				edge.text = (accessors.text)(raw);
				edge.source_id = source_id;
				edge.target_id = target_id;
				edge.source = source;
				edge.target = target;
				true
			}
			_ => {
				trace!("dropping edge {}: endpoint no longer shown", edge.id);
				false
			}
		}
	});

	let kept: HashSet<String> = retained.iter().map(|e| e.id.clone()).collect();
	for id in order {
		if kept.contains(&id) {
			continue;
		}
		let Some(&raw) = wanted.get(&id) else {
			continue;
		};
		let (source_id, target_id) = ((accessors.source_id)(raw), (accessors.target_id)(raw));
		let (Some(&source), Some(&target)) =
			(index.get(source_id.as_str()), index.get(target_id.as_str()))
		else {
			trace!("deferring edge {id}: {source_id} -> {target_id} not resolvable");
			continue;
		};
		retained.push(GraphEdge {
			raw: Arc::clone(raw),
			id,
			text: (accessors.text)(raw),
			source_id,
			target_id,
			source,
			target,
			variant: EdgeVariant::Single,
			x1: 0.0,
			y1: 0.0,
			x2: 0.0,
			y2: 0.0,
		});
	}

	let after: HashSet<&str> = retained.iter().map(|e| e.id()).collect();
	rewired || before.len() != after.len() || before.iter().any(|id| !after.contains(id.as_str()))
}

#[cfg(test)]
pub(crate) mod tests {
	use proptest::prelude::*;

	use super::*;

	#[derive(Debug)]
	pub(crate) struct Rec(pub &'static str);

	impl NodeIdentity for Rec {
		fn node_id(&self) -> String {
			self.0.to_string()
		}
	}

	/// Edge record: (id, source, target).
	#[derive(Debug)]
	pub(crate) struct Rel(pub &'static str, pub &'static str, pub &'static str);

	pub(crate) fn accessors() -> EdgeAccessors<Rel> {
		EdgeAccessors::new(
			|r: &Rel| r.0.to_string(),
			|r: &Rel| format!("{}->{}", r.1, r.2),
			|r: &Rel| r.1.to_string(),
			|r: &Rel| r.2.to_string(),
		)
	}

	pub(crate) fn recs(ids: &[&'static str]) -> Vec<Arc<Rec>> {
		ids.iter().map(|id| Arc::new(Rec(id))).collect()
	}

	pub(crate) fn rels(edges: &[(&'static str, &'static str, &'static str)]) -> Vec<Arc<Rel>> {
		edges.iter().map(|&(i, s, t)| Arc::new(Rel(i, s, t))).collect()
	}

	/// Node ids the generated graphs draw from.
	pub(crate) const NODE_POOL: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];
	const EDGE_POOL: [&str; 12] = [
		"e0", "e1", "e2", "e3", "e4", "e5", "e6", "e7", "e8", "e9", "e10", "e11",
	];

	/// Any subset of the node pool, in pool order.
	pub(crate) fn arb_nodes() -> impl Strategy<Value = Vec<&'static str>> {
		proptest::collection::vec(any::<bool>(), NODE_POOL.len()).prop_map(|keep| {
			NODE_POOL
				.iter()
				.zip(keep)
				.filter_map(|(id, keep)| keep.then_some(*id))
				.collect()
		})
	}

	/// Edges `e0, e1, ...` between any pool ids, self-loops and reverse pairs
	/// included. Two draws reuse the same edge ids, so a later draw rewires
	/// the edges of an earlier one.
	pub(crate) fn arb_edges()
	-> impl Strategy<Value = Vec<(&'static str, &'static str, &'static str)>> {
		let ends = 0..NODE_POOL.len();
		proptest::collection::vec((ends.clone(), ends), 0..=EDGE_POOL.len()).prop_map(|pairs| {
			pairs
				.into_iter()
				.enumerate()
				.map(|(i, (s, t))| (EDGE_POOL[i], NODE_POOL[s], NODE_POOL[t]))
				.collect()
		})
	}

	fn wiring<R>(edges: &[GraphEdge<R>]) -> HashSet<(String, String, String)> {
		edges
			.iter()
			.map(|e| {
				(
					e.id().to_string(),
					e.source_id().to_string(),
					e.target_id().to_string(),
				)
			})
			.collect()
	}

	fn ids<N>(nodes: &[GraphNode<N>]) -> Vec<&str> {
		nodes.iter().map(|n| n.id()).collect()
	}

	#[test]
	fn survivors_keep_object_and_physics_state() {
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		assert!(reconcile_nodes(&mut nodes, &recs(&["A", "B"]), &mut seeder));

		let b = &mut nodes[1];
		b.x = 12.5;
		b.y = -3.25;
		b.vx = 0.125;
		b.vy = -7.0;
		b.pin(1.0, 2.0);
		let b_serial = b.serial();

		assert!(reconcile_nodes(&mut nodes, &recs(&["B", "C"]), &mut seeder));
		assert_eq!(ids(&nodes), ["B", "C"]);

		let b = &nodes[0];
		assert_eq!(b.serial(), b_serial);
		assert_eq!(b.x.to_bits(), 12.5_f64.to_bits());
		assert_eq!(b.y.to_bits(), (-3.25_f64).to_bits());
		assert_eq!((b.vx, b.vy), (0.125, -7.0));
		assert_eq!((b.fx, b.fy), (Some(1.0), Some(2.0)));

		let c = &nodes[1];
		assert_ne!(c.serial(), b_serial);
		assert!(!c.is_pinned());
		assert_eq!((c.vx, c.vy), (0.0, 0.0));
	}

	#[test]
	fn unchanged_desired_set_reports_no_change() {
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		reconcile_nodes(&mut nodes, &recs(&["A", "B"]), &mut seeder);
		assert!(!reconcile_nodes(&mut nodes, &recs(&["B", "A"]), &mut seeder));
		assert_eq!(ids(&nodes), ["A", "B"]);
	}

	#[test]
	fn duplicate_desired_ids_collapse_to_one_node() {
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		reconcile_nodes(&mut nodes, &recs(&["A", "A", "B"]), &mut seeder);
		assert_eq!(ids(&nodes), ["A", "B"]);
	}

	#[test]
	fn fresh_nodes_do_not_coincide() {
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		reconcile_nodes(&mut nodes, &recs(&["A", "B", "C"]), &mut seeder);
		for (i, a) in nodes.iter().enumerate() {
			for b in &nodes[i + 1..] {
				assert!((a.x - b.x).hypot(a.y - b.y) > 1.0);
			}
		}
	}

	#[test]
	fn edge_with_missing_endpoint_waits_for_it() {
		let acc = accessors();
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		let mut edges = Vec::new();
		let desired_edges = rels(&[("e1", "A", "B"), ("e2", "B", "C")]);

		reconcile_nodes(&mut nodes, &recs(&["A", "B"]), &mut seeder);
		reconcile_edges(&mut edges, &desired_edges, &acc, &nodes);
		assert_eq!(edges.len(), 1);
		assert_eq!(edges[0].id(), "e1");

		reconcile_nodes(&mut nodes, &recs(&["A", "B", "C"]), &mut seeder);
		assert!(reconcile_edges(&mut edges, &desired_edges, &acc, &nodes));
		let present: Vec<&str> = edges.iter().map(|e| e.id()).collect();
		assert_eq!(present, ["e1", "e2"]);
		assert_eq!(edges[1].target, 2);
	}

	#[test]
	fn removing_an_endpoint_drops_its_edges_and_reindexes_the_rest() {
		let acc = accessors();
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		let mut edges = Vec::new();
		let desired_edges = rels(&[("e1", "A", "B"), ("e2", "B", "C")]);

		reconcile_nodes(&mut nodes, &recs(&["A", "B", "C"]), &mut seeder);
		reconcile_edges(&mut edges, &desired_edges, &acc, &nodes);
		assert_eq!(edges.len(), 2);

		reconcile_nodes(&mut nodes, &recs(&["B", "C"]), &mut seeder);
		assert!(reconcile_edges(&mut edges, &desired_edges, &acc, &nodes));
		assert_eq!(edges.len(), 1);
		let e2 = &edges[0];
		assert_eq!(e2.id(), "e2");
		assert_eq!((e2.source, e2.target), (0, 1));
		assert_eq!(nodes[e2.source].id(), "B");
	}

	#[test]
	fn endpoints_follow_node_positions() {
		let acc = accessors();
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		let mut edges = Vec::new();
		reconcile_nodes(&mut nodes, &recs(&["A", "B"]), &mut seeder);
		reconcile_edges(&mut edges, &rels(&[("e", "A", "B")]), &acc, &nodes);
		nodes[0].x = 1.0;
		nodes[0].y = 2.0;
		nodes[1].x = 3.0;
		nodes[1].y = 4.0;
		edges[0].update_endpoints(&nodes);
		let e = &edges[0];
		assert_eq!((e.x1, e.y1, e.x2, e.y2), (1.0, 2.0, 3.0, 4.0));
	}

	#[test]
	fn pin_unpin_pin_is_idempotent() {
		let mut seeder = Seeder::new(10.0);
		let mut node = seeder.spawn("A".into(), Arc::new(Rec("A")));
		node.pin(4.0, 5.0);
		let first = (node.fx, node.fy);
		node.unpin();
		assert!(!node.is_pinned());
		node.pin(4.0, 5.0);
		assert_eq!((node.fx, node.fy), first);
	}

	#[test]
	fn rewired_edge_counts_as_a_change() {
		let acc = accessors();
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		let mut edges = Vec::new();
		reconcile_nodes(&mut nodes, &recs(&["A", "B", "C"]), &mut seeder);
		reconcile_edges(&mut edges, &rels(&[("e", "C", "A")]), &acc, &nodes);
		assert!(!reconcile_edges(&mut edges, &rels(&[("e", "C", "A")]), &acc, &nodes));
		assert!(reconcile_edges(&mut edges, &rels(&[("e", "B", "A")]), &acc, &nodes));
		assert_eq!((edges[0].source_id(), edges[0].source), ("B", 1));
	}

	proptest! {
		#[test]
		fn survivors_keep_identity_across_any_diff(first in arb_nodes(), second in arb_nodes()) {
			let mut seeder = Seeder::new(10.0);
			let mut nodes = Vec::new();
			reconcile_nodes(&mut nodes, &recs(&first), &mut seeder);
			for (i, node) in nodes.iter_mut().enumerate() {
				node.x = i as f64 * 3.5;
				node.vy = -(i as f64);
				if i % 2 == 0 {
					node.pin(i as f64, 1.0);
				}
			}
			let before: HashMap<String, (u64, u64, u64, Option<f64>)> = nodes
				.iter()
				.map(|n| (n.id().to_string(), (n.serial(), n.x.to_bits(), n.vy.to_bits(), n.fx)))
				.collect();

			reconcile_nodes(&mut nodes, &recs(&second), &mut seeder);

			let present: HashSet<&str> = ids(&nodes).into_iter().collect();
			let wanted: HashSet<&str> = second.iter().copied().collect();
			prop_assert_eq!(present, wanted);
			for node in &nodes {
				match before.get(node.id()) {
					Some(&(serial, x, vy, fx)) => {
						prop_assert_eq!(node.serial(), serial);
						prop_assert_eq!(node.x.to_bits(), x);
						prop_assert_eq!(node.vy.to_bits(), vy);
						prop_assert_eq!(node.fx, fx);
					}
					None => {
						prop_assert!(before.values().all(|&(serial, ..)| serial != node.serial()));
						prop_assert!(!node.is_pinned());
					}
				}
			}
		}

		#[test]
		fn edges_track_the_resolvable_desired_set(
			nodes_a in arb_nodes(),
			edges_a in arb_edges(),
			nodes_b in arb_nodes(),
			edges_b in arb_edges(),
		) {
			let acc = accessors();
			let mut seeder = Seeder::new(10.0);
			let (mut nodes, mut edges) = (Vec::new(), Vec::new());
			reconcile_nodes(&mut nodes, &recs(&nodes_a), &mut seeder);
			reconcile_edges(&mut edges, &rels(&edges_a), &acc, &nodes);
			let before = wiring(&edges);

			reconcile_nodes(&mut nodes, &recs(&nodes_b), &mut seeder);
			let changed = reconcile_edges(&mut edges, &rels(&edges_b), &acc, &nodes);

			let expected: HashSet<(String, String, String)> = edges_b
				.iter()
				.filter(|(_, s, t)| nodes_b.contains(s) && nodes_b.contains(t))
				.map(|&(id, s, t)| (id.to_string(), s.to_string(), t.to_string()))
				.collect();
			let after = wiring(&edges);
			prop_assert_eq!(changed, after != before);
			prop_assert_eq!(after, expected);
			for edge in &edges {
				prop_assert_eq!(nodes[edge.source].id(), edge.source_id());
				prop_assert_eq!(nodes[edge.target].id(), edge.target_id());
			}
		}
	}

	#[test]
	fn self_loop_shape() {
		let acc = accessors();
		let mut seeder = Seeder::new(10.0);
		let mut nodes = Vec::new();
		let mut edges = Vec::new();
		reconcile_nodes(&mut nodes, &recs(&["A"]), &mut seeder);
		reconcile_edges(&mut edges, &rels(&[("loop", "A", "A")]), &acc, &nodes);
		assert!(edges[0].is_self_loop());
		assert_eq!(edges[0].shape(), EdgeShape::SelfLoop);
	}
}
