//! The incremental graph engine.
//!
//! One engine backs one graph view. It owns the retained node and edge lists,
//! the component map and a single layout backend. [`GraphEngine::update`]
//! runs the whole re-seed sequence synchronously, so the next tick always
//! observes a consistent state: diff, classify reciprocal edges, recompute
//! components, re-register forces, restart.

use std::sync::Arc;

use log::{debug, info};

use super::backend::{LayoutBackend, Topology, create_backend};
use super::config::LayoutConfig;
use super::connectivity::{ComponentMap, charge_between};
use super::model::{
	EdgeShape, GraphEdge, GraphNode, Reconciled, Seeder, reconcile_edges, reconcile_nodes,
};
use super::multiplicity::classify_edges;
use super::types::{EdgeAccessors, NodeIdentity};

/// Lifecycle of an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnginePhase {
	/// No update has been applied yet.
	Initializing,
	/// Seeded at least once.
	Live,
	/// Torn down; updates and ticks are ignored.
	TornDown,
}

/// Where one node sits in a published frame.
#[derive(Debug)]
pub struct NodeFrame<N> {
	/// Node id.
	pub id: String,
	/// The caller's record.
	pub raw: Arc<N>,
	/// World x.
	pub x: f64,
	/// World y.
	pub y: f64,
	/// Whether the node is held in place.
	pub pinned: bool,
}

/// Where one edge is drawn in a published frame.
#[derive(Debug)]
pub struct EdgeFrame<R> {
	/// Edge id.
	pub id: String,
	/// Display text.
	pub text: String,
	/// The caller's record.
	pub raw: Arc<R>,
	/// Source x.
	pub x1: f64,
	/// Source y.
	pub y1: f64,
	/// Target x.
	pub x2: f64,
	/// Target y.
	pub y2: f64,
	/// How to draw the edge.
	pub shape: EdgeShape,
}

/// Snapshot of the layout handed to the view after each tick.
#[derive(Debug)]
pub struct Frame<N, R> {
	/// Nodes in retained order.
	pub nodes: Vec<NodeFrame<N>>,
	/// Edges in retained order.
	pub edges: Vec<EdgeFrame<R>>,
}

impl<N, R> Default for Frame<N, R> {
	fn default() -> Self {
		Self {
			nodes: Vec::new(),
			edges: Vec::new(),
		}
	}
}

/// Retained graph state plus the simulation that lays it out.
pub struct GraphEngine<N, R> {
	nodes: Vec<GraphNode<N>>,
	edges: Vec<GraphEdge<R>>,
	components: ComponentMap,
	accessors: EdgeAccessors<R>,
	backend: Box<dyn LayoutBackend<N>>,
	config: LayoutConfig,
	seeder: Seeder,
	phase: EnginePhase,
}

impl<N: NodeIdentity, R> GraphEngine<N, R> {
	/// An empty engine. Nothing is laid out until the first [`GraphEngine::update`].
	pub fn new(accessors: EdgeAccessors<R>, config: LayoutConfig) -> Self {
		let backend = create_backend(&config);
		info!("graph engine created with {} backend", backend.name());
		Self {
			nodes: Vec::new(),
			edges: Vec::new(),
			components: ComponentMap::default(),
			accessors,
			seeder: Seeder::new(config.initial_radius),
			backend,
			config,
			phase: EnginePhase::Initializing,
		}
	}

	/// Reconciles the retained graph with the desired sets and restarts the
	/// layout if membership changed.
	///
	/// The first update uses the initial link stiffness; later ones use the
	/// softer update stiffness so existing structure does not snap.
	pub fn update(&mut self, desired_nodes: &[Arc<N>], desired_edges: &[Arc<R>]) -> Reconciled {
		if self.phase == EnginePhase::TornDown {
			return Reconciled::default();
		}

		let nodes_changed = reconcile_nodes(&mut self.nodes, desired_nodes, &mut self.seeder);
		let edges_changed =
			reconcile_edges(&mut self.edges, desired_edges, &self.accessors, &self.nodes);
		let changes = Reconciled {
			nodes_changed,
			edges_changed,
		};

		let first = self.phase == EnginePhase::Initializing;
		if !first && !changes.any() {
			return changes;
		}

		classify_edges(&mut self.edges);
		self.components = ComponentMap::compute(&self.nodes, &self.edges);

		let link_strength = if first {
			self.config.link_strength_initial
		} else {
			self.config.link_strength_update
		};
		let topology = Topology::build(&self.nodes, &self.edges, &self.components);
		self.backend.reseed(&mut self.nodes, &topology, link_strength);
		self.backend.perturb(&self.config.perturbation());
		self.refresh_endpoints();
		self.phase = EnginePhase::Live;

		debug!(
			"re-seeded: {} nodes, {} edges, {} components (nodes changed: {}, edges changed: {})",
			self.nodes.len(),
			self.edges.len(),
			self.components.count(),
			nodes_changed,
			edges_changed
		);
		changes
	}

	/// Advances the layout one tick and refreshes edge endpoints.
	/// Returns whether the layout is still moving.
	pub fn tick(&mut self) -> bool {
		if self.phase != EnginePhase::Live {
			return false;
		}
		let active = self.backend.step(&mut self.nodes);
		self.refresh_endpoints();
		active
	}

	/// Resets the layout temperature without touching topology.
	pub fn restart(&mut self) {
		if self.phase == EnginePhase::Live {
			self.backend.perturb(&self.config.perturbation());
		}
	}

	/// Stops the backend for good. Safe to call more than once.
	pub fn teardown(&mut self) {
		if self.phase != EnginePhase::TornDown {
			self.backend.stop();
			self.phase = EnginePhase::TornDown;
			debug!("graph engine torn down");
		}
	}

	/// Whether the layout is still moving.
	pub fn is_active(&self) -> bool {
		self.phase == EnginePhase::Live && self.backend.is_active()
	}

	/// Current lifecycle phase.
	pub fn phase(&self) -> EnginePhase {
		self.phase
	}

	/// Retained nodes.
	pub fn nodes(&self) -> &[GraphNode<N>] {
		&self.nodes
	}

	/// Retained edges.
	pub fn edges(&self) -> &[GraphEdge<R>] {
		&self.edges
	}

	/// How edge records are read.
	pub fn accessors(&self) -> &EdgeAccessors<R> {
		&self.accessors
	}

	/// Physics constants in use.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Components as of the last re-seed.
	pub fn components(&self) -> &ComponentMap {
		&self.components
	}

	/// Looks a node up by id.
	pub fn node(&self, id: &str) -> Option<&GraphNode<N>> {
		self.nodes.iter().find(|n| n.id() == id)
	}

	pub(super) fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode<N>> {
		self.nodes.iter_mut().find(|n| n.id() == id)
	}

	/// Looks an edge up by id.
	pub fn edge(&self, id: &str) -> Option<&GraphEdge<R>> {
		self.edges.iter().find(|e| e.id() == id)
	}

	/// Current positions, pins and edge geometry.
	pub fn frame(&self) -> Frame<N, R> {
		Frame {
			nodes: self
				.nodes
				.iter()
				.map(|n| NodeFrame {
					id: n.id().to_string(),
					raw: Arc::clone(&n.raw),
					x: n.x,
					y: n.y,
					pinned: n.is_pinned(),
				})
				.collect(),
			edges: self
				.edges
				.iter()
				.map(|e| EdgeFrame {
					id: e.id().to_string(),
					text: e.text().to_string(),
					raw: Arc::clone(&e.raw),
					x1: e.x1,
					y1: e.y1,
					x2: e.x2,
					y2: e.y2,
					shape: e.shape(),
				})
				.collect(),
		}
	}

	/// Many-body strength the layout applies between two node ids.
	pub fn charge_between(&self, a: &str, b: &str) -> f64 {
		charge_between(
			self.components.label(a),
			self.components.label(b),
			&self.config,
		)
	}

	fn refresh_endpoints(&mut self) {
		for edge in &mut self.edges {
			edge.update_endpoints(&self.nodes);
		}
	}
}

impl<N, R> Drop for GraphEngine<N, R> {
	fn drop(&mut self) {
		self.backend.stop();
	}
}
