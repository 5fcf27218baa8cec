//! Layout backends.
//!
//! The diff and connectivity contract is shared; what moves the nodes is
//! swappable. [`ForceSimulation`] is the default. [`SpringLayout`] drives the
//! same retained nodes with the `force_graph` crate's spring model.

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use super::config::{BackendKind, LayoutConfig, Perturbation};
use super::connectivity::ComponentMap;
use super::model::{GraphEdge, GraphNode};
use super::simulation::ForceSimulation;

/// What a backend needs to know about the current graph, by node index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Topology {
	/// `(source, target)` index pairs, one per retained edge.
	pub links: Vec<(usize, usize)>,
	/// Component label per node.
	pub components: Vec<Option<usize>>,
}

impl Topology {
	/// Flattens the retained graph into index pairs and aligned labels.
	pub fn build<N, R>(
		nodes: &[GraphNode<N>],
		edges: &[GraphEdge<R>],
		components: &ComponentMap,
	) -> Self {
		Self {
			links: edges.iter().map(|e| (e.source, e.target)).collect(),
			components: components.labels_for(nodes),
		}
	}
}

/// A physics engine that owns velocity integration for the retained nodes.
///
/// The engine owns the node list and lends it on every call; a backend only
/// keeps what it derives from it.
pub trait LayoutBackend<N> {
	/// Short name for logging.
	fn name(&self) -> &'static str;

	/// Re-registers forces for a new node/edge set.
	fn reseed(&mut self, nodes: &mut [GraphNode<N>], topology: &Topology, link_strength: f64);

	/// Resets the temperature so the layout re-settles.
	fn perturb(&mut self, perturbation: &Perturbation);

	/// Advances one tick. Returns whether the layout is still moving.
	fn step(&mut self, nodes: &mut [GraphNode<N>]) -> bool;

	/// Whether the last step left the layout moving.
	fn is_active(&self) -> bool;

	/// Permanently stops ticking.
	fn stop(&mut self);
}

/// Creates the backend selected by `config`.
pub fn create_backend<N>(config: &LayoutConfig) -> Box<dyn LayoutBackend<N>> {
	match config.backend {
		BackendKind::Force => Box::new(ForceSimulation::new(config)),
		BackendKind::Spring => Box::new(SpringLayout::new(config)),
	}
}

/// Spring layout built on `force_graph`.
///
/// The crate has no notion of temperature, so the time step is scaled by a
/// decaying energy instead. The graph is rebuilt from the retained positions
/// on every reseed. `force_graph` keeps node velocity private, so this backend
/// carries positions and pins across updates but not `vx`/`vy`: every reseed
/// starts its nodes at rest. Per-pair charges are not supported and the
/// component labels are ignored.
pub struct SpringLayout {
	graph: Option<ForceGraph<usize, ()>>,
	energy: f64,
	energy_min: f64,
	decay: f64,
	dt: f32,
	running: bool,
	stopped: bool,
}

impl SpringLayout {
	/// A stopped layout; nothing moves until the first reseed and perturbation.
	pub fn new(config: &LayoutConfig) -> Self {
		Self {
			graph: None,
			energy: 0.0,
			energy_min: config.alpha_min,
			decay: config.alpha_decay,
			dt: 0.016,
			running: false,
			stopped: false,
		}
	}

	fn parameters(link_strength: f64) -> SimulationParameters {
		SimulationParameters {
			force_charge: 150.0,
			force_spring: link_strength as f32,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

impl<N> LayoutBackend<N> for SpringLayout {
	fn name(&self) -> &'static str {
		"spring"
	}

	fn reseed(&mut self, nodes: &mut [GraphNode<N>], topology: &Topology, link_strength: f64) {
		let mut graph = ForceGraph::new(Self::parameters(link_strength));
		let indices: Vec<_> = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				graph.add_node(NodeData {
					x: node.x as f32,
					y: node.y as f32,
					mass: 10.0,
					is_anchor: node.is_pinned(),
					user_data: i,
				})
			})
			.collect();
		for &(s, t) in &topology.links {
			if s == t {
				continue;
			}
			if let (Some(&src), Some(&tgt)) = (indices.get(s), indices.get(t)) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
		}
		debug!(
			"spring layout rebuilt: {} nodes, {} links",
			indices.len(),
			topology.links.len()
		);
		self.graph = Some(graph);
	}

	fn perturb(&mut self, perturbation: &Perturbation) {
		if self.stopped {
			return;
		}
		self.energy = perturbation.alpha;
		self.decay = perturbation.alpha_decay;
		self.running = true;
	}

	fn step(&mut self, nodes: &mut [GraphNode<N>]) -> bool {
		if !self.running {
			return false;
		}
		let Some(graph) = self.graph.as_mut() else {
			return false;
		};

		graph.visit_nodes_mut(|node| {
			let Some(n) = nodes.get(node.data.user_data) else {
				return;
			};
			match (n.fx, n.fy) {
				(Some(fx), Some(fy)) => {
					node.data.x = fx as f32;
					node.data.y = fy as f32;
					node.data.is_anchor = true;
				}
				_ => node.data.is_anchor = false,
			}
		});

		graph.update(self.dt * self.energy as f32);

		graph.visit_nodes(|node| {
			if let Some(n) = nodes.get_mut(node.data.user_data) {
				let (x, y) = (node.x() as f64, node.y() as f64);
				(n.vx, n.vy) = (x - n.x, y - n.y);
				(n.x, n.y) = (x, y);
			}
		});

		self.energy *= 1.0 - self.decay;
		if self.energy < self.energy_min {
			self.running = false;
		}
		self.running
	}

	fn is_active(&self) -> bool {
		self.running
	}

	fn stop(&mut self) {
		self.running = false;
		self.stopped = true;
	}
}
