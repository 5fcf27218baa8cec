//! Alpha-cooled force simulation.
//!
//! Semi-implicit Euler integration with a temperature (`alpha`) that decays
//! every tick; forces are scaled by it so the layout settles and then stops.
//! Forces run in registration order: collide, center, charge, link. Pinned
//! nodes are held in place by the integrator, never by a force.

use log::debug;

use super::backend::{LayoutBackend, Topology};
use super::config::{LayoutConfig, Perturbation};
use super::model::GraphNode;

/// Lifecycle of the simulation clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationPhase {
	/// Created, not yet seeded.
	Initializing,
	/// Ticking.
	Running,
	/// Cooled below `alpha_min`; ticks are no-ops until the next perturbation.
	Cooled,
	/// Torn down; never ticks again.
	Stopped,
}

/// Linear congruential generator used to separate coincident particles.
#[derive(Clone, Debug)]
struct Lcg(u32);

impl Lcg {
	fn next_f64(&mut self) -> f64 {
		self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
		self.0 as f64 / 4_294_967_296.0
	}

	/// A tiny non-zero offset.
	fn jiggle(&mut self) -> f64 {
		let offset = (self.next_f64() - 0.5) * 1e-6;
		if offset == 0.0 { 1e-7 } else { offset }
	}
}

/// Keeps nodes at least `2 * radius` apart.
#[derive(Clone, Debug)]
struct Collide {
	radius: f64,
	iterations: usize,
	strength: f64,
}

impl Collide {
	fn apply<N>(&self, nodes: &mut [GraphNode<N>], random: &mut Lcg) {
		let r = self.radius * 2.0;
		let r2 = r * r;
		for _ in 0..self.iterations {
			for i in 0..nodes.len() {
				let (xi, yi) = (nodes[i].x + nodes[i].vx, nodes[i].y + nodes[i].vy);
				for j in (i + 1)..nodes.len() {
					let mut x = xi - (nodes[j].x + nodes[j].vx);
					let mut y = yi - (nodes[j].y + nodes[j].vy);
					let mut l = x * x + y * y;
					if l >= r2 {
						continue;
					}
					if x == 0.0 {
						x = random.jiggle();
						l += x * x;
					}
					if y == 0.0 {
						y = random.jiggle();
						l += y * y;
					}
					let l = l.sqrt();
					let push = (r - l) / l * self.strength;
					// Equal radii: the push is split evenly.
					let (px, py) = (x * push * 0.5, y * push * 0.5);
					nodes[i].vx += px;
					nodes[i].vy += py;
					nodes[j].vx -= px;
					nodes[j].vy -= py;
				}
			}
		}
	}
}

/// Translates all nodes so their centroid sits on a fixed point.
#[derive(Clone, Debug)]
struct Center {
	x: f64,
	y: f64,
	strength: f64,
}

impl Center {
	fn apply<N>(&self, nodes: &mut [GraphNode<N>]) {
		if nodes.is_empty() {
			return;
		}
		let n = nodes.len() as f64;
		let (sx, sy) = nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
		let (dx, dy) = (
			(sx / n - self.x) * self.strength,
			(sy / n - self.y) * self.strength,
		);
		for node in nodes {
			node.x -= dx;
			node.y -= dy;
		}
	}
}

/// Pairwise inverse-square repulsion with per-pair strength.
#[derive(Clone, Debug, Default)]
struct ManyBody {
	/// Component label per node, aligned with the node list.
	components: Vec<Option<usize>>,
	same: f64,
	cross: f64,
	unknown: f64,
}

const DISTANCE_MIN2: f64 = 1.0;

impl ManyBody {
	fn strength(&self, i: usize, j: usize) -> f64 {
		let label = |k: usize| self.components.get(k).copied().flatten();
		match (label(i), label(j)) {
			(Some(a), Some(b)) if a == b => self.same,
			(Some(_), Some(_)) => self.cross,
			_ => self.unknown,
		}
	}

	fn apply<N>(&self, nodes: &mut [GraphNode<N>], alpha: f64, random: &mut Lcg) {
		for i in 0..nodes.len() {
			let (mut ax, mut ay) = (0.0, 0.0);
			for j in 0..nodes.len() {
				if i == j {
					continue;
				}
				let mut x = nodes[j].x - nodes[i].x;
				let mut y = nodes[j].y - nodes[i].y;
				let mut l = x * x + y * y;
				if x == 0.0 {
					x = random.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = random.jiggle();
					l += y * y;
				}
				if l < DISTANCE_MIN2 {
					l = (DISTANCE_MIN2 * l).sqrt();
				}
				let w = self.strength(i, j) * alpha / l;
				ax += x * w;
				ay += y * w;
			}
			nodes[i].vx += ax;
			nodes[i].vy += ay;
		}
	}
}

/// Springs between linked nodes with a rest length.
#[derive(Clone, Debug)]
struct LinkForce {
	links: Vec<(usize, usize)>,
	/// Share of the correction applied to the target, by endpoint degree.
	bias: Vec<f64>,
	distance: f64,
	strength: f64,
	iterations: usize,
}

impl LinkForce {
	fn set_links(&mut self, links: &[(usize, usize)], node_count: usize) {
		self.links = links
			.iter()
			.copied()
			.filter(|&(s, t)| s != t && s < node_count && t < node_count)
			.collect();
		let mut degree = vec![0usize; node_count];
		for &(s, t) in &self.links {
			degree[s] += 1;
			degree[t] += 1;
		}
		self.bias = self
			.links
			.iter()
			.map(|&(s, t)| degree[s] as f64 / (degree[s] + degree[t]) as f64)
			.collect();
	}

	fn apply<N>(&self, nodes: &mut [GraphNode<N>], alpha: f64, random: &mut Lcg) {
		for _ in 0..self.iterations {
			for (&(s, t), &bias) in self.links.iter().zip(&self.bias) {
				let (Some(source), Some(target)) = (nodes.get(s), nodes.get(t)) else {
					continue;
				};
				let mut x = target.x + target.vx - source.x - source.vx;
				let mut y = target.y + target.vy - source.y - source.vy;
				if x == 0.0 {
					x = random.jiggle();
				}
				if y == 0.0 {
					y = random.jiggle();
				}
				let l = (x * x + y * y).sqrt();
				let k = (l - self.distance) / l * alpha * self.strength;
				let (x, y) = (x * k, y * k);
				nodes[t].vx -= x * bias;
				nodes[t].vy -= y * bias;
				nodes[s].vx += x * (1.0 - bias);
				nodes[s].vy += y * (1.0 - bias);
			}
		}
	}
}

/// The default layout backend.
#[derive(Clone, Debug)]
pub struct ForceSimulation {
	alpha: f64,
	alpha_min: f64,
	alpha_decay: f64,
	alpha_target: f64,
	velocity_decay: f64,
	phase: SimulationPhase,
	collide: Collide,
	center: Center,
	charge: ManyBody,
	link: LinkForce,
	random: Lcg,
}

impl ForceSimulation {
	/// A simulation at full temperature with no nodes registered.
	pub fn new(config: &LayoutConfig) -> Self {
		Self {
			alpha: 1.0,
			alpha_min: config.alpha_min,
			alpha_decay: config.alpha_decay,
			alpha_target: 0.0,
			velocity_decay: config.velocity_decay,
			phase: SimulationPhase::Initializing,
			collide: Collide {
				radius: config.collide_radius,
				iterations: config.collide_iterations,
				strength: config.collide_strength,
			},
			center: Center {
				x: config.center.0,
				y: config.center.1,
				strength: 1.0,
			},
			charge: ManyBody {
				components: Vec::new(),
				same: config.charge_same_component,
				cross: config.charge_cross_component,
				unknown: config.charge_unknown,
			},
			link: LinkForce {
				links: Vec::new(),
				bias: Vec::new(),
				distance: config.link_distance,
				strength: config.link_strength_initial,
				iterations: config.link_iterations,
			},
			random: Lcg(config.seed),
		}
	}

	/// Current temperature.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Current lifecycle phase.
	pub fn phase(&self) -> SimulationPhase {
		self.phase
	}

	/// Link stiffness registered by the last reseed.
	pub fn link_strength(&self) -> f64 {
		self.link.strength
	}

	/// Many-body strength currently registered between nodes `i` and `j`.
	pub fn charge(&self, i: usize, j: usize) -> f64 {
		self.charge.strength(i, j)
	}

	/// Advances one tick. Returns whether the simulation is still hot.
	pub fn tick<N>(&mut self, nodes: &mut [GraphNode<N>]) -> bool {
		if self.phase != SimulationPhase::Running {
			return false;
		}

		self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
		let alpha = self.alpha;

		self.collide.apply(nodes, &mut self.random);
		self.center.apply(nodes);
		self.charge.apply(nodes, alpha, &mut self.random);
		self.link.apply(nodes, alpha, &mut self.random);

		let keep = 1.0 - self.velocity_decay;
		for node in nodes.iter_mut() {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
		}

		if self.alpha < self.alpha_min {
			debug!("simulation cooled after alpha {:.4}", self.alpha);
			self.phase = SimulationPhase::Cooled;
		}
		self.phase == SimulationPhase::Running
	}
}

impl<N> LayoutBackend<N> for ForceSimulation {
	fn name(&self) -> &'static str {
		"force"
	}

	fn reseed(&mut self, nodes: &mut [GraphNode<N>], topology: &Topology, link_strength: f64) {
		self.charge.components = topology.components.clone();
		self.link.strength = link_strength;
		self.link.set_links(&topology.links, nodes.len());
	}

	fn perturb(&mut self, perturbation: &Perturbation) {
		if self.phase == SimulationPhase::Stopped {
			return;
		}
		self.alpha = perturbation.alpha;
		self.alpha_decay = perturbation.alpha_decay;
		self.velocity_decay = perturbation.velocity_decay;
		self.phase = SimulationPhase::Running;
	}

	fn step(&mut self, nodes: &mut [GraphNode<N>]) -> bool {
		self.tick(nodes)
	}

	fn is_active(&self) -> bool {
		self.phase == SimulationPhase::Running
	}

	fn stop(&mut self) {
		self.phase = SimulationPhase::Stopped;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::super::model::tests::Rec;
	use super::super::model::{GraphNode, Seeder};
	use super::*;

	fn spawn(ids: &[&'static str]) -> Vec<GraphNode<Rec>> {
		let mut seeder = Seeder::new(10.0);
		ids.iter()
			.map(|id| seeder.spawn(id.to_string(), Arc::new(Rec(id))))
			.collect()
	}

	fn seeded(
		nodes: &mut [GraphNode<Rec>],
		links: Vec<(usize, usize)>,
		components: Vec<Option<usize>>,
	) -> ForceSimulation {
		let config = LayoutConfig::default();
		let mut sim = ForceSimulation::new(&config);
		let topology = Topology { links, components };
		LayoutBackend::<Rec>::reseed(&mut sim, nodes, &topology, config.link_strength_initial);
		LayoutBackend::<Rec>::perturb(&mut sim, &config.perturbation());
		sim
	}

	fn distance(a: &GraphNode<Rec>, b: &GraphNode<Rec>) -> f64 {
		(a.x - b.x).hypot(a.y - b.y)
	}

	#[test]
	fn does_not_tick_before_perturbation() {
		let mut nodes = spawn(&["A", "B"]);
		let mut sim = ForceSimulation::new(&LayoutConfig::default());
		let before = (nodes[0].x, nodes[0].y);
		assert!(!sim.tick(&mut nodes));
		assert_eq!(sim.phase(), SimulationPhase::Initializing);
		assert_eq!((nodes[0].x, nodes[0].y), before);
	}

	#[test]
	fn cools_down_and_stops() {
		let mut nodes = spawn(&["A", "B", "C"]);
		let mut sim = seeded(&mut nodes, vec![(0, 1), (1, 2)], vec![Some(0); 3]);
		let mut ticks = 0;
		while sim.tick(&mut nodes) {
			ticks += 1;
			assert!(ticks < 1_000);
		}
		assert_eq!(sim.phase(), SimulationPhase::Cooled);
		assert!(sim.alpha() < 0.001);
		assert!(nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
	}

	#[test]
	fn empty_node_list_ticks_are_noops() {
		let mut nodes = spawn(&[]);
		let mut sim = seeded(&mut nodes, Vec::new(), Vec::new());
		assert!(sim.tick(&mut nodes));
	}

	#[test]
	fn pinned_node_stays_put() {
		let mut nodes = spawn(&["A", "B", "C"]);
		nodes[1].pin(7.0, -3.0);
		let mut sim = seeded(&mut nodes, vec![(0, 1), (1, 2)], vec![Some(0); 3]);
		for _ in 0..50 {
			sim.tick(&mut nodes);
			assert_eq!((nodes[1].x, nodes[1].y), (7.0, -3.0));
			assert_eq!((nodes[1].vx, nodes[1].vy), (0.0, 0.0));
		}
	}

	#[test]
	fn collision_separates_overlapping_nodes() {
		let mut nodes = spawn(&["A", "B"]);
		nodes[0].x = 0.0;
		nodes[0].y = 0.0;
		nodes[1].x = 1.0;
		nodes[1].y = 0.0;
		let mut sim = seeded(&mut nodes, Vec::new(), vec![Some(0), Some(1)]);
		for _ in 0..30 {
			sim.tick(&mut nodes);
		}
		assert!(distance(&nodes[0], &nodes[1]) > 100.0);
	}

	#[test]
	fn centroid_moves_to_center() {
		let mut nodes = spawn(&["A", "B", "C", "D"]);
		let mut sim = seeded(&mut nodes, Vec::new(), vec![Some(0), Some(1), Some(2), Some(3)]);
		while sim.tick(&mut nodes) {}
		let n = nodes.len() as f64;
		let cx = nodes.iter().map(|n| n.x).sum::<f64>() / n;
		let cy = nodes.iter().map(|n| n.y).sum::<f64>() / n;
		// The last tick integrates velocity after centering.
		assert!((cx - 50.0).abs() < 5.0, "cx = {cx}");
		assert!((cy - 50.0).abs() < 5.0, "cy = {cy}");
	}

	#[test]
	fn cross_component_pairs_repel_harder() {
		let sim = {
			let mut nodes = spawn(&["A", "B", "C"]);
			seeded(&mut nodes, vec![(0, 1)], vec![Some(0), Some(0), Some(1)])
		};
		assert_eq!(sim.charge(0, 1), -10.0);
		assert_eq!(sim.charge(0, 2), -80.0);
		assert_eq!(sim.charge(2, 1), -80.0);
		// Index past the registered labels: weak default.
		assert_eq!(sim.charge(0, 7), -10.0);
	}

	#[test]
	fn link_pulls_far_nodes_together() {
		let mut nodes = spawn(&["A", "B"]);
		nodes[0].x = -1_000.0;
		nodes[0].y = 0.0;
		nodes[1].x = 1_000.0;
		nodes[1].y = 0.0;
		let mut sim = seeded(&mut nodes, vec![(0, 1)], vec![Some(0), Some(0)]);
		for _ in 0..20 {
			sim.tick(&mut nodes);
		}
		assert!(distance(&nodes[0], &nodes[1]) < 2_000.0);
	}

	#[test]
	fn stopped_simulation_ignores_perturbation() {
		let mut nodes = spawn(&["A"]);
		let mut sim = seeded(&mut nodes, Vec::new(), vec![Some(0)]);
		LayoutBackend::<Rec>::stop(&mut sim);
		LayoutBackend::<Rec>::perturb(&mut sim, &LayoutConfig::default().perturbation());
		assert_eq!(sim.phase(), SimulationPhase::Stopped);
		assert!(!sim.tick(&mut nodes));
	}
}
