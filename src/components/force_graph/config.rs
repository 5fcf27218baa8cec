//! Tunable layout and view constants.
//!
//! The physics constants are empirically tuned defaults, not invariants.
//! [`LayoutConfig`] deserializes with `#[serde(default)]`, so a page payload
//! may override any subset of them.

use serde::Deserialize;

/// Which layout backend drives node positions.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
	/// Alpha-cooled force simulation with adaptive repulsion.
	#[default]
	Force,
	/// Spring layout from the `force_graph` crate.
	Spring,
}

/// Kinetic reset applied when the layout must re-settle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perturbation {
	/// Temperature the simulation is reset to.
	pub alpha: f64,
	/// Fraction of the remaining temperature lost per tick.
	pub alpha_decay: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
}

/// Physics constants for the layout backends.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
	/// Which backend moves the nodes.
	pub backend: BackendKind,
	/// Visual node radius in world units.
	pub node_radius: f64,
	/// Per-node collision radius. Must not be smaller than `node_radius`.
	pub collide_radius: f64,
	/// Collision passes per tick.
	pub collide_iterations: usize,
	/// Fraction of an overlap resolved per pass.
	pub collide_strength: f64,
	/// Point the centroid is pulled towards.
	pub center: (f64, f64),
	/// Many-body strength between nodes of the same component.
	pub charge_same_component: f64,
	/// Many-body strength between nodes of different components.
	pub charge_cross_component: f64,
	/// Many-body strength when either component is unknown.
	pub charge_unknown: f64,
	/// Rest length of a link.
	pub link_distance: f64,
	/// Link stiffness used when the view first mounts.
	pub link_strength_initial: f64,
	/// Softer link stiffness used for later updates.
	pub link_strength_update: f64,
	/// Link relaxation passes per tick.
	pub link_iterations: usize,
	/// Temperature below which the layout stops.
	pub alpha_min: f64,
	/// Decay used before the first perturbation.
	pub alpha_decay: f64,
	/// Velocity decay used before the first perturbation.
	pub velocity_decay: f64,
	/// Temperature set by every restart.
	pub perturb_alpha: f64,
	/// Alpha decay set by every restart.
	pub perturb_alpha_decay: f64,
	/// Velocity decay set by every restart.
	pub perturb_velocity_decay: f64,
	/// Radius of the first fresh node on the placement spiral.
	pub initial_radius: f64,
	/// Seed for the jiggle applied to coincident particles.
	pub seed: u32,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		let node_radius = 50.0;
		Self {
			backend: BackendKind::Force,
			node_radius,
			collide_radius: node_radius * 2.0,
			collide_iterations: 20,
			collide_strength: 1.0,
			center: (50.0, 50.0),
			charge_same_component: -10.0,
			charge_cross_component: -80.0,
			charge_unknown: -10.0,
			link_distance: 300.0,
			link_strength_initial: 0.1,
			link_strength_update: 0.05,
			link_iterations: 1,
			alpha_min: 0.001,
			alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
			velocity_decay: 0.4,
			perturb_alpha: 1.0,
			perturb_alpha_decay: 0.05,
			perturb_velocity_decay: 0.5,
			initial_radius: 10.0,
			seed: 1,
		}
	}
}

impl LayoutConfig {
	/// The strong kinetic reset used on topology and pin changes.
	pub fn perturbation(&self) -> Perturbation {
		Perturbation {
			alpha: self.perturb_alpha,
			alpha_decay: self.perturb_alpha_decay,
			velocity_decay: self.perturb_velocity_decay,
		}
	}
}

/// Screen-side constants for the canvas view.
#[derive(Clone, Debug)]
pub struct ViewConfig {
	/// Arrowhead length in world units.
	pub arrow_size: f64,
	/// Font for node display text.
	pub text_font: String,
	/// Font for node kind labels and edge text.
	pub label_font: String,
	/// Perpendicular bulge of a reciprocal edge, as a fraction of its length.
	pub curve_bend: f64,
	/// Radius of a self-loop relative to the node radius.
	pub self_loop_scale: f64,
	/// Smallest zoom factor.
	pub min_zoom: f64,
	/// Largest zoom factor.
	pub max_zoom: f64,
	/// Multiplicative zoom step per wheel notch.
	pub zoom_step: f64,
	/// Pointer travel (screen pixels) below which a press counts as a click.
	pub click_slop: f64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			arrow_size: 12.0,
			text_font: "14px sans-serif".into(),
			label_font: "11px sans-serif".into(),
			curve_bend: 0.2,
			self_loop_scale: 0.6,
			min_zoom: 0.1,
			max_zoom: 10.0,
			zoom_step: 1.1,
			click_slop: 3.0,
		}
	}
}
