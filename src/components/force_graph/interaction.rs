//! Pointer interaction: drag-to-pin, click reporting, pan and zoom.
//!
//! Everything here works in plain coordinates so the canvas component only
//! translates DOM events into calls. Screen coordinates are canvas pixels;
//! world coordinates are simulation units.

use log::debug;

use super::config::ViewConfig;
use super::engine::GraphEngine;
use super::types::NodeIdentity;

/// Pan and zoom transform applied to the entire graph view.
///
/// Independent of simulation coordinates: panning never moves a node.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in screen pixels.
	pub x: f64,
	/// Vertical offset in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// A transform that puts world `(wx, wy)` at screen `(sx, sy)`.
	pub fn centered_on(wx: f64, wy: f64, sx: f64, sy: f64) -> Self {
		Self {
			x: sx - wx,
			y: sy - wy,
			k: 1.0,
		}
	}

	/// Screen pixels to world coordinates.
	pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// World coordinates to screen pixels.
	pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
		(wx * self.k + self.x, wy * self.k + self.y)
	}

	/// Scales by `factor` keeping the world point under `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64, min_k: f64, max_k: f64) {
		let new_k = (self.k * factor).clamp(min_k, max_k);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

/// Tracks an in-progress node press.
#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
	/// Pressed node.
	pub node_id: String,
	/// Screen x of the press.
	pub start_x: f64,
	/// Screen y of the press.
	pub start_y: f64,
	/// Set once the pointer leaves the click slop; the press is then a drag.
	pub moved: bool,
}

/// Tracks an in-progress canvas pan.
#[derive(Clone, Debug, PartialEq)]
pub struct PanState {
	/// Screen x of the press.
	pub start_x: f64,
	/// Screen y of the press.
	pub start_y: f64,
	/// Transform x when the pan began.
	pub transform_start_x: f64,
	/// Transform y when the pan began.
	pub transform_start_y: f64,
}

/// Whether the externally chosen highlight refers to node `id`.
///
/// Ids that do not parse, or a highlight with no matching node, simply never
/// match.
pub fn highlight_matches(highlight: Option<u64>, id: &str) -> bool {
	highlight.is_some_and(|h| id.parse::<u64>() == Ok(h))
}

impl<N: NodeIdentity, R> GraphEngine<N, R> {
	/// Pins node `id` at world `(x, y)` and restarts the layout so its
	/// neighbours react. Returns `false` for unknown ids.
	pub fn drag_move(&mut self, id: &str, x: f64, y: f64) -> bool {
		let Some(node) = self.node_mut(id) else {
			return false;
		};
		node.pin(x, y);
		self.restart();
		true
	}

	/// Returns node `id` to free simulation without restarting.
	pub fn release(&mut self, id: &str) -> bool {
		let Some(node) = self.node_mut(id) else {
			return false;
		};
		node.unpin();
		true
	}

	/// Top-most node within `radius` of world `(wx, wy)`.
	pub fn node_at(&self, wx: f64, wy: f64, radius: f64) -> Option<&str> {
		self.nodes()
			.iter()
			.rev()
			.find(|n| (n.x - wx).hypot(n.y - wy) <= radius)
			.map(|n| n.id())
	}
}

/// Pointer state machine for one graph view.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Node press in progress.
	pub drag: Option<DragState>,
	/// Canvas pan in progress.
	pub pan: Option<PanState>,
	/// Zoom limits and click slop.
	pub view: ViewConfig,
}

impl Interaction {
	/// Idle pointer state over `transform`.
	pub fn new(transform: ViewTransform, view: ViewConfig) -> Self {
		Self {
			transform,
			drag: None,
			pan: None,
			view,
		}
	}

	/// Starts a node press if a node is under the pointer, a pan otherwise.
	pub fn pointer_down<N: NodeIdentity, R>(
		&mut self,
		engine: &GraphEngine<N, R>,
		sx: f64,
		sy: f64,
	) {
		let (wx, wy) = self.transform.screen_to_world(sx, sy);
		match engine.node_at(wx, wy, engine.config().node_radius) {
			Some(id) => {
				self.drag = Some(DragState {
					node_id: id.to_string(),
					start_x: sx,
					start_y: sy,
					moved: false,
				});
			}
			None => {
				self.pan = Some(PanState {
					start_x: sx,
					start_y: sy,
					transform_start_x: self.transform.x,
					transform_start_y: self.transform.y,
				});
			}
		}
	}

	/// Drags the pressed node, or pans.
	pub fn pointer_move<N: NodeIdentity, R>(
		&mut self,
		engine: &mut GraphEngine<N, R>,
		sx: f64,
		sy: f64,
	) {
		if let Some(drag) = self.drag.as_mut() {
			if !drag.moved {
				let travel = (sx - drag.start_x).hypot(sy - drag.start_y);
				if travel < self.view.click_slop {
					return;
				}
				drag.moved = true;
				debug!("dragging node {}", drag.node_id);
			}
			let (wx, wy) = self.transform.screen_to_world(sx, sy);
			engine.drag_move(&drag.node_id, wx, wy);
		} else if let Some(pan) = &self.pan {
			self.transform.x = pan.transform_start_x + (sx - pan.start_x);
			self.transform.y = pan.transform_start_y + (sy - pan.start_y);
		}
	}

	/// Ends the press. Returns the node id if the press was a click.
	pub fn pointer_up<N: NodeIdentity, R>(
		&mut self,
		engine: &mut GraphEngine<N, R>,
	) -> Option<String> {
		self.pan = None;
		let drag = self.drag.take()?;
		if drag.moved {
			engine.release(&drag.node_id);
			None
		} else {
			Some(drag.node_id)
		}
	}

	/// Pointer left the canvas: abandon any press without reporting a click.
	pub fn pointer_leave<N: NodeIdentity, R>(&mut self, engine: &mut GraphEngine<N, R>) {
		self.pan = None;
		if let Some(drag) = self.drag.take()
			&& drag.moved
		{
			engine.release(&drag.node_id);
		}
	}

	/// Double-activation on a node releases its pin. Never zooms.
	pub fn double_click<N: NodeIdentity, R>(
		&mut self,
		engine: &mut GraphEngine<N, R>,
		sx: f64,
		sy: f64,
	) -> Option<String> {
		let (wx, wy) = self.transform.screen_to_world(sx, sy);
		let id = engine
			.node_at(wx, wy, engine.config().node_radius)?
			.to_string();
		engine.release(&id);
		Some(id)
	}

	/// Wheel zoom anchored at the pointer. `delta_y > 0` zooms out.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 {
			1.0 / self.view.zoom_step
		} else {
			self.view.zoom_step
		};
		self.transform
			.zoom_at(sx, sy, factor, self.view.min_zoom, self.view.max_zoom);
	}
}
