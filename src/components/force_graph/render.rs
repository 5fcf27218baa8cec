//! Canvas rendering for the knowledge graph.
//!
//! Draws one [`Frame`] in three passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Edges with arrowheads, then edge text (world space)
//! 3. Nodes with their text, kind label, pin marker and highlight ring
//!
//! Geometry lives in small pure functions so it can be tested without a
//! browser.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::config::ViewConfig;
use super::engine::{EdgeFrame, Frame, NodeFrame};
use super::interaction::{ViewTransform, highlight_matches};
use super::model::EdgeShape;
use super::theme::{Color, Theme};
use super::types::Presentation;

/// Everything besides the frame that decides how it looks.
pub struct RenderStyle<'a, N> {
	/// Colors, kind labels and display text per node.
	pub presentation: &'a Presentation<N>,
	/// Palette.
	pub theme: &'a Theme,
	/// Fonts, curve bend and loop size.
	pub view: &'a ViewConfig,
	/// Node radius in world units.
	pub node_radius: f64,
	/// Id of the node to ring.
	pub highlight: Option<u64>,
}

/// Renders the complete frame to the canvas.
pub fn render<N, R>(
	ctx: &CanvasRenderingContext2d,
	frame: &Frame<N, R>,
	transform: &ViewTransform,
	width: f64,
	height: f64,
	style: &RenderStyle<'_, N>,
) {
	draw_background(ctx, style.theme, width, height);

	ctx.save();
	let _ = ctx.translate(transform.x, transform.y);
	let _ = ctx.scale(transform.k, transform.k);

	for edge in &frame.edges {
		draw_edge(ctx, edge, style);
	}
	ctx.set_font(&style.view.label_font);
	for edge in &frame.edges {
		draw_edge_text(ctx, edge, style);
	}
	for node in &frame.nodes {
		draw_node(ctx, node, style);
	}

	ctx.restore();
}

fn draw_background(ctx: &CanvasRenderingContext2d, theme: &Theme, width: f64, height: f64) {
	let bg = &theme.background;
	let gradient = bg
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(
				width / 2.0,
				height / 2.0,
				0.0,
				width / 2.0,
				height / 2.0,
				width.max(height) * 0.8,
			)
			.ok()
		})
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &bg.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &bg.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&bg.color.to_css()),
	}

	ctx.fill_rect(0.0, 0.0, width, height);
}

/// Unit vector from `(x1, y1)` to `(x2, y2)`, `None` when the points coincide.
fn direction(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<(f64, f64)> {
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = dx.hypot(dy);
	(dist >= 0.001).then(|| (dx / dist, dy / dist))
}

/// Control point of the quadratic curve for a reciprocal edge.
///
/// The bulge is to the left of the travel direction, so the two halves of a
/// reciprocal pair curve to opposite sides.
pub fn curve_control(x1: f64, y1: f64, x2: f64, y2: f64, bend: f64) -> (f64, f64) {
	let (dx, dy) = (x2 - x1, y2 - y1);
	((x1 + x2) / 2.0 + dy * bend, (y1 + y2) / 2.0 - dx * bend)
}

/// Point of a quadratic curve at parameter `t`.
fn quadratic_at(p0: (f64, f64), c: (f64, f64), p2: (f64, f64), t: f64) -> (f64, f64) {
	let u = 1.0 - t;
	(
		u * u * p0.0 + 2.0 * u * t * c.0 + t * t * p2.0,
		u * u * p0.1 + 2.0 * u * t * c.1 + t * t * p2.1,
	)
}

/// Geometry of a self-loop on a node of radius `r` at `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelfLoop {
	/// Loop center x.
	pub cx: f64,
	/// Loop center y.
	pub cy: f64,
	/// Loop radius.
	pub radius: f64,
	/// Where the loop re-enters the node.
	pub tip: (f64, f64),
	/// Unit direction the arrowhead points.
	pub heading: (f64, f64),
}

impl SelfLoop {
	/// A loop whose center sits on the top of the node outline.
	pub fn new(x: f64, y: f64, r: f64, scale: f64) -> Self {
		let radius = r * scale;
		let (cx, cy) = (x, y - r);
		// Distance from the node center, along the up axis, to the chord
		// where the two circles intersect.
		let a = (2.0 * r * r - radius * radius) / (2.0 * r);
		let h = (r * r - a * a).max(0.0).sqrt();
		let tip = (x + h, y - a);
		let (tx, ty) = (-(tip.1 - cy), tip.0 - cx);
		let len = tx.hypot(ty).max(f64::EPSILON);
		Self {
			cx,
			cy,
			radius,
			tip,
			heading: (tx / len, ty / len),
		}
	}

	/// Topmost point of the loop, where its text goes.
	pub fn apex(&self) -> (f64, f64) {
		(self.cx, self.cy - self.radius)
	}
}

/// Filled arrowhead with its tip at `tip`, pointing along `(ux, uy)`.
fn draw_arrow(
	ctx: &CanvasRenderingContext2d,
	tip: (f64, f64),
	(ux, uy): (f64, f64),
	size: f64,
) {
	let (back_x, back_y) = (tip.0 - ux * size, tip.1 - uy * size);
	let (px, py) = (-uy * size * 0.5, ux * size * 0.5);

	ctx.begin_path();
	ctx.move_to(tip.0, tip.1);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_edge<N, R>(
	ctx: &CanvasRenderingContext2d,
	edge: &EdgeFrame<R>,
	style: &RenderStyle<'_, N>,
) {
	let r = style.node_radius;
	let arrow = style.view.arrow_size;
	let color = style.theme.edge.color.to_css();
	ctx.set_stroke_style_str(&color);
	ctx.set_fill_style_str(&color);
	ctx.set_line_width(style.theme.edge.line_width);

	match edge.shape {
		EdgeShape::Straight => {
			let Some((ux, uy)) = direction(edge.x1, edge.y1, edge.x2, edge.y2) else {
				return;
			};
			let tip = (edge.x2 - ux * r, edge.y2 - uy * r);
			ctx.begin_path();
			ctx.move_to(edge.x1 + ux * r, edge.y1 + uy * r);
			ctx.line_to(tip.0 - ux * arrow, tip.1 - uy * arrow);
			ctx.stroke();
			draw_arrow(ctx, tip, (ux, uy), arrow);
		}
		EdgeShape::Curved => {
			let (cx, cy) = curve_control(edge.x1, edge.y1, edge.x2, edge.y2, style.view.curve_bend);
			let (Some((sx, sy)), Some((ex, ey))) = (
				direction(edge.x1, edge.y1, cx, cy),
				direction(cx, cy, edge.x2, edge.y2),
			) else {
				return;
			};
			let tip = (edge.x2 - ex * r, edge.y2 - ey * r);
			ctx.begin_path();
			ctx.move_to(edge.x1 + sx * r, edge.y1 + sy * r);
			let _ = ctx.quadratic_curve_to(cx, cy, tip.0 - ex * arrow, tip.1 - ey * arrow);
			ctx.stroke();
			draw_arrow(ctx, tip, (ex, ey), arrow);
		}
		EdgeShape::SelfLoop => {
			let lp = SelfLoop::new(edge.x1, edge.y1, r, style.view.self_loop_scale);
			ctx.begin_path();
			let _ = ctx.arc(lp.cx, lp.cy, lp.radius, 0.0, 2.0 * PI);
			ctx.stroke();
			draw_arrow(ctx, lp.tip, lp.heading, arrow);
		}
	}
}

/// Where an edge's text is centered.
pub fn edge_text_anchor(
	shape: EdgeShape,
	(x1, y1): (f64, f64),
	(x2, y2): (f64, f64),
	r: f64,
	view: &ViewConfig,
) -> (f64, f64) {
	match shape {
		EdgeShape::Straight => ((x1 + x2) / 2.0, (y1 + y2) / 2.0),
		EdgeShape::Curved => {
			let c = curve_control(x1, y1, x2, y2, view.curve_bend);
			quadratic_at((x1, y1), c, (x2, y2), 0.5)
		}
		EdgeShape::SelfLoop => SelfLoop::new(x1, y1, r, view.self_loop_scale).apex(),
	}
}

fn draw_edge_text<N, R>(
	ctx: &CanvasRenderingContext2d,
	edge: &EdgeFrame<R>,
	style: &RenderStyle<'_, N>,
) {
	let text = edge.text.as_str();
	if text.is_empty() {
		return;
	}
	let (x, y) = edge_text_anchor(
		edge.shape,
		(edge.x1, edge.y1),
		(edge.x2, edge.y2),
		style.node_radius,
		style.view,
	);

	// Knock out the line behind the text.
	if let Ok(metrics) = ctx.measure_text(text) {
		let w = metrics.width() + 6.0;
		ctx.set_fill_style_str(&style.theme.background.color.with_alpha(0.85).to_css());
		ctx.fill_rect(x - w / 2.0, y - 8.0, w, 16.0);
	}

	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	ctx.set_fill_style_str(&style.theme.edge.text_color.to_css());
	let _ = ctx.fill_text(text, x, y);
}

fn draw_node<N>(
	ctx: &CanvasRenderingContext2d,
	node: &NodeFrame<N>,
	style: &RenderStyle<'_, N>,
) {
	let (x, y) = (node.x, node.y);
	let r = style.node_radius;
	let theme = style.theme;
	let fill = Color::parse(&(style.presentation.color)(&node.raw));

	if highlight_matches(style.highlight, &node.id) {
		ctx.begin_path();
		let _ = ctx.arc(x, y, r + 8.0, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&theme.node.highlight_color.to_css());
		ctx.set_line_width(6.0);
		ctx.stroke();
	}

	let gradient = theme
		.node
		.use_gradient
		.then(|| {
			ctx.create_radial_gradient(x - r * 0.3, y - r * 0.3, 0.0, x, y, r)
				.ok()
		})
		.flatten();
	ctx.begin_path();
	let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &fill.lighten(0.3).to_css());
			let _ = gradient.add_color_stop(0.7, &fill.to_css());
			let _ = gradient.add_color_stop(1.0, &fill.darken(0.15).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&fill.to_css()),
	}
	ctx.fill();

	if theme.node.border_width > 0.0 {
		if node.pinned {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(6.0),
				&JsValue::from_f64(4.0),
			));
		}
		ctx.set_stroke_style_str(&theme.node.border_color.to_css());
		ctx.set_line_width(theme.node.border_width);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	if node.pinned {
		let (px, py) = (x + r * 0.7, y - r * 0.7);
		ctx.begin_path();
		let _ = ctx.arc(px, py, r * 0.12, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&theme.node.pin_color.to_css());
		ctx.fill();
	}

	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	let text = (style.presentation.text)(&node.raw);
	if !text.is_empty() {
		ctx.set_font(&style.view.text_font);
		ctx.set_fill_style_str(&theme.text_on(fill).to_css());
		let _ = ctx.fill_text(&text, x, y);
	}

	let label = (style.presentation.label)(&node.raw);
	if !label.is_empty() {
		ctx.set_font(&style.view.label_font);
		ctx.set_fill_style_str(&theme.edge.text_color.to_css());
		let _ = ctx.fill_text(&label, x, y - r - 10.0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: (f64, f64), b: (f64, f64)) -> bool {
		(a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
	}

	#[test]
	fn reciprocal_curves_bulge_to_opposite_sides() {
		let forward = curve_control(0.0, 0.0, 100.0, 0.0, 0.2);
		let back = curve_control(100.0, 0.0, 0.0, 0.0, 0.2);
		assert!(close(forward, (50.0, -20.0)));
		assert!(close(back, (50.0, 20.0)));
	}

	#[test]
	fn self_loop_reenters_on_the_node_outline() {
		let lp = SelfLoop::new(10.0, 20.0, 50.0, 0.6);
		assert_eq!((lp.cx, lp.cy, lp.radius), (10.0, -30.0, 30.0));
		let from_node = (lp.tip.0 - 10.0).hypot(lp.tip.1 - 20.0);
		let from_loop = (lp.tip.0 - lp.cx).hypot(lp.tip.1 - lp.cy);
		assert!((from_node - 50.0).abs() < 1e-9);
		assert!((from_loop - 30.0).abs() < 1e-9);
		assert!((lp.heading.0.hypot(lp.heading.1) - 1.0).abs() < 1e-9);
		// Arrow heads down into the node.
		assert!(lp.heading.1 > 0.0);
		assert!(close(lp.apex(), (10.0, -60.0)));
	}

	#[test]
	fn edge_text_sits_on_the_drawn_path() {
		let view = ViewConfig::default();
		assert!(close(
			edge_text_anchor(EdgeShape::Straight, (0.0, 0.0), (100.0, 40.0), 50.0, &view),
			(50.0, 20.0)
		));
		// Halfway along the quadratic: half the bulge of the control point.
		assert!(close(
			edge_text_anchor(EdgeShape::Curved, (0.0, 0.0), (100.0, 0.0), 50.0, &view),
			(50.0, -10.0)
		));
		assert!(close(
			edge_text_anchor(EdgeShape::SelfLoop, (0.0, 0.0), (0.0, 0.0), 50.0, &view),
			(0.0, -80.0)
		));
	}

	#[test]
	fn coincident_points_have_no_direction() {
		assert_eq!(direction(1.0, 1.0, 1.0, 1.0), None);
		assert!(close(direction(0.0, 0.0, 3.0, 4.0).unwrap(), (0.6, 0.8)));
	}
}
