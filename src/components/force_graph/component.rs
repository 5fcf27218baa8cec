//! Leptos component wrapping the knowledge-graph canvas.
//!
//! The component owns one [`GraphEngine`] for as long as it is mounted. Node
//! and link signals feed [`GraphEngine::update`]; mouse and wheel handlers go
//! through [`Interaction`]; a `requestAnimationFrame` loop ticks the engine
//! and renders each frame. Everything is released from `on_cleanup`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::config::{LayoutConfig, ViewConfig};
use super::engine::GraphEngine;
use super::interaction::{Interaction, ViewTransform};
use super::render::{self, RenderStyle};
use super::theme::Theme;
use super::types::{EdgeAccessors, NodeIdentity, Presentation};

/// World units that should fit across the shorter side of the canvas.
const INITIAL_SPAN: f64 = 800.0;

/// Owned `requestAnimationFrame` loop.
///
/// The loop keeps rescheduling itself until the handle is dropped; dropping
/// cancels the pending frame and releases the closure.
pub struct Ticker {
	frame: Rc<Cell<Option<i32>>>,
	callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl Ticker {
	/// Starts calling `on_frame` once per animation frame.
	pub fn start(mut on_frame: impl FnMut() + 'static) -> Option<Self> {
		let window = web_sys::window()?;
		let frame = Rc::new(Cell::new(None));
		let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

		let (frame_inner, callback_inner) = (frame.clone(), callback.clone());
		*callback.borrow_mut() = Some(Closure::new(move || {
			frame_inner.set(None);
			on_frame();
			let Some(window) = web_sys::window() else {
				return;
			};
			if let Some(ref cb) = *callback_inner.borrow() {
				let next = window.request_animation_frame(cb.as_ref().unchecked_ref());
				frame_inner.set(next.ok());
			}
		}));

		if let Some(ref cb) = *callback.borrow() {
			frame.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
		Some(Self { frame, callback })
	}
}

impl Drop for Ticker {
	fn drop(&mut self) {
		if let (Some(id), Some(window)) = (self.frame.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
		// Breaks the closure's reference to its own cell.
		self.callback.borrow_mut().take();
	}
}

/// Engine, pointer state and drawing surface for one mounted canvas.
struct GraphContext<N, R> {
	engine: GraphEngine<N, R>,
	ui: Interaction,
	ctx: CanvasRenderingContext2d,
	width: f64,
	height: f64,
}

fn viewport_size(
	canvas: &HtmlCanvasElement,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> (f64, f64) {
	let window = web_sys::window();
	let inner = |f: fn(&Window) -> Result<JsValue, JsValue>| {
		window
			.as_ref()
			.and_then(|w| f(w).ok())
			.and_then(|v| v.as_f64())
	};
	if fullscreen {
		(
			inner(Window::inner_width).unwrap_or(800.0),
			inner(Window::inner_height).unwrap_or(600.0),
		)
	} else {
		(
			width.unwrap_or_else(|| {
				canvas
					.parent_element()
					.map(|p| p.client_width() as f64)
					.unwrap_or(800.0)
			}),
			height.unwrap_or_else(|| {
				canvas
					.parent_element()
					.map(|p| p.client_height() as f64)
					.unwrap_or(600.0)
			}),
		)
	}
}

/// Pointer position relative to the canvas.
fn canvas_point(
	canvas_ref: NodeRef<leptos::html::Canvas>,
	ev: &MouseEvent,
) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders an incrementally laid out knowledge graph on a canvas element.
///
/// `nodes` and `links` are the desired sets. Every change is reconciled into
/// the running layout; surviving nodes keep their positions and pins.
/// `on_node_click` receives the id of a node that was pressed and released
/// without dragging. `highlight` marks the node whose id equals the number.
///
/// The canvas sizes itself to the parent container by default, to the viewport
/// with `fullscreen = true`, or to an explicit `width`/`height`.
#[component]
pub fn KnowledgeGraphCanvas<N, R>(
	/// Desired node records
	#[prop(into)]
	nodes: Signal<Vec<Arc<N>>>,
	/// Desired edge records
	#[prop(into)]
	links: Signal<Vec<Arc<R>>>,
	/// How edge records are read
	accessors: EdgeAccessors<R>,
	/// How node records are drawn
	presentation: Presentation<N>,
	/// Numeric id of the node to ring
	#[prop(into, optional)]
	highlight: MaybeProp<u64>,
	/// Called with the id of a clicked node
	#[prop(optional)]
	on_node_click: Option<Callback<String>>,
	/// Physics constants
	#[prop(optional)]
	layout: LayoutConfig,
	/// Fonts, zoom limits and click slop
	#[prop(optional)]
	view: ViewConfig,
	/// Palette
	#[prop(optional)]
	theme: Theme,
	/// Size to the window instead of the parent
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width in pixels
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height in pixels
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView
where
	N: NodeIdentity + Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let context = StoredValue::new_local(None::<GraphContext<N, R>>);
	let ticker = StoredValue::new_local(None::<Ticker>);
	let resize_cb = StoredValue::new_local(None::<Closure<dyn FnMut()>>);
	let style = StoredValue::new_local((presentation, theme));

	let mount = move |canvas: HtmlCanvasElement| -> Option<()> {
		let (w, h) = viewport_size(&canvas, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("knowledge graph: canvas has no 2d context");
			return None;
		};

		let (cx, cy) = layout.center;
		let mut transform = ViewTransform::centered_on(cx, cy, w / 2.0, h / 2.0);
		transform.zoom_at(
			w / 2.0,
			h / 2.0,
			w.min(h) / INITIAL_SPAN,
			view.min_zoom,
			view.max_zoom,
		);
		context.set_value(Some(GraphContext {
			engine: GraphEngine::new(accessors.clone(), layout.clone()),
			ui: Interaction::new(transform, view.clone()),
			ctx,
			width: w,
			height: h,
		}));

		if fullscreen {
			let canvas_resize = canvas.clone();
			let cb = Closure::<dyn FnMut()>::new(move || {
				let (nw, nh) = viewport_size(&canvas_resize, true, None, None);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				context.try_update_value(|c| {
					if let Some(c) = c {
						(c.width, c.height) = (nw, nh);
					}
				});
			});
			if let Some(window) = web_sys::window() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
			resize_cb.set_value(Some(cb));
		}

		ticker.set_value(Ticker::start(move || {
			let selected = highlight.get_untracked();
			context.try_update_value(|c| {
				let Some(c) = c else {
					return;
				};
				c.engine.tick();
				let frame = c.engine.frame();
				style.with_value(|(presentation, theme)| {
					let render_style = RenderStyle {
						presentation,
						theme,
						view: &c.ui.view,
						node_radius: c.engine.config().node_radius,
						highlight: selected,
					};
					render::render(
						&c.ctx,
						&frame,
						&c.ui.transform,
						c.width,
						c.height,
						&render_style,
					);
				});
			});
		}));
		debug!("knowledge graph mounted at {w}x{h}");
		Some(())
	};

	Effect::new(move |_| {
		let desired_nodes = nodes.get();
		let desired_links = links.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if context.with_value(Option::is_none) && mount(canvas).is_none() {
			return;
		}
		context.update_value(|c| {
			if let Some(c) = c {
				c.engine.update(&desired_nodes, &desired_links);
			}
		});
	});

	on_cleanup(move || {
		ticker.try_update_value(Option::take);
		if let Some(Some(cb)) = resize_cb.try_update_value(Option::take)
			&& let Some(window) = web_sys::window()
		{
			let _ =
				window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
		context.try_update_value(|c| {
			if let Some(c) = c {
				c.engine.teardown();
			}
		});
	});

	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		context.update_value(|c| {
			if let Some(c) = c {
				c.ui.pointer_down(&c.engine, x, y);
			}
		});
	};

	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		context.update_value(|c| {
			if let Some(c) = c {
				c.ui.pointer_move(&mut c.engine, x, y);
			}
		});
	};

	let on_mouseup = move |_: MouseEvent| {
		let clicked = context
			.try_update_value(|c| c.as_mut().and_then(|c| c.ui.pointer_up(&mut c.engine)))
			.flatten();
		// Outside the borrow: the callback may well change `nodes`.
		if let (Some(id), Some(cb)) = (clicked, on_node_click) {
			debug!("node clicked: {id}");
			cb.run(id);
		}
	};

	let on_mouseleave = move |_: MouseEvent| {
		context.update_value(|c| {
			if let Some(c) = c {
				c.ui.pointer_leave(&mut c.engine);
			}
		});
	};

	let on_dblclick = move |ev: MouseEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		context.update_value(|c| {
			if let Some(c) = c {
				c.ui.double_click(&mut c.engine, x, y);
			}
		});
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		context.update_value(|c| {
			if let Some(c) = c {
				c.ui.wheel(x, y, ev.delta_y());
			}
		});
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="knowledge-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:dblclick=on_dblclick
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
