//! graph-explorer: browser knowledge-graph explorer on an incremental
//! force-directed layout.
//!
//! The graph is embedded in the page, shown a few nodes at a time, and grows
//! around every node the user clicks without relaying out what is already on
//! screen.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod explorer;

pub use components::force_graph::KnowledgeGraphCanvas;
use components::force_graph::LEGEND;
use explorer::{Explorer, GraphPayload, node_presentation, relation_accessors};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("graph-explorer: logging initialized");
}

/// Load graph data from a script element with id="graph-data".
/// Expected format: JSON with { nodes: [...], relations: [...], layout?, roots? }
fn load_graph_data() -> Option<GraphPayload> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("graph-data")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match serde_json::from_str::<GraphPayload>(&json_text) {
		Ok(data) => {
			info!(
				"graph-explorer: loaded {} nodes, {} relations, {} roots",
				data.nodes.len(),
				data.relations.len(),
				data.roots.len()
			);
			Some(data)
		}
		Err(e) => {
			warn!("graph-explorer: failed to parse graph data: {}", e);
			None
		}
	}
}

/// Color key for the known node kinds.
#[component]
fn Legend() -> impl IntoView {
	view! {
		<div class="graph-legend">
			{LEGEND
				.iter()
				.map(|(kind, color)| {
					view! {
						<div class="legend-item">
							<span
								class="legend-swatch"
								style=format!("background-color: {};", color.to_css())
							/>
							<span class="legend-label">{*kind}</span>
						</div>
					}
				})
				.collect_view()}
		</div>
	}
}

/// Main application component.
/// Loads the graph from the DOM and renders the explorer around it.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let payload = load_graph_data().unwrap_or_default();
	let layout = payload.layout.clone();
	let explorer = RwSignal::new(Explorer::new(payload));

	let nodes = Signal::derive(move || explorer.with(Explorer::shown_nodes));
	let links = Signal::derive(move || explorer.with(Explorer::shown_relations));
	let highlight = Signal::derive(move || explorer.with(Explorer::selected));

	let on_node_click = Callback::new(move |id: String| match id.parse::<u64>() {
		Ok(id) => explorer.update(|e| e.select(id)),
		Err(_) => warn!("graph-explorer: clicked node has a non-numeric id {id}"),
	});

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Knowledge Graph Explorer" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<KnowledgeGraphCanvas
				nodes=nodes
				links=links
				accessors=relation_accessors()
				presentation=node_presentation()
				highlight=highlight
				on_node_click=on_node_click
				layout=layout
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Knowledge Graph"</h1>
				<p class="subtitle">
					"Click a node to expand it. Drag to pin, double-click to release. Scroll to zoom."
				</p>
				<Legend />
			</div>
		</div>
	}
}
