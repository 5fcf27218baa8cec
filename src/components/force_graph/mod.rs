//! Incremental force-directed knowledge-graph view.
//!
//! Keeps one live simulation per view across updates of the visible subgraph:
//! - Diff-based reconciliation that preserves positions, velocities and pins
//! - Connectivity-adaptive repulsion between disconnected subgraphs
//! - Reciprocal edges drawn as opposing curves, self-loops as loops
//! - Drag-to-pin, click reporting, pan and zoom
//!
//! The engine modules are DOM-free; only [`component`] and [`render`] touch
//! the browser.
//!
//! # Example
//!
//! ```ignore
//! use graph_explorer::components::force_graph::{
//!     EdgeAccessors, KnowledgeGraphCanvas, NodeIdentity, Presentation,
//! };
//!
//! impl NodeIdentity for Doc {
//!     fn node_id(&self) -> String { self.id.to_string() }
//! }
//!
//! let accessors = EdgeAccessors::new(
//!     |r: &Link| r.id.clone(),
//!     |r: &Link| r.kind.clone(),
//!     |r: &Link| r.from.to_string(),
//!     |r: &Link| r.to.to_string(),
//! );
//! let presentation = Presentation::new(
//!     |_: &Doc| "#00bfff".into(),
//!     |d: &Doc| d.kind.clone(),
//!     |d: &Doc| d.title.clone(),
//! );
//!
//! view! {
//!     <KnowledgeGraphCanvas nodes=docs links=links accessors presentation fullscreen=true />
//! }
//! ```

pub mod backend;
pub mod component;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod interaction;
pub mod model;
pub mod multiplicity;
pub mod render;
pub mod simulation;
pub mod theme;
pub mod types;

pub use backend::{LayoutBackend, SpringLayout};
pub use component::{KnowledgeGraphCanvas, Ticker};
pub use config::{BackendKind, LayoutConfig, ViewConfig};
pub use engine::{Frame, GraphEngine};
pub use interaction::ViewTransform;
pub use model::{EdgeShape, EdgeVariant};
pub use simulation::ForceSimulation;
pub use theme::{Color, LEGEND, Theme, name_to_color};
pub use types::{EdgeAccessors, NodeIdentity, Presentation};
