//! Caller-facing interfaces: how the engine reads opaque node and edge records.
//!
//! The engine never inspects the concrete record types. Nodes expose a stable
//! string identity through [`NodeIdentity`]; everything else is injected as
//! plain functions.

use std::fmt;
use std::sync::Arc;

/// Stable identity of a node record.
///
/// Two records with the same id are the same node, even if every other field
/// differs between updates.
pub trait NodeIdentity {
	/// Returns the identity string for this node.
	fn node_id(&self) -> String;
}

/// A pure extraction function over a record.
pub type Extractor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Extractors for edge records.
pub struct EdgeAccessors<R> {
	/// Edge identity.
	pub id: Extractor<R>,
	/// Text drawn next to the edge.
	pub text: Extractor<R>,
	/// Identity of the source node.
	pub source_id: Extractor<R>,
	/// Identity of the target node.
	pub target_id: Extractor<R>,
}

impl<R> EdgeAccessors<R> {
	/// Builds accessors from four closures.
	pub fn new(
		id: impl Fn(&R) -> String + Send + Sync + 'static,
		text: impl Fn(&R) -> String + Send + Sync + 'static,
		source_id: impl Fn(&R) -> String + Send + Sync + 'static,
		target_id: impl Fn(&R) -> String + Send + Sync + 'static,
	) -> Self {
		Self {
			id: Arc::new(id),
			text: Arc::new(text),
			source_id: Arc::new(source_id),
			target_id: Arc::new(target_id),
		}
	}
}

// Manual impls: deriving would require `R: Clone`/`R: Debug`.
impl<R> Clone for EdgeAccessors<R> {
	fn clone(&self) -> Self {
		Self {
			id: Arc::clone(&self.id),
			text: Arc::clone(&self.text),
			source_id: Arc::clone(&self.source_id),
			target_id: Arc::clone(&self.target_id),
		}
	}
}

impl<R> fmt::Debug for EdgeAccessors<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EdgeAccessors").finish_non_exhaustive()
	}
}

/// Presentation callbacks for node records.
pub struct Presentation<N> {
	/// CSS fill color.
	pub color: Extractor<N>,
	/// Short kind label drawn above the node.
	pub label: Extractor<N>,
	/// Display text drawn inside the node.
	pub text: Extractor<N>,
}

impl<N> Presentation<N> {
	/// Builds presentation callbacks from three closures.
	pub fn new(
		color: impl Fn(&N) -> String + Send + Sync + 'static,
		label: impl Fn(&N) -> String + Send + Sync + 'static,
		text: impl Fn(&N) -> String + Send + Sync + 'static,
	) -> Self {
		Self {
			color: Arc::new(color),
			label: Arc::new(label),
			text: Arc::new(text),
		}
	}
}

impl<N> Clone for Presentation<N> {
	fn clone(&self) -> Self {
		Self {
			color: Arc::clone(&self.color),
			label: Arc::clone(&self.label),
			text: Arc::clone(&self.text),
		}
	}
}

impl<N> fmt::Debug for Presentation<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Presentation").finish_non_exhaustive()
	}
}
