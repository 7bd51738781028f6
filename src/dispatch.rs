use crate::{
	key::{self, Token},
	tree::{NodeId, RouteTree},
	Handler, MethodKey,
};
use std::sync::Arc;

/// Path parameters bound while dispatching, in the order they appeared in the path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
	pairs: Vec<(String, String)>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `alias` to `value`, replacing an earlier binding of the same alias in place.
	pub fn insert(&mut self, alias: impl Into<String>, value: impl Into<String>) {
		let alias = alias.into();
		let value = value.into();
		match self.pairs.iter_mut().find(|(key, _)| *key == alias) {
			Some((_, existing)) => *existing = value,
			None => self.pairs.push((alias, value)),
		}
	}

	pub fn get(&self, alias: &str) -> Option<&str> {
		self.pairs
			.iter()
			.find(|(key, _)| key == alias)
			.map(|(_, value)| value.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}
}

/// The outcome of walking the route tree for one request.
pub struct Dispatch {
	/// The deepest node the walk reached. Error handlers are looked up from here.
	pub node: NodeId,
	pub params: Params,
	/// The full handler chain: middleware root first, then the endpoint or fallback.
	pub handlers: Vec<Handler>,
	/// Whether a method handler or fallback was found for the request.
	pub endpoint_set: bool,
}

impl RouteTree {
	/// Resolves `path` and `method` to a node, its path parameters and the handler chain.
	///
	/// The walk stops at the first segment that matches neither a literal nor a parametric
	/// child; whatever follows is ignored and the request is served by the node reached so far.
	pub fn dispatch(&self, path: &str, method: Option<MethodKey>) -> Dispatch {
		let mut node = NodeId::ROOT;
		let mut params = Params::new();
		let mut handlers = Vec::new();
		let mut endpoint_set = false;

		for token in key::tokens(key::segments(path), method) {
			let current = &self[node];
			match token {
				Token::Method(method) => match &current.methods[method.index()] {
					Some(endpoint) => {
						handlers.extend(endpoint.iter().cloned());
						endpoint_set = true;
					}
					None => break,
				},
				Token::Segment(segment) => match (current.child(segment), current.param) {
					(Some(child), _) => node = child,
					(None, Some(param)) => {
						if let Some(alias) = self[param].alias() {
							params.insert(alias, segment);
						}
						node = param;
					}
					(None, None) => break,
				},
			}
		}

		let endpoint_set = self.load_middleware(node, endpoint_set, &mut handlers);
		tracing::debug!(
			path,
			method = ?method,
			node = ?node,
			handlers = handlers.len(),
			endpoint_set,
			"dispatched request"
		);

		Dispatch {
			node,
			params,
			handlers,
			endpoint_set,
		}
	}

	/// Wraps `handlers` in the middleware of `node` and every ancestor, outermost first, and
	/// appends the nearest fallback when no endpoint has been set. Returns whether an endpoint
	/// is set afterwards.
	pub fn load_middleware(
		&self,
		node: NodeId,
		mut endpoint_set: bool,
		handlers: &mut Vec<Handler>,
	) -> bool {
		for (_, current) in self.ancestors(node) {
			if !endpoint_set {
				if let Some(fallback) = &current.fallback {
					handlers.push(Arc::clone(fallback));
					endpoint_set = true;
				}
			}

			if !current.middleware.is_empty() {
				handlers.splice(0..0, current.middleware.iter().cloned());
			}
		}

		endpoint_set
	}
}
