use crate::{
	route::{Methods, Route},
	BoxFuture, ConfigError, Context, Handler, MethodKey,
};
use anyhow::Result;
use hyper::StatusCode;
use std::{
	collections::BTreeMap,
	fmt::{self, Debug, Formatter},
	ops::Index,
	sync::Arc,
};

/// Index of a node within a [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
	pub const ROOT: NodeId = NodeId(0);
}

/// A route level after compilation, linked to its parent.
pub struct Node {
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: BTreeMap<String, NodeId>,
	pub(crate) param: Option<NodeId>,
	pub(crate) alias: Option<String>,
	pub(crate) middleware: Vec<Handler>,
	pub(crate) methods: Methods,
	pub(crate) fallback: Option<Handler>,
	pub(crate) error: Option<Handler>,
}

impl Node {
	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	/// The alias this node binds its segment to, if it is a parametric node.
	pub fn alias(&self) -> Option<&str> {
		self.alias.as_deref()
	}

	pub fn child(&self, segment: &str) -> Option<NodeId> {
		self.children.get(segment).copied()
	}

	pub fn param(&self) -> Option<NodeId> {
		self.param
	}
}

impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let methods: Vec<_> = MethodKey::ALL
			.iter()
			.filter(|key| self.methods[key.index()].is_some())
			.collect();

		f.debug_struct("Node")
			.field("parent", &self.parent)
			.field("children", &self.children)
			.field("param", &self.param)
			.field("alias", &self.alias)
			.field("middleware", &self.middleware.len())
			.field("methods", &methods)
			.field("fallback", &self.fallback.is_some())
			.field("error", &self.error.is_some())
			.finish()
	}
}

fn default_fallback(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
	Box::pin(async move {
		ctx.respond(StatusCode::NOT_FOUND, "")?;
		Ok(())
	})
}

/// A compiled route tree. Nodes live in a flat table and refer to each other by [`NodeId`]; the
/// root is always [`NodeId::ROOT`].
///
/// Compiled trees are never mutated, so one tree can serve any number of concurrent requests.
#[derive(Debug)]
pub struct RouteTree {
	nodes: Vec<Node>,
}

impl RouteTree {
	/// Compiles an authored route into a tree ready for dispatch.
	///
	/// The root gets a fallback answering `404 Not Found` unless one was declared. Every
	/// parametric route must carry a non-empty alias.
	pub fn compile(route: &Route) -> Result<Self, ConfigError> {
		let mut tree = Self { nodes: Vec::new() };
		tree.annotate(route, None, "/")?;
		Ok(tree)
	}

	fn annotate(
		&mut self,
		route: &Route,
		parent: Option<NodeId>,
		path: &str,
	) -> Result<NodeId, ConfigError> {
		let id = NodeId(self.nodes.len());
		let fallback = match (&route.fallback, parent) {
			(Some(fallback), _) => Some(Arc::clone(fallback)),
			(None, None) => Some(Arc::new(default_fallback) as Handler),
			(None, Some(_)) => None,
		};

		self.nodes.push(Node {
			parent,
			children: BTreeMap::new(),
			param: None,
			alias: None,
			middleware: route.middleware.clone(),
			methods: route.methods.clone(),
			fallback,
			error: route.error.clone(),
		});

		for (segment, child) in &route.children {
			let child_id = self.annotate(child, Some(id), &join(path, segment))?;
			self.nodes[id.0].children.insert(segment.clone(), child_id);
		}

		if let Some(param) = &route.param {
			if param.alias.is_empty() {
				return Err(ConfigError::MissingAlias {
					path: path.to_owned(),
				});
			}

			let param_path = join(path, &format!(":{}", param.alias));
			let param_id = self.annotate(&param.route, Some(id), &param_path)?;
			self.nodes[param_id.0].alias = Some(param.alias.clone());
			self.nodes[id.0].param = Some(param_id);
		}

		Ok(id)
	}

	pub fn root(&self) -> &Node {
		&self[NodeId::ROOT]
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Iterates from `id` up to the root, `id` first.
	pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
		Ancestors {
			tree: self,
			next: Some(id),
		}
	}
}

fn join(path: &str, segment: &str) -> String {
	if path.ends_with('/') {
		format!("{}{}", path, segment)
	} else {
		format!("{}/{}", path, segment)
	}
}

impl Index<NodeId> for RouteTree {
	type Output = Node;

	fn index(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}
}

pub struct Ancestors<'a> {
	tree: &'a RouteTree,
	next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
	type Item = (NodeId, &'a Node);

	fn next(&mut self) -> Option<Self::Item> {
		let id = self.next?;
		let node = &self.tree[id];
		self.next = node.parent;
		Some((id, node))
	}
}
