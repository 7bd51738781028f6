use crate::{Context, MethodKey};
use anyhow::Result;
use std::{
	collections::BTreeMap,
	fmt::{self, Debug, Formatter},
	future::Future,
	pin::Pin,
	sync::Arc,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A step in a request's handler chain: middleware, endpoint, fallback and error handlers all
/// share this shape.
pub type Handler = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Wraps a function or closure as a [`Handler`].
///
/// Closures need to go through a function with this bound for their argument lifetime to be
/// inferred as higher-ranked:
///
/// ```
/// use trellis::{handler, StatusCode};
///
/// let hello = handler(|ctx| Box::pin(async move {
/// 	ctx.respond(StatusCode::OK, "hello")?;
/// 	Ok(())
/// }));
/// ```
pub fn handler<F>(f: F) -> Handler
where
	F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
	Arc::new(f)
}

pub(crate) type Methods = [Option<Vec<Handler>>; 4];

/// One level of a route tree, as authored.
///
/// Each level can hold literal children, one parametric child, middleware that wraps every
/// request resolved at or below it, handlers per method, a fallback for requests no method
/// handler answers, and an error handler for faults raised below it.
#[derive(Clone, Default)]
pub struct Route {
	pub(crate) children: BTreeMap<String, Route>,
	pub(crate) param: Option<Box<Param>>,
	pub(crate) middleware: Vec<Handler>,
	pub(crate) methods: Methods,
	pub(crate) fallback: Option<Handler>,
	pub(crate) error: Option<Handler>,
}

/// The parametric child of a route: matches any segment and binds it to `alias`.
#[derive(Clone)]
pub struct Param {
	pub(crate) alias: String,
	pub(crate) route: Route,
}

impl Route {
	pub fn new() -> Self {
		Self::default()
	}

	/// Nests `route` under the literal path segment `segment`, replacing any previous child of
	/// the same name.
	pub fn at(mut self, segment: impl Into<String>, route: Route) -> Self {
		self.children.insert(segment.into(), route);
		self
	}

	/// Sets the parametric child. The matched segment is available as `ctx.param(alias)`.
	pub fn param(mut self, alias: impl Into<String>, route: Route) -> Self {
		self.param = Some(Box::new(Param {
			alias: alias.into(),
			route,
		}));
		self
	}

	/// Appends middleware run for every request resolved at or below this route.
	pub fn using<F>(mut self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.middleware.push(handler(f));
		self
	}

	/// Appends a handler to the slot for `method`. Registering several handlers for one method
	/// chains them in registration order.
	pub fn method<F>(mut self, method: MethodKey, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.methods[method.index()]
			.get_or_insert_with(Vec::new)
			.push(handler(f));
		self
	}

	pub fn get<F>(self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.method(MethodKey::Get, f)
	}

	pub fn put<F>(self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.method(MethodKey::Put, f)
	}

	pub fn post<F>(self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.method(MethodKey::Post, f)
	}

	pub fn delete<F>(self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.method(MethodKey::Delete, f)
	}

	/// Handles requests resolved at or below this route that no method handler answered.
	pub fn fallback<F>(mut self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.fallback = Some(handler(f));
		self
	}

	/// Handles faults raised while serving requests resolved at or below this route.
	pub fn error<F>(mut self, f: F) -> Self
	where
		F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
	{
		self.error = Some(handler(f));
		self
	}
}

impl Debug for Route {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let methods: Vec<_> = MethodKey::ALL
			.iter()
			.filter(|key| self.methods[key.index()].is_some())
			.collect();

		f.debug_struct("Route")
			.field("children", &self.children)
			.field("param", &self.param)
			.field("middleware", &self.middleware.len())
			.field("methods", &methods)
			.field("fallback", &self.fallback.is_some())
			.field("error", &self.error.is_some())
			.finish()
	}
}

impl Debug for Param {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Param")
			.field("alias", &self.alias)
			.field("route", &self.route)
			.finish()
	}
}
