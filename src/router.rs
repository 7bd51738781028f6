use crate::{
	tree::RouteTree, BoxFuture, ChainError, ConfigError, Context, MethodKey, Route,
};
use hyper::{Body, Request, Response};
use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
	time::Duration,
};

/// Runs before dispatch and may answer a request on its own, in which case the route tree never
/// sees it.
pub type Prehandler =
	Arc<dyn for<'a> Fn(&'a Request<Body>) -> BoxFuture<'a, Option<Response<Body>>> + Send + Sync>;

pub struct RouterBuilder {
	route: Route,
	prehandlers: Vec<Prehandler>,
	deadline: Option<Duration>,
}

impl RouterBuilder {
	pub fn new(route: Route) -> Self {
		Self {
			route,
			prehandlers: Vec::new(),
			deadline: None,
		}
	}

	/// Appends a prehandler. Prehandlers run in registration order; the first to return a
	/// response answers the request.
	pub fn prehandler<F>(mut self, f: F) -> Self
	where
		F: for<'a> Fn(&'a Request<Body>) -> BoxFuture<'a, Option<Response<Body>>>
			+ Send
			+ Sync
			+ 'static,
	{
		self.prehandlers.push(Arc::new(f));
		self
	}

	/// Bounds how long a handler chain may run. A chain that overruns is abandoned and the
	/// request is answered through the error handlers, which get the same amount of time before
	/// the generic failure response is sent instead.
	pub fn deadline(mut self, deadline: Duration) -> Self {
		self.deadline = Some(deadline);
		self
	}

	pub fn build(self) -> Result<Router, ConfigError> {
		Ok(Router {
			tree: Arc::new(RouteTree::compile(&self.route)?),
			prehandlers: self.prehandlers,
			deadline: self.deadline,
		})
	}
}

impl Debug for RouterBuilder {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterBuilder")
			.field("route", &self.route)
			.field("prehandlers", &self.prehandlers.len())
			.field("deadline", &self.deadline)
			.finish()
	}
}

/// A compiled route tree ready to serve requests.
pub struct Router {
	tree: Arc<RouteTree>,
	prehandlers: Vec<Prehandler>,
	deadline: Option<Duration>,
}

impl Router {
	pub fn builder(route: Route) -> RouterBuilder {
		RouterBuilder::new(route)
	}

	pub fn tree(&self) -> &RouteTree {
		&self.tree
	}

	/// Serves one request through its handler chain. Always produces exactly one response.
	pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
		for prehandler in &self.prehandlers {
			if let Some(response) = prehandler(&req).await {
				return response;
			}
		}

		let (head, body) = req.into_parts();
		let dispatch = self
			.tree
			.dispatch(head.uri.path(), MethodKey::from_method(&head.method));
		let mut ctx = Context::new(Arc::clone(&self.tree), dispatch, head, body);

		match self.deadline {
			Some(deadline) => {
				if tokio::time::timeout(deadline, ctx.next()).await.is_err() {
					let fault = ChainError::DeadlineElapsed(deadline);
					let bubbled = tokio::time::timeout(deadline, ctx.advance(Some(fault.into())));
					if bubbled.await.is_err() {
						tracing::error!(
							path = ctx.path(),
							?deadline,
							"error handler overran the request deadline"
						);
						ctx.respond_internal_error();
					}
				}
			}
			None => ctx.next().await,
		}

		ctx.into_response()
	}
}

impl Debug for Router {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("tree", &self.tree)
			.field("prehandlers", &self.prehandlers.len())
			.field("deadline", &self.deadline)
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::RouterBuilder;
	use crate::{BoxFuture, ConfigError, Context, Route};
	use anyhow::Result;
	use hyper::{Body, Request, Response, StatusCode};
	use std::time::Duration;

	fn hello(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			ctx.respond(StatusCode::OK, "hello")?;
			Ok(())
		})
	}

	fn stalls(_ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async {
			tokio::time::sleep(Duration::from_secs(60)).await;
			Ok(())
		})
	}

	fn halts(_ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Ok(()) })
	}

	fn timed_out(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			ctx.respond(StatusCode::GATEWAY_TIMEOUT, "")?;
			Ok(())
		})
	}

	fn health(req: &Request<Body>) -> BoxFuture<'_, Option<Response<Body>>> {
		Box::pin(async move {
			if req.uri().path() == "/healthz" {
				Some(Response::new(Body::from("ok")))
			} else {
				None
			}
		})
	}

	fn get(uri: &str) -> Request<Body> {
		Request::get(uri).body(Body::empty()).unwrap()
	}

	#[tokio::test]
	async fn serves_routes() {
		let router = RouterBuilder::new(Route::new().get(hello)).build().unwrap();
		assert_eq!(router.handle(get("/")).await.status(), StatusCode::OK);
		assert_eq!(
			router.handle(Request::post("/").body(Body::empty()).unwrap()).await.status(),
			StatusCode::NOT_FOUND
		);
	}

	#[tokio::test]
	async fn prehandlers_short_circuit() {
		let router = RouterBuilder::new(Route::new().get(hello))
			.prehandler(health)
			.build()
			.unwrap();

		let response = router.handle(get("/healthz")).await;
		let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
		assert_eq!(body.as_ref(), b"ok");

		let response = router.handle(get("/")).await;
		let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
		assert_eq!(body.as_ref(), b"hello");
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_reaches_error_handler() {
		let route = Route::new().error(timed_out).get(stalls);
		let router = RouterBuilder::new(route)
			.deadline(Duration::from_millis(50))
			.build()
			.unwrap();
		assert_eq!(
			router.handle(get("/")).await.status(),
			StatusCode::GATEWAY_TIMEOUT
		);
	}

	#[tokio::test(start_paused = true)]
	async fn stalled_error_handler_gets_generic_failure() {
		let route = Route::new().error(stalls).get(stalls);
		let router = RouterBuilder::new(route)
			.deadline(Duration::from_millis(50))
			.build()
			.unwrap();

		let response = tokio::time::timeout(Duration::from_secs(1), router.handle(get("/")))
			.await
			.expect("request was never answered");
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[tokio::test]
	async fn unanswered_chain_gets_generic_failure() {
		let router = RouterBuilder::new(Route::new().get(halts)).build().unwrap();
		assert_eq!(
			router.handle(get("/")).await.status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn build_reports_config_errors() {
		let route = Route::new().param("", Route::new());
		assert!(matches!(
			RouterBuilder::new(route).build(),
			Err(ConfigError::MissingAlias { .. })
		));
	}
}
