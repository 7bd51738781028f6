use crate::Router;
use hyper::{service::Service, Body, Request, Response, Server};
use std::{
	convert::Infallible,
	future::{ready, Future, Ready},
	net::SocketAddr,
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
};

/// Binds `addr` and serves `router` on it until the server fails.
pub async fn serve(addr: SocketAddr, router: Router) -> hyper::Result<()> {
	let server = Server::try_bind(&addr)?.serve(HttpRouter::from(router));
	tracing::info!(%addr, "listening");
	server.await
}

/// Makes one [`RouteHandler`] per connection, all sharing the same router.
#[derive(Debug, Clone)]
pub struct HttpRouter {
	router: Arc<Router>,
}

impl From<Router> for HttpRouter {
	fn from(router: Router) -> Self {
		Self {
			router: Arc::new(router),
		}
	}
}

impl<T> Service<T> for HttpRouter {
	type Response = RouteHandler;
	type Error = Infallible;
	type Future = Ready<Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _: &mut Context) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, _: T) -> Self::Future {
		ready(Ok(RouteHandler {
			router: Arc::clone(&self.router),
		}))
	}
}

/// Responsible for handling the actual HTTP requests from hyper.
#[derive(Debug, Clone)]
pub struct RouteHandler {
	router: Arc<Router>,
}

impl Service<Request<Body>> for RouteHandler {
	type Response = Response<Body>;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let router = Arc::clone(&self.router);
		Box::pin(async move { Ok(router.handle(req).await) })
	}
}
