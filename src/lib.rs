//! A nested route tree with cascading middleware and error handlers, built on hyper.
//!
//! ```no_run
//! use trellis::{logger, serve, BoxFuture, Context, PublicError, Route, Router, StatusCode};
//!
//! fn user(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
//! 	Box::pin(async move {
//! 		let id = ctx.param("id").unwrap_or_default().to_owned();
//! 		if id == "0" {
//! 			return Err(PublicError::not_found("no such user").into());
//! 		}
//! 		ctx.respond(StatusCode::OK, format!("user {}", id))?;
//! 		Ok(())
//! 	})
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! 	let route = Route::new()
//! 		.using(logger)
//! 		.at("users", Route::new().param("id", Route::new().get(user)));
//!
//! 	let router = Router::builder(route).build()?;
//! 	serve(([127, 0, 0, 1], 3000).into(), router).await?;
//! 	Ok(())
//! }
//! ```
//!
//! Each request walks the tree one path segment at a time, preferring a literal child over the
//! parametric one, and stops at the first segment nothing matches. The handler chain for the
//! request is the middleware of every level it passed through, outermost first, followed by the
//! handlers for its method at the level it stopped on. If that level has no handler for the
//! method, the nearest fallback takes its place; the root always has one, answering
//! `404 Not Found`.
//!
//! Handlers continue the chain by awaiting [`Context::next`]. Errors they return are passed to
//! the nearest error handler above the level the request stopped on, except [`PublicError`]s,
//! which are sent to the client as they are. Every request gets exactly one response.

mod bubble;
mod context;
mod dispatch;
mod error;
mod http;
mod key;
mod logger;
mod route;

/// Route tree compilation.
pub mod tree;

/// Contains the router that drives requests through the compiled tree.
pub mod router;

/// Shape checks for JSON payloads that answer with `400 Bad Request` on failure.
pub mod validate;

pub use context::*;
pub use dispatch::*;
pub use error::*;
pub use http::*;
pub use key::{MethodKey, Token};
pub use logger::logger;
pub use route::*;
pub use router::*;

pub use hyper;
pub use hyper::{Body, HeaderMap, Method, Request, Response, StatusCode};
