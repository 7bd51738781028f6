use crate::{
	dispatch::{Dispatch, Params},
	tree::{NodeId, RouteTree},
	ChainError, Handler, PublicError,
};
use anyhow::Error;
use hyper::{
	body::Bytes,
	header::{HeaderValue, CONTENT_TYPE, LOCATION},
	http::{request::Parts, Extensions},
	Body, HeaderMap, Method, Response, StatusCode, Uri,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{mem, sync::Arc, vec};

/// The status of the response emitted for a request, recorded in [`Context::extras`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseStatus(pub StatusCode);

/// Where a request is in its handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	/// No handler has run yet.
	Initialized,
	/// At least one handler has been taken off the chain.
	Advancing,
	/// A fault was raised and no response has been emitted yet.
	Faulted,
	/// A response has been emitted.
	Completed,
}

/// How far the request body has been read.
#[derive(Debug)]
enum Payload {
	Unread(Body),
	Read(Bytes),
	/// Reading failed, or was abandoned part way.
	Failed,
}

/// Everything a handler knows about the request it is serving.
///
/// The context owns the handler chain for its request. Each handler decides whether the chain
/// continues by awaiting [`Context::next`]; a handler that returns without doing so ends the
/// chain. At most one response can be emitted per context.
pub struct Context {
	pub(crate) tree: Arc<RouteTree>,
	pub(crate) node: NodeId,
	chain: vec::IntoIter<Handler>,
	consumed: usize,
	params: Params,
	query: Vec<(String, String)>,
	head: Parts,
	payload: Payload,
	pub(crate) error: Option<Error>,
	extras: Extensions,
	response: Option<Response<Body>>,
}

impl Context {
	pub(crate) fn new(tree: Arc<RouteTree>, dispatch: Dispatch, head: Parts, body: Body) -> Self {
		let query = head
			.uri
			.query()
			.map(|query| {
				url::form_urlencoded::parse(query.as_bytes())
					.into_owned()
					.collect()
			})
			.unwrap_or_default();

		Self {
			tree,
			node: dispatch.node,
			chain: dispatch.handlers.into_iter(),
			consumed: 0,
			params: dispatch.params,
			query,
			head,
			payload: Payload::Unread(body),
			error: None,
			extras: Extensions::new(),
			response: None,
		}
	}

	/// Runs the next handler in the chain, or hands `fault` to the nearest error handler.
	///
	/// Errors returned by the handler are routed to the error handlers the same way, so this
	/// only returns once the request has either moved on or been answered. Advancing past the
	/// end of the chain is itself a fault.
	pub async fn advance(&mut self, fault: Option<Error>) {
		if let Some(fault) = fault {
			return self.fail(fault).await;
		}

		match self.chain.next() {
			Some(handler) => {
				self.consumed += 1;
				if let Err(fault) = handler(self).await {
					self.fail(fault).await;
				}
			}
			None => self.fail(ChainError::Exhausted.into()).await,
		}
	}

	/// Runs the next handler in the chain.
	pub async fn next(&mut self) {
		self.advance(None).await
	}

	/// Emits the response for this request.
	pub fn respond(
		&mut self,
		status: StatusCode,
		body: impl Into<Body>,
	) -> Result<(), ChainError> {
		self.respond_with(status, body, HeaderMap::new())
	}

	/// Emits the response for this request with extra headers.
	pub fn respond_with(
		&mut self,
		status: StatusCode,
		body: impl Into<Body>,
		headers: HeaderMap,
	) -> Result<(), ChainError> {
		if self.response.is_some() {
			return Err(ChainError::AlreadyResponded);
		}

		let mut response = Response::new(body.into());
		*response.status_mut() = status;
		*response.headers_mut() = headers;

		self.extras.insert(ResponseStatus(status));
		self.response = Some(response);
		Ok(())
	}

	/// Emits `value` encoded as JSON, with a JSON content type.
	pub fn respond_json<T: Serialize + ?Sized>(
		&mut self,
		status: StatusCode,
		value: &T,
	) -> Result<(), ChainError> {
		let body = serde_json::to_vec(value)?;
		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.respond_with(status, body, headers)
	}

	/// Emits an empty `204 No Content`.
	pub fn no_content(&mut self) -> Result<(), ChainError> {
		self.respond(StatusCode::NO_CONTENT, Body::empty())
	}

	/// Redirects the client to `location` with `302 Found`.
	pub fn redirect(&mut self, location: &str) -> Result<(), ChainError> {
		self.redirect_with(location, HeaderMap::new())
	}

	pub fn redirect_with(
		&mut self,
		location: &str,
		mut headers: HeaderMap,
	) -> Result<(), ChainError> {
		headers.insert(LOCATION, HeaderValue::from_str(location)?);
		self.respond_with(StatusCode::FOUND, Body::empty(), headers)
	}

	/// The request body. It is read from the connection on first use; later calls return the
	/// same bytes. Once a read has failed, every later call fails with
	/// [`ChainError::BodyUnavailable`].
	pub async fn body(&mut self) -> Result<&Bytes, ChainError> {
		// stays failed if the read errors or the future is dropped mid-read
		let payload = mem::replace(&mut self.payload, Payload::Failed);
		self.payload = match payload {
			Payload::Unread(body) => Payload::Read(hyper::body::to_bytes(body).await?),
			settled => settled,
		};

		match &self.payload {
			Payload::Read(bytes) => Ok(bytes),
			_ => Err(ChainError::BodyUnavailable),
		}
	}

	/// The request body decoded as JSON. A body that does not decode into `T` is answered with
	/// `400 Bad Request`.
	pub async fn json<T: DeserializeOwned>(&mut self) -> anyhow::Result<T> {
		let bytes = self.body().await?;
		let value = serde_json::from_slice(bytes).map_err(|error| {
			PublicError::bad_request(format!("malformed JSON body: {}", error))
		})?;
		Ok(value)
	}

	pub fn method(&self) -> &Method {
		&self.head.method
	}

	pub fn uri(&self) -> &Uri {
		&self.head.uri
	}

	pub fn path(&self) -> &str {
		self.head.uri.path()
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.head.headers
	}

	/// The path segment bound to `alias` by a parametric route.
	pub fn param(&self, alias: &str) -> Option<&str> {
		self.params.get(alias)
	}

	pub fn params(&self) -> &Params {
		&self.params
	}

	/// The first value of the query parameter `name`.
	pub fn query(&self, name: &str) -> Option<&str> {
		self.query
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}

	pub fn query_pairs(&self) -> &[(String, String)] {
		&self.query
	}

	/// The fault handed to the error handlers, once one has been raised.
	pub fn error(&self) -> Option<&Error> {
		self.error.as_ref()
	}

	/// Request-scoped metadata shared between handlers.
	pub fn extras(&self) -> &Extensions {
		&self.extras
	}

	pub fn extras_mut(&mut self) -> &mut Extensions {
		&mut self.extras
	}

	/// The node dispatch stopped at for this request.
	pub fn node(&self) -> NodeId {
		self.node
	}

	pub fn state(&self) -> State {
		if self.response.is_some() {
			State::Completed
		} else if self.error.is_some() {
			State::Faulted
		} else if self.consumed == 0 {
			State::Initialized
		} else {
			State::Advancing
		}
	}

	pub fn is_responded(&self) -> bool {
		self.response.is_some()
	}

	/// Hands back the emitted response. A chain that ended without answering gets the generic
	/// failure response.
	pub(crate) fn into_response(mut self) -> Response<Body> {
		if !self.is_responded() {
			tracing::warn!(path = self.path(), "handler chain ended without a response");
			self.respond_internal_error();
		}

		self.response.unwrap_or_default()
	}
}
