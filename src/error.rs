use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// A malformed route tree, reported when the tree is compiled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("parametric route under `{path}` must have a non-empty alias")]
	MissingAlias { path: String },
}

/// Faults raised by the request context itself.
#[derive(Debug, Error)]
pub enum ChainError {
	#[error("no more handlers")]
	Exhausted,
	#[error("a response has already been sent for this request")]
	AlreadyResponded,
	#[error("request deadline of {0:?} elapsed")]
	DeadlineElapsed(Duration),
	#[error("failed to read request body")]
	Body(#[from] hyper::Error),
	#[error("request body is unavailable after a failed read")]
	BodyUnavailable,
	#[error("failed to encode response body")]
	Encode(#[from] serde_json::Error),
	#[error("invalid redirect location")]
	Location(#[from] hyper::header::InvalidHeaderValue),
}

/// An error whose status and message are safe to show to the client.
///
/// Returning one of these from a handler (or passing it to [`Context::advance`]) answers the
/// request with exactly this status and message; no error handler runs.
///
/// [`Context::advance`]: crate::Context::advance
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct PublicError {
	pub status: StatusCode,
	pub message: String,
}

impl PublicError {
	pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
		}
	}

	pub fn bad_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, message)
	}

	pub fn unauthorized(message: impl Into<String>) -> Self {
		Self::new(StatusCode::UNAUTHORIZED, message)
	}

	pub fn forbidden(message: impl Into<String>) -> Self {
		Self::new(StatusCode::FORBIDDEN, message)
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self::new(StatusCode::NOT_FOUND, message)
	}
}

#[cfg(test)]
mod test {
	use super::{ChainError, ConfigError, PublicError};
	use hyper::StatusCode;
	use std::time::Duration;

	#[test]
	fn public_error_constructors() {
		assert_eq!(PublicError::bad_request("x").status, StatusCode::BAD_REQUEST);
		assert_eq!(PublicError::unauthorized("x").status, StatusCode::UNAUTHORIZED);
		assert_eq!(PublicError::not_found("x").status, StatusCode::NOT_FOUND);

		let forbidden = PublicError::forbidden("members only");
		assert_eq!(
			forbidden,
			PublicError::new(StatusCode::FORBIDDEN, String::from("members only"))
		);
		assert_eq!(forbidden.to_string(), "403 Forbidden: members only");
	}

	#[test]
	fn public_error_survives_anyhow() {
		let fault: anyhow::Error = PublicError::not_found("no such user").into();
		let public = fault.downcast_ref::<PublicError>().unwrap();
		assert_eq!(public.status, StatusCode::NOT_FOUND);
		assert_eq!(public.message, "no such user");
	}

	#[test]
	fn messages() {
		let missing = ConfigError::MissingAlias {
			path: "/users".to_owned(),
		};
		assert_eq!(
			missing.to_string(),
			"parametric route under `/users` must have a non-empty alias"
		);
		assert_eq!(
			ChainError::DeadlineElapsed(Duration::from_millis(50)).to_string(),
			"request deadline of 50ms elapsed"
		);
		assert_eq!(ChainError::Exhausted.to_string(), "no more handlers");
	}
}
