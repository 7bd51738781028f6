use crate::{Context, PublicError};
use anyhow::Error;
use hyper::StatusCode;

impl Context {
	/// Answers the request after `fault` was raised somewhere in the chain.
	///
	/// Public errors are sent to the client as they are. Anything else is handed to the error
	/// handler declared nearest to the dispatched node; if there is none, or it fails or leaves
	/// the request unanswered, the client gets a bare `500 Internal Server Error`.
	pub(crate) async fn fail(&mut self, fault: Error) {
		if self.is_responded() {
			tracing::warn!(
				error = %fault,
				path = self.path(),
				"dropping fault raised after the response was sent"
			);
			return;
		}

		if let Some(public) = fault.downcast_ref::<PublicError>() {
			let (status, message) = (public.status, public.message.clone());
			tracing::debug!(%status, path = self.path(), "answering with public error");
			if let Err(error) = self.respond(status, message) {
				tracing::error!(%error, "failed to send public error");
			}
			return;
		}

		tracing::error!(error = %fault, path = self.path(), "handler failed");
		self.error = Some(fault);

		let handler = self
			.tree
			.ancestors(self.node)
			.find_map(|(_, node)| node.error.clone());

		if let Some(handler) = handler {
			let outcome = handler(self).await;
			match outcome {
				Ok(()) if self.is_responded() => return,
				Ok(()) => tracing::warn!(
					path = self.path(),
					"error handler returned without responding"
				),
				Err(secondary) => tracing::error!(
					error = %secondary,
					path = self.path(),
					"error handler failed"
				),
			}
		}

		self.respond_internal_error();
	}

	/// Sends the generic failure response unless a response already went out.
	pub(crate) fn respond_internal_error(&mut self) {
		if !self.is_responded() {
			let status = StatusCode::INTERNAL_SERVER_ERROR;
			let reason = status.canonical_reason().unwrap_or_default();
			// cannot fail: nothing has been sent
			let _ = self.respond(status, reason);
		}
	}
}

#[cfg(test)]
mod test {
	use crate::{BoxFuture, Context, PublicError, Route, RouterBuilder};
	use anyhow::{anyhow, Result};
	use hyper::{body, Body, Request, StatusCode};

	fn fails(_ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Err(anyhow!("database on fire")) })
	}

	fn forbidden(_ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Err(PublicError::forbidden("members only").into()) })
	}

	fn passes_fault(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			ctx.advance(Some(anyhow!("rejected by middleware"))).await;
			Ok(())
		})
	}

	fn reports(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let message = ctx.error().map(ToString::to_string).unwrap_or_default();
			ctx.respond(StatusCode::SERVICE_UNAVAILABLE, message)?;
			Ok(())
		})
	}

	fn also_fails(_ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Err(anyhow!("error handler broke too")) })
	}

	fn silent(_ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Ok(()) })
	}

	async fn call(route: Route, uri: &str) -> (StatusCode, String) {
		let router = RouterBuilder::new(route).build().unwrap();
		let request = Request::get(uri).body(Body::empty()).unwrap();
		let response = router.handle(request).await;
		let status = response.status();
		let bytes = body::to_bytes(response.into_body()).await.unwrap();
		(status, String::from_utf8(bytes.to_vec()).unwrap())
	}

	#[tokio::test]
	async fn public_errors_skip_error_handlers() {
		let route = Route::new().error(reports).at("x", Route::new().get(forbidden));
		assert_eq!(
			call(route, "/x").await,
			(StatusCode::FORBIDDEN, "members only".to_owned())
		);
	}

	#[tokio::test]
	async fn nearest_error_handler_sees_fault() {
		let route = Route::new()
			.error(also_fails)
			.at("x", Route::new().error(reports).get(fails));
		assert_eq!(
			call(route, "/x").await,
			(StatusCode::SERVICE_UNAVAILABLE, "database on fire".to_owned())
		);
	}

	#[tokio::test]
	async fn faults_passed_to_advance_bubble() {
		let route = Route::new().error(reports).using(passes_fault).get(silent);
		assert_eq!(
			call(route, "/").await,
			(StatusCode::SERVICE_UNAVAILABLE, "rejected by middleware".to_owned())
		);
	}

	#[tokio::test]
	async fn failing_error_handler_is_shielded() {
		let route = Route::new().error(also_fails).get(fails);
		assert_eq!(
			call(route, "/").await,
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				"Internal Server Error".to_owned()
			)
		);
	}

	#[tokio::test]
	async fn silent_error_handler_is_shielded() {
		let route = Route::new().error(silent).get(fails);
		assert_eq!(call(route, "/").await.0, StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[tokio::test]
	async fn no_error_handler_is_shielded() {
		let (status, body) = call(Route::new().get(fails), "/").await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert!(!body.contains("fire"));
	}
}
