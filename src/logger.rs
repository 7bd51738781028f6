use crate::{BoxFuture, Context, ResponseStatus};
use anyhow::Result;
use std::time::Instant;

/// Middleware that logs each request once the rest of its chain has run.
///
/// ```
/// use trellis::{logger, Route};
///
/// let route = Route::new().using(logger);
/// ```
pub fn logger(ctx: &mut Context) -> BoxFuture<'_, Result<()>> {
	Box::pin(async move {
		let start = Instant::now();
		ctx.next().await;

		let elapsed = start.elapsed();
		let status = ctx.extras().get::<ResponseStatus>().map(|status| status.0);
		match status {
			Some(status) if status.is_server_error() => tracing::error!(
				method = %ctx.method(),
				path = ctx.path(),
				status = status.as_u16(),
				?elapsed,
				"request"
			),
			Some(status) if status.is_client_error() => tracing::warn!(
				method = %ctx.method(),
				path = ctx.path(),
				status = status.as_u16(),
				?elapsed,
				"request"
			),
			Some(status) => tracing::info!(
				method = %ctx.method(),
				path = ctx.path(),
				status = status.as_u16(),
				?elapsed,
				"request"
			),
			None => tracing::info!(
				method = %ctx.method(),
				path = ctx.path(),
				?elapsed,
				"request"
			),
		}

		Ok(())
	})
}
