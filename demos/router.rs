use trellis::{
	logger, serve,
	validate::{self, Schema},
	Body, BoxFuture, Context, PublicError, Request, Response, Route, Router, StatusCode,
};
use tracing_subscriber::EnvFilter;

fn index(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		ctx.respond(StatusCode::OK, "hello")?;
		Ok(())
	})
}

fn user(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		let id: u64 = ctx
			.param("id")
			.and_then(|id| id.parse().ok())
			.ok_or_else(|| PublicError::bad_request("user ids are numeric"))?;
		ctx.respond(StatusCode::OK, format!("user {}", id))?;
		Ok(())
	})
}

fn rename(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		let payload: serde_json::Value = ctx.json().await?;
		let renamed = Schema::new()
			.guard("name", validate::string())
			.optional("reason")
			.check(&payload)?;
		ctx.respond_json(StatusCode::OK, &renamed)?;
		Ok(())
	})
}

fn forget(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		ctx.no_content()?;
		Ok(())
	})
}

fn require_token(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		if ctx.headers().contains_key("x-token") {
			ctx.next().await;
			Ok(())
		} else {
			Err(PublicError::unauthorized("missing token").into())
		}
	})
}

fn admin_error(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		ctx.respond(StatusCode::SERVICE_UNAVAILABLE, "admin is unavailable")?;
		Ok(())
	})
}

fn broken(_ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async { Err(anyhow::anyhow!("admin backend unreachable")) })
}

fn legacy(ctx: &mut Context) -> BoxFuture<'_, anyhow::Result<()>> {
	Box::pin(async move {
		ctx.redirect("/")?;
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	let route = Route::new()
		.using(logger)
		.get(index)
		.at("old", Route::new().fallback(legacy))
		.at(
			"users",
			Route::new().param("id", Route::new().get(user).post(rename).delete(forget)),
		)
		.at(
			"admin",
			Route::new()
				.using(require_token)
				.error(admin_error)
				.get(broken),
		);

	let router = Router::builder(route)
		.prehandler(health)
		.deadline(std::time::Duration::from_secs(10))
		.build()?;

	serve(([127, 0, 0, 1], 3000).into(), router).await?;
	Ok(())
}
