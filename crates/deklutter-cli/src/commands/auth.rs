//! Sign-in, redirect capture, status, and sign-out.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::Html;
use axum::routing::get;
use deklutter_session::{MailboxApi, Route, TokenStore, capture_redirect};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use crate::cli::{CaptureArgs, LoginArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_status;
use crate::prompt::TerminalPrompt;

const SIGNED_IN_PAGE: &str = "<!doctype html><html><body><h1>Signed in to Deklutter</h1>\
<p>You can close this tab and return to the terminal.</p></body></html>";
const NO_TOKEN_PAGE: &str = "<!doctype html><html><body><h1>Authorization incomplete</h1>\
<p>The redirect did not include a session token. Run <code>deklutter login</code> again.</p>\
</body></html>";
const ALREADY_HANDLED_PAGE: &str = "<!doctype html><html><body><h1>Already handled</h1>\
<p>This login has already completed.</p></body></html>";

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    if !args.callback_path.starts_with('/') {
        return Err(CliError::validation("callback path must start with '/'"));
    }
    if !args.listen.ip().is_loopback() {
        return Err(CliError::validation(
            "redirect listener must bind to a loopback address",
        ));
    }

    let start = ctx
        .mailbox()?
        .init_authorization(&args.source)
        .await
        .map_err(|err| CliError::service(&err))?;

    println!("Open this URL in a browser to authorize Deklutter:");
    println!("{}", start.auth_url);

    if args.no_wait {
        println!("After approving, run `deklutter capture <redirect URL>`.");
        return Ok(());
    }

    let listener = TcpListener::bind(args.listen).await.map_err(|err| {
        CliError::failure(anyhow!(
            "failed to bind redirect listener on {}: {err}",
            args.listen
        ))
    })?;
    eprintln!(
        "Waiting for the authorization redirect on http://{}{} ...",
        args.listen, args.callback_path
    );

    let route = serve_callback(listener, &args.callback_path, Arc::clone(&ctx.store)).await?;
    finish_capture(route)
}

pub(crate) fn handle_capture(ctx: &AppContext, args: &CaptureArgs) -> CliResult<()> {
    finish_capture(capture_redirect(&args.url, ctx.store.as_ref()))
}

pub(crate) fn handle_status(ctx: &AppContext, token_path: &Path) -> CliResult<()> {
    render_status(ctx.store.load().is_some(), token_path, ctx.output)
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    match ctx.controller(TerminalPrompt::new(false)) {
        Ok(mut controller) => {
            controller.logout().map_err(CliError::workflow)?;
            println!("Signed out.");
        }
        Err(CliError::Validation(_)) => println!("Not signed in."),
        Err(err) => return Err(err),
    }
    Ok(())
}

fn finish_capture(route: Route) -> CliResult<()> {
    match route {
        Route::Dashboard => {
            println!("Signed in.");
            Ok(())
        }
        Route::Landing => Err(CliError::validation(
            "authorization redirect carried no token; run `deklutter login` again",
        )),
    }
}

#[derive(Clone)]
struct CallbackState {
    origin: Url,
    store: Arc<dyn TokenStore>,
    captured: Arc<Mutex<Option<oneshot::Sender<Route>>>>,
}

/// Answer the first request on `callback_path`, capture its token, then stop.
pub(crate) async fn serve_callback(
    listener: TcpListener,
    callback_path: &str,
    store: Arc<dyn TokenStore>,
) -> CliResult<Route> {
    let addr = listener
        .local_addr()
        .map_err(|err| CliError::failure(anyhow!("redirect listener has no address: {err}")))?;
    let origin = Url::parse(&format!("http://{addr}"))
        .map_err(|err| CliError::failure(anyhow!("invalid listener address {addr}: {err}")))?;

    let (route_tx, route_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let state = CallbackState {
        origin,
        store,
        captured: Arc::new(Mutex::new(Some(route_tx))),
    };
    let router = Router::new()
        .route(callback_path, get(receive_redirect))
        .with_state(state);

    let server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                stop_rx.await.ok();
            })
            .await
    });

    let route = route_rx.await.map_err(|_| {
        CliError::failure(anyhow!("redirect listener stopped before a redirect arrived"))
    });
    stop_tx.send(()).ok();
    server
        .await
        .map_err(|err| CliError::failure(anyhow!("redirect listener task failed: {err}")))?
        .map_err(|err| CliError::failure(anyhow!("redirect listener failed: {err}")))?;
    route
}

async fn receive_redirect(
    State(state): State<CallbackState>,
    uri: Uri,
) -> (StatusCode, Html<&'static str>) {
    let Some(sender) = state.captured.lock().ok().and_then(|mut slot| slot.take()) else {
        return (StatusCode::GONE, Html(ALREADY_HANDLED_PAGE));
    };

    let route = match state.origin.join(&uri.to_string()) {
        Ok(location) => capture_redirect(&location, state.store.as_ref()),
        Err(err) => {
            tracing::warn!(error = %err, "redirect URI could not be parsed");
            Route::Landing
        }
    };
    sender.send(route).ok();

    match route {
        Route::Dashboard => (StatusCode::OK, Html(SIGNED_IN_PAGE)),
        Route::Landing => (StatusCode::BAD_REQUEST, Html(NO_TOKEN_PAGE)),
    }
}
