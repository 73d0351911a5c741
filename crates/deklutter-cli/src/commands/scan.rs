//! One-shot scan and cleanup commands.

use anyhow::anyhow;
use deklutter_api_models::ScanResult;
use deklutter_session::{CleanupOutcome, WorkflowController, WorkflowState};

use crate::cli::{CleanArgs, OutputFormat, ScanArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_cleanup, render_scan};
use crate::prompt::TerminalPrompt;

pub(crate) async fn handle_scan(ctx: &AppContext, args: ScanArgs) -> CliResult<()> {
    let mut controller = ctx.controller(TerminalPrompt::new(false))?;
    let result = run_scan(&mut controller, args).await?;
    render_scan(result, args.days, ctx.output)
}

pub(crate) async fn handle_clean(ctx: &AppContext, args: CleanArgs) -> CliResult<()> {
    let mut controller = ctx.controller(TerminalPrompt::new(args.yes))?;
    let result = run_scan(&mut controller, args.scan).await?;
    if ctx.output == OutputFormat::Table {
        render_scan(result, args.scan.days, ctx.output)?;
    }

    let outcome = controller
        .confirm_cleanup()
        .await
        .map_err(CliError::workflow)?;
    render_cleanup(&outcome, ctx.output)?;
    match outcome {
        CleanupOutcome::Failed { message } => Err(CliError::failure(anyhow!(message))),
        _ => Ok(()),
    }
}

/// Drive one scan and hand back the triage, or the message that replaced it.
pub(crate) async fn run_scan(
    controller: &mut WorkflowController,
    args: ScanArgs,
) -> CliResult<&ScanResult> {
    let request = args.request()?;
    controller
        .request_scan(request)
        .await
        .map_err(CliError::workflow)?;
    match controller.state() {
        WorkflowState::Reviewing { result, .. } => Ok(result),
        WorkflowState::Error { message, .. } => Err(CliError::failure(anyhow!(message.clone()))),
        other => Err(CliError::failure(anyhow!(
            "scan finished in unexpected state {}",
            other.phase()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use deklutter_api_models::LookbackWindow;
    use deklutter_session::{MemoryTokenStore, SessionToken, TokenStore};
    use deklutter_test_support::fixtures::{error_payload, message_ids, scan_payload};
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    fn signed_in_context(server: &MockServer) -> (AppContext, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::with_token(
            SessionToken::new("abc123").expect("token"),
        ));
        let ctx = AppContext {
            client: Client::new(),
            base_url: server.base_url().parse().expect("valid URL"),
            store: store.clone(),
            output: OutputFormat::Table,
        };
        (ctx, store)
    }

    fn month() -> ScanArgs {
        ScanArgs {
            days: LookbackWindow::Month,
            limit: 100,
        }
    }

    fn confirmed(scan: ScanArgs) -> CleanArgs {
        CleanArgs { scan, yes: true }
    }

    #[tokio::test]
    async fn scan_renders_triage() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/gmail/scan")
                .header("authorization", "Bearer abc123")
                .json_body(json!({"days_back": 90, "limit": 250}));
            then.status(200).json_body(scan_payload(12, 3, 85));
        });

        let (ctx, _) = signed_in_context(&server);
        let args = ScanArgs {
            days: LookbackWindow::Quarter,
            limit: 250,
        };
        handle_scan(&ctx, args).await.expect("scan succeeds");
        mock.assert();
    }

    #[tokio::test]
    async fn scan_failure_keeps_session() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/gmail/scan");
            then.status(401).json_body(json!({"message": "token expired"}));
        });

        let (ctx, store) = signed_in_context(&server);
        let err = handle_scan(&ctx, month()).await.expect_err("scan fails");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "token expired");
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn scan_without_session_points_at_login() {
        let server = MockServer::start_async().await;
        let (ctx, store) = signed_in_context(&server);
        store.clear();
        let err = handle_scan(&ctx, month()).await.expect_err("no token");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("deklutter login"));
    }

    #[tokio::test]
    async fn clean_trashes_the_delete_set() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/gmail/scan");
            then.status(200).json_body(scan_payload(3, 1, 4));
        });
        let apply = server.mock(|when, then| {
            when.method(POST)
                .path("/gmail/apply")
                .json_body(json!({"message_ids": message_ids(3), "mode": "trash"}));
            then.status(200).json_body(json!({"deleted": 3, "labeled": 0}));
        });

        let (ctx, _) = signed_in_context(&server);
        handle_clean(&ctx, confirmed(month())).await.expect("clean succeeds");
        apply.assert();
    }

    #[tokio::test]
    async fn clean_with_nothing_to_delete_skips_apply() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/gmail/scan");
            then.status(200).json_body(scan_payload(0, 2, 9));
        });
        let apply = server.mock(|when, then| {
            when.method(POST).path("/gmail/apply");
            then.status(200);
        });

        let (ctx, _) = signed_in_context(&server);
        handle_clean(&ctx, confirmed(month())).await.expect("no-op succeeds");
        apply.assert_hits(0);
    }

    #[tokio::test]
    async fn clean_failure_reports_service_message() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/gmail/scan");
            then.status(200).json_body(scan_payload(2, 0, 0));
        });
        server.mock(|when, then| {
            when.method(POST).path("/gmail/apply");
            then.status(503).json_body(error_payload("quota exceeded"));
        });

        let (ctx, store) = signed_in_context(&server);
        let err = handle_clean(&ctx, confirmed(month()))
            .await
            .expect_err("apply fails");
        assert_eq!(err.display_message(), "quota exceeded");
        assert!(store.load().is_some());
    }
}
