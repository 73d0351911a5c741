use std::sync::{Arc, Mutex};

use deklutter_api_models::{LookbackWindow, ScanRequest};
use deklutter_session::{
    CleanupOutcome, ConfirmationPort, FileTokenStore, HttpMailboxClient, NotificationPort, Phase,
    Route, SessionToken, TokenStore, WorkflowController, WorkflowDeps, WorkflowState,
    capture_redirect,
};
use deklutter_test_support::fixtures::{message_ids, scan_payload};
use httpmock::prelude::*;
use reqwest::Client;
use serde_json::json;
use url::Url;

#[derive(Default)]
struct RecordingPrompt {
    asked: Mutex<Vec<String>>,
    informed: Mutex<Vec<String>>,
}

impl ConfirmationPort for RecordingPrompt {
    fn ask(&self, message: &str) -> bool {
        self.asked.lock().expect("lock").push(message.to_string());
        true
    }
}

impl NotificationPort for RecordingPrompt {
    fn inform(&self, message: &str) {
        self.informed.lock().expect("lock").push(message.to_string());
    }
}

fn deps(
    server: &MockServer,
    store: Arc<dyn TokenStore>,
    prompt: Arc<RecordingPrompt>,
) -> WorkflowDeps {
    let base: Url = server.base_url().parse().expect("valid URL");
    let api = HttpMailboxClient::new(Client::new(), &base).expect("endpoints resolve");
    WorkflowDeps {
        store,
        api: Arc::new(api),
        confirm: prompt.clone(),
        notify: prompt,
    }
}

#[tokio::test]
async fn redirect_scan_and_cleanup_round_trip() {
    let server = MockServer::start_async().await;
    let scan = server.mock(|when, then| {
        when.method(POST)
            .path("/gmail/scan")
            .header("authorization", "Bearer abc123")
            .json_body(json!({"days_back": 30, "limit": 100}));
        then.status(200).json_body(scan_payload(12, 3, 85));
    });
    let apply = server.mock(|when, then| {
        when.method(POST)
            .path("/gmail/apply")
            .header("authorization", "Bearer abc123")
            .json_body(json!({"message_ids": message_ids(12), "mode": "trash"}));
        then.status(200).json_body(json!({"deleted": 12, "labeled": 0}));
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_dir(dir.path()));
    let redirect = Url::parse("http://localhost:3000/callback?token=abc123").expect("url");
    assert_eq!(capture_redirect(&redirect, store.as_ref()), Route::Dashboard);

    let prompt = Arc::new(RecordingPrompt::default());
    let (mut controller, route) =
        WorkflowController::boot(deps(&server, store.clone(), prompt.clone()));
    assert_eq!(route, Route::Dashboard);

    let request = ScanRequest::new(LookbackWindow::Month, 100).expect("request");
    let phase = controller.request_scan(request).await.expect("scan allowed");
    assert_eq!(phase, Phase::Reviewing);
    let counts = controller.state().result().expect("triage").summary.counts;
    assert_eq!(counts.delete, 12);

    let outcome = controller.confirm_cleanup().await.expect("cleanup allowed");
    assert!(matches!(outcome, CleanupOutcome::Applied { count: 12, .. }));
    assert_eq!(
        controller.state(),
        &WorkflowState::Idle {
            token: SessionToken::new("abc123").expect("token")
        }
    );
    scan.assert();
    apply.assert();
    assert_eq!(
        prompt.asked.lock().expect("lock").as_slice(),
        ["Move 12 messages to trash? You can recover them for 30 days."]
    );

    assert_eq!(controller.logout(), Ok(Route::Landing));
    assert!(store.load().is_none());
}

#[tokio::test]
async fn expired_token_surfaces_message_without_signing_out() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/gmail/scan");
        then.status(401).json_body(json!({"message": "token expired"}));
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_dir(dir.path()));
    store.save(&SessionToken::new("abc123").expect("token"));

    let prompt = Arc::new(RecordingPrompt::default());
    let (mut controller, _) = WorkflowController::boot(deps(&server, store.clone(), prompt));
    controller
        .request_scan(ScanRequest::default())
        .await
        .expect("scan allowed");

    assert_eq!(controller.phase(), Phase::Error);
    assert_eq!(controller.state().error_message(), Some("token expired"));
    assert_eq!(controller.route(), Route::Dashboard);
    assert!(store.load().is_some());
}

#[tokio::test]
async fn empty_delete_set_never_reaches_apply_endpoint() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/gmail/scan");
        then.status(200).json_body(scan_payload(0, 4, 20));
    });
    let apply = server.mock(|when, then| {
        when.method(POST).path("/gmail/apply");
        then.status(200);
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_dir(dir.path()));
    store.save(&SessionToken::new("abc123").expect("token"));

    let prompt = Arc::new(RecordingPrompt::default());
    let (mut controller, _) = WorkflowController::boot(deps(&server, store, prompt.clone()));
    controller
        .request_scan(ScanRequest::default())
        .await
        .expect("scan allowed");

    let outcome = controller.confirm_cleanup().await.expect("cleanup allowed");
    assert_eq!(outcome, CleanupOutcome::NothingToDelete);
    apply.assert_hits(0);
    assert_eq!(
        prompt.informed.lock().expect("lock").as_slice(),
        ["No messages to delete."]
    );
}
