//! HTTP contract of the management client against a mock backend.
//!
//! Every test starts its own `MockServer`; expectations set with
//! `.expect(n)` are verified when the server is dropped.

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use url::Url;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sora_console::config::Config;
use sora_console::errors::{Action, ConsoleError, ErrorKind};
use sora_console::models::{
    AccountFilter, ApiKeyRequest, CharacterFilter, GroupBinding, GroupFilter, PageRequest, Role, SettingsPatch, Task, TaskStatus,
};
use sora_console::secrets::{RevealCache, Secret};
use sora_console::session::{AppContext, Credentials};

fn config(server: &MockServer) -> Config {
    Config::new(Url::parse(&server.uri()).unwrap())
}

fn signed_in(cfg: Config) -> AppContext {
    let ctx = AppContext::new(cfg).unwrap();
    ctx.session.begin(Credentials {
        token: Secret::new("tok_admin"),
        role: Role::Admin,
    });
    ctx
}

fn account_json(id: i64, group_id: Option<i64>, status: &str, remaining: i64) -> serde_json::Value {
    json!({
        "id": id,
        "group_id": group_id,
        "name": format!("acc{}", id),
        "email": format!("acc{}@example.com", id),
        "at_hint": "eyJh****abcd",
        "remaining_count": remaining,
        "enabled": true,
        "status": status,
    })
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_login_stores_token_and_sends_it_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/login"))
            .and(body_json(json!({"username": "admin", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-abc", "role": "admin"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/me"))
            .and(header("authorization", "Bearer jwt-abc"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "admin", "role": "admin"})))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = AppContext::new(config(&server)).unwrap();
        let role = ctx.client.auth().login("admin", "pw").await.unwrap();
        assert_eq!(role, Role::Admin);
        assert!(ctx.session.is_active());

        let me = ctx.client.auth().me().await.unwrap();
        assert_eq!(me.username, "admin");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/dashboard"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "token expired"})))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let mut changes = ctx.session.subscribe();

        let err = ctx.client.dashboard().stats().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Unauthorized));
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(!ctx.session.is_active());
        assert!(changes.has_changed().unwrap());

        // Nothing goes out without a session.
        let err = ctx.client.dashboard().stats().await.unwrap_err();
        assert!(matches!(err, ConsoleError::NoSession));
    }

    #[tokio::test]
    async fn test_viewer_hitting_admin_endpoint_is_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/login/apikey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-v", "role": "viewer"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/accounts"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "admin only"})))
            .mount(&server)
            .await;

        let ctx = AppContext::new(config(&server)).unwrap();
        let role = ctx.client.auth().login_with_api_key("sk-viewer").await.unwrap();
        assert_eq!(role, Role::Viewer);

        let err = ctx
            .client
            .accounts()
            .list(&AccountFilter::default(), PageRequest::first(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Forbidden(_)));
        assert_eq!(err.user_message(Action::Load), "admin only");
        assert!(ctx.session.is_active(), "403 keeps the session");
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_error_envelope_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/admin/groups/4"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "group name taken"})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/admin/groups/5"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let err = ctx.client.groups().delete(4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.user_message(Action::Delete), "group name taken");

        let err = ctx.client.groups().delete(5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.user_message(Action::Delete), "failed to delete");
    }

    #[tokio::test]
    async fn test_missing_record_asks_for_list_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/accounts/99/refresh"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "account not found"})))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let err = ctx.client.accounts().refresh(99).await.unwrap_err();
        assert!(err.should_refresh_list());
        assert_eq!(err.user_message(Action::Refresh), "account not found");
    }

    #[tokio::test]
    async fn test_mutations_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/accounts/1/refresh"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let err = ctx.client.accounts().refresh(1).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Server { status: 503, .. }));
    }
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn test_list_accepts_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/accounts"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([account_json(1, None, "active", 5), account_json(2, Some(1), "active", -1)])),
            )
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let page = ctx
            .client
            .accounts()
            .list(&AccountFilter::default(), PageRequest::first(20))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.list[1].group_id, Some(1));
    }

    #[tokio::test]
    async fn test_list_sends_filter_and_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/accounts"))
            .and(query_param("status", "quota_exhausted"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [account_json(11, None, "quota_exhausted", 0)],
                "total": 11, "page": 2, "page_size": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let filter = AccountFilter {
            status: Some(sora_console::models::AccountStatus::QuotaExhausted),
            ..Default::default()
        };
        let page = ctx.client.accounts().list(&filter, PageRequest::new(2, 10)).await.unwrap();
        assert_eq!(page.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_group_delete_then_accounts_show_unassigned() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/admin/groups/1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [account_json(1, None, "active", 3), account_json(2, None, "active", 7)],
                "total": 2, "page": 1, "page_size": 20
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/admin/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 2, "name": "spare", "enabled": true, "account_count": 0}
            ])))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        ctx.client.groups().delete(1).await.unwrap();
        let groups = ctx
            .client
            .groups()
            .list(&GroupFilter::default(), PageRequest::first(20))
            .await
            .unwrap();
        assert!(groups.list.iter().all(|g| g.id != 1));

        let page = ctx
            .client
            .accounts()
            .list(&AccountFilter::default(), PageRequest::first(20))
            .await
            .unwrap();
        assert!(page.list.iter().all(|a| a.group_id.is_none()));
    }

    #[tokio::test]
    async fn test_create_requires_a_token_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/accounts"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let req = sora_console::models::AccountRequest {
            name: "no tokens".into(),
            ..Default::default()
        };
        let err = ctx.client.accounts().create(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_batch_import_trims_and_reports_every_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/accounts/batch"))
            .and(body_json(json!({"tokens": ["rt_aaaaaaaaaaaa", "eyJhbGciOi.eyJ.sig"], "group_id": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2, "created": 1, "updated": 0, "failed": 1,
                "details": [
                    {"token": "rt_a****aaaa", "email": "a@example.com", "action": "created"},
                    {"token": "eyJh****.sig", "action": "failed", "error": "no email in token"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let lines = ["  rt_aaaaaaaaaaaa ", "", "eyJhbGciOi.eyJ.sig", "   "];
        let report = ctx.client.accounts().batch_import(&lines, Some(3)).await.unwrap();
        assert!(report.is_consistent_with(2));
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.details[0].email, "a@example.com");
    }

    #[tokio::test]
    async fn test_blank_import_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/accounts/batch"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let err = ctx.client.accounts().batch_import(&["", "  "], None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_reveal_is_fetched_each_time_and_hidden_on_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/accounts/7/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "eyJfull.access.token",
                "refresh_token": "rt_full_refresh"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let api = ctx.client.accounts();
        let cache = RevealCache::new();

        let first = cache.reveal(7, || api.reveal_tokens(7)).await.unwrap();
        assert_eq!(first.refresh_token.expose(), "rt_full_refresh");
        assert_eq!(cache.revealed(&7), Some(first.clone()));

        assert!(cache.hide(&7));
        assert!(!cache.is_revealed(&7));
        assert_eq!(cache.revealed(&7), None, "copying never triggers a reveal");

        let second = cache.reveal(7, || api.reveal_tokens(7)).await.unwrap();
        assert_eq!(first, second);
    }
}

mod api_keys {
    use super::*;

    #[tokio::test]
    async fn test_created_key_is_handed_out_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/api-keys"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 12, "name": "ci", "key": "sk-0123456789abcdef", "group_id": null, "enabled": true
            })))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let req = ApiKeyRequest {
            name: "ci".into(),
            ..Default::default()
        };
        let mut created = ctx.client.api_keys().create(&req).await.unwrap();
        assert_eq!(created.record.key_hint, "sk-0****cdef");
        assert_eq!(created.secret.take().unwrap().expose(), "sk-0123456789abcdef");
        assert!(created.secret.take().is_none());
        assert!(created.secret.is_consumed());
    }

    #[tokio::test]
    async fn test_required_group_policy_rejects_unbound_key_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/api-keys"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.key_group_policy = GroupBinding::Required;
        let ctx = signed_in(cfg);
        let req = ApiKeyRequest {
            name: "unbound".into(),
            ..Default::default()
        };
        let err = ctx.client.api_keys().create(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

mod content {
    use super::*;

    fn task(status: TaskStatus) -> Task {
        serde_json::from_value(json!({"id": "task_9", "type": "video", "status": status})).unwrap()
    }

    #[tokio::test]
    async fn test_content_of_unfinished_task_is_refused_locally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/tasks/task_9/content"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let err = ctx.client.tasks().content(&task(TaskStatus::InProgress)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Local);
    }

    #[tokio::test]
    async fn test_content_download_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/tasks/task_9/content"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/tasks/task_9/content"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"\x00\x00\x00\x18ftypmp42".to_vec(), "video/mp4"))
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.content_retries = 1;
        let ctx = signed_in(cfg);
        let content = ctx.client.tasks().content(&task(TaskStatus::Completed)).await.unwrap();
        assert_eq!(content.content_type(), Some("video/mp4"));

        let dir = std::env::temp_dir().join(format!("sora-console-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("task_9.mp4");
        let written = content.save(&file).await.unwrap();
        assert_eq!(written, 12);
        assert_eq!(std::fs::read(&file).unwrap().len(), 12);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_file_behind() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises 1000 bytes, sends 10, hangs up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: video/mp4\r\ncontent-length: 1000\r\n\r\n0123456789")
                .await
                .unwrap();
        });

        let mut cfg = Config::new(Url::parse(&format!("http://{}", addr)).unwrap());
        cfg.content_retries = 0;
        let ctx = signed_in(cfg);
        let content = ctx.client.tasks().content(&task(TaskStatus::Completed)).await.unwrap();

        let dir = std::env::temp_dir().join(format!("sora-console-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("task_9.mp4");
        assert_err!(content.save(&file).await);
        assert!(!file.exists());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0, "partial file left over");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_opaque_task_id_stays_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/tasks/gen%2F7%3Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "gen/7?x", "type": "image", "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let task = assert_ok!(ctx.client.tasks().get("gen/7?x").await);
        assert_eq!(task.id, "gen/7?x");
    }
}

mod characters {
    use super::*;

    #[tokio::test]
    async fn test_visibility_toggle_applies_confirmed_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/characters/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_1", "status": "ready", "is_public": false, "display_name": "Neo"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/characters/ch_1/visibility"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "visibility updated", "is_public": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let api = ctx.client.characters();
        let mut ch = api.get("ch_1").await.unwrap();
        let change = api.toggle_visibility(&mut ch).await.unwrap();
        assert!(change.is_public);
        assert!(ch.is_public);
    }

    #[tokio::test]
    async fn test_visibility_of_processing_character_is_refused_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/characters/ch_2/visibility"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/characters"))
            .and(query_param("status", "processing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{"id": "ch_2", "status": "processing"}], "total": 1, "page": 1, "page_size": 20
            })))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let api = ctx.client.characters();
        let filter = CharacterFilter {
            status: Some(sora_console::models::CharacterStatus::Processing),
            is_public: None,
        };
        let mut page = api.list(&filter, PageRequest::first(20)).await.unwrap();
        let err = api.toggle_visibility(&mut page.list[0]).await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidState(_)));
        assert!(!page.list[0].is_public);
    }
}

mod settings {
    use super::*;

    #[tokio::test]
    async fn test_partial_update_sends_only_changed_keys() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/admin/settings"))
            .and(body_json(json!({"proxy_url": "http://proxy:3128"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "proxy_url": "http://proxy:3128",
                "token_refresh_interval": "30m",
                "credit_sync_interval": "1h",
                "subscription_sync_interval": "6h"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let patch = assert_ok!(SettingsPatch::new().set("proxy_url", "http://proxy:3128"));
        let settings = ctx.client.settings().update(&patch).await.unwrap();
        assert_eq!(settings.credit_sync_interval, "1h");

        assert_err!(SettingsPatch::new().set("admin_password", "x"));
    }

    #[tokio::test]
    async fn test_proxy_probe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/proxy-test"))
            .and(body_json(json!({"proxy_url": "http://bad:1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "latency": 3001, "error": "connection refused"
            })))
            .mount(&server)
            .await;

        let ctx = signed_in(config(&server));
        let probe = ctx.client.settings().test_proxy("http://bad:1").await.unwrap();
        assert!(!probe.success);
        assert_eq!(probe.status_code, None);
        assert_eq!(probe.error, "connection refused");
    }
}
