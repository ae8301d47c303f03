use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uniformes_gateway::{
    ApiEndpoint, AuthClient, FailureKind, Gateway, MSG_ACCESS_DENIED, Navigator, RequestOptions,
    to_display_message,
};
use uniformes_login::{
    CredentialStore, FileSessionStorage, PersistedSession, Principal, SessionStorage,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth_with_storage(base_url: &str, storage: Arc<dyn SessionStorage>) -> AuthClient {
    let gateway = Gateway::builder(ApiEndpoint::new(base_url).unwrap())
        .credential_store(Arc::new(CredentialStore::new(storage)))
        .build()
        .unwrap();
    AuthClient::new(gateway)
}

/// Navigator parked on a non-login page that counts redirects.
#[derive(Default)]
struct CountingNavigator {
    redirects: AtomicUsize,
}

impl Navigator for CountingNavigator {
    fn current_location(&self) -> Option<String> {
        Some("/sales".to_string())
    }

    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

fn file_storage(dir: &tempfile::TempDir) -> Arc<FileSessionStorage> {
    Arc::new(FileSessionStorage::new(dir.path(), "admin-auth-storage"))
}

async fn mount_login(server: &MockServer, token: &str, user: Value) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": {"access_token": token, "token_type": "bearer"},
            "user": user,
        })))
        .mount(server)
        .await;
}

fn super_admin() -> Value {
    json!({"id": "u-1", "username": "root", "full_name": "Root Admin", "is_superuser": true, "school_roles": []})
}

#[tokio::test]
async fn scenario_a_super_admin_login_persists_token() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-root", super_admin()).await;
    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);

    let auth = auth_with_storage(&server.uri(), storage.clone());
    assert!(auth.login("root", "pw").await);

    let session = auth.session();
    assert!(session.is_authenticated());
    assert_eq!(session.token(), Some("tok-root"));
    assert_eq!(session.principal().unwrap().display_name, "Root Admin");

    let blob = std::fs::read_to_string(storage.path()).unwrap();
    assert!(blob.contains("tok-root"));
    let persisted = storage.load().unwrap().unwrap();
    assert!(persisted.is_authenticated);
}

#[tokio::test]
async fn scenario_b_principal_without_roles_is_rejected() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        "tok-nobody",
        json!({"id": "u-2", "username": "nobody", "is_superuser": false, "school_roles": []}),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);

    let auth = auth_with_storage(&server.uri(), storage.clone());
    assert!(!auth.login("nobody", "pw").await);

    let session = auth.session();
    assert!(!session.is_authenticated());
    assert!(session.is_cleared());
    assert!(session.last_error().unwrap().contains("permisos"));
    assert!(!storage.path().exists());
}

#[tokio::test]
async fn scenario_c_unauthorized_clears_session_but_stays_online() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-root", super_admin()).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expirado"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    let auth = auth_with_storage(&server.uri(), storage.clone());
    assert!(auth.login("root", "pw").await);
    let gateway = auth.gateway();

    let err = gateway
        .get("/sales", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Unauthorized);
    assert_eq!(
        to_display_message(&err),
        "Sesión expirada. Inicia sesión nuevamente."
    );
    assert!(auth.session().is_cleared());
    assert!(!storage.path().exists());
    assert!(gateway.connectivity().is_online());

    let again = gateway
        .get("/sales", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(again.kind(), FailureKind::Unauthorized);

    let requests = server.received_requests().await.unwrap();
    let last = requests.last().unwrap();
    assert!(last.headers.get("authorization").is_none());
}

#[tokio::test]
async fn scenario_d_connectivity_recovers_after_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let gateway = Gateway::builder(ApiEndpoint::new(&dead).unwrap())
        .build()
        .unwrap();
    let mut changes = gateway.connectivity().subscribe();

    let err = gateway
        .get("/products", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NetworkUnreachable);
    assert!(!gateway.connectivity().is_online());
    assert!(changes.has_changed().unwrap());
    assert!(!changes.borrow_and_update().is_online);

    gateway.set_base_url(&server.uri()).unwrap();
    gateway
        .get("/products", RequestOptions::default())
        .await
        .unwrap();
    assert!(gateway.connectivity().is_online());
    assert!(changes.has_changed().unwrap());
}

#[tokio::test]
async fn scenario_e_validation_detail_beats_generic_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/products"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [{"location": ["body", "price"], "message": "must be positive"}]
        })))
        .mount(&server)
        .await;

    let gateway = Gateway::builder(ApiEndpoint::new(&server.uri()).unwrap())
        .build()
        .unwrap();
    let err = gateway
        .post(
            "/products",
            &json!({"name": "Camisa", "price": -1}),
            RequestOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(to_display_message(&err), "price: must be positive");
    assert_eq!(
        err.field_errors().get("price").map(String::as_str),
        Some("must be positive")
    );
}

#[tokio::test]
async fn test_logout_then_call_sends_no_token() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-root", super_admin()).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/schools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    let auth = auth_with_storage(&server.uri(), storage.clone());
    assert!(auth.login("root", "pw").await);

    auth.logout();
    assert!(auth.session().is_cleared());
    assert!(!storage.path().exists());

    auth.gateway()
        .get("/schools", RequestOptions::default())
        .await
        .unwrap();
    let requests = server.received_requests().await.unwrap();
    assert!(requests.last().unwrap().headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_restore_session_revalidates_persisted_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer tok-saved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "full_name": "Vendedora",
            "school_roles": [{"school_id": "s-1", "role": "seller"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    let stale: Principal = serde_json::from_value(json!({"id": 3, "username": "old"})).unwrap();
    storage
        .save(&PersistedSession {
            token: Some("tok-saved".to_string()),
            principal: Some(stale),
            is_authenticated: true,
        })
        .unwrap();

    let auth = auth_with_storage(&server.uri(), storage);
    assert!(auth.restore_session().await);
    let session = auth.session();
    assert!(session.is_authenticated());
    assert_eq!(session.principal().unwrap().display_name, "Vendedora");
    assert_eq!(session.principal().unwrap().role_for("s-1"), Some("seller"));
}

#[tokio::test]
async fn test_restore_session_with_rejected_token_clears() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    storage
        .save(&PersistedSession {
            token: Some("tok-expired".to_string()),
            principal: None,
            is_authenticated: false,
        })
        .unwrap();

    let auth = auth_with_storage(&server.uri(), storage.clone());
    assert!(!auth.restore_session().await);
    assert!(auth.session().is_cleared());
    assert!(!storage.path().exists());
}

#[tokio::test]
async fn test_restore_session_with_nothing_stored() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let auth = auth_with_storage(&server.uri(), file_storage(&dir));
    assert!(!auth.restore_session().await);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_validate_session_rejects_principal_without_roles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-1",
            "username": "root",
            "is_superuser": false,
            "school_roles": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    let auth = auth_with_storage(&server.uri(), storage.clone());
    let principal: Principal = serde_json::from_value(super_admin()).unwrap();
    auth.gateway()
        .credential_store()
        .set_authenticated(SecretString::from("tok-root".to_string()), principal)
        .unwrap();

    assert!(!auth.validate_session().await);
    let session = auth.session();
    assert!(session.is_cleared());
    assert_eq!(session.last_error(), Some(MSG_ACCESS_DENIED));
    assert!(!storage.path().exists());
}

#[tokio::test]
async fn test_login_unauthorized_does_not_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Usuario o contraseña incorrectos"})),
        )
        .mount(&server)
        .await;

    let navigator = Arc::new(CountingNavigator::default());
    let gateway = Gateway::builder(ApiEndpoint::new(&server.uri()).unwrap())
        .navigator(navigator.clone())
        .build()
        .unwrap();
    let principal: Principal = serde_json::from_value(super_admin()).unwrap();
    gateway
        .credential_store()
        .set_authenticated(SecretString::from("tok-previous".to_string()), principal)
        .unwrap();
    let auth = AuthClient::new(gateway);

    assert!(!auth.login("root", "wrong").await);
    let session = auth.session();
    assert!(session.is_cleared());
    assert_eq!(session.last_error(), Some("Usuario o contraseña incorrectos"));
    assert_eq!(navigator.redirects.load(Ordering::SeqCst), 0);
}
