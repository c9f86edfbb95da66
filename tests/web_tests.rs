use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use nettbank::config::Config;
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A pooled in-memory SQLite is one database per connection; keep one.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.server.secure_cookies = false;

    let state = nettbank::web::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    nettbank::web::router(state).await
}

fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: String, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn session_cookie(response: &Response<axum::body::Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

fn location(response: &Response<axum::body::Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn body_string(response: Response<axum::body::Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn registration(username: &str, phone: &str) -> String {
    form_body(&[
        ("username", username),
        ("email", &format!("{username}@example.no")),
        ("password", "Secr3t!"),
        ("phone", phone),
        ("address", "Storgata 1"),
    ])
}

async fn register(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_form("/register", registration(username, "12345678"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    session_cookie(&response).expect("registration should start a session for the flash")
}

#[tokio::test]
async fn test_landing_page() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Velkommen til Nettbank"));
}

#[tokio::test]
async fn test_register_login_account_flow() {
    let app = spawn_app().await;

    let cookie = register(&app, "alice").await;

    // The success flash shows once on the login page, then is gone.
    let response = app
        .clone()
        .oneshot(get("/login", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Brukeren din har blitt registert"));

    let response = app
        .clone()
        .oneshot(get("/login", Some(&cookie)))
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(!body.contains("Brukeren din har blitt registert"));

    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "alice"), ("password", "Secr3t!")]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // Phone was stored in national format.
    let response = app
        .clone()
        .oneshot(get("/account", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("alice"));
    assert!(body.contains("12 34 56 78"));

    // Default accounts were created on registration, all empty.
    let response = app
        .clone()
        .oneshot(get("/myaccs", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    for name in ["Brukskonto", "Sparekonto", "BSU"] {
        assert!(body.contains(name), "missing default account {name}");
    }
    assert!(body.contains("0,00 kr"));
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = spawn_app().await;

    let cookie = register(&app, "bob").await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "bob"), ("password", "wrong")]),
            Some(&cookie),
        ))
        .await
        .unwrap();

    // Re-rendered form with a flash, not a redirect.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Feil brukernavn eller passord"));

    // No session was created.
    let response = app
        .clone()
        .oneshot(get("/account", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login"));
}

#[tokio::test]
async fn test_unknown_username_gets_the_same_message() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "nobody"), ("password", "whatever")]),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Feil brukernavn eller passord"));
}

#[tokio::test]
async fn test_gated_routes_redirect_to_login() {
    let app = spawn_app().await;

    for (path, expected) in [
        ("/account", "/login?next=%2Faccount"),
        ("/myaccs", "/login?next=%2Fmyaccs"),
        ("/editprofile", "/login?next=%2Feditprofile"),
    ] {
        let response = app.clone().oneshot(get(path, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "for {path}");
        assert_eq!(location(&response), expected, "for {path}");
    }
}

#[tokio::test]
async fn test_invalid_registration_rerenders_with_field_errors() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_form("/register", form_body(&[("username", "x")]), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Brukernavnet må ha mellom 3 og 32 tegn"));
    assert!(body.contains("Må fylles ut"));
}

#[tokio::test]
async fn test_unparseable_phone_renders_the_error_page() {
    let app = spawn_app().await;

    // Passes field validation (non-empty) but fails normalization.
    let response = app
        .oneshot(post_form("/register", registration("gina", "12x45678"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("Noe gikk galt"));
}

#[tokio::test]
async fn test_fourth_login_attempt_is_rejected_even_with_valid_credentials() {
    let app = spawn_app().await;

    let cookie = register(&app, "rita").await;

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_form(
                "/login",
                form_body(&[("username", "rita"), ("password", "wrong")]),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Fourth attempt inside the window: redirected home, credentials unseen.
    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "rita"), ("password", "Secr3t!")]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // The landing page shows the rate-limit flash, and no session exists.
    let response = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
    let body = body_string(response).await;
    assert!(body.contains("for mange usuksessfulle login forsøk"));

    let response = app
        .clone()
        .oneshot(get("/account", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login"));
}

#[tokio::test]
async fn test_eleventh_registration_is_rejected() {
    let app = spawn_app().await;

    // Invalid forms still count against the quota.
    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(post_form("/register", String::new(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_form("/register", registration("dave", "12345678"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_redirects_to_next_param() {
    let app = spawn_app().await;

    let cookie = register(&app, "nina").await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/login?next=%2Fmyaccs",
            form_body(&[("username", "nina"), ("password", "Secr3t!")]),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/myaccs");
}

#[tokio::test]
async fn test_editprofile_leaves_the_original_row_untouched() {
    let app = spawn_app().await;

    let cookie = register(&app, "carol").await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "carol"), ("password", "Secr3t!")]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .clone()
        .oneshot(post_form(
            "/editprofile",
            form_body(&[
                ("email", "new@example.no"),
                ("phone", "91234567"),
                ("address", "Nygata 2"),
            ]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/account");

    // The edit wrote a fresh row; carol's own row still shows the old data.
    let response = app
        .clone()
        .oneshot(get("/account", Some(&cookie)))
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(body.contains("Dine personlige opplysninger har blitt oppdatert"));
    assert!(body.contains("carol@example.no"));
    assert!(!body.contains("new@example.no"));

    // Login for carol is unaffected by the extra row.
    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "carol"), ("password", "Secr3t!")]),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_clears_the_session() {
    let app = spawn_app().await;

    let cookie = register(&app, "erik").await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "erik"), ("password", "Secr3t!")]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .clone()
        .oneshot(get("/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app
        .clone()
        .oneshot(get("/account", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login"));
}

#[tokio::test]
async fn test_login_page_redirects_when_already_authenticated() {
    let app = spawn_app().await;

    let cookie = register(&app, "frida").await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/login",
            form_body(&[("username", "frida"), ("password", "Secr3t!")]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    for path in ["/login", "/register"] {
        let response = app.clone().oneshot(get(path, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "for {path}");
        assert_eq!(location(&response), "/", "for {path}");
    }
}
