mod common;

use common::*;
use sli_load_core::contract::{Accept, HttpMethod, HttpResponse, MockHttpTransport};
use sli_load_core::session::SessionContext;
use sli_load_core::SliError;

#[tokio::test]
async fn login_stores_both_tokens_and_credentials() {
    let mut http = MockHttpTransport::new();
    http.expect_send()
        .withf(|req| {
            req.path == "/gdc/account/login"
                && req.accept == Accept::Json
                && req.cookies.is_empty()
                && req.body.as_ref().and_then(|b| b.pointer("/postUserLogin/login"))
                    == Some(&serde_json::json!(USERNAME))
        })
        .times(1)
        .returning(|_| Ok(with_cookies(&["GDCAuthSST=sst-1; path=/gdc/account; HttpOnly"])));
    http.expect_send()
        .withf(|req| {
            req.path == "/gdc/account/token"
                && req.accept == Accept::JsonOrZip
                && req.cookies == vec!["GDCAuthSST=sst-1".to_string()]
        })
        .times(1)
        .returning(|_| Ok(with_cookies(&["GDCAuthTT=tt-1; path=/gdc"])));

    let mut ctx = SessionContext::new(http);
    let auth = ctx.login(USERNAME, SECRET).await.expect("login should succeed");

    assert_eq!(auth, "sst-1");
    assert_eq!(ctx.auth_token(), "sst-1");
    assert_eq!(ctx.security_token(), "tt-1");
    let credentials = ctx.credentials().expect("credentials stored after login");
    assert_eq!(credentials.username, USERNAME);
    assert_eq!(credentials.secret, SECRET);
    assert!(!format!("{credentials:?}").contains(SECRET));
}

#[tokio::test]
async fn login_without_auth_cookie_fails_and_leaves_no_state() {
    let mut http = MockHttpTransport::new();
    expect_path(
        &mut http,
        HttpMethod::Post,
        "/gdc/account/login",
        HttpResponse {
            status: 401,
            set_cookies: vec![],
            body: b"{}".to_vec(),
        },
    );
    http.expect_send()
        .withf(|req| req.path == "/gdc/account/token")
        .never();

    let mut ctx = SessionContext::new(http);
    let err = ctx.login(USERNAME, "wrong").await.unwrap_err();

    assert!(matches!(err, SliError::Authentication { .. }), "got {err:?}");
    assert!(ctx.auth_token().is_empty());
    assert!(ctx.security_token().is_empty());
    assert!(ctx.credentials().is_none());
    assert!(ctx.cookies().is_empty());
}

#[tokio::test]
async fn login_without_security_token_clears_auth() {
    let mut http = MockHttpTransport::new();
    expect_path(
        &mut http,
        HttpMethod::Post,
        "/gdc/account/login",
        with_cookies(&["GDCAuthSST=sst-1; path=/gdc/account"]),
    );
    expect_path(
        &mut http,
        HttpMethod::Get,
        "/gdc/account/token",
        with_cookies(&["unrelated=1"]),
    );

    let mut ctx = SessionContext::new(http);
    let err = ctx.login(USERNAME, SECRET).await.unwrap_err();

    assert!(matches!(err, SliError::Token { .. }), "got {err:?}");
    assert!(ctx.auth_token().is_empty());
    assert!(ctx.security_token().is_empty());
    assert!(ctx.credentials().is_none());
}

#[tokio::test]
async fn refresh_token_without_auth_token_does_not_call_the_server() {
    let mut http = MockHttpTransport::new();
    http.expect_send().never();

    let mut ctx = SessionContext::new(http);
    let err = ctx.refresh_token(None).await.unwrap_err();
    assert!(matches!(err, SliError::Token { .. }), "got {err:?}");
}

#[tokio::test]
async fn refresh_token_adopts_seed() {
    let mut http = MockHttpTransport::new();
    http.expect_send()
        .withf(|req| req.path == "/gdc/account/token" && req.cookies == vec!["GDCAuthSST=seeded".to_string()])
        .times(1)
        .returning(|_| Ok(with_cookies(&["GDCAuthTT=tt-2; path=/gdc"])));

    let mut ctx = SessionContext::new(http);
    let token = ctx.refresh_token(Some("seeded")).await.unwrap();

    assert_eq!(token, "tt-2");
    assert_eq!(ctx.auth_token(), "seeded");
}

#[tokio::test]
async fn requests_carry_one_cookie_entry_per_token() {
    let mut http = MockHttpTransport::new();
    expect_login(&mut http);
    http.expect_send()
        .withf(|req| {
            req.path == "/gdc/md"
                && req.cookies
                    == vec!["GDCAuthSST=sst-1".to_string(), "GDCAuthTT=tt-1".to_string()]
        })
        .times(1)
        .returning(|_| Ok(ok_json(serde_json::json!({ "about": { "links": [] } }))));

    let ctx = logged_in(http).await;
    ctx.get("/gdc/md").await.unwrap();
}

#[tokio::test]
async fn project_placeholder_requires_working_project() {
    let mut http = MockHttpTransport::new();
    http.expect_send().never();

    let ctx = SessionContext::new(http);
    let err = ctx.get("/gdc/md/<project>/data/sets").await.unwrap_err();
    assert!(matches!(err, SliError::Precondition { .. }), "got {err:?}");
    assert_eq!(
        ctx.bind_path("/gdc/account/token").unwrap(),
        "/gdc/account/token"
    );
}

#[tokio::test]
async fn error_status_is_a_transport_error() {
    let mut http = MockHttpTransport::new();
    expect_login(&mut http);
    expect_path(
        &mut http,
        HttpMethod::Get,
        "/gdc/md/p1/data/sets",
        HttpResponse {
            status: 500,
            set_cookies: vec![],
            body: b"boom".to_vec(),
        },
    );

    let ctx = logged_in(http).await;
    assert_eq!(ctx.bind_path("/gdc/md/<project>/data/sets").unwrap(), "/gdc/md/p1/data/sets");
    let err = ctx.get("/gdc/md/<project>/data/sets").await.unwrap_err();
    assert!(matches!(err, SliError::Transport { .. }), "got {err:?}");
}

fn expect_login_as(http: &mut MockHttpTransport, username: &'static str, response: HttpResponse) {
    http.expect_send()
        .withf(move |req| {
            req.path == "/gdc/account/login"
                && req.body.as_ref().and_then(|b| b.pointer("/postUserLogin/login"))
                    == Some(&serde_json::json!(username))
        })
        .times(1)
        .returning(move |_| Ok(response.clone()));
}

#[tokio::test]
async fn failed_relogin_drops_previous_credentials() {
    let mut http = MockHttpTransport::new();
    expect_login_as(
        &mut http,
        "alice",
        with_cookies(&["GDCAuthSST=sst-alice; path=/gdc/account"]),
    );
    expect_login_as(&mut http, "bob", with_cookies(&[]));
    http.expect_send()
        .withf(|req| req.path == "/gdc/account/token")
        .times(1)
        .returning(|_| Ok(with_cookies(&["GDCAuthTT=tt-alice; path=/gdc"])));

    let mut ctx = SessionContext::new(http);
    ctx.login("alice", "alice-secret").await.unwrap();
    assert_eq!(ctx.credentials().unwrap().username, "alice");

    let err = ctx.login("bob", "bob-secret").await.unwrap_err();

    assert!(matches!(err, SliError::Authentication { .. }), "got {err:?}");
    assert!(ctx.credentials().is_none());
    assert!(ctx.auth_token().is_empty());
    assert!(ctx.security_token().is_empty());
}

#[tokio::test]
async fn relogin_failing_at_token_step_drops_previous_credentials() {
    let mut http = MockHttpTransport::new();
    expect_login_as(
        &mut http,
        "alice",
        with_cookies(&["GDCAuthSST=sst-alice; path=/gdc/account"]),
    );
    expect_login_as(
        &mut http,
        "bob",
        with_cookies(&["GDCAuthSST=sst-bob; path=/gdc/account"]),
    );
    http.expect_send()
        .withf(|req| req.path == "/gdc/account/token" && req.cookies == vec!["GDCAuthSST=sst-alice".to_string()])
        .times(1)
        .returning(|_| Ok(with_cookies(&["GDCAuthTT=tt-alice; path=/gdc"])));
    http.expect_send()
        .withf(|req| req.path == "/gdc/account/token" && req.cookies == vec!["GDCAuthSST=sst-bob".to_string()])
        .times(1)
        .returning(|_| Ok(with_cookies(&[])));

    let mut ctx = SessionContext::new(http);
    ctx.login("alice", "alice-secret").await.unwrap();

    let err = ctx.login("bob", "bob-secret").await.unwrap_err();

    assert!(matches!(err, SliError::Token { .. }), "got {err:?}");
    assert!(ctx.credentials().is_none());
    assert!(ctx.auth_token().is_empty());
    assert!(ctx.cookies().is_empty());
}
