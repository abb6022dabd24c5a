use super::*;
use crate::test_support::{sample_donations, sample_login_result};
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::error::ErrorCode;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server(app: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

async fn handle_login(Json(body): Json<LoginRequest>) -> axum::response::Response {
    if body.email == "test@test.com" && body.password == "qwertyuiop" {
        let result = sample_login_result();
        Json(LoginResponse {
            token: result.token,
            user: result.user,
        })
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new(ErrorCode::Unauthorized, "bad credentials")),
        )
            .into_response()
    }
}

async fn handle_donations(headers: HeaderMap) -> axum::response::Response {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer token");
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(DonationListResponse {
        donations: sample_donations(),
    })
    .into_response()
}

fn api() -> Router {
    Router::new()
        .route("/login", post(handle_login))
        .route("/donations", get(handle_donations))
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials::new(email, password)
}

#[tokio::test]
async fn login_posts_credentials_and_decodes_session() {
    let server_url = spawn_server(api()).await.expect("server");
    let gateway = HttpGateway::new(format!("{server_url}/"));

    let result = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect("login");
    assert_eq!(result, sample_login_result());
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let server_url = spawn_server(api()).await.expect("server");
    let gateway = HttpGateway::new(server_url);

    let err = gateway
        .login(&credentials("test@test.com", "wrongpassword"))
        .await
        .expect_err("should fail");
    assert_eq!(err, GatewayError::Unauthorized);
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn server_error_body_becomes_rejected_with_message() {
    let app = Router::new().route(
        "/login",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::Internal, "database offline")),
            )
        }),
    );
    let server_url = spawn_server(app).await.expect("server");
    let gateway = HttpGateway::new(server_url);

    let err = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect_err("should fail");
    assert_eq!(
        err,
        GatewayError::Rejected {
            status: 500,
            message: "database offline".to_string()
        }
    );
}

#[tokio::test]
async fn plain_text_error_body_is_kept_as_message() {
    let app = Router::new().route(
        "/login",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let server_url = spawn_server(app).await.expect("server");
    let gateway = HttpGateway::new(server_url);

    let err = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect_err("should fail");
    assert_eq!(
        err,
        GatewayError::Rejected {
            status: 502,
            message: "upstream down".to_string()
        }
    );
}

#[tokio::test]
async fn undecodable_success_body_is_malformed() {
    let app = Router::new().route("/login", post(|| async { "not json" }));
    let server_url = spawn_server(app).await.expect("server");
    let gateway = HttpGateway::new(server_url);

    let err = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn empty_token_is_malformed() {
    let app = Router::new().route(
        "/login",
        post(|| async {
            Json(LoginResponse {
                token: String::new(),
                user: sample_login_result().user,
            })
        }),
    );
    let server_url = spawn_server(app).await.expect("server");
    let gateway = HttpGateway::new(server_url);

    let err = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let gateway = HttpGateway::new(format!("http://{addr}"));

    let err = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn slow_server_hits_request_timeout() {
    let app = Router::new().route(
        "/login",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let server_url = spawn_server(app).await.expect("server");
    let settings = ClientSettings {
        server_url,
        request_timeout_secs: 1,
        ..ClientSettings::default()
    };
    let gateway = HttpGateway::from_settings(&settings).expect("gateway");

    let err = gateway
        .login(&credentials("test@test.com", "qwertyuiop"))
        .await
        .expect_err("should fail");
    assert_eq!(err, GatewayError::Timeout);
}

#[tokio::test]
async fn donations_are_fetched_with_bearer_token() {
    let server_url = spawn_server(api()).await.expect("server");
    let gateway = HttpGateway::new(server_url);

    let donations = gateway.list_donations("token").await.expect("donations");
    assert_eq!(donations, sample_donations());

    let err = gateway
        .list_donations("expired")
        .await
        .expect_err("should fail");
    assert_eq!(err, GatewayError::Unauthorized);
}

#[tokio::test]
async fn session_controller_drives_http_login_end_to_end() {
    let server_url = spawn_server(api()).await.expect("server");
    let controller = crate::SessionController::new(std::sync::Arc::new(HttpGateway::new(
        server_url,
    )));
    let mut stream = controller.subscribe();

    assert!(controller
        .submit("test@test.com", "qwertyuiop")
        .expect("submit")
        .is_accepted());

    let mut last = None;
    while let Some(event) = crate::test_support::next_event(&mut stream).await {
        let terminal = event.is_terminal();
        last = Some(event);
        if terminal {
            break;
        }
    }
    assert_eq!(
        last,
        Some(crate::LifecycleEvent::Done(sample_login_result()))
    );
}
