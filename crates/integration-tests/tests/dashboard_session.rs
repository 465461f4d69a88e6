//! Integration tests for signed-in pages.
//!
//! These tests require:
//! - The dashboard running at `DASHBOARD_BASE_URL` with Firebase enabled
//! - `TEST_USER_EMAIL`/`TEST_USER_PASSWORD` for a non-admin account
//! - `TEST_ADMIN_EMAIL`/`TEST_ADMIN_PASSWORD` for an admin account

use bluefitt_integration_tests::{base_url, credentials, location, signed_in_client};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running dashboard and test accounts"]
async fn test_user_sees_dashboard_and_products() {
    let (email, password) =
        credentials("TEST_USER_EMAIL", "TEST_USER_PASSWORD").expect("test user not configured");
    let client = signed_in_client(&email, &password).await;

    let resp = client
        .get(format!("{}/", base_url()))
        .send()
        .await
        .expect("Failed to get dashboard");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/products", base_url()))
        .send()
        .await
        .expect("Failed to get products");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("<h1>Productos</h1>"));
}

#[tokio::test]
#[ignore = "Requires running dashboard and test accounts"]
async fn test_non_admin_gets_access_denied_panel() {
    let (email, password) =
        credentials("TEST_USER_EMAIL", "TEST_USER_PASSWORD").expect("test user not configured");
    let client = signed_in_client(&email, &password).await;

    let resp = client
        .get(format!("{}/admin/users", base_url()))
        .send()
        .await
        .expect("Failed to get user admin page");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Acceso denegado"));
}

#[tokio::test]
#[ignore = "Requires running dashboard and test accounts"]
async fn test_non_admin_role_change_redirects_home() {
    let (email, password) =
        credentials("TEST_USER_EMAIL", "TEST_USER_PASSWORD").expect("test user not configured");
    let client = signed_in_client(&email, &password).await;

    let resp = client
        .post(format!("{}/admin/users/someone/role", base_url()))
        .form(&[("role", "admin")])
        .send()
        .await
        .expect("Failed to post role change");
    assert_eq!(location(&resp).as_deref(), Some("/"));
}

#[tokio::test]
#[ignore = "Requires running dashboard and test accounts"]
async fn test_admin_lists_users() {
    let (email, password) =
        credentials("TEST_ADMIN_EMAIL", "TEST_ADMIN_PASSWORD").expect("test admin not configured");
    let client = signed_in_client(&email, &password).await;

    let resp = client
        .get(format!("{}/admin/users", base_url()))
        .send()
        .await
        .expect("Failed to get user admin page");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains(&email));
}

#[tokio::test]
#[ignore = "Requires running dashboard and test accounts"]
async fn test_settings_rejects_wrong_confirmation_email() {
    let (email, password) =
        credentials("TEST_USER_EMAIL", "TEST_USER_PASSWORD").expect("test user not configured");
    let client = signed_in_client(&email, &password).await;

    let resp = client
        .post(format!("{}/settings/account/delete", base_url()))
        .form(&[("confirm_email", "not-my-address@example.com")])
        .send()
        .await
        .expect("Failed to post account deletion");
    assert_eq!(
        location(&resp).as_deref(),
        Some("/settings?error=confirm-mismatch")
    );
}

#[tokio::test]
#[ignore = "Requires running dashboard and test accounts"]
async fn test_logout_ends_session() {
    let (email, password) =
        credentials("TEST_USER_EMAIL", "TEST_USER_PASSWORD").expect("test user not configured");
    let client = signed_in_client(&email, &password).await;

    let resp = client
        .post(format!("{}/auth/logout", base_url()))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(
        location(&resp).as_deref(),
        Some("/auth/login?success=signed-out")
    );

    let resp = client
        .get(format!("{}/settings", base_url()))
        .send()
        .await
        .expect("Failed to get settings");
    assert!(resp.status().is_redirection());
}
