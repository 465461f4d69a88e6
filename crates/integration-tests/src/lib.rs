//! Integration tests for Bluefitt Connect.
//!
//! The tests talk to a running dashboard over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the dashboard (Firebase settings in .env, or emulators)
//! cargo run -p bluefitt-dashboard
//!
//! # Run integration tests
//! cargo test -p bluefitt-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `DASHBOARD_BASE_URL` - Dashboard URL (default: `http://localhost:3000`)
//! - `TEST_USER_EMAIL`, `TEST_USER_PASSWORD` - An existing non-admin account
//! - `TEST_ADMIN_EMAIL`, `TEST_ADMIN_PASSWORD` - An existing admin account

use reqwest::{Client, redirect};

/// Base URL of the dashboard under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("DASHBOARD_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client with a cookie jar that does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Credentials from a pair of environment variables, if both are set.
#[must_use]
pub fn credentials(email_var: &str, password_var: &str) -> Option<(String, String)> {
    Some((std::env::var(email_var).ok()?, std::env::var(password_var).ok()?))
}

/// Sign in through the login form and return the session-carrying client.
///
/// # Panics
///
/// Panics if the request fails or the sign-in is rejected.
#[allow(clippy::expect_used)]
pub async fn signed_in_client(email: &str, password: &str) -> Client {
    let client = client();
    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .form(&[("email", email), ("password", password), ("next", "/")])
        .send()
        .await
        .expect("Failed to submit login form");

    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(
        resp.status().is_redirection() && !location.contains("error="),
        "sign-in rejected: {} {location}",
        resp.status()
    );
    client
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
