//! Response bodies and mock mounting helpers

use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Small but well-formed PDF document
pub const PDF_BODY: &[u8] = b"%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [] /Count 0 >> endobj
trailer << /Root 1 0 R >>
%%EOF
";

/// Typical publisher login wall served instead of the document
pub const LOGIN_PAGE: &str =
    "<!DOCTYPE html><html><head><title>Sign in</title></head><body>Access denied</body></html>";

/// Serve [`PDF_BODY`] at `route`
pub async fn mount_pdf(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .mount(server)
        .await;
}

/// Serve [`PDF_BODY`] at `route` after `delay`
pub async fn mount_slow_pdf(server: &MockServer, route: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(PDF_BODY.to_vec(), "application/pdf")
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Serve [`LOGIN_PAGE`] with status 200 at `route`
pub async fn mount_login_page(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(LOGIN_PAGE, "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Answer `route` with a bare status, expecting exactly `times` requests
pub async fn mount_status(server: &MockServer, route: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

/// Fail `route` with `status` for the first `failures` requests, then serve a PDF
pub async fn mount_flaky_pdf(server: &MockServer, route: &str, status: u16, failures: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .up_to_n_times(failures)
        .expect(failures)
        .mount(server)
        .await;
    mount_pdf(server, route).await;
}
