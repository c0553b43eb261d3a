use std::time::Duration;

use reqwest::Client;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("parla/", env!("CARGO_PKG_VERSION"));

/// Client shared by provider calls. Only the connect phase has a timeout.
///
/// System proxies are ignored when `bypass_system_proxy` is set, and always
/// under test.
pub(crate) fn build_http_client(bypass_system_proxy: bool) -> Client {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT);
    if bypass_system_proxy || cfg!(test) {
        builder = builder.no_proxy();
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Falling back to default HTTP client");
        Client::new()
    })
}
