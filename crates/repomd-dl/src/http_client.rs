//! The process-wide HTTP agent behind `http` and `https` mirrors.
//!
//! The CLI applies its proxy, extra headers, user agent and timeout once at
//! startup through [`configure_http_client`]. Every request issued by
//! [`get`] afterwards uses the rebuilt agent.

use std::{
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use ureq::{http::HeaderMap, typestate::WithoutBody, Agent, Proxy, RequestBuilder};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("repomd/", env!("CARGO_PKG_VERSION"));

/// Settings the shared agent is built from.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    /// Sent with every request; not part of the agent itself.
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    /// Upper bound for a whole request, body included.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// ```
    /// use repomd_dl::http_client::{ClientConfig, DEFAULT_USER_AGENT};
    ///
    /// let cfg = ClientConfig::default();
    /// assert_eq!(cfg.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(DEFAULT_USER_AGENT.into()),
            proxy: None,
            headers: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn build(&self) -> Agent {
        let mut config = Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

struct SharedClient {
    agent: Agent,
    config: ClientConfig,
}

static SHARED_CLIENT: LazyLock<RwLock<SharedClient>> = LazyLock::new(|| {
    let config = ClientConfig::default();
    RwLock::new(SharedClient {
        agent: config.build(),
        config,
    })
});

/// Starts a GET request for `url` on the shared agent, with the configured
/// extra headers already set.
///
/// ```no_run
/// let response = repomd_dl::http_client::get(
///     "https://mirrors.edge.kernel.org/centos/8-stream/BaseOS/x86_64/os/repodata/repomd.xml",
/// )
/// .call();
/// ```
pub fn get(url: &str) -> RequestBuilder<WithoutBody> {
    let state = SHARED_CLIENT.read().unwrap_or_else(PoisonError::into_inner);
    with_headers(state.agent.get(url), state.config.headers.as_ref())
}

fn with_headers<B>(mut req: RequestBuilder<B>, headers: Option<&HeaderMap>) -> RequestBuilder<B> {
    for (key, value) in headers.into_iter().flatten() {
        req = req.header(key, value);
    }
    req
}

/// Edits the shared configuration and swaps in an agent built from it.
///
/// ```
/// use std::time::Duration;
///
/// use repomd_dl::http_client::configure_http_client;
///
/// configure_http_client(|cfg| cfg.timeout = Some(Duration::from_secs(30)));
/// ```
pub fn configure_http_client<F>(updater: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut state = SHARED_CLIENT.write().unwrap_or_else(PoisonError::into_inner);
    let mut config = state.config.clone();
    updater(&mut config);
    state.agent = config.build();
    state.config = config;
}

/// The configuration the shared agent was last built from.
pub fn current_client_config() -> ClientConfig {
    SHARED_CLIENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .config
        .clone()
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use ureq::http::{header::ACCEPT, HeaderValue};

    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(DEFAULT_USER_AGENT.starts_with("repomd/"));
        assert_eq!(config.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_client_config_with_timeout() {
        let config = ClientConfig {
            user_agent: Some("test-agent".to_string()),
            proxy: None,
            headers: None,
            timeout: Some(Duration::from_secs(30)),
        };
        let _ = config.build();
    }

    #[test]
    #[serial]
    fn test_get_builds_request() {
        let _ = get("https://example.com/repodata/repomd.xml");
    }

    #[test]
    #[serial]
    fn test_configure_http_client() {
        configure_http_client(|cfg| {
            cfg.user_agent = Some("custom-agent/1.0".to_string());
            cfg.timeout = Some(Duration::from_secs(10));
        });

        let config = current_client_config();
        assert_eq!(config.user_agent.as_deref(), Some("custom-agent/1.0"));
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));

        configure_http_client(|cfg| *cfg = ClientConfig::default());
        assert!(current_client_config().timeout.is_none());
    }

    #[test]
    fn test_with_headers() {
        let agent: Agent = Agent::config_builder().build().into();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));

        let req = with_headers(agent.get("https://example.com"), Some(&headers));
        assert_eq!(req.headers_ref().unwrap().get(ACCEPT).unwrap(), "application/xml");

        let req = with_headers(agent.get("https://example.com"), None);
        assert!(req.headers_ref().unwrap().get(ACCEPT).is_none());
    }
}
