//! Purpose: Fetch response bodies and feed them through the token decoder.
//! Exports: `Transport`, `HttpTransport`, `run_request`, `DEFAULT_BASE_URL`.
//! Role: Blocking HTTP seam between listing orchestration and the remote JSON API.
//! Invariants: Base URLs are http/https with no path, query, or fragment.
//! Invariants: Locators are absolute paths (plus optional query) joined onto the base URL.
//! Invariants: Network and HTTP status failures map to `ErrorKind::Transport`; no retries.
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::core::binding::BindingTable;
use crate::core::cursor::TokenCursor;
use crate::core::error::{Error, ErrorKind};
use crate::core::token::TokenStream;

pub const DEFAULT_BASE_URL: &str = "http://www.reddit.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub trait Transport {
    /// GET `locator` and return the response body.
    fn get(&self, locator: &str) -> Result<String, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, locator: &str) -> Result<String, Error> {
        (**self).get(locator)
    }
}

/// GET `locator`, tokenize the body, and decode the root object against `table`.
pub fn run_request<T>(transport: &T, locator: &str, table: &mut BindingTable<'_>) -> Result<(), Error>
where
    T: Transport + ?Sized,
{
    let body = transport.get(locator)?;
    let stream = TokenStream::parse(&body)?;
    tracing::trace!(locator, bytes = body.len(), tokens = stream.len(), "tokenized response");
    let mut cursor = TokenCursor::new(&stream);
    table.decode(&mut cursor)
}

#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    base_url: Url,
    user_agent: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let base_url = normalize_base_url(base_url.into())?;
        let user_agent = default_user_agent();
        let agent = build_agent(&user_agent, DEFAULT_TIMEOUT);
        Ok(Self {
            inner: Arc::new(HttpTransportInner {
                base_url,
                user_agent,
                timeout: DEFAULT_TIMEOUT,
                agent,
            }),
        })
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let agent = build_agent(&user_agent, self.inner.timeout);
        self.rebuild(|inner| {
            inner.user_agent = user_agent;
            inner.agent = agent;
        })
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        let agent = build_agent(&self.inner.user_agent, timeout);
        self.rebuild(|inner| {
            inner.timeout = timeout;
            inner.agent = agent;
        })
    }

    /// Replace the underlying agent, e.g. to install custom TLS settings.
    pub fn with_agent(self, agent: ureq::Agent) -> Self {
        self.rebuild(|inner| inner.agent = agent)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn url_for(&self, locator: &str) -> Result<Url, Error> {
        if !locator.starts_with('/') {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("locator `{locator}` must start with `/`")));
        }
        self.inner.base_url.join(locator).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid locator `{locator}`"))
                .with_source(err)
        })
    }

    fn rebuild(mut self, update: impl FnOnce(&mut HttpTransportInner)) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            update(inner);
        } else {
            let mut inner = HttpTransportInner {
                base_url: self.inner.base_url.clone(),
                user_agent: self.inner.user_agent.clone(),
                timeout: self.inner.timeout,
                agent: self.inner.agent.clone(),
            };
            update(&mut inner);
            self.inner = Arc::new(inner);
        }
        self
    }
}

impl Transport for HttpTransport {
    fn get(&self, locator: &str) -> Result<String, Error> {
        let url = self.url_for(locator)?;
        tracing::debug!(url = %url, "GET");
        let response = self
            .inner
            .agent
            .get(url.as_str())
            .set("Accept", "application/json")
            .call();

        match response {
            Ok(resp) => resp.into_string().map_err(|err| {
                Error::new(ErrorKind::Transport)
                    .with_message("failed to read response body")
                    .with_source(err)
            }),
            Err(ureq::Error::Status(code, _resp)) => Err(Error::new(ErrorKind::Transport)
                .with_message(format!("remote error status {code}"))
                .with_hint(status_hint(code))),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Transport)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

fn build_agent(user_agent: &str, timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

fn default_user_agent() -> String {
    format!("redlist/{}", env!("CARGO_PKG_VERSION"))
}

fn status_hint(code: u16) -> &'static str {
    match code {
        403 => "Access denied. The subreddit may be private or quarantined.",
        404 => "Not found. Check the subreddit name.",
        429 => "Rate limited. Wait before retrying or set a descriptive --user-agent.",
        500..=599 => "Server error. Retry later.",
        _ => "Unexpected HTTP status from the listing endpoint.",
    }
}

fn normalize_base_url(raw: String) -> Result<Url, Error> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage).with_message("base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("base url must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
