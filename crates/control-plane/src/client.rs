use crate::error::{Error, Result};
use crate::sink::SinkConfig;
use reqwest::{IntoUrl, Method, Response, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Bearer token issued by `POST /auth/token`.
///
/// Returned by value and passed into every call instead of being stored on
/// the client, so one client can serve several identities concurrently.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token obtained out of band.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("token", &"***").finish()
    }
}

/// Control-plane REST client.
///
/// Cheap to clone; holds no per-user state.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Create a client for `base_url` (e.g. `https://api.example.com/v1`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Self::with_http_client(base_url, http)
    }

    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// URL of `segments` under the base URL, each segment percent-encoded.
    fn segments_url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = |reason: String| Error::InvalidUrl(format!("{}: {reason}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Exchange username/password for a bearer token.
    ///
    /// The server answers with a JSON string (`"abc"`); the quotes are
    /// stripped. A body that is not a JSON string is used verbatim.
    pub async fn basic_auth(&self, username: &str, password: &str) -> Result<Credential> {
        let url = self.url("/auth/token");
        debug!("Requesting token from {url} for {username}");

        let response = self
            .http
            .post(&url)
            .basic_auth(username, Some(password))
            .send()
            .await?;
        let body = read_body(response).await?;

        let token = unquote(&body);
        if token.is_empty() {
            return Err(Error::InvalidResponse(
                "token endpoint returned an empty token".to_string(),
            ));
        }
        Ok(Credential::from_token(token))
    }

    /// Authenticated call returning the raw response body.
    pub async fn call_api(
        &self,
        credential: &Credential,
        method: Method,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<String> {
        self.send(credential, method, self.url(endpoint), body).await
    }

    async fn send(
        &self,
        credential: &Credential,
        method: Method,
        url: impl IntoUrl + fmt::Display,
        body: Option<String>,
    ) -> Result<String> {
        debug!("{method} {url}");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(credential.token());
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            request = request.body(body);
        }

        let response = request.send().await?;
        read_body(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        segments: &[&str],
    ) -> Result<T> {
        let url = self.segments_url(segments)?;
        let body = self.send(credential, Method::GET, url, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Names of the sinks configured for an agent.
    pub async fn get_sinks(&self, credential: &Credential, agent_id: &str) -> Result<Vec<String>> {
        self.get_json(credential, &["collectors", agent_id, "sinks"])
            .await
    }

    /// Configuration of one sink.
    pub async fn get_sink(
        &self,
        credential: &Credential,
        agent_id: &str,
        sink_name: &str,
    ) -> Result<SinkConfig> {
        self.get_json(credential, &["collectors", agent_id, "sinks", sink_name])
            .await
    }

    /// Configuration of one sink as untyped JSON, including fields
    /// [`SinkConfig`] does not model.
    pub async fn get_sink_raw(
        &self,
        credential: &Credential,
        agent_id: &str,
        sink_name: &str,
    ) -> Result<serde_json::Value> {
        self.get_json(credential, &["collectors", agent_id, "sinks", sink_name])
            .await
    }
}

/// Statuses above 206 are failures, reported with their reason phrase.
fn check_status(response: &Response) -> Result<()> {
    let status = response.status();
    if status.as_u16() > 206 {
        return Err(Error::Transport {
            status: Some(status.as_u16()),
            reason: status
                .canonical_reason()
                .unwrap_or_else(|| status.as_str())
                .to_string(),
        });
    }
    Ok(())
}

async fn read_body(response: Response) -> Result<String> {
    check_status(&response)?;
    let status = response.status().as_u16();
    response.text().await.map_err(|e| Error::Transport {
        status: Some(status),
        reason: format!("failed to read response body: {e}"),
    })
}

fn unquote(body: &str) -> String {
    let body = body.trim();
    match serde_json::from_str::<String>(body) {
        Ok(token) => token,
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"token\""), "token");
        assert_eq!(unquote(" \"token\"\n"), "token");
        assert_eq!(unquote("\"a\\\"b\""), "a\"b");
        assert_eq!(unquote("raw-token"), "raw-token");
        assert_eq!(unquote(""), "");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = Client::new("http://localhost:8080/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(
            client.url("/auth/token"),
            "http://localhost:8080/api/auth/token"
        );
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let client = Client::new("http://localhost:8080/api/").unwrap();
        let url = client
            .segments_url(&["collectors", "a", "sinks", "x/../y?z#w"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/collectors/a/sinks/x%2F..%2Fy%3Fz%23w"
        );

        let client = Client::new("http://localhost:8080").unwrap();
        let url = client.segments_url(&["collectors", "a", "sinks"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/collectors/a/sinks");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = Client::new("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_credential_debug_masks_token() {
        let credential = Credential::from_token("s3cr3t");
        assert_eq!(credential.token(), "s3cr3t");
        assert!(!format!("{credential:?}").contains("s3cr3t"));
    }
}
