//! # Backend handoff
//!
//! Turns an untrusted [`IdentityRecord`] into an authenticated session by posting it
//! to the backend, which checks the container's signature and sets a session cookie.
//!
//! ```text
//! POST <auth_endpoint>
//! Content-Type: application/json
//!
//! {"townpass_user": { ...record... }}
//! ```
//!
//! Credentials always travel with the request: in the browser the fetch uses
//! `credentials: include`, on native targets the client keeps a cookie store so the
//! session cookie round-trips on later calls.
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx, JSON body | `Ok(body)` verbatim |
//! | 2xx, not JSON | [`BridgeError::Decode`] |
//! | non-2xx, `{"error": "..."}` | [`BridgeError::Rejected`] with that message |
//! | non-2xx, anything else | [`BridgeError::Rejected`] with `"HTTP <status>"` |
//! | network failure | [`BridgeError::Http`] |

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::identity::IdentityRecord;

#[derive(Serialize)]
struct VerifyRequest<'a> {
    townpass_user: &'a IdentityRecord,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the verification endpoint.
#[derive(Clone, Debug)]
pub struct BackendHandoff {
    client: Client,
    endpoint: String,
    base_url: Option<String>,
}

impl BackendHandoff {
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint: config.auth_endpoint.clone(),
            base_url: config.base_url.clone(),
        })
    }

    /// The absolute URL requests go to.
    pub fn endpoint_url(&self) -> BridgeResult<Url> {
        resolve_endpoint(&self.endpoint, self.base_url.as_deref())
    }

    /// Post `user` to the backend and return its JSON answer.
    pub async fn verify(&self, user: &IdentityRecord) -> BridgeResult<Value> {
        let url = self.endpoint_url()?;
        debug!(%url, user = user.id(), "Verifying TownPass identity");

        let request = self
            .client
            .post(url)
            .json(&VerifyRequest { townpass_user: user });
        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(ErrorBody { error: Some(message) }) if !message.is_empty() => message,
                _ => format!("HTTP {}", status.as_u16()),
            };
            warn!(status = status.as_u16(), %message, "TownPass verification rejected");
            return Err(BridgeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BridgeError::Decode(e.to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn build_client() -> BridgeResult<Client> {
    Ok(Client::builder().cookie_store(true).build()?)
}

#[cfg(target_arch = "wasm32")]
fn build_client() -> BridgeResult<Client> {
    Ok(Client::new())
}

/// Resolve a possibly relative endpoint against `base_url`, or the page origin
/// in the browser.
fn resolve_endpoint(endpoint: &str, base_url: Option<&str>) -> BridgeResult<Url> {
    if let Ok(url) = Url::parse(endpoint) {
        return Ok(url);
    }
    let base = base_url
        .map(str::to_string)
        .or_else(page_origin)
        .ok_or_else(|| BridgeError::InvalidEndpoint(endpoint.to_string()))?;
    Url::parse(&base)
        .and_then(|base| base.join(endpoint))
        .map_err(|e| BridgeError::InvalidEndpoint(format!("{endpoint}: {e}")))
}

#[cfg(all(target_arch = "wasm32", feature = "web"))]
fn page_origin() -> Option<String> {
    web_sys::window().and_then(|window| window.location().origin().ok())
}

#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
fn page_origin() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handoff_for(server: &MockServer) -> BackendHandoff {
        let config = BridgeConfig::default().with_base_url(server.uri());
        BackendHandoff::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_relative_endpoint() {
        let url = resolve_endpoint("/api/auth/townpass", Some("https://quests.example.org")).unwrap();
        assert_eq!(url.as_str(), "https://quests.example.org/api/auth/townpass");
    }

    #[test]
    fn test_absolute_endpoint_ignores_base() {
        let url = resolve_endpoint("https://auth.example.org/verify", Some("https://other.example")).unwrap();
        assert_eq!(url.as_str(), "https://auth.example.org/verify");
    }

    #[test]
    fn test_relative_endpoint_without_base_is_invalid() {
        assert!(matches!(
            resolve_endpoint("/api/auth/townpass", None),
            Err(BridgeError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_posts_record_under_townpass_user() {
        let server = MockServer::start().await;
        let user = IdentityRecord::new("u-1").with_field("signature", "sig");
        Mock::given(method("POST"))
            .and(path("/api/auth/townpass"))
            .and(body_json(json!({"townpass_user": {"id": "u-1", "signature": "sig"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "user": {"id": "u-1"}})))
            .expect(1)
            .mount(&server)
            .await;

        let body = handoff_for(&server).verify(&user).await.unwrap();
        assert_eq!(body, json!({"success": true, "user": {"id": "u-1"}}));
    }

    #[tokio::test]
    async fn test_error_body_becomes_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid TownPass signature"})))
            .mount(&server)
            .await;

        let err = handoff_for(&server)
            .verify(&IdentityRecord::new("u-1"))
            .await
            .unwrap_err();
        match err {
            BridgeError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid TownPass signature");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_error_body_uses_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = handoff_for(&server)
            .verify(&IdentityRecord::new("u-1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_success_without_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let err = handoff_for(&server)
            .verify(&IdentityRecord::new("u-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_session_cookie_round_trips() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::header("cookie", "townpass_session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "again": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "townpass_session=abc; Path=/")
                    .set_body_json(json!({"success": true})),
            )
            .mount(&server)
            .await;

        let handoff = handoff_for(&server);
        let user = IdentityRecord::new("u-1");
        let first = handoff.verify(&user).await.unwrap();
        let second = handoff.verify(&user).await.unwrap();

        assert_eq!(first, json!({"success": true}));
        assert_eq!(second, json!({"success": true, "again": true}));
    }
}
