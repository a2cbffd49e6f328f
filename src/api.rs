//! HTTP client for the mail service API.
//!
//! The service is consumed, not owned: two POST endpoints, credentials in
//! the request body on every call, JSON responses. Non-2xx is failure; a
//! response without a `messages` field is an empty list, not an error.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::FetchError;
use crate::session::Credentials;
use crate::types::Message;

/// Request body for both endpoints.
#[derive(Debug, Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Response envelope from the service.
///
/// The service also sends a `count` field; `messages.len()` is authoritative
/// so it is ignored here.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

/// Error body from the service (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full listing across folders.
    pub async fn list_messages(&self, creds: &Credentials) -> Result<Vec<Message>, FetchError> {
        let url = format!("{}/api/messages", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&CredentialsBody {
                email: &creds.email,
                password: &creds.password,
            })
            .send()
            .await?;
        Self::parse_listing(response).await
    }

    /// Fetch messages filtered by sender.
    pub async fn search_by_sender(
        &self,
        creds: &Credentials,
        sender: &str,
    ) -> Result<Vec<Message>, FetchError> {
        let url = format!("{}/api/search", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("sender", sender)])
            .json(&CredentialsBody {
                email: &creds.email,
                password: &creds.password,
            })
            .send()
            .await?;
        Self::parse_listing(response).await
    }

    async fn parse_listing(response: reqwest::Response) -> Result<Vec<Message>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            // Surface the service's detail string when the body carries one.
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(FetchError::Status { status, detail });
        }
        let listing: ListResponse = response.json().await?;
        Ok(listing.messages)
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal canned-response HTTP listener for endpoint tests.

    use std::sync::Arc;
    use std::sync::Mutex;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Requests seen by the server: the request line of each exchange.
    pub type RequestLog = Arc<Mutex<Vec<String>>>;

    /// Serve one canned `(status, body)` response per connection, repeating
    /// the last one once the list is exhausted. Returns the base URL and a
    /// log of request lines.
    pub async fn spawn(responses: Vec<(u16, String)>) -> (String, RequestLog) {
        spawn_delayed(responses, std::time::Duration::ZERO).await
    }

    /// Like [`spawn`], but wait `delay` after reading each request before
    /// responding, to keep a fetch in flight while the test acts.
    pub async fn spawn_delayed(
        responses: Vec<(u16, String)>,
        delay: std::time::Duration,
    ) -> (String, RequestLog) {
        assert!(!responses.is_empty());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));

        let log_clone = log.clone();
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let (status, body) = responses[served.min(responses.len() - 1)].clone();
                served += 1;

                let request = read_request(&mut stream).await;
                if let Some(line) = request.lines().next() {
                    log_clone.lock().unwrap().push(line.to_string());
                }

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    401 => "Unauthorized",
                    500 => "Internal Server Error",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.ok();
                stream.shutdown().await.ok();
            }
        });

        (base_url, log)
    }

    /// Read headers plus a content-length body so the client is not cut off
    /// mid-send.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let Ok(n) = stream.read(&mut chunk).await else {
                break;
            };
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(header_end) = find_header_end(&buf) {
                let headers = String::from_utf8_lossy(&buf[..header_end]);
                let content_length = headers
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            email: "user@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    fn message_json(uid: &str, folder: &str) -> String {
        format!(
            r#"{{"uid":"{uid}","sender":"a@b.com","subject":"s","date":"d","folder":"{folder}"}}"#
        )
    }

    #[tokio::test]
    async fn test_list_messages_parses_listing() {
        let body = format!(
            r#"{{"messages":[{},{}],"count":2}}"#,
            message_json("1", "INBOX"),
            message_json("2", "Spam")
        );
        let (base_url, log) = test_server::spawn(vec![(200, body)]).await;

        let client = ApiClient::new(&base_url).unwrap();
        let messages = client.list_messages(&creds()).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].uid, "1");
        assert_eq!(messages[1].folder, "Spam");

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("POST /api/messages"));
    }

    #[tokio::test]
    async fn test_missing_messages_field_is_empty_list() {
        let (base_url, _log) =
            test_server::spawn(vec![(200, r#"{"status":"ok"}"#.to_string())]).await;

        let client = ApiClient::new(&base_url).unwrap();
        let messages = client.list_messages(&creds()).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_detail() {
        let (base_url, _log) = test_server::spawn(vec![(
            401,
            r#"{"detail":"Failed to connect to email server"}"#.to_string(),
        )])
        .await;

        let client = ApiClient::new(&base_url).unwrap();
        let err = client.list_messages(&creds()).await.unwrap_err();
        match err {
            FetchError::Status { status, detail } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(detail, "Failed to connect to email server");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_encodes_term_in_query() {
        let body = format!(r#"{{"messages":[{}]}}"#, message_json("3", "INBOX"));
        let (base_url, log) = test_server::spawn(vec![(200, body)]).await;

        let client = ApiClient::new(&base_url).unwrap();
        let messages = client
            .search_by_sender(&creds(), "x@y.com")
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);

        let log = log.lock().unwrap();
        assert!(log[0].starts_with("POST /api/search?sender=x%40y.com"));
    }
}
