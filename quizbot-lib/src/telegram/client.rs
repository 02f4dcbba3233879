//! Bot API client

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::types::AnswerCallbackQuery;
use super::types::ApiResponse;
use super::types::DeleteMessage;
use super::types::EditMessageText;
use super::types::GetUpdates;
use super::types::InlineKeyboardMarkup;
use super::types::Message;
use super::types::SendMessage;
use super::types::Update;
use super::types::User;
use crate::error::ApiError;
use crate::rate_limit::RateLimiter;
use crate::rate_limit::RetryConfig;

/// Default Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Parse mode used for every outgoing text.
const PARSE_MODE: &str = "HTML";

/// Update kinds the bot subscribes to.
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Client for the Telegram Bot API.
///
/// Cheap to clone (uses `Arc` internally). Outgoing messages share one
/// [`RateLimiter`]; failed calls are retried per [`RetryConfig`].
///
/// # Example
///
/// ```ignore
/// use quizbot_lib::BotClient;
///
/// let client = BotClient::builder()
///     .token("123456:ABC")
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let me = client.get_me().await?;
/// ```
#[derive(Clone)]
pub struct BotClient {
    inner: Arc<BotClientInner>,
}

struct BotClientInner {
    /// Always ends with `/` so that `join` appends.
    /// Joined paths start with `./`; a token contains `:` and would
    /// otherwise parse as a scheme.
    base_url: Url,
    token: String,
    http_client: Client,
    timeout: Option<Duration>,
    retry: RetryConfig,
    limiter: RateLimiter,
}

impl std::fmt::Debug for BotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl BotClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> BotClientBuilder<Missing> {
        BotClientBuilder::new()
    }

    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        self.inner.base_url.as_str()
    }

    /// Checks the token by asking who the bot is.
    pub async fn get_me(&self) -> Result<User, ApiError> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// Long-polls for updates.
    ///
    /// Not retried: the polling loop owns backoff.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ApiError> {
        let params = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call_once("getUpdates", &params, Some(timeout + POLL_GRACE))
            .await
    }

    /// Sends an HTML message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, ApiError> {
        self.inner.limiter.acquire().await;
        let params = SendMessage {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
            reply_markup,
        };
        self.call("sendMessage", &params, None).await
    }

    /// Replaces the text (and keyboard) of a message the bot sent.
    ///
    /// Telegram answers "message is not modified" when nothing changed; that
    /// is treated as success.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), ApiError> {
        self.inner.limiter.acquire().await;
        let params = EditMessageText {
            chat_id,
            message_id,
            text,
            parse_mode: PARSE_MODE,
            reply_markup,
        };
        match self
            .call::<_, serde_json::Value>("editMessageText", &params, None)
            .await
        {
            Ok(_) => Ok(()),
            Err(ApiError::Telegram { description, .. })
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Stops the loading indicator on a pressed button, optionally showing
    /// a toast.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), ApiError> {
        let params = AnswerCallbackQuery {
            callback_query_id,
            text,
            show_alert,
        };
        self.call::<_, bool>("answerCallbackQuery", &params, None)
            .await
            .map(|_| ())
    }

    /// Deletes a message.
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ApiError> {
        let params = DeleteMessage {
            chat_id,
            message_id,
        };
        self.call::<_, bool>("deleteMessage", &params, None)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Calls a method, retrying transient failures.
    async fn call<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<R, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.call_once(method, params, timeout).await {
                Ok(result) => return Ok(result),
                Err(err) => match self.inner.retry.should_retry(&err, attempt) {
                    Some(delay) => {
                        log::warn!(
                            "{} failed (attempt {}): {}; retrying in {:?}",
                            method,
                            attempt + 1,
                            err,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    async fn call_once<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<R, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(method)?;
        let timeout = timeout.or(self.inner.timeout);

        let mut request = self.inner.http_client.post(url).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        match serde_json::from_str::<ApiResponse<R>>(&body) {
            Ok(envelope) => envelope.into_result(status),
            Err(_) if !(200..300).contains(&status) => Err(ApiError::http(status, body)),
            Err(e) => Err(ApiError::parse_with_body(e.to_string(), body)),
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(&format!("./bot{}/{}", self.inner.token, method))
            .map_err(|_| ApiError::InvalidUrl(format!("<base>/bot<token>/{}", method)))
    }
}

/// Maps a reqwest failure, dropping the URL so the token never reaches logs.
fn transport_error(err: reqwest::Error, timeout: Option<Duration>) -> ApiError {
    match timeout {
        Some(timeout) if err.is_timeout() => ApiError::Timeout(timeout),
        _ => ApiError::Network(err.without_url()),
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`BotClient`].
///
/// The bot token is required and enforced at compile time.
pub struct BotClientBuilder<Token> {
    token: Token,
    base_url: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry: RetryConfig,
    limiter: RateLimiter,
    http_client: Option<Client>,
}

impl BotClientBuilder<Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            token: Missing,
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            retry: RetryConfig::default(),
            limiter: RateLimiter::default(),
            http_client: None,
        }
    }

    /// Sets the bot token.
    pub fn token(self, token: impl Into<String>) -> BotClientBuilder<Set<String>> {
        BotClientBuilder {
            token: Set(token.into()),
            base_url: self.base_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            retry: self.retry,
            limiter: self.limiter,
            http_client: self.http_client,
        }
    }
}

impl Default for BotClientBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BotClientBuilder<T> {
    /// Overrides the API endpoint (a local Bot API server, or a test stub).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the outgoing message rate limiter.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Uses a pre-configured HTTP client; timeouts on the builder are then
    /// only applied per request.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl BotClientBuilder<Set<String>> {
    /// Builds the client.
    pub fn build(self) -> Result<BotClient, ApiError> {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url =
            Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(connect_timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(connect_timeout);
                }
                builder.build()?
            }
        };

        Ok(BotClient {
            inner: Arc::new(BotClientInner {
                base_url,
                token: self.token.0,
                http_client,
                timeout: self.timeout,
                retry: self.retry,
                limiter: self.limiter,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::io::Write;
    use std::net::TcpListener;
    use std::net::TcpStream;
    use std::sync::Mutex;

    use super::*;

    const NOT_MODIFIED: &str = r#"{"ok":false,"error_code":400,"description":"Bad Request: message is not modified"}"#;
    const SENT: &str = r#"{"ok":true,"result":{"message_id":9,"chat":{"id":5,"type":"private"},"date":0,"text":"hi"}}"#;
    const FLOOD: &str = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 1","parameters":{"retry_after":1}}"#;
    const TRUE: &str = r#"{"ok":true,"result":true}"#;

    /// Local HTTP server answering each connection with the next canned reply.
    struct Stub {
        url: String,
        paths: Arc<Mutex<Vec<String>>>,
    }

    impl Stub {
        fn serve(replies: Vec<(u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let paths = Arc::new(Mutex::new(Vec::new()));
            let seen = paths.clone();
            std::thread::spawn(move || {
                for (status, body) in replies {
                    let Ok((mut stream, _)) = listener.accept() else {
                        return;
                    };
                    let request = read_request(&mut stream);
                    let path = request.split(' ').nth(1).unwrap_or_default().to_string();
                    seen.lock().unwrap().push(path);
                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes());
                }
            });
            Self { url, paths }
        }

        fn client(&self, retry: RetryConfig) -> BotClient {
            BotClient::builder()
                .token("42:stub")
                .base_url(&self.url)
                .retry(retry)
                .build()
                .unwrap()
        }

        fn paths(&self) -> Vec<String> {
            self.paths.lock().unwrap().clone()
        }
    }

    /// Reads the request head and its `content-length` body.
    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::default()
            .max_retries(2)
            .initial_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_edit_not_modified_is_success() {
        let stub = Stub::serve(vec![(400, NOT_MODIFIED)]);
        let client = stub.client(fast_retry());

        client.edit_message_text(5, 77, "same", None).await.unwrap();
        assert_eq!(stub.paths(), vec!["/bot42:stub/editMessageText"]);
    }

    #[tokio::test]
    async fn test_other_telegram_errors_surface() {
        let stub = Stub::serve(vec![(
            400,
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )]);
        let client = stub.client(fast_retry());

        let err = client.send_message(5, "hi", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Telegram { code: 400, .. }));
        assert_eq!(stub.paths().len(), 1);
    }

    #[tokio::test]
    async fn test_retries_server_error_then_succeeds() {
        let stub = Stub::serve(vec![(502, "Bad Gateway"), (200, SENT)]);
        let client = stub.client(fast_retry());

        let message = client.send_message(5, "hi", None).await.unwrap();
        assert_eq!(message.message_id, 9);
        assert_eq!(stub.paths().len(), 2);
    }

    #[tokio::test]
    async fn test_non_json_error_is_http() {
        let stub = Stub::serve(vec![(502, "<html>Bad Gateway</html>")]);
        let client = stub.client(RetryConfig::no_retry());

        let err = client.delete_message(5, 77).await.unwrap_err();
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 502);
                assert!(message.contains("Bad Gateway"));
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let stub = Stub::serve(vec![(500, "oops"), (500, "oops"), (500, "oops")]);
        let client = stub.client(fast_retry());

        let err = client.get_me().await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(stub.paths().len(), 3);
    }

    #[tokio::test]
    async fn test_flood_control_waits_retry_after() {
        let stub = Stub::serve(vec![(429, FLOOD), (200, TRUE)]);
        // Backoff alone would wait a minute; Telegram asks for one second.
        let client = stub.client(
            RetryConfig::default()
                .max_retries(1)
                .initial_delay(Duration::from_secs(60))
                .max_delay(Duration::from_secs(60)),
        );

        let started = std::time::Instant::now();
        tokio::time::timeout(
            Duration::from_secs(10),
            client.answer_callback_query("cb", "", false),
        )
        .await
        .expect("retry_after should be honoured")
        .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(stub.paths().len(), 2);
    }

    #[tokio::test]
    async fn test_flood_control_error_carries_retry_after() {
        let stub = Stub::serve(vec![(429, FLOOD)]);
        let client = stub.client(RetryConfig::no_retry());

        let err = client.send_message(5, "hi", None).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(1)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_updates_is_not_retried() {
        let stub = Stub::serve(vec![(502, "Bad Gateway"), (200, r#"{"ok":true,"result":[]}"#)]);
        let client = stub.client(fast_retry());

        let err = client
            .get_updates(Some(3), Duration::from_secs(0))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(stub.paths(), vec!["/bot42:stub/getUpdates"]);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = BotClient::builder()
            .token("123:abc")
            .base_url("http://localhost:8081/custom/")
            .build()
            .unwrap();
        let url = client.endpoint("getMe").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8081/custom/bot123:abc/getMe");
    }

    #[test]
    fn test_default_base_url() {
        let client = BotClient::builder().token("t").build().unwrap();
        assert_eq!(client.base_url(), "https://api.telegram.org/");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = BotClient::builder()
            .token("t")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = BotClient::builder().token("secret-token").build().unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-token"));
    }
}
