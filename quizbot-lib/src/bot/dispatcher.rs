//! Long-polling loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::QuizBot;
use crate::error::ApiError;
use crate::rate_limit::ConcurrencyLimiter;
use crate::rate_limit::RetryConfig;
use crate::telegram::BotClient;
use crate::telegram::Update;

/// Default long-poll timeout passed to `getUpdates`.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Where updates come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns updates with `update_id >= offset`, waiting up to `timeout`.
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ApiError>;
}

#[async_trait]
impl<T: UpdateSource + ?Sized> UpdateSource for Arc<T> {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ApiError> {
        (**self).fetch_updates(offset, timeout).await
    }
}

#[async_trait]
impl UpdateSource for BotClient {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ApiError> {
        self.get_updates(offset, timeout).await
    }
}

/// Polls for updates and runs each one on its own task.
///
/// # Example
///
/// ```ignore
/// let cancel = CancellationToken::new();
/// Dispatcher::new(client, bot).run(cancel).await;
/// ```
pub struct Dispatcher {
    source: Arc<dyn UpdateSource>,
    bot: QuizBot,
    limiter: ConcurrencyLimiter,
    retry: RetryConfig,
    poll_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with default limits.
    pub fn new(source: impl UpdateSource + 'static, bot: QuizBot) -> Self {
        Self {
            source: Arc::new(source),
            bot,
            limiter: ConcurrencyLimiter::default(),
            retry: RetryConfig::default(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Sets how many updates may be handled at once.
    pub fn concurrency(mut self, limiter: ConcurrencyLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Sets the backoff used after a failed poll.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the long-poll timeout.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Polls until `cancel` fires, then waits for running handlers.
    ///
    /// Poll failures never end the loop; they back off and try again.
    pub async fn run(self, cancel: CancellationToken) {
        let tracker = TaskTracker::new();
        let mut offset: Option<i64> = None;
        let mut failures: u32 = 0;

        log::info!("Polling for updates");
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.source.fetch_updates(offset, self.poll_timeout) => result,
            };

            let updates = match result {
                Ok(updates) => {
                    failures = 0;
                    updates
                }
                Err(err) => {
                    let delay = self.retry.delay_for(failures);
                    failures = failures.saturating_add(1);
                    log::warn!("getUpdates failed: {}; retrying in {:?}", err, delay);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            };

            for update in updates {
                let next = update.update_id + 1;
                offset = Some(offset.map_or(next, |o| o.max(next)));
                let permit = self.limiter.acquire().await;
                let bot = self.bot.clone();
                tracker.spawn(async move {
                    let _permit = permit;
                    let update_id = update.update_id;
                    if let Err(err) = bot.handle_update(update).await {
                        log::error!("Update {} failed: {}", update_id, err);
                    }
                });
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            log::info!("Waiting for {} running handler(s)", tracker.len());
        }
        tracker.wait().await;

        // Confirm the last batch so it is not delivered again on restart.
        if let Some(offset) = offset {
            if let Err(err) = self.source.fetch_updates(Some(offset), Duration::ZERO).await {
                log::debug!("Could not confirm offset {}: {}", offset, err);
            }
        }
        log::info!("Polling stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::game::GameService;
    use crate::store::init_db;
    use crate::telegram::InlineKeyboardMarkup;
    use crate::telegram::Messenger;

    /// Replays scripted poll results, then cancels.
    struct Scripted {
        batches: Mutex<VecDeque<Result<Vec<Update>, ApiError>>>,
        offsets: Mutex<Vec<Option<i64>>>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl UpdateSource for Scripted {
        async fn fetch_updates(
            &self,
            offset: Option<i64>,
            _timeout: Duration,
        ) -> Result<Vec<Update>, ApiError> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => {
                    self.cancel.cancel();
                    Ok(Vec::new())
                }
            }
        }
    }

    struct Silent;

    #[async_trait]
    impl Messenger for Silent {
        async fn send_message(
            &self,
            _chat_id: i64,
            _text: &str,
            _keyboard: Option<&InlineKeyboardMarkup>,
        ) -> Result<i64, ApiError> {
            Ok(1)
        }

        async fn edit_message(
            &self,
            _chat_id: i64,
            _message_id: i64,
            _text: &str,
            _keyboard: Option<&InlineKeyboardMarkup>,
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            _text: &str,
            _show_alert: bool,
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn update(id: i64) -> Update {
        serde_json::from_value(serde_json::json!({ "update_id": id })).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_offset_advances_and_errors_back_off() {
        let store = init_db(":memory:").await.unwrap();
        let bot = QuizBot::new(Arc::new(Silent), GameService::new(store), []);
        let cancel = CancellationToken::new();
        let source = Arc::new(Scripted {
            batches: Mutex::new(VecDeque::from([
                Ok(vec![update(5), update(6)]),
                Err(ApiError::http(502, "Bad Gateway")),
                Ok(vec![update(7)]),
            ])),
            offsets: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        });

        Dispatcher::new(source.clone(), bot)
            .retry(RetryConfig::default().initial_delay(Duration::from_millis(10)))
            .run(cancel)
            .await;

        let offsets = source.offsets.lock().unwrap().clone();
        // Last entry is the confirmation poll after cancellation.
        assert_eq!(offsets, vec![None, Some(7), Some(7), Some(8), Some(8)]);
    }

    #[tokio::test]
    async fn test_cancel_before_first_poll() {
        let store = init_db(":memory:").await.unwrap();
        let bot = QuizBot::new(Arc::new(Silent), GameService::new(store), []);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = Scripted {
            batches: Mutex::new(VecDeque::new()),
            offsets: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        };
        let source = Arc::new(source);

        Dispatcher::new(source.clone(), bot).run(cancel).await;
        assert!(source.offsets.lock().unwrap().is_empty());
    }
}
