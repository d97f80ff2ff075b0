use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        RequestError,
        payloads::CopyMessageSetters,
        prelude::*,
        types::{ChatId as TgChatId, MessageId as TgMessageId, ReplyParameters, ThreadId},
    },
    tracing::{debug, warn},
};

use {
    relay_channels::{AdminOutbound, RelayOutbound, SendTarget},
    relay_common::{ChatId, InboundMessage, MessageId},
};

use crate::error::to_channel_error;

/// Flood waits sat out for an admin reply before giving up.
const ADMIN_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Relay copies fail on the first flood wait so one rate-limited
/// destination cannot stall the relay loop.
const RELAY_RETRY_AFTER_MAX_RETRIES: usize = 0;

/// Bot API send path for one bot.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn copy(
        &self,
        to: ChatId,
        message: &InboundMessage,
        target: Option<SendTarget>,
    ) -> Result<TgMessageId, RequestError> {
        run_with_retry(to, "copy message", RELAY_RETRY_AFTER_MAX_RETRIES, || {
            let mut req = self.bot.copy_message(
                TgChatId(to),
                TgChatId(message.chat_id),
                TgMessageId(message.message_id),
            );
            match target {
                Some(SendTarget::Reply(id)) => {
                    req = req.reply_parameters(
                        ReplyParameters::new(TgMessageId(id)).allow_sending_without_reply(),
                    );
                },
                Some(SendTarget::Topic(topic)) => {
                    req = req.message_thread_id(ThreadId(TgMessageId(topic)));
                },
                None => {},
            }
            async move { req.await }
        })
        .await
    }
}

/// Run a Bot API request, sleeping through `RetryAfter` flood waits a
/// bounded number of times. Any other error is returned immediately.
async fn run_with_retry<T, F, Fut>(
    chat_id: ChatId,
    operation: &'static str,
    max_retries: usize,
    mut request: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= max_retries {
                    warn!(
                        chat_id,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id,
                    operation,
                    retries,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

#[async_trait]
impl RelayOutbound for TelegramOutbound {
    async fn relay(
        &self,
        to: ChatId,
        message: &InboundMessage,
        target: Option<SendTarget>,
    ) -> relay_channels::Result<MessageId> {
        let sent = self
            .copy(to, message, target)
            .await
            .map_err(|e| to_channel_error("copy message", e))?;
        debug!(
            from_chat_id = message.chat_id,
            message_id = message.message_id,
            dest_chat_id = to,
            dest_message_id = sent.0,
            ?target,
            "copied message"
        );
        Ok(sent.0)
    }
}

#[async_trait]
impl AdminOutbound for TelegramOutbound {
    async fn send_text(&self, to: ChatId, text: &str) -> relay_channels::Result<()> {
        run_with_retry(to, "send message", ADMIN_RETRY_AFTER_MAX_RETRIES, || {
            let req = self.bot.send_message(TgChatId(to), text);
            async move { req.await }
        })
        .await
        .map_err(|e| to_channel_error("send message", e))?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        rstest::rstest,
        std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        teloxide::{ApiError, types::Seconds},
    };

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Api(ApiError::BotBlocked);
        assert_eq!(retry_after_duration(&err), None);
    }

    #[tokio::test]
    async fn retries_flood_wait_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = run_with_retry(1, "test", ADMIN_RETRY_AFTER_MAX_RETRIES, || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RequestError::RetryAfter(Seconds::from_seconds(0)))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[rstest]
    #[case::admin(ADMIN_RETRY_AFTER_MAX_RETRIES)]
    #[case::relay(RELAY_RETRY_AFTER_MAX_RETRIES)]
    #[tokio::test]
    async fn gives_up_after_max_retries(#[case] max_retries: usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let result: Result<(), _> = run_with_retry(1, "test", max_retries, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::RetryAfter(Seconds::from_seconds(0)))
            }
        })
        .await;
        assert!(matches!(result, Err(RequestError::RetryAfter(_))));
        assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
    }

    #[tokio::test]
    async fn relay_flood_wait_is_a_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = std::time::Instant::now();
        let result: Result<(), _> =
            run_with_retry(1, "copy message", RELAY_RETRY_AFTER_MAX_RETRIES, || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(RequestError::RetryAfter(Seconds::from_seconds(30)))
                }
            })
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = to_channel_error("copy message", result.unwrap_err());
        assert!(matches!(err, relay_channels::Error::External { .. }), "{err}");
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result: Result<(), _> = run_with_retry(1, "test", ADMIN_RETRY_AFTER_MAX_RETRIES, || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::Api(ApiError::ChatNotFound))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
