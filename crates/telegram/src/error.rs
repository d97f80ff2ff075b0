use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map a Bot API failure onto the transport-neutral error the engine sees.
pub(crate) fn to_channel_error(
    operation: &str,
    error: teloxide::RequestError,
) -> relay_channels::Error {
    use teloxide::RequestError;

    match error {
        RequestError::Api(api) => relay_channels::Error::rejected(format!("{operation}: {api}")),
        RequestError::MigrateToChatId(new_id) => relay_channels::Error::rejected(format!(
            "{operation}: chat migrated to {}",
            new_id.0
        )),
        other => relay_channels::Error::external(operation, other),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        teloxide::{ApiError, RequestError, types::ChatId},
    };

    #[test]
    fn api_errors_are_rejections() {
        let err = to_channel_error("copy message", RequestError::Api(ApiError::ChatNotFound));
        assert!(matches!(err, relay_channels::Error::Rejected { .. }), "{err}");
        assert!(err.to_string().contains("copy message"));
    }

    #[test]
    fn migration_is_a_rejection() {
        let err = to_channel_error("copy message", RequestError::MigrateToChatId(ChatId(-1009)));
        assert!(err.to_string().contains("-1009"), "{err}");
    }

    #[test]
    fn io_errors_are_external() {
        let err = to_channel_error(
            "copy message",
            RequestError::Io(std::io::Error::other("boom")),
        );
        assert!(matches!(err, relay_channels::Error::External { .. }), "{err}");
    }
}
