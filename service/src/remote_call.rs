use std::{future::Future, time::Duration};

use remote_session::RemoteError;

/// Await one remote round trip, optionally bounded by `timeout`.
///
/// Expiry only stops waiting. Whatever the server already accepted stays there.
pub(crate) async fn call<T, F>(
    timeout: Option<Duration>,
    operation: &'static str,
    request: F,
) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match timeout {
        Some(limit) => async_std::future::timeout(limit, request)
            .await
            .map_err(|_| {
                tracing::warn!(operation, ?limit, "Remote call timed out");
                RemoteError::Timeout(format!("{} did not complete within {:?}", operation, limit))
            })?,
        None => request.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn test_passes_result_through() {
        let ok: Result<u8, RemoteError> = call(None, "noop", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u8, RemoteError> = call(Some(Duration::from_secs(5)), "noop", async {
            Err(RemoteError::Transport("reset".to_string()))
        })
        .await;
        assert_eq!(err, Err(RemoteError::Transport("reset".to_string())));
    }

    #[async_std::test]
    async fn test_times_out() {
        let result: Result<u8, RemoteError> =
            call(Some(Duration::from_millis(10)), "slow", async {
                async_std::task::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;
        assert!(matches!(result, Err(RemoteError::Timeout(_))));
    }
}
