use crate::config::FetchConfig;
use crate::error::{RelayError, Result};
use crate::types::Address;
use std::time::Duration;
use tracing::{debug, warn};

/// Distribution service for guardian-signed messages.
///
/// `Ok(None)` means the message is not signed yet and the caller should poll
/// again.
#[allow(async_fn_in_trait)]
pub trait SignedMessageSource {
    async fn fetch_signed_message(
        &self,
        chain: u16,
        emitter_hex: &str,
        sequence: u64,
    ) -> Result<Option<Vec<u8>>>;
}

/// Polls `source` with a fixed backoff until the signed VAA for
/// `(chain, emitter, sequence)` appears or the attempts run out.
pub async fn fetch_signed_vaa<M: SignedMessageSource>(
    source: &M,
    config: &FetchConfig,
    chain: u16,
    emitter: &Address,
    sequence: u64,
) -> Result<Vec<u8>> {
    let emitter_hex = emitter.to_hex();

    for attempt in 1..=config.attempts {
        match source.fetch_signed_message(chain, &emitter_hex, sequence).await {
            Ok(Some(raw)) => {
                debug!(chain, sequence, attempt, "signed message fetched");
                return Ok(raw);
            }
            Ok(None) => debug!(chain, sequence, attempt, "signed message not ready"),
            Err(err) => warn!(chain, sequence, attempt, error = %err, "signed message fetch failed"),
        }

        if attempt < config.attempts {
            tokio::time::sleep(Duration::from_millis(config.backoff_ms)).await;
        }
    }

    Err(RelayError::MessageUnavailable {
        chain,
        emitter: emitter_hex,
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        calls: AtomicU32,
        ready_after: u32,
    }

    impl SignedMessageSource for CountingSource {
        async fn fetch_signed_message(
            &self,
            _chain: u16,
            _emitter_hex: &str,
            _sequence: u64,
        ) -> Result<Option<Vec<u8>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.ready_after {
                Ok(Some(vec![1, 2, 3]))
            } else {
                Ok(None)
            }
        }
    }

    fn config() -> FetchConfig {
        FetchConfig {
            attempts: 3,
            backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_fetch_retries_until_ready() {
        let source = CountingSource {
            calls: AtomicU32::new(0),
            ready_after: 3,
        };
        let raw = fetch_signed_vaa(&source, &config(), 8, &Address([1; 32]), 5)
            .await
            .unwrap();
        assert_eq!(raw, vec![1, 2, 3]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_gives_up() {
        let source = CountingSource {
            calls: AtomicU32::new(0),
            ready_after: 10,
        };
        let err = fetch_signed_vaa(&source, &config(), 8, &Address([1; 32]), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MessageUnavailable { sequence: 5, .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}
