use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{ErrorKind, TranslationError, TranslationResult};
use crate::keys::KeyPool;
use crate::strings::UiLanguage;

const MAX_ATTEMPTS_PER_KEY: usize = 3;
const MAX_KEYS_PER_REQUEST: usize = 3;
const EMPTY_RESPONSE_DELAY: Duration = Duration::from_millis(500);
const OVERLOAD_BASE_DELAY: Duration = Duration::from_millis(1500);

/// Classified outcome of one network attempt against the AI endpoint.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("HTTP {0}")]
    Http(u16),
    #[error("empty response body")]
    EmptyResponse,
    #[error("{0}")]
    Network(String),
}

pub(crate) type AttemptFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, AttemptError>> + Send + 'a>>;

/// A provider's underlying call with everything bound except the key.
pub(crate) trait TranslateCall: Sync {
    fn invoke<'a>(&'a self, api_key: &'a str) -> AttemptFuture<'a>;
}

/// Runs a provider call under the bounded retry and rotation policy.
///
/// At most `min(pool.len(), 3)` distinct keys are tried, with up to 3
/// attempts each. Rate limits, invalid keys and other terminal statuses
/// give up on the key after one attempt; HTTP 503 backs off
/// `attempt x 1500ms` on the same key and an empty body backs off 500ms
/// before the key is declared exhausted. Every exhausted key rotates the
/// pool, and success advances it too so the next request starts on a fresh
/// key. All attempts exhausted returns the last observed error; this
/// function never panics.
pub(crate) async fn execute_with_rotation(
    call: &dyn TranslateCall,
    pool: &KeyPool,
    lang: UiLanguage,
    provider_name: &str,
) -> TranslationResult {
    if pool.is_empty() {
        return TranslationResult::error(lang.error_no_api_key(provider_name), ErrorKind::NoApiKey);
    }

    let total_keys = pool.len().min(MAX_KEYS_PER_REQUEST);
    let mut last_error = TranslationError {
        message: lang.error_unknown().to_string(),
        kind: ErrorKind::Unknown,
        retryable: false,
    };

    for keys_tried in 0..total_keys {
        let Some(api_key) = pool.current() else {
            break;
        };

        match attempt_with_key(call, &api_key, lang, provider_name).await {
            Ok(text) => {
                // Spread load: the next request starts on a different key.
                pool.advance();
                return TranslationResult::success(text);
            }
            Err(error) => {
                debug!(
                    "{}: key exhausted ({:?}); {}/{} keys tried",
                    provider_name,
                    error.kind,
                    keys_tried + 1,
                    total_keys
                );
                last_error = error;
                pool.advance();
            }
        }
    }

    TranslationResult::Error(last_error)
}

async fn attempt_with_key(
    call: &dyn TranslateCall,
    api_key: &str,
    lang: UiLanguage,
    provider_name: &str,
) -> Result<String, TranslationError> {
    for attempt in 1..=MAX_ATTEMPTS_PER_KEY {
        match call.invoke(api_key).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
            Ok(_) | Err(AttemptError::EmptyResponse) => {
                if attempt < MAX_ATTEMPTS_PER_KEY {
                    debug!(
                        "{}: empty response; retrying (attempt {}/{})",
                        provider_name, attempt, MAX_ATTEMPTS_PER_KEY
                    );
                    sleep(EMPTY_RESPONSE_DELAY).await;
                    continue;
                }
                return Err(TranslationError {
                    message: lang.error_empty_response().to_string(),
                    kind: ErrorKind::EmptyResponse,
                    retryable: true,
                });
            }
            Err(AttemptError::Http(429)) => {
                return Err(TranslationError {
                    message: lang.error_rate_limited().to_string(),
                    kind: ErrorKind::RateLimited,
                    retryable: true,
                });
            }
            Err(AttemptError::Http(403)) => {
                return Err(TranslationError {
                    message: lang.error_invalid_api_key().to_string(),
                    kind: ErrorKind::InvalidApiKey,
                    retryable: true,
                });
            }
            Err(AttemptError::Http(503)) => {
                if attempt < MAX_ATTEMPTS_PER_KEY {
                    let delay = OVERLOAD_BASE_DELAY * attempt as u32;
                    warn!(
                        "{} overloaded (HTTP 503); retrying in {:.1}s (attempt {}/{})",
                        provider_name,
                        delay.as_secs_f32(),
                        attempt,
                        MAX_ATTEMPTS_PER_KEY
                    );
                    sleep(delay).await;
                    continue;
                }
                return Err(TranslationError {
                    message: lang.error_model_overloaded().to_string(),
                    kind: ErrorKind::ModelOverloaded,
                    retryable: true,
                });
            }
            Err(AttemptError::Http(code)) => {
                return Err(TranslationError {
                    message: format!("HTTP {}", code),
                    kind: ErrorKind::NetworkError,
                    retryable: false,
                });
            }
            Err(AttemptError::Network(detail)) => {
                return Err(TranslationError {
                    message: lang.error_network(&detail),
                    kind: ErrorKind::NetworkError,
                    retryable: false,
                });
            }
        }
    }

    Err(TranslationError {
        message: lang.error_unknown().to_string(),
        kind: ErrorKind::Unknown,
        retryable: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{KEY_API_KEY_INDEX, KEY_API_KEYS, MemorySettingsStore, SettingsStore};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedCall {
        outcomes: Mutex<VecDeque<Result<String, AttemptError>>>,
        keys_seen: Mutex<Vec<String>>,
    }

    impl ScriptedCall {
        fn new(outcomes: Vec<Result<String, AttemptError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                keys_seen: Mutex::new(Vec::new()),
            }
        }

        fn keys_seen(&self) -> Vec<String> {
            self.keys_seen.lock().expect("keys lock").clone()
        }
    }

    impl TranslateCall for ScriptedCall {
        fn invoke<'a>(&'a self, api_key: &'a str) -> AttemptFuture<'a> {
            Box::pin(async move {
                self.keys_seen
                    .lock()
                    .expect("keys lock")
                    .push(api_key.to_string());
                self.outcomes
                    .lock()
                    .expect("outcomes lock")
                    .pop_front()
                    .unwrap_or(Err(AttemptError::EmptyResponse))
            })
        }
    }

    fn pool(keys_json: &str) -> (KeyPool, Arc<MemorySettingsStore>) {
        let store = Arc::new(MemorySettingsStore::new());
        store.set(KEY_API_KEYS, keys_json);
        let pool = KeyPool::load(store.clone() as Arc<dyn crate::settings::SettingsStore>);
        (pool, store)
    }

    fn kind_of(result: &TranslationResult) -> Option<ErrorKind> {
        match result {
            TranslationResult::Error(error) => Some(error.kind),
            TranslationResult::Success { .. } => None,
        }
    }

    #[tokio::test]
    async fn five_rate_limited_keys_try_three_distinct_keys_once_each() {
        let (pool, _) = pool(r#"["k1", "k2", "k3", "k4", "k5"]"#);
        let call = ScriptedCall::new(vec![
            Err(AttemptError::Http(429)),
            Err(AttemptError::Http(429)),
            Err(AttemptError::Http(429)),
        ]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "test").await;

        assert_eq!(call.keys_seen(), vec!["k1", "k2", "k3"]);
        assert_eq!(kind_of(&result), Some(ErrorKind::RateLimited));
    }

    #[tokio::test(start_paused = true)]
    async fn overloaded_then_success_advances_pool_once() {
        let (pool, store) = pool(r#"["k1", "k2"]"#);
        let call = ScriptedCall::new(vec![
            Err(AttemptError::Http(503)),
            Ok("translated".to_string()),
        ]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "test").await;

        assert!(result.is_success());
        // the 503 retry stays on the same key; only success rotates
        assert_eq!(call.keys_seen(), vec!["k1", "k1"]);
        assert_eq!(store.get(KEY_API_KEY_INDEX).as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn single_invalid_key_is_terminal() {
        let (pool, _) = pool(r#"["only"]"#);
        let call = ScriptedCall::new(vec![Err(AttemptError::Http(403))]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "test").await;

        assert_eq!(call.keys_seen().len(), 1);
        assert_eq!(kind_of(&result), Some(ErrorKind::InvalidApiKey));
    }

    #[tokio::test]
    async fn invalid_key_rotates_when_another_exists() {
        let (pool, _) = pool(r#"["bad", "good"]"#);
        let call = ScriptedCall::new(vec![
            Err(AttemptError::Http(403)),
            Ok("translated".to_string()),
        ]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "test").await;

        assert!(result.is_success());
        assert_eq!(call.keys_seen(), vec!["bad", "good"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_responses_exhaust_inner_retries() {
        let (pool, _) = pool(r#"["only"]"#);
        let call = ScriptedCall::new(vec![
            Err(AttemptError::EmptyResponse),
            Err(AttemptError::EmptyResponse),
            Err(AttemptError::EmptyResponse),
        ]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "test").await;

        assert_eq!(call.keys_seen().len(), 3);
        match result {
            TranslationResult::Error(error) => {
                assert_eq!(error.kind, ErrorKind::EmptyResponse);
                assert!(error.retryable);
            }
            TranslationResult::Success { .. } => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn unexpected_status_rotates_without_inner_retries() {
        let (pool, _) = pool(r#"["k1", "k2", "k3"]"#);
        let call = ScriptedCall::new(vec![
            Err(AttemptError::Http(500)),
            Err(AttemptError::Network("connection reset".to_string())),
            Err(AttemptError::Http(500)),
        ]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "test").await;

        assert_eq!(call.keys_seen(), vec!["k1", "k2", "k3"]);
        assert_eq!(kind_of(&result), Some(ErrorKind::NetworkError));
    }

    #[tokio::test]
    async fn empty_pool_short_circuits() {
        let store = Arc::new(MemorySettingsStore::new());
        let pool = KeyPool::load(store as Arc<dyn crate::settings::SettingsStore>);
        let call = ScriptedCall::new(vec![Ok("never".to_string())]);

        let result = execute_with_rotation(&call, &pool, UiLanguage::English, "Gemini").await;

        assert!(call.keys_seen().is_empty());
        assert_eq!(kind_of(&result), Some(ErrorKind::NoApiKey));
    }
}
