use rand::Rng;
use std::time::Duration;

/// Longest we are willing to honour a provider's `Retry-After`.
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(10);

/// Exponential backoff delay with ±30% jitter.
pub fn calculate_backoff_delay(attempt: u32, base: Duration) -> Duration {
    // Cap the exponent to keep the multiplication in range
    let capped_attempt = attempt.min(10);
    let base_delay = base.saturating_mul(2_u32.saturating_pow(capped_attempt));

    let jitter_factor = rand::thread_rng().gen_range(0.7..1.3);
    base_delay.mul_f64(jitter_factor).min(MAX_RETRY_WAIT)
}

/// Delay before the retry of a rate-limited call: the provider's hint when
/// it gave one, otherwise the jittered backoff.
pub fn retry_delay(attempt: u32, base: Duration, retry_after_secs: Option<u64>) -> Duration {
    match retry_after_secs {
        Some(secs) => Duration::from_secs(secs).min(MAX_RETRY_WAIT),
        None => calculate_backoff_delay(attempt, base),
    }
}
