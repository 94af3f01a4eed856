//! Per-provider request throttling backed by `governor`.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Build a limiter allowing `requests_per_second` sustained requests.
///
/// Rates below one request per second are expressed as a replenish period
/// (0.5 means one request every two seconds), capped at one request per
/// day. Non-positive or non-finite rates disable throttling.
pub fn limiter_for_rate(requests_per_second: f32) -> Option<Arc<DefaultDirectRateLimiter>> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return None;
    }

    let quota = if requests_per_second >= 1.0 {
        let per_second = NonZeroU32::new(requests_per_second.round() as u32).unwrap_or(nonzero!(1u32));
        Quota::per_second(per_second)
    } else {
        let longest = Duration::from_secs(SECONDS_PER_DAY);
        let period = Duration::try_from_secs_f32(1.0 / requests_per_second)
            .map_or(longest, |period| period.min(longest));
        Quota::with_period(period)?
    };

    Some(Arc::new(RateLimiter::direct(quota)))
}

/// Build a limiter that admits at most `per_day` requests per day.
///
/// The whole allowance is available as a burst and replenishes evenly over
/// the day. Callers use `check()` on it and skip the call once exhausted.
pub fn daily_quota(per_day: u32) -> Option<Arc<DefaultDirectRateLimiter>> {
    let burst = NonZeroU32::new(per_day)?;
    let period = Duration::from_secs(SECONDS_PER_DAY) / burst.get();
    let quota = Quota::with_period(period)?.allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}
