//! Derives [`MarketSession`] from wall-clock time in a named exchange
//! timezone (spec.md §3/§9). The Python original approximated this with
//! a fixed UTC offset; this port resolves the spec's open question by
//! naming the real IANA zone (`America/New_York`) via `chrono-tz`.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::types::MarketSession;

pub fn current_session(now: DateTime<Utc>, exchange_tz: &Tz) -> MarketSession {
    let local = now.with_timezone(exchange_tz);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketSession::Closed;
    }

    let minutes_since_midnight = local.hour() as i32 * 60 + local.minute() as i32;

    // Standard NYSE session boundaries, all in exchange-local time.
    const PREMARKET_START: i32 = 4 * 60; // 04:00
    const REGULAR_START: i32 = 9 * 60 + 30; // 09:30
    const REGULAR_END: i32 = 16 * 60; // 16:00
    const AFTERHOURS_END: i32 = 20 * 60; // 20:00

    if minutes_since_midnight < PREMARKET_START {
        MarketSession::Closed
    } else if minutes_since_midnight < REGULAR_START {
        MarketSession::Premarket
    } else if minutes_since_midnight < REGULAR_END {
        MarketSession::Regular
    } else if minutes_since_midnight < AFTERHOURS_END {
        MarketSession::Afterhours
    } else {
        MarketSession::Closed
    }
}

pub fn parse_exchange_tz(name: &str) -> Tz {
    name.parse().unwrap_or(chrono_tz::America::New_York)
}
