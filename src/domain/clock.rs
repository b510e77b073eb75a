//! Modification timestamps.

use chrono::{DateTime, Duration, Utc};

/// Next modification time after `previous`.
///
/// Always strictly greater than `previous`, even when the wall clock has not
/// advanced (or went backwards) since the last mutation.
pub(crate) fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}
