use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to microseconds, the precision PostgreSQL keeps for
/// `timestamptz`. Everything persisted goes through this so a value read back
/// compares equal to the value written.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
