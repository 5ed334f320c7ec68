use chrono::{DateTime, Duration, Utc};

use crate::models::Session;

/// Push `expires_at` forward by `delta`
pub fn extend_expiration(session: &mut Session, delta: Duration) {
    session.expires_at += delta;
}

/// Append a participant. Capacity is checked by the caller.
pub fn add_participant(session: &mut Session, participant_id: impl Into<String>) {
    session.participants.push(participant_id.into());
}

/// Whole seconds until the session expires, floored and never negative.
/// Zero means the session is already gone.
pub fn remaining_ttl_secs(session: &Session, now: DateTime<Utc>) -> u64 {
    (session.expires_at - now).num_seconds().max(0) as u64
}
