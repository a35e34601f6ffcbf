/*
 *  remote/lock.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Time-leased exclusive control lock
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{LockRequest, LockResponse};
use crate::constants::LOCK_TIMEOUT_SECS;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Lease {
    holder: String,
    renewed_at: Instant,
}

/// Grants one client at a time the right to change what is shown.
///
/// Leases are only checked when referenced: a lapsed lease stays in
/// place until a request or an authorization check notices it.
#[derive(Debug, Clone)]
pub struct LockArbiter {
    lease: Option<Lease>,
    timeout: Duration,
}

impl Default for LockArbiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(LOCK_TIMEOUT_SECS))
    }
}

impl LockArbiter {
    pub fn new(timeout: Duration) -> Self {
        Self { lease: None, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_locked(&self) -> bool {
        self.lease.is_some()
    }

    pub fn holder(&self) -> Option<&str> {
        self.lease.as_ref().map(|l| l.holder.as_str())
    }

    pub fn is_held_by(&self, client_id: &str) -> bool {
        self.holder() == Some(client_id)
    }

    fn expired(&self, lease: &Lease, now: Instant) -> bool {
        now.saturating_duration_since(lease.renewed_at) > self.timeout
    }

    /// Seconds left on the lease, floored; negative once overdue
    pub fn time_remaining(&self, now: Instant) -> Option<i64> {
        self.lease.as_ref().map(|l| {
            let elapsed_ms = now.saturating_duration_since(l.renewed_at).as_millis() as i64;
            (self.timeout.as_millis() as i64 - elapsed_ms).div_euclid(1000)
        })
    }

    /// Drop a lapsed lease. Returns the holder that lost it.
    pub fn expire_stale(&mut self, now: Instant) -> Option<String> {
        let lapsed = self.lease.as_ref().is_some_and(|l| self.expired(l, now));
        if !lapsed {
            return None;
        }
        let holder = self.lease.take().map(|l| l.holder)?;
        warn!("Client lock timed out for: {}", holder);
        Some(holder)
    }

    /// Gate for content changes: expires a lapsed lease first, then
    /// grants only the current holder.
    pub fn authorize(&mut self, client_id: Option<&str>, now: Instant) -> (bool, Option<String>) {
        let expired = self.expire_stale(now);
        let granted = match client_id {
            Some(id) if !id.is_empty() => self.is_held_by(id),
            _ => false,
        };
        (granted, expired)
    }

    /// Apply a lock request. `None` means no response is published.
    pub fn handle_request(&mut self, request: &LockRequest, now: Instant) -> Option<LockResponse> {
        let client_id = match request.client_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!("Missing client ID in lock request");
                return Some(self.respond(None, false, Some("Missing client ID".into()), now));
            }
        };

        match request.action.as_deref() {
            Some("lock") => {
                let success = self.acquire(client_id, now);
                let message = (!success).then(|| "Locked by another client".to_string());
                Some(self.respond(Some(client_id), success, message, now))
            }
            Some("unlock") => {
                if self.is_held_by(client_id) {
                    self.lease = None;
                    info!("Device unlocked by client: {}", client_id);
                    Some(self.respond(Some(client_id), true, None, now))
                } else {
                    Some(self.respond(Some(client_id), false, Some("Not authorized to unlock".into()), now))
                }
            }
            Some("heartbeat") => {
                let Some(lease) = self.lease.as_mut().filter(|l| l.holder == client_id) else {
                    debug!("Heartbeat from {} ignored, not the lock holder", client_id);
                    return None;
                };
                lease.renewed_at = now;
                Some(self.respond(Some(client_id), true, None, now))
            }
            other => {
                let action = other.unwrap_or("");
                warn!("Unknown lock action: {}", action);
                Some(self.respond(Some(client_id), false, Some(format!("Unknown action: {}", action)), now))
            }
        }
    }

    fn acquire(&mut self, client_id: &str, now: Instant) -> bool {
        if let Some(l) = self.lease.as_mut().filter(|l| l.holder == client_id) {
            l.renewed_at = now;
            return true;
        }
        if let Some(l) = &self.lease {
            if !self.expired(l, now) {
                return false;
            }
            info!("Stale lock of {} reclaimed", l.holder);
        }
        self.lease = Some(Lease { holder: client_id.to_string(), renewed_at: now });
        info!("Device locked by client: {}", client_id);
        true
    }

    /// A response reflecting the lock state after the request
    pub fn respond(&self, client_id: Option<&str>, success: bool, message: Option<String>, now: Instant) -> LockResponse {
        LockResponse {
            client_id: client_id.map(str::to_string),
            success,
            locked: self.is_locked(),
            message,
            locked_by: self.holder().map(str::to_string),
            time_remaining: self.time_remaining(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(action: &str, client: &str) -> LockRequest {
        LockRequest { action: Some(action.into()), client_id: Some(client.into()) }
    }

    #[test]
    fn test_unlocked_lock_grants() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        let r = l.handle_request(&req("lock", "A"), t0).unwrap();
        assert!(r.success);
        assert!(r.locked);
        assert_eq!(r.locked_by.as_deref(), Some("A"));
        assert_eq!(r.time_remaining, Some(300));
    }

    #[test]
    fn test_other_client_denied_while_fresh() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        l.handle_request(&req("lock", "A"), t0);
        let r = l.handle_request(&req("lock", "B"), t0 + Duration::from_secs(240)).unwrap();
        assert!(!r.success);
        assert_eq!(l.holder(), Some("A"));
        // exactly at the timeout the lease still holds
        let r = l.handle_request(&req("lock", "B"), t0 + Duration::from_secs(300)).unwrap();
        assert!(!r.success);
    }

    #[test]
    fn test_stale_lease_reclaimed() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        l.handle_request(&req("lock", "A"), t0);
        let r = l.handle_request(&req("lock", "B"), t0 + Duration::from_secs(301)).unwrap();
        assert!(r.success);
        assert_eq!(l.holder(), Some("B"));
    }

    #[test]
    fn test_holder_relock_refreshes() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        l.handle_request(&req("lock", "A"), t0);
        let t1 = t0 + Duration::from_secs(200);
        assert!(l.handle_request(&req("lock", "A"), t1).unwrap().success);
        assert_eq!(l.time_remaining(t1), Some(300));
    }

    #[test]
    fn test_unlock_rules() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        l.handle_request(&req("lock", "A"), t0);
        let r = l.handle_request(&req("unlock", "B"), t0).unwrap();
        assert!(!r.success);
        assert_eq!(r.message.as_deref(), Some("Not authorized to unlock"));
        assert!(l.is_locked());

        let r = l.handle_request(&req("unlock", "A"), t0).unwrap();
        assert!(r.success);
        assert!(!r.locked);
        assert!(r.locked_by.is_none());
    }

    #[test]
    fn test_heartbeat_silence_for_non_holder() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        assert!(l.handle_request(&req("heartbeat", "A"), t0).is_none());
        l.handle_request(&req("lock", "A"), t0);
        assert!(l.handle_request(&req("heartbeat", "B"), t0).is_none());

        let t1 = t0 + Duration::from_secs(100);
        let r = l.handle_request(&req("heartbeat", "A"), t1).unwrap();
        assert!(r.success);
        assert_eq!(r.time_remaining, Some(300));
    }

    #[test]
    fn test_missing_client_and_unknown_action() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        let r = l.handle_request(&LockRequest { action: Some("lock".into()), client_id: None }, t0).unwrap();
        assert!(!r.success);
        assert!(r.client_id.is_none());
        assert!(!l.is_locked());

        let r = l.handle_request(&req("steal", "A"), t0).unwrap();
        assert!(!r.success);
        assert_eq!(r.message.as_deref(), Some("Unknown action: steal"));
    }

    #[test]
    fn test_time_remaining_goes_negative_until_noticed() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        l.handle_request(&req("lock", "A"), t0);
        let late = t0 + Duration::from_millis(302_500);
        assert_eq!(l.time_remaining(late), Some(-3));
        assert!(l.is_locked());

        let (granted, expired) = l.authorize(Some("A"), late);
        assert!(!granted);
        assert_eq!(expired.as_deref(), Some("A"));
        assert!(!l.is_locked());
    }

    #[test]
    fn test_authorize_only_holder() {
        let mut l = LockArbiter::default();
        let t0 = Instant::now();
        assert_eq!(l.authorize(Some("A"), t0), (false, None));
        l.handle_request(&req("lock", "A"), t0);
        assert_eq!(l.authorize(Some("A"), t0), (true, None));
        assert_eq!(l.authorize(Some("B"), t0), (false, None));
        assert_eq!(l.authorize(None, t0), (false, None));
    }
}
