//! Control arbiter: exclusive, time-limited input authority.
//!
//! Every viewer sees the UI, but at most one of them at a time may drive it.
//! That viewer holds the *control lease*.  The lease runs for a fixed slice
//! and is then handed on.
//!
//! # State machine
//!
//! ```text
//!                  request / auto-assign
//!   Unassigned ─────────────────────────────► Assigned(v, now + slice)
//!       ▲                                           │
//!       │  expiry / release / departure of v,       │ expiry / release / departure of v,
//!       │  no eligible successor                    │ successor v' found
//!       └───────────────────────────────────────────┤
//!                                                   ▼
//!                                       Assigned(v', now + slice)
//! ```
//!
//! The successor is the next *eligible* viewer after `v` in registration
//! order, wrapping around.  Which viewers are eligible depends on the
//! [`RotationPolicy`].
//!
//! # Invariant
//!
//! At every tick boundary at most one registered viewer has
//! `has_control == true`, and its id equals the lease holder.  The arbiter is
//! the only writer of `has_control`, and every transition goes through
//! [`ControlArbiter::grant`] or [`ControlArbiter::clear`], which update the
//! flag and the state together.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::registry::ConnectionRegistry;
use crate::domain::viewer::ViewerId;

/// Default lease slice.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(10);

/// Longest lease the arbiter will hand out; longer slices are clamped.
pub const MAX_LEASE: Duration = Duration::from_secs(24 * 60 * 60);

/// Which viewers rotation may hand control to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Only viewers that asked for control (and have not been served since).
    #[default]
    Claimants,
    /// Every registered viewer, in turn; control is assigned automatically
    /// whenever at least one viewer is connected.
    AllViewers,
}

/// Arbiter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Unassigned,
    Assigned { holder: ViewerId, expires_at: Instant },
}

/// Snapshot of the lease for display and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlLease {
    pub holder: Option<ViewerId>,
    pub expires_at: Option<Instant>,
}

/// Owns the control lease.
#[derive(Debug)]
pub struct ControlArbiter {
    state: ControlState,
    slice: Duration,
    policy: RotationPolicy,
    /// Viewers waiting for control (claimants policy only).
    claims: BTreeSet<ViewerId>,
}

impl ControlArbiter {
    /// `slice` is clamped to [`MAX_LEASE`].
    pub fn new(slice: Duration, policy: RotationPolicy) -> Self {
        if slice > MAX_LEASE {
            warn!(
                requested_secs = slice.as_secs(),
                max_secs = MAX_LEASE.as_secs(),
                "control lease clamped"
            );
        }
        Self {
            state: ControlState::Unassigned,
            slice: slice.min(MAX_LEASE),
            policy,
            claims: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    pub fn slice(&self) -> Duration {
        self.slice
    }

    pub fn lease(&self) -> ControlLease {
        match self.state {
            ControlState::Unassigned => ControlLease::default(),
            ControlState::Assigned { holder, expires_at } => ControlLease {
                holder: Some(holder),
                expires_at: Some(expires_at),
            },
        }
    }

    pub fn holder(&self) -> Option<ViewerId> {
        self.lease().holder
    }

    /// Time left on the current lease, for the countdown display.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.lease()
            .expires_at
            .map(|expires_at| expires_at.saturating_duration_since(now))
    }

    /// `true` if input from `viewer` should be applied.
    pub fn accepts_input(&self, viewer: ViewerId) -> bool {
        self.holder() == Some(viewer)
    }

    /// `true` if `viewer` has a pending claim.
    pub fn has_claim(&self, viewer: ViewerId) -> bool {
        self.claims.contains(&viewer)
    }

    /// Per-tick aging: rotates an expired lease and, under
    /// [`RotationPolicy::AllViewers`], assigns an idle lease.
    ///
    /// Called once per tick with the tick's timestamp, before the event
    /// batch is applied.
    pub fn tick(&mut self, now: Instant, registry: &mut ConnectionRegistry) {
        if let ControlState::Assigned { holder, expires_at } = self.state {
            if now >= expires_at {
                debug!(viewer = %holder, "control lease expired");
                self.rotate_from(holder, registry, now);
            }
        }

        if self.policy == RotationPolicy::AllViewers && self.state == ControlState::Unassigned {
            if let Some(first) = registry.list().first().map(|v| v.id) {
                self.grant(first, registry, now);
            }
        }
    }

    /// Handles a control request.
    ///
    /// Grants the lease if nobody holds it; otherwise records a pending
    /// claim.  Returns `true` if `viewer` holds the lease afterwards.
    pub fn request(
        &mut self,
        viewer: ViewerId,
        registry: &mut ConnectionRegistry,
        now: Instant,
    ) -> bool {
        if !registry.contains(viewer) {
            return false;
        }
        match self.state {
            ControlState::Unassigned => self.grant(viewer, registry, now),
            ControlState::Assigned { holder, .. } if holder == viewer => true,
            ControlState::Assigned { .. } => {
                if self.claims.insert(viewer) {
                    debug!(viewer = %viewer, "control claim queued");
                }
                false
            }
        }
    }

    /// Handles an explicit release.
    ///
    /// From the holder: hands the lease to the next eligible viewer (or
    /// unassigns it).  From anyone else: withdraws their pending claim.
    pub fn release(&mut self, viewer: ViewerId, registry: &mut ConnectionRegistry, now: Instant) {
        if self.accepts_input(viewer) {
            info!(viewer = %viewer, "control released");
            self.rotate_from(viewer, registry, now);
        } else {
            self.claims.remove(&viewer);
        }
    }

    /// Called right after `viewer` is registered.  Under
    /// [`RotationPolicy::AllViewers`] an idle lease goes to the newcomer.
    pub fn on_arrival(
        &mut self,
        viewer: ViewerId,
        registry: &mut ConnectionRegistry,
        now: Instant,
    ) {
        if self.policy == RotationPolicy::AllViewers && self.state == ControlState::Unassigned {
            self.grant(viewer, registry, now);
        }
    }

    /// Must be called while `viewer` is still registered, right before it is
    /// removed, so its position in the rotation order is still known.
    pub fn on_departure(
        &mut self,
        viewer: ViewerId,
        registry: &mut ConnectionRegistry,
        now: Instant,
    ) {
        self.claims.remove(&viewer);
        if self.accepts_input(viewer) {
            debug!(viewer = %viewer, "control holder departed");
            self.rotate_from(viewer, registry, now);
        }
    }

    /// `true` if the lease and the registry's `has_control` flags agree.
    pub fn is_consistent_with(&self, registry: &ConnectionRegistry) -> bool {
        let flagged: Vec<ViewerId> = registry
            .list()
            .iter()
            .filter(|v| v.has_control)
            .map(|v| v.id)
            .collect();
        match self.holder() {
            None => flagged.is_empty(),
            Some(holder) => flagged == [holder],
        }
    }

    fn is_eligible(&self, viewer: ViewerId) -> bool {
        match self.policy {
            RotationPolicy::Claimants => self.claims.contains(&viewer),
            RotationPolicy::AllViewers => true,
        }
    }

    fn rotate_from(&mut self, previous: ViewerId, registry: &mut ConnectionRegistry, now: Instant) {
        match registry.successor_of(previous, |id| self.is_eligible(id)) {
            Some(next) => {
                self.grant(next, registry, now);
            }
            None => self.clear(registry),
        }
    }

    /// Returns `false` (leaving control unassigned) if the deadline is not
    /// representable.
    fn grant(&mut self, viewer: ViewerId, registry: &mut ConnectionRegistry, now: Instant) -> bool {
        let Some(expires_at) = now.checked_add(self.slice) else {
            warn!(viewer = %viewer, "lease deadline out of range, control not granted");
            self.clear(registry);
            return false;
        };
        if let Some(previous) = self.holder() {
            registry.set_control(previous, false);
        }
        registry.set_control(viewer, true);
        self.claims.remove(&viewer);
        self.state = ControlState::Assigned {
            holder: viewer,
            expires_at,
        };
        info!(viewer = %viewer, lease_secs = self.slice.as_secs_f32(), "control granted");
        true
    }

    fn clear(&mut self, registry: &mut ConnectionRegistry) {
        if let Some(previous) = self.holder() {
            registry.set_control(previous, false);
        }
        self.state = ControlState::Unassigned;
    }
}

impl Default for ControlArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE, RotationPolicy::default())
    }
}
