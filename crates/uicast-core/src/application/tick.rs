//! The tick loop: the single thread that owns all shared UI state.
//!
//! # Per-tick order
//!
//! ```text
//!  now ─► age lease ─► drain intake ─► apply events in order ─► ui.update
//!                                                                  │
//!        pacer.wait ◄── broadcast ◄── render ◄── (viewers > 0?) ◄──┘
//! ```
//!
//! 1. The tick's timestamp is captured once.  Every lease decision in the
//!    tick is made against it.
//! 2. The arbiter ages the lease.  An expired lease rotates before any of
//!    this tick's events are looked at.
//! 3. The intake is drained in one step and the batch is applied strictly
//!    in arrival order.  Input from anyone but the lease holder is dropped.
//! 4. The UI state gets its per-tick update (pin snapshot and similar).
//!    This runs with or without viewers.
//! 5. With at least one viewer registered, the render driver produces a
//!    frame and the broadcaster fans it out.  With none, rendering and
//!    broadcast are skipped (idle throttle).  A driver that fails to
//!    produce a frame skips the broadcast too, without using up a sequence
//!    number.
//! 6. The pacer sleeps until the next boundary.
//!
//! All of this state lives in one [`TickContext`] passed by `&mut`, so no
//! step needs a lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::application::arbiter::{ControlArbiter, ControlLease, RotationPolicy, DEFAULT_LEASE};
use crate::application::broadcaster::FrameBroadcaster;
use crate::application::registry::{ConnectionRegistry, ViewerCount};
use crate::channel::intake::{EventIntake, IntakeSender};
use crate::domain::event::{InboundEvent, InputPayload};
use crate::domain::frame::{BootstrapAsset, Frame};
use crate::domain::viewer::{Viewer, ViewerId, ViewerIdAllocator};
use crate::protocol::codec::CodecError;
use crate::timing::pacer::{Pacer, PacerError, DEFAULT_FPS};

/// The mutable UI model driven by the lease holder's input.
pub trait UiState {
    /// Applies one input event.  Only called for the current lease holder.
    fn apply_input(&mut self, viewer: ViewerId, input: &InputPayload);

    /// Called once per tick after the event batch, with or without viewers.
    fn update(&mut self, _now: Instant) {}
}

/// What the renderer may read besides the UI state itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderView<'a> {
    /// Seconds since the previous tick.
    pub delta_seconds: f32,
    /// Registered viewers in registration order.
    pub viewers: &'a [Viewer],
    pub lease: ControlLease,
    /// Countdown until the current lease expires.
    pub control_remaining: Option<Duration>,
    /// Sequence number the rendered frame will carry.
    pub sequence: u64,
}

/// Turns UI state into an opaque draw-command blob.
pub trait RenderDriver<S> {
    /// One-time texture upload sent to each viewer on connect.
    fn bootstrap_asset(&self) -> Option<BootstrapAsset>;

    /// Returns `None` if no frame could be produced; the tick then sends
    /// nothing and viewers keep showing the previous frame.
    fn render(&mut self, state: &S, view: &RenderView<'_>) -> Option<Vec<u8>>;
}

#[derive(Debug, Error)]
pub enum TickError {
    #[error("invalid schedule: {0}")]
    Pacer(#[from] PacerError),

    #[error("bootstrap asset cannot be encoded: {0}")]
    Bootstrap(#[from] CodecError),
}

/// Tick-loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickConfig {
    pub fps: f64,
    pub lease: Duration,
    pub rotation: RotationPolicy,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            lease: DEFAULT_LEASE,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Everything one tick mutates.
#[derive(Debug)]
pub struct TickContext<S> {
    pub registry: ConnectionRegistry,
    pub arbiter: ControlArbiter,
    pub ui: S,
    pub broadcaster: FrameBroadcaster,
}

impl<S: UiState> TickContext<S> {
    /// Applies one inbound event.
    pub fn apply(&mut self, event: InboundEvent, now: Instant) {
        trace!(viewer = %event.viewer(), kind = event.kind(), "applying event");
        match event {
            InboundEvent::Connect {
                viewer,
                address,
                outbound,
            } => {
                if let Err(e) = self.registry.register_with_id(viewer, address.as_str(), now) {
                    warn!(error = %e, "connect ignored");
                    return;
                }
                if self.broadcaster.attach(viewer, outbound).is_err() {
                    debug!(viewer = %viewer, "viewer closed before attach");
                    self.unregister_viewer(viewer, now);
                    return;
                }
                self.arbiter.on_arrival(viewer, &mut self.registry, now);
                info!(
                    viewer = %viewer,
                    address = %address,
                    viewers = self.registry.count(),
                    "viewer connected"
                );
            }
            InboundEvent::Disconnect { viewer } => {
                self.unregister_viewer(viewer, now);
            }
            InboundEvent::Input { viewer, payload } => {
                if self.arbiter.accepts_input(viewer) {
                    self.ui.apply_input(viewer, &payload);
                } else {
                    trace!(viewer = %viewer, "input from spectator dropped");
                }
            }
            InboundEvent::RequestControl { viewer } => {
                self.arbiter.request(viewer, &mut self.registry, now);
            }
            InboundEvent::ReleaseControl { viewer } => {
                self.arbiter.release(viewer, &mut self.registry, now);
            }
            InboundEvent::BootstrapRequest { viewer } => {
                if self.broadcaster.resend_bootstrap(viewer).is_err() {
                    self.unregister_viewer(viewer, now);
                }
            }
        }
    }

    /// Removes a viewer everywhere, rotating control first if it held the
    /// lease.  Returns `false` if the viewer was not registered.
    pub fn unregister_viewer(&mut self, viewer: ViewerId, now: Instant) -> bool {
        self.broadcaster.detach(viewer);
        if !self.registry.contains(viewer) {
            return false;
        }
        self.arbiter.on_departure(viewer, &mut self.registry, now);
        self.registry.unregister(viewer);
        info!(viewer = %viewer, viewers = self.registry.count(), "viewer disconnected");
        true
    }
}

/// Result of one [`TickLoop::run_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No viewers: nothing rendered or sent.
    Idle,
    /// The render driver produced no frame; nothing was sent.
    Skipped,
    Rendered {
        sequence: u64,
        delivered: usize,
        /// Viewers dropped because their outbound slot was closed.
        evicted: usize,
    },
}

/// Owns the tick thread's state and runs it at a fixed rate.
pub struct TickLoop<S, R> {
    context: TickContext<S>,
    renderer: R,
    intake: EventIntake,
    pacer: Pacer,
    next_sequence: u64,
    idle: bool,
}

impl<S: UiState, R: RenderDriver<S>> TickLoop<S, R> {
    /// Builds the loop.  `ids` is shared with the accept workers so they can
    /// name a viewer before it is registered.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] for an invalid frame rate or an unencodable
    /// bootstrap asset.
    pub fn new(
        config: TickConfig,
        ui: S,
        renderer: R,
        ids: Arc<ViewerIdAllocator>,
    ) -> Result<Self, TickError> {
        let pacer = Pacer::new(config.fps)?;
        let broadcaster = FrameBroadcaster::new(renderer.bootstrap_asset())?;
        Ok(Self {
            context: TickContext {
                registry: ConnectionRegistry::with_allocator(ids),
                arbiter: ControlArbiter::new(config.lease, config.rotation),
                ui,
                broadcaster,
            },
            renderer,
            intake: EventIntake::new(),
            pacer,
            next_sequence: 1,
            idle: true,
        })
    }

    /// A producer handle for the I/O workers.
    pub fn intake_sender(&self) -> IntakeSender {
        self.intake.sender()
    }

    pub fn viewer_count(&self) -> ViewerCount {
        self.context.registry.count_handle()
    }

    pub fn context(&self) -> &TickContext<S> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut TickContext<S> {
        &mut self.context
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Runs one tick at `now`, without pacing.
    pub fn run_tick(&mut self, now: Instant) -> TickOutcome {
        let delta_seconds = self.pacer.delta_seconds();

        self.context.arbiter.tick(now, &mut self.context.registry);
        for event in self.intake.drain() {
            self.context.apply(event, now);
        }
        self.context.ui.update(now);

        let outcome = if self.context.registry.is_empty() {
            if !self.idle {
                info!("no viewers connected, rendering paused");
            }
            self.idle = true;
            TickOutcome::Idle
        } else {
            if self.idle {
                info!("viewer present, rendering resumed");
            }
            self.idle = false;
            self.render_and_broadcast(now, delta_seconds)
        };

        debug_assert!(self.context.arbiter.is_consistent_with(&self.context.registry));
        outcome
    }

    /// Ticks until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            interval_us = self.pacer.interval().as_micros() as u64,
            "tick loop started"
        );
        while running.load(Ordering::SeqCst) {
            self.run_tick(Instant::now());
            self.pacer.wait();
        }
        info!(frames = self.frames_rendered(), "tick loop stopped");
    }

    fn render_and_broadcast(&mut self, now: Instant, delta_seconds: f32) -> TickOutcome {
        let sequence = self.next_sequence;

        let arbiter = &self.context.arbiter;
        let view = RenderView {
            delta_seconds,
            viewers: self.context.registry.list(),
            lease: arbiter.lease(),
            control_remaining: arbiter.remaining(now),
            sequence,
        };
        let Some(draw_data) = self.renderer.render(&self.context.ui, &view) else {
            debug!(sequence, "render produced no frame, broadcast skipped");
            return TickOutcome::Skipped;
        };
        self.next_sequence += 1;
        let frame = Frame {
            sequence,
            draw_data,
        };

        let report = match self.context.broadcaster.broadcast(&frame) {
            Ok(report) => report,
            Err(e) => {
                warn!(sequence, error = %e, "frame dropped");
                return TickOutcome::Rendered {
                    sequence,
                    delivered: 0,
                    evicted: 0,
                };
            }
        };
        for viewer in &report.failed {
            self.context.unregister_viewer(*viewer, now);
        }

        TickOutcome::Rendered {
            sequence,
            delivered: report.delivered,
            evicted: report.failed.len(),
        }
    }
}
