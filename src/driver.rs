//! Frame driver
//!
//! A thin shell around [`tick`]: the host calls [`Driver::on_frame`] once per
//! display refresh and reschedules only when told to continue. Cancellation is
//! checked before any state is touched, so a callback queued before teardown
//! is a harmless no-op.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::Viewport;
use crate::error::{SimError, SimResult};
use crate::sim::{BodyPosition, BurstTrigger, SimState, TickInput, TickResult, tick};
use crate::tuning::Tuning;

/// Rendering/presentation side of the loop
pub trait FrameHost {
    /// Current drawable area; `None` when there is no display to draw on
    fn viewport(&self) -> Option<Viewport>;
    /// Receives the body placements once per tick
    fn publish_positions(&mut self, positions: &[BodyPosition]);
    /// Receives the bodies newly marked for bursting once per tick
    fn publish_bursts(&mut self, bursts: &[BurstTrigger]);
}

/// Sound-effect hook; failures are logged and otherwise ignored
pub trait SoundHook {
    fn play_pop(&mut self, radius: f32) -> SimResult<()>;
}

/// Silent hook for headless hosts and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSound;

impl SoundHook for NoSound {
    fn play_pop(&mut self, _radius: f32) -> SimResult<()> {
        Ok(())
    }
}

/// Shared cancellation flag (single-threaded)
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// What the host should do after a frame callback
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Ticked; schedule the next frame
    Continue(TickResult),
    /// No host/viewport right now; state untouched, try again next frame
    Inert,
    /// Torn down; do not reschedule
    Cancelled,
}

/// Drives one [`SimState`] from host frame callbacks
pub struct Driver<H: FrameHost, S: SoundHook> {
    host: H,
    sound: S,
    seed: u64,
    tuning: Tuning,
    token: CancelToken,
    state: Option<SimState>,
}

impl<H: FrameHost, S: SoundHook> Driver<H, S> {
    pub fn new(host: H, sound: S, seed: u64, tuning: Tuning) -> Self {
        Self {
            host,
            sound,
            seed,
            tuning,
            token: CancelToken::default(),
            state: None,
        }
    }

    /// Spawn the first wave. Without a usable viewport the loop stays inert.
    pub fn start(&mut self) -> SimResult<()> {
        if self.token.is_cancelled() {
            return Err(SimError::HostUnavailable);
        }
        let viewport = self.host.viewport().ok_or(SimError::HostUnavailable)?;
        let viewport = Viewport::new(viewport.width, viewport.height)?;
        self.state = Some(SimState::new(self.seed, viewport, self.tuning.clone()));
        log::info!(
            "Bubble field started at {}x{} (seed {})",
            viewport.width,
            viewport.height,
            self.seed
        );
        Ok(())
    }

    /// Handle one display-refresh callback
    pub fn on_frame(&mut self, now_ms: f64) -> FrameOutcome {
        if self.token.is_cancelled() {
            return FrameOutcome::Cancelled;
        }
        let Some(viewport) = self.host.viewport().and_then(|v| Viewport::new(v.width, v.height).ok())
        else {
            return FrameOutcome::Inert;
        };
        let Some(state) = self.state.as_mut() else {
            return FrameOutcome::Inert;
        };

        let result = tick(state, &TickInput { now_ms, viewport });
        self.host.publish_positions(&result.positions);
        if !result.bursts.is_empty() {
            self.host.publish_bursts(&result.bursts);
            for burst in &result.bursts {
                play(&mut self.sound, burst.radius);
            }
        }
        FrameOutcome::Continue(result)
    }

    /// External "subscription succeeded" signal
    pub fn subscription_succeeded(&mut self, now_ms: f64) {
        if let Some(state) = self.live_state() {
            state.energy.activate(now_ms);
        }
    }

    /// Direct tap on a bubble; the trigger is published right away
    pub fn tap(&mut self, id: u32) -> Option<BurstTrigger> {
        let trigger = self.live_state()?.tap(id)?;
        self.host.publish_bursts(&[trigger]);
        play(&mut self.sound, trigger.radius);
        Some(trigger)
    }

    /// The renderer has scheduled the burst animation for `id`
    pub fn acknowledge(&mut self, id: u32, now_ms: f64) -> bool {
        self.live_state()
            .is_some_and(|state| state.acknowledge_burst(id, now_ms))
    }

    /// Tear down unconditionally: flag, bodies, walls and contacts
    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(mut state) = self.state.take() {
            state.registry.destroy_wave();
            state.contacts.clear();
            log::info!("Bubble field stopped at wave {}", state.wave.index);
        }
    }

    /// Handle for cancelling from outside the frame callback
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn state(&self) -> Option<&SimState> {
        self.state.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn live_state(&mut self) -> Option<&mut SimState> {
        if self.token.is_cancelled() {
            return None;
        }
        self.state.as_mut()
    }
}

/// Single-threaded home for a [`Driver`] whose host callbacks may re-enter.
///
/// A frame holds the driver while it publishes. Anything the page asks for
/// during that window (acknowledge, stop, restart) is parked here and applied
/// by [`DriverSlot::settle`] once the frame returns.
pub struct DriverSlot<H: FrameHost, S: SoundHook> {
    current: RefCell<Option<Driver<H, S>>>,
    /// Started while a frame held `current`
    next: RefCell<Option<Driver<H, S>>>,
    /// Token of the most recently installed driver
    active: Cell<Option<CancelToken>>,
    deferred_acks: RefCell<Vec<u32>>,
    teardown_pending: Cell<bool>,
}

impl<H: FrameHost, S: SoundHook> Default for DriverSlot<H, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: FrameHost, S: SoundHook> DriverSlot<H, S> {
    pub const fn new() -> Self {
        Self {
            current: RefCell::new(None),
            next: RefCell::new(None),
            active: Cell::new(None),
            deferred_acks: RefCell::new(Vec::new()),
            teardown_pending: Cell::new(false),
        }
    }

    /// Run `f` on the installed driver; `None` if empty or busy
    pub fn with<R>(&self, f: impl FnOnce(&mut Driver<H, S>) -> R) -> Option<R> {
        self.current.try_borrow_mut().ok()?.as_mut().map(f)
    }

    /// Install a started driver. Returns its token when it can be scheduled
    /// right away; from inside a frame it is swapped in by `settle` instead.
    pub fn install(&self, driver: Driver<H, S>) -> Option<CancelToken> {
        let token = driver.token();
        self.active.set(Some(token.clone()));
        match self.current.try_borrow_mut() {
            Ok(mut slot) => {
                *slot = Some(driver);
                Some(token)
            }
            Err(_) => {
                if let Some(mut superseded) = self.next.replace(Some(driver)) {
                    superseded.cancel();
                }
                None
            }
        }
    }

    /// Cancel and drop the driver. Acknowledgments still queued belong to the
    /// old session and are discarded.
    pub fn stop(&self) {
        if let Some(token) = self.active.take() {
            token.cancel();
        }
        self.deferred_acks.take();
        if let Some(mut next) = self.next.take() {
            next.cancel();
        }
        match self.current.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(mut driver) = slot.take() {
                    driver.cancel();
                }
            }
            Err(_) => self.teardown_pending.set(true),
        }
    }

    /// Acknowledge now, or queue it if a frame holds the driver
    pub fn acknowledge(&self, id: u32, now_ms: f64) -> bool {
        match self.current.try_borrow_mut() {
            Ok(mut slot) => slot.as_mut().is_some_and(|d| d.acknowledge(id, now_ms)),
            Err(_) => {
                self.deferred_acks.borrow_mut().push(id);
                false
            }
        }
    }

    /// Apply parked requests after a frame. Returns the token of a driver
    /// that was swapped in and needs its first frame scheduled.
    pub fn settle(&self, now_ms: f64) -> Option<CancelToken> {
        let acks = self.deferred_acks.take();
        if !acks.is_empty() {
            self.with(|d| {
                for id in acks {
                    d.acknowledge(id, now_ms);
                }
            });
        }

        if self.teardown_pending.replace(false)
            && let Ok(mut slot) = self.current.try_borrow_mut()
            && let Some(mut old) = slot.take()
        {
            old.cancel();
        }

        let mut next = self.next.take()?;
        let token = next.token();
        match self.current.try_borrow_mut() {
            Ok(mut slot) => {
                *slot = Some(next);
                Some(token)
            }
            Err(_) => {
                log::warn!("Restart dropped: driver still busy");
                next.cancel();
                None
            }
        }
    }
}

fn play<S: SoundHook>(sound: &mut S, radius: f32) {
    if let Err(e) = sound.play_pop(radius) {
        log::warn!("{}", e);
    }
}
