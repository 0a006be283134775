use railstream_common::{DoorId, DoorState, SectionIndex};
use railstream_kernel::GameplayEvent;
use serde::{Deserialize, Serialize};

use crate::provider::StreamingProvider;
use crate::window::SectionStreamer;

/// Door families; each has its own opening animation length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoorCategory {
    #[default]
    Standard,
    Bulkhead,
    Security,
    Emergency,
    Exterior,
}

impl DoorCategory {
    /// Opening animation length in seconds.
    pub fn animation_duration(self) -> f32 {
        match self {
            Self::Standard => 0.8,
            Self::Bulkhead => 2.0,
            Self::Security => 1.5,
            Self::Emergency => 1.2,
            Self::Exterior => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    pub category: DoorCategory,
    pub destination: Option<SectionIndex>,
    /// Replaces the category duration when greater than zero.
    pub duration_override: f32,
    /// Fraction of the opening animation at which the destination load is
    /// requested.
    pub streaming_trigger_threshold: f32,
    /// Seconds to wait at full open before the fade fallback.
    pub max_load_wait: f32,
    pub allow_fallback: bool,
    pub fade_duration: f32,
    /// Seconds the door stays open before closing on its own.
    pub open_dwell: f32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            category: DoorCategory::Standard,
            destination: None,
            duration_override: 0.0,
            streaming_trigger_threshold: 0.75,
            max_load_wait: 1.0,
            allow_fallback: true,
            fade_duration: 0.5,
            open_dwell: 2.0,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DoorError {
    #[error("door is {state:?}; transitions start from Closed")]
    NotClosed { state: DoorState },
    #[error("door has no destination section")]
    NoDestination,
    #[error("destination section {0} is not registered")]
    UnknownDestination(SectionIndex),
    #[error("door is already closed")]
    AlreadyClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fade {
    Clear,
    FadingOut,
    Opaque,
    FadingIn,
}

/// Drives one doorway's animation and keeps it in step with streaming of
/// the section behind it.
///
/// The destination is requested once the animation passes the trigger
/// threshold. If the section still is not resident when the door is fully
/// open the door waits, and after `max_load_wait` fades the screen out.
/// A door whose fade reaches opaque before the load lands completes to
/// `Open` behind the opaque screen and fades back in once the destination
/// is resident.
#[derive(Debug)]
pub struct DoorTransition {
    id: DoorId,
    config: DoorConfig,
    state: DoorState,
    /// Destination of the running transition, fixed at `begin_transition`.
    target: Option<SectionIndex>,
    timer: f32,
    wait_timer: f32,
    dwell_timer: f32,
    /// Time spent open behind the opaque fade.
    hold_timer: f32,
    destination_ready: bool,
    streaming_triggered: bool,
    fallback_fired: bool,
    holds_mask: bool,
    fade: Fade,
    fade_alpha: f32,
    events: Vec<GameplayEvent>,
}

impl DoorTransition {
    pub fn new(id: DoorId, config: DoorConfig) -> Self {
        Self {
            id,
            config,
            state: DoorState::Closed,
            target: None,
            timer: 0.0,
            wait_timer: 0.0,
            dwell_timer: 0.0,
            hold_timer: 0.0,
            destination_ready: false,
            streaming_triggered: false,
            fallback_fired: false,
            holds_mask: false,
            fade: Fade::Clear,
            fade_alpha: 0.0,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> DoorId {
        self.id
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn config(&self) -> &DoorConfig {
        &self.config
    }

    pub fn destination(&self) -> Option<SectionIndex> {
        self.config.destination
    }

    /// Takes effect at the next `begin_transition`; a running transition
    /// keeps the destination it started with.
    pub fn set_destination(&mut self, destination: Option<SectionIndex>) {
        self.config.destination = destination;
    }

    pub fn animation_duration(&self) -> f32 {
        if self.config.duration_override > 0.0 {
            self.config.duration_override
        } else {
            self.config.category.animation_duration()
        }
    }

    /// Start opening. Only legal from `Closed` with a registered destination.
    pub fn begin_transition<P: StreamingProvider>(
        &mut self,
        streamer: &SectionStreamer<P>,
    ) -> Result<(), DoorError> {
        if self.state != DoorState::Closed {
            return Err(DoorError::NotClosed { state: self.state });
        }
        let destination = self.config.destination.ok_or(DoorError::NoDestination)?;
        if !streamer.registry().contains(destination) {
            return Err(DoorError::UnknownDestination(destination));
        }

        self.reset();
        self.target = Some(destination);
        self.destination_ready = streamer.is_section_ready(destination);
        tracing::debug!(
            door = self.id.0,
            %destination,
            ready = self.destination_ready,
            "door transition started"
        );
        self.set_state(DoorState::Opening);
        Ok(())
    }

    /// Abort the transition from any state but `Closed`. Releases the load
    /// mask if this door set it; an in-flight load is left to finish.
    pub fn cancel_transition<P: StreamingProvider>(
        &mut self,
        streamer: &mut SectionStreamer<P>,
    ) -> Result<(), DoorError> {
        if self.state == DoorState::Closed {
            return Err(DoorError::AlreadyClosed);
        }
        self.release_mask(streamer);
        self.reset();
        tracing::debug!(door = self.id.0, "door transition cancelled");
        self.set_state(DoorState::Closed);
        Ok(())
    }

    pub fn tick<P: StreamingProvider>(&mut self, dt: f32, streamer: &mut SectionStreamer<P>) {
        let Some(destination) = self.target else {
            return;
        };

        match self.state {
            DoorState::Closed => {}
            DoorState::Opening => {
                self.timer += dt;
                let progress = self.timer / self.animation_duration();
                if !self.streaming_triggered
                    && progress >= self.config.streaming_trigger_threshold
                {
                    self.trigger_streaming(destination, streamer);
                }
                self.poll_destination(destination, streamer);

                if progress >= 1.0 {
                    if self.destination_ready {
                        self.complete(streamer);
                    } else {
                        self.wait_timer = 0.0;
                        self.set_state(DoorState::WaitingForLoad);
                    }
                }
            }
            DoorState::WaitingForLoad => {
                self.wait_timer += dt;
                self.poll_destination(destination, streamer);
                if self.destination_ready {
                    self.complete(streamer);
                    return;
                }

                self.advance_fade(dt);
                if self.fade == Fade::Opaque {
                    tracing::debug!(door = self.id.0, "door opened behind fade; load still pending");
                    self.complete(streamer);
                    return;
                }

                if self.config.allow_fallback
                    && !self.fallback_fired
                    && self.wait_timer >= self.config.max_load_wait
                {
                    self.fallback_fired = true;
                    self.fade = Fade::FadingOut;
                    tracing::warn!(
                        door = self.id.0,
                        %destination,
                        waited = self.wait_timer,
                        "destination not loaded; fading out"
                    );
                    self.events.push(GameplayEvent::DoorFallbackTriggered {
                        door: self.id,
                        destination,
                    });
                }
            }
            DoorState::Open => {
                self.poll_destination(destination, streamer);
                if self.destination_ready && matches!(self.fade, Fade::FadingOut | Fade::Opaque) {
                    self.fade = Fade::FadingIn;
                }
                if self.fade == Fade::Opaque {
                    self.hold_timer += dt;
                    if self.hold_timer >= self.config.max_load_wait {
                        tracing::warn!(
                            door = self.id.0,
                            %destination,
                            held = self.hold_timer,
                            "destination still not loaded; fading back in"
                        );
                        self.fade = Fade::FadingIn;
                    }
                }
                self.advance_fade(dt);

                if matches!(self.fade, Fade::Clear | Fade::FadingIn) {
                    self.dwell_timer += dt;
                    if self.dwell_timer >= self.config.open_dwell {
                        self.timer = 0.0;
                        self.set_state(DoorState::Closing);
                    }
                }
            }
            DoorState::Closing => {
                self.advance_fade(dt);
                self.timer += dt;
                if self.timer >= self.animation_duration() * 0.5 {
                    self.reset();
                    self.set_state(DoorState::Closed);
                }
            }
        }
    }

    /// React to a load-complete notification. Safe to call any number of
    /// times.
    pub fn on_section_loaded<P: StreamingProvider>(
        &mut self,
        section: SectionIndex,
        streamer: &mut SectionStreamer<P>,
    ) {
        if self.target != Some(section) || self.destination_ready {
            return;
        }
        if !matches!(
            self.state,
            DoorState::Opening | DoorState::WaitingForLoad | DoorState::Open
        ) {
            return;
        }
        self.destination_ready = true;
        if self.state == DoorState::WaitingForLoad {
            self.complete(streamer);
        }
    }

    fn trigger_streaming<P: StreamingProvider>(
        &mut self,
        destination: SectionIndex,
        streamer: &mut SectionStreamer<P>,
    ) {
        self.streaming_triggered = true;
        if !streamer.is_load_mask_active() {
            streamer.set_load_mask_active(true);
            self.holds_mask = true;
        }
        tracing::debug!(door = self.id.0, %destination, "door requesting destination");
        streamer.enter_section(destination);
    }

    fn poll_destination<P: StreamingProvider>(
        &mut self,
        destination: SectionIndex,
        streamer: &SectionStreamer<P>,
    ) {
        if !self.destination_ready && streamer.is_section_ready(destination) {
            self.destination_ready = true;
        }
    }

    fn complete<P: StreamingProvider>(&mut self, streamer: &mut SectionStreamer<P>) {
        self.release_mask(streamer);
        self.dwell_timer = 0.0;
        if self.destination_ready && self.fade == Fade::FadingOut {
            self.fade = Fade::FadingIn;
        }
        self.set_state(DoorState::Open);
    }

    fn release_mask<P: StreamingProvider>(&mut self, streamer: &mut SectionStreamer<P>) {
        if self.holds_mask {
            self.holds_mask = false;
            streamer.set_load_mask_active(false);
        }
    }

    fn advance_fade(&mut self, dt: f32) {
        let step = if self.config.fade_duration > 0.0 {
            dt / self.config.fade_duration
        } else {
            1.0
        };
        match self.fade {
            Fade::Clear | Fade::Opaque => {}
            Fade::FadingOut => {
                self.fade_alpha = (self.fade_alpha + step).min(1.0);
                if self.fade_alpha >= 1.0 {
                    self.fade = Fade::Opaque;
                }
            }
            Fade::FadingIn => {
                self.fade_alpha = (self.fade_alpha - step).max(0.0);
                if self.fade_alpha <= 0.0 {
                    self.fade = Fade::Clear;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.target = None;
        self.timer = 0.0;
        self.wait_timer = 0.0;
        self.dwell_timer = 0.0;
        self.hold_timer = 0.0;
        self.destination_ready = false;
        self.streaming_triggered = false;
        self.fallback_fired = false;
        self.fade = Fade::Clear;
        self.fade_alpha = 0.0;
    }

    fn set_state(&mut self, state: DoorState) {
        if self.state == state {
            return;
        }
        tracing::debug!(door = self.id.0, from = ?self.state, to = ?state, "door state changed");
        self.state = state;
        self.events.push(GameplayEvent::DoorStateChanged {
            door: self.id,
            state,
        });
    }

    /// Screen fade alpha, 0 fully visible, 1 fully black.
    pub fn fade_alpha(&self) -> f32 {
        self.fade_alpha
    }

    /// Open and not hidden behind the fallback fade.
    pub fn is_visibly_open(&self) -> bool {
        self.state == DoorState::Open && self.fade_alpha < 1.0
    }

    pub fn is_destination_ready(&self) -> bool {
        self.destination_ready
    }

    pub fn fallback_fired(&self) -> bool {
        self.fallback_fired
    }

    /// How far the door is through its cycle, 0 closed, 1 fully open.
    pub fn transition_progress(&self) -> f32 {
        let duration = self.animation_duration();
        match self.state {
            DoorState::Closed => 0.0,
            DoorState::Opening => (self.timer / duration).min(1.0),
            DoorState::WaitingForLoad | DoorState::Open => 1.0,
            DoorState::Closing => (1.0 - self.timer / (duration * 0.5)).max(0.0),
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.events)
    }
}
