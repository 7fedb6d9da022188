//! Reversible show/hide transition
//!
//! [`Slide`] drives an overlay between hidden (position 0) and shown
//! (position `distance`). Toggling while a transition is in flight pauses it
//! and continues the opposite curve from the mirrored checkpoint. Hiding
//! runs the showing curve in reverse, so the overlay turns around at the
//! position it had reached.

use std::time::Duration;

use crossbeam_channel::Receiver;

use super::{
    ease_out_reversed, Animation, AnimationError, Checkpoint, RunningAnimation, DEFAULT_FRAME_RATE,
};
use crate::app::SlideConfig;

#[derive(Debug)]
pub struct Slide {
    duration: Duration,
    distance: f64,
    frame_rate: u32,
    shown: bool,
    position: f64,
    running: Option<RunningAnimation>,
}

impl Slide {
    /// Create a hidden slide
    pub fn new(duration: Duration, distance: f64) -> Result<Self, AnimationError> {
        if duration.is_zero() {
            return Err(AnimationError::NonPositiveDuration);
        }
        Ok(Self {
            duration,
            distance,
            frame_rate: DEFAULT_FRAME_RATE,
            shown: false,
            position: 0.0,
            running: None,
        })
    }

    pub fn from_config(config: &SlideConfig, frame_rate: u32) -> Result<Self, AnimationError> {
        Self::new(Duration::from_millis(config.duration_ms), config.distance)?
            .with_frame_rate(frame_rate)
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Result<Self, AnimationError> {
        if frame_rate == 0 {
            return Err(AnimationError::ZeroFrameRate);
        }
        self.frame_rate = frame_rate;
        Ok(self)
    }

    /// Whether the slide is shown or heading there
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_animating(&self) -> bool {
        self.running.is_some()
    }

    /// Last applied position, 0 when hidden and `distance` when shown
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Raw samples of the running transition, for use in a `select!`
    pub fn values(&self) -> Option<&Receiver<f64>> {
        self.running.as_ref().map(RunningAnimation::values)
    }

    /// Reverse direction
    pub fn toggle(&mut self) -> Result<(), AnimationError> {
        let from = match self.running.take() {
            Some(running) => running.pause().mirrored(self.duration),
            None => Checkpoint::default(),
        };

        self.shown = !self.shown;
        let animation = self.animation()?;

        tracing::debug!(shown = self.shown, from = ?from.elapsed(), "slide toggled");
        self.running = Some(animation.resume(from));
        Ok(())
    }

    /// Curve towards the current target
    ///
    /// Hiding plays the showing curve backwards, so both directions pass
    /// through the same positions.
    fn animation(&self) -> Result<Animation, AnimationError> {
        let animation = if self.shown {
            Animation::slide_in(self.duration, self.distance)?
        } else {
            Animation::new(ease_out_reversed(self.duration, self.distance), self.duration)?
        };
        animation.with_frame_rate(self.frame_rate)
    }

    /// Convert a raw sample into a position and record it
    pub fn apply(&mut self, value: f64) -> f64 {
        self.position = if self.shown {
            value
        } else {
            self.distance - value
        };
        self.position
    }

    /// Apply the latest pending sample without blocking
    ///
    /// Returns the new position if a sample was pending.
    pub fn poll(&mut self) -> Option<f64> {
        let running = self.running.as_ref()?;
        let done = running.finished().try_recv().is_ok();
        let latest = running.values().try_iter().last();
        if done {
            self.running = None;
        }
        latest.map(|value| self.apply(value))
    }

    /// Block until the transition ends and return the final position
    pub fn wait(&mut self) -> f64 {
        if let Some(running) = self.running.take() {
            running.wait();
            if let Some(value) = running.values().try_iter().last() {
                self.apply(value);
            }
        }
        self.position
    }
}
