//! Time-based animation sampler
//!
//! An [`Animation`] samples an easing function over a fixed duration at a
//! fixed frame rate. Starting it spawns a sampling thread and returns a
//! [`RunningAnimation`] handle:
//!
//! - samples arrive on a single-slot channel; an unconsumed sample is
//!   replaced by the next one, so a slow consumer skips frames instead of
//!   lagging behind
//! - the last sample is exactly `easing(duration)`
//! - completion is published exactly once, carrying a [`Checkpoint`] with the
//!   elapsed time, whether the animation ran to the end or was terminated
//!
//! A checkpoint can be fed back into [`Animation::resume`] to continue from the
//! same point, or mirrored and handed to the opposite animation to reverse a
//! transition halfway through (see [`slide`]).

pub mod slide;

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};

use crate::sync::{latest, LatestSender};

/// Default sampling rate in frames per second
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Easing function: elapsed seconds in `[0, duration]` to output value
pub type Easing = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnimationError {
    #[error("animation duration must be positive")]
    NonPositiveDuration,
    #[error("animation frame rate must be positive")]
    ZeroFrameRate,
}

/// Elapsed-time position of an animation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint {
    elapsed: Duration,
}

impl Checkpoint {
    pub fn new(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The same position seen from an animation running the other way
    pub fn mirrored(&self, duration: Duration) -> Self {
        Self {
            elapsed: duration.saturating_sub(self.elapsed),
        }
    }
}

/// An animation that has not been started yet
#[derive(Clone)]
pub struct Animation {
    easing: Easing,
    duration: Duration,
    frame_rate: u32,
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("duration", &self.duration)
            .field("frame_rate", &self.frame_rate)
            .finish()
    }
}

impl Animation {
    /// Create an animation sampling `easing` over `duration`
    pub fn new<F>(easing: F, duration: Duration) -> Result<Self, AnimationError>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        if duration.is_zero() {
            return Err(AnimationError::NonPositiveDuration);
        }
        Ok(Self {
            easing: Arc::new(easing),
            duration,
            frame_rate: DEFAULT_FRAME_RATE,
        })
    }

    /// Ease-out animation from 0 to `distance`, for sliding in
    pub fn slide_in(duration: Duration, distance: f64) -> Result<Self, AnimationError> {
        Self::new(ease_out(duration, distance), duration)
    }

    /// Ease-in animation from 0 to `distance`, for sliding out
    pub fn slide_out(duration: Duration, distance: f64) -> Result<Self, AnimationError> {
        Self::new(ease_in(duration, distance), duration)
    }

    /// Change the sampling rate
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Result<Self, AnimationError> {
        if frame_rate == 0 {
            return Err(AnimationError::ZeroFrameRate);
        }
        self.frame_rate = frame_rate;
        Ok(self)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Time between two samples
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate as f64)
    }

    /// Value at `elapsed`, clamped to the duration
    pub fn sample(&self, elapsed: Duration) -> f64 {
        (self.easing)(elapsed.min(self.duration).as_secs_f64())
    }

    /// Start sampling from the beginning
    pub fn start(self) -> RunningAnimation {
        self.resume(Checkpoint::default())
    }

    /// Start sampling from a checkpoint
    pub fn resume(self, checkpoint: Checkpoint) -> RunningAnimation {
        let (values_tx, values) = latest();
        let (finished_tx, finished) = bounded(1);
        let (control, control_rx) = bounded(1);
        let duration = self.duration;

        let worker = std::thread::Builder::new()
            .name("animation".to_string())
            .spawn(move || self.animate(checkpoint.elapsed, values_tx, finished_tx, control_rx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("failed to spawn animation thread: {}", e);
                None
            }
        };

        RunningAnimation {
            values,
            finished,
            control,
            duration,
            worker,
        }
    }

    fn animate(
        self,
        mut elapsed: Duration,
        values: LatestSender<f64>,
        finished: Sender<Checkpoint>,
        control: Receiver<()>,
    ) {
        let period = self.period();
        let ticker = tick(period);

        let _ = values.send(self.sample(elapsed));

        while elapsed < self.duration {
            select! {
                recv(ticker) -> _ => {
                    elapsed += period;
                    let _ = values.send(self.sample(elapsed));
                    tracing::trace!(elapsed = ?elapsed, "animation tick");
                }
                recv(control) -> _ => break,
            }
        }

        let _ = finished.send(Checkpoint::new(elapsed.min(self.duration)));
    }
}

/// Handle to a running animation
///
/// Dropping the handle terminates the animation and joins its thread.
#[derive(Debug)]
pub struct RunningAnimation {
    values: Receiver<f64>,
    finished: Receiver<Checkpoint>,
    control: Sender<()>,
    duration: Duration,
    worker: Option<JoinHandle<()>>,
}

impl RunningAnimation {
    /// Sampled values, latest wins
    pub fn values(&self) -> &Receiver<f64> {
        &self.values
    }

    /// Receives a single checkpoint when the animation ends or is terminated
    pub fn finished(&self) -> &Receiver<Checkpoint> {
        &self.finished
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Ask the animation to stop
    ///
    /// Returns immediately. Safe to call any number of times, including after
    /// the animation ended on its own.
    pub fn terminate(&self) {
        let _ = self.control.try_send(());
    }

    /// Block until the completion checkpoint arrives
    ///
    /// Returns `None` if the checkpoint was already consumed.
    pub fn wait(&self) -> Option<Checkpoint> {
        self.finished.recv().ok()
    }

    /// Terminate and return where the animation stopped
    pub fn pause(self) -> Checkpoint {
        self.terminate();
        self.wait()
            .unwrap_or_else(|| Checkpoint::new(self.duration))
    }
}

impl Drop for RunningAnimation {
    fn drop(&mut self) {
        self.terminate();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Ease-out power curve from 0 to `distance`
pub fn ease_out(duration: Duration, distance: f64) -> impl Fn(f64) -> f64 + Send + Sync + 'static {
    let length = duration.as_secs_f64();
    move |t| {
        let arc = (t / length).clamp(0.0, 1.0) * FRAC_PI_2;
        distance * arc.sin().powf(0.8)
    }
}

/// [`ease_out`] played backwards, rising from 0 to `distance`
///
/// `distance - ease_out_reversed(duration - t)` equals `ease_out(t)`, so a
/// transition handed over at a mirrored checkpoint keeps its position.
pub fn ease_out_reversed(
    duration: Duration,
    distance: f64,
) -> impl Fn(f64) -> f64 + Send + Sync + 'static {
    let length = duration.as_secs_f64();
    let forward = ease_out(duration, distance);
    move |t| distance - forward(length - t)
}

/// Ease-in cosine curve from 0 to `distance`
pub fn ease_in(duration: Duration, distance: f64) -> impl Fn(f64) -> f64 + Send + Sync + 'static {
    let length = duration.as_secs_f64();
    move |t| {
        let progress = (t / length).clamp(0.0, 1.0);
        if progress >= 1.0 {
            return distance;
        }
        distance * (1.0 - (progress * FRAC_PI_2).cos())
    }
}
