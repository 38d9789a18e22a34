//! Randomized trials: one draw, one delayed verdict.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::info;

use crate::error::TrialError;
use crate::events::{Event, EventSink};
use crate::state_machine::{SAMPLE_DOMAIN, Stage};

/// Source of sample values.
pub trait Sampler: Send {
    /// Draw one value, nominally from [`SAMPLE_DOMAIN`].
    fn draw(&mut self) -> u32;
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    fn draw(&mut self) -> u32 {
        (**self).draw()
    }
}

/// Uniform draws over the sampling domain.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn draw(&mut self) -> u32 {
        self.rng.gen_range(SAMPLE_DOMAIN)
    }
}

/// Replays a fixed list of values, starting over when it runs out.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedSampler {
    values: Vec<u32>,
    next: usize,
}

#[cfg(test)]
impl ScriptedSampler {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, next: 0 }
    }
}

#[cfg(test)]
impl Sampler for ScriptedSampler {
    fn draw(&mut self) -> u32 {
        if self.values.is_empty() {
            return *SAMPLE_DOMAIN.start();
        }
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}

/// Runs trials against stage ranges with a fixed simulated latency.
pub struct TrialGenerator<R> {
    sampler: R,
    latency: Duration,
}

impl<R: Sampler> TrialGenerator<R> {
    pub fn new(sampler: R, latency: Duration) -> Self {
        Self { sampler, latency }
    }

    /// Draw a value for `stage`, report it, wait, then classify it.
    ///
    /// The `BoxUpdate` goes out before the wait so clients see every draw,
    /// including the ones that end up rejected.
    pub async fn sample<S: EventSink>(&mut self, stage: Stage, sink: &S) -> Result<u32, TrialError> {
        let value = self.sampler.draw();
        sink.emit(Event::BoxUpdate {
            stage_index: stage.index(),
            value,
        })?;

        sleep(self.latency).await;

        let range = stage.range();
        if range.contains(&value) {
            info!(%stage, value, "box {} success: {value}", stage.index() + 1);
            Ok(value)
        } else {
            let (min, max) = (*range.start(), *range.end());
            info!(
                %stage,
                value,
                "box {} failed: {value} (expected {min}-{max})",
                stage.index() + 1
            );
            Err(TrialError::OutOfRange {
                stage,
                value,
                min,
                max,
            })
        }
    }
}
