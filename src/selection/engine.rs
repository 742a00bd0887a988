use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::state::WheelState;
use crate::{error::WheelError, models::Entry};

/// Full turns per spin are drawn from `MIN_FULL_SPINS..MAX_FULL_SPINS`.
pub const MIN_FULL_SPINS: u32 = 5;
pub const MAX_FULL_SPINS: u32 = 10;

/// The pointer sits at the top of the wheel, a quarter turn from angle 0.
pub const POINTER_OFFSET_DEG: f64 = 90.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    /// Cumulative rotation in degrees to animate to.
    pub rotation: f64,
    pub winner: Entry,
    pub winner_index: usize,
}

pub fn next_rotation(prior_rotation: f64, full_spins: u32, offset_deg: f64) -> f64 {
    prior_rotation + f64::from(full_spins) * 360.0 + offset_deg
}

/// Maps a rotation to the segment under the pointer.
pub fn winner_index(rotation: f64, segment_count: usize) -> usize {
    debug_assert!(segment_count > 0);
    let segment_size = 360.0 / segment_count as f64;
    let under_pointer = (rotation.rem_euclid(360.0) + POINTER_OFFSET_DEG).rem_euclid(360.0);
    (under_pointer / segment_size).floor() as usize % segment_count
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Picks winners for one client. At most one spin is in flight at a time;
/// a spin requested while another is running is rejected, not queued.
#[derive(Clone)]
pub struct SelectionEngine {
    state: Arc<Mutex<WheelState>>,
    rng: Arc<Mutex<StdRng>>,
    animation: Duration,
}

impl SelectionEngine {
    pub fn new(animation: Duration) -> Self {
        Self::with_rng(StdRng::from_entropy(), animation)
    }

    pub fn with_seed(seed: u64, animation: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), animation)
    }

    fn with_rng(rng: StdRng, animation: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(WheelState::new())),
            rng: Arc::new(Mutex::new(rng)),
            animation,
        }
    }

    pub fn state(&self) -> WheelState {
        lock(&self.state).clone()
    }

    pub fn is_spinning(&self) -> bool {
        lock(&self.state).is_spinning()
    }

    /// Draws a rotation, picks the winner and takes the spin lock. The lock
    /// is held until [`finish_spin`](Self::finish_spin).
    pub fn begin_spin(&self, pool: &[Entry]) -> Result<SpinResult, WheelError> {
        if pool.is_empty() {
            return Err(WheelError::NoSelectableEntries);
        }

        let mut state = lock(&self.state);
        if state.is_spinning() {
            return Err(WheelError::SpinInProgress);
        }

        let (full_spins, offset) = {
            let mut rng = lock(&self.rng);
            (
                rng.gen_range(MIN_FULL_SPINS..MAX_FULL_SPINS),
                rng.gen_range(0.0..360.0),
            )
        };

        let rotation = next_rotation(state.rotation, full_spins, offset);
        let index = winner_index(rotation, pool.len());
        state.begin_spin(rotation);

        debug!(
            "spin #{} landed on {} ({index}/{}) at {rotation:.1}°",
            state.spin_count + 1,
            pool[index].name,
            pool.len()
        );

        Ok(SpinResult {
            rotation,
            winner: pool[index].clone(),
            winner_index: index,
        })
    }

    pub fn finish_spin(&self, result: &SpinResult) {
        lock(&self.state).settle(result.winner.clone());
    }

    /// Full spin: pick, hold the lock for the animation, then release.
    pub async fn spin(&self, pool: &[Entry]) -> Result<SpinResult, WheelError> {
        let result = self.begin_spin(pool)?;
        let settle = SettleOnDrop {
            engine: self,
            result: &result,
        };
        if !self.animation.is_zero() {
            tokio::time::sleep(self.animation).await;
        }
        drop(settle);
        Ok(result)
    }
}

/// Releases the spin lock even if the spinning future is dropped mid-animation.
struct SettleOnDrop<'a> {
    engine: &'a SelectionEngine,
    result: &'a SpinResult,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        self.engine.finish_spin(self.result);
    }
}
