use serde::{Deserialize, Serialize};

use crate::models::Entry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SpinStatus {
    #[default]
    Idle,
    Spinning,
}

/// Wheel state for one client. `rotation` only ever grows so the wheel
/// keeps turning the same way from one spin to the next.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelState {
    pub status: SpinStatus,
    pub rotation: f64,
    pub spin_count: u64,
    pub last_winner: Option<Entry>,
}

impl WheelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_spinning(&self) -> bool {
        self.status == SpinStatus::Spinning
    }

    pub fn begin_spin(&mut self, rotation: f64) {
        self.status = SpinStatus::Spinning;
        self.rotation = rotation;
    }

    pub fn settle(&mut self, winner: Entry) {
        self.status = SpinStatus::Idle;
        self.spin_count += 1;
        self.last_winner = Some(winner);
    }
}
