//! Rotation arbitration.
//!
//! Features request rotations through [`RotationManager::set_rotation_target`]
//! at any point during a tick. Once per tick the session calls
//! [`RotationManager::resolve`], which picks the winning request and turns the
//! current rotation towards it. Requests live for one tick only.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use vantage_core::config::RotationsConfig;
use vantage_core::enums::RotationPriority;
use vantage_core::state::RotationRequestView;
use vantage_core::types::Rotation;

/// A feature's wish to look somewhere this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationRequest {
    pub rotation: Rotation,
    pub priority: RotationPriority,
    pub requester: String,
    /// Skip this request while the inventory screen is open.
    pub consider_inventory: bool,
    /// Turn speed limits; `None` snaps straight to the rotation.
    pub smoothing: Option<RotationsConfig>,
    /// Arrival order, used to break priority ties.
    seq: u64,
}

impl RotationRequest {
    pub fn view(&self) -> RotationRequestView {
        RotationRequestView {
            rotation: self.rotation,
            priority: self.priority,
            requester: self.requester.clone(),
        }
    }
}

/// Immutable copy of the arbitration state for other threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationSnapshot {
    pub current: Rotation,
    pub server: Rotation,
    pub active: Option<RotationRequestView>,
}

/// Picks one rotation per tick out of all requests.
#[derive(Debug, Clone)]
pub struct RotationManager {
    requests: Vec<RotationRequest>,
    seq: u64,
    current: Rotation,
    server: Rotation,
    active: Option<RotationRequest>,
    inventory_open: bool,
    rng: ChaCha8Rng,
}

impl RotationManager {
    pub fn new(seed: u64, initial: Rotation) -> Self {
        Self {
            requests: Vec::new(),
            seq: 0,
            current: initial,
            server: initial,
            active: None,
            inventory_open: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn set_rotation_target(
        &mut self,
        rotation: Rotation,
        priority: RotationPriority,
        requester: &str,
        consider_inventory: bool,
        smoothing: Option<RotationsConfig>,
    ) {
        self.seq += 1;
        self.requests.push(RotationRequest {
            rotation: rotation.normalized(),
            priority,
            requester: requester.to_string(),
            consider_inventory,
            smoothing,
            seq: self.seq,
        });
    }

    /// Pick the winner among this tick's requests and step towards it.
    ///
    /// Highest priority wins; among equals the latest request wins. Without
    /// an eligible request the current rotation stays where it is.
    pub fn resolve(&mut self) -> Rotation {
        let inventory_open = self.inventory_open;
        let winner = self
            .requests
            .drain(..)
            .filter(|request| !(inventory_open && request.consider_inventory))
            .max_by_key(|request| (request.priority, request.seq));

        if let Some(request) = &winner {
            self.current = match request.smoothing {
                Some(smoothing) => {
                    let (yaw_speed, pitch_speed) = self.sample_turn_speed(&smoothing);
                    self.current
                        .towards(&request.rotation, yaw_speed, pitch_speed)
                }
                None => request.rotation,
            };
        }
        self.active = winner;
        self.current
    }

    fn sample_turn_speed(&mut self, smoothing: &RotationsConfig) -> (f32, f32) {
        let (a, b) = smoothing.turn_speed;
        let (min, max) = (a.min(b).max(0.0), a.max(b).max(0.0));
        if max - min <= f32::EPSILON {
            return (max, max);
        }
        (self.rng.gen_range(min..=max), self.rng.gen_range(min..=max))
    }

    /// Requests queued for the next [`RotationManager::resolve`].
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    pub fn current_rotation(&self) -> Rotation {
        self.current
    }

    /// The player turned by hand; arbitration continues from there.
    pub fn set_current_rotation(&mut self, rotation: Rotation) {
        self.current = rotation.normalized();
    }

    /// Rotation the server last acknowledged.
    pub fn server_rotation(&self) -> Rotation {
        self.server
    }

    /// The outbound layer sent `rotation` to the server.
    pub fn on_rotation_sent(&mut self, rotation: Rotation) {
        self.server = rotation;
    }

    pub fn set_inventory_open(&mut self, open: bool) {
        self.inventory_open = open;
    }

    pub fn inventory_open(&self) -> bool {
        self.inventory_open
    }

    /// The request that won the last [`RotationManager::resolve`].
    pub fn active_request(&self) -> Option<&RotationRequest> {
        self.active.as_ref()
    }

    pub fn snapshot(&self) -> RotationSnapshot {
        RotationSnapshot {
            current: self.current,
            server: self.server,
            active: self.active.as_ref().map(RotationRequest::view),
        }
    }
}
