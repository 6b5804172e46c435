//! Enumeration types used throughout vantage.

use serde::{Deserialize, Serialize};

use crate::types::TrajectoryInfo;

/// Secondary ordering applied to target candidates after the class tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPriority {
    /// Lowest health first.
    #[default]
    Health,
    /// Closest to the player first.
    Distance,
    /// Closest to the crosshair first.
    Direction,
    /// Lowest hurt time first.
    HurtTime,
    /// Oldest entity first.
    Age,
}

/// Coarse entity class used for the primary target ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    Player,
    /// Monsters that attack on sight.
    Hostile,
    /// Neutral mobs that may become angry at someone.
    Angerable,
    /// Animals, villagers and everything else alive.
    Passive,
}

/// Arbitration rank of a rotation request. Later variants win.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RotationPriority {
    NotImportant,
    #[default]
    Normal,
    ImportantForUsage1,
    ImportantForUsage2,
    ImportantForUsage3,
    ImportantForPlayerLife,
}

/// Projectile kinds with known ballistic constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    #[default]
    Arrow,
    Trident,
    Snowball,
    Egg,
    EnderPearl,
    SplashPotion,
    ExpBottle,
}

impl ProjectileKind {
    /// Ballistic constants of this projectile.
    pub fn trajectory_info(self) -> TrajectoryInfo {
        match self {
            ProjectileKind::Arrow => TrajectoryInfo::ARROW,
            ProjectileKind::Trident => TrajectoryInfo::TRIDENT,
            ProjectileKind::Snowball | ProjectileKind::Egg => TrajectoryInfo::SNOWBALL,
            ProjectileKind::EnderPearl => TrajectoryInfo::ENDER_PEARL,
            ProjectileKind::SplashPotion => TrajectoryInfo::POTION,
            ProjectileKind::ExpBottle => TrajectoryInfo::EXP_BOTTLE,
        }
    }
}

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketDirection {
    Inbound,
    Outbound,
}
