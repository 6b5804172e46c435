//! Toggleable features built on the runtime.
//!
//! A module owns one [`Listener`]. Enabling registers its hooks; disabling
//! stops the listener, which drops those hooks and cancels every task the
//! module still has in flight.

pub mod projectile_aimbot;

use std::cell::RefCell;
use std::rc::Rc;

use vantage_core::config::VantageConfig;
use vantage_sched::{Listener, Runtime};

use crate::context::GameContext;
use crate::rotation::RotationManager;

pub use projectile_aimbot::ProjectileAimbot;

/// Session state a module may capture when it is enabled.
pub struct ModuleContext<'a> {
    pub runtime: &'a Runtime,
    pub game: &'a Rc<RefCell<GameContext>>,
    pub rotations: &'a Rc<RefCell<RotationManager>>,
}

pub trait Module {
    fn name(&self) -> &str;

    fn listener(&self) -> &Rc<Listener>;

    fn is_enabled(&self) -> bool;

    fn enable(&mut self, ctx: &ModuleContext);

    fn disable(&mut self, runtime: &Runtime);

    /// Pick up new settings. Takes effect on the next tick.
    fn apply_config(&mut self, config: &VantageConfig);

    /// Whether `config` asks for this module to run.
    fn enabled_by(&self, config: &VantageConfig) -> bool;

    /// The module's current target, if it tracks one.
    fn target(&self) -> Option<hecs::Entity> {
        None
    }
}
