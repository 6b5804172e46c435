//! Aims the held projectile at the best reachable target.
//!
//! Every tick the candidate list is rebuilt and the first target the
//! situational solver can reach wins. Targets the solver cannot reach are
//! skipped rather than aimed at badly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vantage_core::config::{AimbotConfig, VantageConfig};
use vantage_core::error::TaskError;
use vantage_core::events::{GameTickEvent, TargetChangeEvent};
use vantage_core::types::Rotation;
use vantage_sched::{EventManager, Listener, Runtime, SuspendHandler};

use crate::context::GameContext;
use crate::rotation::RotationManager;
use crate::targeting::{TargetTracker, TrackedTarget};
use crate::trajectory::{ProjectileAngleCalculator, SituationalAngleCalculator};

use super::{Module, ModuleContext};

pub const NAME: &str = "ProjectileAimbot";

pub struct ProjectileAimbot {
    listener: Rc<Listener>,
    config: Rc<Cell<AimbotConfig>>,
    tracker: Rc<RefCell<TargetTracker>>,
    handler: Option<Rc<SuspendHandler<GameTickEvent>>>,
}

impl ProjectileAimbot {
    pub fn new(config: AimbotConfig) -> Self {
        let listener = Listener::new(NAME);
        listener.set_running(false);
        Self {
            listener,
            config: Rc::new(Cell::new(config)),
            tracker: Rc::new(RefCell::new(TargetTracker::new(config.target))),
            handler: None,
        }
    }

    pub fn config(&self) -> AimbotConfig {
        self.config.get()
    }
}

impl Module for ProjectileAimbot {
    fn name(&self) -> &str {
        NAME
    }

    fn listener(&self) -> &Rc<Listener> {
        &self.listener
    }

    fn is_enabled(&self) -> bool {
        self.handler.is_some()
    }

    fn enable(&mut self, ctx: &ModuleContext) {
        if self.handler.is_some() {
            return;
        }
        ctx.runtime.enable_listener(&self.listener);

        let step = AimStep {
            game: ctx.game.clone(),
            rotations: ctx.rotations.clone(),
            events: ctx.runtime.events().clone(),
            config: self.config.clone(),
            tracker: self.tracker.clone(),
        };
        let handler = ctx.runtime.tick_handler(&self.listener, move || {
            let step = step.clone();
            async move {
                step.run();
                Ok::<(), TaskError>(())
            }
        });
        self.handler = Some(handler);
        log::debug!("{NAME} enabled");
    }

    fn disable(&mut self, runtime: &Runtime) {
        if self.handler.take().is_none() {
            return;
        }
        runtime.remove_listener(&self.listener);
        self.tracker.borrow_mut().reset();
        log::debug!("{NAME} disabled");
    }

    fn apply_config(&mut self, config: &VantageConfig) {
        self.config.set(config.aimbot);
        self.tracker.borrow_mut().selector.config = config.aimbot.target;
    }

    fn enabled_by(&self, config: &VantageConfig) -> bool {
        config.aimbot.enabled
    }

    fn target(&self) -> Option<hecs::Entity> {
        self.tracker.borrow().target()
    }
}

/// Everything one aim tick needs, cloned into each tick task.
#[derive(Clone)]
struct AimStep {
    game: Rc<RefCell<GameContext>>,
    rotations: Rc<RefCell<RotationManager>>,
    events: Rc<EventManager>,
    config: Rc<Cell<AimbotConfig>>,
    tracker: Rc<RefCell<TargetTracker>>,
}

impl AimStep {
    fn run(&self) {
        let config = self.config.get();
        let previous = self.tracker.borrow().target();
        let solution = self.solve(&config);

        let current = solution.map(|(target, _)| target.entity);
        if current != previous {
            self.events.dispatch(&mut TargetChangeEvent {
                requester: NAME.to_string(),
                target: current,
            });
        }

        if let Some((_, rotation)) = solution {
            self.rotations.borrow_mut().set_rotation_target(
                rotation,
                config.priority,
                NAME,
                false,
                Some(config.rotations),
            );
        }
    }

    /// First candidate the solver can reach, with the rotation that reaches it.
    fn solve(&self, config: &AimbotConfig) -> Option<(TrackedTarget, Rotation)> {
        let info = config.projectile.trajectory_info();
        let calculator = SituationalAngleCalculator::default();
        let game = self.game.borrow();
        let source = game.observer.eye_position();

        let mut tracker = self.tracker.borrow_mut();
        tracker.reset();
        tracker.select(&game, |target| {
            calculator.calculate_angle_for_entity(&info, source, &game.world, target.entity)
        })
    }
}
