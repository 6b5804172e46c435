//! Aim session: the per-connection engine.
//!
//! `AimSession` owns the mirrored world, the runtime and the rotation
//! arbiter, processes host commands at the tick boundary, drives every
//! enabled module and produces a `TickSnapshot` per tick. It is headless
//! and single-threaded, which keeps it deterministic under test.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use hecs::Entity;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use vantage_core::commands::SessionCommand;
use vantage_core::components::{Living, Position, Removed, Velocity};
use vantage_core::config::VantageConfig;
use vantage_core::constants::SIMULATION_DEFAULT_MAX_TICKS;
use vantage_core::enums::ProjectileKind;
use vantage_core::events::RotationUpdateEvent;
use vantage_core::state::TickSnapshot;
use vantage_sched::Runtime;

use crate::context::{GameContext, Observer};
use crate::modules::{Module, ModuleContext, ProjectileAimbot};
use crate::rotation::RotationManager;
use crate::simulation::{Environment, SimulationResult, TrajectorySimulator};
use crate::systems;
use crate::world_setup;

pub struct AimSession {
    runtime: Runtime,
    context: Rc<RefCell<GameContext>>,
    rotations: Rc<RefCell<RotationManager>>,
    modules: Vec<Box<dyn Module>>,
    config: VantageConfig,
    rng: ChaCha8Rng,
    command_queue: VecDeque<SessionCommand>,
    despawn_buffer: Vec<Entity>,
}

impl AimSession {
    /// Create a session with the local player at the origin and every
    /// module the config enables already running.
    pub fn new(config: VantageConfig) -> Self {
        let mut context = GameContext::new(Observer {
            rotation: config.session.initial_rotation,
            ..Observer::default()
        });
        let GameContext { world, observer } = &mut context;
        world_setup::spawn_observer(world, observer);

        let mut session = Self {
            runtime: Runtime::new(),
            context: Rc::new(RefCell::new(context)),
            rotations: Rc::new(RefCell::new(RotationManager::new(
                config.session.seed,
                config.session.initial_rotation,
            ))),
            modules: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.session.seed),
            config: config.clone(),
            command_queue: VecDeque::new(),
            despawn_buffer: Vec::new(),
        };
        session.add_module(Box::new(ProjectileAimbot::new(config.aimbot)));
        session
    }

    /// Register a module, enabling it if the current config asks for it.
    pub fn add_module(&mut self, mut module: Box<dyn Module>) {
        module.apply_config(&self.config);
        if module.enabled_by(&self.config) {
            module.enable(&self.module_context());
        }
        self.modules.push(module);
    }

    /// Queue a host command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: SessionCommand) {
        self.command_queue.push_back(command);
    }

    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = SessionCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> TickSnapshot {
        self.process_commands();

        {
            let mut ctx = self.context.borrow_mut();
            systems::movement::run(&mut ctx.world);
            systems::movement::update_vitals(&mut ctx.world);
        }

        let tick = self.runtime.tick();
        self.send_rotation(tick);

        let mut ctx = self.context.borrow_mut();
        systems::cleanup::run(&mut ctx.world, &mut self.despawn_buffer);
        drop(ctx);

        self.snapshot()
    }

    /// Arbitrate this tick's requests and hand the winner to the outbound layer.
    fn send_rotation(&mut self, tick: u64) {
        let mut rotations = self.rotations.borrow_mut();
        let rotation = rotations.resolve();
        let winner = rotations.active_request().cloned();
        rotations.on_rotation_sent(rotation);
        drop(rotations);

        self.context.borrow_mut().observer.rotation = rotation;

        if let Some(request) = winner {
            self.runtime.post(&mut RotationUpdateEvent {
                tick,
                rotation,
                priority: request.priority,
                requester: request.requester,
            });
        }
    }

    /// Snapshot of the current state without advancing.
    pub fn snapshot(&self) -> TickSnapshot {
        let target = self.modules.iter().find_map(|module| module.target());
        systems::snapshot::build_snapshot(
            self.runtime.current_tick(),
            &self.context.borrow(),
            &self.rotations.borrow(),
            target,
            self.runtime.scheduler().task_count(),
        )
    }

    /// Fly the projectile `kind` the player would launch right now.
    pub fn simulate_shot(
        &self,
        kind: ProjectileKind,
        env: &dyn Environment,
        max_ticks: u32,
    ) -> SimulationResult {
        let ctx = self.context.borrow();
        let mut simulator = TrajectorySimulator::hypothetical(
            &ctx.observer,
            kind.trajectory_info(),
            ctx.observer.rotation,
        );
        simulator.run(&ctx.world, env, max_ticks)
    }

    /// [`AimSession::simulate_shot`] over the default preview horizon.
    pub fn preview_shot(&self, kind: ProjectileKind, env: &dyn Environment) -> SimulationResult {
        self.simulate_shot(kind, env, SIMULATION_DEFAULT_MAX_TICKS)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn context(&self) -> Ref<'_, GameContext> {
        self.context.borrow()
    }

    pub fn rotations(&self) -> Ref<'_, RotationManager> {
        self.rotations.borrow()
    }

    pub fn config(&self) -> &VantageConfig {
        &self.config
    }

    pub fn module(&self, name: &str) -> Option<&dyn Module> {
        self.modules
            .iter()
            .find(|module| module.name() == name)
            .map(|module| &**module)
    }

    pub fn is_module_enabled(&self, name: &str) -> bool {
        self.module(name).is_some_and(|module| module.is_enabled())
    }

    fn module_context(&self) -> ModuleContext<'_> {
        ModuleContext {
            runtime: &self.runtime,
            game: &self.context,
            rotations: &self.rotations,
        }
    }

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::EnableModule { name } => self.set_module_enabled(&name, true),
            SessionCommand::DisableModule { name } => self.set_module_enabled(&name, false),
            SessionCommand::ApplyConfig { config } => self.apply_config(config),
            SessionCommand::SpawnEntity { spawn } => {
                let mut ctx = self.context.borrow_mut();
                let GameContext { world, observer } = &mut *ctx;
                world_setup::spawn_entity(world, &spawn, observer);
            }
            SessionCommand::DespawnEntity { id } => {
                if let Some(entity) = self.foreign_entity(id) {
                    let _ = self
                        .context
                        .borrow_mut()
                        .world
                        .insert_one(entity, Removed);
                }
            }
            SessionCommand::UpdateEntity {
                id,
                position,
                velocity,
                health,
                hurt_time,
            } => {
                let Some(entity) = self.foreign_entity(id) else {
                    return;
                };
                let mut ctx = self.context.borrow_mut();
                let _ = ctx
                    .world
                    .insert(entity, (Position(position), Velocity(velocity)));
                let living = ctx.world.get::<&mut Living>(entity);
                if let Ok(mut living) = living {
                    if let Some(health) = health {
                        living.health = health;
                    }
                    if let Some(hurt_time) = hurt_time {
                        living.hurt_time = hurt_time;
                    }
                }
            }
            SessionCommand::Populate { count } => {
                let mut ctx = self.context.borrow_mut();
                let GameContext { world, observer } = &mut *ctx;
                world_setup::spawn_random_entities(world, &mut self.rng, observer, count);
            }
            SessionCommand::UpdateObserver {
                position,
                velocity,
                on_ground,
            } => {
                let mut ctx = self.context.borrow_mut();
                ctx.observer.position = position;
                ctx.observer.velocity = velocity;
                ctx.observer.on_ground = on_ground;
                if let Some(entity) = ctx.observer.entity {
                    let _ = ctx
                        .world
                        .insert(entity, (Position(position), Velocity(velocity)));
                }
            }
            SessionCommand::SetRotation { rotation } => {
                self.rotations.borrow_mut().set_current_rotation(rotation);
                self.context.borrow_mut().observer.rotation = rotation.normalized();
            }
            SessionCommand::SetInventoryOpen { open } => {
                self.rotations.borrow_mut().set_inventory_open(open);
            }
        }
    }

    /// Resolve a host id to a live entity other than the local player.
    fn foreign_entity(&self, id: u64) -> Option<Entity> {
        let entity = Entity::from_bits(id)?;
        let ctx = self.context.borrow();
        if Some(entity) == ctx.observer.entity || !ctx.world.contains(entity) {
            log::warn!("ignoring command for unknown entity {id}");
            return None;
        }
        Some(entity)
    }

    fn set_module_enabled(&mut self, name: &str, enabled: bool) {
        let Some(index) = self.modules.iter().position(|module| module.name() == name) else {
            log::warn!("unknown module {name}");
            return;
        };
        let mut module = self.modules.remove(index);
        if enabled {
            module.enable(&self.module_context());
        } else {
            module.disable(&self.runtime);
        }
        self.modules.insert(index, module);
    }

    fn apply_config(&mut self, config: VantageConfig) {
        self.config = config;
        let mut modules = std::mem::take(&mut self.modules);
        for module in &mut modules {
            module.apply_config(&self.config);
            if module.enabled_by(&self.config) {
                module.enable(&self.module_context());
            } else {
                module.disable(&self.runtime);
            }
        }
        self.modules = modules;
    }
}
