//! Decal Simulation Core
//!
//! Bullet-impact decals на Bevy 0.16 (headless ECS)
//!
//! HYBRID ARCHITECTURE:
//! - ECS = decision layer (hit resolution, pool, lifetimes, projectiles)
//! - Движок = scene graph + projector rendering + raycasts
//!   (`SceneGraph` / `DecalProjector` / `SpatialQuery` traits)
//!
//! Headless backend (`HeadlessScene` + `HeadlessPhysics`) используется в
//! тестах и demo бинарнике.

use bevy::prelude::*;
use std::marker::PhantomData;

// Публичные модули
pub mod config;
pub mod decals;
pub mod lifetime;
pub mod logger;
pub mod pool;
pub mod projectiles;
pub mod random;
pub mod scene;
pub mod shooting;
pub mod styles;

// Re-export основных типов
pub use config::{ConfigError, DecalSettings, ShootingMode};
pub use decals::{ContactOutcome, DecalContext, DecalKind, EffectKind, PenetrationState, PlacementReport};
pub use lifetime::{advance_lifetimes, LifetimeScheduler, LifetimeTarget};
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel};
pub use pool::ObjectPool;
pub use projectiles::{ContactPhase, HeadlessContactsPlugin, Projectile, ProjectileContact};
pub use random::{DeterministicRng, RandomSource};
pub use scene::{
    spawn_surface, DecalProjector, HeadlessPhysics, HeadlessScene, HitEvent, LayerMask, NodeId, SceneGraph,
    SpatialQuery, SurfaceDesc,
};
pub use shooting::{DecalPlaced, DecalStats, EffectSpawned, FireTrigger, ViewState};

/// Частота simulation tick (Hz)
pub const TICK_HZ: f64 = 60.0;

/// Фазы FixedUpdate (выполняются строго по порядку)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecalSet {
    /// Истёкшие таймеры → pool release / destroy
    Lifetimes,
    /// FireTrigger → hitscan / spawn projectile
    Fire,
    /// Интеграция движения projectiles
    Motion,
    /// Contact detection (движок или HeadlessContactsPlugin)
    Detection,
    /// ProjectileContact → decals
    Resolution,
    /// Despawn projectiles
    Cleanup,
}

/// Главный plugin decal системы
///
/// Generic по scene/physics backend'у. Resources `S`, `Q`, `DecalSettings`
/// и `DeterministicRng` берутся из App, если уже вставлены (иначе Default),
/// поэтому их нужно вставить ДО `add_plugins`. Pool создаётся сразу в
/// `build` (нужна сцена для инстансов).
pub struct DecalPlugin<S, Q> {
    _marker: PhantomData<fn() -> (S, Q)>,
}

impl<S, Q> Default for DecalPlugin<S, Q> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<S, Q> Plugin for DecalPlugin<S, Q>
where
    S: SceneGraph + DecalProjector + Resource + FromWorld,
    Q: SpatialQuery + Resource + FromWorld,
{
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(TICK_HZ))
            .init_resource::<DecalSettings>()
            .init_resource::<S>()
            .init_resource::<Q>()
            .init_resource::<ViewState>()
            .init_resource::<DecalStats>()
            .insert_resource(LifetimeScheduler::new(TICK_HZ as f32));

        // Настройки из кода не проходят через load(): валидируем здесь
        app.world_mut().resource_mut::<DecalSettings>().validate();

        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        if !app.world().contains_resource::<ObjectPool>() {
            let pool_settings = app.world().resource::<DecalSettings>().pool.clone();
            let world = app.world_mut();
            let pool = {
                let mut scene = world.resource_mut::<S>();
                ObjectPool::new(&mut *scene, &pool_settings)
            };
            world.insert_resource(pool);
        }

        // Регистрация событий
        app.add_event::<FireTrigger>()
            .add_event::<ProjectileContact>()
            .add_event::<DecalPlaced>()
            .add_event::<EffectSpawned>()
            .register_type::<Projectile>();

        app.configure_sets(
            FixedUpdate,
            (
                DecalSet::Lifetimes,
                DecalSet::Fire,
                DecalSet::Motion,
                DecalSet::Detection,
                DecalSet::Resolution,
                DecalSet::Cleanup,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                advance_lifetimes::<S>.in_set(DecalSet::Lifetimes),
                shooting::process_fire_triggers::<S, Q>.in_set(DecalSet::Fire),
                projectiles::integrate_projectiles.in_set(DecalSet::Motion),
                projectiles::process_projectile_contacts::<S, Q>.in_set(DecalSet::Resolution),
                projectiles::expire_projectiles.in_set(DecalSet::Cleanup),
            ),
        );
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(TICK_HZ)); // 60Hz FixedUpdate

    app
}

/// Headless App с полной decal системой (headless scene + physics + contacts)
pub fn create_headless_decal_app(seed: u64, settings: DecalSettings) -> App {
    let mut app = create_headless_app(seed);
    app.insert_resource(settings)
        .add_plugins((DecalPlugin::<HeadlessScene, HeadlessPhysics>::default(), HeadlessContactsPlugin));

    app
}

/// Один simulation tick (FixedUpdate напрямую, без real-time accumulator)
///
/// После тика event буферы переключаются (как `event_update_system` в
/// `First`), иначе они растут без ограничений.
pub fn run_fixed_tick(app: &mut App) {
    let world = app.world_mut();
    world.run_schedule(FixedUpdate);
    update_decal_events(world);
}

/// Double-buffer swap для событий decal системы
fn update_decal_events(world: &mut World) {
    fn swap<E: Event>(world: &mut World) {
        if let Some(mut events) = world.get_resource_mut::<Events<E>>() {
            events.update();
        }
    }

    swap::<FireTrigger>(world);
    swap::<ProjectileContact>(world);
    swap::<DecalPlaced>(world);
    swap::<EffectSpawned>(world);
}

/// Добавить surface в headless сцену и физику App'а
pub fn spawn_headless_surface(world: &mut World, desc: SurfaceDesc) -> NodeId {
    world.resource_scope(|world, mut scene: Mut<HeadlessScene>| {
        let mut physics = world.resource_mut::<HeadlessPhysics>();
        spawn_surface(&mut scene, &mut physics, desc)
    })
}

/// Snapshot headless сцены для сравнения детерминизма
pub fn scene_snapshot(world: &World) -> Vec<u8> {
    world
        .get_resource::<HeadlessScene>()
        .map(HeadlessScene::snapshot)
        .unwrap_or_default()
}
