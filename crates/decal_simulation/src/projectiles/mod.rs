//! Ballistic projectiles
//!
//! ECS ответственность:
//! - Projectile state (velocity, gravity, passes, stopped, age)
//! - Интеграция движения в FixedUpdate
//! - ProjectileContact → hit resolution (entry/exit decals)
//!
//! Contact detection: снаружи (физика движка или `HeadlessContactsPlugin`):
//! она пишет `ProjectileContact` события, ECS решает, что с ними делать.
//!
//! Остановленный projectile игнорирует дальнейшие contacts и живёт до
//! истечения lifetime (застрявшая пуля).

use bevy::prelude::*;

use crate::config::DecalSettings;
use crate::decals::{ContactOutcome, DecalContext};
use crate::lifetime::LifetimeScheduler;
use crate::pool::ObjectPool;
use crate::random::DeterministicRng;
use crate::scene::{DecalProjector, SceneGraph, SpatialQuery};
use crate::shooting::{publish_report, DecalPlaced, DecalStats, EffectSpawned, ViewState};

pub mod headless_contacts;

pub use headless_contacts::{detect_panel_crossings, HeadlessContactsPlugin};

/// Летящий projectile
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Projectile {
    /// Скорость (м/с)
    pub velocity: Vec3,
    /// Ускорение вниз (м/с²)
    pub gravity: f32,
    /// Сколько surfaces уже пробито
    pub passes: u32,
    pub stopped: bool,
    /// Сколько секунд прожил
    pub age: f32,
    pub lifetime: f32,
    /// Позиция до последнего шага интеграции (crossing detection)
    pub previous_position: Vec3,
}

impl Projectile {
    pub fn new(velocity: Vec3, gravity: f32, lifetime: f32, origin: Vec3) -> Self {
        Self {
            velocity,
            gravity,
            passes: 0,
            stopped: false,
            age: 0.0,
            lifetime,
            previous_position: origin,
        }
    }

    /// Направление полёта (None: стоит на месте)
    pub fn direction(&self) -> Option<Vec3> {
        self.velocity.try_normalize()
    }
}

/// Фаза контакта projectile с surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Exit,
}

/// Event: projectile пересёк границу surface (physics → ECS)
#[derive(Event, Debug, Clone)]
pub struct ProjectileContact {
    pub projectile: Entity,
    pub phase: ContactPhase,
    /// Позиция projectile в момент контакта
    pub position: Vec3,
}

/// Система: интеграция движения (semi-implicit Euler, fixed timestep)
pub fn integrate_projectiles(time: Res<Time<Fixed>>, mut projectiles: Query<(&mut Transform, &mut Projectile)>) {
    let delta = time.timestep().as_secs_f32();

    for (mut transform, mut projectile) in projectiles.iter_mut() {
        projectile.previous_position = transform.translation;

        if projectile.stopped {
            continue;
        }

        projectile.velocity.y -= projectile.gravity * delta;
        transform.translation += projectile.velocity * delta;
    }
}

/// Система: ProjectileContact → entry/exit decals
///
/// Enter: probe назад вдоль полёта → decal, passes++ или остановка.
/// Exit: probe назад из точки чуть впереди → exit decal.
#[allow(clippy::too_many_arguments)]
pub fn process_projectile_contacts<S, Q>(
    mut contacts: EventReader<ProjectileContact>,
    mut projectiles: Query<(&mut Transform, &mut Projectile)>,
    view: Res<ViewState>,
    settings: Res<DecalSettings>,
    mut scene: ResMut<S>,
    physics: Res<Q>,
    mut pool: ResMut<ObjectPool>,
    mut lifetimes: ResMut<LifetimeScheduler>,
    mut rng: ResMut<DeterministicRng>,
    mut stats: ResMut<DecalStats>,
    mut decal_events: EventWriter<DecalPlaced>,
    mut effect_events: EventWriter<EffectSpawned>,
) where
    S: SceneGraph + DecalProjector + Resource,
    Q: SpatialQuery + Resource,
{
    for contact in contacts.read() {
        let Ok((mut transform, mut projectile)) = projectiles.get_mut(contact.projectile) else {
            crate::logger::log_warning(&format!(
                "⚠️ ProjectileContact: {:?} is not a projectile (despawned?)",
                contact.projectile
            ));
            continue;
        };

        if projectile.stopped {
            continue;
        }
        let Some(forward) = projectile.direction() else {
            continue;
        };

        let mut ctx = DecalContext::new(
            &*settings,
            &mut *scene,
            &*physics,
            &mut *pool,
            &mut *lifetimes,
            &mut *rng,
            view.forward,
        );

        match contact.phase {
            ContactPhase::Enter => {
                let outcome = ctx.projectile_enter(contact.position, forward, &mut projectile.passes);

                if outcome == ContactOutcome::Stopped {
                    projectile.stopped = true;
                    projectile.velocity = Vec3::ZERO;
                    transform.translation = contact.position;
                    stats.projectiles_stopped += 1;

                    crate::logger::log(&format!(
                        "🛑 Projectile {:?} stopped at {:?} (passes: {})",
                        contact.projectile, contact.position, projectile.passes
                    ));
                }
            }
            ContactPhase::Exit => {
                ctx.projectile_exit(contact.position, forward);
            }
        }

        let report = ctx.finish();
        publish_report(report, &mut stats, &mut decal_events, &mut effect_events);
    }
}

/// Система: despawn projectiles с истёкшим lifetime
pub fn expire_projectiles(
    mut commands: Commands,
    time: Res<Time<Fixed>>,
    mut projectiles: Query<(Entity, &mut Projectile)>,
) {
    let delta = time.timestep().as_secs_f32();

    for (entity, mut projectile) in projectiles.iter_mut() {
        projectile.age += delta;

        if projectile.age >= projectile.lifetime {
            commands.entity(entity).despawn();
            crate::logger::log(&format!("💨 Projectile {:?} expired after {:.2}s", entity, projectile.age));
        }
    }
}
