//! Shooting domain: fire trigger → hit resolution
//!
//! Содержит:
//! - FireTrigger (event: игрок нажал fire в этом tick)
//! - ViewState (камера: origin + forward)
//! - DecalPlaced / EffectSpawned (события для UI, звуков, отладки)
//! - DecalStats (накопительная статистика)
//! - process_fire_triggers (hitscan сразу, ballistic → spawn Projectile)

use bevy::prelude::*;

use crate::config::{DecalSettings, ShootingMode};
use crate::decals::{DecalContext, DecalKind, EffectKind, PlacedDecal, PlacementReport, SpawnedEffect};
use crate::lifetime::LifetimeScheduler;
use crate::pool::ObjectPool;
use crate::projectiles::Projectile;
use crate::random::DeterministicRng;
use crate::scene::{DecalProjector, SceneGraph, SpatialQuery};

/// Event: выстрел в этом tick (fire input)
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct FireTrigger;

/// Event: decal размещён
#[derive(Event, Debug, Clone)]
pub struct DecalPlaced(pub PlacedDecal);

/// Event: particle effect заспавнен
#[derive(Event, Debug, Clone)]
pub struct EffectSpawned(pub SpawnedEffect);

/// Камера стрелка
///
/// Hitscan луч идёт из `origin` вдоль `forward`. Splatter на exit hits
/// использует `forward` на момент обработки.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ViewState {
    pub origin: Vec3,
    pub forward: Vec3,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            forward: Vec3::NEG_Z,
        }
    }
}

/// Накопительная статистика (demo, тесты)
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct DecalStats {
    pub shots: u64,
    pub projectiles_spawned: u64,
    pub projectiles_stopped: u64,
    pub entry_decals: u64,
    pub exit_decals: u64,
    pub splatter_decals: u64,
    pub splatter_clusters: u64,
    pub bleed_effects: u64,
    pub splatter_effects: u64,
}

impl DecalStats {
    pub fn record(&mut self, report: &PlacementReport) {
        for decal in &report.decals {
            match decal.kind {
                DecalKind::Entry => self.entry_decals += 1,
                DecalKind::Exit => self.exit_decals += 1,
                DecalKind::Splatter { .. } => self.splatter_decals += 1,
            }
        }
        for effect in &report.effects {
            match effect.kind {
                EffectKind::Bleed => self.bleed_effects += 1,
                EffectKind::Splatter => self.splatter_effects += 1,
            }
        }
        self.splatter_clusters += report.clusters.len() as u64;
    }

    pub fn total_decals(&self) -> u64 {
        self.entry_decals + self.exit_decals + self.splatter_decals
    }
}

/// Отчёт прохода → stats + события
pub(crate) fn publish_report(
    report: PlacementReport,
    stats: &mut DecalStats,
    decal_events: &mut EventWriter<DecalPlaced>,
    effect_events: &mut EventWriter<EffectSpawned>,
) {
    stats.record(&report);

    for decal in report.decals {
        decal_events.write(DecalPlaced(decal));
    }
    for effect in report.effects {
        effect_events.write(EffectSpawned(effect));
    }
}

/// Система: обработка FireTrigger
///
/// Hitscan → resolve сразу в этом tick.
/// Ballistic → spawn Projectile entity (contacts обрабатываются позже).
#[allow(clippy::too_many_arguments)]
pub fn process_fire_triggers<S, Q>(
    mut commands: Commands,
    mut triggers: EventReader<FireTrigger>,
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
    for _ in triggers.read() {
        stats.shots += 1;

        match settings.shooting.mode {
            ShootingMode::Hitscan => {
                let mut ctx = DecalContext::new(
                    &*settings,
                    &mut *scene,
                    &*physics,
                    &mut *pool,
                    &mut *lifetimes,
                    &mut *rng,
                    view.forward,
                );
                let state = ctx.resolve_hitscan(view.origin, view.forward);
                let report = ctx.finish();

                crate::logger::log(&format!(
                    "🔫 Hitscan: {} entry, {} exit, {} splatter decals (passes: {}, stop: {:?})",
                    report.entry_count(),
                    report.exit_count(),
                    report.splatter_count(),
                    state.passes,
                    state.stopping_index
                ));

                publish_report(report, &mut stats, &mut decal_events, &mut effect_events);
            }
            ShootingMode::Ballistic { speed, gravity, lifetime } => {
                let Some(direction) = view.forward.try_normalize() else {
                    crate::logger::log_warning("⚠️ FireTrigger ignored: view forward is zero");
                    continue;
                };

                let entity = commands
                    .spawn((
                        Projectile::new(direction * speed, gravity, lifetime, view.origin),
                        Transform::from_translation(view.origin),
                    ))
                    .id();
                stats.projectiles_spawned += 1;

                crate::logger::log(&format!(
                    "🚀 Projectile {:?} spawned at {:?} (speed: {})",
                    entity, view.origin, speed
                ));
            }
        }
    }
}
