//! Hit resolution pipeline
//!
//! Все точки входа (hitscan, projectile contact, splatter) сходятся в одном
//! примитиве: `DecalContext::place_decal`:
//!
//! 1. Resolve стиля по tag коллайдера (decal table)
//! 2. Acquire инстанса из pool (нет инстанса → decal пропускается молча)
//! 3. Ориентация (projection axis против нормали), случайный материал,
//!    size/depth, reparent под surface (decal едет с геометрией)
//! 4. Entry hit → bleed roll → particle effect (10s)
//! 5. Exit hit → splatter cluster + splatter particle (3s)
//!
//! `DecalContext`: явный handle сервисов (pool, scheduler, scene, physics,
//! rng), который протаскивается через все call sites вместо глобального
//! singleton'а.

use bevy::prelude::*;

use crate::config::{DecalSettings, BLEED_EFFECT_LIFETIME, SPLATTER_EFFECT_LIFETIME};
use crate::lifetime::{LifetimeScheduler, LifetimeTarget};
use crate::pool::ObjectPool;
use crate::random::RandomSource;
use crate::scene::{
    from_to_rotation, DecalProjector, HitEvent, MaterialId, NodeId, PrefabId, SceneGraph, SpatialQuery,
};
use crate::styles::DecalStyle;

pub mod contact;
pub mod hitscan;
pub mod splatter;


pub use contact::ContactOutcome;
pub use hitscan::PenetrationState;

/// Ось проекции projector'а в его локальном frame
pub const PROJECTION_AXIS: Vec3 = Vec3::Z;

/// Тип размещённого decal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecalKind {
    /// Входное отверстие
    Entry,

    /// Выходное отверстие
    Exit,

    /// Элемент splatter cluster'а (offset в локальном frame cluster parent'а)
    Splatter { cluster: NodeId, offset: Vec2 },
}

/// Размещённый decal (для событий и тестов)
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedDecal {
    pub instance: NodeId,
    /// Parent узел (hit surface или splatter cluster)
    pub parent: NodeId,
    pub kind: DecalKind,
    pub position: Vec3,
    pub rotation: Quat,
    /// None: у стиля нет материалов
    pub material: Option<MaterialId>,
    pub size: f32,
    pub depth: f32,
}

/// Тип particle effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Bleed,
    Splatter,
}

impl EffectKind {
    fn parent_name(&self) -> &'static str {
        match self {
            EffectKind::Bleed => "BleedParent",
            EffectKind::Splatter => "SplatterParent",
        }
    }

    pub fn lifetime(&self) -> f32 {
        match self {
            EffectKind::Bleed => BLEED_EFFECT_LIFETIME,
            EffectKind::Splatter => SPLATTER_EFFECT_LIFETIME,
        }
    }
}

/// Particle effect под эфемерным parent'ом
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedEffect {
    pub kind: EffectKind,
    /// Эфемерный parent (self-destruct через `kind.lifetime()`)
    pub parent: NodeId,
    pub particle: NodeId,
    pub surface: NodeId,
    pub position: Vec3,
}

/// Splatter cluster (эфемерный parent + pooled decals под ним)
#[derive(Debug, Clone, PartialEq)]
pub struct SplatterCluster {
    pub parent: NodeId,
    /// Surface, найденный splatter лучом
    pub surface: NodeId,
    pub spawn_point: Vec3,
    pub instances: Vec<NodeId>,
}

/// Всё, что разместил один проход pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementReport {
    pub decals: Vec<PlacedDecal>,
    pub effects: Vec<SpawnedEffect>,
    pub clusters: Vec<SplatterCluster>,
}

impl PlacementReport {
    pub fn count(&self, predicate: impl Fn(&DecalKind) -> bool) -> usize {
        self.decals.iter().filter(|decal| predicate(&decal.kind)).count()
    }

    pub fn entry_count(&self) -> usize {
        self.count(|kind| matches!(kind, DecalKind::Entry))
    }

    pub fn exit_count(&self) -> usize {
        self.count(|kind| matches!(kind, DecalKind::Exit))
    }

    pub fn splatter_count(&self) -> usize {
        self.count(|kind| matches!(kind, DecalKind::Splatter { .. }))
    }

    pub fn effect_count(&self, kind: EffectKind) -> usize {
        self.effects.iter().filter(|effect| effect.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.decals.is_empty() && self.effects.is_empty() && self.clusters.is_empty()
    }
}

/// Handle сервисов pipeline на один проход
pub struct DecalContext<'a, S, Q, R> {
    pub settings: &'a DecalSettings,
    pub scene: &'a mut S,
    pub physics: &'a Q,
    pub pool: &'a mut ObjectPool,
    pub lifetimes: &'a mut LifetimeScheduler,
    pub rng: &'a mut R,
    /// Forward камеры на момент прохода (направление splatter)
    pub view_forward: Vec3,
    report: PlacementReport,
}

impl<'a, S, Q, R> DecalContext<'a, S, Q, R>
where
    S: SceneGraph + DecalProjector,
    Q: SpatialQuery,
    R: RandomSource,
{
    pub fn new(
        settings: &'a DecalSettings,
        scene: &'a mut S,
        physics: &'a Q,
        pool: &'a mut ObjectPool,
        lifetimes: &'a mut LifetimeScheduler,
        rng: &'a mut R,
        view_forward: Vec3,
    ) -> Self {
        Self {
            settings,
            scene,
            physics,
            pool,
            lifetimes,
            rng,
            view_forward,
            report: PlacementReport::default(),
        }
    }

    pub fn report(&self) -> &PlacementReport {
        &self.report
    }

    /// Завершить проход и забрать отчёт
    pub fn finish(self) -> PlacementReport {
        self.report
    }

    /// Разместить decal в точке hit'а
    ///
    /// Возвращает pooled instance (None: пустой table или пустой pool;
    /// effects при этом всё равно отрабатывают).
    pub fn place_decal(&mut self, position: Vec3, normal: Vec3, hit: &HitEvent, is_entry: bool) -> Option<NodeId> {
        let placed = self.draw_decal(position, normal, hit, is_entry);

        if is_entry {
            self.try_spawn_bleed(position, normal, hit);
        } else {
            self.spawn_exit_effects(hit);
        }

        placed
    }

    fn draw_decal(&mut self, position: Vec3, normal: Vec3, hit: &HitEvent, is_entry: bool) -> Option<NodeId> {
        let settings = self.settings;
        let style = settings.decals.resolve(self.scene.tag(hit.collider))?;

        let instance = self.pool.acquire(&mut *self.scene, &mut *self.lifetimes)?;

        let rotation = from_to_rotation(PROJECTION_AXIS, -normal);
        self.scene
            .set_transform(instance, Transform::from_translation(position).with_rotation(rotation));

        let material = self.apply_style(instance, style);
        self.scene.reparent(instance, Some(hit.collider));

        self.report.decals.push(PlacedDecal {
            instance,
            parent: hit.collider,
            kind: if is_entry { DecalKind::Entry } else { DecalKind::Exit },
            position,
            rotation,
            material,
            size: style.size,
            depth: style.depth,
        });

        Some(instance)
    }

    /// Случайный материал + size/depth стиля
    ///
    /// Пустой список материалов: материал не трогаем.
    pub(crate) fn apply_style(&mut self, instance: NodeId, style: &DecalStyle) -> Option<MaterialId> {
        let material = self
            .rng
            .pick(style.materials.len())
            .and_then(|index| style.materials.get(index).copied());

        if let Some(material) = material {
            self.scene.set_material(instance, material);
        }
        self.scene.set_projection_size(instance, style.size);
        self.scene.set_projection_depth(instance, style.depth);

        material
    }

    fn try_spawn_bleed(&mut self, position: Vec3, normal: Vec3, hit: &HitEvent) {
        let settings = self.settings;
        let bleed = &settings.bleed;
        if !bleed.enabled || !bleed.layers.contains(self.scene.layer(hit.collider)) {
            return;
        }
        let Some(prefab) = bleed.particle.as_ref() else {
            return;
        };

        if self.rng.roll_percent() > bleed.chance {
            return;
        }

        self.spawn_effect(
            EffectKind::Bleed,
            prefab,
            position,
            from_to_rotation(PROJECTION_AXIS, normal),
            hit.collider,
        );
    }

    fn spawn_exit_effects(&mut self, hit: &HitEvent) {
        let settings = self.settings;
        let splatter = &settings.splatter;
        if !splatter.enabled {
            return;
        }

        let direction = self.view_forward;
        self.splatter_from(hit.point, direction, hit);

        if let Some(prefab) = splatter.particle.as_ref() {
            self.spawn_effect(
                EffectKind::Splatter,
                prefab,
                hit.point,
                from_to_rotation(PROJECTION_AXIS, direction),
                hit.collider,
            );
        }
    }

    /// Particle под эфемерным parent'ом, parent: под surface
    fn spawn_effect(&mut self, kind: EffectKind, prefab: &PrefabId, position: Vec3, rotation: Quat, surface: NodeId) {
        let parent = self
            .scene
            .create_node(kind.parent_name(), Transform::from_translation(position));
        let particle = self
            .scene
            .instantiate(prefab, Transform::from_translation(position).with_rotation(rotation));

        self.scene.reparent(particle, Some(parent));
        self.scene.reparent(parent, Some(surface));
        self.lifetimes
            .schedule(LifetimeTarget::Ephemeral(parent), true, kind.lifetime());

        self.report.effects.push(SpawnedEffect {
            kind,
            parent,
            particle,
            surface,
            position,
        });
    }
}
