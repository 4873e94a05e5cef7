//! Splatter: кластер decals на поверхности за пробитым объектом

use bevy::prelude::*;

use super::{DecalContext, DecalKind, PlacedDecal, SplatterCluster, PROJECTION_AXIS};
use crate::config::SURFACE_OFFSET;
use crate::lifetime::LifetimeTarget;
use crate::random::RandomSource;
use crate::scene::{from_to_rotation, DecalProjector, HitEvent, NodeId, SceneGraph, SpatialQuery};

impl<'a, S, Q, R> DecalContext<'a, S, Q, R>
where
    S: SceneGraph + DecalProjector,
    Q: SpatialQuery,
    R: RandomSource,
{
    /// Splatter cluster по лучу `origin + direction * range`
    ///
    /// Стиль выбирается по tag ИСХОДНОГО hit'а (пробитый объект), а не по
    /// surface, на который ляжет cluster. Нет surface в range → None.
    pub fn splatter_from(&mut self, origin: Vec3, direction: Vec3, source: &HitEvent) -> Option<NodeId> {
        let settings = self.settings;
        let splatter = &settings.splatter;

        let target = self
            .physics
            .raycast_first(origin, direction, splatter.range, splatter.mask)?;
        let style = splatter.styles.resolve(self.scene.tag(source.collider))?;

        let spawn_point = target.point + target.normal.normalize_or_zero() * SURFACE_OFFSET;
        let parent_rotation = from_to_rotation(PROJECTION_AXIS, target.normal);
        let instance_rotation = from_to_rotation(PROJECTION_AXIS, -target.normal);

        let cluster = self.scene.create_node(
            "SplatterObject",
            Transform::from_translation(spawn_point).with_rotation(parent_rotation),
        );

        let mut instances = Vec::with_capacity(style.count as usize);
        for _ in 0..style.count {
            let Some(instance) = self.pool.acquire(&mut *self.scene, &mut *self.lifetimes) else {
                continue;
            };

            let offset = Vec2::new(
                self.rng.range(-style.horizontal_spread, style.horizontal_spread),
                self.rng.range(-style.vertical_spread, style.vertical_spread),
            );
            // Offset в плоскости cluster parent'а (local z = 0)
            let position = spawn_point + parent_rotation * offset.extend(0.0);

            self.scene.set_transform(
                instance,
                Transform::from_translation(position).with_rotation(instance_rotation),
            );
            self.scene.reparent(instance, Some(cluster));
            let material = self.apply_style(instance, &style.decal);

            instances.push(instance);
            self.report.decals.push(PlacedDecal {
                instance,
                parent: cluster,
                kind: DecalKind::Splatter { cluster, offset },
                position,
                rotation: instance_rotation,
                material,
                size: style.decal.size,
                depth: style.decal.depth,
            });
        }

        self.scene.reparent(cluster, Some(target.collider));
        // Cluster живёт столько же, сколько его decals
        self.lifetimes.schedule(
            LifetimeTarget::Ephemeral(cluster),
            settings.pool.auto_reclaim,
            settings.pool.reclaim_delay,
        );

        self.report.clusters.push(SplatterCluster {
            parent: cluster,
            surface: target.collider,
            spawn_point,
            instances,
        });

        Some(cluster)
    }
}
