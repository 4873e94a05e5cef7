//! Contact detection для headless физики
//!
//! Реальный движок сам генерирует trigger enter/exit. Здесь: отрезок
//! `previous_position → translation` каждого projectile проверяется против
//! панелей `HeadlessPhysics`, каждое пересечение → пара Enter + Exit.

use bevy::prelude::*;

use super::{ContactPhase, Projectile, ProjectileContact};
use crate::config::DecalSettings;
use crate::scene::{sort_by_distance, HeadlessPhysics, SpatialQuery};
use crate::DecalSet;

/// Насколько projectile "вошёл" в surface в момент contact (м)
pub const CONTACT_PENETRATION_DEPTH: f32 = 0.01;

/// Plugin: contact detection по панелям `HeadlessPhysics`
pub struct HeadlessContactsPlugin;

impl Plugin for HeadlessContactsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, detect_panel_crossings.in_set(DecalSet::Detection));
    }
}

/// Система: пересечения панелей за последний шаг → ProjectileContact
pub fn detect_panel_crossings(
    projectiles: Query<(Entity, &Transform, &Projectile)>,
    physics: Res<HeadlessPhysics>,
    settings: Res<DecalSettings>,
    mut contacts: EventWriter<ProjectileContact>,
) {
    let mask = settings.shooting.hit_layers.union(settings.shooting.stop_layers);

    for (entity, transform, projectile) in projectiles.iter() {
        if projectile.stopped {
            continue;
        }

        let segment = transform.translation - projectile.previous_position;
        let Some(direction) = segment.try_normalize() else {
            continue;
        };

        let mut hits = physics.raycast_all(projectile.previous_position, direction, segment.length(), mask);
        sort_by_distance(&mut hits);

        for hit in hits {
            let position = hit.point + direction * CONTACT_PENETRATION_DEPTH;

            contacts.write(ProjectileContact {
                projectile: entity,
                phase: ContactPhase::Enter,
                position,
            });
            contacts.write(ProjectileContact {
                projectile: entity,
                phase: ContactPhase::Exit,
                position,
            });
        }
    }
}
