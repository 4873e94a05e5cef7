//! Projectile contact resolution
//!
//! Enter: короткий probe луч (1m) из точки позади projectile вдоль его
//! forward, чтобы получить точную точку и нормаль. Exit: probe назад из точки
//! чуть впереди projectile.

use bevy::prelude::*;

use super::DecalContext;
use crate::config::{CONTACT_PROBE_DISTANCE, EXIT_PROBE_OFFSET, SURFACE_OFFSET};
use crate::random::RandomSource;
use crate::scene::layers::get_layer_name;
use crate::scene::{DecalProjector, HitEvent, LayerMask, SceneGraph, SpatialQuery};

/// Результат enter contact'а
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Probe ничего не нашёл
    Missed,

    /// Decal размещён, projectile летит дальше (passes += 1)
    Passed,

    /// Decal размещён, projectile остановлен
    Stopped,
}

impl<'a, S, Q, R> DecalContext<'a, S, Q, R>
where
    S: SceneGraph + DecalProjector,
    Q: SpatialQuery,
    R: RandomSource,
{
    /// Projectile вошёл в surface
    ///
    /// `passes`: счётчик пройденных surfaces этого projectile.
    pub fn projectile_enter(&mut self, position: Vec3, forward: Vec3, passes: &mut u32) -> ContactOutcome {
        let settings = self.settings;
        let shooting = &settings.shooting;

        let Some(forward) = forward.try_normalize() else {
            return ContactOutcome::Missed;
        };
        let origin = position - forward * CONTACT_PROBE_DISTANCE;

        if !shooting.penetration {
            return match self.probe(origin, forward, shooting.hit_layers) {
                Some(hit) => {
                    self.place_offset_decal(&hit, true);
                    ContactOutcome::Stopped
                }
                None => ContactOutcome::Missed,
            };
        }

        if *passes == shooting.penetrations {
            if let Some(hit) = self.probe(origin, forward, shooting.hit_layers) {
                self.place_offset_decal(&hit, true);
                return ContactOutcome::Stopped;
            }
        }

        if let Some(hit) = self.probe(origin, forward, shooting.stop_layers) {
            self.place_offset_decal(&hit, true);
            crate::logger::log(&format!(
                "🛡️ Projectile stopped by {} layer at {:?}",
                get_layer_name(self.scene.layer(hit.collider)),
                hit.point
            ));
            return ContactOutcome::Stopped;
        }

        if let Some(hit) = self.probe(origin, forward, shooting.hit_layers) {
            self.place_offset_decal(&hit, true);
            *passes += 1;
            return ContactOutcome::Passed;
        }

        ContactOutcome::Missed
    }

    /// Projectile вышел из surface (exit decal, если включены)
    pub fn projectile_exit(&mut self, position: Vec3, forward: Vec3) -> bool {
        let settings = self.settings;
        let shooting = &settings.shooting;

        if !shooting.exit_decals {
            return false;
        }
        let Some(forward) = forward.try_normalize() else {
            return false;
        };

        let origin = position + forward * EXIT_PROBE_OFFSET;
        match self.probe(origin, -forward, shooting.hit_layers) {
            Some(hit) => {
                self.place_offset_decal(&hit, false);
                true
            }
            None => false,
        }
    }

    fn probe(&self, origin: Vec3, direction: Vec3, mask: LayerMask) -> Option<HitEvent> {
        self.physics
            .raycast_first(origin, direction, CONTACT_PROBE_DISTANCE, mask)
    }

    /// Decal чуть над поверхностью (без z-fighting)
    fn place_offset_decal(&mut self, hit: &HitEvent, is_entry: bool) {
        let position = hit.point + hit.normal.normalize_or_zero() * SURFACE_OFFSET;
        self.place_decal(position, hit.normal, hit, is_entry);
    }
}
