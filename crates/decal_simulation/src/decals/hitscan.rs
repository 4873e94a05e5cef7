//! Hitscan resolution (мгновенный луч с камеры)
//!
//! Без penetration: первый hit по всем слоям → один entry decal.
//!
//! С penetration: walk по всем hit'ам (ascending distance):
//! - stop layer → decal, стоп
//! - passes == allowance → decal, стоп
//! - иначе → decal, passes += 1
//!
//! Потом (если exit decals включены) обратный луч: от точки остановки к
//! камере, либо от конца range назад, если walk дошёл до конца. Exit hits
//! обрабатываются в порядке убывания distance.

use bevy::prelude::*;

use super::DecalContext;
use crate::random::RandomSource;
use crate::scene::layers::get_layer_name;
use crate::scene::{sort_by_distance, sort_by_distance_desc, DecalProjector, LayerMask, SceneGraph, SpatialQuery};

/// Итог penetration walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PenetrationState {
    pub passes: u32,
    /// Индекс hit'а, на котором walk остановился (None: дошёл до конца)
    pub stopping_index: Option<usize>,
}

impl<'a, S, Q, R> DecalContext<'a, S, Q, R>
where
    S: SceneGraph + DecalProjector,
    Q: SpatialQuery,
    R: RandomSource,
{
    /// Выстрел hitscan из `origin` вдоль `forward`
    pub fn resolve_hitscan(&mut self, origin: Vec3, forward: Vec3) -> PenetrationState {
        let settings = self.settings;
        let shooting = &settings.shooting;

        let Some(forward) = forward.try_normalize() else {
            return PenetrationState::default();
        };

        if !shooting.penetration {
            if let Some(hit) = self
                .physics
                .raycast_first(origin, forward, shooting.range, LayerMask::ALL)
            {
                self.place_decal(hit.point, hit.normal, &hit, true);
            }
            return PenetrationState::default();
        }

        let mut hits = self
            .physics
            .raycast_all(origin, forward, shooting.range, shooting.hit_layers);
        sort_by_distance(&mut hits);

        let mut state = PenetrationState::default();
        for (index, hit) in hits.iter().enumerate() {
            let layer = self.scene.layer(hit.collider);
            if shooting.stop_layers.contains(layer) {
                self.place_decal(hit.point, hit.normal, hit, true);
                state.stopping_index = Some(index);
                crate::logger::log(&format!(
                    "🛡️ Hitscan stopped by {} layer at {:?} (passes: {})",
                    get_layer_name(layer),
                    hit.point,
                    state.passes
                ));
                break;
            }

            if state.passes == shooting.penetrations {
                self.place_decal(hit.point, hit.normal, hit, true);
                state.stopping_index = Some(index);
                break;
            }

            self.place_decal(hit.point, hit.normal, hit, true);
            state.passes += 1;
        }

        if hits.is_empty() || !shooting.exit_decals {
            return state;
        }

        // Walk дошёл до конца → индекс 0 (проверка ниже может совпасть случайно)
        let stopping = &hits[state.stopping_index.unwrap_or(0)];
        let stopped = shooting.stop_layers.contains(self.scene.layer(stopping.collider))
            || state.passes == shooting.penetrations;

        let mut exits = if stopped {
            let distance = origin.distance(stopping.point);
            self.physics
                .raycast_all(stopping.point, -forward, distance, shooting.hit_layers)
        } else {
            let far_end = origin + forward * shooting.range;
            self.physics
                .raycast_all(far_end, -forward, shooting.range, shooting.hit_layers)
        };
        sort_by_distance_desc(&mut exits);

        for exit in &exits {
            self.place_decal(exit.point, exit.normal, exit, false);
        }

        state
    }
}
