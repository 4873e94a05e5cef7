//! Scene seams: scene graph, projector, spatial queries
//!
//! Ядро НЕ владеет сценой и физикой. Оно видит их через три trait'а:
//! - `SceneGraph`: nodes, parent relation, active flag, tag/layer
//! - `DecalProjector`: material/size/depth у pooled инстанса
//! - `SpatialQuery`: raycast first / raycast all
//!
//! Parent relation: back-reference для размещения (decal едет вместе с
//! динамической геометрией), не ownership.
//!
//! `headless`: in-memory реализация для тестов и demo бинарника.

use bevy::prelude::*;
use serde::Deserialize;

pub mod headless;
pub mod layers;

pub use headless::{spawn_surface, HeadlessPhysics, HeadlessScene, SceneNode, SurfaceDesc, SurfacePanel};
pub use layers::LayerMask;

/// Handle узла внешней сцены (opaque)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct NodeId(pub u32);

/// Идентификатор prefab'а (projector, particle system)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize, Reflect)]
#[serde(transparent)]
pub struct PrefabId(pub String);

impl PrefabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Opaque handle материала (projector material)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Reflect)]
#[serde(transparent)]
pub struct MaterialId(pub u32);

/// Результат одного ray query (эфемерный, потребляется сразу)
///
/// Tag и layer коллайдера читаются через `SceneGraph::tag/layer(collider)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEvent {
    /// Точка попадания (world space)
    pub point: Vec3,

    /// Нормаль поверхности (смотрит навстречу лучу)
    pub normal: Vec3,

    /// Surface node, в который попали
    pub collider: NodeId,

    /// Расстояние от origin луча
    pub distance: f32,
}

/// Scene graph внешнего движка
///
/// `reparent` сохраняет world transform (как SetParent в движках).
/// `destroy` уносит всех потомков вместе с узлом.
pub trait SceneGraph {
    /// Пустой узел (parent для particle effects и splatter clusters)
    fn create_node(&mut self, name: &str, transform: Transform) -> NodeId;

    fn instantiate(&mut self, prefab: &PrefabId, transform: Transform) -> NodeId;

    fn destroy(&mut self, node: NodeId);

    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn set_transform(&mut self, node: NodeId, transform: Transform);

    fn set_active(&mut self, node: NodeId, active: bool);

    /// Tag узла ("" если tag не задан или узла нет)
    fn tag(&self, node: NodeId) -> &str;

    fn layer(&self, node: NodeId) -> u32;
}

/// Projector компонент pooled инстанса
pub trait DecalProjector {
    fn set_material(&mut self, instance: NodeId, material: MaterialId);

    fn set_projection_size(&mut self, instance: NodeId, size: f32);

    fn set_projection_depth(&mut self, instance: NodeId, depth: f32);
}

/// Spatial query service (физика движка)
pub trait SpatialQuery {
    fn raycast_first(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<HitEvent>;

    /// Все пересечения луча. Порядок НЕ гарантирован: caller сортирует сам.
    fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Vec<HitEvent>;
}

/// Сортировка по возрастанию distance (entry walk)
pub fn sort_by_distance(hits: &mut [HitEvent]) {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

/// Сортировка по убыванию distance (exit walk)
pub fn sort_by_distance_desc(hits: &mut [HitEvent]) {
    hits.sort_by(|a, b| b.distance.total_cmp(&a.distance));
}

/// Rotation, которая переводит `from` в `to` (оба нормализуются)
///
/// Нулевые векторы дают identity.
pub fn from_to_rotation(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(from), Some(to)) => Quat::from_rotation_arc(from, to),
        _ => Quat::IDENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(distance: f32) -> HitEvent {
        HitEvent {
            point: Vec3::Z * distance,
            normal: Vec3::NEG_Z,
            collider: NodeId(distance as u32),
            distance,
        }
    }

    #[test]
    fn test_sort_by_distance_both_directions() {
        let mut hits = vec![hit(3.0), hit(1.0), hit(2.0)];

        sort_by_distance(&mut hits);
        let ascending: Vec<f32> = hits.iter().map(|h| h.distance).collect();
        assert_eq!(ascending, vec![1.0, 2.0, 3.0]);

        sort_by_distance_desc(&mut hits);
        let descending: Vec<f32> = hits.iter().map(|h| h.distance).collect();
        assert_eq!(descending, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_from_to_rotation_aligns_axis() {
        let rotation = from_to_rotation(Vec3::Z, Vec3::X);
        let rotated = rotation * Vec3::Z;
        assert!(rotated.abs_diff_eq(Vec3::X, 1e-5));

        assert_eq!(from_to_rotation(Vec3::Z, Vec3::ZERO), Quat::IDENTITY);
    }
}
