//! Headless сцена и физика (in-memory)
//!
//! Используется в тестах и demo бинарнике вместо реального движка:
//! - `HeadlessScene`: таблица узлов + parent relation table (NodeId → parent)
//! - `HeadlessPhysics`: прямоугольные панели нулевой толщины, raycast через
//!   `Ray3d::intersect_plane`
//!
//! Панель пробивается с обеих сторон, нормаль hit'а всегда смотрит навстречу
//! лучу. Hits ближе `RAY_SKIN` игнорируются: луч, стартующий на поверхности,
//! не цепляет её повторно.

use std::collections::BTreeMap;

use bevy::math::primitives::InfinitePlane3d;
use bevy::math::{Dir3, Ray3d};
use bevy::prelude::*;

use super::{
    from_to_rotation, DecalProjector, HitEvent, LayerMask, MaterialId, NodeId, PrefabId, SceneGraph,
    SpatialQuery,
};

/// Минимальная дистанция hit'а (м)
pub const RAY_SKIN: f32 = 1e-4;

/// Состояние projector компонента узла
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectorState {
    pub material: Option<MaterialId>,
    pub size: f32,
    pub depth: f32,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub prefab: Option<PrefabId>,
    /// World transform
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub active: bool,
    pub tag: String,
    pub layer: u32,
    pub projector: ProjectorState,
    /// Сколько раз узел переходил active → inactive
    pub deactivations: u32,
}

impl SceneNode {
    fn new(name: &str, prefab: Option<PrefabId>, transform: Transform) -> Self {
        Self {
            name: name.to_string(),
            prefab,
            transform,
            parent: None,
            active: true,
            tag: String::new(),
            layer: 0,
            projector: ProjectorState::default(),
            deactivations: 0,
        }
    }
}

/// In-memory scene graph
#[derive(Resource, Debug, Default)]
pub struct HeadlessScene {
    next_id: u32,
    nodes: BTreeMap<NodeId, SceneNode>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, node: SceneNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    /// Surface с tag и layer (стена, персонаж, броня)
    pub fn create_surface(&mut self, name: &str, transform: Transform, tag: &str, layer: u32) -> NodeId {
        let mut node = SceneNode::new(name, None, transform);
        node.tag = tag.to_string();
        node.layer = layer;
        self.allocate(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Прямые потомки узла
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent == Some(id))
            .map(|(child, _)| *child)
            .collect()
    }

    /// Детерминированный snapshot (сравнение прогонов с одним seed)
    pub fn snapshot(&self) -> Vec<u8> {
        let mut snapshot = Vec::new();

        for (id, node) in &self.nodes {
            snapshot.extend_from_slice(&id.0.to_le_bytes());
            snapshot.extend_from_slice(
                format!(
                    "{}|{:?}|{:?}|{:?}|{}|{:?}",
                    node.name, node.transform, node.parent, node.active, node.deactivations, node.projector
                )
                .as_bytes(),
            );
        }

        snapshot
    }

    fn collect_subtree(&self, root: NodeId, out: &mut Vec<NodeId>) {
        out.push(root);
        for child in self.children(root) {
            self.collect_subtree(child, out);
        }
    }
}

impl SceneGraph for HeadlessScene {
    fn create_node(&mut self, name: &str, transform: Transform) -> NodeId {
        self.allocate(SceneNode::new(name, None, transform))
    }

    fn instantiate(&mut self, prefab: &PrefabId, transform: Transform) -> NodeId {
        self.allocate(SceneNode::new(&prefab.0, Some(prefab.clone()), transform))
    }

    fn destroy(&mut self, node: NodeId) {
        if !self.contains(node) {
            return;
        }

        let mut subtree = Vec::new();
        self.collect_subtree(node, &mut subtree);

        for id in subtree {
            self.nodes.remove(&id);
        }
    }

    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) {
        // Parent должен существовать и не быть самим узлом
        let parent = parent.filter(|p| *p != node && self.contains(*p));

        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.parent = parent;
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.transform = transform;
        }
    }

    fn set_active(&mut self, node: NodeId, active: bool) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            if entry.active && !active {
                entry.deactivations += 1;
            }
            entry.active = active;
        }
    }

    fn tag(&self, node: NodeId) -> &str {
        self.nodes.get(&node).map(|n| n.tag.as_str()).unwrap_or("")
    }

    fn layer(&self, node: NodeId) -> u32 {
        self.nodes.get(&node).map(|n| n.layer).unwrap_or(0)
    }
}

impl DecalProjector for HeadlessScene {
    fn set_material(&mut self, instance: NodeId, material: MaterialId) {
        if let Some(entry) = self.nodes.get_mut(&instance) {
            entry.projector.material = Some(material);
        }
    }

    fn set_projection_size(&mut self, instance: NodeId, size: f32) {
        if let Some(entry) = self.nodes.get_mut(&instance) {
            entry.projector.size = size;
        }
    }

    fn set_projection_depth(&mut self, instance: NodeId, depth: f32) {
        if let Some(entry) = self.nodes.get_mut(&instance) {
            entry.projector.depth = depth;
        }
    }
}

// ============================================================================
// Headless physics
// ============================================================================

/// Прямоугольная панель нулевой толщины
#[derive(Debug, Clone)]
pub struct SurfacePanel {
    pub node: NodeId,
    pub center: Vec3,
    /// Нормаль лицевой стороны (нормализована)
    pub normal: Vec3,
    /// Половины размеров вдоль локальных X/Y панели
    pub half_extents: Vec2,
    pub layer: u32,
}

impl SurfacePanel {
    fn intersect(&self, ray: &Ray3d, max_distance: f32) -> Option<HitEvent> {
        let plane_normal = Dir3::new(self.normal).ok()?;
        let distance = ray.intersect_plane(self.center, InfinitePlane3d { normal: plane_normal })?;

        if distance < RAY_SKIN || distance > max_distance {
            return None;
        }

        let point = ray.get_point(distance);

        // Проверка границ в локальном frame панели
        let rotation = from_to_rotation(Vec3::Z, self.normal);
        let local = rotation.inverse() * (point - self.center);
        if local.x.abs() > self.half_extents.x || local.y.abs() > self.half_extents.y {
            return None;
        }

        // Нормаль навстречу лучу (панель двусторонняя)
        let normal = if self.normal.dot(*ray.direction) > 0.0 {
            -self.normal
        } else {
            self.normal
        };

        Some(HitEvent {
            point,
            normal,
            collider: self.node,
            distance,
        })
    }
}

/// In-memory spatial query service
#[derive(Resource, Debug, Default)]
pub struct HeadlessPhysics {
    panels: Vec<SurfacePanel>,
}

impl HeadlessPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_panel(&mut self, panel: SurfacePanel) {
        self.panels.push(panel);
    }
}

impl SpatialQuery for HeadlessPhysics {
    fn raycast_first(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<HitEvent> {
        self.raycast_all(origin, direction, max_distance, mask)
            .into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Vec<HitEvent> {
        let Ok(direction) = Dir3::new(direction) else {
            return Vec::new();
        };
        let ray = Ray3d::new(origin, direction);

        self.panels
            .iter()
            .filter(|panel| mask.contains(panel.layer))
            .filter_map(|panel| panel.intersect(&ray, max_distance))
            .collect()
    }
}

/// Описание surface для `spawn_surface`
#[derive(Debug, Clone)]
pub struct SurfaceDesc {
    pub name: String,
    pub tag: String,
    pub layer: u32,
    pub center: Vec3,
    pub normal: Vec3,
    pub half_extents: Vec2,
}

impl SurfaceDesc {
    /// Панель, перпендикулярная оси Z (стена поперёк коридора)
    pub fn wall(name: &str, z: f32, tag: &str, layer: u32) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            layer,
            center: Vec3::new(0.0, 0.0, z),
            normal: Vec3::NEG_Z,
            half_extents: Vec2::splat(5.0),
        }
    }
}

/// Регистрирует surface в сцене и в физике
pub fn spawn_surface(scene: &mut HeadlessScene, physics: &mut HeadlessPhysics, desc: SurfaceDesc) -> NodeId {
    let normal = desc.normal.try_normalize().unwrap_or(Vec3::NEG_Z);
    let transform = Transform::from_translation(desc.center).with_rotation(from_to_rotation(Vec3::Z, normal));

    let node = scene.create_surface(&desc.name, transform, &desc.tag, desc.layer);

    physics.add_panel(SurfacePanel {
        node,
        center: desc.center,
        normal,
        half_extents: desc.half_extents,
        layer: desc.layer,
    });

    node
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor(count: u32) -> (HeadlessScene, HeadlessPhysics, Vec<NodeId>) {
        let mut scene = HeadlessScene::new();
        let mut physics = HeadlessPhysics::new();
        let walls = (1..=count)
            .map(|i| spawn_surface(&mut scene, &mut physics, SurfaceDesc::wall("wall", i as f32, "", 0)))
            .collect();
        (scene, physics, walls)
    }

    #[test]
    fn test_raycast_all_hits_every_wall_in_range() {
        let (_scene, physics, walls) = corridor(4);

        let hits = physics.raycast_all(Vec3::ZERO, Vec3::Z, 3.5, LayerMask::ALL);

        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| walls.contains(&h.collider)));
        assert!(hits.iter().all(|h| h.normal.abs_diff_eq(Vec3::NEG_Z, 1e-5)));
    }

    #[test]
    fn test_raycast_first_returns_closest() {
        let (_scene, physics, walls) = corridor(3);

        let hit = physics.raycast_first(Vec3::ZERO, Vec3::Z, 10.0, LayerMask::ALL).unwrap();

        assert_eq!(hit.collider, walls[0]);
        assert!((hit.distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_backward_ray_gets_flipped_normal_and_skips_start_surface() {
        let (_scene, physics, walls) = corridor(3);

        // Луч стартует на стене 3 и идёт назад к origin
        let hits = physics.raycast_all(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z, 3.0, LayerMask::ALL);

        assert_eq!(hits.len(), 2);
        assert!(!hits.iter().any(|h| h.collider == walls[2]));
        assert!(hits.iter().all(|h| h.normal.abs_diff_eq(Vec3::Z, 1e-5)));
    }

    #[test]
    fn test_mask_filters_layers() {
        let mut scene = HeadlessScene::new();
        let mut physics = HeadlessPhysics::new();
        spawn_surface(&mut scene, &mut physics, SurfaceDesc::wall("wall", 1.0, "", 0));
        let armor = spawn_surface(&mut scene, &mut physics, SurfaceDesc::wall("armor", 2.0, "Metal", 6));

        let hits = physics.raycast_all(Vec3::ZERO, Vec3::Z, 10.0, LayerMask::layer(6));

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].collider, armor);
        assert_eq!(scene.tag(armor), "Metal");
        assert_eq!(scene.layer(armor), 6);
    }

    #[test]
    fn test_ray_outside_panel_bounds_misses() {
        let (_scene, physics, _walls) = corridor(1);

        let hit = physics.raycast_first(Vec3::new(20.0, 0.0, 0.0), Vec3::Z, 10.0, LayerMask::ALL);

        assert!(hit.is_none());
    }

    #[test]
    fn test_destroy_removes_subtree_and_keeps_siblings() {
        let mut scene = HeadlessScene::new();
        let root = scene.create_node("root", Transform::IDENTITY);
        let child = scene.create_node("child", Transform::IDENTITY);
        let grandchild = scene.create_node("grandchild", Transform::IDENTITY);
        let sibling = scene.create_node("sibling", Transform::IDENTITY);
        scene.reparent(child, Some(root));
        scene.reparent(grandchild, Some(child));

        scene.destroy(root);

        assert!(!scene.contains(root));
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.contains(sibling));
    }

    #[test]
    fn test_deactivation_counter_counts_transitions_only() {
        let mut scene = HeadlessScene::new();
        let node = scene.create_node("decal", Transform::IDENTITY);

        scene.set_active(node, false);
        scene.set_active(node, false);
        scene.set_active(node, true);
        scene.set_active(node, false);

        assert_eq!(scene.node(node).unwrap().deactivations, 2);
    }
}
