//! Object pool для decal projectors
//!
//! Фиксированная capacity (задаётся на старте). Инстансы никогда не
//! уничтожаются: только activate / deactivate + reparent под pool root.
//!
//! Политика `acquire`:
//! 1. Первый неактивный инстанс (scan по порядку создания)
//! 2. Иначе forced eviction: самый старый активный (голова usage queue)
//!    принудительно release'ится и выдаётся заново в конец очереди
//! 3. Capacity 0 → `None`
//!
//! Usage queue: VecDeque без дублей: eviction снимает старую запись
//! (через `release`) и добавляет новую в конец.

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::config::PoolSettings;
use crate::lifetime::{LifetimeScheduler, LifetimeTarget};
use crate::scene::{NodeId, PrefabId, SceneGraph};

/// Pooled instance (transform и parent живут в scene graph, таймер: в scheduler)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PooledInstance {
    pub id: NodeId,
    pub active: bool,
}

/// Pool decal projectors (single-threaded, мутируется только acquire/release)
#[derive(Resource, Debug)]
pub struct ObjectPool {
    root: NodeId,
    instances: Vec<PooledInstance>,
    /// Порядок использования (oldest first)
    active_queue: VecDeque<NodeId>,
    auto_reclaim: bool,
    reclaim_delay: f32,
    evictions: u64,
}

impl ObjectPool {
    /// Создаёт pool root и `capacity` неактивных инстансов под ним
    pub fn new<S: SceneGraph>(scene: &mut S, settings: &PoolSettings) -> Self {
        Self::with_prefab(
            scene,
            settings.capacity,
            &settings.projector_prefab,
            settings.auto_reclaim,
            settings.reclaim_delay,
        )
    }

    pub fn with_prefab<S: SceneGraph>(
        scene: &mut S,
        capacity: usize,
        prefab: &PrefabId,
        auto_reclaim: bool,
        reclaim_delay: f32,
    ) -> Self {
        let root = scene.create_node("ObjectPool", Transform::IDENTITY);

        let instances = (0..capacity)
            .map(|_| {
                let id = scene.instantiate(prefab, Transform::IDENTITY);
                scene.set_active(id, false);
                scene.reparent(id, Some(root));
                PooledInstance { id, active: false }
            })
            .collect();

        crate::logger::log(&format!(
            "🏊 ObjectPool ready: {} x '{}' (auto reclaim: {}, delay: {}s)",
            capacity, prefab.0, auto_reclaim, reclaim_delay
        ));

        Self {
            root,
            instances,
            active_queue: VecDeque::with_capacity(capacity),
            auto_reclaim,
            reclaim_delay,
            evictions: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn capacity(&self) -> usize {
        self.instances.len()
    }

    pub fn instances(&self) -> &[PooledInstance] {
        &self.instances
    }

    pub fn active_count(&self) -> usize {
        self.active_queue.len()
    }

    /// Активные инстансы, oldest first
    pub fn active_in_usage_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.active_queue.iter().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.instances.iter().any(|instance| instance.id == id)
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.instances
            .iter()
            .any(|instance| instance.id == id && instance.active)
    }

    /// Сколько раз выдача шла через forced eviction
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Выдать инстанс (свободный или forced eviction самого старого)
    pub fn acquire<S: SceneGraph>(&mut self, scene: &mut S, lifetimes: &mut LifetimeScheduler) -> Option<NodeId> {
        if let Some(index) = self.instances.iter().position(|instance| !instance.active) {
            let id = self.instances[index].id;
            self.activate(index, scene, lifetimes);
            return Some(id);
        }

        // Все заняты → забираем самый старый
        let oldest = self.active_queue.front().copied()?;
        self.release(oldest, scene, lifetimes);

        let index = self.instances.iter().position(|instance| instance.id == oldest)?;
        self.activate(index, scene, lifetimes);
        self.evictions += 1;

        crate::logger::log(&format!(
            "♻️ Pool exhausted, evicted oldest decal {:?} (evictions: {})",
            oldest, self.evictions
        ));

        Some(oldest)
    }

    /// Вернуть инстанс в pool
    ///
    /// Отменяет pending reclaim таймер, reparent под pool root, deactivate.
    /// Неактивный или чужой инстанс → false.
    pub fn release<S: SceneGraph>(&mut self, id: NodeId, scene: &mut S, lifetimes: &mut LifetimeScheduler) -> bool {
        let Some(instance) = self.instances.iter_mut().find(|instance| instance.id == id) else {
            return false;
        };

        if !instance.active {
            return false;
        }
        instance.active = false;

        lifetimes.cancel(LifetimeTarget::Pooled(id));

        // Первая запись по identity
        if let Some(position) = self.active_queue.iter().position(|queued| *queued == id) {
            self.active_queue.remove(position);
        }

        scene.reparent(id, Some(self.root));
        scene.set_active(id, false);

        true
    }

    /// Release всех активных инстансов, висящих прямо под `parent`
    pub fn release_children_of<S: SceneGraph>(
        &mut self,
        parent: NodeId,
        scene: &mut S,
        lifetimes: &mut LifetimeScheduler,
    ) -> usize {
        let children: Vec<NodeId> = self
            .active_queue
            .iter()
            .copied()
            .filter(|id| scene.parent(*id) == Some(parent))
            .collect();

        children
            .into_iter()
            .filter(|id| self.release(*id, scene, lifetimes))
            .count()
    }

    fn activate<S: SceneGraph>(&mut self, index: usize, scene: &mut S, lifetimes: &mut LifetimeScheduler) {
        let id = self.instances[index].id;
        self.instances[index].active = true;
        self.active_queue.push_back(id);

        scene.set_active(id, true);
        lifetimes.schedule(LifetimeTarget::Pooled(id), self.auto_reclaim, self.reclaim_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HeadlessScene;

    fn pool(capacity: usize) -> (HeadlessScene, LifetimeScheduler, ObjectPool) {
        let mut scene = HeadlessScene::new();
        let lifetimes = LifetimeScheduler::new(10.0);
        let pool = ObjectPool::with_prefab(&mut scene, capacity, &PrefabId::new("projector"), true, 1.0);
        (scene, lifetimes, pool)
    }

    #[test]
    fn test_new_pool_is_inactive_under_root() {
        let (scene, _lifetimes, pool) = pool(4);

        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.active_count(), 0);
        for instance in pool.instances() {
            let node = scene.node(instance.id).unwrap();
            assert!(!node.active);
            assert_eq!(node.parent, Some(pool.root()));
        }
    }

    #[test]
    fn test_n_acquires_return_distinct_active_instances() {
        let (mut scene, mut lifetimes, mut pool) = pool(5);

        let acquired: Vec<NodeId> = (0..5)
            .map(|_| pool.acquire(&mut scene, &mut lifetimes).unwrap())
            .collect();

        let mut unique = acquired.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert!(acquired.iter().all(|id| pool.is_active(*id)));
        assert!(acquired.iter().all(|id| scene.node(*id).unwrap().active));
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        let (mut scene, mut lifetimes, mut pool) = pool(3);

        let first = pool.acquire(&mut scene, &mut lifetimes).unwrap();
        let second = pool.acquire(&mut scene, &mut lifetimes).unwrap();
        let third = pool.acquire(&mut scene, &mut lifetimes).unwrap();

        // N+1 → первый, N+2 → второй, N+3 → третий, N+4 → снова первый
        assert_eq!(pool.acquire(&mut scene, &mut lifetimes), Some(first));
        assert_eq!(pool.acquire(&mut scene, &mut lifetimes), Some(second));
        assert_eq!(pool.acquire(&mut scene, &mut lifetimes), Some(third));
        assert_eq!(pool.acquire(&mut scene, &mut lifetimes), Some(first));

        assert_eq!(pool.evictions(), 4);
        assert_eq!(pool.active_count(), 3);
        assert_eq!(pool.active_in_usage_order().collect::<Vec<_>>(), vec![second, third, first]);
    }

    #[test]
    fn test_zero_capacity_never_returns_instance() {
        let (mut scene, mut lifetimes, mut pool) = pool(0);

        for _ in 0..3 {
            assert_eq!(pool.acquire(&mut scene, &mut lifetimes), None);
        }
    }

    #[test]
    fn test_release_returns_instance_to_root_and_frees_slot() {
        let (mut scene, mut lifetimes, mut pool) = pool(2);
        let surface = scene.create_surface("wall", Transform::IDENTITY, "", 0);

        let first = pool.acquire(&mut scene, &mut lifetimes).unwrap();
        scene.reparent(first, Some(surface));

        assert!(pool.release(first, &mut scene, &mut lifetimes));
        assert!(!pool.is_active(first));
        assert_eq!(scene.node(first).unwrap().parent, Some(pool.root()));
        assert!(!lifetimes.is_pending(LifetimeTarget::Pooled(first)));

        // Повторный release: no-op
        assert!(!pool.release(first, &mut scene, &mut lifetimes));

        // Свободный слот выдаётся без eviction
        assert_eq!(pool.acquire(&mut scene, &mut lifetimes), Some(first));
        assert_eq!(pool.evictions(), 0);
    }

    #[test]
    fn test_acquire_arms_reclaim_timer() {
        let (mut scene, mut lifetimes, mut pool) = pool(1);

        let id = pool.acquire(&mut scene, &mut lifetimes).unwrap();

        assert_eq!(lifetimes.expiry_of(LifetimeTarget::Pooled(id)), Some(10));
    }

    #[test]
    fn test_release_children_of_only_touches_direct_children() {
        let (mut scene, mut lifetimes, mut pool) = pool(3);
        let cluster = scene.create_node("SplatterObject", Transform::IDENTITY);

        let a = pool.acquire(&mut scene, &mut lifetimes).unwrap();
        let b = pool.acquire(&mut scene, &mut lifetimes).unwrap();
        let c = pool.acquire(&mut scene, &mut lifetimes).unwrap();
        scene.reparent(a, Some(cluster));
        scene.reparent(b, Some(cluster));

        assert_eq!(pool.release_children_of(cluster, &mut scene, &mut lifetimes), 2);
        assert!(!pool.is_active(a));
        assert!(!pool.is_active(b));
        assert!(pool.is_active(c));
    }
}
