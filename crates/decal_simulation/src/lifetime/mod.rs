//! Lifetime scheduler: отложенный repool/destroy
//!
//! # Архитектура
//!
//! Вместо "invoke after delay" на каждом объекте: явная очередь таймеров,
//! ключ `(expiry_tick, sequence)`. Очередь опрашивается один раз за
//! FixedUpdate tick (`advance`), cancellation = удаление ключа.
//!
//! - `LifetimeTarget::Pooled` → по истечении pool release (instance не уничтожается)
//! - `LifetimeTarget::Ephemeral` → по истечении destroy узла (particle parents,
//!   splatter clusters)
//!
//! Re-arm того же target отменяет предыдущий таймер. Pool release отменяет
//! таймер instance'а: повторного срабатывания после release не бывает.
//!
//! # Почему ticks, а не секунды?
//!
//! - **Детерминизм:** tick counter растёт в FixedUpdate (не зависит от FPS)
//! - **Порядок:** таймеры с одинаковым tick срабатывают в порядке постановки

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use crate::pool::ObjectPool;
use crate::scene::{NodeId, SceneGraph};

/// Частота FixedUpdate по умолчанию (Hz)
pub const DEFAULT_TICK_HZ: f32 = 60.0;

/// Что истекает
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifetimeTarget {
    /// Pooled decal instance → release в pool
    Pooled(NodeId),

    /// Эфемерный узел (particle parent, splatter cluster) → destroy
    Ephemeral(NodeId),
}

impl LifetimeTarget {
    pub fn node(&self) -> NodeId {
        match self {
            LifetimeTarget::Pooled(node) | LifetimeTarget::Ephemeral(node) => *node,
        }
    }
}

type TimerKey = (u64, u64);

/// Очередь отложенных deactivation/destruction
#[derive(Resource, Debug)]
pub struct LifetimeScheduler {
    /// Текущий tick (растёт в `advance`)
    tick: u64,
    tick_hz: f32,
    next_seq: u64,
    queue: BTreeMap<TimerKey, LifetimeTarget>,
    pending: HashMap<LifetimeTarget, TimerKey>,
}

impl Default for LifetimeScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_HZ)
    }
}

impl LifetimeScheduler {
    pub fn new(tick_hz: f32) -> Self {
        let tick_hz = if tick_hz.is_finite() && tick_hz > 0.0 { tick_hz } else { DEFAULT_TICK_HZ };

        Self {
            tick: 0,
            tick_hz,
            next_seq: 0,
            queue: BTreeMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Секунды → ticks (ceil, минимум 1 tick)
    pub fn delay_to_ticks(&self, delay: f32) -> u64 {
        if !delay.is_finite() || delay <= 0.0 {
            return 1;
        }
        ((delay * self.tick_hz).ceil() as u64).max(1)
    }

    /// Взвести one-shot таймер
    ///
    /// `enabled == false`: no-op (как выключенный auto-repool).
    /// Повторный schedule того же target отменяет предыдущий таймер.
    /// Возвращает tick срабатывания.
    pub fn schedule(&mut self, target: LifetimeTarget, enabled: bool, delay: f32) -> Option<u64> {
        if !enabled {
            return None;
        }

        self.cancel(target);

        let expiry = self.tick + self.delay_to_ticks(delay);
        let key = (expiry, self.next_seq);
        self.next_seq += 1;

        self.queue.insert(key, target);
        self.pending.insert(target, key);

        Some(expiry)
    }

    /// Отменить таймер target'а (true если он был взведён)
    pub fn cancel(&mut self, target: LifetimeTarget) -> bool {
        match self.pending.remove(&target) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, target: LifetimeTarget) -> bool {
        self.pending.contains_key(&target)
    }

    pub fn expiry_of(&self, target: LifetimeTarget) -> Option<u64> {
        self.pending.get(&target).map(|(expiry, _)| *expiry)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Следующий tick: вернуть все истёкшие target'ы (в порядке постановки)
    pub fn advance(&mut self) -> Vec<LifetimeTarget> {
        self.tick += 1;

        let mut expired = Vec::new();
        while let Some((&key, _)) = self.queue.first_key_value() {
            if key.0 > self.tick {
                break;
            }
            if let Some((_, target)) = self.queue.pop_first() {
                self.pending.remove(&target);
                expired.push(target);
            }
        }

        expired
    }
}

/// Применить истёкшие таймеры
///
/// Pooled → release в pool. Ephemeral → сначала release pooled инстансов,
/// которые ещё висят под узлом (pooled instance никогда не уничтожается),
/// потом destroy узла вместе с потомками.
///
/// Возвращает количество обработанных target'ов.
pub fn apply_expired<S: SceneGraph>(
    expired: &[LifetimeTarget],
    pool: &mut ObjectPool,
    lifetimes: &mut LifetimeScheduler,
    scene: &mut S,
) -> usize {
    let mut applied = 0;

    for target in expired {
        match *target {
            LifetimeTarget::Pooled(instance) => {
                if pool.release(instance, scene, lifetimes) {
                    applied += 1;
                }
            }
            LifetimeTarget::Ephemeral(node) => {
                let released = pool.release_children_of(node, scene, lifetimes);
                if released > 0 {
                    crate::logger::log(&format!(
                        "♻️ Released {} pooled decals before destroying {:?}",
                        released, node
                    ));
                }
                scene.destroy(node);
                applied += 1;
            }
        }
    }

    applied
}

/// Система: следующий tick scheduler'а + применение истёкших таймеров
pub fn advance_lifetimes<S: SceneGraph + Resource>(
    mut lifetimes: ResMut<LifetimeScheduler>,
    mut pool: ResMut<ObjectPool>,
    mut scene: ResMut<S>,
) {
    let expired = lifetimes.advance();
    if expired.is_empty() {
        return;
    }

    apply_expired(&expired, &mut pool, &mut lifetimes, &mut *scene);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_to_ticks() {
        let scheduler = LifetimeScheduler::new(60.0);

        assert_eq!(scheduler.delay_to_ticks(1.0), 60);
        assert_eq!(scheduler.delay_to_ticks(0.01), 1);
        assert_eq!(scheduler.delay_to_ticks(0.0), 1);
        assert_eq!(scheduler.delay_to_ticks(-3.0), 1);
        assert_eq!(scheduler.delay_to_ticks(10.0), 600);
    }

    #[test]
    fn test_timer_fires_once_at_expiry() {
        let mut scheduler = LifetimeScheduler::new(10.0);
        let target = LifetimeTarget::Ephemeral(NodeId(1));

        assert_eq!(scheduler.schedule(target, true, 0.5), Some(5));

        for _ in 0..4 {
            assert!(scheduler.advance().is_empty());
        }
        assert_eq!(scheduler.advance(), vec![target]);
        assert!(scheduler.advance().is_empty());
        assert!(!scheduler.is_pending(target));
    }

    #[test]
    fn test_disabled_schedule_is_noop() {
        let mut scheduler = LifetimeScheduler::new(10.0);
        let target = LifetimeTarget::Pooled(NodeId(1));

        assert_eq!(scheduler.schedule(target, false, 1.0), None);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_rearm_replaces_previous_timer() {
        let mut scheduler = LifetimeScheduler::new(10.0);
        let target = LifetimeTarget::Pooled(NodeId(7));

        scheduler.schedule(target, true, 0.2);
        scheduler.advance();
        scheduler.schedule(target, true, 0.5); // re-arm на tick 1 → expiry 6

        let mut fired = Vec::new();
        for _ in 0..10 {
            fired.extend(scheduler.advance());
        }

        assert_eq!(fired, vec![target]);
        assert_eq!(scheduler.tick(), 11);
    }

    #[test]
    fn test_cancel_removes_pending_timer() {
        let mut scheduler = LifetimeScheduler::new(10.0);
        let target = LifetimeTarget::Pooled(NodeId(3));

        scheduler.schedule(target, true, 0.1);
        assert!(scheduler.cancel(target));
        assert!(!scheduler.cancel(target));

        assert!(scheduler.advance().is_empty());
        assert!(scheduler.advance().is_empty());
    }

    #[test]
    fn test_same_tick_fires_in_schedule_order() {
        let mut scheduler = LifetimeScheduler::new(10.0);
        let first = LifetimeTarget::Ephemeral(NodeId(9));
        let second = LifetimeTarget::Pooled(NodeId(2));

        scheduler.schedule(first, true, 0.1);
        scheduler.schedule(second, true, 0.1);

        assert_eq!(scheduler.advance(), vec![first, second]);
    }
}
