//! Decal configuration tables
//!
//! Два независимых table: primary decals (`DecalStyle`) и splatter
//! (`SplatterStyle`). Правила resolve одинаковые:
//! 1. Точное совпадение tag
//! 2. Иначе: ПОСЛЕДНЯЯ запись с пустым tag (fallback)
//! 3. Иначе: первая запись table
//!
//! Пустой table → `None` (caller пропускает размещение).
//! Tables грузятся один раз на старте и не мутируются.

use serde::Deserialize;

use crate::scene::MaterialId;

/// Запись table с override tag
pub trait TaggedStyle {
    /// Пустой tag = fallback запись
    fn override_tag(&self) -> &str;
}

/// Стиль primary decal
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecalStyle {
    /// Override tag ("" = default/fallback)
    pub tag: String,

    /// Материалы, из которых случайно выбирается один на каждый decal
    pub materials: Vec<MaterialId>,

    /// Размер проекции (orthographic size projector'а)
    pub size: f32,

    /// Глубина проекции (far clip plane projector'а)
    pub depth: f32,
}

impl Default for DecalStyle {
    fn default() -> Self {
        Self {
            tag: String::new(),
            materials: Vec::new(),
            size: 0.1,
            depth: 0.5,
        }
    }
}

impl DecalStyle {
    pub fn new(tag: &str, materials: &[u32], size: f32, depth: f32) -> Self {
        Self {
            tag: tag.to_string(),
            materials: materials.iter().copied().map(MaterialId).collect(),
            size,
            depth,
        }
    }
}

impl TaggedStyle for DecalStyle {
    fn override_tag(&self) -> &str {
        &self.tag
    }
}

/// Стиль splatter cluster (decal style + количество и разброс)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SplatterStyle {
    /// Tag, материалы, size/depth (те же правила, что у primary decals)
    pub decal: DecalStyle,

    /// Сколько decals в одном cluster
    pub count: u32,

    /// Разброс по горизонтали (±, локальный X parent'а)
    pub horizontal_spread: f32,

    /// Разброс по вертикали (±, локальный Y parent'а)
    pub vertical_spread: f32,
}

impl Default for SplatterStyle {
    fn default() -> Self {
        Self {
            decal: DecalStyle {
                size: 0.3,
                depth: 1.0,
                ..DecalStyle::default()
            },
            count: 4,
            horizontal_spread: 0.5,
            vertical_spread: 0.5,
        }
    }
}

impl TaggedStyle for SplatterStyle {
    fn override_tag(&self) -> &str {
        &self.decal.tag
    }
}

/// Ordered table стилей
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StyleTable<T> {
    entries: Vec<T>,
}

impl<T> Default for StyleTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> From<Vec<T>> for StyleTable<T> {
    fn from(entries: Vec<T>) -> Self {
        Self { entries }
    }
}

impl<T: TaggedStyle> StyleTable<T> {
    pub fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [T] {
        &mut self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Стиль для tag коллайдера
    pub fn resolve(&self, tag: &str) -> Option<&T> {
        if let Some(exact) = self.entries.iter().find(|entry| entry.override_tag() == tag) {
            return Some(exact);
        }

        // Последняя пустая запись перекрывает предыдущие
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.override_tag().is_empty())
            .or_else(|| self.entries.first())
    }
}
