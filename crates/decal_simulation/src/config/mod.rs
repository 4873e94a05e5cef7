//! Decal settings (data-driven конфигурация)
//!
//! Один `DecalSettings` resource на всё: pool, decal/splatter tables,
//! bleed, shooting (penetration + exit decals + ballistic mode).
//!
//! Грузится из RON один раз на старте. Ошибки загрузки (`ConfigError`):
//! только load-time: per-frame код видит уже валидированные настройки.

use std::path::Path;

use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::scene::layers::{LAYER_ARMOR, LAYER_CHARACTERS};
use crate::scene::{LayerMask, PrefabId};
use crate::styles::{DecalStyle, SplatterStyle, StyleTable};

/// Время жизни bleed particle parent'а (секунды)
pub const BLEED_EFFECT_LIFETIME: f32 = 10.0;

/// Время жизни splatter particle parent'а (секунды)
pub const SPLATTER_EFFECT_LIFETIME: f32 = 3.0;

/// Сдвиг от поверхности вдоль нормали (против z-fighting)
pub const SURFACE_OFFSET: f32 = 1e-3;

/// Дальность probe луча projectile contact (метры)
pub const CONTACT_PROBE_DISTANCE: f32 = 1.0;

/// Насколько exit probe стартует за границей выхода (метры)
pub const EXIT_PROBE_OFFSET: f32 = 0.05;

/// Ошибка загрузки конфига
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read decal config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse decal config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Object pool settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Количество pooled projectors (фиксировано на старте)
    pub capacity: usize,

    /// Auto-release через `reclaim_delay` после активации
    pub auto_reclaim: bool,

    /// Задержка auto-release (секунды)
    pub reclaim_delay: f32,

    /// Prefab pooled инстанса (projector)
    pub projector_prefab: PrefabId,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            auto_reclaim: true,
            reclaim_delay: 5.0,
            projector_prefab: PrefabId::new("decal_projector"),
        }
    }
}

/// Splatter settings (exit hits)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SplatterSettings {
    pub enabled: bool,

    /// Splatter table (resolve по tag ИСХОДНОГО hit'а)
    pub styles: StyleTable<SplatterStyle>,

    /// Particle effect в точке выхода (None = без particles)
    pub particle: Option<PrefabId>,

    /// Дальность splatter луча (метры)
    pub range: f32,

    /// Слои, на которые ложится splatter
    pub mask: LayerMask,
}

impl Default for SplatterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            styles: StyleTable::new(vec![SplatterStyle {
                decal: DecalStyle::new("", &[30, 31, 32], 0.3, 1.0),
                ..SplatterStyle::default()
            }]),
            particle: Some(PrefabId::new("splatter_particles")),
            range: 3.0,
            mask: LayerMask::ALL,
        }
    }
}

/// Bleed settings (entry hits)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BleedSettings {
    pub enabled: bool,

    pub particle: Option<PrefabId>,

    /// Шанс bleed effect, 0..=100
    pub chance: f32,

    /// Слои, на которых возможен bleed
    pub layers: LayerMask,
}

impl Default for BleedSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            particle: Some(PrefabId::new("bleed_particles")),
            chance: 50.0,
            layers: LayerMask::layer(LAYER_CHARACTERS),
        }
    }
}

/// Режим стрельбы
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum ShootingMode {
    /// Мгновенный raycast от камеры
    Hitscan,

    /// Летящий projectile (trigger contacts)
    Ballistic {
        /// Скорость (м/с)
        speed: f32,
        /// Ускорение вниз (м/с²)
        gravity: f32,
        /// Время жизни projectile (секунды)
        lifetime: f32,
    },
}

impl Default for ShootingMode {
    fn default() -> Self {
        Self::Hitscan
    }
}

/// Shooting settings (hit resolution)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShootingSettings {
    pub mode: ShootingMode,

    /// Дальность hitscan луча (метры)
    pub range: f32,

    /// Слои, по которым идёт penetration walk и exit queries
    pub hit_layers: LayerMask,

    /// Слои, которые всегда останавливают пробитие
    pub stop_layers: LayerMask,

    /// Включено ли пробитие
    pub penetration: bool,

    /// Сколько поверхностей можно пробить до остановки
    pub penetrations: u32,

    /// Ставить ли exit decals
    pub exit_decals: bool,
}

impl Default for ShootingSettings {
    fn default() -> Self {
        Self {
            mode: ShootingMode::Hitscan,
            range: 100.0,
            hit_layers: LayerMask::ALL,
            stop_layers: LayerMask::layer(LAYER_ARMOR),
            penetration: true,
            penetrations: 2,
            exit_decals: true,
        }
    }
}

/// Все настройки decal системы
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecalSettings {
    pub pool: PoolSettings,
    pub decals: StyleTable<DecalStyle>,
    pub splatter: SplatterSettings,
    pub bleed: BleedSettings,
    pub shooting: ShootingSettings,
}

impl Default for DecalSettings {
    fn default() -> Self {
        Self {
            pool: PoolSettings::default(),
            decals: StyleTable::new(vec![
                DecalStyle::new("", &[1, 2, 3], 0.1, 0.5),
                DecalStyle::new("Metal", &[10, 11], 0.08, 0.3),
                DecalStyle::new("Flesh", &[20, 21], 0.12, 0.5),
            ]),
            splatter: SplatterSettings::default(),
            bleed: BleedSettings::default(),
            shooting: ShootingSettings::default(),
        }
    }
}

impl DecalSettings {
    /// Парсинг RON строки (с валидацией)
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let mut settings: DecalSettings = ron::from_str(source)?;
        settings.validate();
        Ok(settings)
    }

    /// Загрузка RON файла (с валидацией)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let settings = Self::from_ron_str(&source)?;
        crate::logger::log_info(&format!(
            "📄 Decal settings loaded from {} (pool: {}, decal styles: {}, splatter styles: {})",
            path.display(),
            settings.pool.capacity,
            settings.decals.len(),
            settings.splatter.styles.len()
        ));

        Ok(settings)
    }

    /// Приводит значения к допустимым диапазонам
    ///
    /// Возвращает список предупреждений (они же уходят в logger).
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        self.pool.reclaim_delay = sanitize_non_negative(self.pool.reclaim_delay);
        self.splatter.range = sanitize_non_negative(self.splatter.range);
        self.shooting.range = sanitize_non_negative(self.shooting.range);

        let chance = if self.bleed.chance.is_finite() { self.bleed.chance } else { 0.0 };
        if !(0.0..=100.0).contains(&chance) {
            warnings.push(format!("bleed chance {} clamped to 0..=100", self.bleed.chance));
        }
        self.bleed.chance = chance.clamp(0.0, 100.0);

        for style in self.splatter.styles.entries_mut() {
            if style.horizontal_spread < 0.0 || style.vertical_spread < 0.0 {
                warnings.push(format!(
                    "splatter style '{}' has negative spread, using absolute value",
                    style.decal.tag
                ));
            }
            style.horizontal_spread = sanitize_non_negative(style.horizontal_spread.abs());
            style.vertical_spread = sanitize_non_negative(style.vertical_spread.abs());
        }

        if let ShootingMode::Ballistic { speed, gravity, lifetime } = &mut self.shooting.mode {
            *speed = sanitize_non_negative(*speed);
            *gravity = if gravity.is_finite() { *gravity } else { 0.0 };
            *lifetime = sanitize_non_negative(*lifetime);
        }

        if self.decals.is_empty() {
            warnings.push("decal table is empty, decals will not be placed".to_string());
        }
        if self.splatter.enabled && self.splatter.styles.is_empty() {
            warnings.push("splatter table is empty, splatter clusters will not be placed".to_string());
        }
        if self.pool.capacity == 0 {
            warnings.push("pool capacity is zero, no decal instances available".to_string());
        }

        for warning in &warnings {
            crate::logger::log_warning(&format!("⚠️ DecalSettings: {}", warning));
        }

        warnings
    }
}

fn sanitize_non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
