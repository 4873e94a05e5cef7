//! Layer masks для spatial queries
//!
//! ## Архитектура:
//! - **Layer (0-31):** на каком слое находится surface node (`SceneGraph::layer`)
//! - **Mask (битовая маска):** какие слои учитывает ray query / stop check / bleed check
//!
//! Membership: `mask & (1 << layer) != 0`.

use serde::Deserialize;

/// Битовая маска слоёв (32 слоя, как у физических движков)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Маска из одного слоя
    pub const fn layer(layer: u32) -> Self {
        if layer >= 32 {
            return LayerMask::NONE;
        }
        LayerMask(1 << layer)
    }

    /// Маска из нескольких слоёв
    pub fn from_layers(layers: &[u32]) -> Self {
        layers
            .iter()
            .fold(LayerMask::NONE, |mask, &layer| mask.with(layer))
    }

    pub const fn with(self, layer: u32) -> Self {
        LayerMask(self.0 | LayerMask::layer(layer).0)
    }

    pub const fn union(self, other: LayerMask) -> Self {
        LayerMask(self.0 | other.0)
    }

    pub const fn contains(self, layer: u32) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Слои headless сцены
// ============================================================================

/// Layer 0: Default (стены, пол)
pub const LAYER_DEFAULT: u32 = 0;

/// Layer 3: Characters (плоть, bleed effects)
pub const LAYER_CHARACTERS: u32 = 3;

/// Layer 6: Armor (останавливает пробитие)
pub const LAYER_ARMOR: u32 = 6;

/// Получить название слоя для debug логов
pub fn get_layer_name(layer: u32) -> &'static str {
    match layer {
        LAYER_DEFAULT => "Default",
        LAYER_CHARACTERS => "Characters",
        LAYER_ARMOR => "Armor",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_membership() {
        let mask = LayerMask::from_layers(&[LAYER_DEFAULT, LAYER_ARMOR]);

        assert!(mask.contains(LAYER_DEFAULT));
        assert!(mask.contains(LAYER_ARMOR));
        assert!(!mask.contains(LAYER_CHARACTERS));
        assert_eq!(mask.0, 0b100_0001);
    }

    #[test]
    fn test_out_of_range_layers_never_match() {
        assert_eq!(LayerMask::layer(32), LayerMask::NONE);
        assert!(!LayerMask::ALL.contains(40));
        assert!(LayerMask::ALL.contains(31));
        assert!(LayerMask::NONE.is_empty());
    }

    #[test]
    fn test_layer_names_for_logs() {
        assert_eq!(get_layer_name(LAYER_ARMOR), "Armor");
        assert_eq!(get_layer_name(LAYER_CHARACTERS), "Characters");
        assert_eq!(get_layer_name(LAYER_DEFAULT), "Default");
        assert_eq!(get_layer_name(17), "Unknown");
    }
}
