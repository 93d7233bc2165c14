use crate::geom::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for matching a persisted bulb record to a world position.
pub const POSITION_MATCH_TOLERANCE: f32 = 1e-4;

/// Visual category selecting which bulb/cable prototype and material a chain
/// uses. Persisted, so variants must keep their names stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulbSetType {
    RegularBulbs,
    Lanterns,
    RegularWhite,
    RegularYellow,
    RegularOrange,
    RegularRed,
    RegularBlue,
    RegularBlueDark,
    RegularGreen,
    RegularPurple,
    RegularPink,
    Pumpkin1,
    Pumpkin2,
    Pumpkin3,
    Pumpkin4,
    PaperLanternSmall,
    PaperLanternBig,
    WashingLine,
}

impl BulbSetType {
    pub const ALL: [BulbSetType; 18] = [
        BulbSetType::RegularBulbs,
        BulbSetType::Lanterns,
        BulbSetType::RegularWhite,
        BulbSetType::RegularYellow,
        BulbSetType::RegularOrange,
        BulbSetType::RegularRed,
        BulbSetType::RegularBlue,
        BulbSetType::RegularBlueDark,
        BulbSetType::RegularGreen,
        BulbSetType::RegularPurple,
        BulbSetType::RegularPink,
        BulbSetType::Pumpkin1,
        BulbSetType::Pumpkin2,
        BulbSetType::Pumpkin3,
        BulbSetType::Pumpkin4,
        BulbSetType::PaperLanternSmall,
        BulbSetType::PaperLanternBig,
        BulbSetType::WashingLine,
    ];
}

/// One persisted anchor of a cable chain: enough to regenerate the curve
/// segment ending at this anchor deterministically on reload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulbSetting {
    pub position: Vec3,
    pub tangent: Vec3,
    pub tension: f32,
    pub curve_index: i32,
    pub price: f32,
    pub set_type: BulbSetType,
}

impl BulbSetting {
    pub fn position_matches(&self, position: &Vec3) -> bool {
        self.position.approx_eq(position, POSITION_MATCH_TOLERANCE)
    }
}

/// A persisted chain: ordered anchors plus the state needed to restore its
/// interactable. `not_savable` marks a soft-deleted chain that stays in
/// memory for undo but is excluded from persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSetting {
    pub settings: Vec<BulbSetting>,
    pub turned_on: bool,
    pub created_by_player: bool,
    pub not_savable: bool,
    pub price: f32,
    pub base_price: f32,
    pub seed: i32,
}

impl ChainSetting {
    pub fn new(settings: Vec<BulbSetting>, price: f32, base_price: f32, seed: i32) -> Self {
        Self {
            settings,
            turned_on: false,
            created_by_player: true,
            not_savable: false,
            price,
            base_price,
            seed,
        }
    }

    /// A loadable chain needs at least two anchors (one curve segment) and
    /// finite geometry. Violations are skipped at the load boundary with a
    /// warning; they never abort the rest of the load.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.settings.len() < 2 {
            return Err(SettingsError::TooFewAnchors {
                count: self.settings.len(),
            });
        }
        for (i, setting) in self.settings.iter().enumerate() {
            if !setting.position.is_finite()
                || !setting.tangent.is_finite()
                || !setting.tension.is_finite()
            {
                return Err(SettingsError::NonFiniteAnchor { index: i });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("chain has {count} anchors, need at least 2")]
    TooFewAnchors { count: usize },
    #[error("anchor {index} has non-finite position, tangent or tension")]
    NonFiniteAnchor { index: usize },
}
