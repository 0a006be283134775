use std::collections::BTreeMap;

use railstream_common::{AssetHandle, LodTier, SectionIndex};
use railstream_kernel::GameplayEvent;
use serde::{Deserialize, Serialize};

/// Distance thresholds (in sections) and per-tier triangle budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    pub lod1_max_distance: u32,
    pub lod2_max_distance: u32,
    /// Anything further away than this is an impostor regardless of tier
    /// thresholds.
    pub max_visible_distance: u32,
    pub reduced_triangle_budget: u32,
    pub shell_triangle_budget: u32,
    pub impostor_triangle_budget: u32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            lod1_max_distance: 1,
            lod2_max_distance: 5,
            max_visible_distance: 10,
            reduced_triangle_budget: 5000,
            shell_triangle_budget: 1000,
            impostor_triangle_budget: 100,
        }
    }
}

/// Cheap stand-ins drawn for a section seen from outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailAssets {
    pub shell_mesh: Option<AssetHandle>,
    pub impostor_texture: Option<AssetHandle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodEntry {
    pub section: SectionIndex,
    pub tier: LodTier,
    pub assets: DetailAssets,
    pub tint: [f32; 4],
}

/// Assigns each registered section a detail tier from its distance to the
/// active section.
///
/// Purely advisory: changing a tier never loads or unloads anything.
#[derive(Debug, Default)]
pub struct SectionLod {
    config: LodConfig,
    entries: BTreeMap<SectionIndex, LodEntry>,
    active: Option<SectionIndex>,
    events: Vec<GameplayEvent>,
}

impl SectionLod {
    pub fn new(config: LodConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Track a section. New entries start as impostors and pick up their
    /// real tier immediately if an active section is known.
    pub fn register_section(&mut self, section: SectionIndex, assets: DetailAssets, tint: [f32; 4]) {
        self.entries.insert(
            section,
            LodEntry {
                section,
                tier: LodTier::Impostor,
                assets,
                tint,
            },
        );
        if let Some(active) = self.active {
            self.recompute(section, active);
        }
    }

    pub fn unregister_section(&mut self, section: SectionIndex) -> Option<LodEntry> {
        self.entries.remove(&section)
    }

    /// Recompute tiers around a new active section. Setting the same
    /// section again does nothing.
    pub fn set_active_section(&mut self, active: SectionIndex) {
        if self.active == Some(active) {
            return;
        }
        self.active = Some(active);
        self.refresh();
    }

    pub fn active_section(&self) -> Option<SectionIndex> {
        self.active
    }

    /// Replace thresholds and re-tier every section right away.
    pub fn set_config(&mut self, config: LodConfig) {
        self.config = config;
        self.refresh();
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    fn refresh(&mut self) {
        let Some(active) = self.active else {
            return;
        };
        let _span = tracing::info_span!("section_lod_refresh", %active).entered();
        let sections: Vec<SectionIndex> = self.entries.keys().copied().collect();
        for section in sections {
            self.recompute(section, active);
        }
    }

    fn recompute(&mut self, section: SectionIndex, active: SectionIndex) {
        let tier = self.tier_for_distance(section.distance(active));
        let Some(entry) = self.entries.get_mut(&section) else {
            return;
        };
        if entry.tier == tier {
            return;
        }
        tracing::trace!(%section, from = entry.tier.label(), to = tier.label(), "lod tier changed");
        entry.tier = tier;
        self.events
            .push(GameplayEvent::SectionLodChanged { section, tier });
    }

    pub fn tier_for_distance(&self, distance: u32) -> LodTier {
        if distance == 0 {
            LodTier::Full
        } else if distance > self.config.max_visible_distance {
            LodTier::Impostor
        } else if distance <= self.config.lod1_max_distance {
            LodTier::Reduced
        } else if distance <= self.config.lod2_max_distance {
            LodTier::Shell
        } else {
            LodTier::Impostor
        }
    }

    /// Tier of a section; unregistered sections read as impostors.
    pub fn tier(&self, section: SectionIndex) -> LodTier {
        self.entries
            .get(&section)
            .map_or(LodTier::Impostor, |e| e.tier)
    }

    pub fn entry(&self, section: SectionIndex) -> Option<&LodEntry> {
        self.entries.get(&section)
    }

    /// Triangle budget for a tier. `Full` is unbounded.
    pub fn triangle_budget(&self, tier: LodTier) -> Option<u32> {
        match tier {
            LodTier::Full => None,
            LodTier::Reduced => Some(self.config.reduced_triangle_budget),
            LodTier::Shell => Some(self.config.shell_triangle_budget),
            LodTier::Impostor => Some(self.config.impostor_triangle_budget),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LodEntry> {
        self.entries.values()
    }

    pub fn drain_events(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.events)
    }
}
