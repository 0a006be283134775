use std::fmt;

use railstream_common::{LodTier, ResidencyState, SectionIndex, ZoneTag};
use railstream_pool::CharacterPool;
use railstream_stream::{SectionLod, SectionStreamer, StreamingProvider};

/// Section inspector for developer tooling.
///
/// Read-only queries across the streamer, LOD manager and character pool
/// for debugging and the operator console.
pub struct SectionInspector;

impl SectionInspector {
    pub fn summary<P: StreamingProvider>(streamer: &SectionStreamer<P>) -> StreamingSummary {
        let stats = streamer.stats();
        StreamingSummary {
            current: streamer.current_section(),
            loaded: stats.loaded_sections,
            preloading: stats.preloading_sections,
            memory_mb: stats.streaming_memory_mb,
            last_load_time_ms: stats.last_load_time_ms,
            load_mask: streamer.is_load_mask_active(),
        }
    }

    pub fn inspect_section<P: StreamingProvider>(
        streamer: &SectionStreamer<P>,
        lod: &SectionLod,
        pool: &CharacterPool,
        index: SectionIndex,
    ) -> Option<SectionRow> {
        streamer.registry().get(index).map(|section| SectionRow {
            index,
            name: section.name.clone(),
            zone: section.zone,
            residency: streamer.state(index),
            lod: lod.tier(index),
            characters: pool.section_count(index),
            active_characters: pool.active_count(index),
        })
    }

    /// One row per registered section, in index order.
    pub fn rows<P: StreamingProvider>(
        streamer: &SectionStreamer<P>,
        lod: &SectionLod,
        pool: &CharacterPool,
    ) -> Vec<SectionRow> {
        streamer
            .registry()
            .iter()
            .filter_map(|s| Self::inspect_section(streamer, lod, pool, s.index))
            .collect()
    }

    /// Rows for sections that are not `Unloaded`.
    pub fn resident_rows<P: StreamingProvider>(
        streamer: &SectionStreamer<P>,
        lod: &SectionLod,
        pool: &CharacterPool,
    ) -> Vec<SectionRow> {
        Self::rows(streamer, lod, pool)
            .into_iter()
            .filter(|r| r.residency != ResidencyState::Unloaded)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingSummary {
    pub current: Option<SectionIndex>,
    pub loaded: usize,
    pub preloading: usize,
    pub memory_mb: f32,
    pub last_load_time_ms: f32,
    pub load_mask: bool,
}

impl fmt::Display for StreamingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self
            .current
            .map_or_else(|| "none".to_string(), |c| c.to_string());
        write!(
            f,
            "Streaming: current={} loaded={} preloading={} memory={:.1}MB last_load={:.1}ms mask={}",
            current, self.loaded, self.preloading, self.memory_mb, self.last_load_time_ms, self.load_mask
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub index: SectionIndex,
    pub name: String,
    pub zone: ZoneTag,
    pub residency: ResidencyState,
    pub lod: LodTier,
    pub characters: usize,
    pub active_characters: usize,
}

impl fmt::Display for SectionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<20} {:<8} {:<10} {:<14} npc {}/{}",
            self.index,
            self.name,
            format!("{:?}", self.zone),
            self.residency.label(),
            self.lod.label(),
            self.active_characters,
            self.characters,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railstream_common::Pose;
    use railstream_kernel::{CharacterRoster, SectionRegistry};
    use railstream_pool::PoolConfig;
    use railstream_stream::{DetailAssets, LatencyProvider, LodConfig, StreamingConfig};

    fn setup() -> (SectionStreamer<LatencyProvider>, SectionLod, CharacterPool) {
        let registry = SectionRegistry::zone_one();
        let mut lod = SectionLod::new(LodConfig::default());
        for section in registry.iter() {
            lod.register_section(section.index, DetailAssets::default(), [1.0; 4]);
        }
        let mut streamer = SectionStreamer::new(
            StreamingConfig::default(),
            registry,
            LatencyProvider::instant(),
        );
        streamer.enter_section(SectionIndex(3));
        lod.set_active_section(SectionIndex(3));
        (streamer, lod, CharacterPool::new(PoolConfig::default()))
    }

    #[test]
    fn summary_reports_window() {
        let (streamer, _, _) = setup();
        let summary = SectionInspector::summary(&streamer);
        assert_eq!(summary.current, Some(SectionIndex(3)));
        assert_eq!(summary.loaded, 3);
        assert_eq!(summary.preloading, 1);
        assert!(summary.to_string().contains("current=#03"));
    }

    #[test]
    fn section_row_joins_managers() {
        let (streamer, lod, mut pool) = setup();
        let mut roster = CharacterRoster::new();
        let id = roster.spawn(Pose::default());
        pool.register_character(id, SectionIndex(3), ResidencyState::Active, &mut roster)
            .unwrap();

        let row = SectionInspector::inspect_section(&streamer, &lod, &pool, SectionIndex(3)).unwrap();
        assert_eq!(row.name, "The_Pit");
        assert_eq!(row.residency, ResidencyState::Active);
        assert_eq!(row.lod, LodTier::Full);
        assert_eq!(row.active_characters, 1);
        let text = row.to_string();
        assert!(text.starts_with("#03 The_Pit"));
        assert!(text.contains("ACTIVE"));
        assert!(text.ends_with("npc 1/1"));
    }

    #[test]
    fn resident_rows_skip_unloaded() {
        let (streamer, lod, pool) = setup();
        assert_eq!(SectionInspector::rows(&streamer, &lod, &pool).len(), 15);
        let resident: Vec<SectionIndex> = SectionInspector::resident_rows(&streamer, &lod, &pool)
            .into_iter()
            .map(|r| r.index)
            .collect();
        assert_eq!(resident, [2, 3, 4, 5].map(SectionIndex).to_vec());
    }

    #[test]
    fn unknown_section_is_none() {
        let (streamer, lod, pool) = setup();
        assert!(SectionInspector::inspect_section(&streamer, &lod, &pool, SectionIndex(40)).is_none());
    }
}
