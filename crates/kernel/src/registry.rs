use railstream_common::{AssetHandle, SectionIndex, ZoneTag};
use serde::{Deserialize, Serialize};

/// One streamable unit of the world (a train car).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub index: SectionIndex,
    pub name: String,
    pub asset: AssetHandle,
    /// Estimated memory cost while resident, in megabytes.
    pub estimated_memory_mb: f32,
    pub zone: ZoneTag,
}

/// Static table of every section in the world, built once by the world
/// population pass.
///
/// Indices are contiguous: the n-th pushed section gets index n.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionRegistry {
    sections: Vec<Section>,
}

/// Tail cars of the first zone: (name, sublevel).
const ZONE_ONE_CARS: [(&str, &str); 15] = [
    ("Caboose", "Zone1_Car00_Caboose"),
    ("Tail_Quarters_A", "Zone1_Car01_Tail_Quarters_A"),
    ("Tail_Quarters_B", "Zone1_Car02_Tail_Quarters_B"),
    ("The_Pit", "Zone1_Car03_The_Pit"),
    ("Nursery", "Zone1_Car04_Nursery"),
    ("Elders_Car", "Zone1_Car05_Elders_Car"),
    ("Sickbay", "Zone1_Car06_Sickbay"),
    ("Workshop", "Zone1_Car07_Workshop"),
    ("Listening_Post", "Zone1_Car08_Listening_Post"),
    ("Blockade", "Zone1_Car09_Blockade"),
    ("Dark_Car", "Zone1_Car10_Dark_Car"),
    ("Freezer_Breach", "Zone1_Car11_Freezer_Breach"),
    ("Kronole_Den", "Zone1_Car12_Kronole_Den"),
    ("Smugglers_Cache", "Zone1_Car13_Smugglers_Cache"),
    ("Martyrs_Gate", "Zone1_Car14_Martyrs_Gate"),
];

const ZONE_ONE_CAR_MEMORY_MB: f32 = 50.0;

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section and return the index it was assigned.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        asset: AssetHandle,
        estimated_memory_mb: f32,
        zone: ZoneTag,
    ) -> SectionIndex {
        let index = SectionIndex(self.sections.len() as u32);
        self.sections.push(Section {
            index,
            name: name.into(),
            asset,
            estimated_memory_mb,
            zone,
        });
        index
    }

    /// A generated train of `count` identical cars.
    ///
    /// Zones are assigned in equal consecutive runs from tail to engine.
    pub fn uniform(count: u32, estimated_memory_mb: f32) -> Self {
        const ZONES: [ZoneTag; 5] = [
            ZoneTag::Tail,
            ZoneTag::Third,
            ZoneTag::Second,
            ZoneTag::First,
            ZoneTag::Engine,
        ];
        let mut registry = Self::new();
        let run = count.div_ceil(ZONES.len() as u32).max(1);
        for i in 0..count {
            let zone = ZONES[((i / run) as usize).min(ZONES.len() - 1)];
            registry.push(
                format!("Car_{i:03}"),
                AssetHandle::new(format!("Train_Car{i:03}")),
                estimated_memory_mb,
                zone,
            );
        }
        registry
    }

    /// The built-in table of the fifteen tail cars.
    pub fn zone_one() -> Self {
        let mut registry = Self::new();
        for (name, level) in ZONE_ONE_CARS {
            registry.push(
                name,
                AssetHandle::new(level),
                ZONE_ONE_CAR_MEMORY_MB,
                ZoneTag::Tail,
            );
        }
        registry
    }

    pub fn get(&self, index: SectionIndex) -> Option<&Section> {
        self.sections.get(index.0 as usize)
    }

    pub fn contains(&self, index: SectionIndex) -> bool {
        (index.0 as usize) < self.sections.len()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Sum of estimated memory over the whole train.
    pub fn total_memory_mb(&self) -> f32 {
        self.sections.iter().map(|s| s.estimated_memory_mb).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_contiguous_indices() {
        let mut registry = SectionRegistry::new();
        let a = registry.push("a", AssetHandle::new("A"), 10.0, ZoneTag::Tail);
        let b = registry.push("b", AssetHandle::new("B"), 20.0, ZoneTag::Third);
        assert_eq!(a, SectionIndex(0));
        assert_eq!(b, SectionIndex(1));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.total_memory_mb(), 30.0);
    }

    #[test]
    fn unknown_index_is_absent() {
        let registry = SectionRegistry::uniform(3, 10.0);
        assert!(registry.contains(SectionIndex(2)));
        assert!(!registry.contains(SectionIndex(3)));
        assert!(registry.get(SectionIndex(99)).is_none());
    }

    #[test]
    fn uniform_train_spans_tail_to_engine() {
        let registry = SectionRegistry::uniform(100, 40.0);
        assert_eq!(registry.len(), 100);
        assert_eq!(registry.get(SectionIndex(0)).unwrap().zone, ZoneTag::Tail);
        assert_eq!(registry.get(SectionIndex(99)).unwrap().zone, ZoneTag::Engine);
        assert_eq!(
            registry.get(SectionIndex(42)).unwrap().asset.as_str(),
            "Train_Car042"
        );
    }

    #[test]
    fn zone_one_table() {
        let registry = SectionRegistry::zone_one();
        assert_eq!(registry.len(), 15);
        let pit = registry.get(SectionIndex(3)).unwrap();
        assert_eq!(pit.name, "The_Pit");
        assert_eq!(pit.asset.as_str(), "Zone1_Car03_The_Pit");
    }
}
