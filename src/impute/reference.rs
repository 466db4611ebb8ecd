use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 2021 population estimates for the 36 Indian states and union territories.
static INDIA_2021: &[(&str, u64)] = &[
    ("Andhra Pradesh", 53_903_393),
    ("Arunachal Pradesh", 1_570_458),
    ("Assam", 35_607_039),
    ("Bihar", 124_799_926),
    ("Chhattisgarh", 29_436_231),
    ("Goa", 1_569_923),
    ("Gujarat", 63_872_399),
    ("Haryana", 28_672_000),
    ("Himachal Pradesh", 7_400_000),
    ("Jharkhand", 38_593_948),
    ("Karnataka", 67_562_686),
    ("Kerala", 35_699_443),
    ("Madhya Pradesh", 85_358_965),
    ("Maharashtra", 123_144_223),
    ("Manipur", 3_091_545),
    ("Meghalaya", 3_366_710),
    ("Mizoram", 1_239_244),
    ("Nagaland", 2_249_695),
    ("Odisha", 46_356_334),
    ("Punjab", 30_141_373),
    ("Rajasthan", 81_032_689),
    ("Sikkim", 690_251),
    ("Tamil Nadu", 77_841_267),
    ("Telangana", 39_362_732),
    ("Tripura", 4_169_794),
    ("Uttar Pradesh", 241_066_874),
    ("Uttarakhand", 11_250_858),
    ("West Bengal", 99_609_303),
    ("Delhi", 19_814_000),
    ("Jammu and Kashmir", 13_606_320),
    ("Ladakh", 307_000),
    ("Puducherry", 1_627_603),
    ("Chandigarh", 1_189_200),
    ("Andaman and Nicobar Islands", 434_000),
    ("Dadra and Nagar Haveli and Daman and Diu", 837_000),
    ("Lakshadweep", 64_473),
];

/// Region name → population estimate.
///
/// Serializes as a plain map so a config file can supply its own table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    populations: BTreeMap<String, u64>,
}

impl ReferenceTable {
    pub fn india_2021() -> Self {
        INDIA_2021.iter().copied().collect()
    }

    pub fn get(&self, region: &str) -> Option<u64> {
        self.populations.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.populations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.populations.is_empty()
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::india_2021()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            populations: iter.into_iter().map(|(n, p)| (n.into(), p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_all_states_and_uts() {
        let t = ReferenceTable::default();
        assert_eq!(t.len(), 36);
        assert_eq!(t.get("Kerala"), Some(35_699_443));
        assert_eq!(t.get("Lakshadweep"), Some(64_473));
        assert_eq!(t.get("Total"), None);
    }

    #[test]
    fn lookup_is_exact() {
        let t: ReferenceTable = [("Goa", 10)].into_iter().collect();
        assert_eq!(t.get("Goa"), Some(10));
        assert_eq!(t.get("goa"), None);
        assert_eq!(t.get("Goa "), None);
    }
}
