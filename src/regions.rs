use std::collections::BTreeMap;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_REGION: &str = "us.battle.net";

// Region hosts and their supported locales, bundled with the binary so the
// localization tests never depend on a file next to the executable.
const REGIONS_JSON: &str = include_str!("../regions.json");

/// Region host -> supported locales. Keyed with a BTreeMap so the generated
/// localization test cases come out in a stable order.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RegionTable {
    regions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RegionError {
    #[error("Failed to parse bundled region table")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown region `{region}`, expected one of: {known}")]
    UnknownRegion { region: String, known: String },
}

impl RegionTable {
    pub fn bundled() -> Result<Self, RegionError> {
        serde_json::from_str(REGIONS_JSON).map_err(RegionError::Parse)
    }

    pub fn check(&self, region: &str) -> Result<(), RegionError> {
        if self.regions.contains_key(region) {
            return Ok(());
        }

        Err(RegionError::UnknownRegion {
            region: region.into(),
            known: self
                .regions
                .keys()
                .cloned()
                .collect::<Vec<String>>()
                .join(", "),
        })
    }

    /// Every (region host, locale) pair, in table order.
    pub fn combinations(&self) -> Vec<(String, String)> {
        self.regions
            .iter()
            .flat_map(|(region, locales)| {
                locales
                    .iter()
                    .map(move |locale| (region.clone(), locale.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use crate::regions::DEFAULT_REGION;
    use crate::regions::RegionTable;

    #[test]
    fn bundled_table_parses() {
        let table = RegionTable::bundled().unwrap();

        assert!(table.check(DEFAULT_REGION).is_ok());
    }

    #[test]
    fn table_deserializes_from_json() {
        let table: RegionTable =
            serde_json::from_str(r#"{"us.battle.net": ["en_US", "es_MX"]}"#).unwrap();

        assert!(table.check("us.battle.net").is_ok());
        assert_eq!(
            table.combinations(),
            vec![
                ("us.battle.net".into(), "en_US".into()),
                ("us.battle.net".into(), "es_MX".into()),
            ]
        );
    }

    #[test]
    fn unknown_region_is_rejected() {
        let table = RegionTable::bundled().unwrap();

        assert!(table.check("moon.battle.net").is_err());
    }

    #[test]
    fn combinations_cover_every_locale() {
        let table = RegionTable::bundled().unwrap();
        let combinations = table.combinations();

        assert!(combinations.contains(&("us.battle.net".into(), "en_US".into())));
        assert!(combinations.contains(&("eu.battle.net".into(), "fr_FR".into())));

        // Stable order between two builds of the same table
        assert_eq!(combinations, table.combinations());
    }
}
