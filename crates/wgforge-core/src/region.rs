//! Country IP Range Table
//!
//! Maps a country name to the IPv4 intervals its generated addresses are
//! drawn from. The table is plain data: it is built once (either the
//! built-in set or a file supplied by the operator) and only read afterwards.
//!
//! # Built-in Countries
//!
//! | Country | Intervals |
//! |---------|-----------|
//! | UAE | 94.200.0.0/16, 213.42.0.0/16 |
//! | Bahrain | 37.131.0.0/16, 188.221.0.0/16 |
//! | Qatar | 78.100.0.0/16, 212.77.192.0/19 |

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::debug;

/// Inclusive IPv4 interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct AddressInterval {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

#[derive(Deserialize)]
struct RawInterval {
    start: Ipv4Addr,
    end: Ipv4Addr,
}

impl TryFrom<RawInterval> for AddressInterval {
    type Error = RegionError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl AddressInterval {
    /// Create an interval, rejecting `start > end`
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Result<Self, RegionError> {
        if u32::from(start) > u32::from(end) {
            return Err(RegionError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    const fn from_octets(start: [u8; 4], end: [u8; 4]) -> Self {
        Self {
            start: Ipv4Addr::new(start[0], start[1], start[2], start[3]),
            end: Ipv4Addr::new(end[0], end[1], end[2], end[3]),
        }
    }

    pub fn start(&self) -> Ipv4Addr {
        self.start
    }

    pub fn end(&self) -> Ipv4Addr {
        self.end
    }

    /// Check whether an address falls inside the interval
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let n = u32::from(addr);
        u32::from(self.start) <= n && n <= u32::from(self.end)
    }

    /// Number of addresses covered
    pub fn size(&self) -> u64 {
        u64::from(u32::from(self.end)) - u64::from(u32::from(self.start)) + 1
    }
}

impl std::fmt::Display for AddressInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A configured country and its address intervals
///
/// Only obtainable through [`IpRangeTable`], so holding a `&Country` means
/// the name was validated against the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    name: String,
    ranges: Vec<AddressInterval>,
}

impl Country {
    /// Canonical name, as written in the table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intervals in table order (never empty)
    pub fn ranges(&self) -> &[AddressInterval] {
        &self.ranges
    }

    /// Check whether an address belongs to any of the country's intervals
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.ranges.iter().any(|r| r.contains(addr))
    }
}

/// Country to IPv4 interval mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRangeTable {
    countries: Vec<Country>,
}

const UAE: &[AddressInterval] = &[
    AddressInterval::from_octets([94, 200, 0, 0], [94, 200, 255, 255]),
    AddressInterval::from_octets([213, 42, 0, 0], [213, 42, 255, 255]),
];

const BAHRAIN: &[AddressInterval] = &[
    AddressInterval::from_octets([37, 131, 0, 0], [37, 131, 255, 255]),
    AddressInterval::from_octets([188, 221, 0, 0], [188, 221, 255, 255]),
];

const QATAR: &[AddressInterval] = &[
    AddressInterval::from_octets([78, 100, 0, 0], [78, 100, 255, 255]),
    AddressInterval::from_octets([212, 77, 192, 0], [212, 77, 223, 255]),
];

impl IpRangeTable {
    /// Build a table from `(name, intervals)` entries
    pub fn new<I, S>(entries: I) -> Result<Self, RegionError>
    where
        I: IntoIterator<Item = (S, Vec<AddressInterval>)>,
        S: Into<String>,
    {
        let countries = entries
            .into_iter()
            .map(|(name, ranges)| Country {
                name: name.into(),
                ranges,
            })
            .collect();

        let table = Self { countries };
        table.validate()?;
        Ok(table)
    }

    /// The built-in Gulf table
    pub fn builtin() -> Self {
        Self {
            countries: [("UAE", UAE), ("Bahrain", BAHRAIN), ("Qatar", QATAR)]
                .into_iter()
                .map(|(name, ranges)| Country {
                    name: name.to_string(),
                    ranges: ranges.to_vec(),
                })
                .collect(),
        }
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, RegionError> {
        let table: Self =
            toml::from_str(content).map_err(|e| RegionError::ParseError(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Load from JSON string
    pub fn from_json(content: &str) -> Result<Self, RegionError> {
        let table: Self =
            serde_json::from_str(content).map_err(|e| RegionError::ParseError(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self, RegionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RegionError::IoError(e.to_string()))?;

        let table = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => return Err(RegionError::UnsupportedFormat),
        };

        debug!(
            "Loaded {} countries from {}",
            table.countries.len(),
            path.display()
        );
        Ok(table)
    }

    /// Export as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), RegionError> {
        for (i, country) in self.countries.iter().enumerate() {
            if country.ranges.is_empty() {
                return Err(RegionError::EmptyCountry(country.name.clone()));
            }
            let duplicate = self.countries[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&country.name));
            if duplicate {
                return Err(RegionError::DuplicateCountry(country.name.clone()));
            }
        }
        Ok(())
    }

    /// Look up a country by name (ASCII case-insensitive)
    pub fn resolve(&self, name: &str) -> Result<&Country, RegionError> {
        self.countries
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RegionError::UnknownCountry(name.to_string()))
    }

    /// Intervals configured for a country name
    pub fn ranges_for(&self, name: &str) -> Result<&[AddressInterval], RegionError> {
        self.resolve(name).map(Country::ranges)
    }

    /// All configured countries, in table order
    pub fn countries(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter()
    }

    /// Canonical names, in table order
    pub fn country_names(&self) -> Vec<&str> {
        self.countries.iter().map(Country::name).collect()
    }
}

impl Default for IpRangeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Range table errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("Unknown country: {0}")]
    UnknownCountry(String),

    #[error("Country {0} has no address intervals")]
    EmptyCountry(String),

    #[error("Country {0} is listed more than once")]
    DuplicateCountry(String),

    #[error("Invalid interval {start}-{end} (start after end)")]
    InvalidInterval { start: Ipv4Addr, end: Ipv4Addr },

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported range table format")]
    UnsupportedFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_countries() {
        let table = IpRangeTable::builtin();
        assert_eq!(table.country_names(), vec!["UAE", "Bahrain", "Qatar"]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_bahrain_ranges() {
        let table = IpRangeTable::builtin();
        let ranges = table.ranges_for("Bahrain").unwrap();

        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start(), Ipv4Addr::new(37, 131, 0, 0));
        assert_eq!(ranges[0].end(), Ipv4Addr::new(37, 131, 255, 255));
        assert_eq!(ranges[1].start(), Ipv4Addr::new(188, 221, 0, 0));
        assert_eq!(ranges[1].end(), Ipv4Addr::new(188, 221, 255, 255));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let table = IpRangeTable::builtin();
        assert_eq!(table.resolve("uae").unwrap().name(), "UAE");
        assert_eq!(table.resolve("QATAR").unwrap().name(), "Qatar");
    }

    #[test]
    fn test_unknown_country() {
        let table = IpRangeTable::builtin();
        assert_eq!(
            table.resolve("Mars"),
            Err(RegionError::UnknownCountry("Mars".to_string()))
        );
        assert!(table.ranges_for("").is_err());
    }

    #[test]
    fn test_interval_rejects_reversed_bounds() {
        let err = AddressInterval::new(Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 1));
        assert!(matches!(err, Err(RegionError::InvalidInterval { .. })));

        let single = AddressInterval::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(single.unwrap().size(), 1);
    }

    #[test]
    fn test_interval_contains() {
        let table = IpRangeTable::builtin();
        let qatar = table.resolve("Qatar").unwrap();

        assert!(qatar.contains(Ipv4Addr::new(212, 77, 223, 255)));
        assert!(!qatar.contains(Ipv4Addr::new(212, 77, 224, 0)));
        assert_eq!(qatar.ranges()[1].size(), 32 * 256);
    }

    #[test]
    fn test_table_toml_roundtrip() {
        let table = IpRangeTable::builtin();
        let parsed = IpRangeTable::from_toml(&table.to_toml()).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_example_table_matches_builtin() {
        let example = include_str!("../../../config/ranges.example.toml");
        assert_eq!(IpRangeTable::from_toml(example).unwrap(), IpRangeTable::builtin());
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "countries": [
                { "name": "Oman", "ranges": [{ "start": "5.36.0.0", "end": "5.37.255.255" }] }
            ]
        }"#;

        let table = IpRangeTable::from_json(json).unwrap();
        assert_eq!(table.country_names(), vec!["Oman"]);
        assert!(table.resolve("UAE").is_err());
    }

    #[test]
    fn test_table_rejects_bad_files() {
        let reversed = r#"
            [[countries]]
            name = "Oman"
            ranges = [{ start = "5.37.0.0", end = "5.36.0.0" }]
        "#;
        assert!(matches!(
            IpRangeTable::from_toml(reversed),
            Err(RegionError::ParseError(_))
        ));

        let empty = r#"
            [[countries]]
            name = "Oman"
            ranges = []
        "#;
        assert_eq!(
            IpRangeTable::from_toml(empty),
            Err(RegionError::EmptyCountry("Oman".to_string()))
        );

        let interval = vec![AddressInterval::new(
            Ipv4Addr::new(1, 0, 0, 0),
            Ipv4Addr::new(1, 0, 0, 255),
        )
        .unwrap()];
        let dup = IpRangeTable::new([("Oman", interval.clone()), ("OMAN", interval)]);
        assert_eq!(dup, Err(RegionError::DuplicateCountry("OMAN".to_string())));
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("wgforge-ranges-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("ranges.toml");
        std::fs::write(&toml_path, IpRangeTable::builtin().to_toml()).unwrap();
        assert_eq!(IpRangeTable::from_file(&toml_path).unwrap(), IpRangeTable::builtin());

        let yaml_path = dir.join("ranges.yaml");
        std::fs::write(&yaml_path, "countries: []").unwrap();
        assert_eq!(
            IpRangeTable::from_file(&yaml_path),
            Err(RegionError::UnsupportedFormat)
        );

        assert!(matches!(
            IpRangeTable::from_file(&dir.join("missing.toml")),
            Err(RegionError::IoError(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
