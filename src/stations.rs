use tracing::debug;

/// One buoy station with the location keywords that map to it.
#[derive(Debug, Clone)]
pub struct Station {
    pub station_id: String,
    pub name: String,
    pub keywords: Vec<String>,
}

impl Station {
    pub fn new(station_id: &str, name: &str, keywords: &[&str]) -> Self {
        Self {
            station_id: station_id.to_string(),
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Resolves a booking's free-text departure location to the nearest buoy
/// station by case-insensitive substring match, falling back to a designated
/// default station when nothing matches.
///
/// Injectable so tests (and future regions) can supply their own table.
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<Station>,
    default_station_id: String,
}

impl StationRegistry {
    pub fn new(stations: Vec<Station>, default_station_id: String) -> Self {
        Self {
            stations,
            default_station_id,
        }
    }

    /// The Southern California charter fleet's home waters.
    pub fn socal() -> Self {
        let stations = vec![
            Station::new("46232", "Point Loma South", &["san diego", "point loma", "mission bay"]),
            Station::new("46224", "Oceanside Offshore", &["oceanside", "carlsbad"]),
            Station::new("46086", "San Clemente Basin", &["san clemente", "dana point"]),
            Station::new("46222", "San Pedro", &["long beach", "san pedro", "huntington"]),
            Station::new("46025", "Santa Monica Basin", &["santa monica", "marina del rey", "venice"]),
            Station::new("46053", "East Santa Barbara", &["santa barbara", "ventura", "channel islands"]),
            Station::new("46042", "Monterey", &["monterey", "santa cruz", "moss landing"]),
            Station::new("46026", "San Francisco", &["san francisco", "sausalito", "half moon bay"]),
        ];
        Self::new(stations, "46232".to_string())
    }

    pub fn default_station_id(&self) -> &str {
        &self.default_station_id
    }

    /// Resolve a free-text location to a station id.
    pub fn resolve(&self, location: &str) -> &str {
        let needle = location.to_lowercase();

        for station in &self.stations {
            if station.keywords.iter().any(|k| needle.contains(k.as_str())) {
                debug!(
                    location,
                    station_id = %station.station_id,
                    station_name = %station.name,
                    "Resolved departure location to station"
                );
                return &station.station_id;
            }
        }

        debug!(
            location,
            station_id = %self.default_station_id,
            "No station match for location, using default"
        );
        &self.default_station_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact_keyword() {
        let registry = StationRegistry::socal();
        assert_eq!(registry.resolve("San Diego"), "46232");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = StationRegistry::socal();
        assert_eq!(registry.resolve("OCEANSIDE HARBOR"), "46224");
    }

    #[test]
    fn test_resolve_substring_within_longer_text() {
        let registry = StationRegistry::socal();
        assert_eq!(
            registry.resolve("Dock 3, Marina del Rey, CA"),
            "46025"
        );
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_default() {
        let registry = StationRegistry::socal();
        assert_eq!(registry.resolve("Lake Havasu"), "46232");
    }

    #[test]
    fn test_resolve_with_custom_table() {
        let registry = StationRegistry::new(
            vec![Station::new("41008", "Grays Reef", &["savannah"])],
            "41008".to_string(),
        );
        assert_eq!(registry.resolve("Savannah riverfront"), "41008");
        assert_eq!(registry.default_station_id(), "41008");
    }
}
