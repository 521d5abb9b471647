//! geoip resolution seam.
//!
//! the pipeline derives `{country, city, isp}` from the client address and
//! then drops the address. The resolver is a trait so deployments without a
//! maxmind database run with the no-op implementation.

use std::net::IpAddr;

use hue_types::GeoData;

/// resolves client addresses to geo attributes.
pub trait GeoIpResolver: Send + Sync {
    /// lookup geo attributes for an address.
    fn lookup(&self, ip: IpAddr) -> GeoData;
}

/// resolver that returns nothing (no geoip database available).
#[derive(Debug, Default, Clone)]
pub struct NoopGeoIpResolver;

impl GeoIpResolver for NoopGeoIpResolver {
    fn lookup(&self, _ip: IpAddr) -> GeoData {
        GeoData::default()
    }
}

/// resolver backed by a MaxMind GeoLite2-City database.
#[cfg(feature = "maxminddb")]
pub struct MaxmindGeoIpResolver {
    reader: maxminddb::Reader<Vec<u8>>,
}

#[cfg(feature = "maxminddb")]
impl MaxmindGeoIpResolver {
    /// load a maxmind database from the given path.
    ///
    /// returns `None` if the file doesn't exist or can't be read.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Option<Self> {
        let reader = maxminddb::Reader::open_readfile(path).ok()?;
        Some(Self { reader })
    }
}

#[cfg(feature = "maxminddb")]
impl GeoIpResolver for MaxmindGeoIpResolver {
    fn lookup(&self, ip: IpAddr) -> GeoData {
        #[derive(serde::Deserialize)]
        struct Names {
            en: Option<String>,
        }

        #[derive(serde::Deserialize)]
        struct Place {
            names: Option<Names>,
        }

        #[derive(serde::Deserialize)]
        struct CityRecord {
            country: Option<Place>,
            city: Option<Place>,
        }

        let Ok(result) = self.reader.lookup(ip) else {
            return GeoData::default();
        };
        let Some(record) = result.decode::<Option<CityRecord>>().ok().flatten() else {
            return GeoData::default();
        };

        let name = |place: Option<Place>| {
            place
                .and_then(|p| p.names)
                .and_then(|n| n.en)
                .unwrap_or_default()
        };

        GeoData {
            country: name(record.country),
            city: name(record.city),
            // isp needs a separate asn database
            isp: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockResolver {
        mappings: HashMap<IpAddr, GeoData>,
    }

    impl GeoIpResolver for MockResolver {
        fn lookup(&self, ip: IpAddr) -> GeoData {
            self.mappings.get(&ip).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn noop_resolver_returns_empty() {
        let resolver = NoopGeoIpResolver;
        assert_eq!(resolver.lookup("8.8.8.8".parse().unwrap()), GeoData::default());
    }

    #[test]
    fn mock_resolver_maps_known_addresses() {
        let mut mappings = HashMap::new();
        mappings.insert(
            "1.1.1.1".parse().unwrap(),
            GeoData {
                country: "AU".to_string(),
                city: String::new(),
                isp: String::new(),
            },
        );
        let resolver = MockResolver { mappings };
        assert_eq!(resolver.lookup("1.1.1.1".parse().unwrap()).country, "AU");
        assert_eq!(resolver.lookup("2.2.2.2".parse().unwrap()), GeoData::default());
    }

    #[cfg(feature = "maxminddb")]
    #[test]
    fn missing_database_returns_none() {
        assert!(MaxmindGeoIpResolver::from_path("/nonexistent/GeoLite2-City.mmdb").is_none());
    }
}
