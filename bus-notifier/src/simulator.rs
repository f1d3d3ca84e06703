//! Simulated live source for running without TDX credentials.
//!
//! Loads recorded ETA responses from JSON files to learn each route's stop
//! order, then invents plausible live data on every fetch: cumulative
//! estimates of one to five minutes per hop, and mostly "approaching"
//! statuses with the occasional other code.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, FixedOffset, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{
    Direction, LiveSnapshot, LiveStopRecord, Name, RouteInfo, RouteKey, StopSequence, StopStatus,
    SubRoute,
};
use crate::source::{LiveStatusSource, SourceError};
use crate::tdx::{ConversionError, EstimateDto, convert_estimate};

/// Errors loading simulator data.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {message}")]
    Json { path: PathBuf, message: String },

    #[error("invalid record in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConversionError,
    },

    #[error("no route data found in {0:?}")]
    Empty(PathBuf),
}

/// Stop order of one simulated sub-route.
#[derive(Debug, Clone)]
pub struct SimulatedRoute {
    pub info: RouteInfo,
    pub key: RouteKey,
    pub stops: StopSequence,
}

impl SimulatedRoute {
    /// Derive a route from a recorded ETA response.
    ///
    /// Route identity comes from the first record; stops keep their first
    /// occurrence in feed order.
    pub fn from_estimates(items: &[EstimateDto]) -> Result<Option<Self>, ConversionError> {
        let Some(first) = items.first() else {
            return Ok(None);
        };

        let name = first
            .route_name
            .as_ref()
            .and_then(|n| n.zh_tw.clone())
            .ok_or(ConversionError::MissingField("RouteName.Zh_tw"))?;
        let direction = match first.direction {
            Some(code) => Direction::from_code(code)?,
            None => Direction::Inbound,
        };

        let mut stops = Vec::with_capacity(items.len());
        for item in items {
            stops.push(convert_estimate(item)?.stop);
        }
        let stops = StopSequence::dedup_first(stops);

        let first_stop = stops.stops().first().map(|s| s.name.zh_tw.clone());
        let last_stop = stops.stops().last().map(|s| s.name.zh_tw.clone());
        let (departure, destination) = match direction {
            Direction::Outbound => (first_stop, last_stop),
            Direction::Inbound => (last_stop, first_stop),
        };

        let uid = first.route_uid.clone().unwrap_or_default();
        let sub_route = SubRoute {
            uid: uid.clone(),
            name: Name::zh(name.clone()),
            direction,
        };

        let info = RouteInfo {
            uid: uid.clone(),
            id: uid,
            name: Name::zh(name.clone()),
            departure_stop: departure.unwrap_or_default(),
            destination_stop: destination.unwrap_or_default(),
            sub_routes: [((name.clone(), direction), sub_route)].into_iter().collect(),
        };

        Ok(Some(Self {
            info,
            key: RouteKey::new(name.clone(), name, direction),
            stops,
        }))
    }
}

/// Simulated live source that serves invented data for known routes.
pub struct SimulatedSource {
    routes: BTreeMap<RouteKey, SimulatedRoute>,
    rng: Mutex<StdRng>,
}

impl SimulatedSource {
    /// Create a simulator from already-built routes.
    pub fn from_routes(routes: impl IntoIterator<Item = SimulatedRoute>) -> Self {
        Self {
            routes: routes.into_iter().map(|r| (r.key.clone(), r)).collect(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a fixed seed so output is reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Load from a single recorded file or a directory of them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_dir(path);
        }
        match Self::load_file(path)? {
            Some(route) => Ok(Self::from_routes([route])),
            None => Err(SimulatorError::Empty(path.to_path_buf())),
        }
    }

    /// Load routes from every `.json` file in a directory.
    ///
    /// Each file holds one recorded `EstimatedTimeOfArrival` response.
    pub fn load_dir(data_dir: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let data_dir = data_dir.as_ref();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| SimulatorError::Io { path, source }
        };

        let mut routes = Vec::new();
        for entry in std::fs::read_dir(data_dir).map_err(io_err(data_dir))? {
            let path = entry.map_err(io_err(data_dir))?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            routes.extend(Self::load_file(&path)?);
        }

        if routes.is_empty() {
            return Err(SimulatorError::Empty(data_dir.to_path_buf()));
        }

        Ok(Self::from_routes(routes))
    }

    /// Load a single recorded response.
    pub fn load_file(path: &Path) -> Result<Option<SimulatedRoute>, SimulatorError> {
        let json = std::fs::read_to_string(path).map_err(|source| SimulatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let items: Vec<EstimateDto> =
            serde_json::from_str(&json).map_err(|e| SimulatorError::Json {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        SimulatedRoute::from_estimates(&items).map_err(|source| SimulatorError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Route keys this simulator can serve.
    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    fn simulate(&self, route: &SimulatedRoute) -> LiveSnapshot {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let taipei = FixedOffset::east_opt(8 * 3600);
        let now = Utc::now();

        let mut cumulative = 0;
        let records = route
            .stops
            .stops()
            .iter()
            .map(|stop| {
                cumulative += rng.random_range(60..=300);
                let status = if rng.random_bool(0.85) {
                    StopStatus::Approaching
                } else {
                    StopStatus::from_code(rng.random_range(1..=3))
                };
                let lag = Duration::seconds(rng.random_range(0..=60));
                LiveStopRecord {
                    stop: stop.clone(),
                    status,
                    estimate_secs: Some(cumulative),
                    updated_at: taipei.map(|tz| (now - lag).with_timezone(&tz)),
                }
            })
            .collect();

        LiveSnapshot::new(route.key.clone(), records)
    }
}

impl LiveStatusSource for SimulatedSource {
    async fn routes(&self) -> Result<Vec<RouteInfo>, SourceError> {
        // Files for both directions of a route merge into one catalog entry.
        let mut merged: BTreeMap<String, RouteInfo> = BTreeMap::new();
        for route in self.routes.values() {
            merged
                .entry(route.key.route.clone())
                .and_modify(|info| info.sub_routes.extend(route.info.sub_routes.clone()))
                .or_insert_with(|| route.info.clone());
        }
        Ok(merged.into_values().collect())
    }

    async fn fetch(&self, key: &RouteKey) -> Result<LiveSnapshot, SourceError> {
        let route = self
            .routes
            .get(key)
            .ok_or_else(|| SourceError::NoData(key.clone()))?;
        Ok(self.simulate(route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RECORDED: &str = r#"[
        {"StopUID": "TPE1", "StopID": "1", "StopName": {"Zh_tw": "大鵬新城"},
         "RouteUID": "TPE15746", "RouteName": {"Zh_tw": "672"}, "Direction": 1,
         "EstimateTime": 120, "StopStatus": 0},
        {"StopUID": "TPE2", "StopID": "2", "StopName": {"Zh_tw": "捷運景平站"},
         "RouteUID": "TPE15746", "RouteName": {"Zh_tw": "672"}, "Direction": 1,
         "StopStatus": 1},
        {"StopUID": "TPE1", "StopID": "1", "StopName": {"Zh_tw": "大鵬新城"},
         "RouteUID": "TPE15746", "RouteName": {"Zh_tw": "672"}, "Direction": 1,
         "EstimateTime": 900, "StopStatus": 0},
        {"StopUID": "TPE3", "StopID": "3", "StopName": {"Zh_tw": "博仁醫院"},
         "RouteUID": "TPE15746", "RouteName": {"Zh_tw": "672"}, "Direction": 1,
         "StopStatus": 1}
    ]"#;

    fn simulator() -> SimulatedSource {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("672.json"), RECORDED).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        SimulatedSource::load_dir(dir.path()).unwrap().with_seed(7)
    }

    fn key() -> RouteKey {
        RouteKey::new("672", "672", Direction::Inbound)
    }

    #[test]
    fn loads_unique_stops_in_order() {
        let sim = simulator();
        let route = &sim.routes[&key()];
        let names: Vec<_> = route.stops.stops().iter().map(|s| s.name.zh_tw.as_str()).collect();
        assert_eq!(names, vec!["大鵬新城", "捷運景平站", "博仁醫院"]);
        assert_eq!(route.info.uid, "TPE15746");
    }

    #[test]
    fn inbound_terminal_is_last_stop() {
        let sim = simulator();
        let route = &sim.routes[&key()];
        assert_eq!(route.info.terminal_for(Direction::Inbound), "博仁醫院");
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            SimulatedSource::load_dir(dir.path()),
            Err(SimulatorError::Empty(_))
        ));
    }

    #[test]
    fn load_accepts_a_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("672.json");
        std::fs::write(&file, RECORDED).unwrap();
        let sim = SimulatedSource::load(&file).unwrap();
        assert_eq!(sim.keys().collect::<Vec<_>>(), vec![&key()]);

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(matches!(
            SimulatedSource::load(&empty),
            Err(SimulatorError::Empty(_))
        ));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(matches!(
            SimulatedSource::load_dir(dir.path()),
            Err(SimulatorError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn simulated_estimates_accumulate() {
        let sim = simulator();
        let snapshot = sim.fetch(&key()).await.unwrap();

        assert_eq!(snapshot.records.len(), 3);
        let estimates: Vec<i64> = snapshot
            .records
            .iter()
            .map(|r| r.estimate_secs.unwrap())
            .collect();
        assert!((60..=300).contains(&estimates[0]));
        for pair in estimates.windows(2) {
            let hop = pair[1] - pair[0];
            assert!((60..=300).contains(&hop), "hop {hop}");
        }
        for record in &snapshot.records {
            assert!(matches!(
                record.status,
                StopStatus::Approaching
                    | StopStatus::NotDeparted
                    | StopStatus::Suspended
                    | StopStatus::LastBusPassed
            ));
            assert!(record.updated_at.is_some());
        }
    }

    #[tokio::test]
    async fn unknown_key_has_no_data() {
        let sim = simulator();
        let other = RouteKey::new("672", "672", Direction::Outbound);
        assert!(matches!(
            sim.fetch(&other).await,
            Err(SourceError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn routes_lists_catalog_entries() {
        let sim = simulator();
        let routes = sim.routes().await.unwrap();
        assert_eq!(routes.len(), 1);
        assert!(routes[0].has_sub_route("672", Direction::Inbound));
    }
}
