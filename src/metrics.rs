use once_cell::sync::Lazy;
use prometheus::{GaugeVec, Opts, Registry};

/// Namespace prefixed to every exported gauge.
pub const NAMESPACE: &str = "spacetraderinventory";

/// Process-wide registry, shared by the collector (writer) and the
/// `/metrics` endpoint (readers).
///
/// Lives from process start to exit, never reset.
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Gauges published by the collector.
///
/// Every gauge is labelled at least by `username`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gauge {
    Credits,
    GameStatus,
    ShipCount,
    StructureCount,
    ShipLoad,
    UserRank,
}

impl Gauge {
    pub const ALL: [Gauge; 6] = [
        Gauge::Credits,
        Gauge::GameStatus,
        Gauge::ShipCount,
        Gauge::StructureCount,
        Gauge::ShipLoad,
        Gauge::UserRank,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gauge::Credits => "credits",
            Gauge::GameStatus => "game_status",
            Gauge::ShipCount => "shipcount",
            Gauge::StructureCount => "structurecount",
            Gauge::ShipLoad => "shipload",
            Gauge::UserRank => "userrank",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Gauge::Credits => "How much credits user has",
            Gauge::GameStatus => "Indicates if the game is up, running and available",
            Gauge::ShipCount => "Total of ships user has",
            Gauge::StructureCount => "Total of structure user has",
            Gauge::ShipLoad => "Unused space in ship cargo",
            Gauge::UserRank => "User rank in leaderboard",
        }
    }

    /// Label names, in the order `record` expects the values.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Gauge::ShipLoad => &[
                "username",
                "id",
                "class",
                "manufacturer",
                "type",
                "maxcargo",
                "plating",
                "speed",
                "weapons",
            ],
            _ => &["username"],
        }
    }
}

/// Destination of gauge observations.
///
/// The collector only knows this trait; the concrete sink decides
/// where values end up (Prometheus registry, test recorder, …).
///
/// CONTRACT:
/// - `labels` has exactly `gauge.labels().len()` values, same order
/// - a record overwrites the previous value for the same label set
pub trait MetricsSink: Send + Sync {
    fn record(&self, gauge: Gauge, labels: &[&str], value: f64);
}

impl<S: MetricsSink + ?Sized> MetricsSink for &S {
    fn record(&self, gauge: Gauge, labels: &[&str], value: f64) {
        (**self).record(gauge, labels, value)
    }
}

// ------------------------------------------------------------
// Prometheus sink
// ------------------------------------------------------------
//
// One GaugeVec per `Gauge`, registered once on a registry.
// GaugeVec is internally synchronized: scrapers may read while the
// collector writes, and may observe a cycle half-published.
//
pub struct PrometheusSink {
    gauges: Vec<(Gauge, GaugeVec)>,
}

impl PrometheusSink {
    /// Creates and registers all gauges on `registry`.
    ///
    /// Fails if the gauges are already registered there.
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let mut gauges = Vec::with_capacity(Gauge::ALL.len());

        for gauge in Gauge::ALL {
            let opts = Opts::new(gauge.name(), gauge.help()).namespace(NAMESPACE);
            let vec = GaugeVec::new(opts, gauge.labels())?;
            registry.register(Box::new(vec.clone()))?;
            gauges.push((gauge, vec));
        }

        Ok(Self { gauges })
    }

    fn vec(&self, gauge: Gauge) -> Option<&GaugeVec> {
        self.gauges.iter().find(|(g, _)| *g == gauge).map(|(_, v)| v)
    }
}

impl MetricsSink for PrometheusSink {
    fn record(&self, gauge: Gauge, labels: &[&str], value: f64) {
        let Some(vec) = self.vec(gauge) else {
            return;
        };

        match vec.get_metric_with_label_values(labels) {
            Ok(g) => g.set(value),
            Err(e) => log::error!("cannot record {}: {}", gauge.name(), e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use prometheus::TextEncoder;
    use std::sync::Mutex;

    /// One observation captured by `RecordingSink`.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Observation {
        pub gauge: Gauge,
        pub labels: Vec<String>,
        pub value: f64,
    }

    /// Keeps every observation in arrival order.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub observations: Mutex<Vec<Observation>>,
    }

    impl RecordingSink {
        pub(crate) fn of(&self, gauge: Gauge) -> Vec<Observation> {
            self.observations
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.gauge == gauge)
                .cloned()
                .collect()
        }

        pub(crate) fn last(&self, gauge: Gauge) -> Option<f64> {
            self.of(gauge).last().map(|o| o.value)
        }
    }

    impl MetricsSink for RecordingSink {
        fn record(&self, gauge: Gauge, labels: &[&str], value: f64) {
            assert_eq!(labels.len(), gauge.labels().len(), "label arity for {}", gauge.name());
            self.observations.lock().unwrap().push(Observation {
                gauge,
                labels: labels.iter().map(|l| l.to_string()).collect(),
                value,
            });
        }
    }

    #[test]
    fn registers_all_gauges_with_namespace() {
        let registry = Registry::new();
        let sink = PrometheusSink::register(&registry).unwrap();

        sink.record(Gauge::Credits, &["nova"], 1000.0);
        sink.record(
            Gauge::ShipLoad,
            &["nova", "s1", "MK-I", "Jackshaw", "JW-MK-I", "50", "5", "1", "5"],
            10.0,
        );

        let text = TextEncoder::new().encode_to_string(&registry.gather()).unwrap();
        assert!(text.contains("# TYPE spacetraderinventory_credits gauge"));
        assert!(text.contains("spacetraderinventory_credits{username=\"nova\"} 1000"));
        assert!(text.contains("spacetraderinventory_shipload{"));
        assert!(text.contains("maxcargo=\"50\""));
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        PrometheusSink::register(&registry).unwrap();

        assert!(PrometheusSink::register(&registry).is_err());
    }

    #[test]
    fn wrong_label_arity_is_ignored() {
        let registry = Registry::new();
        let sink = PrometheusSink::register(&registry).unwrap();

        sink.record(Gauge::ShipLoad, &["nova"], 3.0);

        let text = TextEncoder::new().encode_to_string(&registry.gather()).unwrap();
        assert!(!text.contains("spacetraderinventory_shipload{"));
    }
}
