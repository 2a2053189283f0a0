use bench_results_model::NetCounter;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Node resource usage reported by a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeSample {
    /// Memory usage in bytes
    pub mem: u64,
    /// CPU usage in nanocores
    pub cpu: u64,
}

/// Cumulative network counters reported by a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkSample {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

impl NetworkSample {
    pub fn get(&self, counter: NetCounter) -> u64 {
        match counter {
            NetCounter::RxBytes => self.rx_bytes,
            NetCounter::RxPackets => self.rx_packets,
            NetCounter::TxBytes => self.tx_bytes,
            NetCounter::TxPackets => self.tx_packets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Node(NodeSample),
    Network(NetworkSample),
}

/// A telemetry sample for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSample {
    pub host: String,
    pub kind: SampleKind,
}

/// A telemetry document as stored, reduced to what pagination and classification need.
///
/// `sample` is `None` for documents of a kind that is not aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryDocument {
    pub timestamp: DateTime<Utc>,
    pub sample: Option<HostSample>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "@timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    host: Option<HostField>,
    #[serde(default)]
    metricset: Option<NameField>,
}

#[derive(Debug, Deserialize)]
struct HostField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct NameField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct NodeDocument {
    kubernetes: KubernetesField,
}

#[derive(Debug, Deserialize)]
struct KubernetesField {
    node: KubernetesNode,
}

#[derive(Debug, Deserialize)]
struct KubernetesNode {
    memory: UsageField<MemoryUsage>,
    cpu: UsageField<CpuUsage>,
}

#[derive(Debug, Deserialize)]
struct UsageField<T> {
    usage: T,
}

#[derive(Debug, Deserialize)]
struct MemoryUsage {
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct CpuUsage {
    nanocores: u64,
}

#[derive(Debug, Deserialize)]
struct NetworkDocument {
    system: SystemField,
}

#[derive(Debug, Deserialize)]
struct SystemField {
    network: NetworkField,
}

#[derive(Debug, Deserialize)]
struct NetworkField {
    #[serde(rename = "in")]
    inbound: Traffic,
    #[serde(rename = "out")]
    outbound: Traffic,
}

#[derive(Debug, Deserialize)]
struct Traffic {
    bytes: u64,
    packets: u64,
}

impl TelemetryDocument {
    /// Parse a stored document and classify it by its `metricset.name`.
    ///
    /// `node` documents become [SampleKind::Node], `network` documents [SampleKind::Network];
    /// anything else only contributes its timestamp.
    pub fn parse(source: &Value) -> Result<Self, serde_json::Error> {
        let header = Header::deserialize(source)?;

        let kind = match header.metricset.as_ref().map(|m| m.name.as_str()) {
            Some("node") => {
                let doc = NodeDocument::deserialize(source)?;
                Some(SampleKind::Node(NodeSample {
                    mem: doc.kubernetes.node.memory.usage.bytes,
                    cpu: doc.kubernetes.node.cpu.usage.nanocores,
                }))
            }
            Some("network") => {
                let doc = NetworkDocument::deserialize(source)?;
                Some(SampleKind::Network(NetworkSample {
                    rx_bytes: doc.system.network.inbound.bytes,
                    rx_packets: doc.system.network.inbound.packets,
                    tx_bytes: doc.system.network.outbound.bytes,
                    tx_packets: doc.system.network.outbound.packets,
                }))
            }
            _ => None,
        };

        let sample = match (kind, header.host) {
            (Some(kind), Some(host)) => Some(HostSample {
                host: host.name,
                kind,
            }),
            (Some(_), None) => {
                log::warn!(
                    "Ignoring telemetry document at {} without a host name",
                    header.timestamp
                );
                None
            }
            (None, _) => None,
        };

        Ok(Self {
            timestamp: header.timestamp,
            sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_document() {
        let doc = TelemetryDocument::parse(&json!({
            "@timestamp": "2020-09-13T12:26:40.000Z",
            "host": {"name": "node-a"},
            "metricset": {"name": "node", "period": 10000},
            "kubernetes": {"node": {
                "name": "node-a",
                "memory": {"usage": {"bytes": 2048}, "rss": {"bytes": 1}},
                "cpu": {"usage": {"nanocores": 150000}},
            }},
        }))
        .unwrap();

        assert_eq!(1600000000, doc.timestamp.timestamp());
        assert_eq!(
            Some(HostSample {
                host: "node-a".to_string(),
                kind: SampleKind::Node(NodeSample {
                    mem: 2048,
                    cpu: 150000
                }),
            }),
            doc.sample
        );
    }

    #[test]
    fn network_document() {
        let doc = TelemetryDocument::parse(&json!({
            "@timestamp": "2020-09-13T12:26:41.500Z",
            "host": {"name": "node-b"},
            "metricset": {"name": "network"},
            "system": {"network": {
                "name": "eth0",
                "in": {"bytes": 100, "packets": 2, "errors": 0},
                "out": {"bytes": 300, "packets": 4, "dropped": 0},
            }},
        }))
        .unwrap();

        let sample = doc.sample.unwrap();
        assert_eq!("node-b", sample.host);
        assert_eq!(
            SampleKind::Network(NetworkSample {
                rx_bytes: 100,
                rx_packets: 2,
                tx_bytes: 300,
                tx_packets: 4,
            }),
            sample.kind
        );
    }

    #[test]
    fn other_metricsets_only_carry_a_timestamp() {
        let doc = TelemetryDocument::parse(&json!({
            "@timestamp": "2020-09-13T12:26:40Z",
            "host": {"name": "node-a"},
            "metricset": {"name": "pod"},
            "kubernetes": {"pod": {"name": "fio-0"}},
        }))
        .unwrap();

        assert!(doc.sample.is_none());
    }

    #[test]
    fn node_document_without_usage_is_malformed() {
        let result = TelemetryDocument::parse(&json!({
            "@timestamp": "2020-09-13T12:26:40Z",
            "host": {"name": "node-a"},
            "metricset": {"name": "node"},
            "kubernetes": {"node": {"name": "node-a"}},
        }));

        assert!(result.is_err());
    }

    #[test]
    fn network_counter_lookup() {
        let sample = NetworkSample {
            rx_bytes: 1,
            rx_packets: 2,
            tx_bytes: 3,
            tx_packets: 4,
        };
        let values = NetCounter::all().map(|c| sample.get(c)).collect::<Vec<_>>();
        assert_eq!(vec![1, 2, 3, 4], values);
    }
}
