use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Annotation that Multus writes on pods to describe their network attachments.
pub const NETWORK_STATUS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/network-status";

/// One attachment entry from the network status annotation.
///
/// Entries are kept as open JSON objects so that fields this server does not
/// know about survive a decode and encode round trip untouched.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NetworkAttachment(Map<String, Value>);

impl NetworkAttachment {
    pub fn mac(&self) -> Option<&str> {
        self.0
            .get("mac")
            .and_then(Value::as_str)
            .filter(|mac| !mac.is_empty())
    }

    /// Whether the entry carries an `ips` field at all, even an empty one.
    pub fn has_ips(&self) -> bool {
        self.0.contains_key("ips")
    }

    pub fn set_ips(&mut self, ips: Vec<String>) {
        self.0.insert(
            "ips".to_string(),
            Value::Array(ips.into_iter().map(Value::String).collect()),
        );
    }
}

pub fn decode(annotation: &str) -> Option<Vec<NetworkAttachment>> {
    serde_json::from_str(annotation).ok()
}

pub fn encode(attachments: &[NetworkAttachment]) -> serde_json::Result<String> {
    serde_json::to_string(attachments)
}
