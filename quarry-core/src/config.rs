//! Connection pool settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool settings applied when a connection is opened.
///
/// Deserializes from any serde format; missing fields take their
/// defaults and durations are given in whole seconds:
///
/// ```
/// use quarry_core::PoolSettings;
/// use std::time::Duration;
///
/// let settings: PoolSettings = serde_json::from_str(r#"{"max_open_conns": 8}"#).unwrap();
/// assert_eq!(settings.max_open_conns, 8);
/// assert_eq!(settings.connect_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_open_conns: u32,

    /// Connections older than this are closed and replaced
    #[serde(with = "seconds")]
    pub conn_max_lifetime: Duration,

    /// How long to wait for a connection before giving up
    #[serde(with = "seconds")]
    pub connect_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open_conns: 50,
            conn_max_lifetime: Duration::from_secs(30 * 60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
