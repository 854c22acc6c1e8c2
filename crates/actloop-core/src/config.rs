//! Loop configuration.

use serde::{Deserialize, Serialize};

/// Settings for a loop.
///
/// `queue_buffer` is kept signed so configs written as `0` or `-1` load fine;
/// [`LoopConfig::capacity`] normalises anything below 1 to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Submission queue buffer.
    pub queue_buffer: i64,

    /// Name used in logs and stats.
    pub name: Option<String>,
}

impl LoopConfig {
    pub fn new(queue_buffer: i64) -> Self {
        Self {
            queue_buffer,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Effective queue capacity (always >= 1).
    pub fn capacity(&self) -> usize {
        normalize_buffer(self.queue_buffer)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            queue_buffer: 1,
            name: None,
        }
    }
}

pub(crate) fn normalize_buffer(queue_buffer: i64) -> usize {
    if queue_buffer <= 0 {
        1
    } else {
        usize::try_from(queue_buffer).unwrap_or(usize::MAX).min(tokio::sync::Semaphore::MAX_PERMITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1)]
    #[case(-1, 1)]
    #[case(i64::MIN, 1)]
    #[case(1, 1)]
    #[case(64, 64)]
    fn capacity_is_normalised(#[case] queue_buffer: i64, #[case] expected: usize) {
        assert_eq!(LoopConfig::new(queue_buffer).capacity(), expected);
    }

    #[test]
    fn default_is_single_slot() {
        let cfg = LoopConfig::default();
        assert_eq!(cfg.capacity(), 1);
        assert_eq!(cfg.name, None);
    }

    #[test]
    fn parses_partial_json() {
        let cfg = LoopConfig::from_json_str(r#"{ "name": "kv" }"#).unwrap();
        assert_eq!(cfg.queue_buffer, 1);
        assert_eq!(cfg.name.as_deref(), Some("kv"));

        let cfg = LoopConfig::from_json_str(r#"{ "queue_buffer": -5 }"#).unwrap();
        assert_eq!(cfg.capacity(), 1);
    }

    #[test]
    fn rejects_bad_json() {
        assert!(LoopConfig::from_json_str(r#"{ "queue_buffer": "many" }"#).is_err());
    }
}
