use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SduiConfig {
    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Nodes nested deeper than this are dropped with a warning.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Number of memoized elements kept before the cache is flushed.
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            memo_capacity: default_memo_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Duration samples kept before trimming kicks in.
    #[serde(default = "default_metrics_window_cap")]
    pub metrics_window_cap: usize,

    /// Samples retained after a trim.
    #[serde(default = "default_metrics_window_keep")]
    pub metrics_window_keep: usize,

    #[serde(default = "default_api_timeout", with = "duration_ms")]
    pub api_timeout: Duration,

    #[serde(default = "default_vibration", with = "duration_ms")]
    pub default_vibration: Duration,

    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metrics_window_cap: default_metrics_window_cap(),
            metrics_window_keep: default_metrics_window_keep(),
            api_timeout: default_api_timeout(),
            default_vibration: default_vibration(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl SduiConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn validate(&self) -> InternalResult<()> {
        if self.renderer.max_depth == 0 {
            return Err(Error::config("renderer.max_depth must be greater than 0"));
        }
        if self.engine.metrics_window_keep > self.engine.metrics_window_cap {
            return Err(Error::config(format!(
                "engine.metrics_window_keep ({}) exceeds engine.metrics_window_cap ({})",
                self.engine.metrics_window_keep, self.engine.metrics_window_cap
            )));
        }
        Ok(())
    }
}

pub fn from_file<P: AsRef<Path>, T: for<'de> Deserialize<'de>>(path: P) -> InternalResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

fn default_max_depth() -> usize {
    10
}

fn default_memo_capacity() -> usize {
    512
}

fn default_metrics_window_cap() -> usize {
    100
}

fn default_metrics_window_keep() -> usize {
    50
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_vibration() -> Duration {
    Duration::from_millis(400)
}

fn default_event_buffer_size() -> usize {
    64
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
