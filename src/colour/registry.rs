//! Sample name <-> colour registry.
//!
//! Colours are handed out gaplessly: the n-th registered sample gets colour
//! n-1. The backing key-value store holds one key per sample (`s<name>`) and
//! the colour counter (`num_colours`). Allocation goes through the backend's
//! atomic `claim`, so concurrent registrations from any number of processes
//! never share a colour and never leave a name without a counted colour.

use crate::error::{ColourError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

const SAMPLE_PREFIX: &str = "s";
const COUNTER_KEY: &str = "num_colours";

/// Key-value store holding the registry.
pub trait RegistryBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// All keys starting with `prefix`.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Atomically: if `name_key` is absent, set it to the current value of
    /// `counter_key` (unset reads as 0), increment the counter and return the
    /// claimed value. Returns `None` and changes nothing if `name_key` exists.
    fn claim(&self, name_key: &str, counter_key: &str) -> Result<Option<u64>>;

    /// Remove every key.
    fn flush_all(&self) -> Result<()>;
}

/// In-process registry backend.
#[derive(Debug, Default)]
pub struct MemoryRegistryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryRegistryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_colour(key: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| ColourError::backend(format!("key '{}' holds non-integer value '{}'", key, value)))
}

impl RegistryBackend for MemoryRegistryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn claim(&self, name_key: &str, counter_key: &str) -> Result<Option<u64>> {
        let mut entries = self.entries.lock();
        if entries.contains_key(name_key) {
            return Ok(None);
        }
        let current = match entries.get(counter_key) {
            Some(value) => parse_colour(counter_key, value)?,
            None => 0,
        };
        entries.insert(name_key.to_string(), current.to_string());
        entries.insert(counter_key.to_string(), (current + 1).to_string());
        Ok(Some(current))
    }

    fn flush_all(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Serializable copy of the registry contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub num_colours: u64,
    pub samples: BTreeMap<String, u64>,
}

/// Bidirectional sample name <-> colour mapping over a shared backend.
///
/// Nothing is cached: every call reads the backend, so registrations made by
/// other processes are always visible.
#[derive(Clone)]
pub struct ColourRegistry {
    backend: Arc<dyn RegistryBackend>,
}

impl ColourRegistry {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRegistryBackend::new()))
    }

    fn sample_key(sample: &str) -> String {
        format!("{}{}", SAMPLE_PREFIX, sample)
    }

    /// Register a new sample and return its colour.
    pub fn register(&self, sample: &str) -> Result<u64> {
        match self.backend.claim(&Self::sample_key(sample), COUNTER_KEY)? {
            Some(colour) => {
                info!("Registered sample {} as colour {}", sample, colour);
                Ok(colour)
            }
            None => Err(ColourError::AlreadyExists {
                sample: sample.to_string(),
            }),
        }
    }

    pub fn colour_of(&self, sample: &str) -> Result<Option<u64>> {
        let key = Self::sample_key(sample);
        self.backend
            .get(&key)?
            .map(|value| parse_colour(&key, &value))
            .transpose()
    }

    /// Like `colour_of`, but an unknown sample is an error.
    pub fn require_colour(&self, sample: &str) -> Result<u64> {
        self.colour_of(sample)?.ok_or_else(|| ColourError::SampleNotFound {
            sample: sample.to_string(),
        })
    }

    /// Every registered sample, keyed by colour.
    pub fn samples_by_colour(&self) -> Result<BTreeMap<u64, String>> {
        let mut out = BTreeMap::new();
        for key in self.backend.keys(SAMPLE_PREFIX)? {
            // A key deleted between KEYS and GET is skipped
            if let Some(value) = self.backend.get(&key)? {
                let sample = &key[SAMPLE_PREFIX.len()..];
                out.insert(parse_colour(&key, &value)?, sample.to_string());
            }
        }
        Ok(out)
    }

    pub fn colour_count(&self) -> Result<u64> {
        match self.backend.get(COUNTER_KEY)? {
            Some(value) => parse_colour(COUNTER_KEY, &value),
            None => Ok(0),
        }
    }

    pub fn snapshot(&self) -> Result<RegistrySnapshot> {
        let samples = self
            .samples_by_colour()?
            .into_iter()
            .map(|(colour, sample)| (sample, colour))
            .collect();
        Ok(RegistrySnapshot {
            num_colours: self.colour_count()?,
            samples,
        })
    }

    /// Replace the backend contents with `snapshot`.
    ///
    /// The snapshot must assign colours `0..num_colours` to exactly one
    /// sample each; anything else is rejected before the backend is touched.
    pub fn restore(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let mut owners: BTreeMap<u64, &str> = BTreeMap::new();
        for (sample, &colour) in &snapshot.samples {
            if colour >= snapshot.num_colours {
                return Err(ColourError::config(format!(
                    "snapshot assigns colour {} to {} but only counts {} colours",
                    colour, sample, snapshot.num_colours
                )));
            }
            if let Some(other) = owners.insert(colour, sample) {
                return Err(ColourError::config(format!(
                    "snapshot assigns colour {} to both {} and {}",
                    colour, other, sample
                )));
            }
        }
        if owners.len() as u64 != snapshot.num_colours {
            return Err(ColourError::config(format!(
                "snapshot counts {} colours but assigns only {}",
                snapshot.num_colours,
                owners.len()
            )));
        }
        self.backend.flush_all()?;
        for (sample, colour) in &snapshot.samples {
            self.backend.set(&Self::sample_key(sample), &colour.to_string())?;
        }
        self.backend.set(COUNTER_KEY, &snapshot.num_colours.to_string())
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.flush_all()
    }
}
