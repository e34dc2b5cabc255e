use serde_json::Value;
use tracing::{debug, warn};

/// Ordered candidate CV filenames attached to a job.
///
/// Persisted on the job as a JSON array string. Order is display order and
/// the basis of positional candidate ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFileList(Vec<String>);

impl JobFileList {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Decodes the serialized form. Never fails:
    /// - missing or blank → empty list
    /// - JSON array → its string entries, in order, repeats dropped
    /// - other JSON → empty list
    /// - not JSON at all → the raw value as a single filename
    pub fn decode(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Self::default(),
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => {
                let mut files = Self::default();
                for item in items {
                    if let Value::String(name) = item {
                        if !name.trim().is_empty() && !files.push(name.clone()) {
                            debug!("Skipping repeated file {} in job file list", name);
                        }
                    }
                }
                files
            }
            Ok(other) => {
                warn!("Job file list is not an array ({}), ignoring it", other);
                Self::default()
            }
            Err(_) => Self(vec![raw.to_string()]),
        }
    }

    /// Serializes to the persisted JSON array, dropping blank names.
    pub fn encode(&self) -> String {
        let names: Vec<&str> = self
            .0
            .iter()
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
            .collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// Appends a filename unless it is already attached.
    pub fn push(&mut self, name: String) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }
}
