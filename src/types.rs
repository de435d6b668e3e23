use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One input line: an opaque id, labeled texts, and optional images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputRecord {
    /// Opaque identifier, passed through untouched.
    #[serde(default)]
    pub id: Value,

    /// Label → text content. Input key order is preserved.
    #[serde(default, deserialize_with = "null_as_default")]
    pub texts: Map<String, Value>,

    /// Base64-encoded image payloads, in order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
}

impl InputRecord {
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(label.into(), Value::String(text.into()));
        self
    }

    pub fn with_image(mut self, base64: impl Into<String>) -> Self {
        self.images.push(base64.into());
        self
    }
}

/// An explicit `null` counts as absent.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A transformed record: the input plus the model's answer under the
/// job's output label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: Value,
    pub texts: Map<String, Value>,
    pub images: Vec<String>,
}

impl OutputRecord {
    /// Merge `answer` into `record.texts` under `label`, overwriting any
    /// existing entry with that key.
    pub fn merge(record: InputRecord, label: &str, answer: String) -> Self {
        let InputRecord {
            id,
            mut texts,
            images,
        } = record;
        texts.insert(label.to_string(), Value::String(answer));
        Self { id, texts, images }
    }

    pub fn text(&self, label: &str) -> Option<&str> {
        self.texts.get(label).and_then(Value::as_str)
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records written to the output stream.
    pub processed: usize,
    /// Records that parsed but failed during transformation.
    pub failed: usize,
    /// Lines that could not be parsed as records.
    pub skipped_lines: usize,
}
