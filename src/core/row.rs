use serde::{Deserialize, Serialize};
use super::value::Value;

/// One tuple as seen by a row-level trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Composite image of the whole row, as stored in the change log
    #[must_use]
    pub fn to_image(&self) -> Value {
        Value::Record(self.values.clone())
    }

    /// Rebuilds a row from a composite image; `None` if the value is not a record
    #[must_use]
    pub fn from_image(image: &Value) -> Option<Self> {
        image.as_record().map(|fields| Self::new(fields.to_vec()))
    }

    /// Projects the given column positions into a key record
    #[must_use]
    pub fn key(&self, columns: &[usize]) -> Value {
        Value::Record(
            columns
                .iter()
                .map(|&i| self.values.get(i).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }
}
