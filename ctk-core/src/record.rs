//! Documents produced by source translators

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One source record, laid out for the `pk / data / aux` table layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Primary key attributes
    pub pk: Map<String, Value>,
    /// The complete record
    pub data: Map<String, Value>,
    /// Values stored but not indexed
    pub aux: Map<String, Value>,
}

impl Document {
    /// Positional arguments matching `sql::insert_documents`.
    pub fn into_bulk_args(self) -> Vec<Value> {
        vec![
            Value::Object(self.pk),
            Value::Object(self.data),
            Value::Object(self.aux),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_bulk_args_order() {
        let mut doc = Document::default();
        doc.pk.insert("id".to_string(), json!("a1"));
        doc.data.insert("id".to_string(), json!("a1"));
        doc.data.insert("price".to_string(), json!(42));

        let args = doc.into_bulk_args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], json!({"id": "a1"}));
        assert_eq!(args[1], json!({"id": "a1", "price": 42}));
        assert_eq!(args[2], json!({}));
    }
}
