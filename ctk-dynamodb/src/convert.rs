//! DynamoDB attribute conversion functions.
//!
//! Pure functions translating DynamoDB items into JSON documents.
//! These are testable in isolation without DynamoDB access.

use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ctk_core::{CtkError, Document, Result};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::scanner::Item;

/// Convert a DynamoDB number literal.
///
/// Integers stay integers, other finite numbers become floats, and anything
/// beyond `f64` is kept verbatim as a string.
pub fn number_to_json(literal: &str) -> Value {
    let literal = literal.trim();
    if let Ok(n) = literal.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = literal.parse::<u64>() {
        return Value::Number(n.into());
    }
    match literal.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(literal.to_string()),
    }
}

/// CrateDB type for a key attribute.
///
/// Binary keys are stored as their base64 text, matching `attribute_to_json`.
pub fn sql_type_for(attribute_type: &ScalarAttributeType) -> &'static str {
    match attribute_type {
        ScalarAttributeType::N => "DOUBLE",
        _ => "TEXT",
    }
}

/// Convert a single attribute value to JSON.
pub fn attribute_to_json(value: &AttributeValue) -> Result<Value> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::B(blob) => Value::String(BASE64.encode(blob.as_ref())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::Bs(items) => Value::Array(
            items
                .iter()
                .map(|blob| Value::String(BASE64.encode(blob.as_ref())))
                .collect(),
        ),
        AttributeValue::L(items) => Value::Array(
            items
                .iter()
                .map(attribute_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::M(map) => Value::Object(map_to_json(map)?),
        other => {
            return Err(CtkError::Source(format!(
                "Unsupported DynamoDB attribute type: {:?}",
                other
            )))
        }
    })
}

fn map_to_json(map: &HashMap<String, AttributeValue>) -> Result<Map<String, Value>> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), attribute_to_json(value)?)))
        .collect()
}

/// Convert a DynamoDB item into a document.
///
/// Key attributes are copied into `pk`; `data` holds the complete item.
pub fn item_to_document(item: &Item, key_attributes: &[String]) -> Result<Document> {
    let data = map_to_json(item)?;

    let mut pk = Map::new();
    for key in key_attributes {
        let value = data.get(key).ok_or_else(|| {
            CtkError::Source(format!("Item lacks key attribute '{}'", key))
        })?;
        pk.insert(key.clone(), value.clone());
    }

    Ok(Document {
        pk,
        data,
        aux: Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    #[test]
    fn test_number_to_json() {
        assert_eq!(number_to_json("42"), json!(42));
        assert_eq!(number_to_json("-7"), json!(-7));
        assert_eq!(number_to_json("18446744073709551615"), json!(18446744073709551615u64));
        assert_eq!(number_to_json("42.42"), json!(42.42));
        assert_eq!(number_to_json("1E+2"), json!(100.0));
        assert_eq!(number_to_json("1e400"), json!("1e400"));
    }

    #[test]
    fn test_key_sql_types() {
        assert_eq!(sql_type_for(&ScalarAttributeType::S), "TEXT");
        assert_eq!(sql_type_for(&ScalarAttributeType::N), "DOUBLE");
        assert_eq!(sql_type_for(&ScalarAttributeType::B), "TEXT");
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            attribute_to_json(&AttributeValue::S("foo".to_string())).unwrap(),
            json!("foo")
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::Bool(true)).unwrap(),
            json!(true)
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::Null(true)).unwrap(),
            Value::Null
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::B(Blob::new(b"hello".to_vec()))).unwrap(),
            json!("aGVsbG8=")
        );
    }

    #[test]
    fn test_sets() {
        assert_eq!(
            attribute_to_json(&AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]))
                .unwrap(),
            json!(["a", "b"])
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::Ns(vec!["1".to_string(), "2.5".to_string()]))
                .unwrap(),
            json!([1, 2.5])
        );
        assert_eq!(
            attribute_to_json(&AttributeValue::Bs(vec![Blob::new(b"x".to_vec())])).unwrap(),
            json!(["eA=="])
        );
    }

    #[test]
    fn test_nested_list_and_map() {
        let mut inner = HashMap::new();
        inner.insert("city".to_string(), AttributeValue::S("Berlin".to_string()));
        inner.insert(
            "tags".to_string(),
            AttributeValue::L(vec![
                AttributeValue::N("1".to_string()),
                AttributeValue::S("two".to_string()),
            ]),
        );

        let value = attribute_to_json(&AttributeValue::M(inner)).unwrap();
        assert_eq!(value, json!({"city": "Berlin", "tags": [1, "two"]}));
    }

    #[test]
    fn test_item_to_document() {
        let mut item = Item::new();
        item.insert("Id".to_string(), AttributeValue::N("101".to_string()));
        item.insert(
            "Title".to_string(),
            AttributeValue::S("Book 101 Title".to_string()),
        );
        item.insert("InPublication".to_string(), AttributeValue::Bool(false));

        let doc = item_to_document(&item, &["Id".to_string()]).unwrap();
        assert_eq!(Value::Object(doc.pk), json!({"Id": 101}));
        assert_eq!(
            Value::Object(doc.data),
            json!({"Id": 101, "Title": "Book 101 Title", "InPublication": false})
        );
        assert!(doc.aux.is_empty());
    }

    #[test]
    fn test_item_to_document_composite_key() {
        let mut item = Item::new();
        item.insert("device".to_string(), AttributeValue::S("foo".to_string()));
        item.insert("timestamp".to_string(), AttributeValue::N("1563051934000".to_string()));

        let doc =
            item_to_document(&item, &["device".to_string(), "timestamp".to_string()]).unwrap();
        assert_eq!(
            Value::Object(doc.pk),
            json!({"device": "foo", "timestamp": 1563051934000i64})
        );
    }

    #[test]
    fn test_item_to_document_missing_key() {
        let mut item = Item::new();
        item.insert("name".to_string(), AttributeValue::S("foo".to_string()));

        let result = item_to_document(&item, &["Id".to_string()]);
        assert!(matches!(result, Err(CtkError::Source(_))));
    }
}
