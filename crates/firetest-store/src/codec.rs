//! Conversion between dynamic JSON values and [`Node`] subtrees.
//!
//! Encoding never fails. `null` has no scalar form and becomes an empty
//! node, as do empty maps and lists; the tree compacts those away on write.
//!
//! Decoding rebuilds lists from array nodes by index. The list is sized to
//! the highest index plus one, gaps are filled with `null`, and children
//! whose keys are not plain decimal indices are skipped. An array node whose
//! highest index is at least twice its number of children decodes as a map.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::node::{Node, Scalar};

/// Encode a dynamic value into a node subtree.
pub fn encode(value: Value) -> Node {
    match value {
        Value::Bool(b) => Node::leaf(Scalar::Bool(b)),
        Value::Number(n) => Node::leaf(Scalar::Number(n)),
        Value::String(s) => Node::leaf(Scalar::String(s)),
        Value::Array(items) => Node::array(items.into_iter().map(encode)),
        Value::Object(entries) => Node::branch(entries.into_iter().map(|(k, v)| (k, encode(v)))),
        Value::Null => {
            debug!("null value encoded as an empty node");
            Node::empty()
        }
    }
}

/// Decode a node subtree back into a dynamic value.
pub fn decode(node: &Node) -> Value {
    if let Some(scalar) = node.value() {
        return scalar.to_value();
    }
    if node.children().is_empty() {
        return Value::Null;
    }
    if node.is_array() {
        if let Some(items) = decode_array(node) {
            return Value::Array(items);
        }
        trace!(children = node.len(), "array node decoded as a map");
    }
    Value::Object(
        node.children()
            .iter()
            .map(|(k, child)| (k.clone(), decode(child)))
            .collect::<Map<String, Value>>(),
    )
}

fn decode_array(node: &Node) -> Option<Vec<Value>> {
    let limit = node.len().saturating_mul(2);
    let mut indexed = Vec::with_capacity(node.len());
    for (key, child) in node.children() {
        if !is_index_key(key) {
            trace!(key = %key, "skipping non-index key under array node");
            continue;
        }
        match key.parse::<usize>() {
            Ok(index) if index < limit => indexed.push((index, child)),
            _ => return None,
        }
    }

    // Every index is below `limit`, so the length is bounded by it.
    let len = indexed.iter().map(|(i, _)| *i).max().map_or(0, |max| max + 1);
    let mut items = vec![Value::Null; len];
    for (index, child) in indexed {
        items[index] = decode(child);
    }
    Some(items)
}

/// Only canonical non-negative decimal keys count as indices.
fn is_index_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

impl Scalar {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl Node {
    pub fn from_value(value: Value) -> Self {
        encode(value)
    }

    pub fn to_value(&self) -> Value {
        decode(self)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        encode(value)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        decode(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn scalars_become_leaves() {
        assert_eq!(encode(json!("bar")), Node::leaf("bar"));
        assert_eq!(encode(json!(true)), Node::leaf(true));
        assert_eq!(encode(json!(42)), Node::leaf(42i64));
        let float = encode(json!(1.5));
        assert_eq!(float.value(), Some(&Scalar::Number(serde_json::Number::from_f64(1.5).unwrap())));
    }

    #[test]
    fn list_becomes_array_node() {
        let node = encode(json!(["a", "b"]));
        assert!(node.is_array());
        assert_eq!(node.child("0"), Some(&Node::leaf("a")));
        assert_eq!(node.child("1"), Some(&Node::leaf("b")));
    }

    #[test]
    fn map_becomes_branch() {
        let node = encode(json!({"x": 1, "y": {"z": false}}));
        assert!(!node.is_array());
        assert_eq!(node.len(), 2);
        assert_eq!(node.descendant(["y", "z"]), Some(&Node::leaf(false)));
    }

    #[test]
    fn null_becomes_empty() {
        assert!(encode(Value::Null).is_empty());
        assert_eq!(decode(&Node::empty()), Value::Null);
    }

    #[test]
    fn nested_roundtrip() {
        let value = json!({
            "users": {
                "alice": {"age": 30, "tags": ["admin", "ops"], "active": true},
                "bob": {"age": 25.5, "tags": [], "nick": "b"}
            },
            "matrix": [[1, 2], [3, 4]]
        });
        // Empty lists do not survive storage, so compare after dropping them.
        let stored = encode(value).compacted();
        assert_eq!(
            decode(&stored),
            json!({
                "users": {
                    "alice": {"age": 30, "tags": ["admin", "ops"], "active": true},
                    "bob": {"age": 25.5, "nick": "b"}
                },
                "matrix": [[1, 2], [3, 4]]
            })
        );
    }

    #[test]
    fn sparse_array_fills_gaps_with_null() {
        let node = Node {
            value: None,
            children: [("0".to_string(), Node::leaf(1i64)), ("3".to_string(), Node::leaf(4i64))]
                .into_iter()
                .collect(),
            is_array: true,
        };
        assert_eq!(decode(&node), json!([1, null, null, 4]));
    }

    #[test]
    fn array_skips_non_index_keys() {
        let node = Node {
            value: None,
            children: [
                ("0".to_string(), Node::leaf("a")),
                ("name".to_string(), Node::leaf("ignored")),
                ("+1".to_string(), Node::leaf("ignored")),
                ("1".to_string(), Node::leaf("b")),
            ]
            .into_iter()
            .collect(),
            is_array: true,
        };
        assert_eq!(decode(&node), json!(["a", "b"]));
    }

    #[test]
    fn huge_index_decodes_as_map() {
        for key in ["18446744073709551615", "100000000000", "999999999999999999999999"] {
            let node = Node {
                value: None,
                children: [("0".to_string(), Node::leaf(1i64)), (key.to_string(), Node::leaf(2i64))]
                    .into_iter()
                    .collect(),
                is_array: true,
            };
            assert_eq!(decode(&node), json!({"0": 1, key: 2}), "key = {key}");
        }
    }

    #[test]
    fn index_at_twice_the_count_decodes_as_map() {
        let node = Node {
            value: None,
            children: [("0".to_string(), Node::leaf(1i64)), ("4".to_string(), Node::leaf(5i64))]
                .into_iter()
                .collect(),
            is_array: true,
        };
        assert_eq!(decode(&node), json!({"0": 1, "4": 5}));
    }

    #[test]
    fn null_list_element_becomes_gap() {
        let stored = encode(json!([1, null, 3])).compacted();
        assert_eq!(stored.len(), 2);
        assert_eq!(decode(&stored), json!([1, null, 3]));
    }

    #[test]
    fn serialize_matches_decode() {
        let node = encode(json!({"a": [true, "x"]}));
        let text = serde_json::to_string(&node).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"a": [true, "x"]}));
    }

    fn leaf_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
        ]
    }

    /// Scalars, non-empty lists, and non-empty maps: the values storage
    /// promises to give back unchanged.
    fn storable_value() -> impl Strategy<Value = Value> {
        leaf_value().prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,5}", inner, 1..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(value in storable_value()) {
            let node = encode(value.clone());
            prop_assert!(node.is_well_formed());
            prop_assert_eq!(decode(&node), value);
        }
    }
}
