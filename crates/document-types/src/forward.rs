//! Forward conversion: host Sequence → document value.
//!
//! Shape rules:
//!
//! - the empty sequence encodes to `Null`
//! - a single map encodes to an object, keys in map order; every key must be
//!   string-valued
//! - a single array encodes to an array; each slot's sequence contributes its
//!   items as successive elements, and an empty slot contributes one `Null`
//! - a single atomic goes through the Scalar Codec
//! - a sequence of several items encodes to an array of the encoded items
//!
//! The first failure aborts the whole conversion; no partial document is
//! ever returned.

use crate::error::{ConversionError, Result};
use crate::options::ConversionOptions;
use crate::path::ValuePath;
use crate::scalar::encode_scalar;
use docbridge_core::{ArrayValue, DocObject, DocValue, Item, MapValue, Sequence};

/// Convert a host sequence to a document value.
///
/// # Errors
///
/// Returns the first `ConversionError` met, located at the offending value.
pub fn encode(sequence: &Sequence, options: &ConversionOptions) -> Result<DocValue> {
    tracing::trace!(items = sequence.len(), "Encoding host sequence");
    Encoder::new(options).sequence(sequence)
}

/// Convert a single host item to a document value.
pub fn encode_item(item: &Item, options: &ConversionOptions) -> Result<DocValue> {
    Encoder::new(options).item(item)
}

/// Convert a top-level call payload, which must be a single map, to an object.
///
/// # Errors
///
/// Returns `UnsupportedType` when the payload is not exactly one map, and any
/// error `encode` would return for the map itself.
pub fn encode_document(sequence: &Sequence, options: &ConversionOptions) -> Result<DocObject> {
    match sequence.items() {
        [Item::Map(map)] => Encoder::new(options).map(map),
        [] => Err(ConversionError::unsupported(
            "empty-sequence() in place of a document",
        )),
        [item] => Err(ConversionError::unsupported(format!(
            "{} in place of a document",
            item.type_name()
        ))),
        _ => Err(ConversionError::unsupported(format!(
            "sequence of {} items in place of a document",
            sequence.len()
        ))),
    }
}

struct Encoder<'a> {
    options: &'a ConversionOptions,
    path: ValuePath,
    depth: usize,
}

impl<'a> Encoder<'a> {
    fn new(options: &'a ConversionOptions) -> Self {
        Self {
            options,
            path: ValuePath::root(),
            depth: 0,
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(ConversionError::TooDeeplyNested {
                depth: self.depth,
                limit: self.options.max_depth,
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn sequence(&mut self, sequence: &Sequence) -> Result<DocValue> {
        match sequence.items() {
            [] => Ok(DocValue::Null),
            [item] => self.item(item),
            items => {
                self.enter()?;
                let mut elements = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push_index(i);
                    elements.push(self.item(item)?);
                    self.path.pop();
                }
                self.leave();
                Ok(DocValue::Array(elements))
            }
        }
    }

    fn item(&mut self, item: &Item) -> Result<DocValue> {
        match item {
            Item::Atomic(atomic) => {
                encode_scalar(atomic, self.options).map_err(|e| e.at(&self.path))
            }
            Item::Map(map) => self.map(map).map(DocValue::Object),
            Item::Array(array) => self.array(array),
            Item::Node(_) | Item::Function(_) => Err(ConversionError::UnsupportedType {
                type_name: item.type_name().to_string(),
                path: self.path.clone(),
            }),
        }
    }

    fn map(&mut self, map: &MapValue) -> Result<DocObject> {
        self.enter()?;
        let mut object = DocObject::with_capacity(map.len());
        for (key, value) in map.iter() {
            let Some(name) = key.as_str() else {
                return Err(ConversionError::NonStringKey {
                    key_type: key.atomic_type().name().to_string(),
                    path: self.path.clone(),
                });
            };
            self.path.push_key(name);
            let encoded = self.sequence(value)?;
            self.path.pop();
            object.insert(name, encoded);
        }
        self.leave();
        Ok(object)
    }

    fn array(&mut self, array: &ArrayValue) -> Result<DocValue> {
        self.enter()?;
        let mut elements = Vec::with_capacity(array.len());
        for (i, member) in array.iter().enumerate() {
            self.path.push_index(i);
            if member.is_empty() {
                elements.push(DocValue::Null);
            }
            for item in member {
                elements.push(self.item(item)?);
            }
            self.path.pop();
        }
        self.leave();
        Ok(DocValue::Array(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::{AtomicValue, FunctionRef, NodeKind, NodeRef};
    use num_bigint::BigInt;

    fn options() -> ConversionOptions {
        ConversionOptions::default()
    }

    fn string(s: &str) -> Sequence {
        Sequence::singleton(AtomicValue::from(s))
    }

    #[test]
    fn test_empty_sequence_is_null() {
        assert_eq!(encode(&Sequence::empty(), &options()).unwrap(), DocValue::Null);
    }

    #[test]
    fn test_single_atomic_uses_scalar_codec() {
        assert_eq!(
            encode(&Sequence::singleton(AtomicValue::Int(3)), &options()).unwrap(),
            DocValue::Int32(3)
        );
    }

    #[test]
    fn test_map_encodes_in_key_order() {
        let mut map = MapValue::new();
        map.insert("name", string("Alice"));
        map.insert("age", Sequence::singleton(AtomicValue::Int(30)));
        map.insert("nickname", Sequence::empty());

        let doc = encode_document(&Sequence::singleton(map), &options()).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["name", "age", "nickname"]);
        assert_eq!(doc.get("age"), Some(&DocValue::Int32(30)));
        assert_eq!(doc.get("nickname"), Some(&DocValue::Null));
    }

    #[test]
    fn test_untyped_key_shares_string_key() {
        let mut map = MapValue::new();
        map.insert("a", Sequence::singleton(AtomicValue::Int(1)));
        map.insert(
            AtomicValue::UntypedAtomic("a".into()),
            Sequence::singleton(AtomicValue::Int(2)),
        );
        map.insert(AtomicValue::UntypedAtomic("b".into()), string("x"));

        let doc = encode_document(&Sequence::singleton(map), &options()).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&DocValue::Int32(2)));
        assert_eq!(doc.get("b"), Some(&DocValue::from("x")));
    }

    #[test]
    fn test_array_slots_flatten() {
        let mut several = Sequence::singleton(AtomicValue::Int(2));
        several.push(AtomicValue::Int(3));
        let array: ArrayValue = vec![
            Sequence::singleton(AtomicValue::Int(1)),
            several,
            Sequence::empty(),
        ]
        .into();

        let encoded = encode(&Sequence::singleton(array), &options()).unwrap();
        assert_eq!(
            encoded,
            DocValue::Array(vec![
                DocValue::Int32(1),
                DocValue::Int32(2),
                DocValue::Int32(3),
                DocValue::Null,
            ])
        );
    }

    #[test]
    fn test_multi_item_sequence_is_array() {
        let seq: Sequence = vec![
            Item::from(AtomicValue::from("a")),
            Item::from(AtomicValue::Boolean(false)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            encode(&seq, &options()).unwrap(),
            DocValue::Array(vec![DocValue::from("a"), DocValue::Boolean(false)])
        );
    }

    #[test]
    fn test_non_string_key_aborts() {
        let mut inner = MapValue::new();
        inner.insert("ok", string("x"));
        inner.insert(AtomicValue::Int(1), string("y"));
        let mut outer = MapValue::new();
        outer.insert("inner", Sequence::singleton(inner));

        let err = encode(&Sequence::singleton(outer), &options()).unwrap_err();
        match err {
            ConversionError::NonStringKey { key_type, path } => {
                assert_eq!(key_type, "xs:int");
                assert_eq!(path.to_string(), "root.inner");
            }
            other => panic!("Expected NonStringKey, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_item_reports_path() {
        let node = Item::Node(NodeRef::new(NodeKind::Element, Some("item".into())));
        let items: ArrayValue = vec![
            string("a"),
            string("b"),
            Sequence::singleton(node),
        ]
        .into();
        let mut map = MapValue::new();
        map.insert("items", Sequence::singleton(items));

        let err = encode(&Sequence::singleton(map), &options()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "element() has no document representation (at root.items[2])"
        );
    }

    #[test]
    fn test_function_item_is_unsupported() {
        let func = Item::Function(FunctionRef {
            name: Some("fn:count".into()),
            arity: 1,
        });
        let err = encode(&Sequence::singleton(func), &options()).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedType { ref type_name, .. }
            if type_name == "function(*)"));
    }

    #[test]
    fn test_scalar_error_is_located() {
        let huge = BigInt::from(i64::MAX) + 1;
        let mut map = MapValue::new();
        map.insert("count", Sequence::singleton(AtomicValue::Integer(huge)));

        let err = encode(&Sequence::singleton(map), &options()).unwrap_err();
        assert_eq!(err.kind(), "numeric-overflow");
        assert_eq!(err.path().to_string(), "root.count");
    }

    #[test]
    fn test_encode_document_requires_map() {
        let err = encode_document(&string("x"), &options()).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedType { ref type_name, .. }
            if type_name == "xs:string in place of a document"));
        assert!(encode_document(&Sequence::empty(), &options()).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut seq = Sequence::singleton(AtomicValue::Int(0));
        for _ in 0..5 {
            seq = Sequence::singleton(ArrayValue::from(vec![seq]));
        }

        let tight = ConversionOptions::default().with_max_depth(4);
        let err = encode(&seq, &tight).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::TooDeeplyNested { depth: 5, limit: 4, .. }
        ));

        let exact = ConversionOptions::default().with_max_depth(5);
        assert!(encode(&seq, &exact).is_ok());
    }
}
