//! Host sequence model.
//!
//! The query engine works with ordered sequences of items. An item is either
//! an atomic value carrying its declared subtype, a map, an array, or a host
//! object with no document counterpart (nodes and function items).
//!
//! Sequences never nest: appending a sequence to another splices its items.
//! Arrays are the only way to keep a sequence as a single slot.

use crate::types::AtomicType;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Atomic value with a runtime subtype tag.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicValue {
    String(String),
    UntypedAtomic(String),
    Boolean(bool),
    Int(i32),
    Long(i64),
    Integer(BigInt),
    Decimal(Decimal),
    Double(f64),
    Float(f32),
    DateTime(DateTime<Utc>),
    Base64Binary(Vec<u8>),
    DayTimeDuration(chrono::Duration),
    QName {
        namespace: Option<String>,
        local_name: String,
    },
}

impl AtomicValue {
    /// Runtime subtype tag.
    pub fn atomic_type(&self) -> AtomicType {
        match self {
            AtomicValue::String(_) => AtomicType::String,
            AtomicValue::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            AtomicValue::Boolean(_) => AtomicType::Boolean,
            AtomicValue::Int(_) => AtomicType::Int,
            AtomicValue::Long(_) => AtomicType::Long,
            AtomicValue::Integer(_) => AtomicType::Integer,
            AtomicValue::Decimal(_) => AtomicType::Decimal,
            AtomicValue::Double(_) => AtomicType::Double,
            AtomicValue::Float(_) => AtomicType::Float,
            AtomicValue::DateTime(_) => AtomicType::DateTime,
            AtomicValue::Base64Binary(_) => AtomicType::Base64Binary,
            AtomicValue::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            AtomicValue::QName { .. } => AtomicType::QName,
        }
    }

    /// String content of a string-valued atomic.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => Some(s),
            _ => None,
        }
    }

    /// Lexical form of the value, without quoting or type constructor.
    pub fn lexical(&self) -> String {
        match self {
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.clone(),
            AtomicValue::Boolean(b) => b.to_string(),
            AtomicValue::Int(i) => i.to_string(),
            AtomicValue::Long(i) => i.to_string(),
            AtomicValue::Integer(i) => i.to_string(),
            AtomicValue::Decimal(d) => d.normalize().to_string(),
            AtomicValue::Double(f) => format_float(*f),
            AtomicValue::Float(f) => format_float(f64::from(*f)),
            AtomicValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            AtomicValue::Base64Binary(bytes) => {
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
            AtomicValue::DayTimeDuration(d) => d.to_string(),
            AtomicValue::QName {
                namespace: Some(ns),
                local_name,
            } => format!("Q{{{ns}}}{local_name}"),
            AtomicValue::QName {
                namespace: None,
                local_name,
            } => local_name.clone(),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let lexical = if f > 0.0 { "INF" } else { "-INF" };
        lexical.to_string()
    } else {
        f.to_string()
    }
}

impl From<&str> for AtomicValue {
    fn from(s: &str) -> Self {
        AtomicValue::String(s.to_string())
    }
}

impl From<String> for AtomicValue {
    fn from(s: String) -> Self {
        AtomicValue::String(s)
    }
}

impl From<bool> for AtomicValue {
    fn from(b: bool) -> Self {
        AtomicValue::Boolean(b)
    }
}

impl From<i32> for AtomicValue {
    fn from(i: i32) -> Self {
        AtomicValue::Int(i)
    }
}

impl From<i64> for AtomicValue {
    fn from(i: i64) -> Self {
        AtomicValue::Long(i)
    }
}

impl From<f64> for AtomicValue {
    fn from(f: f64) -> Self {
        AtomicValue::Double(f)
    }
}

impl From<BigInt> for AtomicValue {
    fn from(i: BigInt) -> Self {
        AtomicValue::Integer(i)
    }
}

impl From<Decimal> for AtomicValue {
    fn from(d: Decimal) -> Self {
        AtomicValue::Decimal(d)
    }
}

/// Map key: an atomic value compared by type and value.
///
/// Floating point keys compare by bit pattern so that every key, NaN
/// included, is equal to itself. `xs:string` and `xs:untypedAtomic` keys
/// compare by their text, so a map never holds both forms of one name.
#[derive(Debug, Clone)]
pub struct MapKey(AtomicValue);

impl MapKey {
    pub fn value(&self) -> &AtomicValue {
        &self.0
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (AtomicValue::Double(a), AtomicValue::Double(b)) => a.to_bits() == b.to_bits(),
            (AtomicValue::Float(a), AtomicValue::Float(b)) => a.to_bits() == b.to_bits(),
            (
                AtomicValue::String(a) | AtomicValue::UntypedAtomic(a),
                AtomicValue::String(b) | AtomicValue::UntypedAtomic(b),
            ) => a == b,
            (a, b) => a == b,
        }
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(text) = self.0.as_str() {
            text.hash(state);
            return;
        }
        self.0.atomic_type().hash(state);
        match &self.0 {
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.hash(state),
            AtomicValue::Boolean(b) => b.hash(state),
            AtomicValue::Int(i) => i.hash(state),
            AtomicValue::Long(i) => i.hash(state),
            AtomicValue::Integer(i) => i.hash(state),
            AtomicValue::Decimal(d) => d.hash(state),
            AtomicValue::Double(f) => f.to_bits().hash(state),
            AtomicValue::Float(f) => f.to_bits().hash(state),
            AtomicValue::DateTime(dt) => dt.hash(state),
            AtomicValue::Base64Binary(bytes) => bytes.hash(state),
            AtomicValue::DayTimeDuration(d) => d.hash(state),
            AtomicValue::QName {
                namespace,
                local_name,
            } => {
                namespace.hash(state);
                local_name.hash(state);
            }
        }
    }
}

/// Ordered map with unique atomic keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapValue {
    entries: IndexMap<MapKey, Sequence>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert an entry. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<AtomicValue>, value: Sequence) -> Option<Sequence> {
        self.entries.insert(MapKey(key.into()), value)
    }

    pub fn get(&self, key: &AtomicValue) -> Option<&Sequence> {
        self.entries.get(&MapKey(key.clone()))
    }

    /// Look up an `xs:string` key.
    pub fn get_str(&self, key: &str) -> Option<&Sequence> {
        self.entries.get(&MapKey(AtomicValue::String(key.to_string())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &AtomicValue> {
        self.entries.keys().map(MapKey::value)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&AtomicValue, &Sequence)> {
        self.entries.iter().map(|(k, v)| (k.value(), v))
    }
}

impl FromIterator<(AtomicValue, Sequence)> for MapValue {
    fn from_iter<T: IntoIterator<Item = (AtomicValue, Sequence)>>(iter: T) -> Self {
        let mut map = MapValue::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Ordered array whose slots each hold a sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayValue {
    members: Vec<Sequence>,
}

impl ArrayValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, member: Sequence) {
        self.members.push(member);
    }

    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.members.get(index)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Sequence] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.members.iter()
    }
}

impl From<Vec<Sequence>> for ArrayValue {
    fn from(members: Vec<Sequence>) -> Self {
        Self { members }
    }
}

impl FromIterator<Sequence> for ArrayValue {
    fn from_iter<T: IntoIterator<Item = Sequence>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

/// Kind of a host tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Handle to a node in the query engine's tree store.
///
/// Nodes live in the engine and have no document-side representation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub name: Option<String>,
}

impl NodeRef {
    pub fn new(kind: NodeKind, name: Option<String>) -> Self {
        Self { kind, name }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Document => "document-node()",
            NodeKind::Element => "element()",
            NodeKind::Attribute => "attribute()",
            NodeKind::Text => "text()",
            NodeKind::Comment => "comment()",
            NodeKind::ProcessingInstruction => "processing-instruction()",
        }
    }
}

/// Handle to a function item.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRef {
    pub name: Option<String>,
    pub arity: usize,
}

/// A single host item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Atomic(AtomicValue),
    Map(MapValue),
    Array(ArrayValue),
    Node(NodeRef),
    Function(FunctionRef),
}

impl Item {
    /// Human-readable host type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Atomic(a) => a.atomic_type().name(),
            Item::Map(_) => "map(*)",
            Item::Array(_) => "array(*)",
            Item::Node(n) => n.type_name(),
            Item::Function(_) => "function(*)",
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicValue> {
        match self {
            Item::Atomic(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Item::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Item::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl From<AtomicValue> for Item {
    fn from(atomic: AtomicValue) -> Self {
        Item::Atomic(atomic)
    }
}

impl From<MapValue> for Item {
    fn from(map: MapValue) -> Self {
        Item::Map(map)
    }
}

impl From<ArrayValue> for Item {
    fn from(array: ArrayValue) -> Self {
        Item::Array(array)
    }
}

/// Ordered, possibly empty collection of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence(Vec<Item>);

impl Sequence {
    /// The empty sequence.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn singleton(item: impl Into<Item>) -> Self {
        Self(vec![item.into()])
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        Self(items)
    }

    pub fn push(&mut self, item: impl Into<Item>) {
        self.0.push(item.into());
    }

    /// Splice another sequence onto the end of this one.
    pub fn append(&mut self, other: Sequence) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Item> {
        self.0.first()
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    pub fn into_items(self) -> Vec<Item> {
        self.0
    }
}

impl From<Item> for Sequence {
    fn from(item: Item) -> Self {
        Sequence::singleton(item)
    }
}

impl From<AtomicValue> for Sequence {
    fn from(atomic: AtomicValue) -> Self {
        Sequence::singleton(atomic)
    }
}

impl FromIterator<Item> for Sequence {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Sequence(iter.into_iter().collect())
    }
}

impl IntoIterator for Sequence {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// Adaptive serialization, as the engine prints values in diagnostics.

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            AtomicValue::Boolean(b) => write!(f, "{b}()"),
            AtomicValue::Int(_)
            | AtomicValue::Long(_)
            | AtomicValue::Integer(_)
            | AtomicValue::Decimal(_)
            | AtomicValue::Double(_) => f.write_str(&self.lexical()),
            other => write!(f, "{}(\"{}\")", other.atomic_type(), other.lexical()),
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Atomic(a) => write!(f, "{a}"),
            Item::Map(map) => {
                f.write_str("map{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("}")
            }
            Item::Array(array) => {
                f.write_str("[")?;
                for (i, member) in array.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str("]")
            }
            Item::Node(node) => match &node.name {
                Some(name) => write!(f, "{}", node.type_name().replace("()", &format!("({name})"))),
                None => f.write_str(node.type_name()),
            },
            Item::Function(func) => match &func.name {
                Some(name) => write!(f, "{name}#{}", func.arity),
                None => write!(f, "(anonymous-function)#{}", func.arity),
            },
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("()"),
            [single] => write!(f, "{single}"),
            items => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_append_splices() {
        let mut seq = Sequence::singleton(AtomicValue::Int(1));
        let mut other = Sequence::singleton(AtomicValue::Int(2));
        other.push(AtomicValue::Int(3));
        seq.append(other);
        seq.append(Sequence::empty());

        assert_eq!(seq.len(), 3);
        assert!(seq.iter().all(|item| item.as_atomic().is_some()));
    }

    #[test]
    fn test_map_keeps_insertion_order() {
        let mut map = MapValue::new();
        map.insert("b", Sequence::empty());
        map.insert("a", Sequence::empty());
        map.insert("c", Sequence::empty());
        map.insert("a", Sequence::singleton(AtomicValue::Int(1)));

        let keys: Vec<_> = map.keys().filter_map(AtomicValue::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(map.get_str("a"), Some(&Sequence::singleton(AtomicValue::Int(1))));
    }

    #[test]
    fn test_map_keys_distinguish_types() {
        let mut map = MapValue::new();
        map.insert(AtomicValue::Int(1), Sequence::empty());
        map.insert(AtomicValue::Long(1), Sequence::empty());
        map.insert(AtomicValue::Double(f64::NAN), Sequence::empty());
        map.insert(AtomicValue::Double(f64::NAN), Sequence::empty());

        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_untyped_key_is_same_as_string_key() {
        let mut map = MapValue::new();
        map.insert("a", Sequence::singleton(AtomicValue::Int(1)));
        let replaced = map.insert(
            AtomicValue::UntypedAtomic("a".into()),
            Sequence::singleton(AtomicValue::Int(2)),
        );

        assert_eq!(replaced, Some(Sequence::singleton(AtomicValue::Int(1))));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_str("a"), Some(&Sequence::singleton(AtomicValue::Int(2))));
        assert_eq!(
            map.get(&AtomicValue::UntypedAtomic("a".into())),
            Some(&Sequence::singleton(AtomicValue::Int(2)))
        );
    }

    #[test]
    fn test_item_type_names() {
        assert_eq!(Item::from(AtomicValue::Int(1)).type_name(), "xs:int");
        assert_eq!(Item::from(MapValue::new()).type_name(), "map(*)");
        assert_eq!(Item::from(ArrayValue::new()).type_name(), "array(*)");
        assert_eq!(
            Item::Node(NodeRef::new(NodeKind::Element, Some("a".into()))).type_name(),
            "element()"
        );
    }

    #[test]
    fn test_adaptive_display() {
        let mut map = MapValue::new();
        map.insert("name", Sequence::singleton(AtomicValue::from("x\"y")));
        let array: ArrayValue = vec![
            Sequence::singleton(AtomicValue::Int(1)),
            Sequence::empty(),
            Sequence::from_items(vec![
                AtomicValue::Boolean(true).into(),
                AtomicValue::Long(2).into(),
            ]),
        ]
        .into();
        map.insert("list", Sequence::singleton(array));

        assert_eq!(
            Sequence::singleton(map).to_string(),
            r#"map{"name":"x""y","list":[1,(),(true(), 2)]}"#
        );
        assert_eq!(Sequence::empty().to_string(), "()");
    }

    #[test]
    fn test_datetime_lexical() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        assert_eq!(AtomicValue::DateTime(dt).lexical(), "2024-06-15T10:30:00Z");
        assert_eq!(
            AtomicValue::DateTime(dt).to_string(),
            "xs:dateTime(\"2024-06-15T10:30:00Z\")"
        );
    }

    #[test]
    fn test_float_lexical() {
        assert_eq!(AtomicValue::Double(f64::INFINITY).lexical(), "INF");
        assert_eq!(AtomicValue::Double(f64::NAN).lexical(), "NaN");
        assert_eq!(AtomicValue::Double(1.5).lexical(), "1.5");
    }
}
