//! Reverse conversion: document value → host Sequence.
//!
//! Every document value has exactly one host representation:
//!
//! - object → a single map with `xs:string` keys in document order
//! - array → a single array with one slot per element (no flattening)
//! - scalar → a single atomic from the Scalar Codec
//! - null → the empty sequence (the host model has no null item)
//!
//! An empty document array therefore decodes to a one-item sequence holding
//! a zero-length array, never to the empty sequence.

use crate::error::{ConversionError, Result};
use crate::options::ConversionOptions;
use crate::path::ValuePath;
use crate::scalar::decode_scalar;
use docbridge_core::{ArrayValue, AtomicValue, DocObject, DocValue, MapValue, Sequence};

/// Convert a document value to a host sequence.
///
/// # Errors
///
/// `TooDeeplyNested` past `options.max_depth`, and `MalformedScalar` for
/// inconsistent scalars such as an out-of-range date/time.
pub fn decode(value: &DocValue, options: &ConversionOptions) -> Result<Sequence> {
    Decoder::new(options).value(value)
}

/// Convert a document object to a host sequence holding a single map.
pub fn decode_document(object: &DocObject, options: &ConversionOptions) -> Result<Sequence> {
    let mut decoder = Decoder::new(options);
    Ok(Sequence::singleton(decoder.object(object)?))
}

struct Decoder<'a> {
    options: &'a ConversionOptions,
    path: ValuePath,
    depth: usize,
}

impl<'a> Decoder<'a> {
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

    fn value(&mut self, value: &DocValue) -> Result<Sequence> {
        match value {
            DocValue::Null => Ok(Sequence::empty()),
            DocValue::Object(object) => Ok(Sequence::singleton(self.object(object)?)),
            DocValue::Array(elements) => Ok(Sequence::singleton(self.array(elements)?)),
            scalar => decode_scalar(scalar)
                .map(Sequence::singleton)
                .map_err(|e| e.at(&self.path)),
        }
    }

    fn object(&mut self, object: &DocObject) -> Result<MapValue> {
        self.enter()?;
        let mut map = MapValue::with_capacity(object.len());
        for (key, value) in object {
            self.path.push_key(key.as_str());
            let decoded = self.value(value)?;
            self.path.pop();
            map.insert(AtomicValue::String(key.clone()), decoded);
        }
        self.leave();
        Ok(map)
    }

    fn array(&mut self, elements: &[DocValue]) -> Result<ArrayValue> {
        self.enter()?;
        let mut array = ArrayValue::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            self.path.push_index(i);
            array.push(self.value(element)?);
            self.path.pop();
        }
        self.leave();
        Ok(array)
    }
}
