//! Provides encoding (serialization) and decoding (deserialization) in the
//! SimpleSerialize (SSZ) format, with field sizes resolved at runtime from a
//! caller-supplied set of preset values.
//!
//! Statically generated SSZ codecs bake the mainnet preset's lengths into the
//! binary. This crate walks a cached description of each type instead: field
//! annotations declare which dimensions depend on preset values
//! (`dynamic_size`) and what their defaults are (`static_size`), and a
//! [`DynSsz`] instance resolves them against its registry. Types with no
//! override in force are routed through the static fast-path codec, which is
//! byte-identical to the dynamic path.
//!
//! ## Example
//!
//! ```rust
//! use dynssz::{DynSsz, FixedVector};
//! use dynssz_derive::{Decode, Encode};
//! use std::collections::HashMap;
//! use typenum::U8;
//!
//! #[derive(PartialEq, Debug, Encode, Decode, Default)]
//! struct HistoricalSummary {
//!     slot: u64,
//!     #[ssz(static_size = "8,32", dynamic_size = "SLOTS_PER_HISTORICAL_ROOT,32")]
//!     block_roots: FixedVector<[u8; 32], U8>,
//! }
//!
//! fn main() {
//!     let mut specs = HashMap::new();
//!     specs.insert("SLOTS_PER_HISTORICAL_ROOT".to_string(), 2);
//!     let ssz = DynSsz::new(specs);
//!
//!     let summary = HistoricalSummary {
//!         slot: 42,
//!         block_roots: vec![[0; 32]; 2].into(),
//!     };
//!
//!     let bytes = ssz.marshal(&summary).unwrap();
//!     assert_eq!(bytes.len(), 8 + 2 * 32);
//!
//!     let mut decoded = HistoricalSummary::default();
//!     ssz.unmarshal(&mut decoded, &bytes).unwrap();
//!     assert_eq!(decoded, summary);
//! }
//! ```

mod bitfield;
mod decode;
mod descriptor;
mod encode;
mod error;
mod expr;
mod fixed_vector;
mod spec;
mod tag;
mod variable_list;

pub mod serde_utils;

pub use bitfield::{BitList, BitVector, Bitfield, BitfieldBehaviour, Fixed, Variable};
pub use decode::{
    impls::decode_list_of_variable_length_items, read_offset, sanitize_offset, split_union_bytes,
    Decode, DynDecode, SszDecoder, SszDecoderBuilder, UnionSelector,
};
pub use descriptor::{
    hints_are_dynamic, resolve_field, FieldDescriptor, SizeHint, SszKind, TypeDescriptor,
    VariantDescriptor,
};
pub use encode::{encode_length, DynEncode, Encode, SszEncoder};
pub use error::{Error, ErrorKind};
pub use expr::{ExprError, SizeExpr};
pub use fixed_vector::FixedVector;
pub use spec::SpecValues;
pub use variable_list::VariableList;

use descriptor::{hints_are_dynamic as any_dynamic, DescriptorCache};
use error::ErrorKind as Kind;
use std::collections::HashMap;
use std::sync::Arc;

/// The number of bytes used to represent an offset.
pub const BYTES_PER_LENGTH_OFFSET: usize = 4;

/// The maximum value that can be represented using `BYTES_PER_LENGTH_OFFSET`.
#[cfg(target_pointer_width = "32")]
pub const MAX_LENGTH_VALUE: usize = (std::u32::MAX >> (8 * (4 - BYTES_PER_LENGTH_OFFSET))) as usize;
#[cfg(target_pointer_width = "64")]
pub const MAX_LENGTH_VALUE: usize = (std::u64::MAX >> (8 * (8 - BYTES_PER_LENGTH_OFFSET))) as usize;

/// The number of bytes used to indicate the variant of a union.
pub const BYTES_PER_UNION_SELECTOR: usize = 1;

/// The highest possible union selector value (higher values are reserved for
/// backwards compatible extensions).
pub const MAX_UNION_SELECTOR: u8 = 127;

/// Returned by the container types when an index or length violates the
/// type-level bound.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("index {i} out of bounds (length {len})")]
pub struct OutOfBoundsError {
    pub i: usize,
    pub len: usize,
}

/// An SSZ codec parameterized by a set of named preset values.
///
/// The registry is immutable after construction. Descriptors for each
/// (de)serialized type are built on first use and cached for the instance's
/// lifetime; concurrent `marshal`/`unmarshal`/`size` calls on distinct values
/// are safe, with the cache as the only shared, internally synchronized
/// state.
pub struct DynSsz {
    specs: SpecValues,
    cache: DescriptorCache,
}

impl DynSsz {
    /// Creates a codec resolving `dynamic_size` expressions against `specs`.
    pub fn new(specs: HashMap<String, u64>) -> Self {
        Self {
            specs: SpecValues::new(specs),
            cache: DescriptorCache::default(),
        }
    }

    /// The registry supplied at construction.
    pub fn specs(&self) -> &SpecValues {
        &self.specs
    }

    /// Serializes `value`, returning the SSZ bytes.
    pub fn marshal<T: DynEncode + 'static>(&self, value: &T) -> Result<Vec<u8>, Error> {
        let desc = self
            .encode_descriptor::<T>()
            .map_err(|e| e.with_field(short_type_name::<T>()))?;

        let mut buf = Vec::with_capacity(desc.static_size.unwrap_or(0));
        self.append_item(value, &[], &mut buf)
            .map_err(|e| e.with_field(short_type_name::<T>()))?;
        Ok(buf)
    }

    /// Deserializes `bytes` into the caller-supplied `target`.
    ///
    /// The bytes must be exactly the value's serialized length; trailing
    /// bytes are rejected. On failure `target` is left untouched.
    pub fn unmarshal<T: DynEncode + DynDecode + 'static>(
        &self,
        target: &mut T,
        bytes: &[u8],
    ) -> Result<(), Error> {
        let desc = self
            .decode_descriptor::<T>()
            .map_err(|e| e.with_field(short_type_name::<T>()))?;

        if let Some(expected) = desc.static_size {
            if bytes.len() > expected {
                return Err(Error::new(Kind::ExtraData {
                    len: bytes.len(),
                    expected,
                })
                .with_field(short_type_name::<T>()));
            }
        }

        let value = self
            .decode_item::<T>(&[], bytes)
            .map_err(|e| e.with_field(short_type_name::<T>()))?;

        // Variable-size types have no up-front expected size; check that the
        // decoded value accounts for every supplied byte.
        if desc.static_size.is_none() {
            let consumed = self
                .item_len(&value, &[])
                .map_err(|e| e.with_field(short_type_name::<T>()))?;
            if consumed != bytes.len() {
                return Err(Error::new(Kind::ExtraData {
                    len: bytes.len(),
                    expected: consumed,
                })
                .with_field(short_type_name::<T>()));
            }
        }

        *target = value;
        Ok(())
    }

    /// The serialized size of `value` under this instance's spec values.
    pub fn size<T: DynEncode + 'static>(&self, value: &T) -> Result<usize, Error> {
        self.item_len(value, &[])
            .map_err(|e| e.with_field(short_type_name::<T>()))
    }

    /// Encodes one item, routing through the static fast path when the type
    /// needs no dynamic behaviour and no override is in force at this
    /// boundary.
    ///
    /// This is the entry point the generated and built-in implementations use
    /// for every nested value.
    pub fn append_item<T: DynEncode + 'static>(
        &self,
        value: &T,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let desc = self.encode_descriptor::<T>()?;
        if desc.fast_path && !desc.needs_dynamic && !any_dynamic(hints) {
            value.ssz_append(buf);
            Ok(())
        } else {
            value.dyn_ssz_append(self, hints, buf)
        }
    }

    /// The serialized length of one item under the hints in force.
    pub fn item_len<T: DynEncode + 'static>(
        &self,
        value: &T,
        hints: &[SizeHint],
    ) -> Result<usize, Error> {
        let desc = self.encode_descriptor::<T>()?;
        if desc.fast_path && !desc.needs_dynamic && !any_dynamic(hints) {
            Ok(value.ssz_bytes_len())
        } else {
            value.dyn_ssz_bytes_len(self, hints)
        }
    }

    /// Decodes one item, routing through the static fast path when possible.
    pub fn decode_item<T: DynDecode + 'static>(
        &self,
        hints: &[SizeHint],
        bytes: &[u8],
    ) -> Result<T, Error> {
        let desc = self.decode_descriptor::<T>()?;
        if desc.fast_path && !desc.needs_dynamic && !any_dynamic(hints) {
            T::from_ssz_bytes(bytes)
        } else {
            T::dyn_from_ssz_bytes(self, hints, bytes)
        }
    }

    /// The cached descriptor for `T` as an encodable type, building it on
    /// first use.
    pub fn encode_descriptor<T: DynEncode + 'static>(
        &self,
    ) -> Result<Arc<TypeDescriptor>, Error> {
        if let Some(desc) = self.cache.get::<T>() {
            return Ok(desc);
        }
        let built = <T as DynEncode>::ssz_type_def(self)?;
        Ok(self.cache.insert::<T>(built))
    }

    /// The cached descriptor for `T` as a decodable type, building it on
    /// first use.
    pub fn decode_descriptor<T: DynDecode + 'static>(
        &self,
    ) -> Result<Arc<TypeDescriptor>, Error> {
        if let Some(desc) = self.cache.get::<T>() {
            return Ok(desc);
        }
        let built = <T as DynDecode>::ssz_type_def(self)?;
        Ok(self.cache.insert::<T>(built))
    }
}

/// Convenience function to SSZ encode an object under its static sizes.
///
/// Equivalent to `val.as_ssz_bytes()`.
pub fn ssz_encode<T>(val: &T) -> Vec<u8>
where
    T: Encode,
{
    val.as_ssz_bytes()
}

/// The unqualified name of `T`, used as the root of error paths.
fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(short_type_name::<u64>(), "u64");
        assert_eq!(
            short_type_name::<FixedVector<u8, typenum::U4>>(),
            "FixedVector"
        );
    }

    #[test]
    fn fixed_types_ignore_the_registry() {
        let ssz = DynSsz::new(HashMap::new());
        assert_eq!(ssz.marshal(&42u64).unwrap(), vec![42, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ssz.size(&42u64).unwrap(), 8);
    }

    #[test]
    fn unmarshal_rejects_trailing_bytes() {
        let ssz = DynSsz::new(HashMap::new());
        let mut target = 0u32;
        let err = ssz.unmarshal(&mut target, &[1, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::ExtraData {
                len: 5,
                expected: 4
            }
        );
    }

    #[test]
    fn descriptors_are_cached() {
        let ssz = DynSsz::new(HashMap::new());
        let a = ssz.encode_descriptor::<Vec<u16>>().unwrap();
        let b = ssz.decode_descriptor::<Vec<u16>>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
