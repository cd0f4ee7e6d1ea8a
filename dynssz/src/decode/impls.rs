use super::*;
use crate::descriptor::{split_hints, VariantDescriptor, UNBOUNDED};
use ethereum_types::{H256, U128, U256};
use std::sync::Arc;

macro_rules! impl_decodable_for_uint {
    ($type: ident, $bit_size: expr) => {
        impl Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $bit_size / 8
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
                let len = bytes.len();
                let expected = <Self as Decode>::ssz_fixed_len();

                if len != expected {
                    Err(Error::size_mismatch(expected, len))
                } else {
                    let mut array = [0; $bit_size / 8];
                    array.copy_from_slice(bytes);

                    Ok(Self::from_le_bytes(array))
                }
            }
        }

        impl DynDecode for $type {
            fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
                Ok(TypeDescriptor::uint($bit_size))
            }

            fn dyn_from_ssz_bytes(
                _ssz: &DynSsz,
                _hints: &[SizeHint],
                bytes: &[u8],
            ) -> Result<Self, Error> {
                Self::from_ssz_bytes(bytes)
            }
        }
    };
}

impl_decodable_for_uint!(u8, 8);
impl_decodable_for_uint!(u16, 16);
impl_decodable_for_uint!(u32, 32);
impl_decodable_for_uint!(u64, 64);
impl_decodable_for_uint!(u128, 128);

impl Decode for bool {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let len = bytes.len();
        if len != 1 {
            return Err(Error::size_mismatch(1, len));
        }
        match bytes[0] {
            0b0000_0000 => Ok(false),
            0b0000_0001 => Ok(true),
            other => Err(Error::new(ErrorKind::BytesInvalid(format!(
                "invalid value for boolean: {}",
                other
            )))),
        }
    }
}

impl DynDecode for bool {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::bool_type())
    }

    fn dyn_from_ssz_bytes(_ssz: &DynSsz, _hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        Self::from_ssz_bytes(bytes)
    }
}

macro_rules! impl_decodable_for_u256 {
    ($type: ident, $byte_size: expr) => {
        impl Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $byte_size
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
                let len = bytes.len();
                let expected = <Self as Decode>::ssz_fixed_len();

                if len != expected {
                    Err(Error::size_mismatch(expected, len))
                } else {
                    Ok(Self::from_little_endian(bytes))
                }
            }
        }

        impl DynDecode for $type {
            fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
                Ok(TypeDescriptor::uint($byte_size * 8))
            }

            fn dyn_from_ssz_bytes(
                _ssz: &DynSsz,
                _hints: &[SizeHint],
                bytes: &[u8],
            ) -> Result<Self, Error> {
                Self::from_ssz_bytes(bytes)
            }
        }
    };
}

impl_decodable_for_u256!(U128, 16);
impl_decodable_for_u256!(U256, 32);

impl Decode for H256 {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        32
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let len = bytes.len();
        if len != 32 {
            Err(Error::size_mismatch(32, len))
        } else {
            Ok(H256::from_slice(bytes))
        }
    }
}

impl DynDecode for H256 {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::byte_vector(32))
    }

    fn dyn_from_ssz_bytes(_ssz: &DynSsz, _hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        Self::from_ssz_bytes(bytes)
    }
}

macro_rules! impl_decodable_for_u8_array {
    ($len: expr) => {
        impl Decode for [u8; $len] {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
                let len = bytes.len();
                if len != $len {
                    Err(Error::size_mismatch($len, len))
                } else {
                    let mut array = [0; $len];
                    array.copy_from_slice(bytes);

                    Ok(array)
                }
            }
        }

        impl DynDecode for [u8; $len] {
            fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
                Ok(TypeDescriptor::byte_vector($len))
            }

            fn dyn_from_ssz_bytes(
                _ssz: &DynSsz,
                _hints: &[SizeHint],
                bytes: &[u8],
            ) -> Result<Self, Error> {
                Self::from_ssz_bytes(bytes)
            }
        }
    };
}

impl_decodable_for_u8_array!(4);
impl_decodable_for_u8_array!(32);
impl_decodable_for_u8_array!(48);
impl_decodable_for_u8_array!(96);

/// Decodes `bytes` as if it were a list of variable-length items, enforcing
/// `max_len` when one is declared.
///
/// The number of items is determined by how many offsets fit ahead of the
/// first offset's target.
pub fn decode_list_of_variable_length_items<T: Decode>(
    bytes: &[u8],
    max_len: Option<usize>,
) -> Result<Vec<T>, Error> {
    if bytes.is_empty() {
        return Ok(vec![]);
    }

    let first_offset = read_offset(bytes)?;
    sanitize_offset(first_offset, None, bytes.len(), Some(first_offset))?;

    if first_offset == 0 || first_offset % BYTES_PER_LENGTH_OFFSET != 0 {
        return Err(Error::invalid_offset(first_offset));
    }
    let num_items = first_offset / BYTES_PER_LENGTH_OFFSET;

    if max_len.map_or(false, |max| num_items > max) {
        return Err(Error::list_overflow(
            num_items,
            max_len.expect("max_len is Some"),
        ));
    }

    let mut values = Vec::with_capacity(num_items);
    let mut offset = first_offset;
    for i in 0..num_items {
        let slice_start = offset;
        let next_offset = if i + 1 == num_items {
            bytes.len()
        } else {
            let position = (i + 1) * BYTES_PER_LENGTH_OFFSET;
            sanitize_offset(
                read_offset(&bytes[position..]).map_err(|e| e.at_offset(position))?,
                Some(offset),
                bytes.len(),
                None,
            )
            .map_err(|e| e.at_offset(position))?
        };
        offset = next_offset;

        let slice = bytes
            .get(slice_start..next_offset)
            .ok_or_else(|| Error::invalid_offset(next_offset))?;
        values.push(
            T::from_ssz_bytes(slice).map_err(|e| e.with_index(i).at_offset(slice_start))?,
        );
    }
    Ok(values)
}

impl<T: Decode> Decode for Vec<T> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            Ok(vec![])
        } else if T::is_ssz_fixed_len() {
            let elem_len = T::ssz_fixed_len();
            if elem_len == 0 {
                return Err(Error::new(ErrorKind::UnsupportedType(
                    "sequences of zero-length elements",
                )));
            }
            if bytes.len() % elem_len != 0 {
                // A ragged tail cannot be part of the list.
                return Err(Error::new(ErrorKind::ExtraData {
                    len: bytes.len(),
                    expected: bytes.len() / elem_len * elem_len,
                }));
            }
            bytes
                .chunks(elem_len)
                .enumerate()
                .map(|(i, chunk)| {
                    T::from_ssz_bytes(chunk)
                        .map_err(|e| e.with_index(i).at_offset(i * elem_len))
                })
                .collect()
        } else {
            decode_list_of_variable_length_items(bytes, None)
        }
    }
}

impl<T: DynDecode + 'static> DynDecode for Vec<T> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let elem = ssz.decode_descriptor::<T>()?;
        Ok(TypeDescriptor::list(elem, None))
    }

    fn dyn_from_ssz_bytes(ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        let (cap, elem_hints) = split_hints(hints);

        let values = match dyn_elem_fixed_len::<T>(ssz, elem_hints)? {
            Some(elem_len) => dyn_decode_fixed_elems(ssz, elem_hints, bytes, elem_len)?,
            None => dyn_decode_variable_elems(ssz, elem_hints, bytes)?,
        };

        if let Some(cap) = cap {
            if cap.value != UNBOUNDED {
                check_list_cap(values.len(), cap.value)?;
            }
        }
        Ok(values)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (selector, body) = split_union_bytes(bytes)?;

        match selector.into() {
            0u8 => {
                if body.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::new(ErrorKind::ExtraData {
                        len: bytes.len(),
                        expected: 1,
                    }))
                }
            }
            1u8 => T::from_ssz_bytes(body)
                .map(Some)
                .map_err(|e| e.with_field("Some").at_offset(1)),
            other => Err(Error::new(ErrorKind::InvalidUnionSelector(other))),
        }
    }
}

impl<T: DynDecode + 'static> DynDecode for Option<T> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let some = ssz.decode_descriptor::<T>()?;
        Ok(TypeDescriptor::union(vec![
            VariantDescriptor {
                name: "None",
                elem: None,
            },
            VariantDescriptor {
                name: "Some",
                elem: Some(some),
            },
        ]))
    }

    fn dyn_from_ssz_bytes(ssz: &DynSsz, _hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        let (selector, body) = split_union_bytes(bytes)?;

        match selector.into() {
            0u8 => {
                if body.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::new(ErrorKind::ExtraData {
                        len: bytes.len(),
                        expected: 1,
                    }))
                }
            }
            1u8 => ssz
                .decode_item::<T>(&[], body)
                .map(Some)
                .map_err(|e| e.with_field("Some").at_offset(1)),
            other => Err(Error::new(ErrorKind::InvalidUnionSelector(other))),
        }
    }
}

impl<T: Decode> Decode for Arc<T> {
    fn is_ssz_fixed_len() -> bool {
        T::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        T::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        T::from_ssz_bytes(bytes).map(Arc::new)
    }
}

impl<T: DynDecode + 'static> DynDecode for Arc<T> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok((*ssz.decode_descriptor::<T>()?).clone())
    }

    fn dyn_from_ssz_bytes(ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        ssz.decode_item::<T>(hints, bytes).map(Arc::new)
    }
}
