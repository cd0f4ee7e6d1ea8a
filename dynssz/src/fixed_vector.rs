use crate::decode::impls::decode_list_of_variable_length_items;
use crate::decode::{Decode, DynDecode};
use crate::descriptor::{split_hints, SizeHint, TypeDescriptor};
use crate::encode::impls::{sequence_ssz_append, sequence_ssz_bytes_len};
use crate::encode::{dyn_sequence_append, dyn_sequence_len, Encode, DynEncode};
use crate::error::Error;
use crate::{DynSsz, OutOfBoundsError, BYTES_PER_LENGTH_OFFSET};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::convert::TryFrom;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice::SliceIndex;
use typenum::Unsigned;

/// An SSZ `Vector[T, N]`.
///
/// The typenum `N` is the vector's declared length under the default preset.
/// A `dynamic_size` annotation on the enclosing field may override the
/// effective length at (de)serialization time, which is why the backing store
/// is a heap vector rather than an array; [`FixedVector::new`] enforces the
/// declared length, while `From<Vec<T>>` accepts any length for
/// spec-parameterized values and defers validation to the codec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixedVector<T, N> {
    vec: Vec<T>,
    _phantom: PhantomData<N>,
}

impl<T, N: Unsigned> FixedVector<T, N> {
    /// Returns `Ok` if `vec` matches the declared length.
    pub fn new(vec: Vec<T>) -> Result<Self, OutOfBoundsError> {
        if vec.len() == Self::capacity() {
            Ok(Self {
                vec,
                _phantom: PhantomData,
            })
        } else {
            Err(OutOfBoundsError {
                i: vec.len(),
                len: Self::capacity(),
            })
        }
    }

    /// Create a vector filled with clones of `elem`.
    pub fn from_elem(elem: T) -> Self
    where
        T: Clone,
    {
        Self {
            vec: vec![elem; N::to_usize()],
            _phantom: PhantomData,
        }
    }

    /// The declared length under the default preset.
    pub fn capacity() -> usize {
        N::to_usize()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.vec
    }
}

impl<T, N: Unsigned> From<Vec<T>> for FixedVector<T, N> {
    fn from(vec: Vec<T>) -> Self {
        Self {
            vec,
            _phantom: PhantomData,
        }
    }
}

impl<T: Default, N: Unsigned> Default for FixedVector<T, N> {
    fn default() -> Self {
        Self {
            vec: (0..N::to_usize()).map(|_| T::default()).collect(),
            _phantom: PhantomData,
        }
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> Index<I> for FixedVector<T, N> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        Index::index(&self.vec, index)
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> IndexMut<I> for FixedVector<T, N> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(&mut self.vec, index)
    }
}

impl<T, N: Unsigned> Deref for FixedVector<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.vec[..]
    }
}

impl<T, N: Unsigned> DerefMut for FixedVector<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.vec[..]
    }
}

impl<'a, T, N: Unsigned> IntoIterator for &'a FixedVector<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, N: Unsigned> IntoIterator for FixedVector<T, N> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.vec.into_iter()
    }
}

impl<T: Encode, N: Unsigned> Encode for FixedVector<T, N> {
    fn is_ssz_fixed_len() -> bool {
        T::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        if <Self as Encode>::is_ssz_fixed_len() {
            T::ssz_fixed_len() * N::to_usize()
        } else {
            BYTES_PER_LENGTH_OFFSET
        }
    }

    fn ssz_bytes_len(&self) -> usize {
        sequence_ssz_bytes_len(&self.vec)
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        sequence_ssz_append(&self.vec, buf)
    }
}

impl<T: DynEncode + 'static, N: Unsigned> DynEncode for FixedVector<T, N> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let elem = ssz.encode_descriptor::<T>()?;
        TypeDescriptor::vector(elem, N::to_u64())
    }

    fn dyn_ssz_bytes_len(&self, ssz: &DynSsz, hints: &[SizeHint]) -> Result<usize, Error> {
        let (_, elem_hints) = split_hints(hints);
        dyn_sequence_len(&self.vec, ssz, elem_hints)
    }

    fn dyn_ssz_append(
        &self,
        ssz: &DynSsz,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let (length, elem_hints) = split_hints(hints);
        let declared = length
            .map(|hint| usize::try_from(hint.value).map_err(|_| Error::overflow()))
            .unwrap_or(Ok(N::to_usize()))?;

        if self.vec.len() != declared {
            return Err(Error::size_mismatch(declared, self.vec.len()));
        }
        dyn_sequence_append(&self.vec, ssz, elem_hints, buf)
    }
}

impl<T: Decode, N: Unsigned> Decode for FixedVector<T, N> {
    fn is_ssz_fixed_len() -> bool {
        T::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        if <Self as Decode>::is_ssz_fixed_len() {
            T::ssz_fixed_len() * N::to_usize()
        } else {
            BYTES_PER_LENGTH_OFFSET
        }
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let expected_len = N::to_usize();

        if T::is_ssz_fixed_len() {
            let elem_len = T::ssz_fixed_len();
            let expected = elem_len
                .checked_mul(expected_len)
                .ok_or_else(Error::overflow)?;
            if bytes.len() != expected {
                return Err(Error::size_mismatch(expected, bytes.len()));
            }
            bytes
                .chunks(elem_len.max(1))
                .enumerate()
                .map(|(i, chunk)| {
                    T::from_ssz_bytes(chunk)
                        .map_err(|e| e.with_index(i).at_offset(i * elem_len))
                })
                .collect::<Result<Vec<T>, _>>()
                .map(Self::from)
        } else {
            let vec = decode_list_of_variable_length_items(bytes, None)?;
            if vec.len() != expected_len {
                return Err(Error::size_mismatch(expected_len, vec.len()));
            }
            Ok(Self::from(vec))
        }
    }
}

impl<T: DynDecode + 'static, N: Unsigned> DynDecode for FixedVector<T, N> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let elem = ssz.decode_descriptor::<T>()?;
        TypeDescriptor::vector(elem, N::to_u64())
    }

    fn dyn_from_ssz_bytes(ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        let (length, elem_hints) = split_hints(hints);
        let declared = length
            .map(|hint| usize::try_from(hint.value).map_err(|_| Error::overflow()))
            .unwrap_or(Ok(N::to_usize()))?;

        let vec = match crate::decode::dyn_elem_fixed_len::<T>(ssz, elem_hints)? {
            Some(elem_len) => {
                let expected = elem_len.checked_mul(declared).ok_or_else(Error::overflow)?;
                if bytes.len() != expected {
                    return Err(Error::size_mismatch(expected, bytes.len()));
                }
                crate::decode::dyn_decode_fixed_elems(ssz, elem_hints, bytes, elem_len)?
            }
            None => crate::decode::dyn_decode_variable_elems(ssz, elem_hints, bytes)?,
        };
        if vec.len() != declared {
            return Err(Error::size_mismatch(declared, vec.len()));
        }
        Ok(Self::from(vec))
    }
}

impl<T: Serialize, N: Unsigned> Serialize for FixedVector<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for item in self.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for FixedVector<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Lengths other than `N` are accepted so spec-parameterized values can
        // round-trip through JSON; the codec enforces the effective length.
        Vec::<T>::deserialize(deserializer).map(Self::from)
    }
}
