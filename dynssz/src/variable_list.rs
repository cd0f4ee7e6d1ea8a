use crate::decode::impls::decode_list_of_variable_length_items;
use crate::decode::{
    check_list_cap, dyn_decode_fixed_elems, dyn_decode_variable_elems, dyn_elem_fixed_len, Decode,
    DynDecode,
};
use crate::descriptor::{split_hints, SizeHint, TypeDescriptor, UNBOUNDED};
use crate::encode::impls::{sequence_ssz_append, sequence_ssz_bytes_len};
use crate::encode::{dyn_sequence_append, dyn_sequence_len, DynEncode, Encode};
use crate::error::{Error, ErrorKind};
use crate::{DynSsz, OutOfBoundsError};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::convert::TryFrom;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice::SliceIndex;
use typenum::Unsigned;

/// An SSZ `List[T, N]`.
///
/// The typenum `N` is the list's maximum length under the default preset; a
/// `dynamic_size` annotation on the enclosing field may substitute a
/// different maximum at (de)serialization time. [`VariableList::new`] and
/// [`VariableList::push`] enforce the declared maximum; `From<Vec<T>>`
/// accepts any length and defers validation to the codec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableList<T, N> {
    vec: Vec<T>,
    _phantom: PhantomData<N>,
}

impl<T, N: Unsigned> VariableList<T, N> {
    /// Returns `Ok` if `vec` does not exceed the declared maximum.
    pub fn new(vec: Vec<T>) -> Result<Self, OutOfBoundsError> {
        if vec.len() <= Self::max_len() {
            Ok(Self {
                vec,
                _phantom: PhantomData,
            })
        } else {
            Err(OutOfBoundsError {
                i: vec.len(),
                len: Self::max_len(),
            })
        }
    }

    pub fn empty() -> Self {
        Self {
            vec: vec![],
            _phantom: PhantomData,
        }
    }

    /// The declared maximum length under the default preset.
    pub fn max_len() -> usize {
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

    /// Appends `value`, failing if the list is at its declared maximum.
    pub fn push(&mut self, value: T) -> Result<(), OutOfBoundsError> {
        if self.vec.len() < Self::max_len() {
            self.vec.push(value);
            Ok(())
        } else {
            Err(OutOfBoundsError {
                i: self.vec.len().saturating_add(1),
                len: Self::max_len(),
            })
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.vec
    }
}

impl<T, N: Unsigned> From<Vec<T>> for VariableList<T, N> {
    fn from(vec: Vec<T>) -> Self {
        Self {
            vec,
            _phantom: PhantomData,
        }
    }
}

impl<T, N: Unsigned> Default for VariableList<T, N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> Index<I> for VariableList<T, N> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        Index::index(&self.vec, index)
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> IndexMut<I> for VariableList<T, N> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(&mut self.vec, index)
    }
}

impl<T, N: Unsigned> Deref for VariableList<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.vec[..]
    }
}

impl<T, N: Unsigned> DerefMut for VariableList<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.vec[..]
    }
}

impl<'a, T, N: Unsigned> IntoIterator for &'a VariableList<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, N: Unsigned> IntoIterator for VariableList<T, N> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.vec.into_iter()
    }
}

impl<T: Encode, N: Unsigned> Encode for VariableList<T, N> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_bytes_len(&self) -> usize {
        sequence_ssz_bytes_len(&self.vec)
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        sequence_ssz_append(&self.vec, buf)
    }
}

impl<T: DynEncode + 'static, N: Unsigned> DynEncode for VariableList<T, N> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let elem = ssz.encode_descriptor::<T>()?;
        Ok(TypeDescriptor::list(elem, Some(N::to_u64())))
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
        let (cap, elem_hints) = split_hints(hints);
        let max = cap.map(|hint| hint.value).unwrap_or(N::to_u64());
        if max != UNBOUNDED {
            let max = usize::try_from(max).unwrap_or(usize::max_value());
            if self.vec.len() > max {
                return Err(Error::size_mismatch(max, self.vec.len()));
            }
        }
        dyn_sequence_append(&self.vec, ssz, elem_hints, buf)
    }
}

impl<T: Decode, N: Unsigned> Decode for VariableList<T, N> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let max_len = N::to_usize();

        if bytes.is_empty() {
            Ok(Self::empty())
        } else if T::is_ssz_fixed_len() {
            let elem_len = T::ssz_fixed_len().max(1);
            if bytes.len() % elem_len != 0 {
                // A ragged tail cannot be part of the list.
                return Err(Error::new(ErrorKind::ExtraData {
                    len: bytes.len(),
                    expected: bytes.len() / elem_len * elem_len,
                }));
            }
            let num_items = bytes.len() / elem_len;
            check_list_cap(num_items, max_len as u64)?;

            bytes
                .chunks(elem_len)
                .enumerate()
                .map(|(i, chunk)| {
                    T::from_ssz_bytes(chunk)
                        .map_err(|e| e.with_index(i).at_offset(i * elem_len))
                })
                .collect::<Result<Vec<T>, _>>()
                .map(Self::from)
        } else {
            decode_list_of_variable_length_items(bytes, Some(max_len)).map(Self::from)
        }
    }
}

impl<T: DynDecode + 'static, N: Unsigned> DynDecode for VariableList<T, N> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let elem = ssz.decode_descriptor::<T>()?;
        Ok(TypeDescriptor::list(elem, Some(N::to_u64())))
    }

    fn dyn_from_ssz_bytes(ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        let (cap, elem_hints) = split_hints(hints);
        let max = cap.map(|hint| hint.value).unwrap_or(N::to_u64());

        let vec = match dyn_elem_fixed_len::<T>(ssz, elem_hints)? {
            Some(elem_len) => dyn_decode_fixed_elems(ssz, elem_hints, bytes, elem_len)?,
            None => dyn_decode_variable_elems(ssz, elem_hints, bytes)?,
        };
        if max != UNBOUNDED {
            check_list_cap(vec.len(), max)?;
        }
        Ok(Self::from(vec))
    }
}

impl<T: Serialize, N: Unsigned> Serialize for VariableList<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for item in self.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for VariableList<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typenum::{U2, U32};

    #[test]
    fn new_enforces_maximum() {
        assert!(VariableList::<u64, U2>::new(vec![]).is_ok());
        assert!(VariableList::<u64, U2>::new(vec![1, 2]).is_ok());
        assert!(VariableList::<u64, U2>::new(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn push_respects_maximum() {
        let mut list = VariableList::<u64, U2>::empty();
        assert!(list.push(1).is_ok());
        assert!(list.push(2).is_ok());
        assert!(list.push(3).is_err());
    }

    #[test]
    fn ssz_round_trip() {
        let list = VariableList::<u16, U32>::new(vec![5, 6]).unwrap();
        let bytes = list.as_ssz_bytes();
        assert_eq!(bytes, vec![5, 0, 6, 0]);
        assert_eq!(VariableList::<u16, U32>::from_ssz_bytes(&bytes), Ok(list));
    }

    #[test]
    fn ssz_decode_enforces_maximum() {
        let bytes = vec![0; 6];
        assert_eq!(
            VariableList::<u16, U2>::from_ssz_bytes(&bytes)
                .unwrap_err()
                .kind(),
            &ErrorKind::ListOverflow { len: 3, max: 2 }
        );
    }
}
