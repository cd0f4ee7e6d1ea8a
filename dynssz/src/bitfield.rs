use crate::decode::{Decode, DynDecode};
use crate::descriptor::{bytes_for_bit_len, split_hints, SizeHint, TypeDescriptor, UNBOUNDED};
use crate::encode::{DynEncode, Encode};
use crate::error::{Error, ErrorKind};
use crate::serde_utils::hex;
use crate::{DynSsz, OutOfBoundsError};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use smallvec::{smallvec, SmallVec};
use std::convert::TryFrom;
use std::marker::PhantomData;
use typenum::Unsigned;

/// Bitfields are kept inline up to this many bytes before spilling to the
/// heap.
const SMALLVEC_LEN: usize = 32;

/// A marker trait for the two bitfield behaviours.
pub trait BitfieldBehaviour {}

/// A marker for a `BitList[N]`: a bitfield of any length up to `N`.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Variable<N> {
    _phantom: PhantomData<N>,
}

/// A marker for a `BitVector[N]`: a bitfield of exactly `N` bits under the
/// default preset.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Fixed<N> {
    _phantom: PhantomData<N>,
}

impl<N: Unsigned> BitfieldBehaviour for Variable<N> {}
impl<N: Unsigned> BitfieldBehaviour for Fixed<N> {}

/// An SSZ `BitList[N]`.
pub type BitList<N> = Bitfield<Variable<N>>;

/// An SSZ `BitVector[N]`.
pub type BitVector<N> = Bitfield<Fixed<N>>;

/// A heap-allocated, ordered collection of `bool` values with little-endian
/// bit packing: bit `i` lives in byte `i / 8` at position `i % 8`.
///
/// The `T` marker selects list or vector behaviour; use the [`BitList`] and
/// [`BitVector`] aliases. Bits at or above `len` are kept zero as an internal
/// invariant, so the raw bytes are always canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitfield<T> {
    bytes: SmallVec<[u8; SMALLVEC_LEN]>,
    len: usize,
    _phantom: PhantomData<T>,
}

impl<N: Unsigned> Bitfield<Variable<N>> {
    /// Instantiate with a length of zero bits.
    pub fn empty() -> Self {
        Self::with_len(0)
    }

    /// Instantiate a bitlist of `num_bits` zero bits, failing if `num_bits`
    /// exceeds the declared maximum.
    pub fn with_capacity(num_bits: usize) -> Result<Self, OutOfBoundsError> {
        if num_bits <= Self::max_len() {
            Ok(Self::with_len(num_bits))
        } else {
            Err(OutOfBoundsError {
                i: num_bits,
                len: Self::max_len(),
            })
        }
    }

    /// The maximum length under the default preset.
    pub fn max_len() -> usize {
        N::to_usize()
    }

    /// The bytes of this bitlist in its SSZ form, with the length-delimiting
    /// bit set at position `self.len()`.
    pub(crate) fn to_delimited_bytes(&self) -> SmallVec<[u8; SMALLVEC_LEN]> {
        let mut bytes = self.bytes.clone();
        bytes.resize(bytes_for_bit_len(self.len + 1), 0);
        bytes[self.len / 8] |= 1 << (self.len % 8);
        bytes
    }

    /// Parses an SSZ bitlist payload: the highest set bit of the final byte
    /// delimits the length and is not part of the value.
    pub(crate) fn from_delimited_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let last = match bytes.last() {
            Some(last) if *last != 0 => *last,
            _ => {
                return Err(Error::new(ErrorKind::InvalidBitlist(
                    "missing length delimiter",
                )))
            }
        };

        let len = bytes.len() * 8 - 1 - last.leading_zeros() as usize;

        let mut stripped: SmallVec<[u8; SMALLVEC_LEN]> = SmallVec::from_slice(bytes);
        stripped[len / 8] &= !(1 << (len % 8));
        stripped.truncate(bytes_for_bit_len(len));

        Self::from_raw_bytes_unchecked_marker(stripped, len)
    }
}

impl<N: Unsigned> Bitfield<Fixed<N>> {
    /// Instantiate with all bits zero and the declared length.
    pub fn new() -> Self {
        Self::with_len(N::to_usize())
    }

    /// The declared length under the default preset.
    pub fn capacity() -> usize {
        N::to_usize()
    }
}

impl<N: Unsigned> Default for Bitfield<Fixed<N>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Unsigned> Default for Bitfield<Variable<N>> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: BitfieldBehaviour> Bitfield<T> {
    /// Instantiate a bitfield of `num_bits` zero bits, ignoring the declared
    /// length. Intended for spec-parameterized lengths; the codec validates
    /// the effective length when the value is serialized.
    pub fn with_len(num_bits: usize) -> Self {
        Self {
            bytes: smallvec![0; bytes_for_bit_len(num_bits)],
            len: num_bits,
            _phantom: PhantomData,
        }
    }

    /// Sets bit `i` to `value`, failing if `i` is out of bounds.
    pub fn set(&mut self, i: usize, value: bool) -> Result<(), OutOfBoundsError> {
        if i >= self.len {
            return Err(OutOfBoundsError { i, len: self.len });
        }
        if value {
            self.bytes[i / 8] |= 1 << (i % 8);
        } else {
            self.bytes[i / 8] &= !(1 << (i % 8));
        }
        Ok(())
    }

    /// Reads bit `i`, failing if `i` is out of bounds.
    pub fn get(&self, i: usize) -> Result<bool, OutOfBoundsError> {
        if i >= self.len {
            return Err(OutOfBoundsError { i, len: self.len });
        }
        Ok(self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    /// The number of bits in the bitfield.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when no bit is set.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    /// The number of set bits.
    pub fn num_set_bits(&self) -> usize {
        self.bytes
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }

    /// The raw little-endian bytes, without any length delimiter.
    pub fn as_raw_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Iterate over the bits, lowest index first.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    /// Builds a bitfield of `bit_len` bits from raw little-endian bytes.
    ///
    /// `bytes` must be exactly `⌈bit_len / 8⌉` bytes with every bit at or
    /// above `bit_len` zero.
    pub fn from_raw_bytes(bytes: &[u8], bit_len: usize) -> Result<Self, Error> {
        let expected = bytes_for_bit_len(bit_len);
        if bytes.len() != expected {
            return Err(Error::size_mismatch(expected, bytes.len()));
        }
        Self::from_raw_bytes_unchecked_marker(SmallVec::from_slice(bytes), bit_len)
    }

    fn from_raw_bytes_unchecked_marker(
        bytes: SmallVec<[u8; SMALLVEC_LEN]>,
        bit_len: usize,
    ) -> Result<Self, Error> {
        if bit_len % 8 != 0 {
            if let Some(last) = bytes.last() {
                if *last >> (bit_len % 8) != 0 {
                    return Err(Error::new(ErrorKind::InvalidBitlist(
                        "non-zero padding bits",
                    )));
                }
            }
        }
        Ok(Self {
            bytes,
            len: bit_len,
            _phantom: PhantomData,
        })
    }
}

impl<N: Unsigned> Encode for Bitfield<Variable<N>> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_bytes_len(&self) -> usize {
        bytes_for_bit_len(self.len + 1)
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_delimited_bytes());
    }
}

impl<N: Unsigned + 'static> DynEncode for Bitfield<Variable<N>> {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::bit_list(N::to_u64()))
    }

    fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
        Ok(bytes_for_bit_len(self.len + 1))
    }

    fn dyn_ssz_append(
        &self,
        _ssz: &DynSsz,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let (cap, _) = split_hints(hints);
        let max = cap.map(|hint| hint.value).unwrap_or(N::to_u64());
        if max != UNBOUNDED {
            let max = usize::try_from(max).unwrap_or(usize::max_value());
            if self.len > max {
                return Err(Error::size_mismatch(max, self.len));
            }
        }
        self.ssz_append(buf);
        Ok(())
    }
}

impl<N: Unsigned> Decode for Bitfield<Variable<N>> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bitfield = Self::from_delimited_bytes(bytes)?;
        if bitfield.len() > N::to_usize() {
            return Err(Error::list_overflow(bitfield.len(), N::to_usize()));
        }
        Ok(bitfield)
    }
}

impl<N: Unsigned + 'static> DynDecode for Bitfield<Variable<N>> {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::bit_list(N::to_u64()))
    }

    fn dyn_from_ssz_bytes(_ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        let (cap, _) = split_hints(hints);
        let max = cap.map(|hint| hint.value).unwrap_or(N::to_u64());

        let bitfield = Self::from_delimited_bytes(bytes)?;
        if max != UNBOUNDED {
            let max = usize::try_from(max).unwrap_or(usize::max_value());
            if bitfield.len() > max {
                return Err(Error::list_overflow(bitfield.len(), max));
            }
        }
        Ok(bitfield)
    }
}

impl<N: Unsigned> Encode for Bitfield<Fixed<N>> {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        bytes_for_bit_len(N::to_usize())
    }

    fn ssz_bytes_len(&self) -> usize {
        self.bytes.len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.bytes);
    }
}

impl<N: Unsigned + 'static> DynEncode for Bitfield<Fixed<N>> {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::bit_vector(N::to_u64()))
    }

    fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, hints: &[SizeHint]) -> Result<usize, Error> {
        let (length, _) = split_hints(hints);
        let declared = length
            .map(|hint| usize::try_from(hint.value).map_err(|_| Error::overflow()))
            .unwrap_or(Ok(N::to_usize()))?;
        Ok(bytes_for_bit_len(declared))
    }

    fn dyn_ssz_append(
        &self,
        _ssz: &DynSsz,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let (length, _) = split_hints(hints);
        let declared = length
            .map(|hint| usize::try_from(hint.value).map_err(|_| Error::overflow()))
            .unwrap_or(Ok(N::to_usize()))?;
        if self.len != declared {
            return Err(Error::size_mismatch(declared, self.len));
        }
        self.ssz_append(buf);
        Ok(())
    }
}

impl<N: Unsigned> Decode for Bitfield<Fixed<N>> {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        bytes_for_bit_len(N::to_usize())
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_raw_bytes(bytes, N::to_usize())
    }
}

impl<N: Unsigned + 'static> DynDecode for Bitfield<Fixed<N>> {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::bit_vector(N::to_u64()))
    }

    fn dyn_from_ssz_bytes(_ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error> {
        let (length, _) = split_hints(hints);
        let declared = length
            .map(|hint| usize::try_from(hint.value).map_err(|_| Error::overflow()))
            .unwrap_or(Ok(N::to_usize()))?;
        Self::from_raw_bytes(bytes, declared)
    }
}

impl<N: Unsigned> Serialize for Bitfield<Variable<N>> {
    /// Serde serialization is compliant with the Ethereum YAML test format.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.as_ssz_bytes()))
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for Bitfield<Variable<N>> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = deserializer.deserialize_str(hex::PrefixedHexVisitor)?;
        Self::from_ssz_bytes(&bytes)
            .map_err(|e| serde::de::Error::custom(format!("invalid bitlist: {:?}", e)))
    }
}

impl<N: Unsigned> Serialize for Bitfield<Fixed<N>> {
    /// Serde serialization is compliant with the Ethereum YAML test format.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.as_ssz_bytes()))
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for Bitfield<Fixed<N>> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = deserializer.deserialize_str(hex::PrefixedHexVisitor)?;
        Self::from_ssz_bytes(&bytes)
            .map_err(|e| serde::de::Error::custom(format!("invalid bitvector: {:?}", e)))
    }
}
