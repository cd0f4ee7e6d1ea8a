use crate::descriptor::{effective_fixed_len, SizeHint, TypeDescriptor};
use crate::error::Error;
use crate::{DynSsz, BYTES_PER_LENGTH_OFFSET, MAX_LENGTH_VALUE};

pub mod impls;

/// Provides SSZ encoding under the type's declared (static) sizes.
///
/// This is the fast-path codec: it never consults the spec registry, so it is
/// only invoked through the dispatcher for types with no spec override in
/// force.
pub trait Encode {
    /// Returns `true` if this object has a fixed-length.
    ///
    /// I.e., there are no variable length items in this object or any of its
    /// contained objects.
    fn is_ssz_fixed_len() -> bool;

    /// The number of bytes this object occupies in the fixed-length portion
    /// of the SSZ bytes.
    ///
    /// By default, this is set to `BYTES_PER_LENGTH_OFFSET` which is suitable
    /// for variable length objects, but not fixed-length objects.
    /// Fixed-length objects _must_ return a value which represents their
    /// length.
    fn ssz_fixed_len() -> usize {
        BYTES_PER_LENGTH_OFFSET
    }

    /// The number of bytes this object occupies once serialized, including
    /// both fixed and variable parts.
    fn ssz_bytes_len(&self) -> usize;

    /// Appends the encoding of `self` to `buf`.
    fn ssz_append(&self, buf: &mut Vec<u8>);

    /// Returns the full SSZ encoding of `self`.
    fn as_ssz_bytes(&self) -> Vec<u8> {
        let mut buf = vec![];

        self.ssz_append(&mut buf);

        buf
    }
}

/// Provides SSZ encoding with sizes resolved through a [`DynSsz`] instance.
///
/// `hints` carries the size overrides in force for successive collection
/// dimensions of `self`, outermost first; an empty slice means every
/// dimension keeps its declared default. Implementations recurse through
/// [`DynSsz::append_item`] so the fast-path dispatcher is consulted at every
/// type boundary.
pub trait DynEncode: Encode {
    /// The type's structure, used by the descriptor cache. Built once per
    /// `DynSsz` instance and memoized.
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error>;

    /// The number of bytes `self` occupies under the sizes in force.
    fn dyn_ssz_bytes_len(&self, ssz: &DynSsz, hints: &[SizeHint]) -> Result<usize, Error>;

    /// Appends the encoding of `self` to `buf` under the sizes in force.
    fn dyn_ssz_append(
        &self,
        ssz: &DynSsz,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error>;
}

/// Encodes `len` as a little-endian offset/length prefix.
pub fn encode_length(len: usize) -> [u8; BYTES_PER_LENGTH_OFFSET] {
    debug_assert!(len <= MAX_LENGTH_VALUE);
    (len as u32).to_le_bytes()
}

/// Writes a variable container or sequence: fixed parts (or offsets) first,
/// variable payloads appended afterwards with each offset back-patched to the
/// payload's position.
///
/// The number of fixed bytes must be declared up front so offsets can be
/// written as their items are appended.
pub struct SszEncoder<'a> {
    offset: usize,
    buf: &'a mut Vec<u8>,
    variable_bytes: Vec<u8>,
}

impl<'a> SszEncoder<'a> {
    /// Instantiate a new encoder for encoding a value with the given
    /// `num_fixed_bytes`.
    pub fn container(buf: &'a mut Vec<u8>, num_fixed_bytes: usize) -> Self {
        buf.reserve(num_fixed_bytes);

        Self {
            offset: num_fixed_bytes,
            buf,
            variable_bytes: vec![],
        }
    }

    /// Append some `item` to the SSZ bytes.
    pub fn append<T: Encode>(&mut self, item: &T) {
        self.append_parameterized(T::is_ssz_fixed_len(), |buf| item.ssz_append(buf))
    }

    /// Uses `ssz_append` to append the encoding of some item to the SSZ
    /// bytes.
    pub fn append_parameterized<F>(&mut self, is_ssz_fixed_len: bool, ssz_append: F)
    where
        F: FnOnce(&mut Vec<u8>),
    {
        if is_ssz_fixed_len {
            ssz_append(self.buf);
        } else {
            self.buf
                .extend_from_slice(&encode_length(self.offset + self.variable_bytes.len()));

            ssz_append(&mut self.variable_bytes);
        }
    }

    /// The fallible variant used by the dynamic path: the append closure may
    /// fail, and offsets that would exceed the four-byte bound are rejected
    /// instead of silently truncated.
    pub fn try_append_parameterized<F>(&mut self, is_fixed_len: bool, ssz_append: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), Error>,
    {
        if is_fixed_len {
            ssz_append(self.buf)
        } else {
            let offset = self
                .offset
                .checked_add(self.variable_bytes.len())
                .filter(|offset| *offset <= MAX_LENGTH_VALUE)
                .ok_or_else(Error::overflow)?;
            self.buf.extend_from_slice(&encode_length(offset));

            ssz_append(&mut self.variable_bytes)
        }
    }

    /// Write the variable bytes to `self.bytes`.
    ///
    /// This method must be called after the final `append(..)` call when the
    /// final variable item has been added.
    pub fn finalize(&mut self) -> &mut Vec<u8> {
        self.buf.append(&mut self.variable_bytes);

        self.buf
    }
}

/// Compute the encoded length of a sequence of `T` under the element hints in
/// force.
pub(crate) fn dyn_sequence_len<T: DynEncode + 'static>(
    items: &[T],
    ssz: &DynSsz,
    elem_hints: &[SizeHint],
) -> Result<usize, Error> {
    let elem_desc = ssz.encode_descriptor::<T>()?;
    if let Some(elem_len) = effective_fixed_len(&elem_desc, elem_hints)? {
        elem_len.checked_mul(items.len()).ok_or_else(Error::overflow)
    } else {
        let mut len = items
            .len()
            .checked_mul(BYTES_PER_LENGTH_OFFSET)
            .ok_or_else(Error::overflow)?;
        for (i, item) in items.iter().enumerate() {
            let item_len = ssz
                .item_len(item, elem_hints)
                .map_err(|e| e.with_index(i))?;
            len = len.checked_add(item_len).ok_or_else(Error::overflow)?;
        }
        Ok(len)
    }
}

/// Encode a sequence of `T` under the element hints in force: fixed elements
/// are concatenated, variable elements go through an offset table.
pub(crate) fn dyn_sequence_append<T: DynEncode + 'static>(
    items: &[T],
    ssz: &DynSsz,
    elem_hints: &[SizeHint],
    buf: &mut Vec<u8>,
) -> Result<(), Error> {
    let elem_desc = ssz.encode_descriptor::<T>()?;
    if let Some(elem_len) = effective_fixed_len(&elem_desc, elem_hints)? {
        buf.reserve(elem_len.saturating_mul(items.len()));

        for (i, item) in items.iter().enumerate() {
            ssz.append_item(item, elem_hints, buf)
                .map_err(|e| e.with_index(i))?;
        }
    } else {
        let mut encoder = SszEncoder::container(buf, items.len() * BYTES_PER_LENGTH_OFFSET);

        for (i, item) in items.iter().enumerate() {
            encoder
                .try_append_parameterized(false, |buf| ssz.append_item(item, elem_hints, buf))
                .map_err(|e| e.with_index(i))?;
        }

        encoder.finalize();
    }
    Ok(())
}
