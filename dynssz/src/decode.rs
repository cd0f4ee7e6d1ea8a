use crate::descriptor::{effective_fixed_len, SizeHint, TypeDescriptor};
use crate::error::{Error, ErrorKind};
use crate::{DynSsz, BYTES_PER_LENGTH_OFFSET, MAX_UNION_SELECTOR};
use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;
use std::convert::TryFrom;

type SmallVec8<T> = SmallVec<[T; 8]>;

pub mod impls;

/// Provides SSZ decoding under the type's declared (static) sizes.
///
/// This is the fast-path codec; the dispatcher only routes here when no spec
/// override is in force for the type.
pub trait Decode: Sized {
    /// Returns `true` if this object has a fixed-length.
    ///
    /// I.e., there are no variable length items in this object or any of its
    /// contained objects.
    fn is_ssz_fixed_len() -> bool;

    /// The number of bytes this object occupies in the fixed-length portion
    /// of the SSZ bytes.
    fn ssz_fixed_len() -> usize {
        BYTES_PER_LENGTH_OFFSET
    }

    /// Attempts to decode `Self` from `bytes`, returning an `Error` on
    /// failure.
    ///
    /// The supplied bytes must be the exact length required to decode `Self`;
    /// excess bytes result in an error.
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, Error>;
}

/// Provides SSZ decoding with sizes resolved through a [`DynSsz`] instance.
///
/// `hints` carries the size overrides in force for successive collection
/// dimensions, outermost first. Implementations recurse through
/// [`DynSsz::decode_item`] so the fast-path dispatcher is consulted at every
/// type boundary.
pub trait DynDecode: Decode {
    /// The type's structure, used by the descriptor cache.
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error>;

    /// Attempts to decode `Self` from `bytes` under the sizes in force.
    fn dyn_from_ssz_bytes(ssz: &DynSsz, hints: &[SizeHint], bytes: &[u8]) -> Result<Self, Error>;
}

/// A valid union selector (`0..=127`; higher values are reserved for
/// backwards compatible extensions).
#[derive(Copy, Clone)]
pub struct UnionSelector(u8);

impl From<UnionSelector> for u8 {
    fn from(union_selector: UnionSelector) -> u8 {
        union_selector.0
    }
}

impl UnionSelector {
    pub fn new(selector: u8) -> Result<Self, Error> {
        Some(selector)
            .filter(|_| selector <= MAX_UNION_SELECTOR)
            .map(Self)
            .ok_or_else(|| Error::new(ErrorKind::InvalidUnionSelector(selector)))
    }
}

/// Takes `bytes`, assuming it is the encoding of a union, and returns the
/// selector and the body (trailing bytes).
pub fn split_union_bytes(bytes: &[u8]) -> Result<(UnionSelector, &[u8]), Error> {
    let selector = bytes
        .first()
        .copied()
        .ok_or_else(|| Error::size_mismatch(1, 0))
        .and_then(UnionSelector::new)?;
    let body = &bytes[1..];
    Ok((selector, body))
}

/// Reads a `BYTES_PER_LENGTH_OFFSET`-byte offset from the front of `bytes`.
pub fn read_offset(bytes: &[u8]) -> Result<usize, Error> {
    let prefix = bytes
        .get(0..BYTES_PER_LENGTH_OFFSET)
        .ok_or_else(|| Error::size_mismatch(BYTES_PER_LENGTH_OFFSET, bytes.len()))?;

    let mut array = [0; BYTES_PER_LENGTH_OFFSET];
    array.copy_from_slice(prefix);

    Ok(u32::from_le_bytes(array) as usize)
}

/// Performs the offset validity checks on `offset`.
///
/// - `previous_offset`: unless this is the first offset in the object, the
///   previously-read offset, used to reject decreasing offsets.
/// - `num_bytes`: the total number of bytes in the object, used to reject
///   out-of-bounds offsets.
/// - `num_fixed_bytes`: the length of the fixed portion if known, used to
///   reject a first offset that points into the fixed portion or skips
///   variable bytes.
pub fn sanitize_offset(
    offset: usize,
    previous_offset: Option<usize>,
    num_bytes: usize,
    num_fixed_bytes: Option<usize>,
) -> Result<usize, Error> {
    if num_fixed_bytes.map_or(false, |fixed_bytes| offset < fixed_bytes) {
        // Points into the fixed portion, double-decoding those bytes.
        Err(Error::invalid_offset(offset))
    } else if previous_offset.is_none()
        && num_fixed_bytes.map_or(false, |fixed_bytes| offset != fixed_bytes)
    {
        // The first offset must point at the byte immediately after the fixed
        // portion.
        Err(Error::invalid_offset(offset))
    } else if offset > num_bytes {
        Err(Error::invalid_offset(offset))
    } else if previous_offset.map_or(false, |prev| prev > offset) {
        Err(Error::invalid_offset(offset))
    } else {
        Ok(offset)
    }
}

#[derive(Copy, Clone, Debug)]
struct Offset {
    position: usize,
    offset: usize,
}

/// Builds an [`SszDecoder`].
///
/// The builder splits the bytes of a variable container into one slice per
/// registered item, validating the offset table as it goes. Each item records
/// the position of its slice within the input so decode errors can report an
/// absolute byte offset.
pub struct SszDecoderBuilder<'a> {
    bytes: &'a [u8],
    items: SmallVec8<(&'a [u8], usize)>,
    offsets: SmallVec8<Offset>,
    items_index: usize,
}

impl<'a> SszDecoderBuilder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            items: smallvec![],
            offsets: smallvec![],
            items_index: 0,
        }
    }

    /// Declares that a type decoded via the static codec is the next item in
    /// `bytes`.
    pub fn register_type<T: Decode>(&mut self) -> Result<(), Error> {
        let fixed_len = if T::is_ssz_fixed_len() {
            Some(T::ssz_fixed_len())
        } else {
            None
        };
        self.register_parameterized(fixed_len)
    }

    /// Declares the next item in `bytes`: `Some(len)` for a fixed-length item
    /// occupying `len` bytes of the fixed portion, `None` for a
    /// variable-length item represented there by an offset.
    pub fn register_parameterized(&mut self, fixed_len: Option<usize>) -> Result<(), Error> {
        match fixed_len {
            Some(fixed_len) => {
                let start = self.items_index;
                self.items_index += fixed_len;

                let slice = self.bytes.get(start..self.items_index).ok_or_else(|| {
                    Error::size_mismatch(self.items_index, self.bytes.len()).at_offset(start)
                })?;

                self.items.push((slice, start));
            }
            None => {
                let offset = read_offset(&self.bytes[self.items_index..])
                    .map_err(|e| e.at_offset(self.items_index))?;
                self.offsets.push(Offset {
                    position: self.items.len(),
                    offset: sanitize_offset(
                        offset,
                        self.offsets.last().map(|o| o.offset),
                        self.bytes.len(),
                        None,
                    )
                    .map_err(|e| e.at_offset(self.items_index))?,
                });

                // Placeholder; replaced during finalization.
                self.items.push((&[], 0));

                self.items_index += BYTES_PER_LENGTH_OFFSET;
            }
        }

        Ok(())
    }

    fn finalize(&mut self) -> Result<(), Error> {
        if let Some(first_offset) = self.offsets.first().map(|o| o.offset) {
            // The first offset must point at the byte immediately following
            // the fixed-length bytes.
            match first_offset.cmp(&self.items_index) {
                Ordering::Less | Ordering::Greater => {
                    return Err(Error::invalid_offset(first_offset))
                }
                Ordering::Equal => (),
            }

            // Grab the slice between each pair of offsets.
            for pair in self.offsets.windows(2) {
                let a = pair[0];
                let b = pair[1];

                self.items[a.position] = (&self.bytes[a.offset..b.offset], a.offset);
            }

            // The last offset's slice runs to the end of the input.
            if let Some(last) = self.offsets.last() {
                self.items[last.position] = (&self.bytes[last.offset..], last.offset);
            }
        } else {
            // A fixed-length container must consume its input exactly.
            if self.items_index != self.bytes.len() {
                return Err(Error::size_mismatch(self.items_index, self.bytes.len()));
            }
        }

        Ok(())
    }

    /// Finalizes the builder, returning an `SszDecoder` that may be used to
    /// instantiate objects.
    pub fn build(mut self) -> Result<SszDecoder<'a>, Error> {
        self.finalize()?;

        Ok(SszDecoder { items: self.items })
    }
}

/// Decodes the slices produced by an [`SszDecoderBuilder`] into object
/// instances.
pub struct SszDecoder<'a> {
    items: SmallVec8<(&'a [u8], usize)>,
}

impl<'a> SszDecoder<'a> {
    /// Decodes the next item via the static codec.
    ///
    /// # Panics
    ///
    /// Panics when attempting to decode more items than were registered.
    pub fn decode_next<T: Decode>(&mut self) -> Result<T, Error> {
        self.decode_next_with(|slice, start| T::from_ssz_bytes(slice).map_err(|e| e.at_offset(start)))
    }

    /// Decodes the next item using the provided function, which receives the
    /// item's slice and the slice's byte position within the input.
    pub fn decode_next_with<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&'a [u8], usize) -> Result<T, Error>,
    {
        let (slice, start) = self.items.remove(0);
        f(slice, start)
    }
}

/// Decode a sequence whose elements are fixed-length under the hints in
/// force, enforcing that `bytes` divides evenly into elements.
pub(crate) fn dyn_decode_fixed_elems<T: DynDecode + 'static>(
    ssz: &DynSsz,
    elem_hints: &[SizeHint],
    bytes: &[u8],
    elem_len: usize,
) -> Result<Vec<T>, Error> {
    if bytes.is_empty() {
        return Ok(vec![]);
    }
    if elem_len == 0 {
        return Err(Error::new(ErrorKind::UnsupportedType(
            "sequences of zero-length elements",
        )));
    }
    if bytes.len() % elem_len != 0 {
        // A ragged tail cannot be part of the sequence.
        return Err(Error::new(ErrorKind::ExtraData {
            len: bytes.len(),
            expected: bytes.len() / elem_len * elem_len,
        }));
    }

    let count = bytes.len() / elem_len;
    let mut values = Vec::with_capacity(count);
    for (i, chunk) in bytes.chunks(elem_len).enumerate() {
        let value = ssz
            .decode_item::<T>(elem_hints, chunk)
            .map_err(|e| e.with_index(i).at_offset(i * elem_len))?;
        values.push(value);
    }
    Ok(values)
}

/// Decode a sequence of variable-length elements from its offset table.
pub(crate) fn dyn_decode_variable_elems<T: DynDecode + 'static>(
    ssz: &DynSsz,
    elem_hints: &[SizeHint],
    bytes: &[u8],
) -> Result<Vec<T>, Error> {
    if bytes.is_empty() {
        return Ok(vec![]);
    }

    let first_offset = read_offset(bytes)?;
    sanitize_offset(first_offset, None, bytes.len(), Some(first_offset))?;

    if first_offset == 0 || first_offset % BYTES_PER_LENGTH_OFFSET != 0 {
        return Err(Error::invalid_offset(first_offset));
    }
    let count = first_offset / BYTES_PER_LENGTH_OFFSET;

    let mut values = Vec::with_capacity(count);
    let mut offset = first_offset;
    for i in 0..count {
        let slice_start = offset;
        let next_offset = if i + 1 == count {
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
        let value = ssz
            .decode_item::<T>(elem_hints, slice)
            .map_err(|e| e.with_index(i).at_offset(slice_start))?;
        values.push(value);
    }
    Ok(values)
}

/// Enforce a list's declared maximum length on a decoded element count.
pub(crate) fn check_list_cap(len: usize, max: u64) -> Result<(), Error> {
    let max_len = usize::try_from(max).unwrap_or(usize::max_value());
    if len > max_len {
        Err(Error::list_overflow(len, max_len))
    } else {
        Ok(())
    }
}

/// The effective fixed length of the element type under the hints in force,
/// or `None` when elements are variable-length.
pub(crate) fn dyn_elem_fixed_len<T: DynDecode + 'static>(
    ssz: &DynSsz,
    elem_hints: &[SizeHint],
) -> Result<Option<usize>, Error> {
    let elem_desc = ssz.decode_descriptor::<T>()?;
    effective_fixed_len(&elem_desc, elem_hints)
}
