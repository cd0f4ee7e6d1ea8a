use super::*;
use crate::descriptor::split_hints;
use ethereum_types::{H256, U128, U256};
use std::convert::TryFrom;
use std::sync::Arc;

macro_rules! impl_encodable_for_uint {
    ($type: ident, $bit_size: expr) => {
        impl Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $bit_size / 8
            }

            fn ssz_bytes_len(&self) -> usize {
                $bit_size / 8
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
        }

        impl DynEncode for $type {
            fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
                Ok(TypeDescriptor::uint($bit_size))
            }

            fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
                Ok($bit_size / 8)
            }

            fn dyn_ssz_append(
                &self,
                _ssz: &DynSsz,
                _hints: &[SizeHint],
                buf: &mut Vec<u8>,
            ) -> Result<(), Error> {
                self.ssz_append(buf);
                Ok(())
            }
        }
    };
}

impl_encodable_for_uint!(u8, 8);
impl_encodable_for_uint!(u16, 16);
impl_encodable_for_uint!(u32, 32);
impl_encodable_for_uint!(u64, 64);
impl_encodable_for_uint!(u128, 128);

impl Encode for bool {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }

    fn ssz_bytes_len(&self) -> usize {
        1
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8);
    }
}

impl DynEncode for bool {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::bool_type())
    }

    fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
        Ok(1)
    }

    fn dyn_ssz_append(
        &self,
        _ssz: &DynSsz,
        _hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        self.ssz_append(buf);
        Ok(())
    }
}

macro_rules! impl_encodable_for_u256 {
    ($type: ident, $byte_size: expr) => {
        impl Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $byte_size
            }

            fn ssz_bytes_len(&self) -> usize {
                $byte_size
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                let n = <Self as Encode>::ssz_fixed_len();
                let s = buf.len();

                buf.resize(s + n, 0);
                self.to_little_endian(&mut buf[s..]);
            }
        }

        impl DynEncode for $type {
            fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
                Ok(TypeDescriptor::uint($byte_size * 8))
            }

            fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
                Ok($byte_size)
            }

            fn dyn_ssz_append(
                &self,
                _ssz: &DynSsz,
                _hints: &[SizeHint],
                buf: &mut Vec<u8>,
            ) -> Result<(), Error> {
                self.ssz_append(buf);
                Ok(())
            }
        }
    };
}

impl_encodable_for_u256!(U128, 16);
impl_encodable_for_u256!(U256, 32);

impl Encode for H256 {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        32
    }

    fn ssz_bytes_len(&self) -> usize {
        32
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl DynEncode for H256 {
    fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok(TypeDescriptor::byte_vector(32))
    }

    fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
        Ok(32)
    }

    fn dyn_ssz_append(
        &self,
        _ssz: &DynSsz,
        _hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        self.ssz_append(buf);
        Ok(())
    }
}

macro_rules! impl_encodable_for_u8_array {
    ($len: expr) => {
        impl Encode for [u8; $len] {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $len
            }

            fn ssz_bytes_len(&self) -> usize {
                $len
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self[..]);
            }
        }

        impl DynEncode for [u8; $len] {
            fn ssz_type_def(_ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
                Ok(TypeDescriptor::byte_vector($len))
            }

            fn dyn_ssz_bytes_len(&self, _ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
                Ok($len)
            }

            fn dyn_ssz_append(
                &self,
                _ssz: &DynSsz,
                _hints: &[SizeHint],
                buf: &mut Vec<u8>,
            ) -> Result<(), Error> {
                self.ssz_append(buf);
                Ok(())
            }
        }
    };
}

impl_encodable_for_u8_array!(4);
impl_encodable_for_u8_array!(32);
impl_encodable_for_u8_array!(48);
impl_encodable_for_u8_array!(96);

/// Compute the encoded length of a slice of `T` under the static sizes.
pub fn sequence_ssz_bytes_len<T: Encode>(items: &[T]) -> usize {
    if <T as Encode>::is_ssz_fixed_len() {
        <T as Encode>::ssz_fixed_len() * items.len()
    } else {
        items
            .iter()
            .map(|item| BYTES_PER_LENGTH_OFFSET + item.ssz_bytes_len())
            .sum()
    }
}

/// Encode a slice of `T` under the static sizes.
pub fn sequence_ssz_append<T: Encode>(items: &[T], buf: &mut Vec<u8>) {
    if T::is_ssz_fixed_len() {
        buf.reserve(T::ssz_fixed_len() * items.len());

        for item in items {
            item.ssz_append(buf);
        }
    } else {
        let mut encoder = SszEncoder::container(buf, items.len() * BYTES_PER_LENGTH_OFFSET);

        for item in items {
            encoder.append(item);
        }

        encoder.finalize();
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_bytes_len(&self) -> usize {
        sequence_ssz_bytes_len(self)
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        sequence_ssz_append(self, buf)
    }
}

impl<T: DynEncode + 'static> DynEncode for Vec<T> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let elem = ssz.encode_descriptor::<T>()?;
        Ok(TypeDescriptor::list(elem, None))
    }

    fn dyn_ssz_bytes_len(&self, ssz: &DynSsz, hints: &[SizeHint]) -> Result<usize, Error> {
        let (_, elem_hints) = split_hints(hints);
        dyn_sequence_len(self, ssz, elem_hints)
    }

    fn dyn_ssz_append(
        &self,
        ssz: &DynSsz,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let (cap, elem_hints) = split_hints(hints);
        if let Some(cap) = cap {
            let max = usize::try_from(cap.value).unwrap_or(usize::max_value());
            if self.len() > max {
                return Err(Error::size_mismatch(max, self.len()));
            }
        }
        dyn_sequence_append(self, ssz, elem_hints, buf)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_bytes_len(&self) -> usize {
        match self {
            None => 1,
            Some(inner) => inner
                .ssz_bytes_len()
                .checked_add(1)
                .expect("encoded length must be less than usize::max_value"),
        }
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        match self {
            None => buf.push(0u8),
            Some(inner) => {
                buf.push(1u8);
                inner.ssz_append(buf);
            }
        }
    }
}

impl<T: DynEncode + 'static> DynEncode for Option<T> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        let some = ssz.encode_descriptor::<T>()?;
        Ok(TypeDescriptor::union(vec![
            crate::descriptor::VariantDescriptor {
                name: "None",
                elem: None,
            },
            crate::descriptor::VariantDescriptor {
                name: "Some",
                elem: Some(some),
            },
        ]))
    }

    fn dyn_ssz_bytes_len(&self, ssz: &DynSsz, _hints: &[SizeHint]) -> Result<usize, Error> {
        match self {
            None => Ok(1),
            Some(inner) => {
                let len = ssz.item_len(inner, &[]).map_err(|e| e.with_field("Some"))?;
                len.checked_add(1).ok_or_else(Error::overflow)
            }
        }
    }

    fn dyn_ssz_append(
        &self,
        ssz: &DynSsz,
        _hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        match self {
            None => {
                buf.push(0u8);
                Ok(())
            }
            Some(inner) => {
                buf.push(1u8);
                ssz.append_item(inner, &[], buf)
                    .map_err(|e| e.with_field("Some"))
            }
        }
    }
}

impl<T: Encode> Encode for Arc<T> {
    fn is_ssz_fixed_len() -> bool {
        T::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        T::ssz_fixed_len()
    }

    fn ssz_bytes_len(&self) -> usize {
        self.as_ref().ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        self.as_ref().ssz_append(buf)
    }
}

impl<T: DynEncode + 'static> DynEncode for Arc<T> {
    fn ssz_type_def(ssz: &DynSsz) -> Result<TypeDescriptor, Error> {
        Ok((*ssz.encode_descriptor::<T>()?).clone())
    }

    fn dyn_ssz_bytes_len(&self, ssz: &DynSsz, hints: &[SizeHint]) -> Result<usize, Error> {
        ssz.item_len(self.as_ref(), hints)
    }

    fn dyn_ssz_append(
        &self,
        ssz: &DynSsz,
        hints: &[SizeHint],
        buf: &mut Vec<u8>,
    ) -> Result<(), Error> {
        ssz.append_item(self.as_ref(), hints, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssz_encode_u8() {
        assert_eq!(0_u8.as_ssz_bytes(), vec![0]);
        assert_eq!(1_u8.as_ssz_bytes(), vec![1]);
        assert_eq!(100_u8.as_ssz_bytes(), vec![100]);
        assert_eq!(255_u8.as_ssz_bytes(), vec![255]);
    }

    #[test]
    fn ssz_encode_u16() {
        assert_eq!(1_u16.as_ssz_bytes(), vec![1, 0]);
        assert_eq!(100_u16.as_ssz_bytes(), vec![100, 0]);
        assert_eq!((1_u16 << 8).as_ssz_bytes(), vec![0, 1]);
        assert_eq!(65535_u16.as_ssz_bytes(), vec![255, 255]);
    }

    #[test]
    fn ssz_encode_u32() {
        assert_eq!(1_u32.as_ssz_bytes(), vec![1, 0, 0, 0]);
        assert_eq!((1_u32 << 16).as_ssz_bytes(), vec![0, 0, 1, 0]);
        assert_eq!((!0_u32).as_ssz_bytes(), vec![255, 255, 255, 255]);
    }

    #[test]
    fn ssz_encode_u128() {
        let mut expected = vec![1];
        expected.resize(16, 0);
        assert_eq!(1_u128.as_ssz_bytes(), expected);
    }

    #[test]
    fn ssz_encode_bool() {
        assert_eq!(true.as_ssz_bytes(), vec![1]);
        assert_eq!(false.as_ssz_bytes(), vec![0]);
    }

    #[test]
    fn ssz_encode_h256() {
        assert_eq!(H256::from([0; 32]).as_ssz_bytes(), vec![0; 32]);
        assert_eq!(H256::from([1; 32]).as_ssz_bytes(), vec![1; 32]);
    }

    #[test]
    fn vec_of_u8() {
        let vec: Vec<u8> = vec![];
        assert_eq!(vec.as_ssz_bytes(), Vec::<u8>::new());

        let vec: Vec<u8> = vec![0, 1, 2, 3];
        assert_eq!(vec.as_ssz_bytes(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn vec_of_vec_of_u8() {
        let vec: Vec<Vec<u8>> = vec![vec![], vec![]];
        assert_eq!(vec.as_ssz_bytes(), vec![8, 0, 0, 0, 8, 0, 0, 0]);

        let vec: Vec<Vec<u8>> = vec![vec![0, 1, 2], vec![11, 22, 33]];
        assert_eq!(
            vec.as_ssz_bytes(),
            vec![8, 0, 0, 0, 11, 0, 0, 0, 0, 1, 2, 11, 22, 33]
        );
    }

    #[test]
    fn ssz_encode_option_u8() {
        let opt: Option<u8> = None;
        assert_eq!(opt.as_ssz_bytes(), vec![0]);
        let opt: Option<u8> = Some(2);
        assert_eq!(opt.as_ssz_bytes(), vec![1, 2]);
    }

    #[test]
    fn ssz_encode_u8_array_4() {
        assert_eq!([0, 0, 0, 0].as_ssz_bytes(), vec![0; 4]);
        assert_eq!([1, 2, 3, 4].as_ssz_bytes(), vec![1, 2, 3, 4]);
    }
}
