pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
    )+ }
}

impl_num_le!(u8, i8, u16, i16, u32, i32, u64, i64);

impl<T: WriteBytesLe, const N: usize> WriteBytesLe for [T; N] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

impl<T: WriteBytesLe> WriteBytesLe for [T] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

#[macro_export]
macro_rules! join_bytes_le {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::byteorder::WriteBytesLe::write_le(&$value, &mut vec); )+
        vec
    }};
}

#[cfg(test)]
mod tests {
    use crate::byteorder::WriteBytesLe;
    use mp3chunkd_macros::ToBytes;

    #[derive(ToBytes)]
    struct Mini {
        a: u16,
        b: u32,
        guid: [u8; 4],
    }

    #[test]
    fn derived_fields_in_order() {
        let s = Mini {
            a: 0x1234,
            b: 0xABCDEF01,
            guid: *b"TEST",
        };

        let mut vec = Vec::new();
        s.write_le(&mut vec);

        let expected = [0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB, b'T', b'E', b'S', b'T'];
        assert_eq!(&vec[..], &expected);
    }

    #[test]
    fn join_mixed_widths() {
        let samples: &[i16] = &[-1, 2];
        let bytes = crate::join_bytes_le!(7u8, 0x0102u16, *samples);
        assert_eq!(bytes, [7, 0x02, 0x01, 0xFF, 0xFF, 0x02, 0x00]);
    }
}
