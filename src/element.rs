//! Element types that can be stored in a cube.

use std::fmt::Debug;

/// Trait implemented by the primitive types which cubes can hold.
///
/// Each element type defines a null value, used to fill new dense storage
/// and returned for entries that are absent in sparse and ragged storage. It
/// also defines a 64-bit encoding, used by sparse storage, and a fixed-width
/// native-endian byte encoding, used by memory-mapped storage.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Value of missing entries. NaN for floats, zero for integers and
    /// `false` for booleans.
    const NULL: Self;

    /// Size of the element in bytes when stored in a file.
    const WIDTH: usize;

    /// Short type name used in diagnostics.
    const NAME: &'static str;

    /// Encode the value as a 64-bit pattern.
    fn to_bits(self) -> u64;

    /// Decode a value produced by [`to_bits`](Element::to_bits).
    fn from_bits(bits: u64) -> Self;

    /// Write the native-endian representation into `dst`, which must be
    /// [`WIDTH`](Element::WIDTH) bytes long.
    fn write_ne(self, dst: &mut [u8]);

    /// Read a value from its native-endian representation.
    fn read_ne(src: &[u8]) -> Self;

    /// Return true if `self` and `other` are the same value. Unlike `==`
    /// this treats all NaNs as equal.
    fn same_as(self, other: Self) -> bool {
        self == other
    }
}

macro_rules! impl_float_element {
    ($type:ty, $bits:ty, $name:literal) => {
        impl Element for $type {
            const NULL: Self = <$type>::NAN;
            const WIDTH: usize = std::mem::size_of::<$type>();
            const NAME: &'static str = $name;

            #[inline]
            fn to_bits(self) -> u64 {
                <$type>::to_bits(self) as u64
            }

            #[inline]
            fn from_bits(bits: u64) -> Self {
                <$type>::from_bits(bits as $bits)
            }

            #[inline]
            fn write_ne(self, dst: &mut [u8]) {
                dst.copy_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn read_ne(src: &[u8]) -> Self {
                let mut bytes = [0; std::mem::size_of::<$type>()];
                bytes.copy_from_slice(src);
                <$type>::from_ne_bytes(bytes)
            }

            #[inline]
            fn same_as(self, other: Self) -> bool {
                self == other || (self.is_nan() && other.is_nan())
            }
        }
    };
}

macro_rules! impl_int_element {
    ($type:ty, $name:literal) => {
        impl Element for $type {
            const NULL: Self = 0;
            const WIDTH: usize = std::mem::size_of::<$type>();
            const NAME: &'static str = $name;

            #[inline]
            fn to_bits(self) -> u64 {
                self as u64
            }

            #[inline]
            fn from_bits(bits: u64) -> Self {
                bits as $type
            }

            #[inline]
            fn write_ne(self, dst: &mut [u8]) {
                dst.copy_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn read_ne(src: &[u8]) -> Self {
                let mut bytes = [0; std::mem::size_of::<$type>()];
                bytes.copy_from_slice(src);
                <$type>::from_ne_bytes(bytes)
            }
        }
    };
}

impl_float_element!(f64, u64, "f64");
impl_float_element!(f32, u32, "f32");
impl_int_element!(i64, "i64");
impl_int_element!(i32, "i32");

impl Element for bool {
    const NULL: Self = false;
    const WIDTH: usize = 1;
    const NAME: &'static str = "bool";

    #[inline]
    fn to_bits(self) -> u64 {
        self as u64
    }

    #[inline]
    fn from_bits(bits: u64) -> Self {
        bits != 0
    }

    #[inline]
    fn write_ne(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }

    #[inline]
    fn read_ne(src: &[u8]) -> Self {
        src[0] != 0
    }
}

/// Conversion between element types, used by casting views.
///
/// Conversions follow C-like cast rules: float to integer truncates towards
/// zero and saturates, with NaN becoming zero. Numbers convert to booleans
/// as `value != 0`, so NaN is `true`. Booleans convert to 1 or 0.
pub trait CastFrom<U>: Sized {
    fn cast_from(value: U) -> Self;
}

macro_rules! impl_numeric_casts {
    (@from $to:ty; $($from:ty),*) => {
        $(
            impl CastFrom<$from> for $to {
                #[inline]
                fn cast_from(value: $from) -> Self {
                    value as $to
                }
            }
        )*
    };
    ($($to:ty),*) => {
        $(
            impl_numeric_casts!(@from $to; f64, f32, i64, i32);

            impl CastFrom<bool> for $to {
                #[inline]
                fn cast_from(value: bool) -> Self {
                    value as u8 as $to
                }
            }

            impl CastFrom<$to> for bool {
                #[inline]
                #[allow(clippy::float_cmp)]
                fn cast_from(value: $to) -> Self {
                    value != (0 as $to)
                }
            }
        )*
    };
}

impl_numeric_casts!(f64, f32, i64, i32);

impl CastFrom<bool> for bool {
    #[inline]
    fn cast_from(value: bool) -> Self {
        value
    }
}
