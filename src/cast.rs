//! Views which convert elements between types.

use std::marker::PhantomData;

use crate::cube::{Cube, Hypercube};
use crate::dimension::Dimension;
use crate::element::{CastFrom, Element};
use crate::env::trace;
use crate::errors::HypercubeError;
use crate::layout::check_range;

/// Number of elements converted per staging buffer in bulk transfers.
const CAST_CHUNK: usize = 1024;

/// A cube of element type `T` backed by a cube of element type `U`.
///
/// Reads convert from `U` to `T` and writes convert back. The shape and
/// dimensions are those of the inner cube. Missing elements stay missing in
/// nullable transfers.
pub struct CastCube<T: Element, U: Element> {
    inner: Cube<U>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, U> CastCube<T, U>
where
    T: Element + CastFrom<U>,
    U: Element + CastFrom<T>,
{
    pub fn new(inner: Cube<U>) -> Self {
        CastCube {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn inner(&self) -> &Cube<U> {
        &self.inner
    }
}

impl<T, U> Hypercube<T> for CastCube<T, U>
where
    T: Element + CastFrom<U>,
    U: Element + CastFrom<T>,
{
    fn dims(&self) -> &[Dimension] {
        self.inner.dims()
    }

    fn shape(&self) -> &[u64] {
        self.inner.shape()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn get_at(&self, pos: u64) -> Result<T, HypercubeError> {
        self.inner.get_at(pos).map(T::cast_from)
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        self.inner.set_at(pos, U::cast_from(value))
    }

    fn get_object_at(&self, pos: u64) -> Result<Option<T>, HypercubeError> {
        Ok(self.inner.get_object_at(pos)?.map(T::cast_from))
    }

    fn set_object_at(&self, pos: u64, value: Option<T>) -> Result<(), HypercubeError> {
        self.inner.set_object_at(pos, value.map(U::cast_from))
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size(), src_pos, dst.len())?;
        trace!(
            "casting {} to {}: src_pos={} len={}",
            U::NAME,
            T::NAME,
            src_pos,
            dst.len()
        );
        let mut buf = vec![U::NULL; dst.len().min(CAST_CHUNK)];
        let mut pos = src_pos;
        for chunk in dst.chunks_mut(CAST_CHUNK) {
            let buf = &mut buf[..chunk.len()];
            self.inner.to_flattened(pos, buf)?;
            for (el, &value) in chunk.iter_mut().zip(buf.iter()) {
                *el = T::cast_from(value);
            }
            pos += chunk.len() as u64;
        }
        Ok(())
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size(), dst_pos, src.len())?;
        let mut buf = Vec::with_capacity(src.len().min(CAST_CHUNK));
        let mut pos = dst_pos;
        for chunk in src.chunks(CAST_CHUNK) {
            buf.clear();
            buf.extend(chunk.iter().map(|&el| U::cast_from(el)));
            self.inner.from_flattened(&buf, pos)?;
            pos += chunk.len() as u64;
        }
        Ok(())
    }

    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        check_range(self.size(), src_pos, dst.len())?;
        let mut buf = vec![None; dst.len().min(CAST_CHUNK)];
        let mut pos = src_pos;
        for chunk in dst.chunks_mut(CAST_CHUNK) {
            let buf = &mut buf[..chunk.len()];
            self.inner.to_flattened_objs(pos, buf)?;
            for (el, &value) in chunk.iter_mut().zip(buf.iter()) {
                *el = value.map(T::cast_from);
            }
            pos += chunk.len() as u64;
        }
        Ok(())
    }

    fn from_flattened_objs(&self, src: &[Option<T>], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size(), dst_pos, src.len())?;
        let mut buf = Vec::with_capacity(src.len().min(CAST_CHUNK));
        let mut pos = dst_pos;
        for chunk in src.chunks(CAST_CHUNK) {
            buf.clear();
            buf.extend(chunk.iter().map(|el| el.map(U::cast_from)));
            self.inner.from_flattened_objs(&buf, pos)?;
            pos += chunk.len() as u64;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), HypercubeError> {
        self.inner.flush()
    }
}

impl<U: Element> Cube<U> {
    /// Return a view of this cube with elements converted to `T`.
    ///
    /// Numeric conversions follow `as` casts, so narrowing conversions
    /// truncate or saturate. Booleans convert to and from 1 and 0, and any
    /// non-zero number is `true`. Casting to the current element type returns
    /// a view which converts each element to itself.
    pub fn cast<T>(&self) -> Cube<T>
    where
        T: Element + CastFrom<U>,
        U: CastFrom<T>,
    {
        Cube::new(CastCube::<T, U>::new(self.clone()))
    }
}
