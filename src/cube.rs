use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::dimension::Dimension;
use crate::element::Element;
use crate::errors::HypercubeError;
use crate::layout::{check_range, offset_of};
use crate::view::View;

/// The N-dimensional array contract shared by storage backends and views.
///
/// Elements are addressed either by a coordinate per axis or by a flat
/// position in row-major order, where the last axis varies fastest. All
/// methods take `&self`: backends synchronize internally, so a cube can be
/// shared between threads and wrapped by any number of views, and writes
/// through any view are visible through all others. Operations touching more
/// than one element are not atomic.
///
/// Only the flat accessors are required. Backends and views override the
/// bulk transfer methods with faster versions than the per-element
/// defaults.
pub trait Hypercube<T: Element>: Send + Sync {
    /// Return the axes of the cube.
    fn dims(&self) -> &[Dimension];

    /// Return the length of each axis.
    fn shape(&self) -> &[u64];

    /// Return the number of elements, which is the product of the shape.
    fn size(&self) -> u64;

    /// Return the element at flat position `pos`.
    fn get_at(&self, pos: u64) -> Result<T, HypercubeError>;

    /// Replace the element at flat position `pos`.
    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError>;

    /// Return the number of dimensions.
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Return the length of `axis`.
    ///
    /// Panics if `axis >= self.ndim()`.
    fn length(&self, axis: usize) -> u64 {
        self.shape()[axis]
    }

    /// Return the element at `indices`.
    fn get(&self, indices: &[u64]) -> Result<T, HypercubeError> {
        self.get_at(offset_of(self.shape(), indices)?)
    }

    /// Replace the element at `indices`.
    fn set(&self, indices: &[u64], value: T) -> Result<(), HypercubeError> {
        self.set_at(offset_of(self.shape(), indices)?, value)
    }

    /// Return the element at `pos`, or `None` if the backend has no entry
    /// there.
    fn get_object_at(&self, pos: u64) -> Result<Option<T>, HypercubeError> {
        self.get_at(pos).map(Some)
    }

    /// Replace the element at `pos`. `None` stores the null value.
    fn set_object_at(&self, pos: u64, value: Option<T>) -> Result<(), HypercubeError> {
        self.set_at(pos, value.unwrap_or(T::NULL))
    }

    /// Nullable version of [`get`](Hypercube::get).
    fn get_object(&self, indices: &[u64]) -> Result<Option<T>, HypercubeError> {
        self.get_object_at(offset_of(self.shape(), indices)?)
    }

    /// Nullable version of [`set`](Hypercube::set).
    fn set_object(&self, indices: &[u64], value: Option<T>) -> Result<(), HypercubeError> {
        self.set_object_at(offset_of(self.shape(), indices)?, value)
    }

    /// Copy `dst.len()` elements, starting at flat position `src_pos`, into
    /// `dst`.
    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size(), src_pos, dst.len())?;
        for (pos, el) in (src_pos..).zip(dst.iter_mut()) {
            *el = self.get_at(pos)?;
        }
        Ok(())
    }

    /// Copy the elements of `src` into the cube, starting at flat position
    /// `dst_pos`.
    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size(), dst_pos, src.len())?;
        for (pos, &el) in (dst_pos..).zip(src) {
            self.set_at(pos, el)?;
        }
        Ok(())
    }

    /// Nullable version of [`to_flattened`](Hypercube::to_flattened).
    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        check_range(self.size(), src_pos, dst.len())?;
        for (pos, el) in (src_pos..).zip(dst.iter_mut()) {
            *el = self.get_object_at(pos)?;
        }
        Ok(())
    }

    /// Nullable version of [`from_flattened`](Hypercube::from_flattened).
    fn from_flattened_objs(&self, src: &[Option<T>], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size(), dst_pos, src.len())?;
        for (pos, &el) in (dst_pos..).zip(src) {
            self.set_object_at(pos, el)?;
        }
        Ok(())
    }

    /// Write pending changes to the backing medium.
    fn flush(&self) -> Result<(), HypercubeError> {
        Ok(())
    }

    /// Return the view this cube is, if it is one.
    fn as_view(&self) -> Option<&View<T>> {
        None
    }
}

/// Shared handle to a cube of any kind.
///
/// Cloning a `Cube` clones the handle, not the elements. View-producing
/// operations ([`slice`](Cube::slice), [`roll`](Cube::roll),
/// [`transpose`](Cube::transpose) etc.) return new handles which share the
/// storage of the original.
pub struct Cube<T: Element>(Arc<dyn Hypercube<T>>);

impl<T: Element> Cube<T> {
    pub fn new(cube: impl Hypercube<T> + 'static) -> Self {
        Cube(Arc::new(cube))
    }

    pub fn from_arc(cube: Arc<dyn Hypercube<T>>) -> Self {
        Cube(cube)
    }

    /// Return true if `self` and `other` are handles to the same cube.
    pub fn ptr_eq(&self, other: &Cube<T>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Return the number of views between this cube and its storage.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cube = self;
        while let Some(view) = cube.as_view() {
            depth += 1;
            cube = view.inner();
        }
        depth
    }
}

impl<T: Element> Clone for Cube<T> {
    fn clone(&self) -> Self {
        Cube(self.0.clone())
    }
}

impl<T: Element> Deref for Cube<T> {
    type Target = dyn Hypercube<T>;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// A handle is itself a cube, so it can be passed wherever a
/// `&dyn Hypercube<T>` is expected.
impl<T: Element> Hypercube<T> for Cube<T> {
    fn dims(&self) -> &[Dimension] {
        self.0.dims()
    }

    fn shape(&self) -> &[u64] {
        self.0.shape()
    }

    fn size(&self) -> u64 {
        self.0.size()
    }

    fn get_at(&self, pos: u64) -> Result<T, HypercubeError> {
        self.0.get_at(pos)
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        self.0.set_at(pos, value)
    }

    fn ndim(&self) -> usize {
        self.0.ndim()
    }

    fn length(&self, axis: usize) -> u64 {
        self.0.length(axis)
    }

    fn get(&self, indices: &[u64]) -> Result<T, HypercubeError> {
        self.0.get(indices)
    }

    fn set(&self, indices: &[u64], value: T) -> Result<(), HypercubeError> {
        self.0.set(indices, value)
    }

    fn get_object_at(&self, pos: u64) -> Result<Option<T>, HypercubeError> {
        self.0.get_object_at(pos)
    }

    fn set_object_at(&self, pos: u64, value: Option<T>) -> Result<(), HypercubeError> {
        self.0.set_object_at(pos, value)
    }

    fn get_object(&self, indices: &[u64]) -> Result<Option<T>, HypercubeError> {
        self.0.get_object(indices)
    }

    fn set_object(&self, indices: &[u64], value: Option<T>) -> Result<(), HypercubeError> {
        self.0.set_object(indices, value)
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        self.0.to_flattened(src_pos, dst)
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        self.0.from_flattened(src, dst_pos)
    }

    fn to_flattened_objs(&self, src_pos: u64, dst: &mut [Option<T>]) -> Result<(), HypercubeError> {
        self.0.to_flattened_objs(src_pos, dst)
    }

    fn from_flattened_objs(&self, src: &[Option<T>], dst_pos: u64) -> Result<(), HypercubeError> {
        self.0.from_flattened_objs(src, dst_pos)
    }

    fn flush(&self) -> Result<(), HypercubeError> {
        self.0.flush()
    }

    fn as_view(&self) -> Option<&View<T>> {
        self.0.as_view()
    }
}

impl<T: Element> fmt::Debug for Cube<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cube<{}>{:?}", T::NAME, self.shape())?;
        if let Some(view) = self.as_view() {
            write!(f, " {:?} of {:?}", view.transform(), view.inner())?;
        }
        Ok(())
    }
}
