use std::fs::{File, OpenOptions};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use memmap2::{Mmap, MmapMut};

use crate::cube::Hypercube;
use crate::dimension::Dimension;
use crate::element::Element;
use crate::env::trace;
use crate::errors::HypercubeError;
use crate::layout::{check_pos, check_range, size_of};
use crate::storage::{read_lock, write_lock};

enum Mapping {
    ReadOnly(Mmap),
    Writable(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::ReadOnly(map) => map,
            Mapping::Writable(map) => map,
        }
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8], HypercubeError> {
        match self {
            Mapping::ReadOnly(_) => Err(HypercubeError::ReadOnly),
            Mapping::Writable(map) => Ok(map),
        }
    }
}

/// Cube whose elements live in a memory-mapped file.
///
/// The file holds the elements in row-major order, each in its native-endian
/// representation of [`Element::WIDTH`] bytes, with no header. This is the
/// layout NumPy's `memmap` uses for C-ordered arrays, so files can be shared
/// with NumPy given the same dtype and shape.
pub struct MappedCube<T: Element> {
    dims: Vec<Dimension>,
    shape: Vec<u64>,
    size: u64,
    path: PathBuf,
    map: RwLock<Mapping>,
    _marker: PhantomData<fn() -> T>,
}

/// Return the number of bytes needed to hold a cube of `size` elements of
/// type `T`.
fn byte_len<T: Element>(size: u64) -> Result<u64, HypercubeError> {
    size.checked_mul(T::WIDTH as u64).ok_or_else(|| {
        HypercubeError::InvalidArgument(format!("{} elements are too many to map", size))
    })
}

impl<T: Element> MappedCube<T> {
    /// Create or truncate the file at `path` and map it as a writable cube
    /// of the given shape. The file is sized to hold every element.
    ///
    /// # Safety
    ///
    /// Modifying or truncating the file by other means while it is mapped
    /// can cause undefined behavior. Callers must ensure this does not
    /// happen for as long as the cube or any view of it is alive.
    pub unsafe fn create(path: impl AsRef<Path>, shape: &[u64]) -> Result<Self, HypercubeError> {
        let path = path.as_ref();
        let size = size_of(shape);
        let len = byte_len::<T>(size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len)?;

        // Safety: The caller has accepted the risks of mapping the file.
        let map = unsafe { MmapMut::map_mut(&file) }?;
        trace!("created {} byte mapping of {}", len, path.display());
        Ok(Self::from_mapping(path, shape, Mapping::Writable(map)))
    }

    /// Map an existing file as a cube of the given shape.
    ///
    /// A writable file which is too short for the shape is extended with
    /// zeros. A read-only file which is too short is an error.
    ///
    /// # Safety
    ///
    /// See [`create`](MappedCube::create).
    pub unsafe fn open(
        path: impl AsRef<Path>,
        shape: &[u64],
        writable: bool,
    ) -> Result<Self, HypercubeError> {
        let path = path.as_ref();
        let len = byte_len::<T>(size_of(shape))?;

        let mapping = if writable {
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            if file.metadata()?.len() < len {
                file.set_len(len)?;
            }
            // Safety: The caller has accepted the risks of mapping the file.
            Mapping::Writable(unsafe { MmapMut::map_mut(&file) }?)
        } else {
            let file = File::open(path)?;
            let file_len = file.metadata()?.len();
            if file_len < len {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "{} has {} bytes but the shape needs {}",
                        path.display(),
                        file_len,
                        len
                    ),
                )
                .into());
            }
            // Safety: The caller has accepted the risks of mapping the file.
            Mapping::ReadOnly(unsafe { Mmap::map(&file) }?)
        };
        trace!(
            "opened {} mapping of {}",
            if writable { "writable" } else { "read-only" },
            path.display()
        );
        Ok(Self::from_mapping(path, shape, mapping))
    }

    fn from_mapping(path: &Path, shape: &[u64], map: Mapping) -> Self {
        MappedCube {
            dims: Dimension::of(shape),
            shape: shape.to_vec(),
            size: size_of(shape),
            path: path.to_path_buf(),
            map: RwLock::new(map),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        matches!(*read_lock(&self.map), Mapping::Writable(_))
    }

    /// Return the byte range of `len` elements starting at `pos`.
    #[inline]
    fn byte_range(pos: u64, len: usize) -> std::ops::Range<usize> {
        let start = pos as usize * T::WIDTH;
        start..start + len * T::WIDTH
    }
}

impl<T: Element> Hypercube<T> for MappedCube<T> {
    fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn get_at(&self, pos: u64) -> Result<T, HypercubeError> {
        check_pos(self.size, pos)?;
        let map = read_lock(&self.map);
        Ok(T::read_ne(&map.bytes()[Self::byte_range(pos, 1)]))
    }

    fn set_at(&self, pos: u64, value: T) -> Result<(), HypercubeError> {
        check_pos(self.size, pos)?;
        let mut map = write_lock(&self.map);
        value.write_ne(&mut map.bytes_mut()?[Self::byte_range(pos, 1)]);
        Ok(())
    }

    fn to_flattened(&self, src_pos: u64, dst: &mut [T]) -> Result<(), HypercubeError> {
        check_range(self.size, src_pos, dst.len())?;
        let map = read_lock(&self.map);
        let bytes = &map.bytes()[Self::byte_range(src_pos, dst.len())];
        for (el, src) in dst.iter_mut().zip(bytes.chunks_exact(T::WIDTH)) {
            *el = T::read_ne(src);
        }
        Ok(())
    }

    fn from_flattened(&self, src: &[T], dst_pos: u64) -> Result<(), HypercubeError> {
        check_range(self.size, dst_pos, src.len())?;
        let mut map = write_lock(&self.map);
        let bytes = &mut map.bytes_mut()?[Self::byte_range(dst_pos, src.len())];
        for (&el, dst) in src.iter().zip(bytes.chunks_exact_mut(T::WIDTH)) {
            el.write_ne(dst);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), HypercubeError> {
        match &*read_lock(&self.map) {
            Mapping::Writable(map) => map.flush()?,
            Mapping::ReadOnly(_) => {}
        }
        Ok(())
    }
}
