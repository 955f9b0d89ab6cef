//! Typed views over device memory

use super::{Allocator, Runtime, RuntimeClient};
use crate::error::{Error, Result};
use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;

/// A typed, nullable reference to `len` elements of device memory
///
/// `DevicePtr` is `Copy` and borrows the allocation it points into for `'a`:
/// a pointer taken from a [`DeviceBuffer`] cannot outlive that buffer.
/// Operations accept `DevicePtr`s for every array argument and reject null
/// ones with [`Error::InvalidPointer`].
pub struct DevicePtr<'a, T> {
    addr: u64,
    len: usize,
    _marker: PhantomData<(&'a (), fn() -> T)>,
}

impl<T> Clone for DevicePtr<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DevicePtr<'_, T> {}

impl<T> PartialEq for DevicePtr<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.len == other.len
    }
}

impl<T> Eq for DevicePtr<'_, T> {}

impl<T> fmt::Debug for DevicePtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr({:#x}; {})", self.addr, self.len)
    }
}

impl<T> Default for DevicePtr<'_, T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<'a, T> DevicePtr<'a, T> {
    /// The null pointer
    pub const fn null() -> Self {
        Self {
            addr: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Wrap a raw device handle
    ///
    /// # Safety
    ///
    /// `addr` must be null or point to at least `len` properly aligned
    /// elements of `T` that stay allocated for all of `'a`.
    pub const unsafe fn from_raw(addr: u64, len: usize) -> Self {
        Self {
            addr,
            len,
            _marker: PhantomData,
        }
    }

    /// Raw device handle
    #[inline]
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// Number of elements this pointer may address
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the pointer addresses no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if this is the null pointer
    #[inline]
    pub fn is_null(&self) -> bool {
        self.addr == 0
    }

    /// A sub-view of `len` elements starting at element `offset`
    ///
    /// Returns `None` if the range does not fit inside this view.
    pub fn slice(self, offset: usize, len: usize) -> Option<Self> {
        if self.is_null() || offset.checked_add(len)? > self.len {
            return None;
        }
        Some(Self {
            addr: self.addr + (offset * std::mem::size_of::<T>()) as u64,
            len,
            _marker: PhantomData,
        })
    }

    /// Fail with [`Error::InvalidPointer`] if null
    #[inline]
    pub(crate) fn require(self, arg: &'static str) -> Result<Self> {
        if self.is_null() {
            Err(Error::invalid_pointer(arg))
        } else {
            Ok(self)
        }
    }

    /// Fail with [`Error::InvalidSize`] if fewer than `needed` elements are
    /// addressable
    #[inline]
    pub(crate) fn require_len(self, needed: usize, arg: &'static str) -> Result<Self> {
        if self.len < needed {
            Err(Error::invalid_size(arg, self.len as i64))
        } else {
            Ok(self)
        }
    }

    /// Read element `i`
    ///
    /// An out-of-range index is a device fault: it panics, which the runtime
    /// reports as a failed launch.
    ///
    /// # Safety
    ///
    /// The pointer must satisfy the contract of [`DevicePtr::from_raw`].
    #[inline]
    pub(crate) unsafe fn read(self, i: usize) -> T
    where
        T: Copy,
    {
        assert!(i < self.len, "device read out of range: {i} >= {}", self.len);
        unsafe { (self.addr as *const T).add(i).read() }
    }

    /// Write element `i`
    ///
    /// # Safety
    ///
    /// As [`DevicePtr::read`]; additionally no other lane may access element
    /// `i` concurrently.
    #[inline]
    pub(crate) unsafe fn write(self, i: usize, value: T) {
        assert!(i < self.len, "device write out of range: {i} >= {}", self.len);
        unsafe { (self.addr as *mut T).add(i).write(value) }
    }
}

/// An owned device allocation of `len` elements of `T`
///
/// The memory is released through the client's allocator when the buffer is
/// dropped. Empty buffers still own a minimal allocation so that their
/// pointer is never null.
pub struct DeviceBuffer<R: Runtime, T: Pod> {
    addr: u64,
    len: usize,
    size_bytes: usize,
    client: R::Client,
    _marker: PhantomData<fn() -> T>,
}

impl<R: Runtime, T: Pod> DeviceBuffer<R, T> {
    fn alloc(client: &R::Client, len: usize) -> Result<Self> {
        let elem = std::mem::size_of::<T>().max(1);
        let size_bytes = len
            .checked_mul(elem)
            .ok_or(Error::OutOfMemory { size: usize::MAX })?
            .max(elem);
        let addr = client.allocator().allocate(size_bytes)?;
        if addr == 0 {
            return Err(Error::OutOfMemory { size: size_bytes });
        }
        Ok(Self {
            addr,
            len,
            size_bytes,
            client: client.clone(),
            _marker: PhantomData,
        })
    }

    /// Allocate `len` zero-initialised elements
    pub fn zeros(client: &R::Client, len: usize) -> Result<Self> {
        let buf = Self::alloc(client, len)?;
        R::memset(buf.addr, 0, buf.size_bytes, client.device())?;
        Ok(buf)
    }

    /// Allocate and fill with a copy of `data`
    pub fn from_slice(client: &R::Client, data: &[T]) -> Result<Self> {
        let buf = Self::alloc(client, data.len())?;
        R::copy_to_device(bytemuck::cast_slice(data), buf.addr, client.device())?;
        Ok(buf)
    }

    /// Overwrite the start of the buffer with `data`
    pub fn copy_from_host(&mut self, data: &[T]) -> Result<()> {
        if data.len() > self.len {
            return Err(Error::invalid_size("data", data.len() as i64));
        }
        R::copy_to_device(bytemuck::cast_slice(data), self.addr, self.client.device())
    }

    /// Wait for pending work and copy the contents back to the host
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.client.synchronize()?;
        let mut out = vec![T::zeroed(); self.len];
        R::copy_from_device(
            self.addr,
            bytemuck::cast_slice_mut(&mut out),
            self.client.device(),
        )?;
        Ok(out)
    }

    /// Device pointer to the whole buffer, valid while the buffer is borrowed
    ///
    /// ```compile_fail
    /// use spmx::runtime::{DeviceBuffer, Runtime, cpu::CpuRuntime};
    ///
    /// let client = CpuRuntime::default_client(&CpuRuntime::default_device());
    /// let ptr = {
    ///     let buf = DeviceBuffer::<CpuRuntime, i32>::zeros(&client, 4).unwrap();
    ///     buf.ptr()
    /// };
    /// assert!(!ptr.is_null());
    /// ```
    #[inline]
    pub fn ptr(&self) -> DevicePtr<'_, T> {
        // SAFETY: the allocation holds `len` elements and lives as long as `self`
        unsafe { DevicePtr::from_raw(self.addr, self.len) }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Runtime, T: Pod> fmt::Debug for DeviceBuffer<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr())
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

impl<R: Runtime, T: Pod> Drop for DeviceBuffer<R, T> {
    fn drop(&mut self) {
        self.client
            .allocator()
            .deallocate(self.addr, self.size_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuClient, CpuRuntime};

    fn client() -> CpuClient {
        CpuRuntime::default_client(&CpuRuntime::default_device())
    }

    #[test]
    fn test_null_pointer() {
        let p = DevicePtr::<f32>::null();
        assert!(p.is_null());
        assert!(p.is_empty());
        assert_eq!(p.require("x"), Err(Error::invalid_pointer("x")));
        assert_eq!(p.slice(0, 0), None);
    }

    #[test]
    fn test_buffer_roundtrip() {
        let client = client();
        let buf = DeviceBuffer::<CpuRuntime, i32>::from_slice(&client, &[1, 2, 3]).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_vec().unwrap(), vec![1, 2, 3]);

        let zeros = DeviceBuffer::<CpuRuntime, f64>::zeros(&client, 4).unwrap();
        assert_eq!(zeros.to_vec().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_empty_buffer_is_not_null() {
        let client = client();
        let buf = DeviceBuffer::<CpuRuntime, i32>::zeros(&client, 0).unwrap();
        assert!(!buf.ptr().is_null());
        assert!(buf.is_empty());
        assert!(buf.to_vec().unwrap().is_empty());
    }

    #[test]
    fn test_slice_bounds() {
        let client = client();
        let buf = DeviceBuffer::<CpuRuntime, i32>::from_slice(&client, &[5, 6, 7, 8]).unwrap();
        let tail = buf.ptr().slice(2, 2).unwrap();
        assert_eq!(tail.addr(), buf.ptr().addr() + 8);
        assert_eq!(unsafe { tail.read(1) }, 8);
        assert_eq!(buf.ptr().slice(3, 2), None);
    }

    #[test]
    fn test_buffer_releases_memory() {
        let client = client();
        let before = client.allocator().allocated_bytes();
        {
            let _buf = DeviceBuffer::<CpuRuntime, f64>::zeros(&client, 100).unwrap();
            assert_eq!(client.allocator().allocated_bytes(), before + 800);
        }
        assert_eq!(client.allocator().allocated_bytes(), before);
    }
}
