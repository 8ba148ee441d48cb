// SPDX-License-Identifier: CEPL-1.0
use std::fmt;
use std::ops::Deref;

/// Exclusive owner of a native handle and the function that releases it.
///
/// The release function runs exactly once: on drop, on [`reset`], or when a
/// new value is assigned over this one. A default value holds the null
/// handle and releases nothing, so `res = ManagedResource::default()` is the
/// "destroy now" idiom. Moving a resource moves the obligation with it;
/// [`take`] leaves an empty value behind.
///
/// [`reset`]: ManagedResource::reset
/// [`take`]: ManagedResource::take
pub struct ManagedResource<H: Copy + Default> {
    raw: H,
    destroy: Option<Box<dyn FnOnce(H)>>,
}

impl<H: Copy + Default> ManagedResource<H> {
    pub fn new(raw: H, destroy: impl FnOnce(H) + 'static) -> Self {
        Self {
            raw,
            destroy: Some(Box::new(destroy)),
        }
    }

    /// The wrapped handle. Ownership stays here.
    #[inline]
    pub fn raw(&self) -> H {
        self.raw
    }

    /// True when there is nothing left to release.
    pub fn is_empty(&self) -> bool {
        self.destroy.is_none()
    }

    /// Releases the handle now and leaves the null handle in its place.
    pub fn reset(&mut self) {
        if let Some(destroy) = self.destroy.take() {
            destroy(self.raw);
        }
        self.raw = H::default();
    }

    /// Moves the handle and its release obligation out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<H: Copy + Default> Default for ManagedResource<H> {
    fn default() -> Self {
        Self {
            raw: H::default(),
            destroy: None,
        }
    }
}

impl<H: Copy + Default> Deref for ManagedResource<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.raw
    }
}

impl<H: Copy + Default> Drop for ManagedResource<H> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<H: Copy + Default + fmt::Debug> fmt::Debug for ManagedResource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedResource")
            .field("raw", &self.raw)
            .field("owned", &!self.is_empty())
            .finish()
    }
}
