//! Client-to-container coordinate mapping
//!
//! Pointer events arrive in viewport (client) space. Stored geometry lives in
//! container space, so every sample goes through [`CoordinateMapper`] first.

use std::cell::Cell;

use crate::annotation::ContainerPoint;

/// Bounding rectangle of the annotation container in client space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ContainerRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

/// Source of the container's current bounding rectangle
///
/// Returns `None` while the container is not mounted.
pub trait ContainerBounds {
    fn bounding_rect(&self) -> Option<ContainerRect>;
}

impl ContainerBounds for ContainerRect {
    fn bounding_rect(&self) -> Option<ContainerRect> {
        Some(*self)
    }
}

impl ContainerBounds for Option<ContainerRect> {
    fn bounding_rect(&self) -> Option<ContainerRect> {
        *self
    }
}

/// Rectangle that changes as the host scrolls or resizes
impl ContainerBounds for Cell<Option<ContainerRect>> {
    fn bounding_rect(&self) -> Option<ContainerRect> {
        self.get()
    }
}

impl<T: ContainerBounds + ?Sized> ContainerBounds for &T {
    fn bounding_rect(&self) -> Option<ContainerRect> {
        (**self).bounding_rect()
    }
}

/// Converts client coordinates into container-relative coordinates
///
/// The rectangle is re-read on every call, never cached, so results stay
/// correct across scrolling and resizing.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper<B> {
    bounds: B,
}

impl<B: ContainerBounds> CoordinateMapper<B> {
    pub fn new(bounds: B) -> Self {
        Self { bounds }
    }

    /// Whether the container is mounted; callers must check before trusting results
    pub fn is_mounted(&self) -> bool {
        self.bounds.bounding_rect().is_some()
    }

    /// `(client_x - left, client_y - top)`; an unmounted container counts as
    /// sitting at the origin
    pub fn to_container_coords(&self, client_x: f64, client_y: f64) -> ContainerPoint {
        let rect = self.bounds.bounding_rect().unwrap_or_default();
        ContainerPoint::new(client_x - rect.left, client_y - rect.top)
    }
}
