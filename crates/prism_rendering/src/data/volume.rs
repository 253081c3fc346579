//! # Voxel Volume
//!
//! Dense 3D grid, x fastest:
//!
//! ```text
//! index(x, y, z) = x + width * (y + z * height)
//! ```
//!
//! A volume carries the [`ChangeToken`] of its content. Every mutation draws
//! a new one; clones keep it, since their content is identical.

use prism_core::ChangeToken;

use crate::error::{RenderError, RenderResult};

/// Dense voxel grid.
#[derive(Clone, Debug)]
pub struct Volume<T> {
    size: [u32; 3],
    data: Vec<T>,
    token: ChangeToken,
}

impl<T: Copy> Volume<T> {
    /// Creates a volume with every voxel set to `fill`.
    #[must_use]
    pub fn new(size: [u32; 3], fill: T) -> Self {
        Self {
            size,
            data: vec![fill; voxel_count(size)],
            token: ChangeToken::next(),
        }
    }

    /// Wraps existing voxel data.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::VolumeSize`] if `data` does not hold exactly
    /// `width * height * depth` voxels.
    pub fn from_data(size: [u32; 3], data: Vec<T>) -> RenderResult<Self> {
        let expected = voxel_count(size);
        if data.len() != expected {
            return Err(RenderError::VolumeSize {
                size,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            size,
            data,
            token: ChangeToken::next(),
        })
    }

    /// Dimensions `[width, height, depth]`.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> [u32; 3] {
        self.size
    }

    /// Voxels in index order.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Token of the current content.
    #[inline]
    #[must_use]
    pub const fn token(&self) -> ChangeToken {
        self.token
    }

    /// Linear index of a voxel. Does not bounds check.
    #[inline]
    #[must_use]
    pub const fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let [width, height, _] = self.size;
        x as usize + width as usize * (y as usize + z as usize * height as usize)
    }

    /// Checks if the coordinate lies inside the volume.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        x < self.size[0] && y < self.size[1] && z < self.size[2]
    }

    /// Voxel at a coordinate, `None` outside the volume.
    #[must_use]
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<T> {
        if self.contains(x, y, z) {
            self.data.get(self.index(x, y, z)).copied()
        } else {
            None
        }
    }

    /// Overwrites one voxel. Returns `false` outside the volume.
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: T) -> bool {
        if !self.contains(x, y, z) {
            return false;
        }
        let index = self.index(x, y, z);
        self.data[index] = value;
        self.token = ChangeToken::next();
        true
    }

    /// Replaces every voxel.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::VolumeSize`] if the length differs.
    pub fn replace(&mut self, data: Vec<T>) -> RenderResult<()> {
        if data.len() != self.data.len() {
            return Err(RenderError::VolumeSize {
                size: self.size,
                expected: self.data.len(),
                actual: data.len(),
            });
        }
        self.data = data;
        self.token = ChangeToken::next();
        Ok(())
    }
}

fn voxel_count(size: [u32; 3]) -> usize {
    size.iter().map(|d| *d as usize).product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_x_fastest() {
        let volume = Volume::new([4, 3, 2], 0u8);
        assert_eq!(volume.index(0, 0, 0), 0);
        assert_eq!(volume.index(1, 0, 0), 1);
        assert_eq!(volume.index(0, 1, 0), 4);
        assert_eq!(volume.index(0, 0, 1), 12);
        assert_eq!(volume.index(3, 2, 1), 23);
        assert_eq!(volume.data().len(), 24);
    }

    #[test]
    fn test_set_takes_new_token() {
        let mut volume = Volume::new([2, 2, 2], 0u8);
        let before = volume.token();
        assert!(volume.set(1, 1, 1, 9));
        assert_ne!(volume.token(), before);
        assert_eq!(volume.get(1, 1, 1), Some(9));
        assert_eq!(volume.get(2, 0, 0), None);
        assert!(!volume.set(2, 0, 0, 1));
    }

    #[test]
    fn test_clone_keeps_token() {
        let volume = Volume::new([1, 1, 1], 0u8);
        assert_eq!(volume.clone().token(), volume.token());
    }

    #[test]
    fn test_from_data_checks_length() {
        assert!(Volume::from_data([2, 2, 1], vec![0u8; 4]).is_ok());
        let err = Volume::from_data([2, 2, 1], vec![0u8; 3]).unwrap_err();
        assert!(matches!(err, RenderError::VolumeSize { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn test_replace() {
        let mut volume = Volume::new([2, 1, 1], 0u8);
        let before = volume.token();
        volume.replace(vec![1, 2]).unwrap();
        assert_eq!(volume.data(), &[1, 2]);
        assert_ne!(volume.token(), before);
        assert!(volume.replace(vec![1]).is_err());
    }
}
