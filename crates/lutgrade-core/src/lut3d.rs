//! Canonical 3-dimensional lookup table.

use crate::{CoreError, CoreResult};

/// A canonical NxNxN color lookup grid.
///
/// Entries are stored in the `.cube` file order: **red varies fastest**,
/// then green, then blue, so the value for grid coordinate `(r, g, b)`
/// lives at `data[r + g*N + b*N*N]`. All downstream packing math is
/// defined against this order.
///
/// # Example
///
/// ```rust
/// use lutgrade_core::Lut3d;
///
/// let lut = Lut3d::identity(17);
/// assert_eq!(lut.data.len(), 17 * 17 * 17);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3d {
    /// Grid values, R-fastest: `data[r + g*size + b*size*size]`.
    pub data: Vec<[f32; 3]>,
    /// Grid resolution per axis (at least 2).
    pub size: usize,
    /// Input domain minimum per channel.
    pub domain_min: [f32; 3],
    /// Input domain maximum per channel.
    pub domain_max: [f32; 3],
}

impl Lut3d {
    /// Creates an identity (pass-through) LUT of the given size.
    pub fn identity(size: usize) -> Self {
        let total = size * size * size;
        let mut data = Vec::with_capacity(total);
        let scale = (size - 1) as f32;

        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 / scale, g as f32 / scale, b as f32 / scale]);
                }
            }
        }

        Self {
            data,
            size,
            domain_min: [0.0, 0.0, 0.0],
            domain_max: [1.0, 1.0, 1.0],
        }
    }

    /// Creates a LUT from raw R-fastest data.
    ///
    /// Fails with [`CoreError::MalformedLut`] unless `data` holds exactly
    /// `size^3` entries and `size >= 2`.
    pub fn from_data(data: Vec<[f32; 3]>, size: usize) -> CoreResult<Self> {
        if size < 2 {
            return Err(CoreError::MalformedLut(format!(
                "grid size must be at least 2, got {size}"
            )));
        }
        let expected = size * size * size;
        if data.len() != expected {
            return Err(CoreError::MalformedLut(format!(
                "expected {} entries for size {}, got {}",
                expected,
                size,
                data.len()
            )));
        }
        Ok(Self {
            data,
            size,
            domain_min: [0.0, 0.0, 0.0],
            domain_max: [1.0, 1.0, 1.0],
        })
    }

    /// Sets the input domain.
    pub fn with_domain(mut self, min: [f32; 3], max: [f32; 3]) -> Self {
        self.domain_min = min;
        self.domain_max = max;
        self
    }

    /// Value at grid coordinate `(r, g, b)`.
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[r + g * self.size + b * self.size * self.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_corners() {
        let lut = Lut3d::identity(2);
        assert_eq!(lut.get(0, 0, 0), [0.0, 0.0, 0.0]);
        assert_eq!(lut.get(1, 0, 0), [1.0, 0.0, 0.0]);
        assert_eq!(lut.get(0, 1, 0), [0.0, 1.0, 0.0]);
        assert_eq!(lut.get(1, 1, 1), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn from_data_validates_length() {
        let data = vec![[0.0; 3]; 7];
        assert!(Lut3d::from_data(data, 2).is_err());
    }

    #[test]
    fn from_data_rejects_degenerate_size() {
        assert!(Lut3d::from_data(vec![[0.0; 3]], 1).is_err());
    }
}
