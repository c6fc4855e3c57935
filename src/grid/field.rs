//! Flat 2-D field storage over the padded horizontal grid.
//!
//! All horizontal fields in this crate, including the two-cell halo on every
//! side, live in a single contiguous buffer indexed as `(i, j)` with `i` the
//! zonal (x) index and `j` the meridional (y) index. Row-major in `i`, so a
//! fixed `i` is a contiguous meridional column.

use std::ops::{Index, IndexMut};

/// A dense 2-D field of extent `ni × nj` (halo included).
#[derive(Clone, Debug, PartialEq)]
pub struct Field2<T> {
    ni: usize,
    nj: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Field2<T> {
    /// Allocate a field filled with `T::default()`.
    pub fn zeros(ni: usize, nj: usize) -> Self {
        Self {
            ni,
            nj,
            data: vec![T::default(); ni * nj],
        }
    }

    /// Zonal extent, halo included.
    pub fn ni(&self) -> usize {
        self.ni
    }

    /// Meridional extent, halo included.
    pub fn nj(&self) -> usize {
        self.nj
    }

    /// Bounds-checked read; `None` outside the padded extent.
    pub fn get(&self, i: i64, j: i64) -> Option<T> {
        if i < 0 || j < 0 || i as usize >= self.ni || j as usize >= self.nj {
            return None;
        }
        Some(self.data[i as usize * self.nj + j as usize])
    }

    /// Overwrite every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T> Index<(usize, usize)> for Field2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[i * self.nj + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Field2<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.data[i * self.nj + j]
    }
}

impl Field2<f64> {
    /// Copy another field's values into `self` (extents must match).
    pub fn copy_from(&mut self, other: &Field2<f64>) {
        debug_assert_eq!(self.ni, other.ni);
        debug_assert_eq!(self.nj, other.nj);
        self.data.copy_from_slice(&other.data);
    }

    /// Largest absolute value over all cells.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, &v| m.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_and_index() {
        let mut f: Field2<f64> = Field2::zeros(4, 3);
        assert_eq!(f.ni(), 4);
        assert_eq!(f.nj(), 3);
        assert_eq!(f[(2, 1)], 0.0);
        f[(2, 1)] = 5.0;
        assert_eq!(f[(2, 1)], 5.0);
        assert_eq!(f.max_abs(), 5.0);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let f: Field2<i32> = Field2::zeros(4, 3);
        assert_eq!(f.get(-1, 0), None);
        assert_eq!(f.get(0, 3), None);
        assert_eq!(f.get(4, 0), None);
        assert_eq!(f.get(3, 2), Some(0));
    }

    #[test]
    fn test_copy_from() {
        let mut a: Field2<f64> = Field2::zeros(2, 2);
        let mut b: Field2<f64> = Field2::zeros(2, 2);
        b[(1, 1)] = 3.0;
        a.copy_from(&b);
        assert_eq!(a[(1, 1)], 3.0);
    }
}
