//! Lane-major (structure-of-arrays) storage for batches of elements.
//!
//! A batch holds up to `width` elements. Entry `i` of lane `l` is stored at `i * width + l`, so
//! the values of one entry across all elements of the batch are contiguous. Lanes beyond the
//! number of valid elements are padded with a copy of the last valid element, which keeps every
//! lane numerically well-defined.
use crate::Real;
use nalgebra::DMatrix;

/// Lane width used when none is configured.
pub const DEFAULT_SIMD_WIDTH: usize = 8;
/// Largest lane width accepted by the assembly configuration.
pub const MAX_SIMD_WIDTH: usize = 64;

/// A vector of `len` entries per lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneVector<T> {
    data: Vec<T>,
    len: usize,
    width: usize,
}

impl<T: Real> LaneVector<T> {
    pub fn zeros(len: usize, width: usize) -> Self {
        assert!(width > 0, "Lane width must be positive");
        Self {
            data: vec![T::zero(); len * width],
            len,
            width,
        }
    }

    /// Resizes to `len` entries and sets all entries to zero.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.data.clear();
        self.data.resize(len * self.width, T::zero());
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, i: usize, lane: usize) -> T {
        self.data[i * self.width + lane]
    }

    pub fn get_mut(&mut self, i: usize, lane: usize) -> &mut T {
        &mut self.data[i * self.width + lane]
    }

    /// The values of entry `i` across all lanes.
    pub fn lanes(&self, i: usize) -> &[T] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn lanes_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

/// An `nrows x ncols` matrix per lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneMatrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
    width: usize,
}

impl<T: Real> LaneMatrix<T> {
    pub fn zeros(nrows: usize, ncols: usize, width: usize) -> Self {
        assert!(width > 0, "Lane width must be positive");
        Self {
            data: vec![T::zero(); nrows * ncols * width],
            nrows,
            ncols,
            width,
        }
    }

    /// Resizes to `nrows x ncols` and sets all entries to zero.
    pub fn reset(&mut self, nrows: usize, ncols: usize) {
        self.nrows = nrows;
        self.ncols = ncols;
        self.data.clear();
        self.data.resize(nrows * ncols * self.width, T::zero());
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize, lane: usize) -> T {
        self.data[self.offset(row, col) + lane]
    }

    pub fn get_mut(&mut self, row: usize, col: usize, lane: usize) -> &mut T {
        let offset = self.offset(row, col);
        &mut self.data[offset + lane]
    }

    /// The values of entry `(row, col)` across all lanes.
    pub fn lanes(&self, row: usize, col: usize) -> &[T] {
        let offset = self.offset(row, col);
        &self.data[offset..offset + self.width]
    }

    pub fn lanes_mut(&mut self, row: usize, col: usize) -> &mut [T] {
        let offset = self.offset(row, col);
        &mut self.data[offset..offset + self.width]
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.nrows && col < self.ncols);
        (row * self.ncols + col) * self.width
    }
}

/// Packs per-element values into lane-major storage.
///
/// `values` holds `elements.len()` consecutive blocks of `out.len()` entries. Lanes past the last
/// element are filled with a copy of the last element.
///
/// # Panics
///
/// Panics if there are no elements, more elements than lanes, or if the length of `values` does
/// not match.
pub fn interleave<T: Real>(out: &mut LaneVector<T>, values: &[T], num_elements: usize) {
    let width = out.width();
    let len = out.len();
    assert!(num_elements > 0 && num_elements <= width, "Invalid number of elements");
    assert_eq!(values.len(), len * num_elements);

    for lane in 0..width {
        let source = lane.min(num_elements - 1);
        let block = &values[source * len..(source + 1) * len];
        for (i, &value) in block.iter().enumerate() {
            *out.get_mut(i, lane) = value;
        }
    }
}

/// Copies the values of one lane into a contiguous slice.
pub fn extract_vector_lane<T: Real>(source: &LaneVector<T>, lane: usize, out: &mut [T]) {
    assert!(lane < source.width());
    assert_eq!(out.len(), source.len());
    for (i, value) in out.iter_mut().enumerate() {
        *value = source.get(i, lane);
    }
}

/// Copies the matrix of one lane into a dense matrix, resizing it if necessary.
pub fn extract_matrix_lane<T: Real>(source: &LaneMatrix<T>, lane: usize, out: &mut DMatrix<T>) {
    assert!(lane < source.width());
    if out.shape() != (source.nrows(), source.ncols()) {
        *out = DMatrix::zeros(source.nrows(), source.ncols());
    }
    for row in 0..source.nrows() {
        for col in 0..source.ncols() {
            out[(row, col)] = source.get(row, col, lane);
        }
    }
}
