//! Fixed-capacity, position-addressed buffer of result rows.
//!
//! A [`ResultWindow`] holds a contiguous slice of a query result starting at
//! [`ResultWindow::start_position`]. Every row carries the same number of
//! cells. Space is accounted in bytes so that a window behaves the same way
//! regardless of how many rows it holds: each row costs a fixed header plus
//! one slot per column, and text/blob cells additionally consume their
//! payload from the shared heap.
//!
//! Rows and cells are addressed with absolute result positions; a window
//! starting at 100 answers `get_long(100, 0)` for its first row.

use std::borrow::Cow;

use crate::error::WindowError;
use crate::types::FieldType;

/// Default capacity, in bytes, for windows created without explicit sizing.
pub const DEFAULT_WINDOW_CAPACITY: usize = 2 * 1024 * 1024;

/// Bytes charged for every allocated row.
pub const ROW_HEADER_BYTES: usize = 8;

/// Bytes charged for every cell slot in a row.
pub const FIELD_SLOT_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Null,
    Integer(i64),
    Float(f64),
    String { offset: usize, len: usize },
    Blob { offset: usize, len: usize },
}

impl Slot {
    fn field_type(self) -> FieldType {
        match self {
            Slot::Null => FieldType::Null,
            Slot::Integer(_) => FieldType::Integer,
            Slot::Float(_) => FieldType::Float,
            Slot::String { .. } => FieldType::String,
            Slot::Blob { .. } => FieldType::Blob,
        }
    }
}

// Where a row begins, so `free_last_row` can roll the buffer back exactly.
#[derive(Debug, Clone, Copy)]
struct RowMark {
    heap_start: usize,
    used_start: usize,
}

/// A byte-accounted window over a contiguous range of result rows.
#[derive(Debug, Clone)]
pub struct ResultWindow {
    capacity: usize,
    start_position: usize,
    num_columns: usize,
    slots: Vec<Slot>,
    rows: Vec<RowMark>,
    heap: Vec<u8>,
    used: usize,
    oversized: bool,
}

impl Default for ResultWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl ResultWindow {
    /// Create an empty window able to hold `capacity` bytes of rows.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            start_position: 0,
            num_columns: 0,
            slots: Vec::new(),
            rows: Vec::new(),
            heap: Vec::new(),
            used: 0,
            oversized: false,
        }
    }

    /// Nominal byte capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Bytes still available before the window reports [`WindowError::Full`].
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        if self.oversized {
            if self.rows.is_empty() {
                usize::MAX
            } else {
                0
            }
        } else {
            self.capacity.saturating_sub(self.used)
        }
    }

    #[must_use]
    pub fn start_position(&self) -> usize {
        self.start_position
    }

    pub fn set_start_position(&mut self, position: usize) {
        self.start_position = position;
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `position` falls inside the rows currently held.
    #[must_use]
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start_position && position - self.start_position < self.rows.len()
    }

    /// Drop every row, the column count and the start position.
    pub fn clear(&mut self) {
        self.start_position = 0;
        self.num_columns = 0;
        self.slots.clear();
        self.rows.clear();
        self.heap.clear();
        self.used = 0;
        self.oversized = false;
    }

    /// Fix the number of columns for the rows about to be written.
    ///
    /// # Errors
    /// Returns [`WindowError::ColumnCountMismatch`] if rows are already present
    /// with a different column count.
    pub fn set_num_columns(&mut self, columns: usize) -> Result<(), WindowError> {
        if !self.rows.is_empty() && columns != self.num_columns {
            return Err(WindowError::ColumnCountMismatch {
                current: self.num_columns,
                requested: columns,
            });
        }
        self.num_columns = columns;
        Ok(())
    }

    /// Lift the byte limit for exactly one row.
    ///
    /// Only meaningful on an empty window: the next row is admitted whatever
    /// its size, after which the window reports full. This guarantees forward
    /// progress when a single row is larger than the nominal capacity.
    pub fn grow_for_single_row(&mut self) {
        if self.rows.is_empty() {
            self.oversized = true;
        }
    }

    fn reserve(&mut self, bytes: usize) -> Result<(), WindowError> {
        if !self.oversized && bytes > self.capacity.saturating_sub(self.used) {
            return Err(WindowError::Full);
        }
        self.used += bytes;
        Ok(())
    }

    /// Append an empty row whose cells are all NULL.
    ///
    /// # Errors
    /// Returns [`WindowError::NoColumns`] before `set_num_columns`, or
    /// [`WindowError::Full`] when the row slots do not fit.
    pub fn alloc_row(&mut self) -> Result<(), WindowError> {
        if self.num_columns == 0 {
            return Err(WindowError::NoColumns);
        }
        if self.oversized && !self.rows.is_empty() {
            return Err(WindowError::Full);
        }
        let mark = RowMark {
            heap_start: self.heap.len(),
            used_start: self.used,
        };
        self.reserve(ROW_HEADER_BYTES + self.num_columns * FIELD_SLOT_BYTES)?;
        self.rows.push(mark);
        self.slots.extend(std::iter::repeat_n(Slot::Null, self.num_columns));
        Ok(())
    }

    /// Remove the most recently allocated row and release its bytes.
    pub fn free_last_row(&mut self) {
        if let Some(mark) = self.rows.pop() {
            self.slots.truncate(self.rows.len() * self.num_columns);
            self.heap.truncate(mark.heap_start);
            self.used = mark.used_start;
        }
    }

    fn slot_index(&self, position: usize, column: usize) -> Result<usize, WindowError> {
        if !self.contains(position) {
            return Err(WindowError::RowOutOfRange {
                position,
                start: self.start_position,
                rows: self.rows.len(),
            });
        }
        if column >= self.num_columns {
            return Err(WindowError::ColumnOutOfRange {
                column,
                columns: self.num_columns,
            });
        }
        Ok((position - self.start_position) * self.num_columns + column)
    }

    fn put_slot(&mut self, position: usize, column: usize, slot: Slot) -> Result<(), WindowError> {
        let idx = self.slot_index(position, column)?;
        self.slots[idx] = slot;
        Ok(())
    }

    fn put_bytes(
        &mut self,
        position: usize,
        column: usize,
        bytes: &[u8],
        extra: usize,
    ) -> Result<(usize, usize), WindowError> {
        let idx = self.slot_index(position, column)?;
        self.reserve(bytes.len() + extra)?;
        let offset = self.heap.len();
        self.heap.extend_from_slice(bytes);
        Ok((idx, offset))
    }

    /// # Errors
    /// Returns [`WindowError`] if the cell is outside the window.
    pub fn put_null(&mut self, position: usize, column: usize) -> Result<(), WindowError> {
        self.put_slot(position, column, Slot::Null)
    }

    /// # Errors
    /// Returns [`WindowError`] if the cell is outside the window.
    pub fn put_long(
        &mut self,
        position: usize,
        column: usize,
        value: i64,
    ) -> Result<(), WindowError> {
        self.put_slot(position, column, Slot::Integer(value))
    }

    /// # Errors
    /// Returns [`WindowError`] if the cell is outside the window.
    pub fn put_double(
        &mut self,
        position: usize,
        column: usize,
        value: f64,
    ) -> Result<(), WindowError> {
        self.put_slot(position, column, Slot::Float(value))
    }

    /// Store text bytes; charged one extra byte for the terminator.
    ///
    /// # Errors
    /// Returns [`WindowError::Full`] when the payload does not fit.
    pub fn put_string(
        &mut self,
        position: usize,
        column: usize,
        value: &[u8],
    ) -> Result<(), WindowError> {
        let (idx, offset) = self.put_bytes(position, column, value, 1)?;
        self.slots[idx] = Slot::String {
            offset,
            len: value.len(),
        };
        Ok(())
    }

    /// # Errors
    /// Returns [`WindowError::Full`] when the payload does not fit.
    pub fn put_blob(
        &mut self,
        position: usize,
        column: usize,
        value: &[u8],
    ) -> Result<(), WindowError> {
        let (idx, offset) = self.put_bytes(position, column, value, 0)?;
        self.slots[idx] = Slot::Blob {
            offset,
            len: value.len(),
        };
        Ok(())
    }

    fn slot(&self, position: usize, column: usize) -> Result<Slot, WindowError> {
        let idx = self.slot_index(position, column)?;
        Ok(self.slots[idx])
    }

    /// Storage class of a cell.
    ///
    /// # Errors
    /// Returns [`WindowError`] if the cell is outside the window.
    pub fn get_type(&self, position: usize, column: usize) -> Result<FieldType, WindowError> {
        self.slot(position, column).map(Slot::field_type)
    }

    /// # Errors
    /// Returns [`WindowError`] if the cell is outside the window.
    pub fn is_null(&self, position: usize, column: usize) -> Result<bool, WindowError> {
        Ok(self.get_type(position, column)? == FieldType::Null)
    }

    /// Read a cell as an integer. NULL reads as 0, floats truncate and text
    /// is parsed leniently (unparsable text reads as 0).
    ///
    /// # Errors
    /// Returns [`WindowError::TypeMismatch`] for blobs.
    pub fn get_long(&self, position: usize, column: usize) -> Result<i64, WindowError> {
        match self.slot(position, column)? {
            Slot::Null => Ok(0),
            Slot::Integer(v) => Ok(v),
            #[allow(clippy::cast_possible_truncation)]
            Slot::Float(v) => Ok(v as i64),
            Slot::String { offset, len } => {
                let text = String::from_utf8_lossy(&self.heap[offset..offset + len]);
                Ok(parse_leading_long(&text))
            }
            Slot::Blob { .. } => Err(WindowError::TypeMismatch {
                found: "blob",
                wanted: "integer",
            }),
        }
    }

    /// Read a cell as a double, with the same coercions as [`Self::get_long`].
    ///
    /// # Errors
    /// Returns [`WindowError::TypeMismatch`] for blobs.
    pub fn get_double(&self, position: usize, column: usize) -> Result<f64, WindowError> {
        match self.slot(position, column)? {
            Slot::Null => Ok(0.0),
            #[allow(clippy::cast_precision_loss)]
            Slot::Integer(v) => Ok(v as f64),
            Slot::Float(v) => Ok(v),
            Slot::String { offset, len } => {
                let text = String::from_utf8_lossy(&self.heap[offset..offset + len]);
                Ok(text.trim().parse().unwrap_or(0.0))
            }
            Slot::Blob { .. } => Err(WindowError::TypeMismatch {
                found: "blob",
                wanted: "float",
            }),
        }
    }

    /// Read a cell as text; NULL reads as `None`.
    ///
    /// # Errors
    /// Returns [`WindowError::TypeMismatch`] for blobs.
    pub fn get_string(
        &self,
        position: usize,
        column: usize,
    ) -> Result<Option<Cow<'_, str>>, WindowError> {
        match self.slot(position, column)? {
            Slot::Null => Ok(None),
            Slot::Integer(v) => Ok(Some(Cow::Owned(v.to_string()))),
            Slot::Float(v) => Ok(Some(Cow::Owned(v.to_string()))),
            Slot::String { offset, len } => Ok(Some(String::from_utf8_lossy(
                &self.heap[offset..offset + len],
            ))),
            Slot::Blob { .. } => Err(WindowError::TypeMismatch {
                found: "blob",
                wanted: "string",
            }),
        }
    }

    /// Read a cell as raw bytes; NULL reads as `None` and text yields its bytes.
    ///
    /// # Errors
    /// Returns [`WindowError::TypeMismatch`] for numeric cells.
    pub fn get_blob(&self, position: usize, column: usize) -> Result<Option<&[u8]>, WindowError> {
        match self.slot(position, column)? {
            Slot::Null => Ok(None),
            Slot::String { offset, len } | Slot::Blob { offset, len } => {
                Ok(Some(&self.heap[offset..offset + len]))
            }
            Slot::Integer(_) => Err(WindowError::TypeMismatch {
                found: "integer",
                wanted: "blob",
            }),
            Slot::Float(_) => Err(WindowError::TypeMismatch {
                found: "float",
                wanted: "blob",
            }),
        }
    }
}

// SQLite-style integer coercion: leading sign and digits, anything else stops.
fn parse_leading_long(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let mut end = 0;
    for (i, ch) in trimmed.char_indices() {
        if ch.is_ascii_digit() || (i == 0 && (ch == '-' || ch == '+')) {
            end = i + ch.len_utf8();
        } else {
            break;
        }
    }
    trimmed[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_cost(columns: usize) -> usize {
        ROW_HEADER_BYTES + columns * FIELD_SLOT_BYTES
    }

    #[test]
    fn alloc_requires_columns() {
        let mut window = ResultWindow::new(1024);
        assert_eq!(window.alloc_row(), Err(WindowError::NoColumns));
    }

    #[test]
    fn typed_cells_round_trip_with_absolute_positions() {
        let mut window = ResultWindow::new(1024);
        window.set_start_position(10);
        window.set_num_columns(5).unwrap();
        window.alloc_row().unwrap();
        window.put_null(10, 0).unwrap();
        window.put_long(10, 1, -7).unwrap();
        window.put_double(10, 2, 2.5).unwrap();
        window.put_string(10, 3, b"hello").unwrap();
        window.put_blob(10, 4, &[0, 1, 2]).unwrap();

        assert_eq!(window.get_type(10, 0).unwrap(), FieldType::Null);
        assert_eq!(window.get_long(10, 1).unwrap(), -7);
        assert!((window.get_double(10, 2).unwrap() - 2.5).abs() < f64::EPSILON);
        assert_eq!(window.get_string(10, 3).unwrap().as_deref(), Some("hello"));
        assert_eq!(window.get_blob(10, 4).unwrap(), Some(&[0_u8, 1, 2][..]));
        assert!(matches!(
            window.get_long(9, 1),
            Err(WindowError::RowOutOfRange { position: 9, .. })
        ));
        assert!(matches!(
            window.get_long(10, 5),
            Err(WindowError::ColumnOutOfRange { column: 5, .. })
        ));
    }

    #[test]
    fn full_window_rejects_row_and_free_restores_bytes() {
        let mut window = ResultWindow::new(row_cost(1) * 2 + 4);
        window.set_num_columns(1).unwrap();
        window.alloc_row().unwrap();
        window.put_long(0, 0, 1).unwrap();
        window.alloc_row().unwrap();
        let used = window.used_bytes();
        assert_eq!(window.put_string(1, 0, b"too long"), Err(WindowError::Full));
        assert_eq!(window.used_bytes(), used);

        window.free_last_row();
        assert_eq!(window.num_rows(), 1);
        assert_eq!(window.used_bytes(), row_cost(1));
        assert_eq!(window.alloc_row(), Ok(()));
        assert_eq!(window.alloc_row(), Err(WindowError::Full));
    }

    #[test]
    fn free_last_row_truncates_heap() {
        let mut window = ResultWindow::new(1024);
        window.set_num_columns(1).unwrap();
        window.alloc_row().unwrap();
        window.put_string(0, 0, b"keep").unwrap();
        window.alloc_row().unwrap();
        window.put_blob(1, 0, b"drop me").unwrap();
        window.free_last_row();
        window.alloc_row().unwrap();
        window.put_string(1, 0, b"new").unwrap();
        assert_eq!(window.get_string(0, 0).unwrap().as_deref(), Some("keep"));
        assert_eq!(window.get_string(1, 0).unwrap().as_deref(), Some("new"));
        assert_eq!(window.used_bytes(), 2 * row_cost(1) + 5 + 4);
    }

    #[test]
    fn column_count_is_fixed_once_rows_exist() {
        let mut window = ResultWindow::new(1024);
        window.set_num_columns(2).unwrap();
        window.alloc_row().unwrap();
        assert_eq!(
            window.set_num_columns(3),
            Err(WindowError::ColumnCountMismatch {
                current: 2,
                requested: 3
            })
        );
        window.clear();
        assert_eq!(window.set_num_columns(3), Ok(()));
    }

    #[test]
    fn oversized_row_admitted_once() {
        let mut window = ResultWindow::new(row_cost(1));
        window.set_num_columns(1).unwrap();
        window.alloc_row().unwrap();
        assert_eq!(window.put_blob(0, 0, &[7; 64]), Err(WindowError::Full));
        window.free_last_row();

        window.grow_for_single_row();
        window.alloc_row().unwrap();
        window.put_blob(0, 0, &[7; 64]).unwrap();
        assert_eq!(window.free_bytes(), 0);
        assert_eq!(window.alloc_row(), Err(WindowError::Full));

        window.clear();
        window.set_num_columns(1).unwrap();
        window.alloc_row().unwrap();
        assert_eq!(window.put_blob(0, 0, &[7; 64]), Err(WindowError::Full));
    }

    #[test]
    fn lenient_numeric_coercion() {
        let mut window = ResultWindow::new(1024);
        window.set_num_columns(3).unwrap();
        window.alloc_row().unwrap();
        window.put_string(0, 0, b" 42abc").unwrap();
        window.put_double(0, 1, 9.75).unwrap();
        window.put_string(0, 2, b"nope").unwrap();
        assert_eq!(window.get_long(0, 0).unwrap(), 42);
        assert_eq!(window.get_long(0, 1).unwrap(), 9);
        assert_eq!(window.get_long(0, 2).unwrap(), 0);
        assert_eq!(window.get_string(0, 1).unwrap().as_deref(), Some("9.75"));
    }
}
