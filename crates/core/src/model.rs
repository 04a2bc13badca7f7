use std::collections::HashMap;

use crate::cell::CellValue;
use crate::normalize::norm_key;

/// One worksheet as an owned grid. Row 0 is always the header row; data rows
/// start at index 1. Rows may be ragged; missing cells read as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: vec![Vec::new()],
        }
    }

    pub fn with_header<S: AsRef<str>>(name: impl Into<String>, header: &[S]) -> Self {
        let mut sheet = Self::new(name);
        sheet.rows[0] = header
            .iter()
            .map(|h| CellValue::text(h.as_ref()))
            .collect();
        sheet
    }

    /// Build from raw rows; an empty grid still gets its header row.
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        if rows.is_empty() {
            rows.push(Vec::new());
        }
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn header(&self) -> &[CellValue] {
        &self.rows[0]
    }

    pub fn header_text(&self, col: usize) -> String {
        self.cell(0, col).to_text().trim().to_string()
    }

    /// Widest row, header included.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Index one past the last row, i.e. header plus data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn cell_text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).to_text().trim().to_string()
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if col >= cells.len() {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    pub fn push_row(&mut self, cells: Vec<CellValue>) -> usize {
        self.rows.push(cells);
        self.rows.len() - 1
    }

    /// Remove a data row. The header row cannot be removed.
    pub fn remove_row(&mut self, row: usize) -> Option<Vec<CellValue>> {
        if row == 0 || row >= self.rows.len() {
            return None;
        }
        Some(self.rows.remove(row))
    }

    /// Insert a column at `col`, shifting later cells right. `values[i]` lands
    /// in row `i`; rows past the end of `values` get an empty cell. Rows shorter
    /// than `col` are padded so the new column is aligned in every row.
    pub fn insert_column(&mut self, col: usize, values: Vec<CellValue>) {
        let mut values = values.into_iter();
        for cells in &mut self.rows {
            let value = values.next().unwrap_or_default();
            if cells.len() < col {
                cells.resize(col, CellValue::Empty);
            }
            cells.insert(col, value);
        }
    }

    /// Remove column `col` from every row, returning its cells top to bottom.
    pub fn remove_column(&mut self, col: usize) -> Vec<CellValue> {
        self.rows
            .iter_mut()
            .map(|cells| {
                if col < cells.len() {
                    cells.remove(col)
                } else {
                    CellValue::Empty
                }
            })
            .collect()
    }

    /// Normalized header name to the first column carrying it.
    pub fn header_index(&self) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for col in 0..self.column_count() {
            let key = norm_key(&self.header_text(col));
            if !key.is_empty() {
                map.entry(key).or_insert(col);
            }
        }
        map
    }

    /// First column whose normalized header equals `name`'s.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        let want = norm_key(name);
        (0..self.column_count()).find(|&col| norm_key(&self.header_text(col)) == want)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name() == name)
    }
}
