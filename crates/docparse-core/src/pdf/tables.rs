//! Heuristic table detection for PDF pages
//!
//! The detector works on positioned text runs, so it needs no rendering:
//! 1. Position text runs from the page content stream's text operators
//! 2. Cluster runs into rows based on vertical alignment
//! 3. Find regions of consecutive rows with a consistent column count
//! 4. Keep regions whose column boundaries form a grid of sufficient size
//!
//! Counts are best-effort. Tables drawn as a single text run per line, or
//! placed through transformation matrices, are not found.

use lopdf::content::Operation;
use lopdf::Object;
use std::cmp::Ordering;

/// A positioned run of text
#[derive(Debug, Clone)]
pub struct TextCell {
    pub text: String,
    /// Left coordinate (points)
    pub x: f32,
    /// Top coordinate (points, growing downwards)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextCell {
    fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Table detector configuration
#[derive(Debug, Clone)]
struct TableDetectorConfig {
    /// Cells within this Y distance are in the same row (points)
    row_tolerance: f32,
    /// Left edges within this X distance are in the same column (points)
    col_tolerance: f32,
    min_cells: usize,
    min_rows: usize,
    min_cols: usize,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 5.0,
            col_tolerance: 10.0,
            min_cells: 6,
            min_rows: 2,
            min_cols: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Number of tables formed by positioned text cells
    pub fn count_tables(&self, cells: &[TextCell]) -> usize {
        if cells.len() < self.config.min_cells {
            return 0;
        }

        let rows = self.cluster_rows(cells);
        self.find_table_regions(&rows)
            .iter()
            .filter(|region| self.table_columns(region).is_some())
            .count()
    }

    /// Cluster cells into rows based on Y coordinate alignment
    fn cluster_rows<'a>(&self, cells: &'a [TextCell]) -> Vec<Vec<&'a TextCell>> {
        let mut rows: Vec<Vec<&TextCell>> = Vec::new();

        for cell in cells {
            let found = rows.iter().position(|row| {
                row.first().is_some_and(|first| {
                    (cell.center_y() - first.center_y()).abs() <= self.config.row_tolerance
                })
            });
            match found {
                Some(i) => rows[i].push(cell),
                None => rows.push(vec![cell]),
            }
        }

        rows.sort_by(|a, b| {
            let ay = a.first().map_or(0.0, |c| c.y);
            let by = b.first().map_or(0.0, |c| c.y);
            ay.partial_cmp(&by).unwrap_or(Ordering::Equal)
        });

        rows
    }

    /// Consecutive rows whose cell counts stay within one of the first row's
    fn find_table_regions<'a>(&self, rows: &[Vec<&'a TextCell>]) -> Vec<Vec<Vec<&'a TextCell>>> {
        let mut regions = Vec::new();
        let mut current: Vec<Vec<&'a TextCell>> = Vec::new();
        let mut expected_cols: Option<usize> = None;

        for row in rows {
            let num_cells = row.len();

            // single-cell rows are prose or captions
            if num_cells < self.config.min_cols {
                if current.len() >= self.config.min_rows {
                    regions.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                expected_cols = None;
                continue;
            }

            match expected_cols {
                Some(expected) if num_cells.abs_diff(expected) <= 1 => current.push(row.clone()),
                Some(_) => {
                    if current.len() >= self.config.min_rows {
                        regions.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(row.clone());
                    expected_cols = Some(num_cells);
                }
                None => {
                    current.push(row.clone());
                    expected_cols = Some(num_cells);
                }
            }
        }

        if current.len() >= self.config.min_rows {
            regions.push(current);
        }
        regions
    }

    /// Column count of a region that is large enough to be a table
    fn table_columns(&self, region: &[Vec<&TextCell>]) -> Option<usize> {
        let cell_total: usize = region.iter().map(Vec::len).sum();
        if cell_total < self.config.min_cells {
            return None;
        }

        let num_cols = self.find_column_boundaries(region).len().saturating_sub(1);
        (num_cols >= self.config.min_cols).then_some(num_cols)
    }

    /// Clustered left edges plus the rightmost edge
    fn find_column_boundaries(&self, region: &[Vec<&TextCell>]) -> Vec<f32> {
        let mut xs: Vec<f32> = region
            .iter()
            .flat_map(|row| row.iter().map(|c| c.x))
            .collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let Some((&first, rest)) = xs.split_first() else {
            return Vec::new();
        };
        let mut boundaries = vec![first];
        for &x in rest {
            if boundaries.last().is_some_and(|&last| x - last > self.config.col_tolerance) {
                boundaries.push(x);
            }
        }

        if let Some(max_right) = region
            .iter()
            .flat_map(|row| row.iter().map(|c| c.right()))
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        {
            boundaries.push(max_right);
        }
        boundaries
    }
}

/// Position text-showing operators of a decoded content stream.
///
/// Tracks the text and line matrices through `BT`, `Tm`, `Td`, `TD`, `T*`,
/// `TL` and `Tf`. Rotation, skew and `cm` are ignored. Run widths are
/// estimated at half the font size per character.
pub fn cells_from_operations(operations: &[Operation]) -> Vec<TextCell> {
    let mut state = TextState::default();
    let mut cells = Vec::new();

    for op in operations {
        let num = |i: usize| op.operands.get(i).and_then(as_number);
        match op.operator.as_str() {
            "BT" => state.begin(),
            "Tf" => {
                if let Some(size) = num(1) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = num(0) {
                    state.leading = leading;
                }
            }
            "Tm" => {
                if let (Some(a), Some(d), Some(e), Some(f)) = (num(0), num(3), num(4), num(5)) {
                    state.set_matrix(a, d, e, f);
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    state.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(string_bytes) {
                    state.show(&decode_run(text), &mut cells);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text) = op.operands.first().and_then(string_bytes) {
                    state.show(&decode_run(text), &mut cells);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text) = op.operands.get(2).and_then(string_bytes) {
                    state.show(&decode_run(text), &mut cells);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let bytes: Vec<u8> = items
                        .iter()
                        .filter_map(string_bytes)
                        .flatten()
                        .copied()
                        .collect();
                    state.show(&decode_run(&bytes), &mut cells);
                }
            }
            _ => {}
        }
    }
    cells
}

#[derive(Debug)]
struct TextState {
    x: f32,
    y: f32,
    line_x: f32,
    line_y: f32,
    scale_x: f32,
    scale_y: f32,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            line_x: 0.0,
            line_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.line_x = 0.0;
        self.line_y = 0.0;
        self.scale_x = 1.0;
        self.scale_y = 1.0;
    }

    fn set_matrix(&mut self, a: f32, d: f32, e: f32, f: f32) {
        self.scale_x = a;
        self.scale_y = d;
        self.line_x = e;
        self.line_y = f;
        self.x = e;
        self.y = f;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx * self.scale_x;
        self.line_y += ty * self.scale_y;
        self.x = self.line_x;
        self.y = self.line_y;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, text: &str, cells: &mut Vec<TextCell>) {
        let height = (self.font_size * self.scale_y).abs();
        let width = text.chars().count() as f32 * self.font_size * self.scale_x.abs() * 0.5;
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            cells.push(TextCell {
                text: trimmed.to_string(),
                x: self.x,
                // baseline to top edge, flipped so rows sort top to bottom
                y: -(self.y + height),
                width,
                height,
            });
        }
        self.x += width;
    }
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}

/// Font encodings are not consulted; runs are only compared by position
fn decode_run(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
