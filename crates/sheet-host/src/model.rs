//! The in-memory document: workbook, worksheets, tables and charts.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use batch_protocol::Value;
use serde::{Serialize, Serializer};

use crate::address::{CellAddress, RangeAddress};
use crate::error::{invalid_argument, invalid_reference, ExecResult};

/// Chart types accepted by `charts.add`.
pub const CHART_TYPES: &[&str] = &[
    "ColumnClustered",
    "ColumnStacked",
    "BarClustered",
    "BarStacked",
    "Line",
    "LineMarkers",
    "Pie",
    "Doughnut",
    "Area",
    "XYScatter",
];

/// Legend positions accepted by `legend.position`.
pub const LEGEND_POSITIONS: &[&str] = &["Top", "Bottom", "Left", "Right", "Corner", "Custom"];

#[derive(Debug, Clone, Serialize)]
pub struct Workbook {
    pub worksheets: Vec<Worksheet>,
    pub active: usize,
}

impl Default for Workbook {
    fn default() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            active: 0,
        }
    }
}

impl Workbook {
    pub fn active_sheet(&self) -> &Worksheet {
        &self.worksheets[self.active]
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name.eq_ignore_ascii_case(name))
    }

    pub fn add_worksheet(&mut self, name: Option<&str>) -> ExecResult<usize> {
        let name = match name {
            Some(n) => n.to_string(),
            None => (1..)
                .map(|i| format!("Sheet{i}"))
                .find(|n| self.sheet_index(n).is_none())
                .unwrap_or_default(),
        };
        if name.is_empty() || name.len() > 31 || name.contains(['\\', '/', '?', '*', '[', ']', ':']) {
            return Err(invalid_argument(format!("invalid worksheet name '{name}'")));
        }
        if self.sheet_index(&name).is_some() {
            return Err(invalid_argument(format!("worksheet '{name}' already exists")));
        }
        self.worksheets.push(Worksheet::new(&name));
        Ok(self.worksheets.len() - 1)
    }

    /// Find a table by name anywhere in the workbook.
    pub fn find_table(&self, name: &str) -> Option<(usize, usize)> {
        self.worksheets.iter().enumerate().find_map(|(s, ws)| {
            ws.tables
                .iter()
                .position(|t| t.name.eq_ignore_ascii_case(name))
                .map(|t| (s, t))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Worksheet {
    pub name: String,
    #[serde(serialize_with = "a1_keys")]
    pub cells: BTreeMap<CellAddress, Value>,
    #[serde(serialize_with = "a1_keys")]
    pub number_formats: BTreeMap<CellAddress, String>,
    pub tables: Vec<Table>,
    pub charts: Vec<Chart>,
    pub protected: bool,
    pub frozen_rows: u32,
    pub frozen_columns: u32,
    pub autofit_columns: BTreeSet<u16>,
    pub autofit_rows: BTreeSet<u32>,
}

impl Worksheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
            number_formats: BTreeMap::new(),
            tables: Vec::new(),
            charts: Vec::new(),
            protected: false,
            frozen_rows: 0,
            frozen_columns: 0,
            autofit_columns: BTreeSet::new(),
            autofit_rows: BTreeSet::new(),
        }
    }

    fn table_at(&self, cell: CellAddress) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.full_range().contains(cell))
    }

    /// The value of a cell, looking through tables.
    pub fn cell(&self, cell: CellAddress) -> Value {
        match self.table_at(cell) {
            Some(t) => self.tables[t].cell(cell),
            None => self.cells.get(&cell).cloned().unwrap_or(Value::Null),
        }
    }

    /// Write a cell, routing writes inside a table to the table.
    pub fn set_cell(&mut self, cell: CellAddress, value: Value) -> ExecResult<()> {
        let value = coerce_input(value)?;
        match self.table_at(cell) {
            Some(t) => self.tables[t].set_cell(cell, value),
            None => {
                if value.is_null() {
                    self.cells.remove(&cell);
                } else {
                    self.cells.insert(cell, value);
                }
                Ok(())
            }
        }
    }

    pub fn range_values(&self, range: &RangeAddress) -> Value {
        Value::List(
            (range.start.row..=range.end.row)
                .map(|row| {
                    Value::List(
                        (range.start.col..=range.end.col)
                            .map(|col| self.cell(CellAddress::new(row, col)))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Write a matrix into a range. A 1x1 matrix fills the whole range.
    pub fn set_range_values(&mut self, range: &RangeAddress, values: &Value) -> ExecResult<()> {
        for (cell, value) in broadcast(range, values, "values")? {
            self.set_cell(cell, value)?;
        }
        Ok(())
    }

    pub fn range_number_formats(&self, range: &RangeAddress) -> Value {
        Value::List(
            (range.start.row..=range.end.row)
                .map(|row| {
                    Value::List(
                        (range.start.col..=range.end.col)
                            .map(|col| {
                                let fmt = self
                                    .number_formats
                                    .get(&CellAddress::new(row, col))
                                    .map(String::as_str)
                                    .unwrap_or("General");
                                Value::from(fmt)
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    pub fn set_range_number_formats(&mut self, range: &RangeAddress, formats: &Value) -> ExecResult<()> {
        for (cell, fmt) in broadcast(range, formats, "numberFormat")? {
            match fmt {
                Value::String(s) if s == "General" => {
                    self.number_formats.remove(&cell);
                }
                Value::String(s) => {
                    self.number_formats.insert(cell, s);
                }
                other => {
                    return Err(crate::error::type_mismatch(
                        "numberFormat",
                        "string",
                        other.type_name(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Insert rows into table `t`. The table grows downward and may not
    /// grow over another table or over non-empty cells.
    pub fn add_table_rows(&mut self, t: usize, index: Option<usize>, values: &Value) -> ExecResult<()> {
        let table = &self.tables[t];
        let added = values.as_list().map_or(0, <[Value]>::len);
        let current = table.full_range();
        let grown = table.range_with_rows(table.rows.len() + added);

        if let Some(other) = self
            .tables
            .iter()
            .enumerate()
            .find(|(i, o)| *i != t && o.full_range().intersects(&grown))
            .map(|(_, o)| o)
        {
            return Err(invalid_argument(format!(
                "table '{}' cannot grow to {grown}: it would overlap table '{}'",
                table.name, other.name
            )));
        }
        if let Some(cell) = grown
            .cells()
            .filter(|c| !current.contains(*c))
            .find(|c| self.cells.get(c).is_some_and(|v| !v.is_null()))
        {
            return Err(invalid_argument(format!(
                "table '{}' cannot grow to {grown}: cell {cell} is not empty",
                table.name
            )));
        }

        self.tables[t].add_rows(index, values)
    }

    /// Convert a range into a table. With `has_headers` the first row of
    /// the range supplies the column names.
    pub fn add_table(&mut self, range: RangeAddress, has_headers: bool) -> ExecResult<usize> {
        if let Some(t) = self.tables.iter().find(|t| t.full_range().intersects(&range)) {
            return Err(invalid_argument(format!(
                "range {range} overlaps table '{}'",
                t.name
            )));
        }

        let width = range.col_count() as usize;
        let (header_row, first_data_row) = if has_headers {
            (Some(range.start.row), range.start.row + 1)
        } else {
            (None, range.start.row)
        };

        let mut columns = Vec::with_capacity(width);
        for i in 0..width {
            let fallback = format!("Column{}", i + 1);
            let name = header_row
                .map(|row| display_text(&self.cell(CellAddress::new(row, range.start.col + i as u16))))
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback);
            columns.push(unique_name(&columns, name));
        }

        let mut rows = Vec::new();
        for row in first_data_row..=range.end.row {
            let values: Vec<Value> = (0..width)
                .map(|i| self.cell(CellAddress::new(row, range.start.col + i as u16)))
                .collect();
            rows.push(values);
        }
        // A table over a header-only range has no data rows yet.
        if rows.iter().all(|r| r.iter().all(Value::is_null)) {
            rows.clear();
        }

        for cell in range.cells() {
            self.cells.remove(&cell);
        }

        // Without headers, generated names take the range's first row and the
        // data moves down one row.
        self.tables.push(Table {
            name: String::new(),
            origin: range.start,
            columns,
            rows,
            filters: BTreeMap::new(),
            sort_fields: Vec::new(),
        });
        Ok(self.tables.len() - 1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SortField {
    pub key: usize,
    pub ascending: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    /// Top-left cell of the header row.
    pub origin: CellAddress,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Column index -> values that stay visible.
    pub filters: BTreeMap<usize, Vec<String>>,
    pub sort_fields: Vec<SortField>,
}

impl Table {
    pub fn width(&self) -> u16 {
        self.columns.len() as u16
    }

    /// Data rows shown in the grid. An empty table still shows one blank row.
    fn body_height(&self) -> u32 {
        self.rows.len().max(1) as u32
    }

    pub fn header_range(&self) -> RangeAddress {
        RangeAddress::new(
            self.origin,
            CellAddress::new(self.origin.row, self.origin.col + self.width() - 1),
        )
    }

    pub fn body_range(&self) -> RangeAddress {
        RangeAddress::new(
            CellAddress::new(self.origin.row + 1, self.origin.col),
            CellAddress::new(
                self.origin.row + self.body_height(),
                self.origin.col + self.width() - 1,
            ),
        )
    }

    pub fn full_range(&self) -> RangeAddress {
        RangeAddress::new(self.origin, self.body_range().end)
    }

    /// Where the table would sit holding `rows` data rows.
    fn range_with_rows(&self, rows: usize) -> RangeAddress {
        RangeAddress::new(
            self.origin,
            CellAddress::new(
                self.origin.row + rows.max(1) as u32,
                self.origin.col + self.width() - 1,
            ),
        )
    }

    /// Header plus body of one column.
    pub fn column_range(&self, index: usize) -> RangeAddress {
        let col = self.origin.col + index as u16;
        RangeAddress::new(
            CellAddress::new(self.origin.row, col),
            CellAddress::new(self.origin.row + self.body_height(), col),
        )
    }

    pub fn column_body_range(&self, index: usize) -> RangeAddress {
        let col = self.origin.col + index as u16;
        RangeAddress::new(
            CellAddress::new(self.origin.row + 1, col),
            CellAddress::new(self.origin.row + self.body_height(), col),
        )
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    fn cell(&self, cell: CellAddress) -> Value {
        let col = (cell.col - self.origin.col) as usize;
        if cell.row == self.origin.row {
            return Value::String(self.columns[col].clone());
        }
        let row = (cell.row - self.origin.row - 1) as usize;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set_cell(&mut self, cell: CellAddress, value: Value) -> ExecResult<()> {
        let col = (cell.col - self.origin.col) as usize;
        if cell.row == self.origin.row {
            let name = display_text(&value);
            if name.is_empty() {
                return Err(invalid_argument("table header cells cannot be empty"));
            }
            let others: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != col)
                .map(|(_, c)| c.clone())
                .collect();
            self.columns[col] = unique_name(&others, name);
            return Ok(());
        }
        let row = (cell.row - self.origin.row - 1) as usize;
        if self.rows.is_empty() {
            self.rows.push(vec![Value::Null; self.columns.len()]);
        }
        self.rows[row][col] = value;
        Ok(())
    }

    /// Insert rows at `index` (append when `None`).
    pub fn add_rows(&mut self, index: Option<usize>, values: &Value) -> ExecResult<()> {
        let rows = values
            .as_list()
            .ok_or_else(|| crate::error::type_mismatch("rows.add values", "list", values.type_name()))?;
        let mut new_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let cells = row.as_list().ok_or_else(|| {
                crate::error::type_mismatch("rows.add row", "list", row.type_name())
            })?;
            if cells.len() != self.columns.len() {
                return Err(invalid_argument(format!(
                    "row has {} values but table '{}' has {} columns",
                    cells.len(),
                    self.name,
                    self.columns.len()
                )));
            }
            let cells = cells
                .iter()
                .cloned()
                .map(coerce_input)
                .collect::<ExecResult<Vec<_>>>()?;
            new_rows.push(cells);
        }

        let at = match index {
            Some(i) if i > self.rows.len() => {
                return Err(invalid_argument(format!(
                    "row index {i} beyond table with {} rows",
                    self.rows.len()
                )))
            }
            Some(i) => i,
            None => self.rows.len(),
        };
        self.rows.splice(at..at, new_rows);
        Ok(())
    }

    pub fn row_visible(&self, row: usize) -> bool {
        self.filters.iter().all(|(col, keep)| {
            let text = self.rows[row].get(*col).map(display_text).unwrap_or_default();
            keep.iter().any(|k| k.eq_ignore_ascii_case(&text))
        })
    }

    pub fn visible_row_count(&self) -> usize {
        (0..self.rows.len()).filter(|&r| self.row_visible(r)).count()
    }

    /// Stable multi-key sort of the data rows. Blank cells sort last in
    /// either direction.
    pub fn sort(&mut self, fields: Vec<SortField>) -> ExecResult<()> {
        if let Some(f) = fields.iter().find(|f| f.key >= self.columns.len()) {
            return Err(invalid_argument(format!(
                "sort key {} out of range for {} columns",
                f.key,
                self.columns.len()
            )));
        }
        self.rows.sort_by(|a, b| {
            for field in &fields {
                let (x, y) = (&a[field.key], &b[field.key]);
                let ord = match (x.is_null(), y.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) if field.ascending => compare_values(x, y),
                    (false, false) => compare_values(y, x),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        self.sort_fields = fields;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub name: String,
    pub chart_type: String,
    pub source: RangeAddress,
    pub series_by: String,
    pub top_left: Option<String>,
    pub bottom_right: Option<String>,
    pub title: Option<String>,
    pub legend_position: String,
    pub legend_fill: Option<String>,
    pub data_label_font_size: f64,
    pub data_label_font_color: String,
    pub series: Vec<Series>,
}

impl Worksheet {
    /// Create a chart over `source`. Numeric columns (or rows, for
    /// `series_by == "Rows"`) become series named by their first cell.
    pub fn add_chart(&mut self, chart_type: &str, source: RangeAddress, series_by: &str) -> ExecResult<usize> {
        if !CHART_TYPES.contains(&chart_type) {
            return Err(invalid_argument(format!("unknown chart type '{chart_type}'")));
        }
        if !["Auto", "Columns", "Rows"].contains(&series_by) {
            return Err(invalid_argument(format!("unknown seriesBy '{series_by}'")));
        }

        let by_rows = series_by == "Rows";
        let lines: Vec<Vec<Value>> = if by_rows {
            (source.start.row..=source.end.row)
                .map(|row| {
                    (source.start.col..=source.end.col)
                        .map(|col| self.cell(CellAddress::new(row, col)))
                        .collect()
                })
                .collect()
        } else {
            (source.start.col..=source.end.col)
                .map(|col| {
                    (source.start.row..=source.end.row)
                        .map(|row| self.cell(CellAddress::new(row, col)))
                        .collect()
                })
                .collect()
        };

        let header_label = |line_index: usize| -> Option<String> {
            let table = self.tables.iter().find(|t| t.body_range().intersects(&source))?;
            if by_rows {
                return None;
            }
            let col = source.start.col + line_index as u16;
            let offset = col.checked_sub(table.origin.col)? as usize;
            table.columns.get(offset).cloned()
        };

        let mut series = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let numeric = line.iter().filter(|v| !v.is_null()).all(|v| v.as_f64().is_some());
            if numeric && line.iter().any(|v| v.as_f64().is_some()) {
                let name = header_label(i).unwrap_or_else(|| format!("Series{}", series.len() + 1));
                series.push(Series { name });
            }
        }

        let name = format!("Chart {}", self.charts.len() + 1);
        self.charts.push(Chart {
            name,
            chart_type: chart_type.to_string(),
            source,
            series_by: series_by.to_string(),
            top_left: None,
            bottom_right: None,
            title: None,
            legend_position: "Right".to_string(),
            legend_fill: None,
            data_label_font_size: 11.0,
            data_label_font_color: "#000000".to_string(),
            series,
        });
        Ok(self.charts.len() - 1)
    }

    pub fn chart_index(&self, name: &str) -> ExecResult<usize> {
        self.charts
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| invalid_reference(format!("no chart named '{name}'")))
    }
}

/// Text shown for a value in the grid; also what value filters match.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Typed input the way the grid receives it: numeric text becomes a number.
fn coerce_input(value: Value) -> ExecResult<Value> {
    match value {
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) if !s.trim().is_empty() && n.is_finite() => Ok(Value::Number(n)),
            _ => Ok(Value::String(s)),
        },
        v @ (Value::Null | Value::Bool(_) | Value::Number(_)) => Ok(v),
        other => Err(crate::error::type_mismatch(
            "cell value",
            "scalar",
            other.type_name(),
        )),
    }
}

/// Numbers before text; text compares case-insensitively.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        _ => display_text(a)
            .to_lowercase()
            .cmp(&display_text(b).to_lowercase()),
    }
}

/// Pair each cell of `range` with its value from a row-major matrix.
fn broadcast(range: &RangeAddress, matrix: &Value, what: &str) -> ExecResult<Vec<(CellAddress, Value)>> {
    let rows = matrix
        .as_list()
        .ok_or_else(|| crate::error::type_mismatch(what, "2-D list", matrix.type_name()))?;
    let grid: Vec<&[Value]> = rows
        .iter()
        .map(|r| {
            r.as_list()
                .ok_or_else(|| crate::error::type_mismatch(what, "2-D list", r.type_name()))
        })
        .collect::<ExecResult<_>>()?;

    let single = grid.len() == 1 && grid[0].len() == 1;
    if !single
        && (grid.len() != range.row_count() as usize
            || grid.iter().any(|r| r.len() != range.col_count() as usize))
    {
        return Err(invalid_argument(format!(
            "{what} dimensions do not match range {range} ({}x{})",
            range.row_count(),
            range.col_count()
        )));
    }

    Ok(range
        .cells()
        .map(|cell| {
            let value = if single {
                grid[0][0].clone()
            } else {
                let r = (cell.row - range.start.row) as usize;
                let c = (cell.col - range.start.col) as usize;
                grid[r][c].clone()
            };
            (cell, value)
        })
        .collect())
}

fn unique_name(existing: &[String], base: String) -> String {
    if !existing.iter().any(|e| e.eq_ignore_ascii_case(&base)) {
        return base;
    }
    (2..)
        .map(|i| format!("{base}{i}"))
        .find(|n| !existing.iter().any(|e| e.eq_ignore_ascii_case(n)))
        .unwrap_or(base)
}

fn a1_keys<V: Serialize, S: Serializer>(
    map: &BTreeMap<CellAddress, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(map.iter().map(|(k, v)| (k.to_string(), v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expenses() -> Worksheet {
        let mut ws = Worksheet::new("Sheet1");
        let t = ws.add_table(RangeAddress::parse("A1:D1").unwrap(), true).unwrap();
        let table = &mut ws.tables[t];
        table.name = "ExpensesTable".into();
        table.columns = vec!["Date".into(), "Merchant".into(), "Category".into(), "Amount".into()];
        table
            .add_rows(
                None,
                &Value::matrix([
                    ["1/1/2017", "The Phone Company", "Communications", "120"],
                    ["1/2/2017", "Northwind Electric Cars", "Transportation", "142.33"],
                    ["1/5/2017", "Best For You Organics Company", "Groceries", "27.9"],
                ]),
            )
            .unwrap();
        ws
    }

    #[test]
    fn test_header_only_table_has_placeholder_row() {
        let mut ws = Worksheet::new("Sheet1");
        let t = ws.add_table(RangeAddress::parse("A1:D1").unwrap(), true).unwrap();
        let table = &ws.tables[t];
        assert_eq!(table.columns, vec!["Column1", "Column2", "Column3", "Column4"]);
        assert!(table.rows.is_empty());
        assert_eq!(table.body_range().to_string(), "A2:D2");
        assert_eq!(table.full_range().to_string(), "A1:D2");
    }

    #[test]
    fn test_numeric_text_is_stored_as_number() {
        let ws = expenses();
        assert_eq!(ws.cell(CellAddress::parse("D2").unwrap()), Value::Number(120.0));
        assert_eq!(
            ws.cell(CellAddress::parse("A2").unwrap()),
            Value::String("1/1/2017".into())
        );
        assert_eq!(ws.cell(CellAddress::parse("B1").unwrap()), Value::from("Merchant"));
    }

    #[test]
    fn test_sort_descending_by_text() {
        let mut ws = expenses();
        ws.tables[0]
            .sort(vec![SortField {
                key: 1,
                ascending: false,
            }])
            .unwrap();
        let merchants: Vec<String> = ws.tables[0].rows.iter().map(|r| display_text(&r[1])).collect();
        assert_eq!(
            merchants,
            vec![
                "The Phone Company",
                "Northwind Electric Cars",
                "Best For You Organics Company"
            ]
        );
    }

    #[test]
    fn test_value_filter_hides_rows() {
        let mut ws = expenses();
        ws.tables[0]
            .filters
            .insert(2, vec!["Education".into(), "Groceries".into()]);
        assert_eq!(ws.tables[0].visible_row_count(), 1);
        assert!(ws.tables[0].row_visible(2));
    }

    #[test]
    fn test_add_rows_checks_width() {
        let mut ws = expenses();
        let err = ws.tables[0]
            .add_rows(None, &Value::matrix([["only", "two"]]))
            .unwrap_err();
        assert_eq!(err.kind, batch_protocol::RemoteErrorKind::InvalidArgument);
    }

    #[test]
    fn test_overlapping_table_rejected() {
        let mut ws = expenses();
        let err = ws.add_table(RangeAddress::parse("C3:E4").unwrap(), true).unwrap_err();
        assert_eq!(err.kind, batch_protocol::RemoteErrorKind::InvalidArgument);
    }

    #[test]
    fn test_number_format_broadcast() {
        let mut ws = expenses();
        let col = ws.tables[0].column_range(3);
        ws.set_range_number_formats(&col, &Value::matrix([["$#,##0.00"]]))
            .unwrap();
        assert_eq!(ws.number_formats.len(), 4);
        assert_eq!(
            ws.number_formats.get(&CellAddress::parse("D4").unwrap()).map(String::as_str),
            Some("$#,##0.00")
        );
    }

    #[test]
    fn test_chart_series_from_numeric_columns() {
        let mut ws = expenses();
        let body = ws.tables[0].body_range();
        let c = ws.add_chart("ColumnClustered", body, "Auto").unwrap();
        let chart = &ws.charts[c];
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "Amount");
        assert!(ws.add_chart("Hologram", body, "Auto").is_err());
    }
}
