//! Executes operation batches against a [`Workbook`].
//!
//! Every operation re-resolves its target path against the document as it
//! stands at that point in the batch, so later operations see the effects of
//! earlier ones. A batch runs on a scratch copy and is committed only when
//! every operation succeeds.

use std::collections::{BTreeMap, HashMap};

use batch_protocol::{EntityPath, LoadResult, OpId, Operation, PathRoot, Segment, Value};

use crate::address::{CellAddress, RangeAddress};
use crate::error::{
    invalid_argument, invalid_reference, permission_denied, stale_handle, type_mismatch,
    unknown_member, ExecResult,
};
use crate::model::{display_text, SortField, Workbook, LEGEND_POSITIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub sheet: usize,
    pub table: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRef {
    pub sheet: usize,
    pub chart: usize,
}

/// A resolved object in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Workbook,
    Worksheets,
    Worksheet(usize),
    Tables(usize),
    Table(TableRef),
    TableRows(TableRef),
    TableColumns(TableRef),
    TableColumn(TableRef, usize),
    ColumnFilter(TableRef, usize),
    TableSort(TableRef),
    Range(usize, RangeAddress),
    RangeFormat(usize, RangeAddress),
    Charts(usize),
    Chart(ChartRef),
    ChartTitle(ChartRef),
    ChartLegend(ChartRef),
    LegendFormat(ChartRef),
    LegendFill(ChartRef),
    DataLabels(ChartRef),
    DataLabelsFormat(ChartRef),
    DataLabelsFont(ChartRef),
    SeriesCollection(ChartRef),
    Series(ChartRef, usize),
    Protection(usize),
    FreezePanes(usize),
    /// Result of a call that returns no object.
    Nothing,
}

impl Target {
    fn kind(&self) -> &'static str {
        match self {
            Target::Workbook => "Workbook",
            Target::Worksheets => "WorksheetCollection",
            Target::Worksheet(_) => "Worksheet",
            Target::Tables(_) => "TableCollection",
            Target::Table(_) => "Table",
            Target::TableRows(_) => "TableRowCollection",
            Target::TableColumns(_) => "TableColumnCollection",
            Target::TableColumn(..) => "TableColumn",
            Target::ColumnFilter(..) => "Filter",
            Target::TableSort(_) => "TableSort",
            Target::Range(..) => "Range",
            Target::RangeFormat(..) => "RangeFormat",
            Target::Charts(_) => "ChartCollection",
            Target::Chart(_) => "Chart",
            Target::ChartTitle(_) => "ChartTitle",
            Target::ChartLegend(_) => "ChartLegend",
            Target::LegendFormat(_) => "ChartLegendFormat",
            Target::LegendFill(_) => "ChartFill",
            Target::DataLabels(_) => "ChartDataLabels",
            Target::DataLabelsFormat(_) => "ChartDataLabelFormat",
            Target::DataLabelsFont(_) => "ChartFont",
            Target::SeriesCollection(_) => "ChartSeriesCollection",
            Target::Series(..) => "ChartSeries",
            Target::Protection(_) => "WorksheetProtection",
            Target::FreezePanes(_) => "WorksheetFreezePanes",
            Target::Nothing => "void",
        }
    }

    /// The worksheet whose content this object belongs to.
    fn sheet(&self) -> Option<usize> {
        match *self {
            Target::Worksheet(s)
            | Target::Tables(s)
            | Target::Range(s, _)
            | Target::RangeFormat(s, _)
            | Target::Charts(s)
            | Target::Protection(s)
            | Target::FreezePanes(s) => Some(s),
            Target::Table(t)
            | Target::TableRows(t)
            | Target::TableColumns(t)
            | Target::TableColumn(t, _)
            | Target::ColumnFilter(t, _)
            | Target::TableSort(t) => Some(t.sheet),
            Target::Chart(c)
            | Target::ChartTitle(c)
            | Target::ChartLegend(c)
            | Target::LegendFormat(c)
            | Target::LegendFill(c)
            | Target::DataLabels(c)
            | Target::DataLabelsFormat(c)
            | Target::DataLabelsFont(c)
            | Target::SeriesCollection(c)
            | Target::Series(c, _) => Some(c.sheet),
            Target::Workbook | Target::Worksheets | Target::Nothing => None,
        }
    }
}

/// Objects returned by `Invoke` operations, by op id, for one session.
pub type SessionResults = HashMap<OpId, Target>;

/// Execute `ops` in order. On success the workbook and `results` reflect
/// every operation; on failure neither changes.
pub fn execute_batch(
    workbook: &mut Workbook,
    results: &mut SessionResults,
    ops: &[Operation],
) -> ExecResult<Vec<LoadResult>> {
    let mut scratch = Executor {
        wb: workbook.clone(),
        results: results.clone(),
    };
    let mut loads = Vec::new();
    for op in ops {
        tracing::trace!("{op}");
        if let Some(load) = scratch.apply(op).map_err(|e| e.at(op.id()))? {
            loads.push(load);
        }
    }
    *workbook = scratch.wb;
    *results = scratch.results;
    Ok(loads)
}

struct Executor {
    wb: Workbook,
    results: SessionResults,
}

impl Executor {
    fn apply(&mut self, op: &Operation) -> ExecResult<Option<LoadResult>> {
        match op {
            Operation::Load {
                id,
                target,
                properties,
            } => {
                let target = self.resolve(target)?;
                let mut values = BTreeMap::new();
                for property in properties {
                    values.insert(property.clone(), self.load_path(target, property)?);
                }
                Ok(Some(LoadResult { op: *id, values }))
            }
            Operation::Set {
                target,
                property,
                value,
                ..
            } => {
                let target = self.resolve(target)?;
                if !matches!(target, Target::Protection(_)) {
                    self.ensure_unprotected(target)?;
                }
                self.set(target, property, value)?;
                Ok(None)
            }
            Operation::Invoke {
                id,
                target,
                method,
                args,
            } => {
                let target = self.resolve(target)?;
                let result = self.invoke(target, method, args)?;
                self.results.insert(*id, result);
                Ok(None)
            }
        }
    }

    fn resolve(&self, path: &EntityPath) -> ExecResult<Target> {
        let mut target = match &path.root {
            PathRoot::Workbook => Target::Workbook,
            PathRoot::OpResult(op) => *self
                .results
                .get(op)
                .ok_or_else(|| stale_handle(format!("no object was returned by {op} in this session")))?,
        };
        for segment in &path.segments {
            target = match segment {
                Segment::Property { name } => self.property_step(target, name)?,
                Segment::Call { method, args } => self
                    .call_step(target, method, args)?
                    .ok_or_else(|| unknown_member(target.kind(), method))?,
            };
        }
        Ok(target)
    }

    /// Property navigation to a related object.
    fn property_step(&self, target: Target, name: &str) -> ExecResult<Target> {
        let next = match (target, name) {
            (Target::Workbook, "worksheets") => Target::Worksheets,
            (Target::Worksheet(s), "tables") => Target::Tables(s),
            (Target::Worksheet(s), "charts") => Target::Charts(s),
            (Target::Worksheet(s), "protection") => Target::Protection(s),
            (Target::Worksheet(s), "freezePanes") => Target::FreezePanes(s),
            (Target::Table(t), "rows") => Target::TableRows(t),
            (Target::Table(t), "columns") => Target::TableColumns(t),
            (Target::Table(t), "sort") => Target::TableSort(t),
            (Target::Table(t), "worksheet") => Target::Worksheet(t.sheet),
            (Target::TableColumn(t, c), "filter") => Target::ColumnFilter(t, c),
            (Target::Range(s, r), "format") => Target::RangeFormat(s, r),
            (Target::Range(s, _), "worksheet") => Target::Worksheet(s),
            (Target::Chart(c), "title") => Target::ChartTitle(c),
            (Target::Chart(c), "legend") => Target::ChartLegend(c),
            (Target::Chart(c), "dataLabels") => Target::DataLabels(c),
            (Target::Chart(c), "series") => Target::SeriesCollection(c),
            (Target::ChartLegend(c), "format") => Target::LegendFormat(c),
            (Target::LegendFormat(c), "fill") => Target::LegendFill(c),
            (Target::DataLabels(c), "format") => Target::DataLabelsFormat(c),
            (Target::DataLabelsFormat(c), "font") => Target::DataLabelsFont(c),
            _ => return Err(unknown_member(target.kind(), name)),
        };
        Ok(next)
    }

    /// Navigation through a getter call. `None` if `method` is not a getter
    /// on this object.
    fn call_step(&self, target: Target, method: &str, args: &[Value]) -> ExecResult<Option<Target>> {
        let next = match (target, method) {
            (Target::Workbook | Target::Worksheets, "getActiveWorksheet") => {
                Target::Worksheet(self.wb.active)
            }
            (Target::Worksheets, "getItem") => {
                let name = arg_str(args, 0, "name")?;
                let s = self
                    .wb
                    .sheet_index(name)
                    .ok_or_else(|| invalid_reference(format!("no worksheet named '{name}'")))?;
                Target::Worksheet(s)
            }
            (Target::Worksheets, "getItemAt") => {
                let i = arg_index(args, 0, "index")?;
                if i >= self.wb.worksheets.len() {
                    return Err(invalid_reference(format!("no worksheet at index {i}")));
                }
                Target::Worksheet(i)
            }
            (Target::Worksheet(s), "getRange") => Target::Range(s, self.range_arg(s, args, 0)?),
            (Target::Tables(s), "getItem") => {
                let name = arg_str(args, 0, "name")?;
                let table = self.wb.worksheets[s]
                    .tables
                    .iter()
                    .position(|t| t.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| invalid_reference(format!("no table named '{name}'")))?;
                Target::Table(TableRef { sheet: s, table })
            }
            (Target::Tables(s), "getItemAt") => {
                let i = arg_index(args, 0, "index")?;
                if i >= self.wb.worksheets[s].tables.len() {
                    return Err(invalid_reference(format!("no table at index {i}")));
                }
                Target::Table(TableRef { sheet: s, table: i })
            }
            (Target::Table(t), "getHeaderRowRange") => Target::Range(t.sheet, self.table(t).header_range()),
            (Target::Table(t), "getDataBodyRange") => Target::Range(t.sheet, self.table(t).body_range()),
            (Target::Table(t), "getRange") => Target::Range(t.sheet, self.table(t).full_range()),
            (Target::TableColumns(t), "getItem") => {
                let name = arg_str(args, 0, "name")?;
                let c = self
                    .table(t)
                    .column_index(name)
                    .ok_or_else(|| invalid_reference(format!("no column named '{name}'")))?;
                Target::TableColumn(t, c)
            }
            (Target::TableColumns(t), "getItemAt") => {
                let i = arg_index(args, 0, "index")?;
                if i >= self.table(t).columns.len() {
                    return Err(invalid_reference(format!("no column at index {i}")));
                }
                Target::TableColumn(t, i)
            }
            (Target::TableColumn(t, c), "getRange") => Target::Range(t.sheet, self.table(t).column_range(c)),
            (Target::TableColumn(t, c), "getDataBodyRange") => {
                Target::Range(t.sheet, self.table(t).column_body_range(c))
            }
            (Target::TableColumn(t, c), "getHeaderRowRange") => {
                let header = self.table(t).header_range();
                let cell = CellAddress::new(header.start.row, header.start.col + c as u16);
                Target::Range(t.sheet, RangeAddress::single(cell))
            }
            (Target::Range(s, r), "getCell") => {
                let row = arg_index(args, 0, "row")?;
                let col = arg_index(args, 1, "column")?;
                if row >= r.row_count() as usize || col >= r.col_count() as usize {
                    return Err(invalid_reference(format!("cell ({row}, {col}) outside {r}")));
                }
                let cell = CellAddress::new(r.start.row + row as u32, r.start.col + col as u16);
                Target::Range(s, RangeAddress::single(cell))
            }
            (Target::Charts(s), "getItem") => {
                let name = arg_str(args, 0, "name")?;
                let chart = self.wb.worksheets[s].chart_index(name)?;
                Target::Chart(ChartRef { sheet: s, chart })
            }
            (Target::Charts(s), "getItemAt") => {
                let i = arg_index(args, 0, "index")?;
                if i >= self.wb.worksheets[s].charts.len() {
                    return Err(invalid_reference(format!("no chart at index {i}")));
                }
                Target::Chart(ChartRef { sheet: s, chart: i })
            }
            (Target::SeriesCollection(c), "getItemAt") => {
                let i = arg_index(args, 0, "index")?;
                if i >= self.chart(c).series.len() {
                    return Err(invalid_reference(format!(
                        "chart '{}' has no series at index {i}",
                        self.chart(c).name
                    )));
                }
                Target::Series(c, i)
            }
            _ => return Ok(None),
        };
        Ok(Some(next))
    }

    /// Read `path`, which may step through related objects (`protection/protected`).
    fn load_path(&self, target: Target, path: &str) -> ExecResult<Value> {
        let mut parts: Vec<&str> = path.split('/').collect();
        let last = parts.pop().unwrap_or_default();
        let mut target = target;
        for part in parts {
            target = self.property_step(target, part)?;
        }
        self.load(target, last)
    }

    fn load(&self, target: Target, property: &str) -> ExecResult<Value> {
        let value = match (target, property) {
            (Target::Worksheets, "count") => Value::from(self.wb.worksheets.len() as u32),
            (Target::Worksheet(s), "name") => Value::from(self.wb.worksheets[s].name.as_str()),
            (Target::Worksheet(s), "position") => Value::from(s as u32),
            (Target::Tables(s), "count") => Value::from(self.wb.worksheets[s].tables.len() as u32),
            (Target::Table(t), "name") => Value::from(self.table(t).name.as_str()),
            (Target::Table(t), "rowCount") => Value::from(self.table(t).rows.len() as u32),
            (Target::Table(t), "visibleRowCount") => Value::from(self.table(t).visible_row_count() as u32),
            (Target::TableRows(t), "count") => Value::from(self.table(t).rows.len() as u32),
            (Target::TableColumns(t), "count") => Value::from(self.table(t).columns.len() as u32),
            (Target::TableColumn(t, c), "name") => Value::from(self.table(t).columns[c].as_str()),
            (Target::TableColumn(_, c), "index") => Value::from(c as u32),
            (Target::TableColumn(t, c), "values") => {
                let range = self.table(t).column_range(c);
                self.wb.worksheets[t.sheet].range_values(&range)
            }
            (Target::TableColumn(t, c), "filter") | (Target::ColumnFilter(t, c), "criteria") => {
                self.filter_criteria(t, c)
            }
            (Target::TableSort(t), "fields") => Value::List(
                self.table(t)
                    .sort_fields
                    .iter()
                    .map(|f| {
                        Value::Object(BTreeMap::from([
                            ("key".to_string(), Value::from(f.key as u32)),
                            ("ascending".to_string(), Value::from(f.ascending)),
                        ]))
                    })
                    .collect(),
            ),
            (Target::Range(s, r), "address") => {
                Value::from(format!("{}!{r}", self.wb.worksheets[s].name))
            }
            (Target::Range(s, r), "values") => self.wb.worksheets[s].range_values(&r),
            (Target::Range(s, r), "text") => match self.wb.worksheets[s].range_values(&r) {
                Value::List(rows) => Value::List(
                    rows.iter()
                        .map(|row| {
                            Value::List(
                                row.as_list()
                                    .unwrap_or_default()
                                    .iter()
                                    .map(|v| Value::from(display_text(v)))
                                    .collect(),
                            )
                        })
                        .collect(),
                ),
                other => other,
            },
            (Target::Range(s, r), "numberFormat") => self.wb.worksheets[s].range_number_formats(&r),
            (Target::Range(_, r), "rowCount") => Value::from(r.row_count()),
            (Target::Range(_, r), "columnCount") => Value::from(r.col_count() as u32),
            (Target::Charts(s), "count") => Value::from(self.wb.worksheets[s].charts.len() as u32),
            (Target::Chart(c), "name") => Value::from(self.chart(c).name.as_str()),
            (Target::Chart(c), "chartType") => Value::from(self.chart(c).chart_type.as_str()),
            (Target::Chart(c), "topLeftCell") => Value::from(self.chart(c).top_left.clone()),
            (Target::Chart(c), "bottomRightCell") => Value::from(self.chart(c).bottom_right.clone()),
            (Target::ChartTitle(c), "text") => Value::from(self.chart(c).title.clone()),
            (Target::ChartLegend(c), "position") => Value::from(self.chart(c).legend_position.as_str()),
            (Target::LegendFill(c), "color") => Value::from(self.chart(c).legend_fill.clone()),
            (Target::DataLabelsFont(c), "size") => Value::from(self.chart(c).data_label_font_size),
            (Target::DataLabelsFont(c), "color") => {
                Value::from(self.chart(c).data_label_font_color.as_str())
            }
            (Target::SeriesCollection(c), "count") => Value::from(self.chart(c).series.len() as u32),
            (Target::Series(c, i), "name") => Value::from(self.chart(c).series[i].name.as_str()),
            (Target::Protection(s), "protected") => Value::from(self.wb.worksheets[s].protected),
            (Target::FreezePanes(s), "frozenRows") => Value::from(self.wb.worksheets[s].frozen_rows),
            (Target::FreezePanes(s), "frozenColumns") => Value::from(self.wb.worksheets[s].frozen_columns),
            _ => return Err(unknown_member(target.kind(), property)),
        };
        Ok(value)
    }

    fn set(&mut self, target: Target, property: &str, value: &Value) -> ExecResult<()> {
        match (target, property) {
            (Target::Worksheet(s), "name") => {
                let name = expect_str(value, "Worksheet.name")?;
                if self.wb.sheet_index(name).is_some_and(|other| other != s) {
                    return Err(invalid_argument(format!("worksheet '{name}' already exists")));
                }
                self.wb.worksheets[s].name = name.to_string();
            }
            (Target::Table(t), "name") => {
                let name = expect_str(value, "Table.name")?;
                if !is_valid_table_name(name) {
                    return Err(invalid_argument(format!("'{name}' is not a valid table name")));
                }
                if let Some(existing) = self.wb.find_table(name) {
                    if existing != (t.sheet, t.table) {
                        return Err(invalid_argument(format!("a table named '{name}' already exists")));
                    }
                }
                self.table_mut(t).name = name.to_string();
            }
            (Target::TableColumn(t, c), "name") => {
                let name = expect_str(value, "TableColumn.name")?;
                let header = self.table(t).header_range();
                let cell = CellAddress::new(header.start.row, header.start.col + c as u16);
                self.wb.worksheets[t.sheet].set_cell(cell, Value::from(name))?;
            }
            (Target::Range(s, r), "values") => self.wb.worksheets[s].set_range_values(&r, value)?,
            (Target::Range(s, r), "numberFormat") => {
                self.wb.worksheets[s].set_range_number_formats(&r, value)?
            }
            (Target::Chart(c), "name") => {
                let name = expect_str(value, "Chart.name")?;
                self.chart_mut(c).name = name.to_string();
            }
            (Target::ChartTitle(c), "text") => {
                let text = expect_str(value, "ChartTitle.text")?;
                self.chart_mut(c).title = Some(text.to_string());
            }
            (Target::ChartLegend(c), "position") => {
                let position = expect_str(value, "ChartLegend.position")?;
                if !LEGEND_POSITIONS.contains(&position) {
                    return Err(invalid_argument(format!("unknown legend position '{position}'")));
                }
                self.chart_mut(c).legend_position = position.to_string();
            }
            (Target::DataLabelsFont(c), "size") => {
                let size = value
                    .as_f64()
                    .ok_or_else(|| type_mismatch("ChartFont.size", "number", value.type_name()))?;
                if !(1.0..=409.0).contains(&size) {
                    return Err(invalid_argument(format!("font size {size} out of range")));
                }
                self.chart_mut(c).data_label_font_size = size;
            }
            (Target::DataLabelsFont(c), "color") => {
                let color = expect_str(value, "ChartFont.color")?;
                self.chart_mut(c).data_label_font_color = color.to_string();
            }
            (Target::Series(c, i), "name") => {
                let name = expect_str(value, "ChartSeries.name")?;
                self.chart_mut(c).series[i].name = name.to_string();
            }
            _ => return Err(unknown_member(target.kind(), property)),
        }
        Ok(())
    }

    fn invoke(&mut self, target: Target, method: &str, args: &[Value]) -> ExecResult<Target> {
        if let Some(next) = self.call_step(target, method, args)? {
            return Ok(next);
        }

        match (target, method) {
            (Target::Worksheets, "add") => {
                let name = match args.first() {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(arg_str(args, 0, "name")?),
                };
                let s = self.wb.add_worksheet(name)?;
                Ok(Target::Worksheet(s))
            }
            (Target::Worksheet(s), "activate") => {
                self.wb.active = s;
                Ok(Target::Nothing)
            }
            (Target::Tables(s), "add") => {
                self.ensure_unprotected(target)?;
                let range = self.range_arg(s, args, 0)?;
                let has_headers = arg_bool(args, 1, "hasHeaders")?;
                let table = self.wb.worksheets[s].add_table(range, has_headers)?;
                let name = (1..)
                    .map(|i| format!("Table{i}"))
                    .find(|n| self.wb.find_table(n).is_none())
                    .unwrap_or_default();
                self.wb.worksheets[s].tables[table].name = name;
                Ok(Target::Table(TableRef { sheet: s, table }))
            }
            (Target::TableRows(t), "add") => {
                self.ensure_unprotected(target)?;
                let index = match args.first() {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(arg_index(args, 0, "index")?),
                };
                let values = args
                    .get(1)
                    .ok_or_else(|| invalid_argument("rows.add requires values"))?;
                self.wb.worksheets[t.sheet].add_table_rows(t.table, index, values)?;
                Ok(Target::Nothing)
            }
            (Target::ColumnFilter(t, c), "applyValuesFilter") => {
                self.ensure_unprotected(target)?;
                let values = args
                    .first()
                    .and_then(Value::as_list)
                    .ok_or_else(|| invalid_argument("applyValuesFilter requires a list of values"))?;
                let keep = values.iter().map(display_text).collect();
                self.table_mut(t).filters.insert(c, keep);
                Ok(Target::Nothing)
            }
            (Target::ColumnFilter(t, c), "clear") => {
                self.ensure_unprotected(target)?;
                self.table_mut(t).filters.remove(&c);
                Ok(Target::Nothing)
            }
            (Target::TableSort(t), "apply") => {
                self.ensure_unprotected(target)?;
                let fields = args
                    .first()
                    .and_then(Value::as_list)
                    .ok_or_else(|| invalid_argument("sort.apply requires a list of sort fields"))?
                    .iter()
                    .map(parse_sort_field)
                    .collect::<ExecResult<Vec<_>>>()?;
                self.table_mut(t).sort(fields)?;
                Ok(Target::Nothing)
            }
            (Target::TableSort(t), "clear") => {
                self.table_mut(t).sort_fields.clear();
                Ok(Target::Nothing)
            }
            (Target::RangeFormat(s, r), "autofitColumns") => {
                self.ensure_unprotected(target)?;
                self.wb.worksheets[s]
                    .autofit_columns
                    .extend(r.start.col..=r.end.col);
                Ok(Target::Nothing)
            }
            (Target::RangeFormat(s, r), "autofitRows") => {
                self.ensure_unprotected(target)?;
                self.wb.worksheets[s].autofit_rows.extend(r.start.row..=r.end.row);
                Ok(Target::Nothing)
            }
            (Target::Charts(s), "add") => {
                self.ensure_unprotected(target)?;
                let chart_type = arg_str(args, 0, "type")?;
                let source = self.range_arg(s, args, 1)?;
                let series_by = match args.get(2) {
                    None | Some(Value::Null) => "Auto",
                    Some(_) => arg_str(args, 2, "seriesBy")?,
                };
                let chart = self.wb.worksheets[s].add_chart(chart_type, source, series_by)?;
                Ok(Target::Chart(ChartRef { sheet: s, chart }))
            }
            (Target::Chart(c), "setPosition") => {
                self.ensure_unprotected(target)?;
                let start = self.range_arg(c.sheet, args, 0)?;
                let end = match args.get(1) {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(self.range_arg(c.sheet, args, 1)?),
                };
                let chart = self.chart_mut(c);
                chart.top_left = Some(start.start.to_string());
                chart.bottom_right = end.map(|r| r.end.to_string());
                Ok(Target::Nothing)
            }
            (Target::LegendFill(c), "setSolidColor") => {
                self.ensure_unprotected(target)?;
                let color = arg_str(args, 0, "color")?;
                self.chart_mut(c).legend_fill = Some(color.to_string());
                Ok(Target::Nothing)
            }
            (Target::LegendFill(c), "clear") => {
                self.ensure_unprotected(target)?;
                self.chart_mut(c).legend_fill = None;
                Ok(Target::Nothing)
            }
            (Target::Protection(s), "protect") => {
                self.wb.worksheets[s].protected = true;
                Ok(Target::Nothing)
            }
            (Target::Protection(s), "unprotect") => {
                self.wb.worksheets[s].protected = false;
                Ok(Target::Nothing)
            }
            (Target::FreezePanes(s), "freezeRows") => {
                self.ensure_unprotected(target)?;
                let count = arg_count(args, 0)?;
                self.wb.worksheets[s].frozen_rows = count;
                Ok(Target::Nothing)
            }
            (Target::FreezePanes(s), "freezeColumns") => {
                self.ensure_unprotected(target)?;
                let count = arg_count(args, 0)?;
                self.wb.worksheets[s].frozen_columns = count;
                Ok(Target::Nothing)
            }
            (Target::FreezePanes(s), "unfreeze") => {
                self.ensure_unprotected(target)?;
                let ws = &mut self.wb.worksheets[s];
                ws.frozen_rows = 0;
                ws.frozen_columns = 0;
                Ok(Target::Nothing)
            }
            _ => Err(unknown_member(target.kind(), method)),
        }
    }

    fn ensure_unprotected(&self, target: Target) -> ExecResult<()> {
        match target.sheet() {
            Some(s) if self.wb.worksheets[s].protected => {
                Err(permission_denied(&self.wb.worksheets[s].name))
            }
            _ => Ok(()),
        }
    }

    /// A range argument: an A1 address on `sheet`, or a reference to a range.
    fn range_arg(&self, sheet: usize, args: &[Value], index: usize) -> ExecResult<RangeAddress> {
        match args.get(index) {
            Some(Value::String(address)) => RangeAddress::parse(address)
                .map_err(|e| invalid_argument(format!("bad address '{address}': {e}"))),
            Some(Value::Ref { entity }) => match self.resolve(entity)? {
                Target::Range(s, range) if s == sheet => Ok(range),
                Target::Range(..) => Err(invalid_argument("range belongs to another worksheet")),
                other => Err(type_mismatch("range argument", "Range", other.kind())),
            },
            Some(other) => Err(type_mismatch("range argument", "address or Range", other.type_name())),
            None => Err(invalid_argument(format!("missing range argument {index}"))),
        }
    }

    fn filter_criteria(&self, t: TableRef, c: usize) -> Value {
        match self.table(t).filters.get(&c) {
            Some(values) => Value::Object(BTreeMap::from([
                ("filterOn".to_string(), Value::from("Values")),
                (
                    "values".to_string(),
                    Value::List(values.iter().map(|v| Value::from(v.as_str())).collect()),
                ),
            ])),
            None => Value::Object(BTreeMap::from([(
                "filterOn".to_string(),
                Value::from("None"),
            )])),
        }
    }

    fn table(&self, t: TableRef) -> &crate::model::Table {
        &self.wb.worksheets[t.sheet].tables[t.table]
    }

    fn table_mut(&mut self, t: TableRef) -> &mut crate::model::Table {
        &mut self.wb.worksheets[t.sheet].tables[t.table]
    }

    fn chart(&self, c: ChartRef) -> &crate::model::Chart {
        &self.wb.worksheets[c.sheet].charts[c.chart]
    }

    fn chart_mut(&mut self, c: ChartRef) -> &mut crate::model::Chart {
        &mut self.wb.worksheets[c.sheet].charts[c.chart]
    }
}

fn expect_str<'v>(value: &'v Value, what: &str) -> ExecResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| type_mismatch(what, "string", value.type_name()))
}

fn arg_str<'a>(args: &'a [Value], index: usize, name: &str) -> ExecResult<&'a str> {
    match args.get(index) {
        Some(value) => expect_str(value, name),
        None => Err(invalid_argument(format!("missing argument '{name}'"))),
    }
}

fn arg_bool(args: &[Value], index: usize, name: &str) -> ExecResult<bool> {
    match args.get(index) {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| type_mismatch(name, "bool", value.type_name())),
        None => Err(invalid_argument(format!("missing argument '{name}'"))),
    }
}

fn arg_index(args: &[Value], index: usize, name: &str) -> ExecResult<usize> {
    let value = args
        .get(index)
        .ok_or_else(|| invalid_argument(format!("missing argument '{name}'")))?;
    let n = value
        .as_f64()
        .ok_or_else(|| type_mismatch(name, "number", value.type_name()))?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(invalid_argument(format!("{name} must be a non-negative integer, got {n}")));
    }
    Ok(n as usize)
}

fn arg_count(args: &[Value], index: usize) -> ExecResult<u32> {
    let n = arg_index(args, index, "count")?;
    u32::try_from(n).map_err(|_| invalid_argument(format!("count {n} too large")))
}

fn parse_sort_field(value: &Value) -> ExecResult<SortField> {
    let fields = value
        .as_object()
        .ok_or_else(|| type_mismatch("sort field", "object", value.type_name()))?;
    let key = fields
        .get("key")
        .ok_or_else(|| invalid_argument("sort field requires 'key'"))?;
    let key = arg_index(std::slice::from_ref(key), 0, "key")?;
    let ascending = match fields.get("ascending") {
        None | Some(Value::Null) => true,
        Some(v) => v
            .as_bool()
            .ok_or_else(|| type_mismatch("ascending", "bool", v.type_name()))?,
    };
    Ok(SortField { key, ascending })
}

/// Table names start with a letter or underscore, contain no spaces, and
/// cannot look like a cell reference.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && CellAddress::parse(name).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_protocol::RemoteErrorKind;
    use pretty_assertions::assert_eq;

    fn sheet_path() -> EntityPath {
        EntityPath::workbook()
            .child(Segment::property("worksheets"))
            .child(Segment::call("getActiveWorksheet", vec![]))
    }

    fn load(id: u64, target: EntityPath, props: &[&str]) -> Operation {
        Operation::Load {
            id: OpId(id),
            target,
            properties: props.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn invoke(id: u64, target: EntityPath, method: &str, args: Vec<Value>) -> Operation {
        Operation::Invoke {
            id: OpId(id),
            target,
            method: method.to_string(),
            args,
        }
    }

    fn set(id: u64, target: EntityPath, property: &str, value: Value) -> Operation {
        Operation::Set {
            id: OpId(id),
            target,
            property: property.to_string(),
            value,
        }
    }

    #[test]
    fn test_later_ops_see_earlier_effects() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let tables = sheet_path().child(Segment::property("tables"));
        let ops = vec![
            invoke(0, tables, "add", vec![Value::from("A1:B1"), Value::from(true)]),
            set(1, EntityPath::op_result(OpId(0)), "name", Value::from("People")),
            invoke(
                2,
                EntityPath::op_result(OpId(0)).child(Segment::property("rows")),
                "add",
                vec![Value::Null, Value::matrix([["Ada", "36"], ["Brian", "41"]])],
            ),
            load(
                3,
                EntityPath::op_result(OpId(0)).child(Segment::call("getRange", vec![])),
                &["address", "rowCount"],
            ),
        ];
        let loads = execute_batch(&mut wb, &mut results, &ops).unwrap();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].values["address"], Value::from("Sheet1!A1:B3"));
        assert_eq!(loads[0].values["rowCount"], Value::from(3));
        assert_eq!(wb.active_sheet().tables[0].name, "People");
    }

    #[test]
    fn test_table_does_not_grow_over_neighbors() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let tables = sheet_path().child(Segment::property("tables"));
        let rows = |op| EntityPath::op_result(OpId(op)).child(Segment::property("rows"));
        execute_batch(
            &mut wb,
            &mut results,
            &[
                invoke(0, tables.clone(), "add", vec![Value::from("A1:B1"), Value::from(true)]),
                invoke(1, tables, "add", vec![Value::from("A4:B4"), Value::from(true)]),
                invoke(2, rows(0), "add", vec![Value::Null, Value::matrix([["a", "1"], ["b", "2"]])]),
            ],
        )
        .unwrap();
        assert_eq!(wb.active_sheet().tables[0].full_range().to_string(), "A1:B3");

        let err = execute_batch(
            &mut wb,
            &mut results,
            &[invoke(3, rows(0), "add", vec![Value::Null, Value::matrix([["c", "3"]])])],
        )
        .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidArgument);
        assert_eq!(err.op, Some(OpId(3)));
        assert!(err.message.contains("overlap"), "{}", err.message);

        let ws = wb.active_sheet();
        assert_eq!(ws.tables[0].rows.len(), 2);
        assert_eq!(ws.tables[1].full_range().to_string(), "A4:B5");
    }

    #[test]
    fn test_table_does_not_grow_over_cells() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let tables = sheet_path().child(Segment::property("tables"));
        let below = sheet_path().child(Segment::call("getRange", vec![Value::from("B3")]));
        let rows = EntityPath::op_result(OpId(1)).child(Segment::property("rows"));
        execute_batch(
            &mut wb,
            &mut results,
            &[
                set(0, below, "values", Value::matrix([["note"]])),
                invoke(1, tables, "add", vec![Value::from("A1:B1"), Value::from(true)]),
                // The first data row replaces the blank row, so this fits.
                invoke(2, rows.clone(), "add", vec![Value::Null, Value::matrix([["a", "1"]])]),
            ],
        )
        .unwrap();

        let err = execute_batch(
            &mut wb,
            &mut results,
            &[invoke(3, rows, "add", vec![Value::Null, Value::matrix([["b", "2"]])])],
        )
        .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidArgument);
        assert!(err.message.contains("B3"), "{}", err.message);
        assert_eq!(wb.active_sheet().cell(CellAddress::parse("B3").unwrap()), Value::from("note"));
    }

    #[test]
    fn test_failed_batch_commits_nothing() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let tables = sheet_path().child(Segment::property("tables"));
        let ops = vec![
            invoke(0, tables.clone(), "add", vec![Value::from("A1:B1"), Value::from(true)]),
            set(1, EntityPath::op_result(OpId(0)), "name", Value::from("has space")),
        ];
        let err = execute_batch(&mut wb, &mut results, &ops).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidArgument);
        assert_eq!(err.op, Some(OpId(1)));
        assert!(wb.active_sheet().tables.is_empty());
        assert!(results.is_empty());

        // The failed batch's results are not addressable afterwards.
        let err = execute_batch(
            &mut wb,
            &mut results,
            &[load(2, EntityPath::op_result(OpId(0)), &["name"])],
        )
        .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::StaleHandle);
    }

    #[test]
    fn test_protected_sheet_rejects_mutation() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let protection = sheet_path().child(Segment::property("protection"));
        execute_batch(&mut wb, &mut results, &[invoke(0, protection.clone(), "protect", vec![])]).unwrap();

        let range = sheet_path().child(Segment::call("getRange", vec![Value::from("A1")]));
        let err = execute_batch(
            &mut wb,
            &mut results,
            &[set(1, range.clone(), "values", Value::matrix([["x"]]))],
        )
        .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::PermissionDenied);

        // Loads and unprotect still work.
        let loads = execute_batch(
            &mut wb,
            &mut results,
            &[
                load(2, sheet_path(), &["protection/protected"]),
                invoke(3, protection, "unprotect", vec![]),
                set(4, range, "values", Value::matrix([["x"]])),
            ],
        )
        .unwrap();
        assert_eq!(loads[0].values["protection/protected"], Value::Bool(true));
        assert_eq!(wb.active_sheet().cells.len(), 1);
    }

    #[test]
    fn test_unknown_member_and_reference() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let err = execute_batch(&mut wb, &mut results, &[load(0, sheet_path(), &["colour"])]).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::UnknownMember);

        let missing = sheet_path()
            .child(Segment::property("tables"))
            .child(Segment::call("getItem", vec![Value::from("Nope")]));
        let err = execute_batch(&mut wb, &mut results, &[load(1, missing, &["name"])]).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::InvalidReference);
    }

    #[test]
    fn test_number_format_type_mismatch() {
        let mut wb = Workbook::default();
        let mut results = SessionResults::new();
        let range = sheet_path().child(Segment::call("getRange", vec![Value::from("A1:A2")]));
        let err = execute_batch(
            &mut wb,
            &mut results,
            &[set(0, range, "numberFormat", Value::matrix([[1.5]]))],
        )
        .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::TypeMismatch);
    }

    #[test]
    fn test_table_names() {
        assert!(is_valid_table_name("ExpensesTable"));
        assert!(is_valid_table_name("_t.2"));
        assert!(!is_valid_table_name("A1"));
        assert!(!is_valid_table_name("2020"));
        assert!(!is_valid_table_name("my table"));
        assert!(!is_valid_table_name(""));
    }
}
