// CSV import/export

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use hermes_core::{Candidate, ExecutorRole, Order, OrderField, ParsedCandidate, RowError};

use crate::FormatError;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// What a CSV column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Field(OrderField),
    ExecutorName(ExecutorRole),
    ExecutorDate(ExecutorRole),
}

impl ColumnKey {
    pub fn value<'a>(&self, order: &'a Order) -> &'a str {
        match self {
            Self::Field(field) => order.field(*field),
            Self::ExecutorName(role) => &order.executor(*role).name,
            Self::ExecutorDate(role) => &order.executor(*role).date,
        }
    }
}

/// An export column: what to write and the header title to write it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: ColumnKey,
    pub title: String,
}

impl Column {
    pub fn new(key: ColumnKey, title: impl Into<String>) -> Self {
        Self { key, title: title.into() }
    }
}

/// Header language for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Titles {
    #[default]
    Russian,
    English,
}

// (key, russian title, english title), in export order
const COLUMN_TABLE: &[(ColumnKey, &str, &str)] = &[
    (ColumnKey::Field(OrderField::Id), "ID", "ID"),
    (ColumnKey::Field(OrderField::Date), "Дата заказа", "Date"),
    (ColumnKey::Field(OrderField::OrderNumber), "Номер заказа", "Order Number"),
    (ColumnKey::Field(OrderField::Diameter), "Диаметр (мм)", "Diameter (mm)"),
    (ColumnKey::Field(OrderField::Thickness), "Толщина (мм)", "Thickness (mm)"),
    (ColumnKey::Field(OrderField::TypeSize), "Типоразмер", "Type Size"),
    (ColumnKey::Field(OrderField::Cutting), "Раскрой", "Cutting"),
    (ColumnKey::Field(OrderField::BottomNumber), "Номер днища", "Bottom Number"),
    (ColumnKey::Field(OrderField::Material), "Материал", "Material"),
    (ColumnKey::Field(OrderField::HeatTreatment), "Режим ТО", "Heat Treatment"),
    (ColumnKey::Field(OrderField::TreatmentDate), "Дата ТО", "Treatment Date"),
    (ColumnKey::ExecutorName(ExecutorRole::Welder), "Сварщик", "Welder"),
    (ColumnKey::ExecutorDate(ExecutorRole::Welder), "Дата сварки", "Welding Date"),
    (ColumnKey::ExecutorName(ExecutorRole::Stamping), "Штамповка", "Stamping"),
    (ColumnKey::ExecutorDate(ExecutorRole::Stamping), "Дата штамповки", "Stamping Date"),
    (ColumnKey::ExecutorName(ExecutorRole::Flanging), "Отбортовка", "Flanging"),
    (ColumnKey::ExecutorDate(ExecutorRole::Flanging), "Дата отбортовки", "Flanging Date"),
    (ColumnKey::ExecutorName(ExecutorRole::Calibration), "Калибровка", "Calibration"),
    (ColumnKey::ExecutorDate(ExecutorRole::Calibration), "Дата калибровки", "Calibration Date"),
    (ColumnKey::ExecutorName(ExecutorRole::PlugWelder), "Сварщик (заглушки)", "Plug Welder"),
    (ColumnKey::ExecutorDate(ExecutorRole::PlugWelder), "Дата сварки заглушек", "Plug Welding Date"),
    (ColumnKey::ExecutorName(ExecutorRole::Cutter), "Резчик", "Cutter"),
    (ColumnKey::ExecutorDate(ExecutorRole::Cutter), "Дата резки", "Cutting Date"),
    (ColumnKey::Field(OrderField::CreatedAt), "Дата создания", "Created At"),
    (ColumnKey::Field(OrderField::UpdatedAt), "Дата обновления", "Updated At"),
];

/// The 25-column export layout.
pub fn default_columns(titles: Titles) -> Vec<Column> {
    COLUMN_TABLE
        .iter()
        .map(|(key, ru, en)| {
            let title = match titles {
                Titles::Russian => *ru,
                Titles::English => *en,
            };
            Column::new(*key, title)
        })
        .collect()
}

/// Map a normalized (trimmed, lower-cased) header to a column.
/// Accepts both title languages, camelCase field keys and executor role keys.
pub fn resolve_header(header: &str) -> Option<ColumnKey> {
    let header = header.trim().to_lowercase();
    for (key, ru, en) in COLUMN_TABLE {
        if header == ru.to_lowercase() || header == en.to_lowercase() {
            return Some(*key);
        }
    }
    if header == "status" || header == "статус" {
        return Some(ColumnKey::Field(OrderField::Status));
    }
    if let Some(field) = OrderField::from_key(&header) {
        return Some(ColumnKey::Field(field));
    }
    if let Some(role) = header.strip_suffix(" date").and_then(ExecutorRole::from_key) {
        return Some(ColumnKey::ExecutorDate(role));
    }
    ExecutorRole::from_key(&header).map(ColumnKey::ExecutorName)
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// One data row: normalized header → raw cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line of the row in the source text.
    pub line: usize,
    pub values: HashMap<String, String>,
}

impl CsvRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(String::as_str)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().replace('"', "").to_lowercase()
}

/// Parse CSV text into header-keyed rows.
///
/// Blank lines are skipped. The first remaining record is the header; at
/// least one data record must follow. Cell values are returned verbatim. A
/// row carrying non-empty cells beyond the header width is reported as a
/// row error rather than silently truncated.
pub fn parse(text: &str) -> Result<Vec<Result<CsvRow, RowError>>, FormatError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| FormatError::Csv(e.to_string()))?;
        // Only whitespace-only lines are blank; `,,,` is an (empty) row.
        if record.len() <= 1 && record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let Some(header) = headers.as_ref() else {
            headers = Some(record.iter().map(normalize_header).collect());
            continue;
        };

        let extra = record.iter().skip(header.len()).filter(|c| !c.trim().is_empty()).count();
        if extra > 0 {
            rows.push(Err(RowError {
                line,
                message: format!(
                    "row has {} cells but the header has {} columns",
                    record.len(),
                    header.len()
                ),
            }));
            continue;
        }

        let mut values = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            values.insert(name.clone(), record.get(idx).unwrap_or("").to_string());
        }
        rows.push(Ok(CsvRow { line, values }));
    }

    if headers.is_none() {
        return Err(FormatError::Csv("file is empty".into()));
    }
    if rows.is_empty() {
        return Err(FormatError::Csv("no data rows after the header".into()));
    }
    Ok(rows)
}

/// Header-mapping step: turn parsed rows into import candidates.
///
/// Values are trimmed. Unknown columns are ignored, as are id, status and
/// timestamp columns, which the reconciler owns.
pub fn to_candidates(rows: Vec<Result<CsvRow, RowError>>) -> Vec<ParsedCandidate> {
    rows.into_iter()
        .map(|row| row.map(|row| row_to_candidate(&row)))
        .collect()
}

fn row_to_candidate(row: &CsvRow) -> Candidate {
    let mut candidate = Candidate { line: row.line, ..Candidate::default() };

    for (header, raw) in &row.values {
        let Some(key) = resolve_header(header) else {
            continue;
        };
        let value = raw.trim().to_string();
        match key {
            ColumnKey::Field(field) => match field {
                OrderField::Date => candidate.date = value,
                OrderField::OrderNumber => candidate.order_number = value,
                OrderField::Diameter => candidate.diameter = value,
                OrderField::Thickness => candidate.thickness = value,
                OrderField::TypeSize => candidate.type_size = value,
                OrderField::Cutting => candidate.cutting = value,
                OrderField::BottomNumber => candidate.bottom_number = value,
                OrderField::Material => candidate.material = value,
                OrderField::HeatTreatment => candidate.heat_treatment = value,
                OrderField::TreatmentDate => candidate.treatment_date = value,
                OrderField::Id | OrderField::Status | OrderField::CreatedAt | OrderField::UpdatedAt => {}
            },
            ColumnKey::ExecutorName(role) => candidate.executor_mut(role).name = value,
            ColumnKey::ExecutorDate(role) => candidate.executor_mut(role).date = value,
        }
    }

    candidate
}

/// Parse and map in one step.
pub fn parse_candidates(text: &str) -> Result<Vec<ParsedCandidate>, FormatError> {
    Ok(to_candidates(parse(text)?))
}

// ---------------------------------------------------------------------------
// Serialize
// ---------------------------------------------------------------------------

/// Serialize orders under the given columns. Cells containing a comma,
/// quote or line break are quoted with inner quotes doubled.
pub fn serialize<'a, I>(orders: I, columns: &[Column]) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer
        .write_record(columns.iter().map(|c| c.title.as_str()))
        .map_err(|e| FormatError::Csv(format!("CSV write error: {e}")))?;

    for order in orders {
        writer
            .write_record(columns.iter().map(|c| c.key.value(order)))
            .map_err(|e| FormatError::Csv(format!("CSV write error: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::Csv(format!("CSV flush error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| FormatError::Csv(e.to_string()))
}

/// Row selection for exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    /// Inclusive lower bound on `date` (ISO `YYYY-MM-DD` compares lexically).
    pub date_from: Option<String>,
    /// Inclusive upper bound on `date`.
    pub date_to: Option<String>,
    /// Case-insensitive substring on `material`.
    pub material: Option<String>,
    pub include_deleted: bool,
}

impl ExportFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if !self.include_deleted && !order.is_active() {
            return false;
        }
        if let Some(from) = &self.date_from {
            if order.date.is_empty() || order.date.as_str() < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.date_to {
            // Compare on the date prefix so "2024-05-01T10:00" still counts as 2024-05-01.
            let day = order.date.get(..to.len()).unwrap_or(&order.date);
            if order.date.is_empty() || day > to.as_str() {
                return false;
            }
        }
        if let Some(material) = &self.material {
            if !order.material.to_lowercase().contains(&material.to_lowercase()) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, orders: &'a [Order]) -> Vec<&'a Order> {
        orders.iter().filter(|o| self.matches(o)).collect()
    }
}

/// Default export file name: `orders_export_YYYY-MM-DD.csv`.
pub fn export_file_name(timestamp: &str) -> String {
    format!("orders_export_{}.csv", timestamp.get(..10).unwrap_or(timestamp))
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports from Excel).
pub fn read_file_as_utf8(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn import_file(path: &Path) -> Result<Vec<ParsedCandidate>, FormatError> {
    let content = read_file_as_utf8(path).map_err(|e| FormatError::Io(e.to_string()))?;
    parse_candidates(&content)
}

pub fn export_file<'a, I>(orders: I, columns: &[Column], path: &Path) -> Result<(), FormatError>
where
    I: IntoIterator<Item = &'a Order>,
{
    let text = serialize(orders, columns)?;
    std::fs::write(path, text).map_err(|e| FormatError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::Executor;
    use std::fs;
    use tempfile::tempdir;

    fn sample_order(number: &str) -> Order {
        let mut o = Order::new(number);
        o.date = "2024-03-15".into();
        o.material = "Acme, Inc.".into();
        o.cutting = "say \"hi\"".into();
        o.heat_treatment = "line one\nline two".into();
        o.bottom_number = "D-77".into();
        o.executors[0] = Executor::new("Иванов", "2024-03-16");
        o.executors[5] = Executor::new("Петров", "");
        o.created_at = "2024-03-15T08:00:00.000Z".into();
        o.updated_at = "2024-03-15T09:00:00.000Z".into();
        o
    }

    #[test]
    fn quoted_comma_is_one_cell() {
        let rows = parse("name,city\n\"Acme, Inc.\",Paris\n").unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("name"), Some("Acme, Inc."));
        assert_eq!(row.get("city"), Some("Paris"));
    }

    #[test]
    fn doubled_quote_is_literal() {
        let rows = parse("a,b\n\"say \"\"hi\"\"\",x\n").unwrap();
        assert_eq!(rows[0].as_ref().unwrap().get("a"), Some("say \"hi\""));
    }

    #[test]
    fn header_is_normalized() {
        let rows = parse(" \"Номер Заказа\" ,Material\nA-1,Steel\n").unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("номер заказа"), Some("A-1"));
        assert_eq!(row.get("material"), Some("Steel"));
    }

    #[test]
    fn blank_lines_are_dropped() {
        let rows = parse("\n\na,b\n\n1,2\n   \n3,4\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_ref().unwrap().get("a"), Some("3"));
    }

    #[test]
    fn separator_only_row_is_kept() {
        let rows = parse("a,b
1,2
,
3,4
").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].as_ref().unwrap().get("a"), Some(""));

        // It reaches the reconciler as a candidate without an order number.
        let candidates = parse_candidates("Order Number,Material
A-1,Steel
,
").unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].as_ref().unwrap().order_number, "");
    }

    #[test]
    fn short_rows_pad_with_empty() {
        let rows = parse("a,b,c\n1\n").unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("a"), Some("1"));
        assert_eq!(row.get("c"), Some(""));
    }

    #[test]
    fn overlong_row_is_row_error() {
        let rows = parse("a,b\n1,2\n1,2,3\n4,5,\n").unwrap();
        assert!(rows[0].is_ok());
        let err = rows[1].as_ref().unwrap_err();
        assert_eq!(err.line, 3);
        // Trailing empty cell is tolerated.
        assert!(rows[2].is_ok());
    }

    #[test]
    fn fewer_than_two_lines_is_format_error() {
        assert!(matches!(parse(""), Err(FormatError::Csv(_))));
        assert!(matches!(parse("a,b\n"), Err(FormatError::Csv(_))));
        assert!(matches!(parse("a,b\n\n  \n"), Err(FormatError::Csv(_))));
    }

    #[test]
    fn serialize_escapes_only_when_needed() {
        let order = sample_order("A-1");
        let columns = vec![
            Column::new(ColumnKey::Field(OrderField::OrderNumber), "Номер заказа"),
            Column::new(ColumnKey::Field(OrderField::Material), "Материал"),
            Column::new(ColumnKey::Field(OrderField::Cutting), "Раскрой"),
            Column::new(ColumnKey::Field(OrderField::Diameter), "Диаметр (мм)"),
        ];
        let text = serialize([&order], &columns).unwrap();
        assert_eq!(
            text,
            "Номер заказа,Материал,Раскрой,Диаметр (мм)\nA-1,\"Acme, Inc.\",\"say \"\"hi\"\"\",\n"
        );
    }

    #[test]
    fn roundtrip_preserves_every_exported_field() {
        let orders = vec![sample_order("A-1"), sample_order("B-2")];
        let columns = default_columns(Titles::Russian);
        let text = serialize(&orders, &columns).unwrap();

        let rows = parse(&text).unwrap();
        assert_eq!(rows.len(), 2);
        for (row, order) in rows.iter().zip(&orders) {
            let row = row.as_ref().unwrap();
            for column in &columns {
                let header = column.title.to_lowercase();
                assert_eq!(row.get(&header), Some(column.key.value(order)), "column {}", column.title);
            }
        }
    }

    #[test]
    fn candidates_from_russian_headers() {
        let text = "\
Номер заказа,Номер днища,Материал,Сварщик,Дата сварки,Резчик,Неизвестно,ID
A-1, D-1 ,Сталь,Иванов,2024-01-02,Петров,x,old-id
";
        let candidates = parse_candidates(text).unwrap();
        let c = candidates[0].as_ref().unwrap();
        assert_eq!(c.line, 2);
        assert_eq!(c.order_number, "A-1");
        assert_eq!(c.bottom_number, "D-1");
        assert_eq!(c.material, "Сталь");
        assert_eq!(c.executors[ExecutorRole::Welder.index()], Executor::new("Иванов", "2024-01-02"));
        assert_eq!(c.executors[ExecutorRole::Cutter.index()].name, "Петров");
    }

    #[test]
    fn candidates_from_english_and_internal_headers() {
        let text = "orderNumber,Bottom Number,typeSize,plug-welder,plug-welder date\nA-1,B-1,DN100,Sidorov,2024-02-02\n";
        let candidates = parse_candidates(text).unwrap();
        let c = candidates[0].as_ref().unwrap();
        assert_eq!(c.order_number, "A-1");
        assert_eq!(c.bottom_number, "B-1");
        assert_eq!(c.type_size, "DN100");
        let slot = &c.executors[ExecutorRole::PlugWelder.index()];
        assert_eq!(slot.name, "Sidorov");
        assert_eq!(slot.date, "2024-02-02");
    }

    #[test]
    fn resolve_header_table() {
        assert_eq!(resolve_header("дата то"), Some(ColumnKey::Field(OrderField::TreatmentDate)));
        assert_eq!(resolve_header("cutting"), Some(ColumnKey::Field(OrderField::Cutting)));
        assert_eq!(resolve_header("cutting date"), Some(ColumnKey::ExecutorDate(ExecutorRole::Cutter)));
        assert_eq!(resolve_header("сварщик (заглушки)"), Some(ColumnKey::ExecutorName(ExecutorRole::PlugWelder)));
        assert_eq!(resolve_header("colour"), None);
    }

    #[test]
    fn export_filter() {
        let mut a = sample_order("A-1");
        a.date = "2024-01-10".into();
        a.material = "Stainless".into();
        let mut b = sample_order("B-2");
        b.date = "2024-02-10".into();
        b.material = "Copper".into();
        let mut c = sample_order("C-3");
        c.status = hermes_core::OrderStatus::Deleted;
        let orders = vec![a, b, c];

        let all = ExportFilter::default().apply(&orders);
        assert_eq!(all.len(), 2);

        let with_deleted = ExportFilter { include_deleted: true, ..Default::default() }.apply(&orders);
        assert_eq!(with_deleted.len(), 3);

        let january = ExportFilter {
            date_from: Some("2024-01-01".into()),
            date_to: Some("2024-01-31".into()),
            ..Default::default()
        };
        let hits = january.apply(&orders);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].order_number, "A-1");

        let copper = ExportFilter { material: Some("copp".into()), ..Default::default() };
        assert_eq!(copper.apply(&orders)[0].order_number, "B-2");
    }

    #[test]
    fn export_file_name_uses_day() {
        assert_eq!(export_file_name("2024-05-06T10:11:12.000Z"), "orders_export_2024-05-06.csv");
    }

    #[test]
    fn windows_1252_file_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // "Café" in Windows-1252
        fs::write(&path, b"orderNumber,material\nA-1,Caf\xe9\n").unwrap();

        let candidates = import_file(&path).unwrap();
        assert_eq!(candidates[0].as_ref().unwrap().material, "Café");
    }

    #[test]
    fn export_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let orders = vec![sample_order("A-1")];
        export_file(&orders, &default_columns(Titles::English), &path).unwrap();

        let candidates = import_file(&path).unwrap();
        let c = candidates[0].as_ref().unwrap();
        assert_eq!(c.material, "Acme, Inc.");
        assert_eq!(c.heat_treatment, "line one\nline two");
        assert_eq!(c.executors[0].name, "Иванов");
    }
}
