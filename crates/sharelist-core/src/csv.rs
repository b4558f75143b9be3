//! CSV export and import of task tables.
//!
//! Export takes any slice of serializable rows (each must serialize to an
//! object); the header comes from the first row's keys. Import returns
//! string-keyed records in column order.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{clamp_difficulty, ListId, NewTask, Task, TaskStatus};

const EMPTY_INPUT: &str = "File is empty or could not be read.";
const NO_HEADER: &str = "CSV file has no header row.";

/// Export column layout for tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCsvRow {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub difficulty: Option<u8>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub order: i64,
    pub created_at: String,
}

impl From<&Task> for TaskCsvRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            status: task.status,
            difficulty: task.difficulty,
            description: task.description.clone(),
            assignee: task.assignee.clone(),
            order: task.order,
            created_at: task.created_at.to_rfc3339(),
        }
    }
}

/// One parsed CSV row, fields in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRecord {
    fields: Vec<(String, String)>,
}

impl CsvRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CsvRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl Serialize for CsvRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Render rows as CSV. An empty slice renders nothing.
pub fn render_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let objects = rows
        .iter()
        .map(|row| match serde_json::to_value(row)? {
            Value::Object(object) => Ok(object),
            _ => Err(Error::Csv("CSV rows must serialize to objects".to_string())),
        })
        .collect::<Result<Vec<_>>>()?;

    let Some(first) = objects.first() else {
        tracing::warn!("No data to export");
        return Ok(String::new());
    };
    let headers: Vec<String> = first.keys().cloned().collect();

    let mut lines = Vec::with_capacity(objects.len() + 1);
    lines.push(join_row(headers.iter().map(String::as_str)));
    for object in &objects {
        let cells: Vec<String> = headers
            .iter()
            .map(|header| cell_text(object.get(header)))
            .collect();
        lines.push(join_row(cells.iter().map(String::as_str)));
    }
    Ok(lines.join("\n"))
}

/// Parse CSV text into records keyed by the header row.
///
/// Header-only input yields no records; empty input is an error.
pub fn parse_csv(text: &str) -> Result<Vec<CsvRecord>> {
    if text.is_empty() {
        return Err(Error::Csv(EMPTY_INPUT.to_string()));
    }

    let mut rows = split_rows(text).into_iter().filter(|row| !is_blank(row));
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| Error::Csv(NO_HEADER.to_string()))?
        .into_iter()
        .map(|field| field.value)
        .collect();

    Ok(rows
        .map(|row| {
            let mut values = row.into_iter().map(|field| field.value);
            headers
                .iter()
                .map(|header| (header.clone(), values.next().unwrap_or_default()))
                .collect::<CsvRecord>()
        })
        .collect())
}

/// Render tasks with the fixed task columns
pub fn export_tasks_csv(tasks: &[Task]) -> Result<String> {
    let rows: Vec<TaskCsvRow> = tasks.iter().map(TaskCsvRow::from).collect();
    render_csv(&rows)
}

/// Map imported records to new tasks for `list_id`.
///
/// Imported tasks are appended after `existing` within their status group.
/// Rows without a title are skipped; other columns are optional and parsed
/// leniently.
pub fn import_tasks(list_id: &ListId, records: &[CsvRecord], existing: &[Task]) -> Result<Vec<NewTask>> {
    if let Some(first) = records.first() {
        if first.get("title").is_none() {
            return Err(Error::Csv("CSV has no title column".to_string()));
        }
    }

    let count = |done: bool| {
        i64::try_from(existing.iter().filter(|task| task.is_completed() == done).count())
            .unwrap_or(i64::MAX)
    };
    let mut next_active = count(false);
    let mut next_done = count(true);

    let mut tasks = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let title = record.get("title").unwrap_or_default().trim();
        if title.is_empty() {
            tracing::warn!(row = index + 1, "Skipping CSV row without a title");
            continue;
        }

        let mut task = NewTask::new(list_id.clone(), title);
        task.status = parse_status(record);
        task.difficulty = non_blank(record, "difficulty").and_then(parse_difficulty);
        task.description = non_blank(record, "description").map(str::to_string);
        task.assignee = non_blank(record, "assignee").map(str::to_string);

        let next = if task.status.is_completed() {
            &mut next_done
        } else {
            &mut next_active
        };
        task.order = *next;
        *next += 1;
        tasks.push(task);
    }
    Ok(tasks)
}

/// Deterministic default file name for exports
pub fn suggested_export_file_name(list_title: &str, timestamp_ms: i64) -> String {
    let slug = list_title
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        format!("sharelist-{timestamp_ms}.csv")
    } else {
        format!("sharelist-{slug}-{timestamp_ms}.csv")
    }
}

fn parse_status(record: &CsvRecord) -> TaskStatus {
    let raw = non_blank(record, "status").or_else(|| non_blank(record, "completed"));
    raw.map_or(TaskStatus::NotStarted, |value| {
        value.parse().unwrap_or_else(|error: String| {
            tracing::warn!(%error, "Unknown status in CSV, using not_started");
            TaskStatus::NotStarted
        })
    })
}

/// Accepts fractional scores (`4.5` rounds to `5`) and clamps to 0-10
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_difficulty(value: &str) -> Option<u8> {
    let score = value.parse::<f64>().ok()?;
    if !score.is_finite() || score < 0.0 {
        return None;
    }
    Some(clamp_difficulty(score.round().min(f64::from(u8::MAX)) as u8))
}

fn non_blank<'a>(record: &'a CsvRecord, column: &str) -> Option<&'a str> {
    record
        .get(column)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn join_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let line = cells.map(escape_cell).collect::<Vec<_>>().join(",");
    // A lone empty cell would read back as a blank line.
    if line.is_empty() {
        "\"\"".to_string()
    } else {
        line
    }
}

fn escape_cell(cell: &str) -> String {
    let needs_quotes = cell.contains([',', '"', '\n', '\r']) || cell.trim() != cell;
    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[derive(Debug, Default)]
struct Field {
    value: String,
    quoted: bool,
}

/// Split into rows of fields. Commas and newlines inside quotes are data;
/// `""` inside quotes is a literal quote. Unquoted fields are trimmed.
fn split_rows(text: &str) -> Vec<Vec<Field>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    // Length of the quoted content; text after the closing quote is trimmed.
    let mut quoted_len = 0;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                    quoted_len = field.len();
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if !quoted && field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quoted = true;
            }
            ',' => row.push(finish_field(&mut field, &mut quoted, quoted_len)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(finish_field(&mut field, &mut quoted, quoted_len));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if quoted || !field.is_empty() || !row.is_empty() {
        if in_quotes {
            quoted_len = field.len();
        }
        row.push(finish_field(&mut field, &mut quoted, quoted_len));
        rows.push(row);
    }
    rows
}

fn finish_field(field: &mut String, quoted: &mut bool, quoted_len: usize) -> Field {
    let raw = std::mem::take(field);
    let value = if *quoted {
        let (content, rest) = raw.split_at(quoted_len.min(raw.len()));
        format!("{content}{}", rest.trim())
    } else {
        raw.trim().to_string()
    };
    Field {
        value,
        quoted: std::mem::take(quoted),
    }
}

fn is_blank(row: &[Field]) -> bool {
    matches!(row, [only] if !only.quoted && only.value.is_empty())
}
