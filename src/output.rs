//! Row sinks for extracted data.

use std::io::{self, Write};

use serde_json::{Map, Value};

use crate::query::unique_names;
use crate::settings::{OutputFormat, OutputSettings};

/// Destination for the rows of one statement.
pub trait RowSink {
    /// Called once before the first row.
    fn begin(&mut self, columns: &[String]) -> io::Result<()>;

    fn write_row(&mut self, row: &[Option<String>]) -> io::Result<()>;

    /// Flush everything; no rows follow.
    fn finish(&mut self) -> io::Result<()>;
}

/// Delimiter-separated text. Fields containing the delimiter, a quote or a
/// line break are quoted, with quotes doubled.
pub struct DelimitedWriter<W: Write> {
    out: W,
    delimiter: char,
    null: String,
    header: bool,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(out: W, delimiter: char, null: impl Into<String>, header: bool) -> Self {
        Self {
            out,
            delimiter,
            null: null.into(),
            header,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn field(&self, value: &str) -> String {
        let needs_quotes = value.contains(self.delimiter)
            || value.contains('"')
            || value.contains('\n')
            || value.contains('\r');
        if needs_quotes {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    fn write_line<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> io::Result<()> {
        let line: Vec<String> = fields.map(|f| self.field(f)).collect();
        let mut buf = [0u8; 4];
        let sep: &str = self.delimiter.encode_utf8(&mut buf);
        writeln!(self.out, "{}", line.join(sep))
    }
}

impl<W: Write> RowSink for DelimitedWriter<W> {
    fn begin(&mut self, columns: &[String]) -> io::Result<()> {
        if self.header {
            self.write_line(columns.iter().map(String::as_str))?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &[Option<String>]) -> io::Result<()> {
        let null = self.null.clone();
        let fields: Vec<&str> = row
            .iter()
            .map(|cell| cell.as_deref().unwrap_or(&null))
            .collect();
        self.write_line(fields.into_iter())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// One JSON object per line, keyed by column name. Repeated names are
/// suffixed so no value is overwritten.
pub struct JsonLinesWriter<W: Write> {
    out: W,
    columns: Vec<String>,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            columns: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowSink for JsonLinesWriter<W> {
    fn begin(&mut self, columns: &[String]) -> io::Result<()> {
        self.columns = unique_names(columns);
        Ok(())
    }

    fn write_row(&mut self, row: &[Option<String>]) -> io::Result<()> {
        let mut map = Map::new();
        for (i, cell) in row.iter().enumerate() {
            let name = self
                .columns
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("col{}", i));
            let value = cell.clone().map(Value::String).unwrap_or(Value::Null);
            map.insert(name, value);
        }
        serde_json::to_writer(&mut self.out, &Value::Object(map))?;
        self.out.write_all(b"\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// A boxed sink for `settings.format` writing into `out`.
pub fn sink_for<W: Write + Send + 'static>(settings: &OutputSettings, out: W) -> Box<dyn RowSink + Send> {
    match settings.format {
        OutputFormat::Delimited => Box::new(DelimitedWriter::new(
            out,
            settings.delimiter,
            settings.null.clone(),
            settings.header,
        )),
        OutputFormat::Jsonl => Box::new(JsonLinesWriter::new(out)),
    }
}

impl<S: RowSink + ?Sized> RowSink for Box<S> {
    fn begin(&mut self, columns: &[String]) -> io::Result<()> {
        (**self).begin(columns)
    }

    fn write_row(&mut self, row: &[Option<String>]) -> io::Result<()> {
        (**self).write_row(row)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}
