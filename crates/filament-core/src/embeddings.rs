use crate::{Error, Result};
use ndarray::Array2;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Node embeddings with external ids, in the experiment text format.
///
/// The format is a header line `"<row_count> <dim>"` followed by one line
/// per node: the external id, then `dim` floats, space-separated with a
/// trailing space before the newline.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    /// External node ids, one per row.
    pub ids: Vec<String>,
    /// Embedding values, shape `(ids.len(), dim)`.
    pub values: Array2<f32>,
}

impl EmbeddingTable {
    /// Build a table, validating the id list against the row count.
    pub fn new(ids: Vec<String>, values: Array2<f32>) -> Result<Self> {
        if ids.len() != values.nrows() {
            return Err(Error::RowCountMismatch {
                rows: values.nrows(),
                ids: ids.len(),
            });
        }
        Ok(Self { ids, values })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.values.ncols()
    }

    /// Write to `path` atomically.
    ///
    /// The table is written to a temporary sibling first and renamed into
    /// place on success, so a failed write never leaves a partial file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        {
            let file = File::create(&tmp)?;
            let mut out = BufWriter::new(file);
            writeln!(out, "{} {}", self.values.nrows(), self.values.ncols())?;
            for (id, row) in self.ids.iter().zip(self.values.rows()) {
                write!(out, "{id} ")?;
                for v in row {
                    write!(out, "{v} ")?;
                }
                writeln!(out)?;
            }
            out.flush()?;
        }

        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a table from `path`.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let parse_err = |line: usize, message: String| Error::Parse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .ok_or_else(|| parse_err(1, "empty file".into()))??;
        let mut parts = header.split_whitespace();
        let rows: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| parse_err(1, format!("bad header `{header}`")))?;
        let dim: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| parse_err(1, format!("bad header `{header}`")))?;

        let mut ids = Vec::with_capacity(rows);
        let mut data = Vec::with_capacity(rows * dim);
        for (i, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let id = tokens
                .next()
                .ok_or_else(|| parse_err(i + 2, "missing node id".into()))?;
            ids.push(id.to_string());
            let mut count = 0;
            for tok in tokens {
                let v: f32 = tok
                    .parse()
                    .map_err(|e| parse_err(i + 2, format!("bad value `{tok}`: {e}")))?;
                data.push(v);
                count += 1;
            }
            if count != dim {
                return Err(parse_err(
                    i + 2,
                    format!("expected {dim} values, got {count}"),
                ));
            }
        }

        if ids.len() != rows {
            return Err(parse_err(
                1,
                format!("header promised {rows} rows, found {}", ids.len()),
            ));
        }

        let values = Array2::from_shape_vec((rows, dim), data)
            .expect("row-major data matches counted shape");
        Self::new(ids, values)
    }
}
