use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rayon::prelude::*;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::tempdir;

/// Field separator: a string, or any one of several characters
#[derive(Debug, Clone)]
pub enum Delimiter {
    Str(String),
    Chars(Vec<char>),
}

impl From<&str> for Delimiter {
    fn from(s: &str) -> Self {
        Delimiter::Str(s.to_string())
    }
}

impl<const N: usize> From<&[char; N]> for Delimiter {
    fn from(chars: &[char; N]) -> Self {
        Delimiter::Chars(chars.to_vec())
    }
}

impl Delimiter {
    fn fields<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            Delimiter::Str(s) => Box::new(line.split(s.as_str())),
            Delimiter::Chars(chars) => Box::new(line.split(chars.as_slice())),
        }
    }

    /// Split `line` into trimmed words
    pub fn split_words(&self, line: &str) -> Vec<Box<str>> {
        self.fields(line)
            .map(|x| x.trim().to_owned().into_boxed_str())
            .collect()
    }

    /// `.csv` and `.csv.gz` are comma-separated; anything else is
    /// tab-separated
    pub fn from_file_name(file: &str) -> Self {
        match file_ext(file).as_deref() {
            Ok("csv") => Delimiter::from(","),
            _ => Delimiter::from("\t"),
        }
    }
}

///
/// Write each item on its own line
///
/// * `lines` - anything displayable
/// * `output_file` - file name (`.gz` to compress, or `stdout`)
///
pub fn write_lines<T: std::fmt::Display>(lines: &[T], output_file: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        match writeln!(buf, "{}", line) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    buf.flush()?;
    Ok(())
}

pub struct ReadLinesOut<T: Send> {
    pub lines: Vec<Vec<T>>,
    pub header: Vec<Box<str>>,
}

fn is_data_line(line: &str) -> bool {
    !(line.starts_with('#') || line.starts_with('%') || line.trim().is_empty())
}

///
/// Read a text file into lines of words. Comment lines (`#`, `%`)
/// and blank lines are skipped.
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - delimiter
/// * `hdr_line` - index of the header among the data lines (-1 = none);
///   lines before it are dropped
///
pub fn read_lines_of_words_delim(
    input_file: &str,
    delim: impl Into<Delimiter>,
    hdr_line: i64,
) -> anyhow::Result<ReadLinesOut<Box<str>>> {
    let delim = delim.into();

    let mut raw: Vec<Box<str>> = vec![];
    for line in open_buf_reader(input_file)?.lines() {
        let line = line?;
        if is_data_line(&line) {
            raw.push(line.into_boxed_str());
        }
    }

    let (header, body) = if hdr_line < 0 {
        (vec![], &raw[..])
    } else {
        let h = hdr_line as usize;
        if raw.len() <= h {
            return Err(anyhow::anyhow!("no header line {} in {}", h, input_file));
        }
        (delim.split_words(&raw[h]), &raw[(h + 1)..])
    };

    // splitting is the slow part; `collect` keeps the input order
    let lines = body.par_iter().map(|s| delim.split_words(s)).collect();

    Ok(ReadLinesOut { lines, header })
}

///
/// Read the header and the first field of every line, skipping the
/// rest. This gives the row and column names of a big delimited
/// matrix without parsing its values.
///
pub fn peek_delim_row_column_names(
    input_file: &str,
    delim: impl Into<Delimiter>,
) -> anyhow::Result<(Vec<Box<str>>, Vec<Box<str>>)> {
    let delim = delim.into();

    let mut header: Option<Vec<Box<str>>> = None;
    let mut row_names = vec![];

    for line in open_buf_reader(input_file)?.lines() {
        let line = line?;
        if !is_data_line(&line) {
            continue;
        }
        match header {
            None => header = Some(delim.split_words(&line)),
            Some(_) => {
                let first = delim.fields(&line).next().unwrap_or_default();
                row_names.push(first.trim().to_owned().into_boxed_str());
            }
        }
    }

    let header = header.ok_or(anyhow::anyhow!("no header line in {}", input_file))?;
    Ok((row_names, header.into_iter().skip(1).collect()))
}

///
/// Buffered reader, decompressing `.gz` files
///
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(input_file)?;
    if matches!(extension(input_file).as_deref(), Ok("gz")) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

///
/// Buffered writer, compressing `.gz` files; `stdout` and `stderr`
/// write to the console
///
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }
    if output_file.eq_ignore_ascii_case("stderr") {
        return Ok(Box::new(BufWriter::new(std::io::stderr())));
    }

    let file = File::create(output_file)?;
    if matches!(extension(output_file).as_deref(), Ok("gz")) {
        let encoder = GzEncoder::new(file, flate2::Compression::default());
        Ok(Box::new(BufWriter::new(encoder)))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

///
/// Create the parent directory of `file` if needed
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    let dir = Path::new(file)
        .parent()
        .ok_or(anyhow::anyhow!("no parent directory: {}", file))?;
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn os_to_boxed_str(x: &OsStr) -> anyhow::Result<Box<str>> {
    x.to_str()
        .map(|s| s.to_string().into_boxed_str())
        .ok_or(anyhow::anyhow!("failed to convert {:?} to string", x))
}

/// Last extension of a file name (`gz` for `net.tsv.gz`)
pub fn extension(file: &str) -> anyhow::Result<Box<str>> {
    let ext = Path::new(file)
        .extension()
        .ok_or(anyhow::anyhow!("no extension: {}", file))?;
    os_to_boxed_str(ext)
}

/// Format extension of a file, looking through a trailing `.gz`
/// (`tsv` for `net.tsv.gz`)
pub fn file_ext(file: &str) -> anyhow::Result<Box<str>> {
    let path = Path::new(file);
    if !matches!(extension(file).as_deref(), Ok("gz")) {
        return extension(file);
    }
    let stem = path
        .file_stem()
        .ok_or(anyhow::anyhow!("no file stem: {}", file))?;
    let inner = Path::new(stem)
        .extension()
        .ok_or(anyhow::anyhow!("no extension under .gz: {}", file))?;
    os_to_boxed_str(inner)
}

///
/// A fresh file name with the given suffix inside a temporary
/// directory
///
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<std::path::PathBuf> {
    let temp_dir = tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();
    Ok(temp_file)
}
