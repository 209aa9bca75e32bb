//! SQL import script generation for a directory of PDF files
//!
//! One `INSERT` per PDF. Values are interpolated into the statement text, not
//! bound as parameters: the output is meant for a trusted import, built from
//! local file names and local configuration. Single quotes are doubled so a
//! file name such as `O'Brien.pdf` still yields a valid statement.

use std::fmt::Write as _;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::Local;
use rand::Rng;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::scan::{scan_directory, PDF_EXTENSIONS};

/// Metadata defaults and locations for the SQL emitter
#[derive(Debug, Clone)]
pub struct SqlOptions {
    /// Target table name
    pub table: String,
    pub grade: i64,
    pub subject: String,
    /// Prefix joined with each file name to form its download URL
    pub url_base: String,
    pub description: String,
    pub status: String,
    /// Value written to the `size` column for every row
    pub size: i64,
    /// Inclusive range each row's `download_count` is drawn from
    pub download_range: RangeInclusive<u32>,
    /// Directory holding the PDF files
    pub docs_dir: PathBuf,
    /// Directory the SQL script is written to
    pub sql_dir: PathBuf,
    pub sql_file_name: String,
    /// Empty file created when `docs_dir` holds no PDFs
    pub placeholder_name: String,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            table: "pdf_files".to_string(),
            grade: 1,
            subject: "math".to_string(),
            url_base: "https://ycy88.com/pdf/0917/".to_string(),
            description: "网上资料，仅供个人使用，严禁商用！".to_string(),
            status: "enabled".to_string(),
            size: 1_024_000,
            download_range: 50..=100,
            docs_dir: PathBuf::from("./docs"),
            sql_dir: PathBuf::from("./sql"),
            sql_file_name: "insert_pdf_files.sql".to_string(),
            placeholder_name: "数学练习册第一章.pdf".to_string(),
        }
    }
}

impl SqlOptions {
    pub fn sql_path(&self) -> PathBuf {
        self.sql_dir.join(&self.sql_file_name)
    }
}

/// Outcome of a SQL generation run
#[derive(Debug, Clone)]
pub struct SqlReport {
    /// Where the script was written
    pub sql_path: PathBuf,
    /// File names, in statement order
    pub files: Vec<String>,
    /// Whether the placeholder PDF had to be created
    pub created_placeholder: bool,
    /// The generated script
    pub sql: String,
}

/// Derive a display name from a file name.
///
/// `"unit_test-file.pdf"` becomes `"Unit Test File"`: the extension is
/// dropped, `_` and `-` become spaces, and each word is capitalised.
pub fn display_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(dot) if dot + 1 < file_name.len() => &file_name[..dot],
        _ => file_name,
    };

    stem.replace(['_', '-'], " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Quote a value as a SQL string literal
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render the INSERT statement for one file
pub fn insert_statement(options: &SqlOptions, file_name: &str, download_count: u32) -> String {
    let name = quote(&display_name(file_name));
    format!(
        "INSERT INTO {table} (
  grade,
  subject,
  name,
  nickname,
  url,
  description,
  status,
  size,
  download_count,
  created_at,
  updated_at
) VALUES (
  {grade},
  {subject},
  {name},
  {name},
  {url},
  {description},
  {status},
  {size},
  {download_count},
  NOW(),
  NOW()
);
",
        table = options.table,
        grade = options.grade,
        subject = quote(&options.subject),
        url = quote(&format!("{}{}", options.url_base, file_name)),
        description = quote(&options.description),
        status = quote(&options.status),
        size = options.size,
    )
}

/// Build the full script: a header comment, then one statement per file
pub fn generate_sql<R: Rng>(options: &SqlOptions, files: &[String], rng: &mut R) -> String {
    let mut sql = String::new();
    let _ = writeln!(
        sql,
        "-- {} rows for {} generated {}\n",
        files.len(),
        options.table,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    for file_name in files {
        let download_count = rng.random_range(options.download_range.clone());
        sql.push_str(&insert_statement(options, file_name, download_count));
        sql.push('\n');
    }

    sql
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "created directory");
    }
    Ok(())
}

fn pdf_file_names(dir: &Path) -> Result<Vec<String>> {
    Ok(scan_directory(dir, PDF_EXTENSIONS)?
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Scan the docs directory and write one INSERT per PDF into the SQL file.
///
/// An empty docs directory gets an empty placeholder PDF so there is always
/// at least one row to show.
pub fn emit_sql(options: &SqlOptions) -> Result<SqlReport> {
    if options.download_range.is_empty() {
        return Err(Error::General(format!(
            "Invalid download range {}..={}",
            options.download_range.start(),
            options.download_range.end()
        )));
    }

    ensure_directory(&options.docs_dir)?;
    ensure_directory(&options.sql_dir)?;

    let mut files = pdf_file_names(&options.docs_dir)?;
    let mut created_placeholder = false;

    if files.is_empty() {
        warn!(dir = %options.docs_dir.display(), "no PDF files found");

        let placeholder = options.docs_dir.join(&options.placeholder_name);
        if !placeholder.exists() {
            fs::write(&placeholder, b"")?;
            created_placeholder = true;
            info!(file = %placeholder.display(), "created placeholder PDF");
        }

        files = pdf_file_names(&options.docs_dir)?;
    }

    info!(count = files.len(), "found PDF files");

    let sql = generate_sql(options, &files, &mut rand::rng());
    let sql_path = options.sql_path();
    fs::write(&sql_path, &sql)?;

    info!(path = %sql_path.display(), "SQL written");

    Ok(SqlReport {
        sql_path,
        files,
        created_placeholder,
        sql,
    })
}
