//! docbatch CLI tool
//!
//! Batch jobs for DOCX footers, PDF rendering, PDF stamping and SQL generation.
//! Every subcommand runs with no arguments using the project's default directories.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use docbatch::batch::{
    run_convert_batch, run_stamp_batch, BatchReport, ConvertOptions, StampBatchOptions,
    DEFAULT_FOOTER_TEXT,
};
use docbatch::convert::{CancelToken, SofficeConverter};
use docbatch::logging::{init_logging, level_from_flags};
use docbatch::pdf::StampOptions;
use docbatch::sql::{emit_sql, SqlOptions};

/// docbatch - Rewrite DOCX footers, render and stamp PDFs, generate SQL imports
#[derive(Parser)]
#[command(name = "docbatch")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Rewrite footers of ./docs/*.doc(x) and render PDFs into ./output
    docbatch convert

    # Same, stamping a QR code onto every rendered page
    docbatch convert --stamp-image qrcode.jpg --stamp-size 80

    # Stamp the QR code onto existing PDFs in ./docs
    docbatch stamp --image qrcode.jpg

    # Generate ./sql/insert_pdf_files.sql for the PDFs in ./docs
    docbatch sql --subject english --grade 3")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (-q warnings, -qq errors)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite DOC/DOCX footers and render each document to PDF
    Convert {
        /// Directory containing .doc/.docx files
        #[arg(short, long, default_value = "./docs")]
        input: PathBuf,

        /// Directory for rewritten .docx and rendered .pdf files
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Footer text written into every document
        #[arg(long, default_value = DEFAULT_FOOTER_TEXT)]
        footer: String,

        /// Stamp this JPEG/PNG onto every page of the rendered PDFs
        #[arg(long)]
        stamp_image: Option<PathBuf>,

        #[command(flatten)]
        stamp: StampArgs,

        #[command(flatten)]
        converter: ConverterArgs,
    },

    /// Stamp an image onto every page of the PDFs in a directory
    Stamp {
        /// Directory containing .pdf files
        #[arg(short, long, default_value = "./docs")]
        input: PathBuf,

        /// Directory for stamped PDFs
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// JPEG or PNG image to stamp
        #[arg(long, default_value = "./cc100-qrcode.jpg")]
        image: PathBuf,

        #[command(flatten)]
        stamp: StampArgs,
    },

    /// Generate SQL insert statements for the PDFs in a directory
    Sql(SqlArgs),
}

#[derive(Args)]
struct StampArgs {
    /// Stamp width and height in points
    #[arg(long, default_value_t = 30.0)]
    stamp_size: f32,

    /// Distance from the top and right page edges in points
    #[arg(long, default_value_t = 20.0)]
    stamp_margin: f32,
}

impl StampArgs {
    fn to_options(&self) -> StampOptions {
        StampOptions {
            width: self.stamp_size,
            height: self.stamp_size,
            margin: self.stamp_margin,
        }
    }
}

#[derive(Args)]
struct ConverterArgs {
    /// Office converter executable
    #[arg(long, default_value = "soffice")]
    soffice: String,

    /// Seconds before a single conversion is killed
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[derive(Args)]
struct SqlArgs {
    /// Directory containing .pdf files
    #[arg(long, default_value = "./docs")]
    docs: PathBuf,

    /// Directory for the generated SQL file
    #[arg(long, default_value = "./sql")]
    sql_dir: PathBuf,

    /// Name of the generated SQL file
    #[arg(long, default_value = "insert_pdf_files.sql")]
    file_name: String,

    #[arg(long, default_value = "pdf_files")]
    table: String,

    #[arg(long, default_value_t = 1)]
    grade: i64,

    #[arg(long, default_value = "math")]
    subject: String,

    /// Prefix joined with each file name to form its URL
    #[arg(long, default_value = "https://ycy88.com/pdf/0917/")]
    url_base: String,

    #[arg(long, default_value = "网上资料，仅供个人使用，严禁商用！")]
    description: String,

    #[arg(long, default_value = "enabled")]
    status: String,

    /// Value of the size column
    #[arg(long, default_value_t = 1_024_000)]
    size: i64,

    /// Smallest random download count
    #[arg(long, default_value_t = 50)]
    min_downloads: u32,

    /// Largest random download count
    #[arg(long, default_value_t = 100)]
    max_downloads: u32,
}

impl SqlArgs {
    fn into_options(self) -> SqlOptions {
        SqlOptions {
            table: self.table,
            grade: self.grade,
            subject: self.subject,
            url_base: self.url_base,
            description: self.description,
            status: self.status,
            size: self.size,
            download_range: self.min_downloads..=self.max_downloads,
            docs_dir: self.docs,
            sql_dir: self.sql_dir,
            sql_file_name: self.file_name,
            ..SqlOptions::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(level_from_flags(cli.verbose, cli.quiet));

    let result = match cli.command {
        Commands::Convert { input, output, footer, stamp_image, stamp, converter } => {
            let options = ConvertOptions {
                input_dir: input,
                output_dir: output,
                footer_text: footer,
                stamp_image,
                stamp: stamp.to_options(),
            };
            cmd_convert(options, converter).await
        }
        Commands::Stamp { input, output, image, stamp } => {
            let options = StampBatchOptions {
                input_dir: input,
                output_dir: output,
                image_path: image,
                stamp: stamp.to_options(),
            };
            cmd_stamp(options).await
        }
        Commands::Sql(args) => cmd_sql(args.into_options()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn print_report(report: &BatchReport) {
    println!();
    println!("{report}");
}

/// Rewrite footers and render PDFs
async fn cmd_convert(options: ConvertOptions, args: ConverterArgs) -> Result<()> {
    let (cancel_handle, cancel_token) = CancelToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel_handle.cancel();
        }
    });

    let converter = SofficeConverter::new(args.soffice, Duration::from_secs(args.timeout_secs))
        .with_cancel(cancel_token);

    let report = run_convert_batch(&converter, &options)
        .await
        .context("Batch conversion aborted")?;

    print_report(&report);
    Ok(())
}

/// Stamp an image onto existing PDFs
async fn cmd_stamp(options: StampBatchOptions) -> Result<()> {
    let report = run_stamp_batch(&options)
        .await
        .context("Batch stamping aborted")?;

    print_report(&report);
    Ok(())
}

/// Generate the SQL import script
fn cmd_sql(options: SqlOptions) -> Result<()> {
    let report = emit_sql(&options).context("SQL generation failed")?;

    eprintln!("SQL written to: {}", report.sql_path.display());
    println!("{}", report.sql);
    Ok(())
}
