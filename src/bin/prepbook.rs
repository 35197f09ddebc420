//! prepbook - render an interview-prep pack to PDF

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use prepbook::{PrepBook, PrepRecord, SectionOptions, Size, inspect_pdf_bytes, require_readable};

#[derive(Clone, Copy, ValueEnum)]
enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    fn size(self) -> Size {
        match self {
            PageSize::A4 => Size::a4(),
            PageSize::Letter => Size::letter(),
        }
    }
}

#[derive(Parser)]
#[command(name = "prepbook")]
#[command(version, about = "Render an interview-prep pack to PDF", long_about = None)]
#[command(after_help = "EXAMPLES:
    prepbook pack.json                  Write the PDF to the current directory
    prepbook pack.json -o out --no-qa   Skip the rapid-fire section")]
struct Cli {
    /// Prep record as JSON (camelCase keys)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory the PDF is written to
    #[arg(short, long, value_name = "OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Leave out the opening brief
    #[arg(long)]
    no_brief: bool,

    /// Leave out the revision topics
    #[arg(long)]
    no_topics: bool,

    /// Leave out the practice questions
    #[arg(long)]
    no_questions: bool,

    /// Leave out the rapid-fire Q&A
    #[arg(long)]
    no_qa: bool,

    #[arg(long, value_enum, default_value = "a4")]
    page_size: PageSize,

    /// Write content streams without compression
    #[arg(long)]
    uncompressed: bool,

    /// Write a JSONL layout trace
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Write JSONL timing spans
    #[arg(long, value_name = "PATH")]
    perf_log: Option<PathBuf>,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let json = std::fs::read_to_string(&cli.input)
        .map_err(|e| format!("{}: {e}", cli.input.display()))?;
    let record: PrepRecord = serde_json::from_str(&json)
        .map_err(|e| format!("{}: {e}", cli.input.display()))?;

    let mut builder = PrepBook::builder()
        .page_size(cli.page_size.size())
        .compress_streams(!cli.uncompressed);
    if let Some(path) = &cli.debug_log {
        builder = builder.debug_log(path);
    }
    if let Some(path) = &cli.perf_log {
        builder = builder.perf_log(path);
    }
    let engine = builder.build().map_err(|e| e.to_string())?;

    let options = SectionOptions {
        include_brief: !cli.no_brief,
        include_topics: !cli.no_topics,
        include_questions: !cli.no_questions,
        include_qa: !cli.no_qa,
    };
    let rendered = engine
        .render(&record, &options)
        .map_err(|e| e.to_string())?;
    let report = inspect_pdf_bytes(&rendered.bytes).map_err(|e| e.to_string())?;
    require_readable(&report, rendered.page_count).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(&cli.out_dir)
        .map_err(|e| format!("{}: {e}", cli.out_dir.display()))?;
    let path = cli.out_dir.join(&rendered.filename);
    std::fs::write(&path, &rendered.bytes).map_err(|e| format!("{}: {e}", path.display()))?;

    if !cli.quiet {
        println!("File: {}", path.display());
        println!("Pages: {}", rendered.page_count);
        println!("PDF version: {}", report.pdf_version);
        println!("Size: {} bytes", rendered.bytes.len());
        println!("Fingerprint: {}", rendered.fingerprint);
    }
    Ok(())
}
