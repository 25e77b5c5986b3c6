//! Print the structure of encoded tagdoc documents
//!
//! Run with: cargo run --features cli --bin tagdoc-explain -- <file> [--hex]

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tagdoc::{read_documents, DecodedArray, DecodedDocument, DecodedValue};

#[derive(Parser)]
#[command(name = "tagdoc-explain", about = "Explain the layout of tagdoc documents")]
struct Cli {
    /// File holding one or more concatenated root documents
    input: PathBuf,

    /// Also print a hex dump of the input
    #[arg(long)]
    hex: bool,

    /// Bytes per hex dump line
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(1..))]
    width: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    info!(bytes = bytes.len(), path = %cli.input.display(), "input loaded");

    if cli.hex {
        let mut dump = String::new();
        hexdump(&mut dump, &bytes, usize::from(cli.width))?;
        println!("{dump}");
    }

    let docs = read_documents(&bytes)
        .with_context(|| format!("failed to decode {}", cli.input.display()))?;

    let mut out = String::new();
    for (i, doc) in docs.iter().enumerate() {
        writeln!(out, "root #{i}")?;
        explain_document(&mut out, doc, 1)?;
    }
    print!("{out}");
    Ok(())
}

fn hexdump(out: &mut String, bytes: &[u8], width: usize) -> std::fmt::Result {
    for (line, chunk) in bytes.chunks(width).enumerate() {
        write!(out, "{:08X} ", line * width)?;
        for b in chunk {
            write!(out, " {b:02X}")?;
        }
        out.push('\n');
    }
    Ok(())
}

fn explain_document(out: &mut String, doc: &DecodedDocument<'_>, depth: usize) -> std::fmt::Result {
    let pad = "  ".repeat(depth);
    writeln!(out, "{pad}document id={} fields={}", doc.doc_id, doc.len())?;
    explain_fields(out, doc, depth)
}

/// Field lines of `doc`, one level below a header printed at `depth`
fn explain_fields(out: &mut String, doc: &DecodedDocument<'_>, depth: usize) -> std::fmt::Result {
    let pad = "  ".repeat(depth);
    for field in doc.iter() {
        write!(out, "{pad}  [{}] ", field.id)?;
        explain_value(out, &field.value, depth + 1)?;
    }
    Ok(())
}

fn explain_value(out: &mut String, value: &DecodedValue<'_>, depth: usize) -> std::fmt::Result {
    match value {
        DecodedValue::Bool(v) => writeln!(out, "bool {v}"),
        DecodedValue::Int32(v) => writeln!(out, "int32 {v}"),
        DecodedValue::Uint32(v) => writeln!(out, "uint32 {v}"),
        DecodedValue::Int64(v) => writeln!(out, "int64 {v}"),
        DecodedValue::Uint64(v) => writeln!(out, "uint64 {v}"),
        DecodedValue::Float32(v) => writeln!(out, "float32 {v}"),
        DecodedValue::Float64(v) => writeln!(out, "float64 {v}"),
        DecodedValue::DateTime(v) => writeln!(out, "datetime {v}"),
        DecodedValue::String(v) => writeln!(out, "string {v:?}"),
        DecodedValue::Binary(v) => writeln!(out, "binary {} bytes", v.len()),
        DecodedValue::Document(doc) => {
            writeln!(out, "document id={} fields={}", doc.doc_id, doc.len())?;
            explain_fields(out, doc, depth)
        }
        DecodedValue::Array(array) => {
            writeln!(out, "array<{}> count={}", array.kind(), array.len())?;
            if let DecodedArray::Documents(docs) = array {
                for doc in docs {
                    explain_document(out, doc, depth + 1)?;
                }
            } else {
                let pad = "  ".repeat(depth + 1);
                writeln!(out, "{pad}{}", elements(array))?;
            }
            Ok(())
        }
        DecodedValue::Unknown { tag, raw } => {
            writeln!(out, "unknown tag=0x{tag:02X} {} bytes", raw.len())
        }
    }
}

fn elements(array: &DecodedArray<'_>) -> String {
    match array {
        DecodedArray::Documents(v) => format!("{} documents", v.len()),
        DecodedArray::Binaries(v) => format!("{:?}", v.iter().map(|b| b.len()).collect::<Vec<_>>()),
        DecodedArray::DateTimes(v) => format!("{v:?}"),
        DecodedArray::Float32s(v) => format!("{v:?}"),
        DecodedArray::Float64s(v) => format!("{v:?}"),
        DecodedArray::Strings(v) => format!("{v:?}"),
        DecodedArray::Bools(v) => format!("{v:?}"),
        DecodedArray::Int32s(v) => format!("{v:?}"),
        DecodedArray::Uint32s(v) => format!("{v:?}"),
        DecodedArray::Int64s(v) => format!("{v:?}"),
        DecodedArray::Uint64s(v) => format!("{v:?}"),
    }
}
