//! Footer replacement for DOCX packages
//!
//! Every footer part (`word/footerN.xml`) is replaced wholesale with a single
//! centred paragraph. Existing footer markup is never parsed or merged, so the
//! result is the same regardless of how complex the source footers were.
//! Selective editing of footers would need a real XML document model instead.

use std::io::{Cursor, Read, Write};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

const FOOTER_PREFIX: &str = "word/";
const FOOTER_STEM: &str = "footer";
const XML_SUFFIX: &str = ".xml";

/// Result of a footer rewrite
#[derive(Debug, Clone)]
pub struct RewrittenDocx {
    /// The re-serialised DOCX package
    pub bytes: Vec<u8>,
    /// Names of the footer parts that were replaced, in archive order
    pub footer_parts: Vec<String>,
}

/// Whether an archive entry name is a footer part (`word/footer<digits>.xml`)
pub fn is_footer_part(name: &str) -> bool {
    name.strip_prefix(FOOTER_PREFIX)
        .and_then(|rest| rest.strip_prefix(FOOTER_STEM))
        .and_then(|rest| rest.strip_suffix(XML_SUFFIX))
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Build the replacement footer part for `text`
pub fn footer_xml(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:p>
    <w:pPr>
      <w:pStyle w:val="Footer"/>
      <w:jc w:val="center"/>
    </w:pPr>
    <w:r>
      <w:t xml:space="preserve">{}</w:t>
    </w:r>
  </w:p>
</w:ftr>"#,
        quick_xml::escape::escape(text)
    )
}

/// Replace every footer part of a DOCX package with a centred `footer_text` line.
///
/// Non-footer entries are copied without recompression. The rewritten package
/// is then checked: each `word/*.xml` part must be well-formed.
pub fn rewrite_footers(docx: &[u8], footer_text: &str) -> Result<RewrittenDocx> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let replacement = footer_xml(footer_text);
    let mut footer_parts = Vec::new();

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if is_footer_part(&name) {
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(entry.last_modified().unwrap_or_default());
            drop(entry);

            writer.start_file(name.as_str(), options)?;
            writer.write_all(replacement.as_bytes())?;
            debug!(part = %name, "footer replaced");
            footer_parts.push(name);
        } else {
            writer.raw_copy_file(entry)?;
        }
    }

    let bytes = writer.finish()?.into_inner();
    validate_package(&bytes)?;

    Ok(RewrittenDocx { bytes, footer_parts })
}

/// Check that every `word/*.xml` part of a package parses as XML
fn validate_package(docx: &[u8]) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.starts_with(FOOTER_PREFIX) || !name.ends_with(XML_SUFFIX) {
            continue;
        }

        let mut xml = Vec::new();
        entry.read_to_end(&mut xml)?;
        check_well_formed(&name, &xml)?;
    }

    Ok(())
}

fn check_well_formed(part: &str, xml: &[u8]) -> Result<()> {
    let mut reader = Reader::from_reader(xml);
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                saw_root = true;
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Xml {
                    part: part.to_string(),
                    message: format!("{} at byte {}", e, reader.error_position()),
                })
            }
        }
    }

    if !saw_root || depth != 0 {
        return Err(Error::Xml {
            part: part.to_string(),
            message: "document is incomplete".to_string(),
        });
    }

    Ok(())
}
