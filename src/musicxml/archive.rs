//! Compressed MusicXML (`.mxl`)
//!
//! An `.mxl` file is a zip archive whose `META-INF/container.xml` names the
//! score inside it. Archives without a usable container fall back to
//! `musicXML.xml`, then to the first `.xml` entry (by name) outside
//! `META-INF/`.

use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{ConvertError, Result};

const CONTAINER: &str = "META-INF/container.xml";
const DEFAULT_ROOTFILE: &str = "musicXML.xml";

/// Whether `path` has the `.mxl` extension (any case)
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("mxl"))
}

/// Text of the MusicXML document at `path`, extracted first when it is an
/// `.mxl` archive.
pub fn read_document(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if !is_archive(path) {
        return Ok(fs::read_to_string(path)?);
    }

    let mut archive = ZipArchive::new(File::open(path)?)?;
    let name = score_entry(&mut archive)?;
    log::debug!("extracting {} from {}", name, path.display());
    read_entry(&mut archive, &name)?
        .ok_or_else(|| ConvertError::Archive(format!("{} named in container but missing", name)))
}

fn score_entry<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    if let Some(container) = read_entry(archive, CONTAINER)? {
        if let Some(path) = rootfile(&container)? {
            return Ok(path);
        }
        log::warn!("{} has no rootfile, guessing the score entry", CONTAINER);
    }

    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    if names.iter().any(|n| n == DEFAULT_ROOTFILE) {
        return Ok(DEFAULT_ROOTFILE.to_string());
    }
    names
        .into_iter()
        .find(|n| !n.starts_with("META-INF/") && n.to_ascii_lowercase().ends_with(".xml"))
        .ok_or_else(|| ConvertError::Archive("no MusicXML document in archive".to_string()))
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// `full-path` of the first `<rootfile>` in a container document
fn rootfile(container: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(container);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| ConvertError::Xml(e.to_string()))?;
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(Some(attr.unescape_value()?.into_owned()));
                    }
                }
                return Ok(None);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
