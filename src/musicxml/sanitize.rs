//! Document sanitizing
//!
//! The DOCTYPE declaration points at an external DTD that is never fetched,
//! so it is stripped before parsing. File conversion parses a sanitized
//! temporary copy rather than the input itself.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::archive::read_document;
use crate::error::Result;

/// Remove the first `<!DOCTYPE ...>` declaration from a document.
///
/// An internal subset (`<!DOCTYPE x [ ... ]>`) is removed up to its closing
/// `]>`. The rest of the text is returned untouched.
pub fn sanitize_doctype(xml: &str) -> String {
    let Some(start) = xml.find("<!DOCTYPE") else {
        return xml.to_string();
    };
    let rest = &xml[start..];
    let end = match (rest.find('['), rest.find('>')) {
        (Some(open), Some(close)) if open < close => rest.find("]>").map(|i| i + 2),
        (_, Some(close)) => Some(close + 1),
        _ => None,
    };
    match end {
        Some(len) => format!("{}{}", &xml[..start], &rest[len..]),
        None => {
            log::warn!("unterminated DOCTYPE declaration left in place");
            xml.to_string()
        }
    }
}

/// Write a DOCTYPE-free copy of `path` to a temporary file in `dir` (the
/// system temporary directory when `None`). `.mxl` archives are extracted.
///
/// The copy is deleted when the returned handle is dropped, including on
/// early returns after a failed conversion.
pub fn sanitized_copy(path: impl AsRef<Path>, dir: Option<&Path>) -> Result<NamedTempFile> {
    let xml = read_document(path.as_ref())?;
    let mut builder = tempfile::Builder::new();
    builder.prefix("tmp").suffix(".xml");
    let mut tmp = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    tmp.write_all(sanitize_doctype(&xml).as_bytes())?;
    tmp.flush()?;
    log::trace!("sanitized copy of {} at {}", path.as_ref().display(), tmp.path().display());
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

    #[test]
    fn test_removes_public_doctype() {
        let xml = format!(
            "{}\n<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 3.0 Partwise//EN\" \"http://www.musicxml.org/dtds/partwise.dtd\">\n<score-partwise/>",
            HEADER
        );
        assert_eq!(sanitize_doctype(&xml), format!("{}\n\n<score-partwise/>", HEADER));
    }

    #[test]
    fn test_without_doctype_is_unchanged() {
        let xml = "<score-partwise><part id=\"P1\"/></score-partwise>";
        assert_eq!(sanitize_doctype(xml), xml);
    }

    #[test]
    fn test_internal_subset() {
        let xml = "<!DOCTYPE a [<!ENTITY x \"y\">]><a/>";
        assert_eq!(sanitize_doctype(xml), "<a/>");
    }

    #[test]
    fn test_only_first_declaration_removed() {
        let xml = "<!DOCTYPE a><a><!DOCTYPE b></a>";
        assert_eq!(sanitize_doctype(xml), "<a><!DOCTYPE b></a>");
    }

    #[test]
    fn test_sanitized_copy_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.xml");
        fs::write(&input, "<!DOCTYPE score-partwise><score-partwise/>").unwrap();

        let copy = sanitized_copy(&input, None).unwrap();
        let copy_path = copy.path().to_path_buf();
        assert_eq!(fs::read_to_string(&copy_path).unwrap(), "<score-partwise/>");
        drop(copy);
        assert!(!copy_path.exists());
    }

    #[test]
    fn test_sanitized_copy_in_given_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.xml");
        fs::write(&input, "<score-partwise/>").unwrap();

        let copy = sanitized_copy(&input, Some(scratch.path())).unwrap();
        assert_eq!(copy.path().parent(), Some(scratch.path()));
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 1);
        drop(copy);
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_input_leaves_no_copy() {
        let scratch = tempfile::tempdir().unwrap();
        assert!(sanitized_copy(scratch.path().join("missing.xml"), Some(scratch.path())).is_err());
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
