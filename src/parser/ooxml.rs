//! Helpers shared by the Office Open XML backends.

use std::io::{Cursor, Read};

use quick_xml::events::BytesStart;
use zip::ZipArchive;

use crate::detect::is_encrypted_container;
use crate::error::{Error, Result};

pub(crate) type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Open an OOXML package.
///
/// Encrypted packages are stored in an OLE container rather than a ZIP
/// archive; those fail with `AuthRequired` (no password) or `Unsupported`.
pub(crate) fn open_package<'a>(data: &'a [u8], password: Option<&str>) -> Result<Package<'a>> {
    if is_encrypted_container(data) {
        return Err(match password {
            None => Error::AuthRequired,
            Some(_) => Error::Unsupported("decryption of encrypted Office packages".to_string()),
        });
    }
    Ok(ZipArchive::new(Cursor::new(data))?)
}

/// Read a package part as UTF-8. `Ok(None)` if the part does not exist.
pub(crate) fn read_part(package: &mut Package<'_>, name: &str) -> Result<Option<String>> {
    let mut file = match package.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Corrupt(format!("failed to read {}: {}", name, e)))?;
    Ok(Some(content))
}

/// Attribute value by local name (ignores the namespace prefix).
pub(crate) fn get_attribute(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Some(
                attr.unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned()),
            );
        }
    }
    None
}

/// Whether an on/off property element is on (`<w:b/>`, `<b val="1"/>`).
pub(crate) fn is_on(e: &BytesStart) -> bool {
    match get_attribute(e, "val") {
        None => true,
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "none"),
    }
}

/// Parse an A1-style cell reference into 1-based `(column, row)`.
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim().trim_start_matches('$');
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut column = 0u32;
    for c in letters.trim_end_matches('$').chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        column = column
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((column, row))
}

/// Column letters of a 1-based column number (`1` is `A`, `27` is `AA`).
pub(crate) fn column_name(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Parse an A1-style range (`"A1:C3"`, or a single cell) into corner cells.
pub(crate) fn parse_range(range: &str) -> Option<((u32, u32), (u32, u32))> {
    match range.split_once(':') {
        Some((a, b)) => Some((parse_cell_ref(a)?, parse_cell_ref(b)?)),
        None => {
            let cell = parse_cell_ref(range)?;
            Some((cell, cell))
        }
    }
}

/// Build an in-memory package from `(name, content)` parts.
#[cfg(test)]
pub(crate) fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::{write::SimpleFileOptions, ZipWriter};

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("Z10"), Some((26, 10)));
        assert_eq!(parse_cell_ref("AA3"), Some((27, 3)));
        assert_eq!(parse_cell_ref("$B$7"), Some((2, 7)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A"), None);
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(16384), "XFD");
        assert_eq!(parse_cell_ref(&format!("{}7", column_name(703))), Some((703, 7)));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("A1:B2"), Some(((1, 1), (2, 2))));
        assert_eq!(parse_range("C4"), Some(((3, 4), (3, 4))));
        assert_eq!(parse_range("bad"), None);
    }

    #[test]
    fn test_open_package_rejects_garbage() {
        assert!(matches!(
            open_package(b"not a zip", None),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn test_read_part() {
        let data = build_package(&[("word/document.xml", "<w:document/>")]);
        let mut package = open_package(&data, None).unwrap();
        assert_eq!(
            read_part(&mut package, "word/document.xml").unwrap().as_deref(),
            Some("<w:document/>")
        );
        assert!(read_part(&mut package, "word/missing.xml").unwrap().is_none());
    }

    #[test]
    fn test_encrypted_container_needs_password() {
        let mut data = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        data.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            open_package(&data, None),
            Err(Error::AuthRequired)
        ));
        assert!(matches!(
            open_package(&data, Some("pw")),
            Err(Error::Unsupported(_))
        ));
    }
}
