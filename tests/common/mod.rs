//! In-memory fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use bboxes::{
    Decoder, ExtractOptions, Extraction, PageGeometry, RawFont, RawStyle, Result, RunEvent,
    RunEventStream, SourceType,
};
use lopdf::content::{Content, Operation};
use lopdf::encryption;
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use md5::{Digest, Md5};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// PDF with one page per entry, each page showing its strings on separate lines.
///
/// `/F1` is Helvetica, `/F2` is Times-Italic.
pub fn pdf(pages: &[&[(&str, &str)]]) -> Vec<u8> {
    save(pdf_document(pages))
}

fn pdf_document(pages: &[&[(&str, &str)]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let helvetica = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let times = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Italic",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => helvetica, "F2" => times },
    });

    let mut kids: Vec<Object> = Vec::new();
    for strings in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for (font, text) in strings.iter() {
            let font = Object::Name(font.as_bytes().to_vec());
            operations.push(Operation::new("Tf", vec![font, 12.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Standard security handler padding string.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// Like [`pdf`], encrypted with 128-bit RC4 (V 2, R 3) under `user_password`.
pub fn encrypted_pdf(pages: &[&[(&str, &str)]], user_password: &str) -> Vec<u8> {
    encrypted_pdf_with(pages, user_password, |_, _| {})
}

/// Like [`encrypted_pdf`], with `edit` applied to the encryption dictionary
/// and the trailer after encryption.
pub fn encrypted_pdf_with(
    pages: &[&[(&str, &str)]],
    user_password: &str,
    edit: impl FnOnce(&mut Dictionary, &mut Dictionary),
) -> Vec<u8> {
    let mut doc = pdf_document(pages);
    let file_id = b"bboxes-fixture-01".to_vec();
    doc.trailer.set(
        "ID",
        vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
        ],
    );
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => 3,
        "Length" => 128,
        "P" => -4,
        "O" => Object::String(vec![0x4F; 32], StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);

    let key = encryption::get_encryption_key(&doc, user_password, false).unwrap();

    // User password check value for revision 3.
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PAD);
    hasher.update(&file_id);
    let mut check = rc4(&key, &hasher.finalize());
    for round in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
        check = rc4(&round_key, &check);
    }
    check.extend_from_slice(&PASSWORD_PAD[..16]);

    // RC4 is symmetric, so decrypting plaintext objects encrypts them.
    for (&id, object) in doc.objects.iter_mut() {
        if id == encrypt_id {
            continue;
        }
        if let Ok(content) = encryption::decrypt_object(&key, id, object) {
            match object {
                Object::Stream(stream) => stream.set_content(content),
                Object::String(bytes, _) => *bytes = content,
                _ => {}
            }
        }
    }

    let encrypt = doc
        .objects
        .get_mut(&encrypt_id)
        .and_then(|o| o.as_dict_mut().ok())
        .unwrap();
    encrypt.set("U", Object::String(check, StringFormat::Hexadecimal));
    edit(encrypt, &mut doc.trailer);
    save(doc)
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: Vec<u8> = (0..=255).collect();
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }
    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            let k = state[state[i as usize].wrapping_add(state[j as usize]) as usize];
            byte ^ k
        })
        .collect()
}

/// ZIP package with the given parts, stored uncompressed.
pub fn package(parts: &[(&str, &str)]) -> Vec<u8> {
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

const WORKBOOK_XML: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Totals" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><color rgb="FF0000FF"/><name val="Calibri"/></font>
  </fonts>
  <cellXfs count="2"><xf fontId="0"/><xf fontId="1"/></cellXfs>
</styleSheet>"#;

const SHEET_XML: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1">
      <c r="A1" t="inlineStr" s="1"><is><t>Item</t></is></c>
      <c r="B1" t="inlineStr" s="1"><is><t>Cost</t></is></c>
    </row>
    <row r="2">
      <c r="A2" t="inlineStr" s="0"><is><t>Paper</t></is></c>
      <c r="B2" s="0"><v>4.25</v></c>
    </row>
    <row r="3">
      <c r="A3" t="inlineStr"><is><t>Total</t></is></c>
      <c r="B3"><f>SUM(B2:B2)</f><v>4.25</v></c>
    </row>
  </sheetData>
</worksheet>"#;

/// One-sheet workbook: a bold blue header row, one item and a formula total.
pub fn xlsx() -> Vec<u8> {
    package(&[
        ("[Content_Types].xml", "<Types/>"),
        ("xl/workbook.xml", WORKBOOK_XML),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/styles.xml", STYLES_XML),
        ("xl/worksheets/sheet1.xml", SHEET_XML),
    ])
}

const DOCUMENT_XML: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Name</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Role</w:t></w:r></w:p></w:tc>
      </w:tr>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Ada</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Analyst</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:tbl>
      <w:tr><w:tc><w:tcPr><w:gridSpan w:val="3"/></w:tcPr><w:p><w:r><w:t>Notes</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
  </w:body>
</w:document>"#;

/// Two-table document: a 2x2 table and a single cell spanning three columns.
pub fn docx() -> Vec<u8> {
    package(&[
        ("[Content_Types].xml", "<Types/>"),
        ("word/document.xml", DOCUMENT_XML),
    ])
}

/// Empty OLE compound file, the container encrypted OOXML is shipped in.
pub fn encrypted_container() -> Vec<u8> {
    let mut data = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    data.resize(512, 0);
    data
}

/// Decoder replaying fixed runs over fixed pages.
pub struct Scripted {
    pub pages: Vec<PageGeometry>,
    pub runs: Vec<RunEvent>,
}

impl Scripted {
    pub fn new(pages: usize, runs: Vec<RunEvent>) -> Self {
        Self {
            pages: vec![PageGeometry::new(100.0, 100.0); pages],
            runs,
        }
    }
}

impl Decoder for Scripted {
    fn source_type(&self) -> SourceType {
        SourceType::Text
    }

    fn decode(&self, _data: &[u8], _options: &ExtractOptions) -> Result<Extraction> {
        Ok(Extraction::new(
            SourceType::Text,
            self.pages.clone(),
            RunEventStream::from_events(self.runs.clone()),
        ))
    }
}

/// A run in the "Mono" 12pt black normal style.
pub fn mono_run(page: u32, y: f64, text: &str) -> RunEvent {
    RunEvent::new(
        page,
        (0.0, y, text.chars().count() as f64, 1.0),
        text,
        RawFont::named("Mono"),
        RawStyle::new(12.0),
    )
}
