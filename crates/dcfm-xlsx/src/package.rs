//! Zip container access and OPC relationship resolution.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::xml;

/// Largest uncompressed size accepted for any single part (zip-bomb guard).
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const REL_TYPE_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub(crate) const REL_TYPE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub(crate) const REL_TYPE_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub(crate) const REL_TYPE_COMMENTS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
pub(crate) const REL_TYPE_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
pub(crate) const REL_TYPE_VML_DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing";
pub(crate) const REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// One entry of a `.rels` part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// All parts of an opened package, inflated into memory.
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn from_bytes(bytes: &[u8]) -> XlsxResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = BTreeMap::new();
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = normalize_part_name(file.name());
            if file.size() > MAX_PART_BYTES {
                return Err(XlsxError::PartTooLarge { part: name, limit: MAX_PART_BYTES });
            }
            let mut data = Vec::with_capacity(file.size().min(1 << 20) as usize);
            file.by_ref().take(MAX_PART_BYTES + 1).read_to_end(&mut data)?;
            if data.len() as u64 > MAX_PART_BYTES {
                return Err(XlsxError::PartTooLarge { part: name, limit: MAX_PART_BYTES });
            }
            parts.insert(name, data);
        }
        Ok(Self { parts })
    }

    /// Raw bytes of a part. Lookup ignores a leading `/` and ASCII case, as
    /// OPC part names are case-insensitive.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let wanted = normalize_part_name(name);
        self.parts.get(&wanted).map(Vec::as_slice).or_else(|| {
            self.parts
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&wanted))
                .map(|(_, v)| v.as_slice())
        })
    }

    /// A part decoded as UTF-8 text (a leading BOM is dropped).
    pub fn xml_part(&self, name: &str) -> XlsxResult<Option<&str>> {
        let Some(bytes) = self.part(name) else {
            return Ok(None);
        };
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|source| XlsxError::Utf8 { part: name.to_string(), source })
    }

    pub fn required_xml_part(&self, name: &str) -> XlsxResult<&str> {
        self.xml_part(name)?
            .ok_or_else(|| XlsxError::MissingPart(name.to_string()))
    }

    /// Relationships declared by `part` (empty when it has no `.rels`).
    pub fn relationships(&self, part: &str) -> XlsxResult<Vec<Relationship>> {
        let rels_name = rels_for_part(part);
        let Some(text) = self.xml_part(&rels_name)? else {
            return Ok(Vec::new());
        };
        let doc = xml::parse(&rels_name, text)?;
        let rels = doc
            .root_element()
            .children()
            .filter(|n| xml::is(n, "Relationship"))
            .filter_map(|n| {
                let external = xml::attr(n, "TargetMode")
                    .is_some_and(|m| m.eq_ignore_ascii_case("External"));
                let target = xml::attr(n, "Target")?;
                Some(Relationship {
                    id: xml::attr(n, "Id")?.to_string(),
                    rel_type: xml::attr(n, "Type").unwrap_or_default().to_string(),
                    target: if external {
                        target.to_string()
                    } else {
                        resolve_target(part, target)
                    },
                    external,
                })
            })
            .collect();
        Ok(rels)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }
}

fn normalize_part_name(name: &str) -> String {
    name.trim_start_matches('/').replace('\\', "/")
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
pub fn rels_for_part(part: &str) -> String {
    let part = normalize_part_name(part);
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target relative to the part that declares it.
pub fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let base = normalize_part_name(base_part);
    let mut segments: Vec<&str> = match base.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
