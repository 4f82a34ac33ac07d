use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::resources::{merge_resources, resolve_resources};
use crate::writer::format_pdf_date;
use chrono::{DateTime, Utc};

/// US Letter, used when a page has no `/MediaBox` anywhere in its tree
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A page object of a [`Document`], addressed by id.
///
/// Attribute lookups read the page dictionary only; call
/// [`crate::page_tree::flatten`] first so inherited attributes are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    id: ObjectId,
}

impl Page {
    pub fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn dictionary<'d>(&self, document: &'d Document) -> Result<&'d Dictionary> {
        document.dictionary(self.id)
    }

    fn rectangle(&self, document: &Document, key: &str) -> Result<Option<Rectangle>> {
        let dict = self.dictionary(document)?;
        let Some(value) = document.resolve_key(dict, key)? else {
            return Ok(None);
        };
        let values = value
            .as_number_array()
            .and_then(|v| <[f64; 4]>::try_from(v).ok())
            .ok_or_else(|| PdfError::InvalidStructure(format!("/{key} is not a rectangle")))?;
        Ok(Some(Rectangle::from_array(values)))
    }

    pub fn media_box(&self, document: &Document) -> Result<Rectangle> {
        Ok(self
            .rectangle(document, "MediaBox")?
            .unwrap_or_else(|| Rectangle::from_array(DEFAULT_MEDIA_BOX)))
    }

    /// `/CropBox`, defaulting to the media box
    pub fn crop_box(&self, document: &Document) -> Result<Rectangle> {
        match self.rectangle(document, "CropBox")? {
            Some(crop) => Ok(crop),
            None => self.media_box(document),
        }
    }

    /// Page resources with every category resolved to a direct dictionary
    pub fn resources(&self, document: &Document) -> Result<Dictionary> {
        let dict = self.dictionary(document)?;
        match document.resolve_key(dict, "Resources")? {
            Some(resources) => {
                let resources = resources.as_dict().ok_or_else(|| {
                    PdfError::InvalidStructure("/Resources is not a dictionary".to_string())
                })?;
                resolve_resources(document, resources)
            }
            None => Ok(Dictionary::new()),
        }
    }

    pub fn set_resources(&self, document: &mut Document, resources: Dictionary) -> Result<()> {
        document
            .dictionary_mut(self.id)?
            .set("Resources", resources);
        Ok(())
    }

    /// Ids of the content streams, in painting order
    pub fn content_ids(&self, document: &Document) -> Result<Vec<ObjectId>> {
        let dict = self.dictionary(document)?;
        match dict.get("Contents") {
            None => Ok(Vec::new()),
            Some(Object::Reference(id)) => match document.object(*id)? {
                Object::Array(items) => references(items),
                _ => Ok(vec![*id]),
            },
            Some(Object::Array(items)) => references(items),
            Some(other) => Err(PdfError::InvalidStructure(format!(
                "/Contents is a {}",
                other.type_name()
            ))),
        }
    }

    /// Decoded content, streams joined by a newline
    pub fn content_data(&self, document: &Document) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        for (i, id) in self.content_ids(document)?.into_iter().enumerate() {
            let stream = document.object(id)?.as_stream().ok_or_else(|| {
                PdfError::InvalidStructure(format!("content {id} is not a stream"))
            })?;
            if i > 0 {
                data.push(b'\n');
            }
            data.extend(stream.decoded_data()?);
        }
        Ok(data)
    }

    pub fn set_contents(&self, document: &mut Document, ids: &[ObjectId]) -> Result<()> {
        let contents = match ids {
            [single] => Object::Reference(*single),
            _ => Object::Array(ids.iter().map(|id| Object::Reference(*id)).collect()),
        };
        document.dictionary_mut(self.id)?.set("Contents", contents);
        Ok(())
    }

    /// Replace all content with one stream holding `data`
    pub fn set_content(&self, document: &mut Document, data: Vec<u8>) -> Result<ObjectId> {
        let id = document.add_object(Stream::new(data));
        self.set_contents(document, &[id])?;
        Ok(id)
    }

    /// Append a content stream and merge the resources it uses into the page
    pub fn add_content_stream(
        &self,
        document: &mut Document,
        data: Vec<u8>,
        resources: &Dictionary,
    ) -> Result<ObjectId> {
        let id = document.add_object(Stream::new(data));
        self.append_content_id(document, id, resources)?;
        Ok(id)
    }

    /// Append an existing content stream, shared or not
    pub fn append_content_id(
        &self,
        document: &mut Document,
        id: ObjectId,
        resources: &Dictionary,
    ) -> Result<()> {
        let mut ids = self.content_ids(document)?;
        ids.push(id);
        self.set_contents(document, &ids)?;

        let merged = merge_resources(document, &self.resources(document)?, resources)?;
        self.set_resources(document, merged)
    }

    /// Store application data under `/PieceInfo /<key> /Private`
    pub fn set_piece_info(
        &self,
        document: &mut Document,
        key: &str,
        private: Dictionary,
        modified: DateTime<Utc>,
    ) -> Result<()> {
        let date = Object::string(format_pdf_date(modified));
        let mut data = Dictionary::new();
        data.set("LastModified", date.clone());
        data.set("Private", private);

        let page = document.dictionary_mut(self.id)?;
        let mut piece_info = match page.get("PieceInfo") {
            Some(Object::Dictionary(existing)) => existing.clone(),
            _ => Dictionary::new(),
        };
        piece_info.set(key, data);
        page.set("PieceInfo", piece_info);
        page.set("LastModified", date);
        Ok(())
    }

    /// `/PieceInfo /<key> /Private`, if present
    pub fn piece_info<'d>(
        &self,
        document: &'d Document,
        key: &str,
    ) -> Result<Option<&'d Dictionary>> {
        Ok(self
            .dictionary(document)?
            .get_dict("PieceInfo")
            .and_then(|p| p.get_dict(key))
            .and_then(|d| d.get_dict("Private")))
    }
}

fn references(items: &[Object]) -> Result<Vec<ObjectId>> {
    items
        .iter()
        .map(|item| {
            item.as_reference().ok_or_else(|| {
                PdfError::InvalidStructure("/Contents array holds a direct object".to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page_with_content(content: &[&[u8]]) -> (Document, Page) {
        let mut document = Document::new();
        let ids: Vec<ObjectId> = content
            .iter()
            .map(|data| document.add_object(Stream::new(data.to_vec())))
            .collect();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set(
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
        );
        let page = Page::new(document.add_object(dict));
        page.set_contents(&mut document, &ids).unwrap();
        (document, page)
    }

    #[test]
    fn test_boxes() {
        let (document, page) = page_with_content(&[b"q Q"]);
        let media = page.media_box(&document).unwrap();
        assert_eq!(media.width(), 595.0);
        assert_eq!(page.crop_box(&document).unwrap(), media);
    }

    #[test]
    fn test_content_joined() {
        let (document, page) = page_with_content(&[b"q", b"Q"]);
        assert_eq!(page.content_data(&document).unwrap(), b"q\nQ".to_vec());
        assert_eq!(page.content_ids(&document).unwrap().len(), 2);
    }

    #[test]
    fn test_add_content_stream_merges_resources() {
        let (mut document, page) = page_with_content(&[b"q Q"]);
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::name("placeholder"));
        let mut resources = Dictionary::new();
        resources.set("Font", fonts);

        page.add_content_stream(&mut document, b"BT ET".to_vec(), &resources)
            .unwrap();
        assert_eq!(page.content_ids(&document).unwrap().len(), 2);
        assert_eq!(page.content_data(&document).unwrap(), b"q Q\nBT ET".to_vec());
        let merged = page.resources(&document).unwrap();
        assert!(merged.get_dict("Font").unwrap().contains_key("F1"));
    }

    #[test]
    fn test_piece_info() {
        let (mut document, page) = page_with_content(&[b""]);
        let mut private = Dictionary::new();
        private.set("Platz", 12);
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap();
        page.set_piece_info(&mut document, "TicketData", private, when)
            .unwrap();
        let stored = page.piece_info(&document, "TicketData").unwrap().unwrap();
        assert_eq!(stored.get_integer("Platz"), Some(12));
        assert_eq!(
            page.dictionary(&document).unwrap().get("LastModified"),
            Some(&Object::string("D:20240301183000+00'00"))
        );
    }
}
