//! Shared fixtures: small templates built through the object model and a
//! booking for three seats.

#![allow(dead_code)]

use ticket_pdf::text::{Font, StandardFont};
use ticket_pdf::ticket::{BookingData, QrBitmap, QrCodeProvider};
use ticket_pdf::{Dictionary, Document, Object, ObjectId, Result, Stream, WriterConfig};

/// One 1×1 gray image XObject
pub fn image_xobject(document: &mut Document) -> ObjectId {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::name("XObject"));
    dict.set("Subtype", Object::name("Image"));
    dict.set("Width", 1);
    dict.set("Height", 1);
    dict.set("ColorSpace", Object::name("DeviceGray"));
    dict.set("BitsPerComponent", 8);
    document.add_object(Stream::with_dictionary(dict, vec![0x80]))
}

pub fn helvetica() -> Object {
    Object::Dictionary(Font::standard(StandardFont::Helvetica).to_dictionary())
}

/// A document whose pages share `media_box`, one page per content stream
pub fn build_document(
    media_box: [f64; 4],
    contents: &[&[u8]],
    resources: impl Fn(&mut Document) -> Dictionary,
) -> Document {
    let mut document = Document::new();
    let pages = document.new_object_id();
    let mut kids = Vec::new();
    for content in contents {
        let content_id = document.add_object(Stream::new(content.to_vec()));
        let page_resources = resources(&mut document);
        let mut page = Dictionary::new();
        page.set("Type", Object::name("Page"));
        page.set("Parent", pages);
        page.set("Contents", content_id);
        page.set("Resources", page_resources);
        kids.push(Object::Reference(document.add_object(page)));
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::name("Pages"));
    tree.set("Count", kids.len());
    tree.set("Kids", Object::Array(kids));
    tree.set(
        "MediaBox",
        Object::Array(media_box.iter().map(|v| Object::Real(*v)).collect()),
    );
    document.set_object(pages, tree);

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::name("Catalog"));
    catalog.set("Pages", pages);
    let catalog_id = document.add_object(catalog);
    document.trailer_mut().set("Root", catalog_id);
    document
}

/// Serialized single-page template with `/Plan`, `/QR` and `/F1` resources
pub fn template(media_box: [f64; 4], content: &[u8]) -> Vec<u8> {
    let document = build_document(media_box, &[content], |document| {
        let mut xobjects = Dictionary::new();
        xobjects.set("Plan", image_xobject(document));
        xobjects.set("QR", image_xobject(document));
        let mut fonts = Dictionary::new();
        fonts.set("F1", helvetica());
        let mut resources = Dictionary::new();
        resources.set("XObject", xobjects);
        resources.set("Font", fonts);
        resources
    });
    document
        .save(&WriterConfig::compatible())
        .expect("template serializes")
}

/// A 400×300 ticket: background, seat plan lower left, QR code upper right
/// and three left-aligned labels
pub const TICKET_CONTENT: &[u8] = b"q 0.9 g 0 0 400 300 re f Q\n\
q 150 0 0 100 10 10 cm /Plan Do Q\n\
q 60 0 0 60 320 220 cm /QR Do Q\n\
BT /F1 10 Tf 1 0 0 1 220 200 Tm (Datum:) Tj ET\n\
BT /F1 10 Tf 1 0 0 1 220 170 Tm (Block) Tj ET\n\
BT /F1 10 Tf 1 0 0 1 220 140 Tm (Preis) Tj ET\n";

pub fn ticket_template() -> Vec<u8> {
    template([0.0, 0.0, 400.0, 300.0], TICKET_CONTENT)
}

pub const BOOKING_JSON: &str = r##"{
    "veranstaltung": {
        "name": "Der zerbrochne Krug",
        "raumBreite": 100,
        "raumHoehe": 50,
        "sitzBreite": 10,
        "sitzHoehe": 10,
        "preis": 1250,
        "extra": {"showSeatNumbers": true, "connectEntranceArrows": true}
    },
    "vorstellungen": [{"id": 7, "datum": "2024-11-15", "uhrzeit": "19:30:00"}],
    "platzGruppen": [{
        "block": "A", "x": 20, "y": 10,
        "reiheVon": 1, "reiheBis": 2, "platzVon": 1, "platzBis": 4,
        "eingang": 2
    }],
    "bereiche": [{"x": 0, "y": 0, "breite": 100, "hoehe": 8, "farbe": "#dddddd", "beschriftung": "Bühne"}],
    "eingaenge": [
        {"id": 1, "punkte": [{"x": 0, "y": 50}, {"x": 5, "y": 45}, {"x": 8, "y": 40}, {"x": 10, "y": 35}], "text": "Foyer"},
        {"id": 2, "punkte": [{"x": 10, "y": 35}, {"x": 12, "y": 30}, {"x": 15, "y": 25}, {"x": 18, "y": 20}], "eingang": 1}
    ],
    "vorgang": {"nummer": 4711, "name": "Adam", "zahlungsart": "Ueberweisung", "preis": 3750, "bezahlt": true},
    "platzStatus": [
        {"block": "A", "reihe": "1", "platz": 2, "vorstellung": 7, "status": "gebucht", "vorgang": 4711},
        {"block": "A", "reihe": "1", "platz": 3, "vorstellung": 7, "status": "gebucht", "vorgang": 4711},
        {"block": "A", "reihe": "2", "platz": 1, "vorstellung": 7, "status": "anwesend", "vorgang": 4711},
        {"block": "A", "reihe": "2", "platz": 2, "vorstellung": 7, "status": "gebucht", "vorgang": 12}
    ]
}"##;

pub fn booking() -> BookingData {
    BookingData::from_json(BOOKING_JSON).expect("booking fixture parses")
}

/// Checkerboard of the payload's length parity, enough to see it was called
pub struct CheckerQr;

impl QrCodeProvider for CheckerQr {
    fn encode(&self, payload: &str) -> Result<QrBitmap> {
        let width = 21;
        let modules = (0..width * width)
            .map(|i| (i + payload.len()) % 2 == 0)
            .collect();
        QrBitmap::new(width, modules)
    }
}
