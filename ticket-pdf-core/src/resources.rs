//! Page resources
//!
//! [`ResourceResolver`] answers the named-resource lookups content-stream
//! operators make (`Tf`, `Do`, `gs`, `cs`/`CS`) and caches what it built, so a
//! font used by a thousand `Tf` operators is read once. [`merge_resources`]
//! combines two resource dictionaries when content streams are appended to a
//! page.

use crate::document::Document;
use crate::error::Result;
use crate::geometry::{Rectangle, TransformationMatrix};
use crate::graphics::{ColorSpace, LineCap, LineDashPattern, LineJoin};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::text::Font;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Resource categories that hold name → object maps
pub const RESOURCE_CATEGORIES: [&str; 7] = [
    "Font",
    "XObject",
    "ExtGState",
    "Pattern",
    "Shading",
    "ColorSpace",
    "Properties",
];

/// An external object invoked by `Do`
#[derive(Debug, Clone, PartialEq)]
pub enum XObject {
    Image {
        id: Option<ObjectId>,
        width: u32,
        height: u32,
    },
    Form {
        id: Option<ObjectId>,
        bbox: Rectangle,
        matrix: TransformationMatrix,
    },
    /// Missing or unreadable resource
    Unknown,
}

impl XObject {
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            XObject::Image { id, .. } | XObject::Form { id, .. } => *id,
            XObject::Unknown => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, XObject::Image { .. })
    }
}

/// The parameters of an `/ExtGState` dictionary the state machine applies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtGState {
    pub line_width: Option<f64>,
    pub line_cap: Option<LineCap>,
    pub line_join: Option<LineJoin>,
    pub miter_limit: Option<f64>,
    pub dash: Option<LineDashPattern>,
    pub font: Option<(Arc<Font>, f64)>,
}

/// Named-resource lookup against one resource dictionary
pub struct ResourceResolver<'a> {
    document: &'a Document,
    resources: Dictionary,
    fonts: HashMap<String, Arc<Font>>,
    xobjects: HashMap<String, Arc<XObject>>,
    ext_gstates: HashMap<String, Arc<ExtGState>>,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(document: &'a Document, resources: Dictionary) -> Self {
        Self {
            document,
            resources,
            fonts: HashMap::new(),
            xobjects: HashMap::new(),
            ext_gstates: HashMap::new(),
        }
    }

    pub fn empty(document: &'a Document) -> Self {
        Self::new(document, Dictionary::new())
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn resources(&self) -> &Dictionary {
        &self.resources
    }

    fn lookup_owned(&self, category: &str, name: &str) -> Result<Option<Object>> {
        let Some(sub) = self.resources.get(category) else {
            return Ok(None);
        };
        let sub = self.document.resolve(sub)?;
        match sub.as_dict().and_then(|d| d.get(name)) {
            Some(entry) => Ok(Some(self.document.resolve(entry)?.clone())),
            None => Ok(None),
        }
    }

    /// Names defined in one resource category
    pub fn names(&self, category: &str) -> Result<Vec<String>> {
        let Some(sub) = self.resources.get(category) else {
            return Ok(Vec::new());
        };
        Ok(self
            .document
            .resolve(sub)?
            .as_dict()
            .map(|d| d.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Font `name`; unresolvable fonts become a placeholder with zero widths
    pub fn font(&mut self, name: &str) -> Arc<Font> {
        if let Some(font) = self.fonts.get(name) {
            return Arc::clone(font);
        }
        let font = match self.try_font(name) {
            Ok(Some(font)) => font,
            Ok(None) => {
                warn!(font = name, "font resource not found, using placeholder");
                Font::placeholder(name)
            }
            Err(error) => {
                warn!(font = name, %error, "unreadable font resource, using placeholder");
                Font::placeholder(name)
            }
        };
        let font = Arc::new(font);
        self.fonts.insert(name.to_string(), Arc::clone(&font));
        font
    }

    fn try_font(&self, name: &str) -> Result<Option<Font>> {
        match self.lookup_owned("Font", name)? {
            Some(Object::Dictionary(dict)) => {
                Ok(Some(Font::from_dictionary(self.document, &dict)?))
            }
            _ => Ok(None),
        }
    }

    pub fn xobject(&mut self, name: &str) -> Arc<XObject> {
        if let Some(xobject) = self.xobjects.get(name) {
            return Arc::clone(xobject);
        }
        let xobject = match self.try_xobject(name) {
            Ok(xobject) => xobject,
            Err(error) => {
                warn!(xobject = name, %error, "unreadable XObject resource");
                XObject::Unknown
            }
        };
        if xobject == XObject::Unknown {
            warn!(xobject = name, "XObject resource not found");
        }
        let xobject = Arc::new(xobject);
        self.xobjects.insert(name.to_string(), Arc::clone(&xobject));
        xobject
    }

    fn try_xobject(&self, name: &str) -> Result<XObject> {
        let Some(sub) = self.resources.get("XObject") else {
            return Ok(XObject::Unknown);
        };
        let sub = self.document.resolve(sub)?;
        let Some(entry) = sub.as_dict().and_then(|d| d.get(name)) else {
            return Ok(XObject::Unknown);
        };
        let id = entry.as_reference();
        let Some(dict) = self.document.resolve(entry)?.as_dict() else {
            return Ok(XObject::Unknown);
        };

        let xobject = match dict.get_name("Subtype") {
            Some("Image") => XObject::Image {
                id,
                width: dict.get_integer("Width").unwrap_or(0).max(0) as u32,
                height: dict.get_integer("Height").unwrap_or(0).max(0) as u32,
            },
            Some("Form") => XObject::Form {
                id,
                bbox: dict
                    .get("BBox")
                    .and_then(Object::as_number_array)
                    .and_then(|a| <[f64; 4]>::try_from(a.as_slice()).ok())
                    .map(Rectangle::from_array)
                    .unwrap_or_else(|| Rectangle::from_array([0.0; 4])),
                matrix: dict
                    .get("Matrix")
                    .and_then(Object::as_number_array)
                    .and_then(|a| <[f64; 6]>::try_from(a.as_slice()).ok())
                    .map(TransformationMatrix::from_array)
                    .unwrap_or_else(TransformationMatrix::identity),
            },
            _ => XObject::Unknown,
        };
        Ok(xobject)
    }

    pub fn ext_gstate(&mut self, name: &str) -> Arc<ExtGState> {
        if let Some(state) = self.ext_gstates.get(name) {
            return Arc::clone(state);
        }
        let state = match self.lookup_owned("ExtGState", name) {
            Ok(Some(Object::Dictionary(dict))) => self.read_ext_gstate(&dict),
            Ok(_) => {
                warn!(ext_gstate = name, "ExtGState resource not found");
                ExtGState::default()
            }
            Err(error) => {
                warn!(ext_gstate = name, %error, "unreadable ExtGState resource");
                ExtGState::default()
            }
        };
        let state = Arc::new(state);
        self.ext_gstates.insert(name.to_string(), Arc::clone(&state));
        state
    }

    fn read_ext_gstate(&mut self, dict: &Dictionary) -> ExtGState {
        let dash = dict.get_array("D").and_then(|d| match d.as_slice() {
            [array, phase] => Some(LineDashPattern::new(
                array.as_number_array()?,
                phase.as_number()?,
            )),
            _ => None,
        });
        let font = dict.get_array("Font").and_then(|f| match f.as_slice() {
            [Object::Reference(id), size] => {
                let dict = self.document.dictionary(*id).ok()?;
                let font = Font::from_dictionary(self.document, dict).ok()?;
                Some((Arc::new(font), size.as_number()?))
            }
            _ => None,
        });

        ExtGState {
            line_width: dict.get_number("LW"),
            line_cap: dict.get_integer("LC").and_then(LineCap::from_code),
            line_join: dict.get_integer("LJ").and_then(LineJoin::from_code),
            miter_limit: dict.get_number("ML"),
            dash,
            font,
        }
    }

    /// Color space `name` as used by `cs`/`CS`
    pub fn color_space(&self, name: &str) -> ColorSpace {
        if let Some(space) = ColorSpace::from_device_name(name) {
            return space;
        }
        match self.lookup_owned("ColorSpace", name) {
            Ok(Some(definition)) => self.color_space_from_definition(&definition),
            Ok(None) => {
                warn!(color_space = name, "color space resource not found");
                ColorSpace::Unsupported(name.to_string())
            }
            Err(error) => {
                warn!(color_space = name, %error, "unreadable color space resource");
                ColorSpace::Unsupported(name.to_string())
            }
        }
    }

    fn color_space_from_definition(&self, definition: &Object) -> ColorSpace {
        match definition {
            Object::Name(name) => ColorSpace::from_device_name(name)
                .unwrap_or_else(|| ColorSpace::Unsupported(name.clone())),
            Object::Array(items) => {
                let family = items.first().and_then(Object::as_name).unwrap_or("");
                let resolved = match family {
                    "ICCBased" => items
                        .get(1)
                        .and_then(|s| self.document.resolve(s).ok())
                        .and_then(Object::as_dict)
                        .and_then(|d| d.get_integer("N"))
                        .and_then(ColorSpace::from_component_count),
                    _ => ColorSpace::from_device_name(family),
                };
                resolved.unwrap_or_else(|| {
                    warn!(family, "unsupported color space family");
                    ColorSpace::Unsupported(family.to_string())
                })
            }
            _ => ColorSpace::Unsupported(String::new()),
        }
    }
}

/// Copy of `resources` with every category map resolved to a direct dictionary
pub fn resolve_resources(document: &Document, resources: &Dictionary) -> Result<Dictionary> {
    let mut resolved = Dictionary::new();
    for (key, value) in resources.iter() {
        let value = document.resolve(value)?.clone();
        resolved.set(key.clone(), value);
    }
    Ok(resolved)
}

/// Combine two resource dictionaries; `first` wins on name collisions
pub fn merge_resources(
    document: &Document,
    first: &Dictionary,
    second: &Dictionary,
) -> Result<Dictionary> {
    let mut merged = resolve_resources(document, first)?;
    let second = resolve_resources(document, second)?;

    for category in RESOURCE_CATEGORIES {
        let Some(Object::Dictionary(extra)) = second.get(category) else {
            continue;
        };
        let mut combined = match merged.get(category) {
            Some(Object::Dictionary(existing)) => existing.clone(),
            _ => Dictionary::new(),
        };
        for (name, value) in extra.iter() {
            if !combined.contains_key(name) {
                combined.set(name.clone(), value.clone());
            }
        }
        merged.set(category, combined);
    }

    if let Some(Object::Array(extra)) = second.get("ProcSet") {
        let mut proc_sets = match merged.get("ProcSet") {
            Some(Object::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        for entry in extra {
            if !proc_sets.contains(entry) {
                proc_sets.push(entry.clone());
            }
        }
        merged.set("ProcSet", Object::Array(proc_sets));
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Stream;

    fn font_dict(base: &str) -> Dictionary {
        let mut font = Dictionary::new();
        font.set("Type", Object::name("Font"));
        font.set("Subtype", Object::name("Type1"));
        font.set("BaseFont", Object::name(base));
        font.set("Encoding", Object::name("WinAnsiEncoding"));
        font
    }

    fn sample() -> (Document, Dictionary) {
        let mut document = Document::new();
        let font_id = document.add_object(font_dict("Helvetica"));

        let mut image = Dictionary::new();
        image.set("Type", Object::name("XObject"));
        image.set("Subtype", Object::name("Image"));
        image.set("Width", 40);
        image.set("Height", 20);
        let image_id = document.add_object(Stream::with_dictionary(image, vec![0; 10]));

        let mut icc = Dictionary::new();
        icc.set("N", 3);
        let icc_id = document.add_object(Stream::with_dictionary(icc, Vec::new()));

        let mut gs = Dictionary::new();
        gs.set("LW", 2.5);
        gs.set("LC", 1);
        gs.set(
            "D",
            Object::Array(vec![Object::Array(vec![3.into()]), 0.into()]),
        );

        let fonts: Dictionary = [("F1".to_string(), Object::Reference(font_id))]
            .into_iter()
            .collect();
        let fonts_id = document.add_object(fonts);
        let xobjects: Dictionary = [("Im1".to_string(), Object::Reference(image_id))]
            .into_iter()
            .collect();
        let spaces: Dictionary = [(
            "CS0".to_string(),
            Object::Array(vec![Object::name("ICCBased"), icc_id.into()]),
        )]
        .into_iter()
        .collect();
        let states: Dictionary = [("GS1".to_string(), Object::Dictionary(gs))]
            .into_iter()
            .collect();

        let mut resources = Dictionary::new();
        resources.set("Font", fonts_id);
        resources.set("XObject", xobjects);
        resources.set("ColorSpace", spaces);
        resources.set("ExtGState", states);
        resources.set("ProcSet", Object::Array(vec![Object::name("PDF")]));
        (document, resources)
    }

    #[test]
    fn test_font_lookup_is_cached() {
        let (document, resources) = sample();
        let mut resolver = ResourceResolver::new(&document, resources);
        let first = resolver.font("F1");
        let second = resolver.font("F1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.base_font(), "Helvetica");
    }

    #[test]
    fn test_missing_font_is_placeholder() {
        let (document, resources) = sample();
        let mut resolver = ResourceResolver::new(&document, resources);
        let font = resolver.font("F9");
        assert_eq!(font.base_font(), "F9");
        assert_eq!(font.width_of(b'a'), 0.0);
    }

    #[test]
    fn test_xobject_lookup() {
        let (document, resources) = sample();
        let mut resolver = ResourceResolver::new(&document, resources);
        match resolver.xobject("Im1").as_ref() {
            XObject::Image { width, height, id } => {
                assert_eq!((*width, *height), (40, 20));
                assert!(id.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*resolver.xobject("Im2"), XObject::Unknown);
    }

    #[test]
    fn test_color_space_lookup() {
        let (document, resources) = sample();
        let resolver = ResourceResolver::new(&document, resources);
        assert_eq!(resolver.color_space("CS0"), ColorSpace::DeviceRgb);
        assert_eq!(resolver.color_space("DeviceCMYK"), ColorSpace::DeviceCmyk);
        assert_eq!(
            resolver.color_space("Missing"),
            ColorSpace::Unsupported("Missing".to_string())
        );
    }

    #[test]
    fn test_ext_gstate_parameters() {
        let (document, resources) = sample();
        let mut resolver = ResourceResolver::new(&document, resources);
        let state = resolver.ext_gstate("GS1");
        assert_eq!(state.line_width, Some(2.5));
        assert_eq!(state.line_cap, Some(LineCap::Round));
        assert_eq!(state.dash, Some(LineDashPattern::new(vec![3.0], 0.0)));
    }

    #[test]
    fn test_merge_prefers_first() {
        let (mut document, first) = sample();
        let other_font = document.add_object(font_dict("Courier"));
        let new_font = document.add_object(font_dict("Times-Roman"));

        let fonts: Dictionary = [
            ("F1".to_string(), Object::Reference(other_font)),
            ("F2".to_string(), Object::Reference(new_font)),
        ]
        .into_iter()
        .collect();
        let mut second = Dictionary::new();
        second.set("Font", fonts);
        second.set(
            "ProcSet",
            Object::Array(vec![Object::name("PDF"), Object::name("Text")]),
        );

        let merged = merge_resources(&document, &first, &second).unwrap();
        let fonts = merged.get_dict("Font").unwrap();
        assert_eq!(fonts.len(), 2);
        assert_ne!(fonts.get_reference("F1"), Some(other_font));
        assert_eq!(fonts.get_reference("F2"), Some(new_font));
        assert_eq!(merged.get_array("ProcSet").unwrap().len(), 2);
        assert!(merged.get_dict("XObject").unwrap().contains_key("Im1"));
    }
}
