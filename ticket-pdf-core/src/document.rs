use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::{PdfReader, XRefTable};
use crate::writer::{PdfWriter, WriterConfig};
use std::collections::{BTreeMap, HashSet};

/// Reference chains longer than this are treated as cycles
const MAX_REFERENCE_DEPTH: usize = 32;

/// An owned PDF object graph.
///
/// Every indirect object lives here keyed by its id; everything else refers
/// to objects through [`Object::Reference`] and resolves them on demand.
#[derive(Debug, Clone)]
pub struct Document {
    version: String,
    objects: BTreeMap<ObjectId, Object>,
    trailer: Dictionary,
    xref: XRefTable,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document without catalog
    pub fn new() -> Self {
        Self {
            version: "1.7".to_string(),
            objects: BTreeMap::new(),
            trailer: Dictionary::new(),
            xref: XRefTable::new(),
        }
    }

    pub(crate) fn from_parsed(
        version: String,
        objects: BTreeMap<ObjectId, Object>,
        trailer: Dictionary,
        mut xref: XRefTable,
    ) -> Self {
        // Objects pulled out of object streams keep their slots allocated
        for id in objects.keys() {
            if xref.get(id.number()).is_none() {
                xref.insert(
                    id.number(),
                    crate::parser::XRefEntry::InUse {
                        offset: 0,
                        generation: id.generation(),
                    },
                );
            }
        }
        Self {
            version,
            objects,
            trailer,
            xref,
        }
    }

    /// Parse a complete PDF file
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Ok(PdfReader::parse(bytes)?)
    }

    /// Serialize the object graph
    pub fn save(&self, config: &WriterConfig) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        PdfWriter::new_with_writer(&mut buffer).write_document(self, config)?;
        Ok(buffer)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    /// Object for `id`, failing when the id is dangling
    pub fn object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(PdfError::InvalidReference(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects
            .get_mut(&id)
            .ok_or(PdfError::InvalidReference(id))
    }

    /// Dictionary (or stream dictionary) stored under `id`
    pub fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.object(id)?.as_dict().ok_or_else(|| {
            PdfError::InvalidStructure(format!("object {id} is not a dictionary"))
        })
    }

    pub fn dictionary_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        self.object_mut(id)?.as_dict_mut().ok_or_else(|| {
            PdfError::InvalidStructure(format!("object {id} is not a dictionary"))
        })
    }

    /// Reserve a new object id
    pub fn new_object_id(&mut self) -> ObjectId {
        self.xref.allocate()
    }

    /// Store a new indirect object and return its id
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.new_object_id();
        self.objects.insert(id, object.into());
        id
    }

    /// Store `object` under an existing or reserved id
    pub fn set_object(&mut self, id: ObjectId, object: impl Into<Object>) {
        self.objects.insert(id, object.into());
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id)
    }

    /// Follow references until a direct value is reached
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match current {
                Object::Reference(id) => current = self.object(*id)?,
                direct => return Ok(direct),
            }
        }
        Err(crate::parser::ParseError::CircularReference.into())
    }

    /// Resolve a value expected to be a dictionary
    pub fn resolve_dict<'a>(&'a self, object: &'a Object) -> Result<&'a Dictionary> {
        let resolved = self.resolve(object)?;
        resolved.as_dict().ok_or_else(|| {
            PdfError::InvalidStructure(format!(
                "expected dictionary, found {}",
                resolved.type_name()
            ))
        })
    }

    /// Resolve `dict[key]`, `None` when the key is absent or null
    pub fn resolve_key<'a>(
        &'a self,
        dict: &'a Dictionary,
        key: &str,
    ) -> Result<Option<&'a Object>> {
        match dict.get(key) {
            None => Ok(None),
            Some(value) => match self.resolve(value)? {
                Object::Null => Ok(None),
                resolved => Ok(Some(resolved)),
            },
        }
    }

    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.trailer
            .get_reference("Root")
            .ok_or_else(|| PdfError::InvalidStructure("trailer has no /Root".to_string()))
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        self.dictionary(self.catalog_id()?)
    }

    /// Id of the page tree root referenced by the catalog
    pub fn pages_id(&self) -> Result<ObjectId> {
        self.catalog()?
            .get_reference("Pages")
            .ok_or_else(|| PdfError::InvalidStructure("catalog has no /Pages".to_string()))
    }

    /// Drop every object that cannot be reached from the trailer
    pub fn prune_unreachable(&mut self) -> usize {
        let mut reachable = HashSet::new();
        let mut pending: Vec<ObjectId> = Vec::new();
        collect_references(&Object::Dictionary(self.trailer.clone()), &mut pending);

        while let Some(id) = pending.pop() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(object) = self.objects.get(&id) {
                collect_references(object, &mut pending);
            }
        }

        let before = self.objects.len();
        self.objects.retain(|id, _| reachable.contains(id));
        before - self.objects.len()
    }

    /// Largest object number in use
    pub fn max_object_number(&self) -> u32 {
        self.objects
            .keys()
            .next_back()
            .map(ObjectId::number)
            .unwrap_or(0)
            .max(self.xref.max_object_number())
    }
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_references(v, out)),
        Object::Stream(stream) => stream
            .dictionary()
            .iter()
            .for_each(|(_, v)| collect_references(v, out)),
        _ => {}
    }
}
