//! Page tree maintenance
//!
//! Pages are handled as a one-level tree: [`flatten`] moves every leaf
//! directly under the root and copies the inheritable attributes into each
//! leaf, [`uplift`] moves attributes shared by all leaves back to the root
//! before saving.

use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::page::Page;
use std::collections::HashSet;
use tracing::debug;

/// Attributes a page inherits from its ancestors
pub const INHERITABLE_ATTRIBUTES: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Leaf pages in document order
pub fn pages(document: &Document) -> Result<Vec<Page>> {
    let root = document.pages_id()?;
    let mut leaves = Vec::new();
    let mut visited = HashSet::new();
    collect_leaves(
        document,
        root,
        &Dictionary::new(),
        &mut visited,
        &mut |id: ObjectId, _: &Dictionary| leaves.push(Page::new(id)),
    )?;
    Ok(leaves)
}

pub fn page_count(document: &Document) -> Result<usize> {
    Ok(pages(document)?.len())
}

fn collect_leaves(
    document: &Document,
    node_id: ObjectId,
    inherited: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    visit: &mut dyn FnMut(ObjectId, &Dictionary),
) -> Result<()> {
    if !visited.insert(node_id) {
        return Err(PdfError::InvalidStructure(format!(
            "page tree node {node_id} is referenced twice"
        )));
    }
    let node = document.dictionary(node_id)?;

    let mut attributes = inherited.clone();
    for key in INHERITABLE_ATTRIBUTES {
        if let Some(value) = node.get(key) {
            attributes.set(key, value.clone());
        }
    }

    match node.get_type() {
        Some("Pages") => {
            let kids = match node.get("Kids") {
                Some(kids) => document.resolve(kids)?.as_array().cloned().unwrap_or_default(),
                None => Vec::new(),
            };
            for kid in kids {
                let kid_id = kid.as_reference().ok_or_else(|| {
                    PdfError::InvalidStructure("page tree /Kids holds a direct object".to_string())
                })?;
                collect_leaves(document, kid_id, &attributes, visited, visit)?;
            }
        }
        _ => visit(node_id, &attributes),
    }
    Ok(())
}

/// Hang every page directly below the root, pushing inherited attributes down
pub fn flatten(document: &mut Document) -> Result<Vec<Page>> {
    let root = document.pages_id()?;
    let mut leaves: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut visited = HashSet::new();
    collect_leaves(
        document,
        root,
        &Dictionary::new(),
        &mut visited,
        &mut |id: ObjectId, attributes: &Dictionary| leaves.push((id, attributes.clone())),
    )?;

    for (id, attributes) in &leaves {
        let page = document.dictionary_mut(*id)?;
        for (key, value) in attributes.iter() {
            if !page.contains_key(key) {
                page.set(key.clone(), value.clone());
            }
        }
        page.set("Parent", Object::Reference(root));
    }

    let intermediate: Vec<ObjectId> = visited
        .into_iter()
        .filter(|id| *id != root && !leaves.iter().any(|(leaf, _)| leaf == id))
        .collect();
    for id in &intermediate {
        document.remove_object(*id);
    }

    let root_dict = document.dictionary_mut(root)?;
    for key in INHERITABLE_ATTRIBUTES {
        root_dict.remove(key);
    }
    root_dict.set(
        "Kids",
        Object::Array(leaves.iter().map(|(id, _)| Object::Reference(*id)).collect()),
    );
    root_dict.set("Count", leaves.len());
    debug!(pages = leaves.len(), removed = intermediate.len(), "page tree flattened");

    Ok(leaves.into_iter().map(|(id, _)| Page::new(id)).collect())
}

/// Move attributes every page carries with the same value to the root
pub fn uplift(document: &mut Document) -> Result<()> {
    let root = document.pages_id()?;
    let leaves = pages(document)?;
    if leaves.is_empty() {
        return Ok(());
    }

    for key in INHERITABLE_ATTRIBUTES {
        let first = document.dictionary(leaves[0].id())?.get(key).cloned();
        let Some(shared) = first else {
            continue;
        };
        let mut identical = true;
        for page in &leaves[1..] {
            if document.dictionary(page.id())?.get(key) != Some(&shared) {
                identical = false;
                break;
            }
        }
        if !identical {
            continue;
        }
        for page in &leaves {
            document.dictionary_mut(page.id())?.remove(key);
        }
        document.dictionary_mut(root)?.set(key, shared);
    }
    Ok(())
}

/// Append `page` to the root's kids
pub fn add_page(document: &mut Document, mut page: Dictionary) -> Result<Page> {
    let root = document.pages_id()?;
    page.set("Type", Object::name("Page"));
    page.set("Parent", Object::Reference(root));
    let id = document.add_object(page);

    let root_dict = document.dictionary_mut(root)?;
    let mut kids = root_dict.get_array("Kids").cloned().unwrap_or_default();
    kids.push(Object::Reference(id));
    let count = kids.len();
    root_dict.set("Kids", Object::Array(kids));
    root_dict.set("Count", count);
    Ok(Page::new(id))
}

/// New page sharing content streams and resources with `page`
pub fn clone_page(document: &mut Document, page: Page) -> Result<Page> {
    let dict = page.dictionary(document)?.clone();
    add_page(document, dict)
}

/// Drop `page` from the root's kids and the document
pub fn remove_page(document: &mut Document, page: Page) -> Result<()> {
    let root = document.pages_id()?;
    let root_dict = document.dictionary_mut(root)?;
    let kids: Vec<Object> = root_dict
        .get_array("Kids")
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|kid| kid.as_reference() != Some(page.id()))
        .collect();
    let count = kids.len();
    root_dict.set("Kids", Object::Array(kids));
    root_dict.set("Count", count);
    document.remove_object(page.id());
    Ok(())
}
