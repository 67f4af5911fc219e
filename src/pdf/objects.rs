//! Object graph helpers shared by the compositor and the assembler

use std::collections::{BTreeSet, HashMap};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::Result;

/// Page attributes a page may inherit from its ancestors in the page tree
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against `Parent` cycles in malformed files
const MAX_DEPTH: usize = 64;

/// Follow references until a direct object is reached
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    let (_, target) = doc.dereference(object)?;
    Ok(target)
}

/// Look up a page attribute, walking up `Parent` links when the page lacks it
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut node = doc.get_object(page_id)?.as_dict()?;

    for _ in 0..MAX_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node = doc.get_object(*parent_id)?.as_dict()?,
            _ => return Ok(None),
        }
    }

    Ok(None)
}

/// Collect every object id reachable from `object`
pub fn collect_references(doc: &Document, object: &Object, found: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if found.insert(*id) {
                if let Ok(target) = doc.get_object(*id) {
                    collect_references(doc, target, found);
                }
            }
        }
        Object::Array(items) => {
            for item in items {
                collect_references(doc, item, found);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(doc, value, found);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(doc, value, found);
            }
        }
        _ => {}
    }
}

/// Renumber all object references in an object
pub fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => {
            Object::Reference(id_map.get(old_id).copied().unwrap_or(*old_id))
        }
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut stream = stream.clone();
            stream.dict = renumber_dictionary(&stream.dict, id_map);
            Object::Stream(stream)
        }
        _ => object.clone(),
    }
}

/// Renumber the references held by a dictionary's values
pub fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Content stream references of a page, flattened into one list
///
/// `Contents` may be a single stream reference, an array of them, or a
/// reference to such an array.
pub fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_object(page_id)?.as_dict()?;

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Array(items) => Ok(items.clone()),
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    #[test]
    fn test_inherited_attribute_walks_parents() {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let mid_id = doc.new_object_id();

        let mut page = Dictionary::new();
        page.set("Type", name("Page"));
        page.set("Parent", Object::Reference(mid_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut mid = Dictionary::new();
        mid.set("Type", name("Pages"));
        mid.set("Parent", Object::Reference(root_id));
        mid.set("Rotate", Object::Integer(90));
        doc.objects.insert(mid_id, Object::Dictionary(mid));

        let mut root = Dictionary::new();
        root.set("Type", name("Pages"));
        root.set("MediaBox", Object::Array(vec![0.into(), 0.into(), 100.into(), 200.into()]));
        doc.objects.insert(root_id, Object::Dictionary(root));

        let rotate = inherited_attribute(&doc, page_id, b"Rotate").unwrap().unwrap();
        assert_eq!(rotate.as_i64().unwrap(), 90);

        let media_box = inherited_attribute(&doc, page_id, b"MediaBox").unwrap().unwrap();
        assert_eq!(media_box.as_array().unwrap().len(), 4);

        assert!(inherited_attribute(&doc, page_id, b"CropBox").unwrap().is_none());
    }

    #[test]
    fn test_collect_and_renumber_references() {
        let mut doc = Document::with_version("1.5");
        let leaf_id = doc.add_object(Object::Integer(7));
        let mut inner = Dictionary::new();
        inner.set("Leaf", Object::Reference(leaf_id));
        let inner_id = doc.add_object(Object::Dictionary(inner));

        let root = Object::Array(vec![Object::Reference(inner_id), Object::Integer(1)]);
        let mut found = BTreeSet::new();
        collect_references(&doc, &root, &mut found);
        assert_eq!(found, BTreeSet::from([leaf_id, inner_id]));

        let id_map = HashMap::from([(inner_id, (100, 0))]);
        let renumbered = renumber_object_references(&root, &id_map);
        assert_eq!(renumbered.as_array().unwrap()[0].as_reference().unwrap(), (100, 0));
    }

    #[test]
    fn test_content_references_through_indirect_array() {
        let mut doc = Document::with_version("1.5");
        let a = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m".to_vec()));
        let b = doc.add_object(Stream::new(Dictionary::new(), b"1 1 l S".to_vec()));
        let array_id = doc.add_object(Object::Array(vec![Object::Reference(a), Object::Reference(b)]));

        let mut page = Dictionary::new();
        page.set("Contents", Object::Reference(array_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let refs: Vec<ObjectId> = content_references(&doc, page_id).unwrap()
            .iter()
            .map(|o| o.as_reference().unwrap())
            .collect();
        assert_eq!(refs, vec![a, b]);
    }

    #[test]
    fn test_resolve_follows_chain() {
        let mut doc = Document::with_version("1.5");
        let target = doc.add_object(Object::Integer(3));
        let hop = doc.add_object(Object::Reference(target));
        let start = Object::Reference(hop);
        assert_eq!(resolve(&doc, &start).unwrap().as_i64().unwrap(), 3);
    }
}
