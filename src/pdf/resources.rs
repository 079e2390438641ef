use lopdf::{Dictionary, Document, Object, ObjectId};

/// Create the resources dictionary shared by every page of the book
pub fn create_shared_resources(doc: &mut Document) -> ObjectId {
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(Dictionary::new()));
    resources.set(
        "ProcSet",
        vec![Object::Name(b"PDF".to_vec()), Object::Name(b"Text".to_vec())],
    );
    doc.add_object(Object::Dictionary(resources))
}

/// Register a font under `name` in a resources dictionary
///
/// Pages reference the shared dictionary, so a font registered after
/// some pages were written is still visible to them.
pub fn register_font(doc: &mut Document, resources_id: ObjectId, name: &str, font_id: ObjectId) {
    if let Ok(res) = doc.get_dictionary_mut(resources_id) {
        let mut font_resources = res
            .get(b"Font")
            .and_then(|f| f.as_dict())
            .cloned()
            .unwrap_or_else(|_| Dictionary::new());
        font_resources.set(name, Object::Reference(font_id));
        res.set("Font", Object::Dictionary(font_resources));
    }
}
