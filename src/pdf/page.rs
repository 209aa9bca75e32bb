//! Page geometry and inherited page attributes

use lopdf::{Document, Object, ObjectId};
use crate::error::{Error, Result};

/// Guard against cyclic `Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// A page rectangle in default user space units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { llx: 0.0, lly: 0.0, urx: width, ury: height }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }
}

/// Read a numeric PDF object
pub fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(n) => Some(*n),
        _ => None,
    }
}

/// Look up a page attribute, following `Parent` links for inheritable keys
/// such as `MediaBox` and `Resources`.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut node_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(node_id)?;

        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return Ok(None),
        }
    }

    Err(Error::General("Page tree is too deep or cyclic".to_string()))
}

/// Follow a single indirect reference, if the object is one
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Resolve the effective `MediaBox` of a page
pub fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?
        .ok_or_else(|| Error::General(format!("Page {:?} has no MediaBox", page_id)))?;

    let values = match resolve(doc, media_box)? {
        Object::Array(values) => values,
        _ => return Err(Error::General("MediaBox is not an array".to_string())),
    };

    let numbers: Vec<f32> = values
        .iter()
        .map(|value| resolve(doc, value).ok().and_then(as_number))
        .collect::<Option<Vec<f32>>>()
        .filter(|numbers| numbers.len() == 4)
        .ok_or_else(|| Error::General("MediaBox must hold four numbers".to_string()))?;

    Ok(PageBox {
        llx: numbers[0].min(numbers[2]),
        lly: numbers[1].min(numbers[3]),
        urx: numbers[0].max(numbers[2]),
        ury: numbers[1].max(numbers[3]),
    })
}
