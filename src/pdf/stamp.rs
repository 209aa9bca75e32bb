//! Image stamping onto every page of a PDF using lopdf
//!
//! The image is embedded once and drawn on each page at a fixed size, offset
//! from that page's own top-right corner, so documents with mixed page sizes
//! are stamped correctly.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::Result;
use crate::pdf::xobject::StampImage;
use crate::pdf::page::{inherited_attribute, page_box, resolve, PageBox};

/// Resource name under which the stamp image is registered on each page
pub const STAMP_XOBJECT_NAME: &str = "DocbatchStamp";

/// Size and position of the stamp
#[derive(Debug, Clone, PartialEq)]
pub struct StampOptions {
    /// Drawn width in points
    pub width: f32,
    /// Drawn height in points
    pub height: f32,
    /// Distance from the top and right page edges in points
    pub margin: f32,
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            width: 30.0,
            height: 30.0,
            margin: 20.0,
        }
    }
}

/// Rectangle the stamp is drawn into, in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Position the stamp `margin` points in from the top-right corner of `page`
pub fn placement(page: &PageBox, options: &StampOptions) -> Placement {
    Placement {
        x: page.urx - options.width - options.margin,
        y: page.ury - options.height - options.margin,
        width: options.width,
        height: options.height,
    }
}

/// Stamp `image` onto every page of `pdf`, returning the re-serialised document
pub fn stamp_pdf(pdf: &[u8], image: &StampImage, options: &StampOptions) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf)?;
    let image_id = image.embed(&mut doc);
    debug!(
        format = ?image.format(),
        dimensions = ?image.dimensions(),
        alpha = image.has_alpha(),
        "embedded stamp image"
    );

    // Shared by every page: saves the graphics state before the original content
    let save_state_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in pages {
        let page = page_box(&doc, page_id)?;
        let target = placement(&page, options);

        add_xobject_to_page_resources(&mut doc, page_id, image_id)?;

        // Restore whatever state the original content left, then draw the image
        let draw = format!(
            "\nQ\nq\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
            target.width, target.height, target.x, target.y, STAMP_XOBJECT_NAME
        );
        let draw_id = doc.add_object(Stream::new(Dictionary::new(), draw.into_bytes()));

        prepend_content_to_page(&mut doc, page_id, save_state_id)?;
        append_content_to_page(&mut doc, page_id, draw_id)?;

        debug!(?page_id, x = target.x, y = target.y, "stamped page");
    }

    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Register the image XObject in the page's own Resources dictionary.
///
/// Inherited or indirect resources are copied onto the page first so the
/// original fonts and images stay reachable.
fn add_xobject_to_page_resources(doc: &mut Document, page_id: ObjectId, xobject_id: ObjectId) -> Result<()> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources")? {
        Some(res) => match resolve(doc, res)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(xo) => match resolve(doc, xo)? {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };

    xobjects.set(STAMP_XOBJECT_NAME, Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// Prepend a content stream to a page's Contents
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;

    match page_dict.get(b"Contents").ok().cloned() {
        Some(Object::Reference(content_id)) => {
            page_dict.set("Contents", Object::Array(vec![
                Object::Reference(new_content_id),
                Object::Reference(content_id),
            ]));
        }
        Some(Object::Array(mut content_array)) => {
            content_array.insert(0, Object::Reference(new_content_id));
            page_dict.set("Contents", Object::Array(content_array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(vec![Object::Reference(new_content_id)]));
        }
    }

    Ok(())
}

/// Append a content stream to a page's Contents so it draws on top
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;

    match page_dict.get(b"Contents").ok().cloned() {
        Some(Object::Reference(content_id)) => {
            page_dict.set("Contents", Object::Array(vec![
                Object::Reference(content_id),
                Object::Reference(new_content_id),
            ]));
        }
        Some(Object::Array(mut content_array)) => {
            content_array.push(Object::Reference(new_content_id));
            page_dict.set("Contents", Object::Array(content_array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(vec![Object::Reference(new_content_id)]));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page::as_number;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use lopdf::content::Content;
    use lopdf::dictionary;
    use std::io::Cursor;

    fn jpeg_stamp() -> StampImage {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        StampImage::from_bytes(&out.into_inner()).unwrap()
    }

    /// Two pages: A4 with its own MediaBox, Letter inherited from the page tree
    fn mixed_size_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET".to_vec(),
        ));

        let a4_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(595.28), Object::Real(841.89)],
            "Contents" => content_id,
        });
        let letter_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });

        doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(a4_id), Object::Reference(letter_id)],
            "Count" => Object::Integer(2),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    /// The `cm` operands drawn right before the stamp's `Do`
    fn stamp_matrix(doc: &Document, page_id: ObjectId) -> Vec<f32> {
        let content = doc.get_page_content(page_id).unwrap();
        let operations = Content::decode(&content).unwrap().operations;
        let do_index = operations
            .iter()
            .position(|op| {
                op.operator == "Do"
                    && op.operands.first().and_then(|o| o.as_name().ok())
                        == Some(STAMP_XOBJECT_NAME.as_bytes())
            })
            .expect("stamp is drawn");
        let cm = operations[..do_index]
            .iter()
            .rev()
            .find(|op| op.operator == "cm")
            .expect("stamp is positioned");
        cm.operands.iter().map(|o| as_number(o).unwrap()).collect()
    }

    #[test]
    fn test_placement_top_right() {
        let target = placement(&PageBox::new(612.0, 792.0), &StampOptions::default());
        assert_eq!(target, Placement { x: 562.0, y: 742.0, width: 30.0, height: 30.0 });
    }

    #[test]
    fn test_placement_stays_on_page() {
        let options = StampOptions { width: 80.0, height: 80.0, margin: 20.0 };
        for (width, height) in [(100.0, 100.0), (200.5, 90.0), (595.28, 841.89), (1684.0, 2384.0)] {
            let target = placement(&PageBox::new(width, height), &options);
            assert!(target.x >= 0.0 && target.x + target.width <= width);
            assert!(target.y >= 0.0 && target.y + target.height <= height);
        }
    }

    #[test]
    fn test_every_page_is_stamped_for_its_own_size() {
        let stamped = stamp_pdf(&mixed_size_pdf(), &jpeg_stamp(), &StampOptions::default()).unwrap();

        let mut doc = Document::load_mem(&stamped).unwrap();
        doc.decompress();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 2);

        let a4 = stamp_matrix(&doc, pages[0]);
        assert_eq!(a4[0], 30.0);
        assert_eq!(a4[3], 30.0);
        assert!((a4[4] - (595.28 - 50.0)).abs() < 0.01);
        assert!((a4[5] - (841.89 - 50.0)).abs() < 0.01);

        let letter = stamp_matrix(&doc, pages[1]);
        assert_eq!(letter[4], 562.0);
        assert_eq!(letter[5], 742.0);
    }

    #[test]
    fn test_inherited_resources_are_kept() {
        let stamped = stamp_pdf(&mixed_size_pdf(), &jpeg_stamp(), &StampOptions::default()).unwrap();
        let doc = Document::load_mem(&stamped).unwrap();

        for page_id in doc.get_pages().into_values() {
            let resources = doc.get_dictionary(page_id).unwrap()
                .get(b"Resources").unwrap()
                .as_dict().unwrap();
            assert!(resources.get(b"Font").is_ok());
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            assert!(xobjects.get(STAMP_XOBJECT_NAME.as_bytes()).is_ok());
        }
    }

    #[test]
    fn test_invalid_pdf_fails() {
        assert!(stamp_pdf(b"", &jpeg_stamp(), &StampOptions::default()).is_err());
    }
}
