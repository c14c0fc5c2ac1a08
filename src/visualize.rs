//! Boxes are drawn as 2 pixel outlines in the class colour, with a small
//! filled tab at the top-left corner marking the class. Class names can be
//! written into the tab through [`draw_boxes_with`].

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::{drawing, rect::Rect};

use crate::{labels, AnnotatedBox, ClassPalette, Error};

const LINE_WIDTH: u32 = 2;
const TAB_WIDTH: u32 = 24;
const TAB_HEIGHT: u32 = 10;

/// Outcome of [`visualize_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualizationReport {
    /// Boxes drawn on the image.
    pub drawn: usize,
    /// Label lines that could not be decoded.
    pub skipped_lines: usize,
}

fn outline(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, colour: Rgb<u8>) {
    for inset in 0..LINE_WIDTH {
        let (w, h) = (width.saturating_sub(2 * inset), height.saturating_sub(2 * inset));
        if w == 0 || h == 0 {
            break;
        }
        let off = inset as i32;
        drawing::draw_hollow_rect_mut(image, Rect::at(x + off, y + off).of_size(w, h), colour);
    }
}

/// Draw `boxes` onto `image` and return how many were drawn.
///
/// Boxes that cover less than a pixel in either direction are skipped. The
/// class tab is left blank; use [`draw_boxes_with`] to write class names.
pub fn draw_boxes(image: &mut RgbImage, boxes: &[AnnotatedBox], palette: &ClassPalette) -> usize {
    draw_boxes_with(image, boxes, palette, |_, _| {})
}

/// Where and how the class name of a drawn box goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caption<'a> {
    /// Class name from the palette.
    pub text: &'a str,
    /// Left edge of the class tab.
    pub x: i32,
    /// Top edge of the class tab.
    pub y: i32,
    /// Tab height in pixels, a natural text scale.
    pub height: u32,
    /// Class colour, which fills the tab.
    pub colour: Rgb<u8>,
}

/// Like [`draw_boxes`], calling `caption` once per drawn box after its tab
/// is filled.
///
/// No font ships with this crate. Callers with one can render the name,
/// e.g. with `imageproc::drawing::draw_text_mut` in a contrasting colour at
/// `(caption.x, caption.y)`.
pub fn draw_boxes_with<F>(
    image: &mut RgbImage,
    boxes: &[AnnotatedBox],
    palette: &ClassPalette,
    mut caption: F,
) -> usize
where
    F: FnMut(&mut RgbImage, Caption<'_>),
{
    let (img_w, img_h) = image.dimensions();
    let mut drawn = 0;
    for bbox in boxes {
        let rect = bbox.pixel_rect(img_w, img_h);
        let x = rect.x1.round() as i32;
        let y = rect.y1.round() as i32;
        let width = rect.width().round() as u32;
        let height = rect.height().round() as u32;
        if width == 0 || height == 0 {
            log::debug!("not drawing degenerate box {bbox}");
            continue;
        }

        let colour = Rgb(palette.colour(bbox.class_idx));
        outline(image, x, y, width, height, colour);

        // Above the box if there is room, otherwise inside it.
        let tab_y = if y >= TAB_HEIGHT as i32 {
            y - TAB_HEIGHT as i32
        } else {
            y
        };
        drawing::draw_filled_rect_mut(
            image,
            Rect::at(x, tab_y).of_size(TAB_WIDTH.min(width), TAB_HEIGHT),
            colour,
        );
        let name = palette.name(bbox.class_idx);
        caption(
            image,
            Caption {
                text: &name,
                x,
                y: tab_y,
                height: TAB_HEIGHT,
                colour,
            },
        );
        log::debug!("drew {name} at ({x}, {y}) {width}x{height}");
        drawn += 1;
    }
    drawn
}

/// Overlay the boxes of a label file on an image and save the result.
///
/// Corrupt label lines are skipped and counted in the report. Missing parent
/// directories of `output_path` are created.
pub fn visualize_file<P1, P2, P3>(
    image_path: P1,
    label_path: P2,
    output_path: P3,
    palette: &ClassPalette,
) -> Result<VisualizationReport, Error>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    P3: AsRef<Path>,
{
    let mut image = image::open(image_path.as_ref())?.to_rgb8();
    let records = labels::read_records(label_path)?;
    let drawn = draw_boxes(&mut image, &records.boxes, palette);

    let output_path = output_path.as_ref();
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    image.save(output_path)?;
    log::info!("wrote overlay with {drawn} boxes to {}", output_path.display());

    Ok(VisualizationReport {
        drawn,
        skipped_lines: records.skipped_count(),
    })
}
