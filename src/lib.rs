// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
icongen renders a browser extension's SVG icon into the fixed-size PNG
assets its manifest expects.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::uninlined_format_args)]

use std::path::Path;

use usvg::fontdb;

/// Pixel sizes of the PNG icons an extension manifest expects.
///
/// The list order is just the iteration order. Each icon is square,
/// `size`×`size`.
pub const ICON_SIZES: [u32; 3] = [16, 48, 128];

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// Failed to read the source file or write an output file.
    Io(std::io::Error),

    /// The source is not a valid SVG document.
    Svg(usvg::Error),

    /// The requested size cannot back a pixmap.
    ///
    /// Occurs when the size is zero or the `size`×`size` allocation
    /// would overflow.
    InvalidSize(u32),

    /// Failed to encode an output PNG.
    Png(png::EncodingError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<usvg::Error> for Error {
    fn from(e: usvg::Error) -> Self {
        Error::Svg(e)
    }
}

impl From<png::EncodingError> for Error {
    fn from(e: png::EncodingError) -> Self {
        Error::Png(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Svg(ref e) => write!(f, "{}", e),
            Error::InvalidSize(size) => write!(f, "{0}x{0} is not a valid icon size", size),
            Error::Png(ref e) => write!(f, "failed to encode a PNG: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// An SVG icon parsed once and ready to be rasterized at multiple sizes.
pub struct Icon {
    tree: usvg::Tree,
}

impl Icon {
    /// Parses an icon from raw SVG or SVGZ data.
    pub fn from_data(data: &[u8]) -> Result<Self, Error> {
        let data = if data.starts_with(&[0x1f, 0x8b]) {
            std::borrow::Cow::Owned(usvg::decompress_svgz(data)?)
        } else {
            std::borrow::Cow::Borrowed(data)
        };

        let text = std::str::from_utf8(&data).map_err(|_| usvg::Error::NotAnUtf8Str)?;

        let xml_opt = usvg::roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = usvg::roxmltree::Document::parse_with_options(text, xml_opt)
            .map_err(usvg::Error::ParsingFailed)?;

        // fontdb initialization is pretty expensive, so perform it only when needed.
        let mut fontdb = fontdb::Database::new();
        let has_text_nodes = doc.descendants().any(|n| n.has_tag_name((SVG_NS, "text")));
        if has_text_nodes {
            fontdb.load_system_fonts();
        }

        let tree = usvg::Tree::from_xmltree(&doc, &usvg::Options::default(), &fontdb)?;
        Ok(Icon { tree })
    }

    /// Renders the icon into a `size`×`size` pixmap.
    ///
    /// The document is scaled to fill the whole canvas, so a non-square
    /// icon will be stretched.
    pub fn rasterize(&self, size: u32) -> Result<tiny_skia::Pixmap, Error> {
        let mut pixmap = tiny_skia::Pixmap::new(size, size).ok_or(Error::InvalidSize(size))?;

        let ts = tiny_skia::Transform::from_scale(
            size as f32 / self.tree.size().width(),
            size as f32 / self.tree.size().height(),
        );
        resvg::render(&self.tree, ts, &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

/// Produces the complete PNG icon set from a single SVG source.
///
/// Creates `out_dir` when missing, reads `svg_path` once and writes
/// `out_dir/icon{size}.png` for every size in [`ICON_SIZES`], overwriting
/// stale files. A failure aborts the remaining sizes; icons already
/// written stay on disk.
pub fn generate_icons(svg_path: &Path, out_dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(out_dir)?;

    let svg_data = std::fs::read(svg_path)?;
    let icon = Icon::from_data(&svg_data)?;

    for size in ICON_SIZES {
        let pixmap = icon.rasterize(size)?;
        pixmap.save_png(out_dir.join(format!("icon{}.png", size)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_SQUARE: &str =
        "<svg xmlns='http://www.w3.org/2000/svg' width='64' height='64'>\
         <rect width='64' height='64' fill='#ff0000'/></svg>";

    const WIDE_GREEN: &str =
        "<svg xmlns='http://www.w3.org/2000/svg' width='100' height='50'>\
         <rect width='100' height='50' fill='#00ff00'/></svg>";

    #[test]
    fn rasterize_matches_requested_size() {
        let icon = Icon::from_data(RED_SQUARE.as_bytes()).unwrap();
        for size in ICON_SIZES {
            let pixmap = icon.rasterize(size).unwrap();
            assert_eq!(pixmap.width(), size);
            assert_eq!(pixmap.height(), size);
        }
    }

    #[test]
    fn rasterize_fills_the_canvas() {
        let icon = Icon::from_data(RED_SQUARE.as_bytes()).unwrap();
        let pixmap = icon.rasterize(16).unwrap();

        for (x, y) in [(0, 0), (15, 0), (0, 15), (15, 15), (8, 8)] {
            let pixel = pixmap.pixel(x, y).unwrap();
            assert_eq!(pixel.red(), 255);
            assert_eq!(pixel.green(), 0);
            assert_eq!(pixel.alpha(), 255);
        }
    }

    #[test]
    fn non_square_source_is_stretched() {
        let icon = Icon::from_data(WIDE_GREEN.as_bytes()).unwrap();
        let pixmap = icon.rasterize(32).unwrap();

        assert_eq!(pixmap.width(), 32);
        assert_eq!(pixmap.height(), 32);

        // The bottom row would be transparent if the aspect ratio was kept.
        let pixel = pixmap.pixel(16, 31).unwrap();
        assert_eq!(pixel.green(), 255);
        assert_eq!(pixel.alpha(), 255);
    }

    #[test]
    fn zero_size_is_rejected() {
        let icon = Icon::from_data(RED_SQUARE.as_bytes()).unwrap();
        assert!(matches!(icon.rasterize(0), Err(Error::InvalidSize(0))));
    }

    #[test]
    fn malformed_svg_is_rejected() {
        assert!(matches!(
            Icon::from_data(b"not an svg at all"),
            Err(Error::Svg(_))
        ));
    }
}
