pub mod color;
pub mod decode;
pub mod fonts;
pub mod loader;

pub use color::{parse_css_color, parse_css_color_or};
pub use decode::{PreparedImage, decode_image};
pub use fonts::{FontBook, FontFace, GlyphBrush, TextLayoutEngine, parse_font_weight};
pub use loader::{DefaultImageLoader, ImageCache, ImageLoader, decode_data_url};
