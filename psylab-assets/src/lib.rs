mod cache;
mod font;

pub use cache::{Atom, get_text, intern_text, text_count};
pub use font::{AssetError, FONT_ENV, font_bytes, font_candidates, load_font_file};
