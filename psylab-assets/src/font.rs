use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Environment variable naming an explicit TTF/OTF file
pub const FONT_ENV: &str = "PSYLAB_FONT";

const SYSTEM_FONTS: &[&str] = &[
    "assets/DejaVuSans-Bold.ttf",
    "assets/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no usable font found (tried {tried:?}); set PSYLAB_FONT to a .ttf file")]
    FontNotFound { tried: Vec<PathBuf> },

    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

lazy_static! {
    static ref FONT_BYTES: Mutex<Option<&'static [u8]>> = Mutex::new(None);
}

/// Paths probed for a font, in order
pub fn font_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(SYSTEM_FONTS.len() + 1);
    if let Ok(explicit) = std::env::var(FONT_ENV) {
        paths.push(PathBuf::from(explicit));
    }
    paths.extend(SYSTEM_FONTS.iter().map(PathBuf::from));
    paths
}

pub fn load_font_file(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::FontRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Font shared by the renderer and the plot backend, loaded once per process.
///
/// The bytes are leaked so glyph users can borrow them for `'static`.
pub fn font_bytes() -> Result<&'static [u8], AssetError> {
    let mut slot = FONT_BYTES.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(bytes) = *slot {
        return Ok(bytes);
    }

    let tried = font_candidates();
    let path = tried
        .iter()
        .find(|p| p.is_file())
        .ok_or_else(|| AssetError::FontNotFound {
            tried: tried.clone(),
        })?;

    let bytes: &'static [u8] = Box::leak(load_font_file(path)?.into_boxed_slice());
    tracing::info!(path = %path.display(), size = bytes.len(), "loaded font");
    *slot = Some(bytes);
    Ok(bytes)
}
