//! Card renderer: composites the signature overlay onto a card template and
//! records the usage.

pub mod overlay;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, ImageReader, RgbaImage};
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Store, StoreError};
use crate::models::card::Card;

use self::overlay::build_overlay_svg;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("overlay error: {0}")]
    Svg(#[from] usvg::Error),

    #[error("cannot allocate a {0}x{1} overlay")]
    Overlay(u32, u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Renders personalized cards into the generated-files directory.
pub struct CardRenderer {
    /// Root that card `image_path`s are relative to.
    data_dir: PathBuf,
    generated_dir: PathBuf,
    fontdb: Arc<fontdb::Database>,
}

impl CardRenderer {
    pub fn new(
        data_dir: PathBuf,
        generated_dir: PathBuf,
        fontdb: fontdb::Database,
    ) -> Result<Self, RenderError> {
        std::fs::create_dir_all(&generated_dir)?;
        Ok(Self {
            data_dir,
            generated_dir,
            fontdb: Arc::new(fontdb),
        })
    }

    pub fn generated_dir(&self) -> &Path {
        &self.generated_dir
    }

    pub fn font_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Renders `card` for `user_name` and appends a usage row.
    /// Returns the generated file name.
    ///
    /// Inactive cards are still rendered; only the listing hides them.
    pub async fn generate(
        &self,
        store: &Store,
        card_id: i64,
        user_name: &str,
        greeting: Option<&str>,
    ) -> Result<String, RenderError> {
        let card = store.get_card(card_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => RenderError::CardNotFound(card_id),
            other => RenderError::Store(other),
        })?;

        let file_name = self.render(&card, user_name, greeting).await?;
        store.record_usage(card.id, user_name).await?;
        Ok(file_name)
    }

    /// Composites the overlay onto the card template and writes a PNG named
    /// `card_{id}_{unix_micros}.png`. Returns that file name.
    pub async fn render(
        &self,
        card: &Card,
        user_name: &str,
        greeting: Option<&str>,
    ) -> Result<String, RenderError> {
        let file_name = format!(
            "card_{}_{}.png",
            card.id,
            chrono::Utc::now().timestamp_micros()
        );
        let input = self.data_dir.join(&card.image_path);
        let output = self.generated_dir.join(&file_name);

        info!(
            "Generating card {} for {} (greeting: {})",
            card.id,
            user_name,
            greeting.filter(|g| !g.is_empty()).unwrap_or("none")
        );

        let card = card.clone();
        let user_name = user_name.to_string();
        let greeting = greeting.map(str::to_string);
        let fontdb = Arc::clone(&self.fontdb);

        tokio::task::spawn_blocking(move || {
            composite_to_file(
                &input,
                &output,
                &card,
                &user_name,
                greeting.as_deref(),
                fontdb,
            )
        })
        .await??;

        Ok(file_name)
    }
}

fn composite_to_file(
    input: &Path,
    output: &Path,
    card: &Card,
    user_name: &str,
    greeting: Option<&str>,
    fontdb: Arc<fontdb::Database>,
) -> Result<(), RenderError> {
    // Uploaded file names are client-supplied; trust the content, not the extension.
    let mut base = ImageReader::open(input)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let (width, height) = base.dimensions();

    info!(
        "Card {}: {}x{}, text at ({}, {}), color {}, size {}",
        card.id,
        width,
        height,
        card.signature_x,
        card.signature_y,
        card.signature_color,
        card.signature_size
    );

    let svg = build_overlay_svg(card, width, height, user_name, greeting);
    let overlay = rasterize_overlay(&svg, width, height, fontdb)?;

    image::imageops::overlay(&mut base, &overlay, 0, 0);
    base.save_with_format(output, ImageFormat::Png)?;
    Ok(())
}

fn rasterize_overlay(
    svg: &str,
    width: u32,
    height: u32,
    fontdb: Arc<fontdb::Database>,
) -> Result<RgbaImage, RenderError> {
    let options = usvg::Options {
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &options)?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Overlay(width, height))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    RgbaImage::from_raw(width, height, rgba).ok_or(RenderError::Overlay(width, height))
}

/// Loads system fonts plus any in `font_dir`, and points the generic
/// `sans-serif` family at `fallback_family`, or at the first installed
/// family when that one is missing.
pub fn load_fonts(font_dir: Option<&Path>, fallback_family: &str) -> fontdb::Database {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(dir) = font_dir {
        db.load_fonts_dir(dir);
    }

    let installed = |name: &str| {
        db.faces()
            .any(|face| face.families.iter().any(|(family, _)| family == name))
    };

    let sans_serif = if installed(fallback_family) {
        Some(fallback_family.to_string())
    } else {
        db.faces()
            .find_map(|face| face.families.first().map(|(family, _)| family.clone()))
    };

    match sans_serif {
        Some(family) => {
            info!("Loaded {} font faces; sans-serif -> {family}", db.len());
            db.set_sans_serif_family(family);
        }
        None => warn!("No fonts found; card text will not be drawn"),
    }

    db
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;
    use crate::models::card::NewCard;
    use image::Rgba;

    fn write_template(dir: &Path, name: &str, width: u32, height: u32) -> String {
        let cards = dir.join("uploads").join("cards");
        std::fs::create_dir_all(&cards).unwrap();
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        img.save_with_format(cards.join(name), ImageFormat::Png).unwrap();
        format!("uploads/cards/{name}")
    }

    fn renderer(dir: &Path) -> CardRenderer {
        CardRenderer::new(
            dir.to_path_buf(),
            dir.join("public").join("generated"),
            load_fonts(None, "DejaVu Sans"),
        )
        .unwrap()
    }

    async fn insert_red_card(store: &Store, image_path: String) -> i64 {
        store
            .insert_card(&NewCard {
                name: "Winter".to_string(),
                category: "Holiday".to_string(),
                image_path,
                signature_x: 300,
                signature_y: 400,
                signature_size: 50,
                signature_color: "#ff0000".to_string(),
                signature_font: "Arial".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_writes_png_and_logs_usage() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());
        let path = write_template(dir.path(), "winter.png", 600, 800);
        let card_id = insert_red_card(&store, path).await;

        let file_name = renderer
            .generate(&store, card_id, "Alice", Some("Best Wishes"))
            .await
            .unwrap();

        assert!(file_name.starts_with(&format!("card_{card_id}_")));
        assert!(file_name.ends_with(".png"));
        let output = image::open(renderer.generated_dir().join(&file_name)).unwrap();
        assert_eq!((output.width(), output.height()), (600, 800));

        let stats = store.usage_stats().await.unwrap();
        assert_eq!(stats.total_generated, 1);
        assert_eq!(stats.recent_usage[0].card_id, card_id);
        assert_eq!(stats.recent_usage[0].user_name, "Alice");
    }

    #[tokio::test]
    async fn test_signature_is_drawn_centered_in_red() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());
        if renderer.font_count() == 0 {
            eprintln!("no fonts installed; skipping pixel check");
            return;
        }
        let path = write_template(dir.path(), "winter.png", 600, 800);
        let card_id = insert_red_card(&store, path).await;

        let file_name = renderer.generate(&store, card_id, "Alice", None).await.unwrap();
        let output = image::open(renderer.generated_dir().join(file_name))
            .unwrap()
            .to_rgba8();

        let is_red = |p: &Rgba<u8>| p[0] > 180 && p[1] < 90 && p[2] < 90;

        // Glyphs sit just above the baseline, spread around the center x.
        let mut red_xs = Vec::new();
        for y in 350..=405 {
            for x in 200..=400 {
                if is_red(output.get_pixel(x, y)) {
                    red_xs.push(x);
                }
            }
        }
        assert!(!red_xs.is_empty(), "no red text near (300, 400)");
        let min = *red_xs.iter().min().unwrap();
        let max = *red_xs.iter().max().unwrap();
        assert!(min < 300 && max > 300, "text not centered on x=300");

        // Nothing red far from the signature point.
        assert!(!is_red(output.get_pixel(10, 10)));
        assert!(!is_red(output.get_pixel(300, 700)));
    }

    #[tokio::test]
    async fn test_template_format_detected_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());

        for name in ["blob", "photo.jpg"] {
            let path = write_template(dir.path(), name, 120, 80);
            let card_id = insert_red_card(&store, path).await;
            let file_name = renderer.generate(&store, card_id, "Alice", None).await.unwrap();
            let output = image::open(renderer.generated_dir().join(file_name)).unwrap();
            assert_eq!((output.width(), output.height()), (120, 80));
        }
    }

    #[tokio::test]
    async fn test_corrupt_template_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());
        let cards = dir.path().join("uploads").join("cards");
        std::fs::create_dir_all(&cards).unwrap();
        std::fs::write(cards.join("broken.png"), b"not really a png").unwrap();
        let card_id = insert_red_card(&store, "uploads/cards/broken.png".to_string()).await;

        let result = renderer.generate(&store, card_id, "Alice", None).await;
        assert!(matches!(result, Err(RenderError::Image(_))));
        assert_eq!(store.usage_stats().await.unwrap().total_generated, 0);
    }

    #[tokio::test]
    async fn test_generate_missing_card() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());

        let result = renderer.generate(&store, 404, "Alice", None).await;
        assert!(matches!(result, Err(RenderError::CardNotFound(404))));
        assert_eq!(store.usage_stats().await.unwrap().total_generated, 0);
    }

    #[tokio::test]
    async fn test_generate_missing_template_logs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());
        let card_id = insert_red_card(&store, "uploads/cards/missing.png".to_string()).await;

        let result = renderer.generate(&store, card_id, "Alice", None).await;
        assert!(matches!(result, Err(RenderError::Io(_))));
        assert_eq!(store.usage_stats().await.unwrap().total_generated, 0);
    }

    #[tokio::test]
    async fn test_inactive_card_still_generates() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store().await;
        let renderer = renderer(dir.path());
        let path = write_template(dir.path(), "winter.png", 200, 200);
        let card_id = insert_red_card(&store, path).await;
        store
            .update_card(
                card_id,
                &crate::models::card::CardPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(renderer.generate(&store, card_id, "Bob", None).await.is_ok());
    }
}
