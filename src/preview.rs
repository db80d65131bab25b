use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use once_cell::sync::Lazy;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use reqwest::blocking::Client;

const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;
const UPPER_HALF_BLOCK: &str = "▀";
const MAX_NAME_ATTEMPTS: u32 = 1000;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent(format!("thoth/{}", crate::VERSION))
        .build()
        .unwrap_or_else(|_| Client::new())
});

pub fn fetch_image_bytes(url: &str) -> Result<Vec<u8>> {
    let response = HTTP_CLIENT
        .get(url)
        .send()
        .with_context(|| format!("request image {url}"))?;
    if !response.status().is_success() {
        bail!("image request returned {}", response.status());
    }
    let mut bytes = Vec::new();
    response
        .take(MAX_IMAGE_BYTES + 1)
        .read_to_end(&mut bytes)
        .context("read image body")?;
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        bail!("image larger than {} bytes", MAX_IMAGE_BYTES);
    }
    Ok(bytes)
}

/// A decoded image ready to be drawn as terminal cells.
#[derive(Debug, Clone)]
pub struct Picture {
    image: RgbImage,
}

impl Picture {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("decode image")?;
        Ok(Self {
            image: image.to_rgb8(),
        })
    }

    pub fn fetch(url: &str) -> Result<Self> {
        let bytes = fetch_image_bytes(url)?;
        Self::decode(&bytes)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Cell size that fits the box while keeping the aspect ratio. One
    /// cell holds two vertical pixels.
    pub fn fit(&self, cols: u16, rows: u16) -> (u16, u16) {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 || cols == 0 || rows == 0 {
            return (0, 0);
        }
        let max_w = cols as f64;
        let max_h = rows as f64 * 2.0;
        let scale = (max_w / width as f64).min(max_h / height as f64);
        let w = ((width as f64 * scale).round() as u16).clamp(1, cols);
        let h_px = ((height as f64 * scale).round() as u16).max(2);
        let h = h_px.div_ceil(2).clamp(1, rows);
        (w, h)
    }

    pub fn render(&self, cols: u16, rows: u16) -> Vec<Line<'static>> {
        let (w, h) = self.fit(cols, rows);
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let resized = image::imageops::resize(&self.image, w as u32, h as u32 * 2, FilterType::Triangle);
        let mut lines = Vec::with_capacity(h as usize);
        for row in 0..h as u32 {
            let spans: Vec<Span<'static>> = (0..w as u32)
                .map(|x| {
                    let top = resized.get_pixel(x, row * 2);
                    let bottom = resized.get_pixel(x, row * 2 + 1);
                    Span::styled(
                        UPPER_HALF_BLOCK,
                        Style::default()
                            .fg(Color::Rgb(top[0], top[1], top[2]))
                            .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                    )
                })
                .collect();
            lines.push(Line::from(spans));
        }
        lines
    }
}

/// Writes generated image bytes as `lumina-gen-{id}.png` under `dir`.
/// An existing file is never replaced; the name gets a `-2`, `-3`, ...
/// suffix instead.
pub fn save_png(bytes: &[u8], dir: &Path, id: u64) -> Result<PathBuf> {
    let image: DynamicImage = image::load_from_memory(bytes).context("decode generated image")?;
    fs::create_dir_all(dir).with_context(|| format!("create download dir {}", dir.display()))?;
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = if attempt == 1 {
            format!("lumina-gen-{id}.png")
        } else {
            format!("lumina-gen-{id}-{attempt}.png")
        };
        let path = dir.join(name);
        let file = match File::options().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err).with_context(|| format!("create {}", path.display()));
            }
        };
        let mut writer = BufWriter::new(file);
        image
            .write_to(&mut writer, ImageFormat::Png)
            .with_context(|| format!("write {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flush {}", path.display()))?;
        tracing::debug!(path = %path.display(), "png written");
        return Ok(path);
    }
    bail!("no free file name for image {id} in {}", dir.display())
}

/// Short human label for an image URL: the last non-numeric path segment.
pub fn image_label(url: &str) -> String {
    let parsed = url::Url::parse(url).ok();
    let segment = parsed.as_ref().and_then(|url| {
        url.path_segments()?
            .rev()
            .find(|segment| !segment.is_empty() && segment.parse::<u32>().is_err())
            .map(str::to_string)
    });
    segment.unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn fit_keeps_aspect_in_cells() {
        let picture = Picture::decode(&png_bytes(200, 100)).unwrap();
        assert_eq!(picture.fit(40, 40), (40, 10));
        let tall = Picture::decode(&png_bytes(100, 200)).unwrap();
        assert_eq!(tall.fit(40, 10), (10, 10));
    }

    #[test]
    fn render_produces_half_blocks() {
        let picture = Picture::decode(&png_bytes(8, 8)).unwrap();
        let lines = picture.render(8, 4);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].spans.len(), 8);
        assert_eq!(lines[0].spans[0].content.as_ref(), UPPER_HALF_BLOCK);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Picture::decode(b"not an image").is_err());
    }

    #[test]
    fn save_png_names_file_by_id() {
        let dir = tempdir().unwrap();
        let path = save_png(&png_bytes(4, 4), dir.path(), 7).unwrap();
        assert!(path.ends_with("lumina-gen-7.png"));
        assert!(path.exists());
    }

    #[test]
    fn save_png_keeps_existing_files() {
        let dir = tempdir().unwrap();
        let first = save_png(&png_bytes(4, 4), dir.path(), 7).unwrap();
        let before = std::fs::read(&first).unwrap();
        let second = save_png(&png_bytes(6, 6), dir.path(), 7).unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("lumina-gen-7-2.png"));
        assert_eq!(std::fs::read(&first).unwrap(), before);
    }

    #[test]
    fn saves_from_separate_sessions_do_not_collide() {
        use crate::genai::{ImageReply, InlineImage};
        use crate::lab::VisionPanel;

        let dir = tempdir().unwrap();
        let mut saved = Vec::new();
        for _ in 0..2 {
            let mut vision = VisionPanel::new();
            vision.input.insert('x');
            vision.submit().unwrap();
            vision.resolve(Ok(ImageReply {
                image: Some(InlineImage {
                    mime_type: "image/png".into(),
                    bytes: png_bytes(4, 4),
                }),
                text: None,
            }));
            let image = vision.selected_image().unwrap();
            saved.push(save_png(&image.image.bytes, dir.path(), image.id).unwrap());
        }
        assert_ne!(saved[0], saved[1]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn labels_skip_numeric_segments() {
        assert_eq!(image_label("https://picsum.photos/seed/corfu1/600/600"), "corfu1");
        assert_eq!(image_label("not a url"), "not a url");
    }
}
