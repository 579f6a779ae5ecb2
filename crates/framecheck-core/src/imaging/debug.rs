//! Debug visualization sinks.
//!
//! In debug mode the image comparator hands every failing pair to a
//! [`DebugSink`] as three panels: both inputs and their difference map, or a
//! flat placeholder captioned "No diff image" when the comparison stopped
//! before differencing.

use super::raster::Raster;
use crate::indexer::extract_frame_number;
use image::GrayImage;
use std::path::{Path, PathBuf};

pub const NO_DIFF_CAPTION: &str = "No diff image";
const PLACEHOLDER_LEVEL: u8 = 200;
const TITLE_BAR_HEIGHT: u32 = 30;
const PANEL_FILE_PREFIX: &str = "debug_";

#[derive(Debug, Clone, Copy)]
pub struct DebugView<'a> {
    pub first: &'a Raster,
    pub second: &'a Raster,
    pub difference: Option<&'a Raster>,
    pub reason: &'a str,
}

impl DebugView<'_> {
    pub fn captions(&self) -> [&'static str; 3] {
        let third = if self.difference.is_some() {
            "Difference"
        } else {
            NO_DIFF_CAPTION
        };
        ["Image 1", "Image 2", third]
    }

    /// The three panels as single-channel rasters; the placeholder takes the
    /// size of the first image.
    pub fn panels(&self) -> [Raster; 3] {
        let first = self.first.to_display_gray();
        let difference = match self.difference {
            Some(difference) => difference.to_display_gray(),
            None => Raster::filled(first.width, first.height, PLACEHOLDER_LEVEL),
        };
        [first, self.second.to_display_gray(), difference]
    }
}

pub trait DebugSink {
    fn present(&mut self, view: &DebugView<'_>);
}

impl<F> DebugSink for F
where
    F: FnMut(&DebugView<'_>),
{
    fn present(&mut self, view: &DebugView<'_>) {
        self(view)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn present(&mut self, _view: &DebugView<'_>) {}
}

/// Writes each view as a side-by-side grayscale PNG with a white title bar
/// above every panel. Captions go to the log since no font is rasterized.
///
/// Files are numbered `debug_NNNN.png`, continuing after the highest number
/// already present in the output directory.
#[derive(Debug, Clone)]
pub struct PanelFileSink {
    output_dir: PathBuf,
    next_number: Option<u64>,
    written: usize,
}

impl PanelFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            next_number: None,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    fn write_view(&self, view: &DebugView<'_>, path: &Path) -> Result<(), String> {
        let panels = view.panels();
        let composite = compose_panels(&panels)
            .ok_or_else(|| "panel buffer size does not match its dimensions".to_string())?;
        std::fs::create_dir_all(&self.output_dir).map_err(|error| error.to_string())?;
        composite.save(path).map_err(|error| error.to_string())
    }
}

impl DebugSink for PanelFileSink {
    fn present(&mut self, view: &DebugView<'_>) {
        let number = *self
            .next_number
            .get_or_insert_with(|| next_panel_number(&self.output_dir));
        let path = self
            .output_dir
            .join(format!("{}{:04}.png", PANEL_FILE_PREFIX, number));
        match self.write_view(view, &path) {
            Ok(()) => {
                self.next_number = Some(number + 1);
                self.written += 1;
                let [first, second, third] = view.captions();
                tracing::info!(
                    "Debug view written to {} [{} | {} | {}]: {}",
                    path.display(),
                    first,
                    second,
                    third,
                    view.reason
                );
            }
            Err(error) => {
                tracing::warn!("failed to write debug view '{}': {}", path.display(), error);
            }
        }
    }
}

/// One past the highest `debug_NNNN.png` in `output_dir`, or 1 when there is
/// none or the directory cannot be read yet.
fn next_panel_number(output_dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(output_dir) else {
        return 1;
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            extract_frame_number(&name.to_string_lossy(), PANEL_FILE_PREFIX, "png")
        })
        .filter_map(|number| u64::try_from(number).ok())
        .max()
        .map_or(1, |highest| highest + 1)
}

fn compose_panels(panels: &[Raster; 3]) -> Option<GrayImage> {
    let width = panels.iter().map(|panel| panel.width).sum::<u32>();
    let height = TITLE_BAR_HEIGHT
        + panels
            .iter()
            .map(|panel| panel.height)
            .max()
            .unwrap_or_default();

    let mut composite = GrayImage::from_pixel(width, height, image::Luma([255]));
    let mut x_offset = 0;
    for panel in panels {
        let buffer = GrayImage::from_raw(panel.width, panel.height, panel.samples.clone())?;
        image::imageops::replace(
            &mut composite,
            &buffer,
            i64::from(x_offset),
            i64::from(TITLE_BAR_HEIGHT),
        );
        x_offset += panel.width;
    }
    Some(composite)
}
