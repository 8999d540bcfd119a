//! Page through stored images one key press at a time.
//!
//! [`Viewer`] owns the scan loop; anything that can put a decoded image in
//! front of the user and report the key they pressed implements
//! [`DisplaySurface`]. The terminal implementation lives in [`terminal`].

pub mod terminal;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use image::DynamicImage;
use std::ops::ControlFlow;

use crate::db::{Database, StoredImage};

pub use terminal::TerminalDisplay;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("failed to decode stored image ObjId {obj_id}")]
    Decode {
        obj_id: i64,
        #[source]
        source: image::ImageError,
    },
}

/// What the user asked for after looking at an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Next,
    Exit,
}

/// Esc, `q` and Ctrl-C leave the viewer; any other key advances.
pub fn key_action(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => KeyAction::Exit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Exit,
        _ => KeyAction::Next,
    }
}

/// One decoded row ready to be shown.
pub struct ViewFrame<'a> {
    pub obj_id: i64,
    /// 1-based position in scan order
    pub position: usize,
    pub total: usize,
    pub image: &'a DynamicImage,
}

pub trait DisplaySurface {
    /// Present `frame` and block until the user presses a key.
    fn show(&mut self, frame: &ViewFrame<'_>) -> Result<KeyAction>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOutcome {
    pub shown: usize,
    pub stopped_early: bool,
}

pub struct Viewer<D> {
    display: D,
}

impl<D: DisplaySurface> Viewer<D> {
    pub fn new(display: D) -> Self {
        Self { display }
    }

    /// Show every stored image in scan order until the rows run out or the
    /// display reports [`KeyAction::Exit`]. A blob that fails to decode ends
    /// the run with [`ViewError::Decode`].
    pub fn run(&mut self, db: &Database) -> Result<ViewOutcome> {
        let total = usize::try_from(db.count_images()?).unwrap_or(0);
        tracing::info!(db = %db.path().display(), total, "Starting viewer");

        let mut shown = 0;
        let mut stopped_early = false;
        let display = &mut self.display;

        db.for_each_image(|stored| {
            let image = decode_stored(&stored)?;
            shown += 1;
            tracing::debug!(obj_id = stored.obj_id, position = shown, "Showing image");

            let frame = ViewFrame {
                obj_id: stored.obj_id,
                position: shown,
                total,
                image: &image,
            };
            match display.show(&frame)? {
                KeyAction::Next => Ok(ControlFlow::Continue(())),
                KeyAction::Exit => {
                    stopped_early = true;
                    Ok(ControlFlow::Break(()))
                }
            }
        })?;

        tracing::info!(shown, stopped_early, "Viewer finished");
        Ok(ViewOutcome {
            shown,
            stopped_early,
        })
    }

    pub fn into_display(self) -> D {
        self.display
    }
}

fn decode_stored(stored: &StoredImage) -> Result<DynamicImage, ViewError> {
    image::load_from_memory(&stored.payload).map_err(|source| ViewError::Decode {
        obj_id: stored.obj_id,
        source,
    })
}
