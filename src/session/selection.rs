//! Restoring remembered editor selections.

use std::time::Duration;

use crate::preferences::EditorSelection;

/// One display frame at 60 Hz.
pub const FRAME: Duration = Duration::from_millis(16);

/// Frames to wait for the editor before giving up (about two seconds).
pub const MAX_RESTORE_FRAMES: u32 = 120;

/// The editor a selection is restored into.
pub trait EditorSurface: Send + Sync {
    /// Whether the editor has mounted and holds the page text.
    fn is_ready(&self) -> bool;

    /// Length of the loaded text in characters.
    fn text_len(&self) -> usize;

    fn set_selection(&self, selection: EditorSelection);

    /// Scroll so the line at `ratio` (0 = top, 1 = bottom) is in view.
    fn scroll_to_ratio(&self, ratio: f64);
}

/// What a restore attempt found and applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestoredView {
    pub selection: Option<EditorSelection>,
    pub line_hint: Option<f64>,
}

/// Wait frame by frame for `surface` to become ready, then apply whatever
/// was remembered. Returns None if the editor never became ready.
pub(crate) async fn restore_when_ready(
    surface: &dyn EditorSurface,
    selection: Option<EditorSelection>,
    line_hint: Option<f64>,
) -> Option<RestoredView> {
    let mut ticker = tokio::time::interval(FRAME);
    for _ in 0..MAX_RESTORE_FRAMES {
        ticker.tick().await;
        if !surface.is_ready() {
            continue;
        }

        let selection = selection.map(|s| s.clamped(surface.text_len()));
        if let Some(selection) = selection {
            surface.set_selection(selection);
        }
        if let Some(ratio) = line_hint {
            surface.scroll_to_ratio(ratio);
        }
        return Some(RestoredView {
            selection,
            line_hint,
        });
    }
    tracing::debug!("Editor not ready after {} frames", MAX_RESTORE_FRAMES);
    None
}
