use courseplayer_core::{MediaSurface, SurfaceSource};
use log::debug;

/// Playback pane of the terminal UI. Records what feeds it so the player view
/// can show the attached stream.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    native: bool,
    source: Option<SurfaceSource>,
}

impl TerminalSurface {
    pub fn new(native_adaptive: bool) -> Self {
        Self {
            native: native_adaptive,
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<&SurfaceSource> {
        self.source.as_ref()
    }
}

impl MediaSurface for TerminalSurface {
    fn supports_native_adaptive(&self) -> bool {
        self.native
    }

    fn set_source(&mut self, source: Option<SurfaceSource>) {
        match &source {
            Some(SurfaceSource::Engine { handle, url }) => {
                debug!("Surface fed by {} ({})", handle, url)
            }
            Some(SurfaceSource::Native { url }) => {
                debug!("Surface plays {} natively", url)
            }
            None => debug!("Surface cleared"),
        }
        self.source = source;
    }
}
