/// Play state of a playback source.
///
/// ```text
/// stopped → playing → stopped
/// ```
///
/// There is no paused state. A freshly created or rewound source reports
/// `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

impl PlayState {
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Maps a raw `AL_SOURCE_STATE` value. Initial and paused collapse to `Stopped`.
    pub fn from_raw(raw: i32) -> Self {
        if raw == crate::constants::al::PLAYING {
            Self::Playing
        } else {
            Self::Stopped
        }
    }
}
