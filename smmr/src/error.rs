use smmr_game::PlayerId;
use thiserror::Error;

/// Failures of the patch pipeline that callers may want to tell apart.
///
/// These travel inside `anyhow::Error` and can be recovered with `downcast_ref`.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("symbol {name:?} has no ROM file offset ({space})")]
    UnresolvedSymbol { name: String, space: String },
    #[error("malformed IPS patch: {0}")]
    MalformedPatch(String),
    #[error(
        "supplied base ROM does not match the known MD5 for the Japan+US release \
         (expected {expected}, got {actual}); get the correct game and version, then dump it"
    )]
    BaseImageMismatch { expected: String, actual: String },
    #[error("location {location:?} of player {player} has no item placed")]
    UnplacedLocation { player: PlayerId, location: String },
    #[error("player id {0} does not fit in the ROM's 16-bit player id field")]
    PlayerIdOverflow(PlayerId),
    #[error("image of {len:#x} bytes is too small, need at least {needed:#x}")]
    ImageTooSmall { len: usize, needed: usize },
}
