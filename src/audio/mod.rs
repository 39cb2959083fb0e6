pub mod decode;
pub mod player;

pub use decode::{decode_audio, decode_wav, DecodedAudio};
pub use player::{HeadlessPlayer, ReplyPlayer};
