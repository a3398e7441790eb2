mod guild;

pub use guild::{GuildRecord, PinMirror};
