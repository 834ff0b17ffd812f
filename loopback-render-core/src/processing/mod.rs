pub mod voice_mixer;
pub mod wav_format;
pub mod waveform;
