pub mod audio_platform;
pub mod render_observer;
