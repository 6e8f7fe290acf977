pub const APP_TITLE: &str = "RLHighlight";

pub const DEFAULT_OBS_HOST: &str = "localhost";
pub const DEFAULT_OBS_PORT: u16 = 4455;
pub const DEFAULT_UDP_LISTEN_ADDR: &str = "0.0.0.0:12345";

pub const DEFAULT_SAVE_DELAY_SECS: u64 = 3;
pub const MIN_SAVE_DELAY_SECS: u64 = 1;
pub const MAX_SAVE_DELAY_SECS: u64 = 30;

/// Name of the media source that plays the highlight reel inside OBS.
pub const PLAYBACK_SOURCE_NAME: &str = "HIGHLIGHT_PLAYBACK_SOURCE";
pub const PLAYBACK_SOURCE_KIND: &str = "vlc_source";

pub const UDP_DATAGRAM_SIZE: usize = 1024;
pub const OBS_REQUEST_TIMEOUT_SECS: u64 = 10;

pub fn clamp_save_delay(secs: u64) -> u64 {
    secs.clamp(MIN_SAVE_DELAY_SECS, MAX_SAVE_DELAY_SECS)
}
