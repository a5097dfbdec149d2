//! ffmpeg argument construction for the fixed broadcast ladder.

use std::path::{Path, PathBuf};

use signal_common::paths::{segment_pattern, MANIFEST_FILE};

/// Where the encoder reads its content from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeMode {
    /// Concatenate every entry of a concat-demuxer list, looping the whole
    /// list forever.
    Playlist { playlist: PathBuf },
    /// Loop one file forever.
    SingleFile { input: PathBuf },
}

impl TranscodeMode {
    /// The file handed to ffmpeg's `-i`.
    pub fn input(&self) -> &Path {
        match self {
            Self::Playlist { playlist } => playlist,
            Self::SingleFile { input } => input,
        }
    }

    /// Short label for logs and status output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Playlist { .. } => "playlist",
            Self::SingleFile { .. } => "single-file",
        }
    }
}

/// Where the audio track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioSource {
    /// Use the input's own audio.
    #[default]
    Input,
    /// The input has no audio; encode a generated silent track instead.
    Silence,
}

/// The one output rendition the channel produces.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputProfile {
    pub width: u32,
    pub height: u32,
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub tune: &'static str,
    pub crf: u32,
    pub maxrate_kbps: u32,
    pub bufsize_kbps: u32,
    pub audio_codec: &'static str,
    pub audio_sample_rate: u32,
    pub audio_bitrate_kbps: u32,
    pub audio_channels: u32,
    /// Linear gain applied to the audio, `None` to leave levels untouched.
    pub gain: Option<f32>,
}

impl OutputProfile {
    /// 854x480 H.264 + 44.1 kHz stereo AAC, tuned for real-time encoding.
    pub fn broadcast() -> Self {
        Self {
            width: 854,
            height: 480,
            video_codec: "libx264",
            preset: "ultrafast",
            tune: "zerolatency",
            crf: 23,
            maxrate_kbps: 1000,
            bufsize_kbps: 2000,
            audio_codec: "aac",
            audio_sample_rate: 44_100,
            audio_bitrate_kbps: 192,
            audio_channels: 2,
            gain: Some(1.5),
        }
    }

    /// Scale into the canvas keeping aspect ratio, letterbox the rest.
    pub fn video_filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:-1:-1:color=black,setsar=1,format=yuv420p"
        )
    }

    /// Human readable summary, e.g. `854x480 @ 192k`.
    pub fn quality_label(&self) -> String {
        format!("{}x{} @ {}k", self.width, self.height, self.audio_bitrate_kbps)
    }
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self::broadcast()
    }
}

/// Segmented live output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOutput {
    /// Directory the manifest and segments are written to.
    pub dir: PathBuf,
    /// Target duration of each segment, in seconds.
    pub segment_seconds: u32,
    /// Number of segments listed in the manifest.
    pub window_size: u32,
}

impl HlsOutput {
    /// Path of the live manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }
}

/// Build the full ffmpeg argument list.
///
/// Playlist mode additionally asks the muxer to append to and prune the
/// existing manifest as segments land, so the manifest stays a valid
/// bounded live playlist across concat boundaries.
pub fn build_args(
    mode: &TranscodeMode,
    audio: AudioSource,
    profile: &OutputProfile,
    output: &HlsOutput,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-nostdin".into()];

    match mode {
        TranscodeMode::Playlist { playlist } => {
            args.extend(
                ["-re", "-f", "concat", "-safe", "0", "-stream_loop", "-1", "-i"]
                    .map(String::from),
            );
            args.push(playlist.to_string_lossy().to_string());
        }
        TranscodeMode::SingleFile { input } => {
            args.extend(["-stream_loop", "-1", "-re", "-i"].map(String::from));
            args.push(input.to_string_lossy().to_string());
        }
    }

    if audio == AudioSource::Silence {
        args.extend(["-f", "lavfi", "-i"].map(String::from));
        args.push(format!(
            "anullsrc=channel_layout=stereo:sample_rate={}",
            profile.audio_sample_rate
        ));
        args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(String::from));
    }

    args.extend([
        "-c:v".to_string(),
        profile.video_codec.to_string(),
        "-preset".to_string(),
        profile.preset.to_string(),
        "-tune".to_string(),
        profile.tune.to_string(),
        "-crf".to_string(),
        profile.crf.to_string(),
        "-maxrate".to_string(),
        format!("{}k", profile.maxrate_kbps),
        "-bufsize".to_string(),
        format!("{}k", profile.bufsize_kbps),
        "-vf".to_string(),
        profile.video_filter(),
    ]);

    args.extend([
        "-c:a".to_string(),
        profile.audio_codec.to_string(),
        "-ar".to_string(),
        profile.audio_sample_rate.to_string(),
        "-b:a".to_string(),
        format!("{}k", profile.audio_bitrate_kbps),
        "-ac".to_string(),
        profile.audio_channels.to_string(),
    ]);
    if let Some(gain) = profile.gain {
        args.push("-af".into());
        args.push(format!("volume={gain}"));
    }

    let flags = match mode {
        TranscodeMode::Playlist { .. } => "delete_segments+append_list",
        TranscodeMode::SingleFile { .. } => "delete_segments",
    };
    args.extend([
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        output.segment_seconds.to_string(),
        "-hls_list_size".to_string(),
        output.window_size.to_string(),
        "-hls_flags".to_string(),
        flags.to_string(),
        "-hls_segment_filename".to_string(),
        output.dir.join(segment_pattern()).to_string_lossy().to_string(),
        output.manifest_path().to_string_lossy().to_string(),
    ]);

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> HlsOutput {
        HlsOutput {
            dir: PathBuf::from("/app/streams"),
            segment_seconds: 4,
            window_size: 5,
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_playlist_mode_loops_concat_input() {
        let mode = TranscodeMode::Playlist {
            playlist: PathBuf::from("/app/content/main_channel/playlist.txt"),
        };
        let args = build_args(&mode, AudioSource::Input, &OutputProfile::broadcast(), &output());

        let input_at = args.iter().position(|a| a == "-i").unwrap();
        let before_input = &args[..input_at];
        assert!(before_input.windows(2).any(|w| w == ["-f", "concat"]));
        assert!(before_input.windows(2).any(|w| w == ["-safe", "0"]));
        assert!(before_input.windows(2).any(|w| w == ["-stream_loop", "-1"]));
        assert!(before_input.contains(&"-re".to_string()));
        assert_eq!(args[input_at + 1], "/app/content/main_channel/playlist.txt");
        assert_eq!(
            value_after(&args, "-hls_flags"),
            Some("delete_segments+append_list")
        );
    }

    #[test]
    fn test_single_file_mode_loops_one_input() {
        let mode = TranscodeMode::SingleFile {
            input: PathBuf::from("/content/a.mp4"),
        };
        let args = build_args(&mode, AudioSource::Input, &OutputProfile::broadcast(), &output());

        assert!(!args.contains(&"concat".to_string()));
        assert_eq!(value_after(&args, "-stream_loop"), Some("-1"));
        assert_eq!(value_after(&args, "-i"), Some("/content/a.mp4"));
        assert_eq!(value_after(&args, "-hls_flags"), Some("delete_segments"));
    }

    #[test]
    fn test_fixed_output_ladder() {
        let mode = TranscodeMode::SingleFile {
            input: PathBuf::from("a.mp4"),
        };
        let args = build_args(&mode, AudioSource::Input, &OutputProfile::broadcast(), &output());

        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-preset"), Some("ultrafast"));
        assert_eq!(value_after(&args, "-tune"), Some("zerolatency"));
        assert_eq!(value_after(&args, "-maxrate"), Some("1000k"));
        assert_eq!(value_after(&args, "-bufsize"), Some("2000k"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some(
                "scale=854:480:force_original_aspect_ratio=decrease,\
                 pad=854:480:-1:-1:color=black,setsar=1,format=yuv420p"
            )
        );
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert_eq!(value_after(&args, "-ar"), Some("44100"));
        assert_eq!(value_after(&args, "-b:a"), Some("192k"));
        assert_eq!(value_after(&args, "-ac"), Some("2"));
        assert_eq!(value_after(&args, "-af"), Some("volume=1.5"));
    }

    #[test]
    fn test_segmented_live_output() {
        let mode = TranscodeMode::SingleFile {
            input: PathBuf::from("a.mp4"),
        };
        let args = build_args(&mode, AudioSource::Input, &OutputProfile::broadcast(), &output());

        assert_eq!(value_after(&args, "-f"), Some("hls"));
        assert_eq!(value_after(&args, "-hls_time"), Some("4"));
        assert_eq!(value_after(&args, "-hls_list_size"), Some("5"));
        assert_eq!(
            value_after(&args, "-hls_segment_filename"),
            Some("/app/streams/live%03d.ts")
        );
        assert_eq!(args.last().map(String::as_str), Some("/app/streams/live.m3u8"));
    }

    #[test]
    fn test_gain_is_optional() {
        let mut profile = OutputProfile::broadcast();
        profile.gain = None;
        let mode = TranscodeMode::SingleFile {
            input: PathBuf::from("a.mp4"),
        };
        let args = build_args(&mode, AudioSource::Input, &profile, &output());
        assert!(!args.contains(&"-af".to_string()));
    }

    #[test]
    fn test_silence_adds_generated_audio_input() {
        let mode = TranscodeMode::SingleFile {
            input: PathBuf::from("a.mp4"),
        };
        let args = build_args(&mode, AudioSource::Silence, &OutputProfile::broadcast(), &output());

        assert!(args.contains(&"lavfi".to_string()));
        assert!(args.contains(&"anullsrc=channel_layout=stereo:sample_rate=44100".to_string()));
        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
    }

    #[test]
    fn test_quality_label() {
        assert_eq!(OutputProfile::broadcast().quality_label(), "854x480 @ 192k");
    }
}
