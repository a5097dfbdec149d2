//! HLS live media playlist structures.

use std::fmt;
use std::ops::Range;

use hls_m3u8::MediaPlaylist as HlsMediaPlaylist;
use signal_common::paths::segment_sequence;
use signal_common::{Error, Result};

/// A sliding-window live media playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct LivePlaylist {
    /// Target duration in seconds.
    pub target_duration: u32,
    /// Sequence number of the first listed segment.
    pub media_sequence: u64,
    /// Listed segments, oldest first.
    pub segments: Vec<SegmentEntry>,
    /// Whether the playlist carries `#EXT-X-ENDLIST`.
    pub ended: bool,
}

/// A segment entry in the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    /// Duration in seconds.
    pub duration: f64,
    /// Segment URI, usually a bare file name relative to the manifest.
    pub uri: String,
    /// Discontinuity before this segment.
    pub discontinuity: bool,
}

impl SegmentEntry {
    /// Create an entry without a discontinuity marker.
    pub fn new(duration: f64, uri: impl Into<String>) -> Self {
        Self {
            duration,
            uri: uri.into(),
            discontinuity: false,
        }
    }
}

impl LivePlaylist {
    /// Create an empty live playlist.
    pub fn new(target_duration: u32) -> Self {
        Self {
            target_duration,
            media_sequence: 0,
            segments: Vec::new(),
            ended: false,
        }
    }

    /// Parse an M3U8 media playlist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeFailure`] if the bytes are not UTF-8 or not a
    /// valid media playlist.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let input = std::str::from_utf8(data).map_err(|e| Error::decode(e.to_string()))?;
        let hls_media =
            HlsMediaPlaylist::try_from(input).map_err(|e| Error::decode(e.to_string()))?;

        let segments = hls_media
            .segments
            .iter()
            .map(|(_idx, seg)| {
                SegmentEntry::new(seg.duration.duration().as_secs_f64(), seg.uri().to_string())
            })
            .collect();

        Ok(Self {
            target_duration: hls_media.target_duration.as_secs() as u32,
            media_sequence: hls_media.media_sequence as u64,
            segments,
            ended: input.contains("#EXT-X-ENDLIST"),
        })
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Sequence numbers of the listed segments.
    pub fn sequence_range(&self) -> Range<u64> {
        self.media_sequence..self.media_sequence + self.segments.len() as u64
    }

    /// Sequence number of the newest listed segment.
    pub fn last_sequence(&self) -> Option<u64> {
        self.sequence_range().last()
    }

    /// Sum of the listed segment durations.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Whether a segment file name is listed in this playlist.
    ///
    /// Matches on the numeric sequence suffix so that `live004.ts` and
    /// `/stream/live004.ts` are the same segment.
    pub fn references(&self, file_name: &str) -> bool {
        match segment_sequence(file_name) {
            Some(seq) => self
                .segments
                .iter()
                .any(|s| segment_sequence(&s.uri) == Some(seq)),
            None => self.segments.iter().any(|s| s.uri == file_name),
        }
    }
}

impl fmt::Display for LivePlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:3")?;
        writeln!(f, "#EXT-X-TARGETDURATION:{}", self.target_duration)?;
        writeln!(f, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence)?;

        for segment in &self.segments {
            if segment.discontinuity {
                writeln!(f, "#EXT-X-DISCONTINUITY")?;
            }
            writeln!(f, "#EXTINF:{:.6},", segment.duration)?;
            writeln!(f, "{}", segment.uri)?;
        }

        if self.ended {
            writeln!(f, "#EXT-X-ENDLIST")?;
        }

        Ok(())
    }
}
