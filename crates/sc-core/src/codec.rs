//! Codec to MIME type mapping for assembled job output.

/// Container type for H.264/H.265 output (fragmented MP4).
pub const MP4: &str = "video/mp4";
/// Container type for VP9 output.
pub const WEBM: &str = "video/webm";
/// Fallback for codecs the server does not recognise.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Determine the content type of a job's output from its codec.
pub fn content_type_for_codec(codec: &str) -> &'static str {
    match codec.trim().to_ascii_lowercase().as_str() {
        "h264" | "h265" => MP4,
        "vp9" => WEBM,
        _ => OCTET_STREAM,
    }
}
