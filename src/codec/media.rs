const TEXT_SAMPLE_LEN: usize = 1024;

pub const TEXT_PLAIN: &str = "text/plain;charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

// Matched in order against the hex of the first four bytes.
const SIGNATURES: &[(&str, &str)] = &[
  ("ffd8ff", "image/jpeg"),
  ("89504e47", "image/png"),
  ("47494638", "image/gif"),
  ("25504446", "application/pdf"),
  ("494433", "audio/mpeg"),
  ("fff3", "audio/mpeg"),
  ("fff2", "audio/mpeg"),
  ("4944", "audio/mpeg"),
  ("000001", "video/mpeg"),
  ("3c3f786d", "image/svg+xml"),
  ("3c737667", "image/svg+xml"),
  ("7b", "application/json"),
  ("5b", "application/json"),
];

/// Classifies content by magic number, falling back to plain text when the
/// leading bytes are printable ASCII and to a generic binary type otherwise.
pub fn sniff_content_type(content: &[u8]) -> &'static str {
  let prefix = hex::encode(&content[..content.len().min(4)]);

  if let Some((_, mime)) = SIGNATURES
    .iter()
    .find(|(signature, _)| prefix.starts_with(signature))
  {
    return mime;
  }

  let sample = &content[..content.len().min(TEXT_SAMPLE_LEN)];

  match std::str::from_utf8(sample) {
    Ok(text) if text.chars().all(is_printable) => TEXT_PLAIN,
    _ => OCTET_STREAM,
  }
}

fn is_printable(c: char) -> bool {
  matches!(c, '\x20'..='\x7e' | '\n' | '\r' | '\t')
}
