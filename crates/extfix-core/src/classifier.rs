//! Binary-signature format classifier.
//!
//! Maps the first bytes of a file's content to a known format tag. Only two
//! signatures are recognized; everything else is unknown and yields no
//! extension, which downstream treats as "leave the filename alone".

/// Number of header bytes inspected.
pub const HEADER_LEN: usize = 8;

/// Static signature table, checked in order. Prefixes are uppercase hex.
const SIGNATURES: &[(&str, &str)] = &[("FFD8FFE0", "jpg"), ("49492A", "tif")];

/// Classify a header prefix read from a file's content.
///
/// Takes whatever bytes are available (fewer than [`HEADER_LEN`] is fine,
/// including none) and returns the matching extension, or `None` when the
/// prefix matches no known signature.
pub fn classify(header: &[u8]) -> Option<&'static str> {
    let prefix = &header[..header.len().min(HEADER_LEN)];
    let encoded = hex::encode_upper(prefix);

    SIGNATURES
        .iter()
        .find(|(sig, _)| encoded.starts_with(sig))
        .map(|&(_, ext)| ext)
}

/// Append the classified extension to a filename.
///
/// Unknown formats leave the name untouched; no trailing dot is ever
/// produced for an empty extension.
pub fn repaired_filename(filename: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{filename}.{ext}"),
        _ => filename.to_string(),
    }
}
