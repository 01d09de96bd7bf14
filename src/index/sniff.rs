//! Content sniffers turn the leading bytes of a file into a short
//! content-type label.
//!
//! A sniffer is built once, before classification starts, and shared by
//! reference with every worker; it must not change after construction.

use std::io::Write;
use std::process::{Command, Stdio};

/// Fallback label for bytes nobody recognises
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Label for an empty window
pub const EMPTY: &str = "inode/x-empty";

/// Classifies a byte window into a content-type label.
pub trait ContentSniffer: Sync {
    fn sniff(&self, window: &[u8]) -> String;
}

/// Which sniffer implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnifferKind {
    #[default]
    Builtin,
    File,
}

impl std::str::FromStr for SnifferKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(SnifferKind::Builtin),
            "file" => Ok(SnifferKind::File),
            other => Err(format!("unknown sniffer `{other}` (expected builtin or file)")),
        }
    }
}

impl SnifferKind {
    pub fn build(self) -> Box<dyn ContentSniffer + Send> {
        match self {
            SnifferKind::Builtin => Box::new(BuiltinSniffer::new()),
            SnifferKind::File => Box::new(FileCommandSniffer::default()),
        }
    }
}

struct Signature {
    offset: usize,
    magic: &'static [u8],
    label: &'static str,
}

const fn sig(offset: usize, magic: &'static [u8], label: &'static str) -> Signature {
    Signature {
        offset,
        magic,
        label,
    }
}

/// Leading-byte signatures, checked in order
const SIGNATURES: &[Signature] = &[
    sig(0, b"%PDF-", "application/pdf"),
    sig(0, b"\x89PNG\r\n\x1a\n", "image/png"),
    sig(0, b"\xff\xd8\xff", "image/jpeg"),
    sig(0, b"GIF87a", "image/gif"),
    sig(0, b"GIF89a", "image/gif"),
    sig(0, b"BM", "image/bmp"),
    sig(0, b"II*\x00", "image/tiff"),
    sig(0, b"MM\x00*", "image/tiff"),
    sig(8, b"WEBP", "image/webp"),
    sig(8, b"WAVE", "audio/x-wav"),
    sig(8, b"AVI ", "video/x-msvideo"),
    sig(4, b"ftyp", "video/mp4"),
    sig(0, b"\x1a\x45\xdf\xa3", "video/webm"),
    sig(0, b"OggS", "audio/ogg"),
    sig(0, b"fLaC", "audio/flac"),
    sig(0, b"ID3", "audio/mpeg"),
    sig(0, b"PK\x03\x04", "application/zip"),
    sig(0, b"PK\x05\x06", "application/zip"),
    sig(0, b"\x1f\x8b", "application/gzip"),
    sig(0, b"BZh", "application/x-bzip2"),
    sig(0, b"\xfd7zXZ\x00", "application/x-xz"),
    sig(0, b"\x28\xb5\x2f\xfd", "application/zstd"),
    sig(0, b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    sig(0, b"Rar!\x1a\x07", "application/x-rar"),
    sig(257, b"ustar", "application/x-tar"),
    sig(0, b"\x7fELF", "application/x-executable"),
    sig(0, b"\xcf\xfa\xed\xfe", "application/x-mach-binary"),
    sig(0, b"\xce\xfa\xed\xfe", "application/x-mach-binary"),
    sig(0, b"\xca\xfe\xba\xbe", "application/x-mach-binary"),
    sig(0, b"MZ", "application/x-dosexec"),
    sig(0, b"\x00asm", "application/wasm"),
    sig(0, b"SQLite format 3\x00", "application/vnd.sqlite3"),
    sig(0, b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1", "application/x-ole-storage"),
    sig(0, b"{\\rtf", "text/rtf"),
];

/// Self-contained sniffer with a small signature table and a text heuristic.
#[derive(Debug, Default, Clone)]
pub struct BuiltinSniffer;

impl BuiltinSniffer {
    pub fn new() -> Self {
        BuiltinSniffer
    }
}

impl ContentSniffer for BuiltinSniffer {
    fn sniff(&self, window: &[u8]) -> String {
        if window.is_empty() {
            return EMPTY.to_string();
        }

        for s in SIGNATURES {
            if window.len() >= s.offset + s.magic.len()
                && &window[s.offset..s.offset + s.magic.len()] == s.magic
            {
                return s.label.to_string();
            }
        }

        if is_binary(window) {
            return OCTET_STREAM.to_string();
        }

        sniff_text(window).to_string()
    }
}

/// Null bytes or too many control characters mean binary
fn is_binary(window: &[u8]) -> bool {
    let null_count = window.iter().filter(|&&b| b == 0).count();
    if null_count > 0 {
        return true;
    }

    let control = window
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t' && b != 0x0c && b != 0x1b)
        .count();

    control > window.len() / 8
}

fn sniff_text(window: &[u8]) -> &'static str {
    let text = strip_bom(window);
    let trimmed = trim_ascii_start(text);
    let lower: Vec<u8> = trimmed.iter().take(16).map(u8::to_ascii_lowercase).collect();

    if text.starts_with(b"#!") {
        let line = text.split(|&b| b == b'\n').next().unwrap_or(text);
        let line = String::from_utf8_lossy(line);
        if line.contains("python") {
            return "text/x-script.python";
        }
        if line.contains("perl") {
            return "text/x-perl";
        }
        if line.contains("node") {
            return "application/javascript";
        }
        return "text/x-shellscript";
    }
    if lower.starts_with(b"<?xml") {
        return "text/xml";
    }
    if lower.starts_with(b"<!doctype html") || lower.starts_with(b"<html") {
        return "text/html";
    }
    if lower.starts_with(b"<svg") {
        return "image/svg+xml";
    }
    if trimmed.starts_with(b"{\"") || trimmed.starts_with(b"[{") {
        return "application/json";
    }
    if std::str::from_utf8(text).is_err() && !utf8_cut_at_end(text) {
        return OCTET_STREAM;
    }
    "text/plain"
}

/// A window can end in the middle of a multi-byte character
fn utf8_cut_at_end(text: &[u8]) -> bool {
    match std::str::from_utf8(text) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes)
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Sniffer that defers to `file --mime-type`, the libmagic front end.
///
/// Spawns one short-lived process per window, so it is much slower than the
/// builtin table but knows far more formats.
#[derive(Debug, Clone)]
pub struct FileCommandSniffer {
    binary: String,
}

impl Default for FileCommandSniffer {
    fn default() -> Self {
        Self {
            binary: "file".to_string(),
        }
    }
}

impl FileCommandSniffer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, window: &[u8]) -> std::io::Result<String> {
        let mut child = Command::new(&self.binary)
            .args(["-b", "--mime-type", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(window)?;
        }

        let output = child.wait_with_output()?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ContentSniffer for FileCommandSniffer {
    fn sniff(&self, window: &[u8]) -> String {
        match self.run(window) {
            Ok(label) if !label.is_empty() => label,
            _ => OCTET_STREAM.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(bytes: &[u8]) -> String {
        BuiltinSniffer::new().sniff(bytes)
    }

    #[test]
    fn test_signatures() {
        assert_eq!(sniff(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj"), "application/pdf");
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x10"), "image/png");
        assert_eq!(sniff(b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00"), "application/x-executable");
        assert_eq!(sniff(b"\x1f\x8b\x08\x00\x00\x00\x00\x00\x00\x03"), "application/gzip");
        assert_eq!(sniff(b"RIFF\x24\x08\x00\x00WAVEfmt "), "audio/x-wav");
    }

    #[test]
    fn test_text() {
        assert_eq!(sniff(b"Hello there, this is just some prose."), "text/plain");
        assert_eq!(sniff(b"#!/usr/bin/env python3\nimport os\n"), "text/x-script.python");
        assert_eq!(sniff(b"#!/bin/sh\nset -eu\necho hello world\n"), "text/x-shellscript");
        assert_eq!(sniff(b"<?xml version=\"1.0\"?><root/>"), "text/xml");
        assert_eq!(sniff(b"  <!DOCTYPE html><html><body>"), "text/html");
        assert_eq!(sniff(b"{\"name\": \"dutype\", \"version\": 1}"), "application/json");
    }

    #[test]
    fn test_utf8_cut_mid_character_is_still_text() {
        let mut window = "caf\u{e9} cr\u{e8}me br\u{fb}l\u{e9}e ".as_bytes().to_vec();
        window.extend_from_slice(&"\u{e9}".as_bytes()[..1]);
        assert_eq!(sniff(&window), "text/plain");
    }

    #[test]
    fn test_binary_fallback() {
        assert_eq!(sniff(&[0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]), OCTET_STREAM);
        assert_eq!(sniff(&[0xffu8; 30]), OCTET_STREAM);
        assert_eq!(sniff(b""), EMPTY);
    }

    #[test]
    fn test_sniffer_kind_from_str() {
        assert_eq!("builtin".parse::<SnifferKind>().unwrap(), SnifferKind::Builtin);
        assert_eq!("file".parse::<SnifferKind>().unwrap(), SnifferKind::File);
        assert!("magic".parse::<SnifferKind>().is_err());
    }

    #[test]
    fn test_file_command_missing_falls_back() {
        let sniffer = FileCommandSniffer::new("/nonexistent/file-binary");
        assert_eq!(sniffer.sniff(b"hello world"), OCTET_STREAM);
    }
}
