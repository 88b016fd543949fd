//! Diagnostic output for datagrams the proxy cannot classify

use tracing::warn;

/// Bytes rendered per hex dump line
pub const HEXDUMP_WIDTH: usize = 16;

/// Datagrams this short are dropped without a dump
pub const HEXDUMP_MIN_LEN: usize = 4;

/// Render `data` as hex dump lines of `width` bytes.
///
/// Each line is the space-separated hex bytes followed by the same bytes as
/// text, with non-printable bytes shown as `.`. The last line is padded with
/// zero bytes.
pub fn hexdump(data: &[u8], width: usize) -> Vec<String> {
    let width = width.max(1);
    data.chunks(width)
        .map(|chunk| {
            let mut padded = chunk.to_vec();
            padded.resize(width, 0);

            let hex = padded
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let text: String = padded
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            format!("{} {}", hex, text)
        })
        .collect()
}

/// Log an unrecognized datagram; tiny ones (keepalives) are skipped.
/// Returns whether a dump was written.
pub fn report_unrecognized(data: &[u8]) -> bool {
    if data.len() <= HEXDUMP_MIN_LEN {
        return false;
    }
    warn!("---\n>> server received [{}]:", data.len());
    for line in hexdump(data, HEXDUMP_WIDTH) {
        warn!("{}", line);
    }
    warn!("---");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hexdump_pads_last_line() {
        let lines = hexdump(b"garbly", HEXDUMP_WIDTH);
        assert_eq!(
            lines,
            vec!["67 61 72 62 6c 79 00 00 00 00 00 00 00 00 00 00 garbly..........".to_string()]
        );
    }

    #[test]
    fn test_hexdump_multiple_lines() {
        let data: Vec<u8> = (0u8..20).map(|i| b'a' + i).collect();
        let lines = hexdump(&data, HEXDUMP_WIDTH);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" abcdefghijklmnop"));
        assert!(lines[1].starts_with("71 72 73 74 00"));
        assert!(lines[1].ends_with(" qrst............"));
    }

    #[test]
    fn test_hexdump_non_printable() {
        let lines = hexdump(&[0x00, 0x0d, 0x0a, b'A'], 4);
        assert_eq!(lines, vec!["00 0d 0a 41 ...A".to_string()]);
    }

    #[test]
    fn test_keepalives_are_not_dumped() {
        assert!(!report_unrecognized(b""));
        assert!(!report_unrecognized(b"\r\n\r\n"));
        assert!(report_unrecognized(b"\r\n\r\n\0"));
        assert!(report_unrecognized(b"garbly"));
    }
}
