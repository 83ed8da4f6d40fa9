use chrono::{DateTime, Utc};
use regex::bytes::Regex;
use std::sync::OnceLock;

/// Priority and timestamp carried by an RFC 5424 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyslogHeader {
    pub priority: u8,
    /// `None` for the NILVALUE (`-`) timestamp.
    pub timestamp: Option<DateTime<Utc>>,
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^<(?P<pri>\d{1,3})>1 (?P<ts>-|\S+) ").expect("syslog header pattern is valid")
    })
}

/// Parse the `<PRI>1 TIMESTAMP ` prefix of a line.
///
/// Returns `None` when the line does not start with an RFC 5424 header, the
/// priority is out of range, or the timestamp is not RFC 3339.
pub fn parse_header(line: &[u8]) -> Option<SyslogHeader> {
    let caps = header_pattern().captures(line)?;

    let priority: u8 = std::str::from_utf8(caps.name("pri")?.as_bytes())
        .ok()?
        .parse()
        .ok()?;
    if priority > 191 {
        return None;
    }

    let ts = std::str::from_utf8(caps.name("ts")?.as_bytes()).ok()?;
    let timestamp = if ts == "-" {
        None
    } else {
        Some(DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc))
    };

    Some(SyslogHeader {
        priority,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_full_header() {
        let header =
            parse_header(b"<134>1 2025-12-04T10:00:00.123Z web1 app 42 - - hello").unwrap();
        assert_eq!(header.priority, 134);
        assert_eq!(
            header.timestamp.unwrap(),
            Utc.with_ymd_and_hms(2025, 12, 4, 10, 0, 0).unwrap()
                + chrono::Duration::milliseconds(123)
        );
    }

    #[test]
    fn test_parse_offset_timestamp_normalized() {
        let header = parse_header(b"<13>1 2025-12-04T12:00:00+02:00 h a p m - x").unwrap();
        assert_eq!(
            header.timestamp.unwrap(),
            Utc.with_ymd_and_hms(2025, 12, 4, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_nil_timestamp() {
        let header = parse_header(b"<0>1 - host app - - - msg").unwrap();
        assert_eq!(header.priority, 0);
        assert!(header.timestamp.is_none());
    }

    #[test]
    fn test_rejects_plain_text_and_bad_values() {
        assert!(parse_header(b"plain log line").is_none());
        assert!(parse_header(b"<999>1 - host app - - - msg").is_none());
        assert!(parse_header(b"<13>1 yesterday host app - - - msg").is_none());
        assert!(parse_header(b"<13> 2025-12-04T10:00:00Z no version").is_none());
    }
}
