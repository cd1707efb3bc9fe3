use std::fmt;

/// Marker used whenever a probed field is missing or unparseable.
pub const NOT_AVAILABLE: &str = "N/A";

/// Seconds (as reported by ffprobe, e.g. "3661.04") -> "HH:MM:SS".
/// Each unit truncates; anything non-numeric degrades to "N/A".
pub fn format_duration(raw: Option<&str>) -> String {
    let Some(seconds) = raw.and_then(|s| s.trim().parse::<f64>().ok()) else {
        return NOT_AVAILABLE.to_string();
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return NOT_AVAILABLE.to_string();
    }
    let total = seconds as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Byte count -> largest fitting unit with two decimals (1024 thresholds).
pub fn format_size(bytes: Option<u64>) -> String {
    match bytes {
        None | Some(0) => NOT_AVAILABLE.to_string(),
        Some(b) if b < 1024 => format!("{b} B"),
        Some(b) if b < 1024 * 1024 => format!("{:.2} KB", b as f64 / 1024.0),
        Some(b) if b < 1024 * 1024 * 1024 => {
            format!("{:.2} MB", b as f64 / (1024.0 * 1024.0))
        }
        Some(b) => format!("{:.2} GB", b as f64 / (1024.0 * 1024.0 * 1024.0)),
    }
}

/// Bits per second (raw ffprobe string) -> "{kbps} kbps".
pub fn format_bitrate(raw: Option<&str>) -> String {
    match raw.and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(bps) => format!("{} kbps", bps / 1000),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// A frame rate, either parsed to two decimals or passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Fps {
    Parsed(f64),
    Unparsed(String),
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fps::Parsed(v) => write!(f, "{v}"),
            Fps::Unparsed(s) => f.write_str(s),
        }
    }
}

/// "30000/1001" -> 29.97, "25" -> 25.0; unparseable input passes through.
pub fn parse_fps(raw: &str) -> Fps {
    let parsed = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = match num.trim().parse() {
                Ok(v) => v,
                Err(_) => return Fps::Unparsed(raw.to_string()),
            };
            let den: f64 = match den.trim().parse() {
                Ok(v) => v,
                Err(_) => return Fps::Unparsed(raw.to_string()),
            };
            if den == 0.0 {
                return Fps::Unparsed(raw.to_string());
            }
            num / den
        }
        None => match raw.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => return Fps::Unparsed(raw.to_string()),
        },
    };
    Fps::Parsed((parsed * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_known_values() {
        assert_eq!(format_duration(Some("3661")), "01:01:01");
        assert_eq!(format_duration(Some("0")), "00:00:00");
        assert_eq!(format_duration(Some("59.94")), "00:00:59");
        assert_eq!(format_duration(Some("7322.7")), "02:02:02");
    }

    #[test]
    fn test_format_duration_degrades() {
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some("N/A")), "N/A");
        assert_eq!(format_duration(Some("bogus")), "N/A");
        assert_eq!(format_duration(Some("-3")), "N/A");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(Some(500)), "500 B");
        assert_eq!(format_size(Some(2048)), "2.00 KB");
        assert_eq!(format_size(Some(5 * 1024 * 1024)), "5.00 MB");
        assert_eq!(format_size(Some(3 * 1024 * 1024 * 1024)), "3.00 GB");
        assert_eq!(format_size(None), "N/A");
        assert_eq!(format_size(Some(0)), "N/A");
    }

    #[test]
    fn test_format_bitrate() {
        assert_eq!(format_bitrate(Some("1200000")), "1200 kbps");
        assert_eq!(format_bitrate(Some("garbage")), "N/A");
        assert_eq!(format_bitrate(None), "N/A");
    }

    #[test]
    fn test_parse_fps_rational() {
        match parse_fps("30000/1001") {
            Fps::Parsed(v) => assert!((v - 29.97).abs() < 1e-9),
            other => panic!("expected parsed fps, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fps_plain_decimal() {
        match parse_fps("25") {
            Fps::Parsed(v) => assert!((v - 25.0).abs() < 1e-9),
            other => panic!("expected parsed fps, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fps_passthrough() {
        assert_eq!(parse_fps("bogus"), Fps::Unparsed("bogus".to_string()));
        assert_eq!(parse_fps("1/0"), Fps::Unparsed("1/0".to_string()));
        assert_eq!(parse_fps("0/0").to_string(), "0/0");
    }

    #[test]
    fn test_fps_display() {
        assert_eq!(parse_fps("30000/1001").to_string(), "29.97");
        assert_eq!(parse_fps("25").to_string(), "25");
    }
}
