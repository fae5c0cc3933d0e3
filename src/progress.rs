//! Parsing of yt-dlp progress-template lines.
//!
//! Downloads run with `--progress-template` so that every progress line
//! carries a fixed marker followed by `percent|speed|eta`, e.g.
//! `tubegrid: 43.2%|1.23MiB/s|120`. yt-dlp sometimes prefixes the line
//! with `download:`, so the marker is searched anywhere in the line.

/// Marker emitted by our `--progress-template`.
pub const MARKER: &str = "tubegrid:";

/// A parsed progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    /// 0.0 to 100.0
    pub percent: f32,
    /// Raw speed text, e.g. "1.23MiB/s"
    pub speed: String,
    /// Seconds remaining, absent when yt-dlp reports N/A
    pub eta: Option<u64>,
}

/// Parses one stdout line. Returns `None` for anything that is not a
/// well-formed progress line with a usable percent.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let idx = line.find(MARKER)?;
    let rest = &line[idx + MARKER.len()..];
    let mut fields = rest.splitn(3, '|');

    let percent = parse_percent(fields.next()?)?;
    let speed = fields.next().unwrap_or("").trim().to_string();
    let eta = fields.next().and_then(|f| f.trim().parse::<u64>().ok());

    Some(ProgressLine { percent, speed, eta })
}

/// Extracts the numeric token preceding the `%` marker, e.g. "  43.2%".
fn parse_percent(field: &str) -> Option<f32> {
    let number = field.trim().strip_suffix('%')?.trim();
    if number == "N/A" {
        return None;
    }
    number.parse::<f32>().ok().map(|p| p.clamp(0.0, 100.0))
}

/// Normalizes an ETA in seconds to HH:MM:SS; unknown becomes "00:00:00".
pub fn format_eta(seconds: Option<u64>) -> String {
    let secs = seconds.unwrap_or(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_progress_line() {
        let line = parse_progress_line("tubegrid:  43.2%|1.23MiB/s|120").unwrap();
        assert_eq!(line.percent, 43.2);
        assert_eq!(line.speed, "1.23MiB/s");
        assert_eq!(line.eta, Some(120));
    }

    #[test]
    fn tolerates_a_download_prefix() {
        let line = parse_progress_line("download:tubegrid: 99.9%|512.00KiB/s|3").unwrap();
        assert_eq!(line.percent, 99.9);
        assert_eq!(line.eta, Some(3));
    }

    #[test]
    fn missing_eta_is_none() {
        let line = parse_progress_line("tubegrid: 10.0%|Unknown|NA").unwrap();
        assert_eq!(line.eta, None);
        assert_eq!(line.speed, "Unknown");
    }

    #[test]
    fn rejects_unmarked_and_malformed_lines() {
        assert_eq!(parse_progress_line("[download] Destination: a.mp4"), None);
        assert_eq!(parse_progress_line("tubegrid:"), None);
        assert_eq!(parse_progress_line("tubegrid: N/A%|x|y"), None);
        assert_eq!(parse_progress_line("tubegrid: abc%|x|y"), None);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(parse_progress_line("tubegrid: 150%|x|1").unwrap().percent, 100.0);
        assert_eq!(parse_progress_line("tubegrid: -5%|x|1").unwrap().percent, 0.0);
    }

    #[test]
    fn eta_formats_as_hms() {
        assert_eq!(format_eta(Some(3725)), "01:02:05");
        assert_eq!(format_eta(Some(59)), "00:00:59");
        assert_eq!(format_eta(None), "00:00:00");
    }
}
