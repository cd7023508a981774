// Gas reading models and the analyzer status-line parser
use chrono::{DateTime, Local};
use thiserror::Error;

/// The five gases reported by the analyzer. The set is fixed; no channel is
/// ever added or removed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GasChannel {
    Co2,
    Co,
    Ch4,
    H2,
    O2,
}

impl GasChannel {
    pub const ALL: [GasChannel; 5] = [
        GasChannel::Co2,
        GasChannel::Co,
        GasChannel::Ch4,
        GasChannel::H2,
        GasChannel::O2,
    ];

    /// CSV column / readout label.
    pub fn label(&self) -> &'static str {
        match self {
            GasChannel::Co2 => "CO2",
            GasChannel::Co => "CO",
            GasChannel::Ch4 => "CH4",
            GasChannel::H2 => "H2",
            GasChannel::O2 => "O2",
        }
    }

    /// Marker preceding this channel's value in the status line.
    fn marker(&self) -> &'static str {
        match self {
            GasChannel::Co2 => "Ch1/R4:",
            GasChannel::Co => "Ch2/R4:",
            GasChannel::Ch4 => "Ch3/R4:",
            GasChannel::H2 => "Ch4/R4:",
            GasChannel::O2 => "Ch5/R4:",
        }
    }
}

impl std::fmt::Display for GasChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One complete set of channel values, in Vol%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasValues {
    pub co2: f64,
    pub co: f64,
    pub ch4: f64,
    pub h2: f64,
    pub o2: f64,
}

impl GasValues {
    pub fn get(&self, channel: GasChannel) -> f64 {
        match channel {
            GasChannel::Co2 => self.co2,
            GasChannel::Co => self.co,
            GasChannel::Ch4 => self.ch4,
            GasChannel::H2 => self.h2,
            GasChannel::O2 => self.o2,
        }
    }
}

/// One sample. `values` is `None` when the whole sample failed to parse;
/// channels are never partially populated.
#[derive(Debug, Clone)]
pub struct Reading {
    pub timestamp: DateTime<Local>,
    pub values: Option<GasValues>,
}

impl Reading {
    pub fn ok(timestamp: DateTime<Local>, values: GasValues) -> Self {
        Self {
            timestamp,
            values: Some(values),
        }
    }

    pub fn missing(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            values: None,
        }
    }

    pub fn value(&self, channel: GasChannel) -> Option<f64> {
        self.values.map(|v| v.get(channel))
    }
}

const UNIT_TOKEN: &str = "Vol%";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("marker '{0}' not found in status line")]
    MissingMarker(&'static str),
    #[error("no 'Vol%' terminator after marker '{0}'")]
    MissingUnit(&'static str),
    #[error("invalid number '{text}' for {channel}")]
    InvalidNumber { channel: GasChannel, text: String },
}

/// Parse the analyzer status line into the five channel values.
///
/// The markers must appear in channel order; the payload is the trimmed
/// substring between a marker and the next `Vol%`. Any missing marker or
/// non-numeric payload fails the whole sample.
pub fn parse_status_line(raw: &str) -> Result<GasValues, ParseError> {
    let mut rest = raw;
    let mut parsed = [0.0f64; 5];

    for (slot, channel) in GasChannel::ALL.iter().enumerate() {
        let marker = channel.marker();
        let start = rest
            .find(marker)
            .ok_or(ParseError::MissingMarker(marker))?;
        let after = &rest[start + marker.len()..];
        let end = after
            .find(UNIT_TOKEN)
            .ok_or(ParseError::MissingUnit(marker))?;
        let text = after[..end].trim();
        parsed[slot] = text.parse().map_err(|_| ParseError::InvalidNumber {
            channel: *channel,
            text: text.to_string(),
        })?;
        rest = &after[end + UNIT_TOKEN.len()..];
    }

    Ok(GasValues {
        co2: parsed[0],
        co: parsed[1],
        ch4: parsed[2],
        h2: parsed[3],
        o2: parsed[4],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_LINE: &str = "Ch1/R4: 0.02 Vol% Ch2/R4: 0.00 Vol% \
        Ch3/R4: 0.01 Vol% Ch4/R4: 0.11 Vol% Ch5/R4: 20.95 Vol%";

    #[test]
    fn test_parse_full_status_line() {
        let values = parse_status_line(STATUS_LINE).unwrap();
        assert_eq!(values.co2, 0.02);
        assert_eq!(values.co, 0.00);
        assert_eq!(values.ch4, 0.01);
        assert_eq!(values.h2, 0.11);
        assert_eq!(values.o2, 20.95);
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let raw = "Ch1/R4:   1.5  Vol% Ch2/R4:0.2Vol% Ch3/R4: 0.0 Vol% \
            Ch4/R4: 0.1 Vol% Ch5/R4: 19.0 Vol%";
        let values = parse_status_line(raw).unwrap();
        assert_eq!(values.co2, 1.5);
        assert_eq!(values.co, 0.2);
    }

    #[test]
    fn test_missing_marker_fails_whole_sample() {
        let raw = STATUS_LINE.replace("Ch3/R4:", "");
        let err = parse_status_line(&raw).unwrap_err();
        assert!(matches!(err, ParseError::MissingMarker("Ch3/R4:")));
    }

    #[test]
    fn test_markers_out_of_order_fail() {
        let raw = "Ch2/R4: 0.00 Vol% Ch1/R4: 0.02 Vol% Ch3/R4: 0.01 Vol% \
            Ch4/R4: 0.11 Vol% Ch5/R4: 20.95 Vol%";
        assert!(parse_status_line(raw).is_err());
    }

    #[test]
    fn test_non_numeric_payload_fails() {
        let raw = STATUS_LINE.replace("0.11", "n/a");
        let err = parse_status_line(&raw).unwrap_err();
        match err {
            ParseError::InvalidNumber { channel, text } => {
                assert_eq!(channel, GasChannel::H2);
                assert_eq!(text, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_unit_terminator_fails() {
        let raw = "Ch1/R4: 0.02 Vol% Ch2/R4: 0.00 Vol% Ch3/R4: 0.01 Vol% \
            Ch4/R4: 0.11 Vol% Ch5/R4: 20.95";
        let err = parse_status_line(raw).unwrap_err();
        assert!(matches!(err, ParseError::MissingUnit("Ch5/R4:")));
    }
}
