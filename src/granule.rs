use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::IcevelError;

/// Vendor filename grammar for NSIDC-0481 style velocity granules, e.g.
/// `TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif`. The parameter
/// segment is absent entirely for non-parameterized files.
fn granule_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(TSX|TDX)_([EWS][0-9.]+[NS])",
            r"_(\d\d(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\d\d)",
            r"_(\d\d(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\d\d)",
            r"_(\d\d)-(\d\d)-(\d\d)(?:_(vv|vx|vy|ex|ey))?_v([0-9.]+)(\..+)$",
        ))
        .expect("granule grammar regex")
    })
}

const DATE_FORMAT: &str = "%d%b%y";

/// Sensor that acquired the granule.
///
/// Variant order matches the lexical order of the rendered identifiers;
/// the catalog comparator relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Tdx,
    Tsx,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Tdx => "TDX",
            Source::Tsx => "TSX",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = IcevelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "TSX" => Ok(Source::Tsx),
            "TDX" => Ok(Source::Tdx),
            other => Err(IcevelError::UnknownSource(other.to_string())),
        }
    }
}

/// Wall-clock acquisition time triplet carried in the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NominalTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for NominalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}-{:02}", self.hour, self.minute, self.second)
    }
}

/// Attribute overrides applied when rendering a filename. Overrides take
/// precedence over the record's own fields.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub parameter: Option<String>,
    pub extension: Option<String>,
}

/// Identity of one raw or derived granule file. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleRecord {
    pub source: Source,
    pub grid: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nominal_time: NominalTime,
    /// Empty string when the filename carries no parameter segment.
    pub parameter: String,
    pub version: String,
    pub extension: String,
}

impl GranuleRecord {
    /// Matches `name` against the vendor grammar. Non-conforming names
    /// yield `Ok(None)`; a conforming name with an unparsable date field
    /// is a construction error.
    pub fn decode(name: &str) -> Result<Option<GranuleRecord>, IcevelError> {
        let Some(caps) = granule_regex().captures(name) else {
            return Ok(None);
        };

        let source: Source = caps[1].parse()?;
        let start_date = parse_granule_date(name, &caps[3])?;
        let end_date = parse_granule_date(name, &caps[4])?;
        let nominal_time = NominalTime {
            hour: parse_time_field(name, &caps[5])?,
            minute: parse_time_field(name, &caps[6])?,
            second: parse_time_field(name, &caps[7])?,
        };
        // An absent parameter normalizes to the empty string so records
        // sort deterministically.
        let parameter = caps
            .get(8)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Ok(Some(GranuleRecord {
            source,
            grid: caps[2].to_string(),
            start_date,
            end_date,
            nominal_time,
            parameter,
            version: caps[9].to_string(),
            extension: caps[10].to_string(),
        }))
    }

    /// Renders the vendor filename for this record merged with `overrides`.
    /// The parameter segment is omitted when the effective parameter is
    /// empty, matching the vendor grammar.
    pub fn encode(&self, overrides: &Overrides) -> String {
        let parameter = overrides.parameter.as_deref().unwrap_or(&self.parameter);
        let extension = overrides.extension.as_deref().unwrap_or(&self.extension);
        let stem = format!(
            "{}_{}_{}_{}_{}",
            self.source,
            self.grid,
            self.start_date.format(DATE_FORMAT),
            self.end_date.format(DATE_FORMAT),
            self.nominal_time,
        );
        if parameter.is_empty() {
            format!("{stem}_v{}{extension}", self.version)
        } else {
            format!("{stem}_{parameter}_v{}{extension}", self.version)
        }
    }

    pub fn file_name(&self) -> String {
        self.encode(&Overrides::default())
    }

    /// Mid-point of the acquisition interval, used as the time-series index.
    pub fn nominal_datetime(&self) -> NaiveDateTime {
        let start = self.start_date.and_time(NaiveTime::MIN);
        let end = self.end_date.and_time(NaiveTime::MIN);
        start + (end - start) / 2
    }

    /// The 8-key comparator ordering the catalog. Temporal order within a
    /// single (source, grid, parameter) restriction falls out of this key.
    pub fn sort_key(
        &self,
    ) -> (
        &str,
        &str,
        NaiveDate,
        NaiveDate,
        &str,
        NominalTime,
        &str,
        &str,
    ) {
        (
            self.source.as_str(),
            &self.grid,
            self.start_date,
            self.end_date,
            &self.parameter,
            self.nominal_time,
            &self.version,
            &self.extension,
        )
    }
}

fn parse_granule_date(name: &str, value: &str) -> Result<NaiveDate, IcevelError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| IcevelError::MalformedDate {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_time_field(name: &str, value: &str) -> Result<u8, IcevelError> {
    value.parse().map_err(|_| IcevelError::MalformedTime {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn decode_parameterized_name() {
        let record = GranuleRecord::decode("TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif")
            .unwrap()
            .unwrap();
        assert_eq!(record.source, Source::Tsx);
        assert_eq!(record.grid, "W69.10N");
        assert_eq!(record.start_date, NaiveDate::from_ymd_opt(2018, 6, 2).unwrap());
        assert_eq!(record.end_date, NaiveDate::from_ymd_opt(2018, 6, 13).unwrap());
        assert_eq!(
            record.nominal_time,
            NominalTime {
                hour: 9,
                minute: 48,
                second: 58
            }
        );
        assert_eq!(record.parameter, "vx");
        assert_eq!(record.version, "02.0");
        assert_eq!(record.extension, ".tif");
    }

    #[test]
    fn decode_normalizes_missing_parameter() {
        let record = GranuleRecord::decode("TDX_E66.50N_28Apr09_09May09_09-48-04_v02.0.nc")
            .unwrap()
            .unwrap();
        assert_eq!(record.parameter, "");
        assert_eq!(record.source, Source::Tdx);
    }

    #[test]
    fn round_trip_is_identity() {
        for name in [
            "TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif",
            "TSX_W69.10N_30Jan09_10Feb09_09-48-02_vv_v02.0.nc",
            "TDX_E66.50N_28Apr09_09May09_09-48-04_v02.0.tif",
        ] {
            let record = GranuleRecord::decode(name).unwrap().unwrap();
            assert_eq!(record.file_name(), name);
            let again = GranuleRecord::decode(&record.file_name()).unwrap().unwrap();
            assert_eq!(again, record);
        }
    }

    #[test]
    fn decode_rejects_foreign_names_without_error() {
        for name in [
            "",
            "readme.txt",
            "TSX_W69.10N.tif",
            "LANDSAT_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif",
            "TSX_W69.10N_02Jun18_13Jun18_09-48-58_vz_v02.0.tif",
            "TSX_W69.10N_02Xyz18_13Jun18_09-48-58_vx_v02.0.tif",
            "TSX_W69.10N_02Jun18_13Jun18_09-48_vx_v02.0.tif",
        ] {
            assert_matches!(GranuleRecord::decode(name), Ok(None), "{name}");
        }
    }

    #[test]
    fn decode_fails_on_impossible_date() {
        let err = GranuleRecord::decode("TSX_W69.10N_31Jun18_13Jul18_09-48-58_vx_v02.0.tif")
            .unwrap_err();
        assert_matches!(err, IcevelError::MalformedDate { .. });
    }

    #[test]
    fn encode_overrides_take_precedence() {
        let record = GranuleRecord::decode("TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif")
            .unwrap()
            .unwrap();
        let rendered = record.encode(&Overrides {
            parameter: Some("vy".to_string()),
            extension: Some(".nc".to_string()),
        });
        assert_eq!(rendered, "TSX_W69.10N_02Jun18_13Jun18_09-48-58_vy_v02.0.nc");
    }

    #[test]
    fn nominal_datetime_is_interval_midpoint() {
        let record = GranuleRecord::decode("TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif")
            .unwrap()
            .unwrap();
        // 11-day span: midpoint falls at noon.
        assert_eq!(
            record.nominal_datetime(),
            NaiveDate::from_ymd_opt(2018, 6, 7)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn nominal_time_orders_lexically() {
        let earlier = NominalTime {
            hour: 9,
            minute: 48,
            second: 7,
        };
        let later = NominalTime {
            hour: 9,
            minute: 48,
            second: 58,
        };
        assert!(earlier < later);
    }
}
