use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;
use crate::units;

// Substituted when the feed omits a field or the fetch fails outright.
// Chosen to read as calm conditions so a degraded reading can never trip
// a hazard threshold.
pub const DEFAULT_PRESSURE_HPA: f64 = 1013.0;
pub const DEFAULT_VISIBILITY_NM: f64 = 10.0;
pub const DEFAULT_AIR_TEMP_F: f64 = 68.0;
pub const DEFAULT_WATER_TEMP_F: f64 = 65.0;

/// One snapshot of ocean/weather telemetry for a station, normalized to
/// knots / feet / nautical miles / Fahrenheit at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuoyReading {
    pub station_id: String,
    pub wind_speed_knots: f64,
    pub wind_gust_knots: f64,
    pub wave_height_feet: f64,
    pub wave_period_seconds: f64,
    pub air_pressure_hpa: f64,
    pub visibility_nm: f64,
    pub air_temp_f: f64,
    pub water_temp_f: f64,
    pub observed_at: DateTime<Utc>,
    /// True when the source failed and calm defaults were substituted.
    /// Downstream classification must never raise an alert off these values.
    pub degraded: bool,
}

impl BuoyReading {
    pub fn degraded(station_id: &str, observed_at: DateTime<Utc>) -> Self {
        Self {
            station_id: station_id.to_string(),
            wind_speed_knots: 0.0,
            wind_gust_knots: 0.0,
            wave_height_feet: 0.0,
            wave_period_seconds: 0.0,
            air_pressure_hpa: DEFAULT_PRESSURE_HPA,
            visibility_nm: DEFAULT_VISIBILITY_NM,
            air_temp_f: DEFAULT_AIR_TEMP_F,
            water_temp_f: DEFAULT_WATER_TEMP_F,
            observed_at,
            degraded: true,
        }
    }
}

/// Capability seam for anything that can produce a reading for a station.
/// Infallible by contract: implementations degrade internally on failure.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_reading(&self, station_id: &str) -> BuoyReading;
}

#[derive(Clone)]
pub struct BuoyFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BuoyFetcher {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    /// Fetch the latest observation for a station.
    ///
    /// Never returns an error: any fetch or parse failure is logged and
    /// replaced with a degraded calm-condition reading, so one bad station
    /// cannot stall the evaluation pipeline.
    #[instrument(skip(self), fields(station_id = %station_id))]
    pub async fn fetch_reading(&self, station_id: &str) -> BuoyReading {
        match self.fetch_observed(station_id).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(station_id, error = %e, "Buoy fetch failed, substituting calm-condition defaults");
                BuoyReading::degraded(station_id, Utc::now())
            }
        }
    }

    async fn fetch_observed(&self, station_id: &str) -> Result<BuoyReading, FetchError> {
        let url = format!("{}/data/realtime2/{}.txt", self.base_url, station_id);
        let text = self.get_text(&url).await?;
        let mut record = parse_standard(&text)?;

        // Wave fields are often absent from the standard meteorological feed;
        // the spectral companion file carries them when the station has a
        // wave sensor. Failure to fetch it is not an error.
        if record.wave_height_feet.is_none() || record.wave_period_seconds.is_none() {
            let spec_url = format!("{}/data/realtime2/{}.spec", self.base_url, station_id);
            if let Ok(spec_text) = self.get_text(&spec_url).await {
                match parse_spectral(&spec_text) {
                    Ok(spectral) => record.merge_spectral(spectral),
                    Err(e) => debug!(station_id, error = %e, "Spectral record unparseable, skipping"),
                }
            }
        }

        Ok(record.into_reading(station_id))
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "Sending HTTP request to buoy feed");
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        debug!("Received HTTP response with status: {}", response.status());

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl TelemetrySource for BuoyFetcher {
    async fn fetch_reading(&self, station_id: &str) -> BuoyReading {
        BuoyFetcher::fetch_reading(self, station_id).await
    }
}

/// A parsed feed table: a `#`-prefixed header row of field names, an optional
/// `#`-prefixed units row, and the most recent data row.
struct RecordTable {
    names: Vec<String>,
    units: Vec<String>,
    values: Vec<String>,
}

impl RecordTable {
    fn parse(text: &str) -> Result<Self, FetchError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines.next().ok_or(FetchError::ParseError)?;
        if !header.starts_with('#') {
            return Err(FetchError::ParseError);
        }
        let names: Vec<String> = header
            .trim_start_matches('#')
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut next = lines.next().ok_or(FetchError::ParseError)?;
        let units: Vec<String> = if next.starts_with('#') {
            let units = next
                .trim_start_matches('#')
                .split_whitespace()
                .map(str::to_string)
                .collect();
            next = lines.next().ok_or(FetchError::ParseError)?;
            units
        } else {
            Vec::new()
        };

        let values: Vec<String> = next.split_whitespace().map(str::to_string).collect();
        if names.is_empty() || values.is_empty() {
            return Err(FetchError::ParseError);
        }

        Ok(Self {
            names,
            units,
            values,
        })
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Raw token for a named column; `MM` is the feed's missing-value sentinel.
    fn raw(&self, name: &str) -> Option<&str> {
        let idx = self.index(name)?;
        let token = self.values.get(idx)?;
        if token == "MM" {
            None
        } else {
            Some(token.as_str())
        }
    }

    fn value(&self, name: &str) -> Result<Option<f64>, FetchError> {
        match self.raw(name) {
            None => Ok(None),
            Some(token) => token
                .parse::<f64>()
                .map(Some)
                .map_err(|e| FetchError::NumberError(format!("{}: {}", name, e))),
        }
    }

    fn unit(&self, name: &str) -> Option<&str> {
        let idx = self.index(name)?;
        self.units.get(idx).map(String::as_str)
    }

    fn date_part(&self, name: &str) -> Result<u32, FetchError> {
        self.raw(name)
            .ok_or_else(|| FetchError::DateTimeError(format!("missing column {}", name)))?
            .parse::<u32>()
            .map_err(|e| FetchError::DateTimeError(format!("{}: {}", name, e)))
    }

    fn observed_at(&self) -> Result<DateTime<Utc>, FetchError> {
        let year = self.date_part("YY")?;
        // Older archives report two-digit years
        let year = if year < 100 { year + 2000 } else { year };
        let month = self.date_part("MM")?;
        let day = self.date_part("DD")?;
        let hour = self.date_part("hh")?;
        let minute = self.date_part("mm")?;

        Utc.with_ymd_and_hms(year as i32, month, day, hour, minute, 0)
            .single()
            .ok_or_else(|| {
                FetchError::DateTimeError(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}",
                    year, month, day, hour, minute
                ))
            })
    }
}

fn speed_to_knots(value: f64, unit: Option<&str>) -> f64 {
    match unit {
        Some("kts") | Some("kt") | Some("kn") => value,
        // NDBC standard feeds report m/s
        _ => units::ms_to_knots(value),
    }
}

fn length_to_feet(value: f64, unit: Option<&str>) -> f64 {
    match unit {
        Some("ft") => value,
        _ => units::meters_to_feet(value),
    }
}

fn temp_to_fahrenheit(value: f64, unit: Option<&str>) -> f64 {
    match unit {
        Some("degF") => value,
        _ => units::celsius_to_fahrenheit(value),
    }
}

fn distance_to_nm(value: f64, unit: Option<&str>) -> f64 {
    match unit {
        Some("km") => units::km_to_nautical_miles(value),
        // NDBC visibility is already nautical miles
        _ => value,
    }
}

/// Intermediate record with per-field presence, before calm defaults are
/// applied. Values are already converted to alert units.
struct ObservedRecord {
    observed_at: DateTime<Utc>,
    wind_speed_knots: Option<f64>,
    wind_gust_knots: Option<f64>,
    wave_height_feet: Option<f64>,
    wave_period_seconds: Option<f64>,
    air_pressure_hpa: Option<f64>,
    visibility_nm: Option<f64>,
    air_temp_f: Option<f64>,
    water_temp_f: Option<f64>,
}

struct SpectralRecord {
    wave_height_feet: Option<f64>,
    wave_period_seconds: Option<f64>,
}

impl ObservedRecord {
    fn merge_spectral(&mut self, spectral: SpectralRecord) {
        if self.wave_height_feet.is_none() {
            self.wave_height_feet = spectral.wave_height_feet;
        }
        if self.wave_period_seconds.is_none() {
            self.wave_period_seconds = spectral.wave_period_seconds;
        }
    }

    fn into_reading(self, station_id: &str) -> BuoyReading {
        let wind_speed_knots = self.wind_speed_knots.unwrap_or(0.0);
        BuoyReading {
            station_id: station_id.to_string(),
            wind_speed_knots,
            wind_gust_knots: self.wind_gust_knots.unwrap_or(wind_speed_knots),
            wave_height_feet: self.wave_height_feet.unwrap_or(0.0),
            wave_period_seconds: self.wave_period_seconds.unwrap_or(0.0),
            air_pressure_hpa: self.air_pressure_hpa.unwrap_or(DEFAULT_PRESSURE_HPA),
            visibility_nm: self.visibility_nm.unwrap_or(DEFAULT_VISIBILITY_NM),
            air_temp_f: self.air_temp_f.unwrap_or(DEFAULT_AIR_TEMP_F),
            water_temp_f: self.water_temp_f.unwrap_or(DEFAULT_WATER_TEMP_F),
            observed_at: self.observed_at,
            degraded: false,
        }
    }
}

fn parse_standard(text: &str) -> Result<ObservedRecord, FetchError> {
    let table = RecordTable::parse(text)?;
    let observed_at = table.observed_at()?;

    Ok(ObservedRecord {
        observed_at,
        wind_speed_knots: table
            .value("WSPD")?
            .map(|v| speed_to_knots(v, table.unit("WSPD"))),
        wind_gust_knots: table
            .value("GST")?
            .map(|v| speed_to_knots(v, table.unit("GST"))),
        wave_height_feet: table
            .value("WVHT")?
            .map(|v| length_to_feet(v, table.unit("WVHT"))),
        wave_period_seconds: table.value("DPD")?,
        air_pressure_hpa: table.value("PRES")?,
        visibility_nm: table
            .value("VIS")?
            .map(|v| distance_to_nm(v, table.unit("VIS"))),
        air_temp_f: table
            .value("ATMP")?
            .map(|v| temp_to_fahrenheit(v, table.unit("ATMP"))),
        water_temp_f: table
            .value("WTMP")?
            .map(|v| temp_to_fahrenheit(v, table.unit("WTMP"))),
    })
}

fn parse_spectral(text: &str) -> Result<SpectralRecord, FetchError> {
    let table = RecordTable::parse(text)?;

    let wave_height_feet = match table.value("WVHT")? {
        Some(v) => Some(length_to_feet(v, table.unit("WVHT"))),
        None => table
            .value("SwH")?
            .map(|v| length_to_feet(v, table.unit("SwH"))),
    };
    let wave_period_seconds = match table.value("SwP")? {
        Some(v) => Some(v),
        None => table.value("APD")?,
    };

    Ok(SpectralRecord {
        wave_height_feet,
        wave_period_seconds,
    })
}
