use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fetcher::BuoyReading;

/// Overall trip hazard level, totally ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardLevel {
    Safe,
    Caution,
    Warning,
    Danger,
}

impl HazardLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardLevel::Safe => "safe",
            HazardLevel::Caution => "caution",
            HazardLevel::Warning => "warning",
            HazardLevel::Danger => "danger",
        }
    }

    /// Uppercase form used in email subjects.
    pub fn headline(&self) -> &'static str {
        match self {
            HazardLevel::Safe => "SAFE",
            HazardLevel::Caution => "CAUTION",
            HazardLevel::Warning => "WARNING",
            HazardLevel::Danger => "DANGER",
        }
    }
}

impl fmt::Display for HazardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Wind,
    Wave,
    Visibility,
}

/// One threshold breach, with a customer-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredCondition {
    pub condition: ConditionType,
    pub severity: HazardLevel,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HazardAssessment {
    pub level: HazardLevel,
    pub triggered_conditions: Vec<TriggeredCondition>,
    pub recommendations: Vec<String>,
    pub summary: String,
}

/// Threshold configuration, injectable so tests and future regions can run
/// with alternate values. Units match `BuoyReading` (knots, feet, nm).
///
/// The canonical wind pair is 15 kt warning / 25 kt danger.
#[derive(Debug, Clone)]
pub struct HazardThresholds {
    pub warning_wind_knots: f64,
    pub danger_wind_knots: f64,
    pub warning_wave_feet: f64,
    pub danger_wave_feet: f64,
    pub caution_visibility_nm: f64,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            warning_wind_knots: 15.0,
            danger_wind_knots: 25.0,
            warning_wave_feet: 4.0,
            danger_wave_feet: 6.0,
            caution_visibility_nm: 2.0,
        }
    }
}

/// Classify one reading against the thresholds. Pure and deterministic:
/// no I/O, no clock, no randomness.
///
/// A degraded reading always classifies safe. The check is explicit rather
/// than relying on the substituted defaults staying below every threshold.
pub fn classify(reading: &BuoyReading, thresholds: &HazardThresholds) -> HazardAssessment {
    if reading.degraded {
        return HazardAssessment {
            level: HazardLevel::Safe,
            triggered_conditions: Vec::new(),
            recommendations: vec![
                "Live buoy data was unavailable for this check; conditions will be re-checked before your trip.".to_string(),
            ],
            summary: "Buoy telemetry unavailable, no hazards on record.".to_string(),
        };
    }

    let mut triggered = Vec::new();

    // Evaluation order is fixed: wind, then wave, then visibility.
    if let Some(severity) = wind_severity(reading, thresholds) {
        triggered.push(TriggeredCondition {
            condition: ConditionType::Wind,
            severity,
            message: format!(
                "Sustained winds of {:.0} kt (gusting {:.0} kt) exceed the {} threshold of {:.0} kt",
                reading.wind_speed_knots,
                reading.wind_gust_knots,
                severity,
                match severity {
                    HazardLevel::Danger => thresholds.danger_wind_knots,
                    _ => thresholds.warning_wind_knots,
                }
            ),
        });
    }

    if let Some(severity) = wave_severity(reading, thresholds) {
        triggered.push(TriggeredCondition {
            condition: ConditionType::Wave,
            severity,
            message: format!(
                "Seas of {:.1} ft at {:.0} s exceed the {} threshold of {:.0} ft",
                reading.wave_height_feet,
                reading.wave_period_seconds,
                severity,
                match severity {
                    HazardLevel::Danger => thresholds.danger_wave_feet,
                    _ => thresholds.warning_wave_feet,
                }
            ),
        });
    }

    if reading.visibility_nm < thresholds.caution_visibility_nm {
        triggered.push(TriggeredCondition {
            condition: ConditionType::Visibility,
            severity: HazardLevel::Caution,
            message: format!(
                "Visibility reduced to {:.1} nm, below the {:.0} nm comfort threshold",
                reading.visibility_nm, thresholds.caution_visibility_nm
            ),
        });
    }

    let level = triggered
        .iter()
        .map(|c| c.severity)
        .max()
        .unwrap_or(HazardLevel::Safe);

    let recommendations = build_recommendations(level, &triggered);
    let summary = build_summary(level, &triggered);

    HazardAssessment {
        level,
        triggered_conditions: triggered,
        recommendations,
        summary,
    }
}

fn wind_severity(reading: &BuoyReading, thresholds: &HazardThresholds) -> Option<HazardLevel> {
    if reading.wind_speed_knots >= thresholds.danger_wind_knots {
        Some(HazardLevel::Danger)
    } else if reading.wind_speed_knots >= thresholds.warning_wind_knots {
        Some(HazardLevel::Warning)
    } else {
        None
    }
}

fn wave_severity(reading: &BuoyReading, thresholds: &HazardThresholds) -> Option<HazardLevel> {
    if reading.wave_height_feet >= thresholds.danger_wave_feet {
        Some(HazardLevel::Danger)
    } else if reading.wave_height_feet >= thresholds.warning_wave_feet {
        Some(HazardLevel::Warning)
    } else {
        None
    }
}

fn build_recommendations(level: HazardLevel, triggered: &[TriggeredCondition]) -> Vec<String> {
    let mut recommendations: Vec<String> = match level {
        HazardLevel::Danger => vec![
            "We strongly recommend cancelling or rescheduling this trip.".to_string(),
            "Contact your captain to discuss alternate dates at no charge.".to_string(),
        ],
        HazardLevel::Warning => vec![
            "Conditions are rough; confirm with your captain before departing.".to_string(),
            "Secure loose gear and expect significant boat motion.".to_string(),
        ],
        HazardLevel::Caution => vec![
            "Conditions may be uncomfortable for passengers prone to seasickness.".to_string(),
            "Consider taking motion-sickness medication an hour before departure.".to_string(),
        ],
        HazardLevel::Safe => vec![
            "Conditions look great for your trip. Have a wonderful time on the water!".to_string(),
        ],
    };

    let at_danger = |condition: ConditionType| {
        triggered
            .iter()
            .any(|c| c.condition == condition && c.severity == HazardLevel::Danger)
    };
    if at_danger(ConditionType::Wind) && at_danger(ConditionType::Wave) {
        recommendations
            .push("A small craft advisory is likely in effect for this area.".to_string());
    }

    recommendations
}

fn build_summary(level: HazardLevel, triggered: &[TriggeredCondition]) -> String {
    match level {
        HazardLevel::Safe => "Marine conditions are within safe limits for your trip.".to_string(),
        _ => format!(
            "Marine conditions are at {} level with {} flagged condition{}.",
            level,
            triggered.len(),
            if triggered.len() == 1 { "" } else { "s" }
        ),
    }
}
