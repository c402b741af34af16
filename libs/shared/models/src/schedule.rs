// libs/shared/models/src/schedule.rs
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Recurring weekly availability for one doctor and weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyRule {
    pub doctor_id: String,
    /// 0 (Sunday) through 6 (Saturday).
    pub day_of_week: u8,
    pub enabled: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: u32,
    /// Falls back to the configured default slot capacity when absent.
    pub capacity: Option<u32>,
}

impl WeeklyRule {
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.day_of_week as u32 == date.weekday().num_days_from_sunday()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "override_type", rename_all = "snake_case")]
pub enum OverrideKind {
    /// No slots at all on this date.
    Holiday,
    /// Replaces the weekly rule wholesale for this date.
    Extended {
        start_time: NaiveTime,
        end_time: NaiveTime,
        slot_minutes: u32,
        capacity: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateOverride {
    pub doctor_id: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: OverrideKind,
}

/// The schedule actually in force for one doctor on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySchedule {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: u32,
    pub capacity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_override_rows_are_flat() {
        let row = json!({
            "doctor_id": "d1",
            "date": "2026-05-03",
            "override_type": "extended",
            "start_time": "09:00:00",
            "end_time": "12:00:00",
            "slot_minutes": 15,
            "capacity": 3
        });
        let parsed: DateOverride = serde_json::from_value(row).unwrap();
        assert!(matches!(parsed.kind, OverrideKind::Extended { capacity: 3, .. }));

        let holiday: DateOverride = serde_json::from_value(json!({
            "doctor_id": "d1",
            "date": "2026-05-04",
            "override_type": "holiday"
        }))
        .unwrap();
        assert_eq!(holiday.kind, OverrideKind::Holiday);
    }

    #[test]
    fn test_weekly_rule_matches_weekday_from_sunday() {
        let rule = WeeklyRule {
            doctor_id: "d1".into(),
            day_of_week: 5,
            enabled: true,
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            slot_minutes: 30,
            capacity: None,
        };
        // 2026-05-01 is a Friday
        assert!(rule.applies_to(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()));
        assert!(!rule.applies_to(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()));
    }
}
