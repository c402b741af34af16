use chrono::{Duration, NaiveDate, NaiveTime};

use shared_models::schedule::{DateOverride, DaySchedule, OverrideKind, WeeklyRule};

/// Schedule in force on `date`. A date override replaces the weekly rule
/// wholesale; a holiday means no schedule at all.
pub fn effective_schedule(
    rules: &[WeeklyRule],
    date_override: Option<&DateOverride>,
    date: NaiveDate,
    default_capacity: u32,
) -> Option<DaySchedule> {
    if let Some(date_override) = date_override.filter(|o| o.date == date) {
        return match &date_override.kind {
            OverrideKind::Holiday => None,
            OverrideKind::Extended {
                start_time,
                end_time,
                slot_minutes,
                capacity,
            } => Some(DaySchedule {
                start_time: *start_time,
                end_time: *end_time,
                slot_minutes: *slot_minutes,
                capacity: *capacity,
            }),
        };
    }

    rules
        .iter()
        .find(|rule| rule.enabled && rule.applies_to(date))
        .map(|rule| DaySchedule {
            start_time: rule.start_time,
            end_time: rule.end_time,
            slot_minutes: rule.slot_minutes,
            capacity: rule.capacity.unwrap_or(default_capacity),
        })
}

/// Slot start times, walking start→end in granularity steps. A slot must
/// end by the schedule's end time.
pub fn slot_times(schedule: &DaySchedule) -> Vec<NaiveTime> {
    let mut times = Vec::new();
    if schedule.slot_minutes == 0 || schedule.capacity == 0 {
        return times;
    }

    let step = Duration::minutes(schedule.slot_minutes as i64);
    let mut current = schedule.start_time;

    loop {
        let (slot_end, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || slot_end > schedule.end_time {
            break;
        }
        times.push(current);
        current = slot_end;
    }

    times
}
