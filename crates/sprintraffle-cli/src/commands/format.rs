use chrono::{DateTime, Duration, Utc};
use sprintraffle_core::sprint::{
    announcement_time, countdown_label, day_name, derive_phase, display_status, format_countdown,
};
use sprintraffle_core::{Config, Locale, Phase, Sprint, SprintStatus};

use super::CliResult;

pub fn countdown(ms: i64) -> CliResult {
    println!("{}", format_countdown(ms));
    Ok(())
}

pub fn day(index: i32, locale: Option<Locale>) -> CliResult {
    let locale = locale.unwrap_or_else(|| Config::load_or_default().ui.locale);
    println!("{}", day_name(index, locale));
    Ok(())
}

pub fn status_label(status: SprintStatus) -> &'static str {
    match status {
        SprintStatus::Upcoming => "upcoming",
        SprintStatus::Active => "active",
        SprintStatus::Ended => "ended",
        SprintStatus::Drawing => "drawing",
        SprintStatus::Completed => "completed",
    }
}

/// Multi-line human summary of a sprint at `now`. Ended sprints whose
/// raffle is not completed also show when winners are announced.
pub fn sprint_summary(
    sprint: &Sprint,
    now: DateTime<Utc>,
    locale: Locale,
    announcement_delay: Duration,
) -> String {
    let day = match day_name(sprint.day_of_week, locale) {
        "" => "?",
        name => name,
    };
    let category = sprint
        .category
        .as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default();
    let status = display_status(sprint, now);
    let mut text = format!(
        "Sprint {} ({day} {}){category}\nStatus: {}  Remaining: {}\nViews: {}  Participants: {}",
        sprint.id,
        sprint.schedule_label(),
        status_label(status),
        countdown_label(sprint, now),
        sprint.total_views,
        sprint.total_participants,
    );
    if derive_phase(sprint, now) == Phase::Ended && status != SprintStatus::Completed {
        let at = announcement_time(sprint, announcement_delay);
        text.push_str(&format!("\nWinners announced: {} UTC", at.format("%Y-%m-%d %H:%M")));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprint(now: DateTime<Utc>) -> Sprint {
        serde_json::from_value(serde_json::json!({
            "id": "3",
            "dayOfWeek": 2,
            "startTime": "09:00",
            "endTime": "10:00",
            "status": "active",
            "startDate": now - chrono::Duration::minutes(10),
            "endDate": now + chrono::Duration::minutes(5) + chrono::Duration::seconds(30),
            "totalViews": 12,
            "totalParticipants": 4
        }))
        .unwrap()
    }

    #[test]
    fn summary_shows_day_window_and_countdown() {
        let now = Utc::now();
        let text = sprint_summary(&sprint(now), now, Locale::En, Duration::minutes(15));
        assert!(text.starts_with("Sprint 3 (Tuesday 09:00 - 10:00)"));
        assert!(text.contains("Status: active  Remaining: 5:30"));
        assert!(text.contains("Views: 12  Participants: 4"));
    }

    #[test]
    fn summary_marks_unknown_day() {
        let now = Utc::now();
        let mut s = sprint(now);
        s.day_of_week = 9;
        s.category = Some("Spor".into());
        let text = sprint_summary(&s, now, Locale::Tr, Duration::minutes(15));
        assert!(text.starts_with("Sprint 3 (? 09:00 - 10:00) [Spor]"));
    }

    #[test]
    fn ended_summary_shows_announcement_time() {
        let now: DateTime<Utc> = "2026-10-15T18:10:00Z".parse().unwrap();
        let mut s = sprint(now);
        s.start_date = "2026-10-15T17:00:00Z".parse().unwrap();
        s.end_date = "2026-10-15T18:00:00Z".parse().unwrap();

        let text = sprint_summary(&s, now, Locale::En, Duration::minutes(15));
        assert!(text.contains("Status: ended  Remaining: --:--"));
        assert!(text.ends_with("Winners announced: 2026-10-15 18:15 UTC"));

        let done = s.with_status(SprintStatus::Completed);
        let text = sprint_summary(&done, now, Locale::En, Duration::minutes(15));
        assert!(!text.contains("Winners announced"));

        let running = sprint(now);
        assert!(!sprint_summary(&running, now, Locale::En, Duration::minutes(15)).contains("Winners"));
    }
}
