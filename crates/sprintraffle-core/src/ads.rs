//! Ads, ad-view requests/responses, and the pre-flight rules for counting a view.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::AdViewError;
use crate::sprint::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Sponsor,
    Admob,
    Banner,
    Cover,
    Network,
}

impl AdType {
    /// Whether this ad is played as a video (and can earn tickets).
    pub fn is_video(self) -> bool {
        matches!(self, AdType::Sponsor | AdType::Admob | AdType::Network)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    pub advertiser_id: String,
    #[serde(rename = "type")]
    pub ad_type: AdType,
    pub title: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: u64,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub impression_count: u64,
    #[serde(default)]
    pub click_count: u64,
}

impl Ad {
    pub fn is_playable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.ad_type.is_video()
            && self.video_url.is_some()
            && self.start_date <= now
            && now < self.end_date
    }
}

/// Choose the next ad to play uniformly among the playable ones.
pub fn pick_next_ad<'a, R: Rng>(ads: &'a [Ad], now: DateTime<Utc>, rng: &mut R) -> Option<&'a Ad> {
    let playable: Vec<&Ad> = ads.iter().filter(|ad| ad.is_playable(now)).collect();
    if playable.is_empty() {
        return None;
    }
    Some(playable[rng.gen_range(0..playable.len())])
}

/// Body of `POST /ads/view`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdViewRequest {
    pub request_id: Uuid,
    pub sprint_id: String,
    pub ad_id: String,
    #[serde(rename = "viewDuration")]
    pub view_duration_secs: u64,
}

impl AdViewRequest {
    pub fn new(sprint_id: impl Into<String>, ad_id: impl Into<String>, view_duration_secs: u64) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            sprint_id: sprint_id.into(),
            ad_id: ad_id.into(),
            view_duration_secs,
        }
    }
}

fn default_multiplier() -> f64 {
    1.0
}

/// Server verdict on one ad view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdViewResponse {
    pub success: bool,
    pub raffle_ticket_earned: bool,
    #[serde(default)]
    pub tickets_earned: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// One completed or skipped playback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdViewEvent {
    pub request_id: Uuid,
    pub min_duration_met: bool,
    /// Multiplier in effect when the view was settled.
    pub multiplier: f64,
    /// Server verdict. `None` for a playback stopped before the minimum,
    /// which is never sent.
    pub response: Option<AdViewResponse>,
}

impl AdViewEvent {
    pub fn confirmed(request_id: Uuid, response: AdViewResponse) -> Self {
        Self {
            request_id,
            min_duration_met: true,
            multiplier: response.multiplier,
            response: Some(response),
        }
    }

    pub fn skipped(request_id: Uuid, multiplier: f64) -> Self {
        Self {
            request_id,
            min_duration_met: false,
            multiplier,
            response: None,
        }
    }

    /// The server accepted the view.
    pub fn counted(&self) -> bool {
        self.min_duration_met && self.response.as_ref().is_some_and(|r| r.success)
    }

    pub fn ticket_earned(&self) -> bool {
        self.counted() && self.response.as_ref().is_some_and(|r| r.raffle_ticket_earned)
    }

    pub fn tickets_earned(&self) -> u64 {
        match &self.response {
            Some(r) if self.ticket_earned() => r.tickets_earned,
            _ => 0,
        }
    }
}

/// Client-side limits checked before an ad view is sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdViewPolicy {
    pub min_view_duration_secs: u64,
    pub max_views_per_sprint: u32,
}

impl Default for AdViewPolicy {
    fn default() -> Self {
        Self {
            min_view_duration_secs: 15,
            max_views_per_sprint: 100,
        }
    }
}

impl AdViewPolicy {
    /// `phase` is the derived phase of the current sprint, `None` without one.
    pub fn check(
        &self,
        phase: Option<Phase>,
        view_duration_secs: u64,
        views_this_sprint: u32,
    ) -> Result<(), AdViewError> {
        if phase != Some(Phase::Active) {
            return Err(AdViewError::SprintNotActive);
        }
        if view_duration_secs < self.min_view_duration_secs {
            return Err(AdViewError::TooShort {
                watched_secs: view_duration_secs,
                min_secs: self.min_view_duration_secs,
            });
        }
        if views_this_sprint >= self.max_views_per_sprint {
            return Err(AdViewError::LimitReached {
                max: self.max_views_per_sprint,
            });
        }
        Ok(())
    }
}

/// Rejects a second completion for the same request id.
///
/// An id is "in flight" between [`begin`](Self::begin) and either
/// [`settle`](Self::settle) (server answered) or [`abandon`](Self::abandon)
/// (call failed). Settled ids stay rejected while their sprint is current.
#[derive(Debug, Default)]
pub struct AdViewGuard {
    in_flight: HashSet<Uuid>,
    /// Settled request id to the sprint it was recorded for.
    settled: HashMap<Uuid, String>,
}

impl AdViewGuard {
    pub fn begin(&mut self, request_id: Uuid) -> Result<(), AdViewError> {
        if self.settled.contains_key(&request_id) || !self.in_flight.insert(request_id) {
            tracing::warn!(%request_id, "duplicate ad view completion ignored");
            return Err(AdViewError::Duplicate { request_id });
        }
        Ok(())
    }

    pub fn settle(&mut self, request_id: Uuid, sprint_id: &str) {
        self.in_flight.remove(&request_id);
        self.settled.insert(request_id, sprint_id.to_string());
    }

    pub fn abandon(&mut self, request_id: Uuid) {
        self.in_flight.remove(&request_id);
    }

    /// Drop settled ids recorded for any sprint other than `current`.
    pub fn retain_sprint(&mut self, current: Option<&str>) {
        self.settled.retain(|_, sprint_id| Some(sprint_id.as_str()) == current);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn settled(&self) -> usize {
        self.settled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ad(id: &str, ad_type: AdType, video: bool) -> Ad {
        let now = Utc::now();
        Ad {
            id: id.into(),
            advertiser_id: "adv".into(),
            ad_type,
            title: format!("Ad {id}"),
            video_url: video.then(|| format!("https://cdn.example/{id}.mp4")),
            image_url: None,
            duration: 30,
            is_active: true,
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            impression_count: 0,
            click_count: 0,
        }
    }

    #[test]
    fn response_defaults() {
        let resp: AdViewResponse =
            serde_json::from_str(r#"{"success":true,"raffleTicketEarned":false}"#).unwrap();
        assert_eq!(resp.tickets_earned, 0);
        assert_eq!(resp.multiplier, 1.0);
        assert!(resp.message.is_none());
    }

    #[test]
    fn request_serializes_camel_case() {
        let req = AdViewRequest::new("s1", "a1", 20);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["sprintId"], "s1");
        assert_eq!(json["adId"], "a1");
        assert_eq!(json["viewDuration"], 20);
        assert!(json["requestId"].is_string());
    }

    #[test]
    fn policy_rules() {
        let policy = AdViewPolicy::default();
        assert_eq!(policy.check(None, 30, 0), Err(AdViewError::SprintNotActive));
        assert_eq!(policy.check(Some(Phase::Upcoming), 30, 0), Err(AdViewError::SprintNotActive));
        assert_eq!(
            policy.check(Some(Phase::Active), 14, 0),
            Err(AdViewError::TooShort { watched_secs: 14, min_secs: 15 })
        );
        assert_eq!(
            policy.check(Some(Phase::Active), 15, 100),
            Err(AdViewError::LimitReached { max: 100 })
        );
        assert_eq!(policy.check(Some(Phase::Active), 15, 99), Ok(()));
    }

    #[test]
    fn guard_rejects_second_completion() {
        let mut guard = AdViewGuard::default();
        let id = Uuid::new_v4();
        guard.begin(id).unwrap();
        assert_eq!(guard.begin(id), Err(AdViewError::Duplicate { request_id: id }));
        guard.settle(id, "1");
        assert_eq!(guard.begin(id), Err(AdViewError::Duplicate { request_id: id }));
        assert_eq!(guard.in_flight(), 0);
    }

    #[test]
    fn guard_forgets_ids_of_past_sprints() {
        let mut guard = AdViewGuard::default();
        let (old, current) = (Uuid::new_v4(), Uuid::new_v4());
        for (id, sprint) in [(old, "1"), (current, "2")] {
            guard.begin(id).unwrap();
            guard.settle(id, sprint);
        }
        guard.retain_sprint(Some("2"));
        assert_eq!(guard.settled(), 1);
        assert!(guard.begin(old).is_ok());
        assert_eq!(guard.begin(current), Err(AdViewError::Duplicate { request_id: current }));

        guard.retain_sprint(None);
        assert_eq!(guard.settled(), 0);
    }

    #[test]
    fn skipped_playback_earns_nothing() {
        let event = AdViewEvent::skipped(Uuid::new_v4(), 1.5);
        assert!(!event.min_duration_met);
        assert!(!event.counted());
        assert!(!event.ticket_earned());
        assert_eq!(event.tickets_earned(), 0);
        assert_eq!(event.multiplier, 1.5);
    }

    #[test]
    fn guard_allows_resubmit_after_failure() {
        let mut guard = AdViewGuard::default();
        let id = Uuid::new_v4();
        guard.begin(id).unwrap();
        guard.abandon(id);
        assert!(guard.begin(id).is_ok());
    }

    #[test]
    fn next_ad_only_picks_playable_videos() {
        let mut inactive = ad("3", AdType::Sponsor, true);
        inactive.is_active = false;
        let ads = vec![ad("1", AdType::Banner, false), ad("2", AdType::Admob, true), inactive];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(pick_next_ad(&ads, Utc::now(), &mut rng).unwrap().id, "2");
        }
        assert!(pick_next_ad(&ads[..1], Utc::now(), &mut rng).is_none());
    }
}
