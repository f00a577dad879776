//! End-to-end session flow against an in-memory backend.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use sprintraffle_core::error::Result;
use sprintraffle_core::{
    Ad, AdViewError, AdViewRequest, AdViewResponse, Config, CoreError, Event, FixedClock, Phase,
    RaffleApi, RaffleSession, Sprint, SprintStatus, TicketSnapshot,
};

/// Backend that credits one ticket per unique request id, like the server.
struct Backend {
    sprint: Mutex<Option<Sprint>>,
    tickets: Mutex<u64>,
    seen: Mutex<Vec<Uuid>>,
    ad_calls: AtomicUsize,
}

impl Backend {
    fn with(sprint: Sprint) -> Self {
        Self {
            sprint: Mutex::new(Some(sprint)),
            tickets: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
            ad_calls: AtomicUsize::new(0),
        }
    }
}

impl RaffleApi for Backend {
    async fn current_sprint(&self) -> Result<Option<Sprint>> {
        Ok(self.sprint.lock().unwrap().clone())
    }

    async fn next_sprint(&self) -> Result<Option<Sprint>> {
        Ok(None)
    }

    async fn my_tickets(&self) -> Result<TicketSnapshot> {
        Ok(TicketSnapshot {
            ticket_count: *self.tickets.lock().unwrap(),
            multiplier: 1.0,
            ad_views: self.seen.lock().unwrap().len() as u64,
        })
    }

    async fn record_ad_view(&self, request: &AdViewRequest) -> Result<AdViewResponse> {
        self.ad_calls.fetch_add(1, Ordering::SeqCst);
        let mut seen = self.seen.lock().unwrap();
        let fresh = !seen.contains(&request.request_id);
        if fresh {
            seen.push(request.request_id);
            *self.tickets.lock().unwrap() += 1;
        }
        Ok(AdViewResponse {
            success: true,
            raffle_ticket_earned: fresh,
            tickets_earned: u64::from(fresh),
            multiplier: 1.0,
            message: None,
        })
    }

    async fn active_ads(&self, _sprint_id: &str) -> Result<Vec<Ad>> {
        Ok(Vec::new())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }
}

fn now() -> DateTime<Utc> {
    "2026-10-15T17:00:01Z".parse().unwrap()
}

fn sprint(start: DateTime<Utc>, end: DateTime<Utc>) -> Sprint {
    serde_json::from_value(serde_json::json!({
        "id": "42",
        "dayOfWeek": 4,
        "startTime": "17:00",
        "endTime": "18:00",
        "duration": 60,
        "category": "Teknoloji",
        "status": "active",
        "startDate": start,
        "endDate": end,
        "totalViews": 0,
        "totalParticipants": 0
    }))
    .unwrap()
}

fn setup() -> (RaffleSession, Arc<FixedClock>, Backend) {
    let clock = Arc::new(FixedClock::new(now()));
    let session = RaffleSession::start(&Config::default(), clock.clone());
    let backend = Backend::with(sprint(
        now() - Duration::milliseconds(1000),
        now() + Duration::milliseconds(3_600_000),
    ));
    (session, clock, backend)
}

#[tokio::test]
async fn duplicate_completion_credits_exactly_one_ticket() {
    let (mut session, _, backend) = setup();
    session.refresh_sprints(&backend).await.unwrap();
    assert_eq!(session.snapshot().unwrap().phase, Phase::Active);

    let request_id = Uuid::new_v4();
    let events = session
        .record_ad_view(&backend, "ad-7", 15, Some(request_id))
        .await
        .unwrap();
    assert!(matches!(events[0], Event::TicketsIncremented { delta: 1, my_tickets: 1, .. }));

    let second = session
        .record_ad_view(&backend, "ad-7", 15, Some(request_id))
        .await
        .unwrap_err();
    assert!(matches!(
        second,
        CoreError::AdView(AdViewError::Duplicate { request_id: id }) if id == request_id
    ));
    assert_eq!(session.ledger().my_tickets(), 1);
    assert_eq!(backend.ad_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn authoritative_read_replaces_optimistic_count() {
    let (mut session, _, backend) = setup();
    session.refresh_sprints(&backend).await.unwrap();

    *backend.tickets.lock().unwrap() = 5;
    session.refresh_tickets(&backend).await.unwrap();
    assert_eq!(session.ledger().my_tickets(), 5);

    session.record_ad_view(&backend, "ad-1", 20, None).await.unwrap();
    assert_eq!(session.ledger().my_tickets(), 6);
    assert_eq!(session.ledger().pending(), 1);

    // Server corrects the count behind our back; its value wins.
    *backend.tickets.lock().unwrap() = 20;
    let events = session.refresh_tickets(&backend).await.unwrap();
    assert!(matches!(events[0], Event::TicketsConfirmed { tickets: 20, .. }));
    assert_eq!(session.ledger().my_tickets(), 20);
    assert_eq!(session.ledger().pending(), 0);
}

#[tokio::test]
async fn countdown_runs_out_and_blocks_ad_views() {
    let (mut session, clock, backend) = setup();
    session.refresh_sprints(&backend).await.unwrap();

    let snap = session.snapshot().unwrap();
    assert_eq!(snap.countdown, "1:00:00");

    clock.advance(Duration::hours(1));
    let events = session.tick();
    assert!(matches!(
        &events[0],
        Event::SprintStatusChanged { sprint_id, status: SprintStatus::Ended, .. } if sprint_id == "42"
    ));

    let err = session.record_ad_view(&backend, "ad-1", 20, None).await.unwrap_err();
    assert!(matches!(err, CoreError::AdView(AdViewError::SprintNotActive)));

    // The published schedule follows the locally ended sprint.
    let schedule = session.schedule().unwrap();
    assert!(!schedule.is_active);
    assert_eq!(schedule.sprint.status, SprintStatus::Ended);

    // The next fetch overrides the local guess.
    backend.sprint.lock().unwrap().as_mut().unwrap().status = SprintStatus::Drawing;
    session.refresh_sprints(&backend).await.unwrap();
    assert_eq!(session.current_sprint().unwrap().status, SprintStatus::Drawing);
    assert_eq!(session.snapshot().unwrap().status, SprintStatus::Drawing);
}

#[tokio::test]
async fn invalid_sprint_from_server_reads_as_none() {
    let (mut session, _, backend) = setup();
    *backend.sprint.lock().unwrap() = Some(sprint(now(), now()));
    let events = session.refresh_sprints(&backend).await.unwrap();
    assert!(matches!(events[0], Event::SprintFetched { sprint_id: None, .. }));
    assert!(session.current_sprint().is_none());
}

#[tokio::test]
async fn readers_keep_their_snapshot_across_updates() {
    let (mut session, clock, backend) = setup();
    session.refresh_sprints(&backend).await.unwrap();
    let held = session.current_sprint().unwrap();

    clock.advance(Duration::hours(2));
    session.tick();

    assert_eq!(held.status, SprintStatus::Active);
    assert_eq!(session.current_sprint().unwrap().status, SprintStatus::Ended);
    assert_eq!(held.id, session.current_sprint().unwrap().id);
}

#[tokio::test(start_paused = true)]
async fn ticker_stops_with_its_view() {
    let (session, _, _) = setup();
    let mut ticker = session.ticker();
    assert_eq!(ticker.tick().await, Some(1));
    assert_eq!(ticker.tick().await, Some(2));
    assert!(ticker.is_running());
    ticker.stop().await;
}
