//! Planning and auto-sending of celebratory messages.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::contact::{Contact, EventKind};
use crate::store::{Record, Repository, StoreError};
use crate::templates::{MessageTemplate, pick_template};

mod dispatch;

pub use dispatch::*;

const SCHEDULE_FILE: &str = "scheduled.json";

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Webhook rejected message: status {status}, response: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: Uuid,
    pub contact_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The contact's original event date
    pub date: String,
    pub scheduled_at: NaiveDateTime,
    pub status: MessageStatus,
    pub message: String,
}

impl ScheduledMessage {
    pub fn new(
        contact_name: &str,
        email: &str,
        kind: EventKind,
        date: &str,
        scheduled_at: NaiveDateTime,
        message: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_name: contact_name.to_string(),
            email: email.to_string(),
            kind,
            date: date.to_string(),
            scheduled_at,
            status: MessageStatus::Pending,
            message: message.to_string(),
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.status == MessageStatus::Pending && now >= self.scheduled_at
    }

    fn same_slot(&self, other: &ScheduledMessage) -> bool {
        self.email == other.email
            && self.kind == other.kind
            && self.scheduled_at == other.scheduled_at
    }
}

impl Record for ScheduledMessage {
    fn id(&self) -> Uuid {
        self.id
    }

    fn filename() -> &'static str {
        SCHEDULE_FILE
    }
}

fn occurrence_in(year: i32, event: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, event.month(), event.day())
        // Feb 29 outside leap years
        .or_else(|| NaiveDate::from_ymd_opt(year, event.month(), event.day() - 1))
}

/// The next yearly recurrence of `event` on or after `today`
pub fn next_occurrence(event: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = occurrence_in(today.year(), event)?;
    if this_year >= today {
        Some(this_year)
    } else {
        occurrence_in(today.year() + 1, event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingEvent {
    pub name: String,
    pub kind: EventKind,
    pub date: NaiveDate,
    pub days_left: i64,
}

/// Celebrations falling within `days` of `today` (inclusive), soonest first
pub fn upcoming_events(contacts: &[Contact], today: NaiveDate, days: u32) -> Vec<UpcomingEvent> {
    let mut events: Vec<UpcomingEvent> = contacts
        .iter()
        .filter_map(|contact| {
            let next = next_occurrence(contact.event_date().ok()?, today)?;
            let days_left = (next - today).num_days();
            (days_left <= i64::from(days)).then(|| UpcomingEvent {
                name: contact.name.clone(),
                kind: contact.kind,
                date: next,
                days_left,
            })
        })
        .collect();
    events.sort_by_key(|event| event.days_left);
    events
}

/// Build one pending message per contact for its next celebration.
///
/// Contacts whose date does not parse, or whose kind has no active
/// template, are left out with a warning.
pub fn plan_messages(
    contacts: &[Contact],
    templates: &[MessageTemplate],
    today: NaiveDate,
    send_time: NaiveTime,
) -> Vec<ScheduledMessage> {
    let mut planned = Vec::new();
    for contact in contacts {
        let event_date = match contact.event_date() {
            Ok(date) => date,
            Err(e) => {
                warn!("Not scheduling {}: {}", contact.name, e);
                continue;
            }
        };
        let Some(template) = pick_template(templates, contact.kind) else {
            warn!("No active {} template, not scheduling {}", contact.kind, contact.name);
            continue;
        };
        let Some(next) = next_occurrence(event_date, today) else {
            warn!("No upcoming date for {} ({})", contact.name, contact.date);
            continue;
        };

        planned.push(ScheduledMessage::new(
            &contact.name,
            &contact.email,
            contact.kind,
            &contact.date,
            next.and_time(send_time),
            &template.render(&contact.name),
        ));
    }
    debug!("Planned {} message(s) for {} contact(s)", planned.len(), contacts.len());
    planned
}

/// Add planned messages that are not already scheduled; returns how many were added
pub fn merge_plan(existing: &mut Vec<ScheduledMessage>, planned: Vec<ScheduledMessage>) -> usize {
    let before = existing.len();
    for message in planned {
        if !existing.iter().any(|m| m.same_slot(&message)) {
            existing.push(message);
        }
    }
    existing.len() - before
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub sent: usize,
    pub failed: usize,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.sent + self.failed > 0
    }
}

/// Cooperative auto-send loop with a shared on/off switch
#[derive(Debug, Clone)]
pub struct AutoSender {
    enabled: Arc<AtomicBool>,
}

impl AutoSender {
    pub fn new(enabled: bool) -> Self {
        Self { enabled: Arc::new(AtomicBool::new(enabled)) }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::SeqCst) == enabled {
            return;
        }
        if enabled {
            info!("Auto-send enabled: emails will now be sent automatically");
        } else {
            info!("Auto-send disabled: automatic email sending has been turned off");
        }
    }

    /// Deliver every due pending message.
    ///
    /// Delivered messages become `Sent`, dispatch errors mark them `Failed`.
    /// Messages that are not pending are never touched, so repeating a tick
    /// with the same clock changes nothing.
    pub async fn tick<D: Dispatcher + ?Sized>(
        &self,
        messages: &mut [ScheduledMessage],
        now: NaiveDateTime,
        dispatcher: &D,
    ) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_enabled() {
            return report;
        }

        for message in messages.iter_mut().filter(|m| m.is_due(now)) {
            match dispatcher.deliver(message).await {
                Ok(()) => {
                    message.status = MessageStatus::Sent;
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to send {} message to {}: {}",
                        message.kind, message.contact_name, e
                    );
                    message.status = MessageStatus::Failed;
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Load, tick and store the schedule once.
    ///
    /// Only the status of the messages sent in this tick is written back, on
    /// top of a fresh read, so messages planned while a delivery was in
    /// flight are kept.
    pub async fn tick_repository<R, D>(
        &self,
        repo: &mut R,
        now: NaiveDateTime,
        dispatcher: &D,
    ) -> Result<TickReport, SchedulerError>
    where
        R: Repository<ScheduledMessage>,
        D: Dispatcher + ?Sized,
    {
        let mut messages = repo.list()?;
        let due: HashSet<Uuid> = messages.iter().filter(|m| m.is_due(now)).map(|m| m.id).collect();
        let report = self.tick(&mut messages, now, dispatcher).await;
        if !report.changed() {
            return Ok(report);
        }

        let outcomes: HashMap<Uuid, MessageStatus> = messages
            .into_iter()
            .filter(|m| due.contains(&m.id) && m.status != MessageStatus::Pending)
            .map(|m| (m.id, m.status))
            .collect();
        let mut latest = repo.list()?;
        for message in latest.iter_mut() {
            if let Some(status) = outcomes.get(&message.id) {
                message.status = *status;
            }
        }
        repo.replace_all(latest)?;
        Ok(report)
    }

    /// Poll the schedule every `poll_interval` until `shutdown` turns true
    /// or its sender is dropped.
    pub async fn run<R, D, F>(
        &self,
        repo: &mut R,
        dispatcher: &D,
        poll_interval: Duration,
        clock: F,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SchedulerError>
    where
        R: Repository<ScheduledMessage>,
        D: Dispatcher + ?Sized,
        F: Fn() -> NaiveDateTime,
    {
        let mut ticker = tokio::time::interval(poll_interval);
        info!("Auto-send loop started, checking every {:?}", poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_enabled() {
                        continue;
                    }
                    let report = self.tick_repository(repo, clock(), dispatcher).await?;
                    if report.changed() {
                        info!("Auto-send: {} sent, {} failed", report.sent, report.failed);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Auto-send loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::sample_contacts;
    use crate::store::{FileRepository, MemoryRepository, StateManager};
    use crate::templates::default_templates;
    use async_trait::async_trait;
    use tempfile::tempdir;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[derive(Default)]
    struct Recording {
        delivered: Mutex<Vec<String>>,
        fail_for: Option<&'static str>,
    }

    #[async_trait]
    impl Dispatcher for Recording {
        async fn deliver(&self, message: &ScheduledMessage) -> Result<(), SchedulerError> {
            if self.fail_for == Some(message.contact_name.as_str()) {
                return Err(SchedulerError::Rejected { status: 500, body: "boom".to_string() });
            }
            self.delivered.lock().unwrap().push(message.contact_name.clone());
            Ok(())
        }
    }

    fn pending(name: &str, when: NaiveDateTime) -> ScheduledMessage {
        ScheduledMessage::new(name, "x@y.z", EventKind::Birthday, "1990-01-01", when, "Hi")
    }

    #[test_case(date(1990, 6, 15), date(2024, 6, 1), date(2024, 6, 15) ; "later this year")]
    #[test_case(date(1990, 6, 15), date(2024, 6, 15), date(2024, 6, 15) ; "today")]
    #[test_case(date(1990, 6, 15), date(2024, 7, 1), date(2025, 6, 15) ; "already passed")]
    #[test_case(date(2000, 2, 29), date(2023, 1, 1), date(2023, 2, 28) ; "leap day in common year")]
    #[test_case(date(2000, 2, 29), date(2024, 1, 1), date(2024, 2, 29) ; "leap day in leap year")]
    fn test_next_occurrence(event: NaiveDate, today: NaiveDate, expected: NaiveDate) {
        assert_eq!(next_occurrence(event, today), Some(expected));
    }

    #[test]
    fn test_upcoming_events_within_window() {
        let today = date(2024, 6, 11);
        let summary = |days| -> Vec<(String, i64)> {
            upcoming_events(&sample_contacts(), today, days)
                .into_iter()
                .map(|e| (e.name, e.days_left))
                .collect()
        };

        assert_eq!(
            summary(30),
            vec![
                ("Sarah Johnson".to_string(), 4),
                ("Mike & Emma".to_string(), 7),
                ("David Chen".to_string(), 11),
            ]
        );
        assert_eq!(summary(7).len(), 2);
        assert!(summary(3).is_empty());
    }

    #[test]
    fn test_upcoming_skips_bad_dates_and_wraps_year() {
        let contacts = vec![
            Contact::new("New Year", "ny@x.com", "", EventKind::Birthday, "1980-01-02"),
            Contact::new("Unknown", "u@x.com", "", EventKind::Birthday, "soon"),
        ];
        let events = upcoming_events(&contacts, date(2024, 12, 31), 30);
        assert_eq!(
            events,
            vec![UpcomingEvent {
                name: "New Year".to_string(),
                kind: EventKind::Birthday,
                date: date(2025, 1, 2),
                days_left: 2,
            }]
        );
    }

    #[test]
    fn test_plan_messages() {
        let mut contacts = sample_contacts();
        contacts.push(Contact::new("No Date", "n@d.x", "", EventKind::Birthday, "someday"));
        let send_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let planned = plan_messages(&contacts, &default_templates(), date(2024, 6, 16), send_time);
        let summary: Vec<(&str, NaiveDateTime)> =
            planned.iter().map(|m| (m.contact_name.as_str(), m.scheduled_at)).collect();
        assert_eq!(
            summary,
            vec![
                ("Sarah Johnson", at(2025, 6, 15, 9)),
                ("Mike & Emma", at(2024, 6, 18, 9)),
                ("David Chen", at(2024, 6, 22, 9)),
            ]
        );
        assert!(planned[1].message.starts_with("Happy Anniversary Mike & Emma!"));
        assert!(planned.iter().all(|m| m.status == MessageStatus::Pending));
    }

    #[test]
    fn test_plan_without_template() {
        let templates: Vec<_> =
            default_templates().into_iter().filter(|t| t.kind == EventKind::Birthday).collect();
        let send_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let planned = plan_messages(&sample_contacts(), &templates, date(2024, 1, 1), send_time);
        assert!(planned.iter().all(|m| m.kind == EventKind::Birthday));
        assert_eq!(planned.len(), 2);
    }

    #[test]
    fn test_merge_plan_skips_existing_slots() {
        let mut existing = vec![pending("Ann", at(2024, 6, 15, 9))];
        let added = merge_plan(
            &mut existing,
            vec![pending("Ann", at(2024, 6, 15, 9)), pending("Ann", at(2025, 6, 15, 9))],
        );
        assert_eq!(added, 1);
        assert_eq!(existing.len(), 2);
    }

    #[tokio::test]
    async fn test_tick_sends_due_pending_only() {
        let mut messages = vec![
            pending("Due", at(2024, 6, 15, 9)),
            pending("Later", at(2024, 6, 20, 9)),
            pending("Done", at(2024, 6, 1, 9)),
        ];
        messages[2].status = MessageStatus::Sent;

        let sender = AutoSender::new(true);
        let dispatcher = Recording::default();
        let now = at(2024, 6, 15, 10);

        let report = sender.tick(&mut messages, now, &dispatcher).await;
        assert_eq!(report, TickReport { sent: 1, failed: 0 });
        assert_eq!(messages[0].status, MessageStatus::Sent);
        assert_eq!(messages[1].status, MessageStatus::Pending);

        // Same clock again: nothing left to do
        let report = sender.tick(&mut messages, now, &dispatcher).await;
        assert_eq!(report, TickReport::default());
        assert_eq!(*dispatcher.delivered.lock().unwrap(), vec!["Due".to_string()]);
    }

    #[tokio::test]
    async fn test_tick_marks_failures() {
        let nine = at(2024, 6, 15, 9);
        let mut messages = vec![pending("Bad", nine), pending("Good", nine)];
        let dispatcher = Recording { fail_for: Some("Bad"), ..Default::default() };

        let report = AutoSender::new(true).tick(&mut messages, nine, &dispatcher).await;
        assert_eq!(report, TickReport { sent: 1, failed: 1 });
        assert_eq!(messages[0].status, MessageStatus::Failed);
        assert_eq!(messages[1].status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn test_disabled_sender_does_nothing() {
        let mut messages = vec![pending("Due", at(2024, 6, 15, 9))];
        let sender = AutoSender::new(true);
        let shared = sender.clone();
        shared.set_enabled(false);

        let report = sender.tick(&mut messages, at(2024, 7, 1, 0), &LogDispatcher).await;
        assert_eq!(report, TickReport::default());
        assert_eq!(messages[0].status, MessageStatus::Pending);
    }

    #[tokio::test]
    async fn test_tick_repository_persists_changes() {
        let mut repo = MemoryRepository::new(vec![pending("Due", at(2024, 6, 15, 9))]);
        let report = AutoSender::new(true)
            .tick_repository(&mut repo, at(2024, 6, 15, 9), &LogDispatcher)
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(repo.list().unwrap()[0].status, MessageStatus::Sent);
    }

    /// Plans a new message through a second handle while a send is in flight
    struct PlansDuringSend {
        other: Mutex<FileRepository>,
        planned: ScheduledMessage,
    }

    #[async_trait]
    impl Dispatcher for PlansDuringSend {
        async fn deliver(&self, _message: &ScheduledMessage) -> Result<(), SchedulerError> {
            let mut other = self.other.lock().unwrap();
            Repository::<ScheduledMessage>::add(&mut *other, self.planned.clone())?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_tick_repository_keeps_messages_planned_during_send() {
        let dir = tempdir().unwrap();
        let mut repo = FileRepository::new(StateManager::new(dir.path()).unwrap());
        Repository::<ScheduledMessage>::add(&mut repo, pending("Due", at(2024, 6, 15, 9))).unwrap();

        let dispatcher = PlansDuringSend {
            other: Mutex::new(FileRepository::new(StateManager::new(dir.path()).unwrap())),
            planned: pending("Later", at(2024, 7, 1, 9)),
        };
        let report = AutoSender::new(true)
            .tick_repository(&mut repo, at(2024, 6, 15, 10), &dispatcher)
            .await
            .unwrap();
        assert_eq!(report.sent, 1);

        let after: Vec<(String, MessageStatus)> = Repository::<ScheduledMessage>::list(&repo)
            .unwrap()
            .into_iter()
            .map(|m| (m.contact_name, m.status))
            .collect();
        assert_eq!(
            after,
            vec![
                ("Due".to_string(), MessageStatus::Sent),
                ("Later".to_string(), MessageStatus::Pending),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let mut repo = MemoryRepository::new(vec![pending("Due", at(2024, 6, 15, 9))]);
        let (tx, rx) = watch::channel(false);
        let sender = AutoSender::new(true);

        let stopper = async {
            tokio::time::sleep(Duration::from_secs(25)).await;
            tx.send(true).unwrap();
        };
        let runner = sender.run(
            &mut repo,
            &LogDispatcher,
            Duration::from_secs(10),
            || at(2024, 6, 15, 12),
            rx,
        );
        let (result, ()) = tokio::join!(runner, stopper);
        result.unwrap();

        assert_eq!(repo.list().unwrap()[0].status, MessageStatus::Sent);
    }
}
