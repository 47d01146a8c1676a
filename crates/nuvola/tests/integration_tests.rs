//! Integration tests for the nuvola crate
//!
//! These tests drive `SyncRoot` end to end against an in-memory remote:
//! login and credential renewal, windowed loading, snapshots and queries.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use nuvola::auth::{
    CredentialExchange, CredentialPrompt, CredentialTier, Exchange, Login, MemoryCredentialStore,
    SessionManager, SessionState,
};
use nuvola::query::{assignments_due_on, average, subject_by_name, unseen_events};
use nuvola::remote::{Credential, RemoteClient, Reply, Transport};
use nuvola::{
    AttachmentOwner, Clock, Error, FORMAT_VERSION, LoginCredentials, ResyncAnchor, Result,
    Settings, Snapshot, SyncRoot, WindowPolicy,
};
use serde_json::{Value, json};
use tempfile::TempDir;

const STUDENT: &str = "42";

/// 2020-08-31 plus `n` days
fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, 31).unwrap() + TimeDelta::days(n)
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn assignment(date: NaiveDate) -> Value {
    json!({
        "docente": "ROSSI MARIO",
        "materia": "MATEMATICA",
        "classe": "3A",
        "classeId": 7,
        "allegati": [],
        "dataAssegnazione": iso(date),
        "dataConsegna": iso(date + TimeDelta::days(3)),
        "descrizioneCompito": [format!("exercises for {}", date)]
    })
}

fn topic(date: NaiveDate, text: &str) -> Value {
    json!({
        "data": iso(date),
        "materia": "STORIA",
        "docente": "VERDI ANNA",
        "argomento": text
    })
}

fn mark(date: NaiveDate, value: &str, weight: &str) -> Value {
    json!({
        "data": iso(date),
        "docente": "ROSSI MARIO",
        "tipologia": "Scritto",
        "valutazione": value,
        "valutazioneMatematica": value,
        "faMedia": true,
        "peso": weight,
        "obiettivi": []
    })
}

#[derive(Default)]
struct RemoteState {
    valid_access: Option<String>,
    valid_sessions: Vec<String>,
    granted: usize,
    logins: usize,
    assignments: Vec<(NaiveDate, Value)>,
    topics: Vec<(NaiveDate, Value)>,
    /// Student-scoped call -> `valori`
    listed: HashMap<String, Value>,
    details: HashMap<i64, Value>,
    requests: Vec<String>,
}

/// In-memory Nuvola: data API, credential exchange and login in one
#[derive(Clone, Default)]
struct FakeRemote(Rc<RefCell<RemoteState>>);

impl FakeRemote {
    fn with_data() -> Self {
        let remote = Self::default();
        {
            let mut s = remote.0.borrow_mut();
            for d in (1..=5).chain(40..=45) {
                s.assignments.push((day(d), assignment(day(d))));
            }
            s.topics.push((day(7), topic(day(7), "Le guerre puniche")));
            s.topics.push((day(22), topic(day(22), "Giulio Cesare")));
            s.listed.insert(
                "eventi-classe".to_string(),
                json!([
                    {"id": 1, "tipo": "EVENTO", "nome": "Gita", "visto": false,
                     "dataInizio": iso(day(20)), "dataFine": iso(day(21))},
                    {"id": 2, "tipo": "VERIFICA", "nome": "Compito", "visto": true,
                     "dataInizio": iso(day(30)), "oraInizio": "09:00",
                     "dataFine": iso(day(30)), "oraFine": "10:00"}
                ]),
            );
            s.listed.insert(
                "assenze".to_string(),
                json!([{"id": 70, "tipo": "RITARDO", "data": iso(day(12)), "giustificata": false}]),
            );
            s.listed.insert(
                "frazioni-temporali".to_string(),
                json!([
                    {"id": 1, "nome": "PRIMO QUADRIMESTRE", "corrente": true},
                    {"id": 2, "nome": "INTERO ANNO", "corrente": false}
                ]),
            );
            for window in [1, 2] {
                s.listed.insert(
                    format!("frazione-temporale/{}/voti/materie", window),
                    json!([
                        {"id": 5, "materia": "MATEMATICA", "tipo": "N"},
                        {"id": 6, "materia": "STORIA", "tipo": "N"}
                    ]),
                );
                s.listed.insert(
                    format!("frazione-temporale/{}/voti/materia/5", window),
                    json!([{"voti": [mark(day(10), "6", "100%"), mark(day(25), "9", "50%")]}]),
                );
                s.listed.insert(format!("frazione-temporale/{}/voti/materia/6", window), json!([]));
            }
            s.details.insert(70, json!({"dettaglio": {"motivo": "treno in ritardo"}}));
        }
        remote
    }

    fn requests(&self) -> Vec<String> {
        self.0.borrow().requests.clone()
    }

    fn requests_for(&self, call: &str) -> usize {
        self.0.borrow().requests.iter().filter(|r| r.contains(call)).count()
    }

    fn logins(&self) -> usize {
        self.0.borrow().logins
    }

    fn accept_session(&self, session: &str) {
        self.0.borrow_mut().valid_sessions.push(session.to_string());
    }

    fn answer(state: &RemoteState, path: &str) -> Value {
        if let Some(id) = path.strip_prefix("/api-studente/v1/assenza/") {
            return id
                .parse::<i64>()
                .ok()
                .and_then(|id| state.details.get(&id).cloned())
                .unwrap_or_else(|| json!("Errore"));
        }
        let prefix = format!("/api-studente/v1/alunno/{}/", STUDENT);
        let Some(call) = path.strip_prefix(&prefix) else {
            return json!("Errore");
        };
        if let Some(values) = state.listed.get(call) {
            return json!({ "valori": values });
        }

        let mut parts = call.rsplit('/');
        let end = parts.next().and_then(|p| NaiveDate::parse_from_str(p, "%d-%m-%Y").ok());
        let start = parts.next().and_then(|p| NaiveDate::parse_from_str(p, "%d-%m-%Y").ok());
        let (Some(start), Some(end)) = (start, end) else {
            return json!("Errore");
        };
        let dated = if call.starts_with("compito/elenco/") {
            &state.assignments
        } else if call.starts_with("argomento-lezione/elenco/") {
            &state.topics
        } else {
            return json!("Errore");
        };
        let values: Vec<Value> = dated
            .iter()
            .filter(|(d, _)| *d >= start && *d <= end)
            .map(|(_, raw)| raw.clone())
            .collect();
        json!({ "valori": values })
    }
}

impl Transport for FakeRemote {
    fn get(&self, path: &str, credential: &Credential) -> Result<Reply> {
        let mut state = self.0.borrow_mut();
        state.requests.push(path.to_string());

        let authorized = match credential {
            Credential::Bearer(token) => state.valid_access.as_deref() == Some(token.as_str()),
            Credential::Cookie { .. } => false,
        };
        if !authorized {
            return Ok(Reply::ok(r#"{"code": 401, "message": "Expired JWT Token"}"#));
        }
        Ok(Reply::ok(Self::answer(&state, path).to_string()))
    }
}

impl CredentialExchange for FakeRemote {
    fn exchange(&self, session: &str) -> Result<Exchange> {
        let mut state = self.0.borrow_mut();
        if !state.valid_sessions.iter().any(|s| s == session) {
            return Ok(Exchange::Expired);
        }
        state.granted += 1;
        let access = format!("access-{}", state.granted);
        state.valid_access = Some(access.clone());
        Ok(Exchange::Granted(access))
    }
}

impl Login for FakeRemote {
    fn login(&self, credentials: &LoginCredentials) -> Result<String> {
        if credentials.password != "secret" {
            return Err(Error::AuthenticationFailed("wrong password".to_string()));
        }
        let mut state = self.0.borrow_mut();
        state.logins += 1;
        let session = format!("session-{}", state.logins);
        state.valid_sessions.push(session.clone());
        Ok(session)
    }
}

struct NoPrompt;

impl CredentialPrompt for NoPrompt {
    fn prompt(&self) -> Result<Option<LoginCredentials>> {
        Ok(None)
    }
}

/// A clock shared between the test and the root it was handed to
#[derive(Clone)]
struct TestClock(Rc<Cell<DateTime<Utc>>>);

impl TestClock {
    fn on(date: NaiveDate) -> Self {
        let noon = date.and_time(NaiveTime::MIN).and_utc() + TimeDelta::hours(12);
        Self(Rc::new(Cell::new(noon)))
    }

    fn advance(&self, by: TimeDelta) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }

    fn today(&self) -> NaiveDate {
        self.0.get().date_naive()
    }
}

fn settings() -> Settings {
    let policy = WindowPolicy {
        start_date: day(0),
        window_days: 15,
        max_empty_days: 30,
        backwards_refresh_days: 10,
        resync_anchor: ResyncAnchor::Today,
    };
    Settings {
        homeworks: policy.clone(),
        topics: policy,
        ..Settings::default()
    }
}

fn root_with(
    remote: &FakeRemote,
    store: &MemoryCredentialStore,
    clock: &TestClock,
    password: &str,
) -> SyncRoot {
    let session = SessionManager::new(
        Box::new(store.clone()),
        Box::new(remote.clone()),
        Box::new(remote.clone()),
        Box::new(NoPrompt),
    )
    .with_credentials(Some(LoginCredentials::new("mario", password)));
    let client = RemoteClient::new(Box::new(remote.clone()), session);
    SyncRoot::new(client, STUDENT, settings()).with_clock(Box::new(clock.clone()))
}

fn root(remote: &FakeRemote, clock: &TestClock) -> SyncRoot {
    root_with(remote, &MemoryCredentialStore::new(), clock, "secret")
}

#[test]
fn test_two_clusters_across_45_days_load_fully() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut root = root(&remote, &clock);

    let homeworks = root.homeworks().unwrap();
    assert_eq!(homeworks.len(), 11);
    assert!(homeworks.iter().any(|a| a.date_assigned == day(1)));
    assert!(homeworks.iter().any(|a| a.date_assigned == day(45)));

    // [1,16] [17,31] [32,46] [47,61] [62,76]
    assert_eq!(remote.requests_for("compito/elenco/"), 5);
    assert!(remote.requests()[0].ends_with("compito/elenco/01-09-2020/16-09-2020"));
}

#[test]
fn test_topics_load_and_survive_a_snapshot() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut live = root(&remote, &clock);

    let topics = live.topics().unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].description, "Le guerre puniche");
    assert_eq!(topics[1].date, day(22));
    assert!(remote.requests()[0].contains("argomento-lezione/elenco/01-09-2020/16-09-2020"));

    let value = live.snapshot().to_value().unwrap();
    assert_eq!(value["topics"]["data"][1]["argomento"], "Giulio Cesare");

    let offline = FakeRemote::default();
    let mut restored = root(&offline, &clock);
    restored.restore(&value, false).unwrap();
    assert_eq!(restored.topics().unwrap().to_vec(), live.topics().unwrap().to_vec());
    assert!(offline.requests().is_empty());
}

#[test]
fn test_attachment_path_is_reachable_from_the_crate_root() {
    assert_eq!(
        nuvola::attachment_path(AttachmentOwner::Event, STUDENT, 3),
        "/api-studente/v1/alunno/42/eventi-classe/allegato/3"
    );
    assert_eq!(
        nuvola::remote::attachment_path(AttachmentOwner::Assignment, STUDENT, 9),
        "/api-studente/v1/alunno/42/compito/allegato/9"
    );
}

#[test]
fn test_first_request_logs_in_and_persists_both_credentials() {
    let remote = FakeRemote::with_data();
    let store = MemoryCredentialStore::new();
    let clock = TestClock::on(day(60));
    let mut root = root_with(&remote, &store, &clock, "secret");
    assert_eq!(root.client().session().state(), SessionState::NoCredentials);

    root.events().unwrap();

    assert_eq!(remote.logins(), 1);
    assert_eq!(store.get(CredentialTier::Session).as_deref(), Some("session-1"));
    assert_eq!(store.get(CredentialTier::Access).as_deref(), Some("access-1"));
    assert_eq!(root.client().session().state(), SessionState::HaveAccess);
}

#[test]
fn test_expired_access_is_renewed_and_request_retried_once() {
    let remote = FakeRemote::with_data();
    remote.accept_session("kept");
    let store = MemoryCredentialStore::with(Some("kept"), Some("stale"));
    let clock = TestClock::on(day(60));
    let mut root = root_with(&remote, &store, &clock, "secret");

    assert_eq!(root.events().unwrap().len(), 2);

    assert_eq!(remote.requests_for("eventi-classe"), 2);
    assert_eq!(remote.logins(), 0);
    assert_eq!(store.get(CredentialTier::Access).as_deref(), Some("access-1"));
    assert_eq!(store.get(CredentialTier::Session).as_deref(), Some("kept"));
}

#[test]
fn test_rejected_session_triggers_exactly_one_relogin() {
    let remote = FakeRemote::with_data();
    let store = MemoryCredentialStore::with(Some("revoked"), None);
    let clock = TestClock::on(day(60));
    let mut root = root_with(&remote, &store, &clock, "secret");

    root.events().unwrap();

    assert_eq!(remote.logins(), 1);
    assert_eq!(store.get(CredentialTier::Session).as_deref(), Some("session-1"));
    assert_eq!(store.get(CredentialTier::Access).as_deref(), Some("access-1"));
}

#[test]
fn test_failed_login_is_fatal_and_leaves_collection_empty() {
    let remote = FakeRemote::with_data();
    let store = MemoryCredentialStore::new();
    let clock = TestClock::on(day(60));
    let mut root = root_with(&remote, &store, &clock, "wrong");

    assert!(matches!(root.events(), Err(Error::AuthenticationFailed(_))));
    assert!(root.event_collection().records().is_empty());
    assert_eq!(root.event_collection().staleness().mod_time(), None);
    assert!(remote.requests().is_empty());
    assert_eq!(store.get(CredentialTier::Session), None);
}

#[test]
fn test_check_and_update_all_is_idempotent() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut root = root(&remote, &clock);

    let first = root.check_and_update_all(false).unwrap();
    assert_eq!(first.collections_reloaded, 4);
    assert_eq!(first.windows_reloaded, 2);
    assert_eq!(first.subjects_reloaded, 4);
    let requests = remote.requests().len();

    let second = root.check_and_update_all(false).unwrap();
    assert_eq!(second.collections_reloaded, 0);
    assert_eq!(second.windows_reloaded, 0);
    assert_eq!(second.subjects_reloaded, 0);
    assert_eq!(remote.requests().len(), requests);

    let forced = root.check_and_update_all(true).unwrap();
    assert_eq!(forced.collections_reloaded, 4);
    assert!(remote.requests().len() > requests);
}

#[test]
fn test_active_window_selection_and_explicit_change() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut root = root(&remote, &clock);

    assert_eq!(root.active_time_window().unwrap().id, 2);

    root.set_active_time_window(1).unwrap();
    assert_eq!(root.active_time_window().unwrap().name, "PRIMO QUADRIMESTRE");

    assert!(matches!(
        root.set_active_time_window(99),
        Err(Error::IncompatibleTimeWindow(99))
    ));
    assert_eq!(root.active_time_window().unwrap().id, 1);

    // A reload keeps an explicit choice that still exists
    root.reload_time_windows().unwrap();
    assert_eq!(root.active_time_window().unwrap().id, 1);
}

#[test]
fn test_grades_and_queries_through_root() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut root = root(&remote, &clock);

    let subjects = root.active_subjects().unwrap();
    let maths = subject_by_name(subjects, "Matematica").unwrap().subject().id;
    let marks = root.subject_marks(maths).unwrap().unwrap();
    assert_eq!(marks.len(), 2);
    assert!((average(marks).unwrap() - 7.0).abs() < 1e-9);
    assert!(root.subject_marks(6).unwrap().unwrap().is_empty());
    assert!(root.subject_marks(404).unwrap().is_none());

    assert_eq!(unseen_events(root.events().unwrap()).len(), 1);
    assert_eq!(assignments_due_on(root.homeworks().unwrap(), day(8)).len(), 1);
}

#[test]
fn test_irregularity_details_and_error_sentinel() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut root = root(&remote, &clock);

    assert_eq!(root.irregularities().unwrap()[0].id, 70);
    let details = root.irregularity_details(70).unwrap();
    assert_eq!(details["motivo"], "treno in ritardo");

    assert!(matches!(root.irregularity_details(71), Err(Error::Remote(_))));
}

#[test]
fn test_restore_is_field_for_field_and_needs_no_network() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut original = root(&remote, &clock);
    original.check_and_update_all(false).unwrap();
    let value = original.snapshot().to_value().unwrap();

    let offline = FakeRemote::default();
    let mut restored = root(&offline, &clock);
    restored.restore(&value, false).unwrap();

    assert_eq!(
        restored.homeworks().unwrap().to_vec(),
        original.homeworks().unwrap().to_vec()
    );
    assert_eq!(restored.events().unwrap().to_vec(), original.events().unwrap().to_vec());
    assert_eq!(restored.topics().unwrap().to_vec(), original.topics().unwrap().to_vec());
    assert_eq!(restored.active_time_window().unwrap().id, 2);
    assert_eq!(
        restored.subject_marks(5).unwrap().unwrap().to_vec(),
        original.subject_marks(5).unwrap().unwrap().to_vec()
    );
    assert_eq!(
        restored.homework_collection().staleness().mod_time(),
        original.homework_collection().staleness().mod_time()
    );
    assert!(offline.requests().is_empty());

    assert_eq!(restored.snapshot().to_value().unwrap(), value);
}

#[test]
fn test_restored_data_reloads_once_stale() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut original = root(&remote, &clock);
    original.events().unwrap();
    let value = original.snapshot().to_value().unwrap();

    let again = FakeRemote::with_data();
    let mut restored = root(&again, &clock);
    restored.restore(&value, false).unwrap();

    restored.events().unwrap();
    assert_eq!(again.requests_for("eventi-classe"), 0);

    clock.advance(TimeDelta::hours(6) + TimeDelta::seconds(1));
    restored.events().unwrap();
    assert_eq!(again.requests_for("eventi-classe"), 1);
}

#[test]
fn test_restore_rejections_leave_state_untouched() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut root = root(&remote, &clock);
    root.check_and_update_all(false).unwrap();
    let good = root.snapshot().to_value().unwrap();

    let mut newer = good.clone();
    newer["version"] = json!(FORMAT_VERSION + 1);
    assert!(matches!(
        root.restore(&newer, false),
        Err(Error::VersionMismatch { .. })
    ));

    let mut extra = good.clone();
    extra["irregularities"] = json!([]);
    assert!(matches!(root.restore(&extra, false), Err(Error::Format(_))));

    let mut broken = good.clone();
    broken["homeworks"]["data"] = json!([{"docente": "NESSUNO"}]);
    assert!(matches!(root.restore(&broken, false), Err(Error::Format(_))));

    assert_eq!(root.homework_collection().records().len(), 11);
    assert_eq!(root.loaded_time_windows().unwrap().len(), 2);

    root.restore(&newer, true).unwrap();
    assert_eq!(root.homework_collection().records().len(), 11);
}

#[test]
fn test_snapshot_file_roundtrip() {
    let remote = FakeRemote::with_data();
    let clock = TestClock::on(day(60));
    let mut original = root(&remote, &clock);
    original.homeworks().unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nuvola").join("snapshot.json");
    original.snapshot().write_to(&path).unwrap();

    let snapshot = Snapshot::read_from(&path, false).unwrap();
    let offline = FakeRemote::default();
    let mut restored = root(&offline, &clock);
    restored.restore_snapshot(&snapshot).unwrap();

    assert_eq!(restored.homeworks().unwrap().len(), 11);
    assert!(restored.loaded_time_windows().is_none());
    assert!(offline.requests().is_empty());
}
