//! The root of the cached state for one student

use std::time::Instant;

use log::{debug, info};
use serde_json::Value;

use super::hierarchy::{HierarchyIntervals, TIME_WINDOWS_CALL, TimeWindowNode};
use super::simple::SimpleCollection;
use super::snapshot::{FORMAT_VERSION, Snapshot, decode_all};
use super::staleness::{Clock, SystemClock};
use super::windowed::WindowedCollection;
use super::{RecordSource, SubjectNode};
use crate::auth::{
    FileCredentialStore, FormLogin, HttpCredentialExchange, LoginOptions, SessionManager,
    TerminalPrompt,
};
use crate::config::{LoginCredentials, Settings, seconds};
use crate::error::{Error, Result};
use crate::models::{Assignment, Event, Irregularity, Mark, TimeWindow, Topic};
use crate::remote::{RemoteClient, UreqTransport};

/// Statistics from a `check_and_update_all` pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Flat collections (homeworks, topics, events, irregularities) reloaded
    pub collections_reloaded: usize,
    /// Time windows whose subject list was reloaded
    pub windows_reloaded: usize,
    /// Subjects whose marks were reloaded
    pub subjects_reloaded: usize,
    /// Duration of the pass
    pub duration_ms: u64,
}

/// Pick the window callers see by default
///
/// The full-year window wins; otherwise the one the remote flags as
/// current.
pub fn select_active(windows: &[TimeWindow]) -> Result<usize> {
    windows
        .iter()
        .position(TimeWindow::is_full_year)
        .or_else(|| windows.iter().position(|w| w.current))
        .ok_or(Error::NoSuitableTimeWindow)
}

/// All cached collections for one student
///
/// Every accessor refreshes the data it returns first if it is stale, so
/// reads may block on the network.
pub struct SyncRoot {
    client: RemoteClient,
    student_id: String,
    clock: Box<dyn Clock>,
    homeworks: WindowedCollection<Assignment>,
    topics: WindowedCollection<Topic>,
    events: SimpleCollection<Event>,
    irregularities: SimpleCollection<Irregularity>,
    /// `None` until the window list is first loaded
    time_windows: Option<Vec<TimeWindowNode>>,
    /// Index into `time_windows`
    active: Option<usize>,
    settings: Settings,
}

impl SyncRoot {
    pub fn new(client: RemoteClient, student_id: impl Into<String>, settings: Settings) -> Self {
        let refresh = &settings.refresh;
        Self {
            client,
            student_id: student_id.into(),
            clock: Box::new(SystemClock),
            homeworks: WindowedCollection::new(
                settings.homeworks.clone(),
                seconds(refresh.homeworks),
            ),
            topics: WindowedCollection::new(settings.topics.clone(), seconds(refresh.topics)),
            events: SimpleCollection::new(seconds(refresh.events)),
            irregularities: SimpleCollection::new(seconds(refresh.irregularities)),
            time_windows: None,
            active: None,
            settings,
        }
    }

    /// Wire up the production collaborators from settings
    ///
    /// Credentials are kept in the Nuvola config directory. Without
    /// `credentials`, a re-login prompts on the terminal.
    pub fn connect(
        settings: Settings,
        student_id: impl Into<String>,
        credentials: Option<LoginCredentials>,
    ) -> Result<Self> {
        let transport = UreqTransport::new(&settings.base_url, settings.timeout())?;
        let exchange =
            HttpCredentialExchange::new(transport.clone(), settings.session_cookie.clone());
        let login = FormLogin::new(LoginOptions {
            login_url: format!("{}/login", settings.base_url.trim_end_matches('/')),
            session_cookie: settings.session_cookie.clone(),
            timeout: settings.timeout(),
            ..LoginOptions::default()
        });

        let session = SessionManager::new(
            Box::new(FileCredentialStore::new()?),
            Box::new(exchange),
            Box::new(login),
            Box::new(TerminalPrompt),
        )
        .with_credentials(credentials);
        let client = RemoteClient::new(Box::new(transport), session)
            .with_expired_codes(settings.expired_codes.clone());

        Ok(Self::new(client, student_id, settings))
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut RemoteClient {
        &mut self.client
    }

    fn intervals(&self) -> HierarchyIntervals {
        HierarchyIntervals {
            time_window: seconds(self.settings.refresh.time_windows),
            subject: seconds(self.settings.refresh.subjects),
        }
    }

    pub fn homeworks(&mut self) -> Result<&[Assignment]> {
        let mut source = self.client.scoped(&self.student_id);
        self.homeworks.check_and_update(&mut source, &*self.clock, false)?;
        Ok(self.homeworks.records())
    }

    pub fn topics(&mut self) -> Result<&[Topic]> {
        let mut source = self.client.scoped(&self.student_id);
        self.topics.check_and_update(&mut source, &*self.clock, false)?;
        Ok(self.topics.records())
    }

    pub fn events(&mut self) -> Result<&[Event]> {
        let mut source = self.client.scoped(&self.student_id);
        self.events.check_and_update(&mut source, &*self.clock, false)?;
        Ok(self.events.records())
    }

    pub fn irregularities(&mut self) -> Result<&[Irregularity]> {
        let mut source = self.client.scoped(&self.student_id);
        self.irregularities.check_and_update(&mut source, &*self.clock, false)?;
        Ok(self.irregularities.records())
    }

    /// Details of one irregularity (the `dettaglio` object)
    pub fn irregularity_details(&mut self, id: i64) -> Result<Value> {
        let mut body = self.client.get_custom(&format!("assenza/{}", id))?;
        body.as_object_mut()
            .and_then(|obj| obj.remove("dettaglio"))
            .ok_or_else(|| {
                Error::UnexpectedShape(format!("irregularity {} has no 'dettaglio'", id))
            })
    }

    /// Collections as cached, without refreshing
    pub fn homework_collection(&self) -> &WindowedCollection<Assignment> {
        &self.homeworks
    }

    pub fn topic_collection(&self) -> &WindowedCollection<Topic> {
        &self.topics
    }

    pub fn event_collection(&self) -> &SimpleCollection<Event> {
        &self.events
    }

    pub fn irregularity_collection(&self) -> &SimpleCollection<Irregularity> {
        &self.irregularities
    }

    /// Time windows as cached, without touching the remote
    pub fn loaded_time_windows(&self) -> Option<&[TimeWindowNode]> {
        self.time_windows.as_deref()
    }

    /// All time windows, loading the list on first access
    pub fn time_windows(&mut self) -> Result<&[TimeWindowNode]> {
        self.ensure_time_windows(false)?;
        Ok(self.time_windows.as_deref().unwrap_or_default())
    }

    /// Fetch the window list again
    ///
    /// Windows already known keep their subjects and marks. The active
    /// window stays selected if it still exists; otherwise the selection
    /// rule is applied again. Nothing changes if the fetch or the
    /// selection fails.
    pub fn reload_time_windows(&mut self) -> Result<()> {
        self.ensure_time_windows(true)
    }

    fn ensure_time_windows(&mut self, force: bool) -> Result<()> {
        if self.time_windows.is_some() && !force {
            return Ok(());
        }

        let fetched: Vec<TimeWindow> = {
            let mut source = self.client.scoped(&self.student_id);
            decode_all(&source.fetch(TIME_WINDOWS_CALL)?)?
        };

        let previous_active = self.active_id();
        let active = match previous_active.and_then(|id| fetched.iter().position(|w| w.id == id)) {
            Some(index) => index,
            None => select_active(&fetched)?,
        };

        let intervals = self.intervals();
        let mut previous = self.time_windows.take().unwrap_or_default();
        let nodes = fetched
            .into_iter()
            .map(|window| match previous.iter().position(|n| n.window().id == window.id) {
                Some(i) => previous.swap_remove(i).with_window(window),
                None => TimeWindowNode::from_remote(window, intervals),
            })
            .collect::<Vec<_>>();

        info!("Loaded {} time windows", nodes.len());
        debug!("Active time window: {}", nodes[active].window().name);
        self.time_windows = Some(nodes);
        self.active = Some(active);
        Ok(())
    }

    fn active_id(&self) -> Option<i64> {
        let windows = self.time_windows.as_ref()?;
        self.active.and_then(|i| windows.get(i)).map(|n| n.window().id)
    }

    fn active_index(&mut self) -> Result<usize> {
        self.ensure_time_windows(false)?;
        self.active.ok_or(Error::NoSuitableTimeWindow)
    }

    /// The window selected for callers, loading the window list if needed
    pub fn active_time_window(&mut self) -> Result<&TimeWindow> {
        let index = self.active_index()?;
        self.time_windows
            .as_deref()
            .and_then(|nodes| nodes.get(index))
            .map(TimeWindowNode::window)
            .ok_or(Error::NoSuitableTimeWindow)
    }

    /// Select another known window
    pub fn set_active_time_window(&mut self, window_id: i64) -> Result<()> {
        self.ensure_time_windows(false)?;
        let index = self
            .time_windows
            .as_deref()
            .and_then(|nodes| nodes.iter().position(|n| n.window().id == window_id))
            .ok_or(Error::IncompatibleTimeWindow(window_id))?;
        self.active = Some(index);
        Ok(())
    }

    /// Subjects of the active window, loading them if needed
    pub fn active_subjects(&mut self) -> Result<&[SubjectNode]> {
        let index = self.active_index()?;
        let node = self
            .time_windows
            .as_mut()
            .and_then(|nodes| nodes.get_mut(index))
            .ok_or(Error::NoSuitableTimeWindow)?;
        let mut source = self.client.scoped(&self.student_id);
        let subjects = node.subjects(&mut source, &*self.clock)?;
        Ok(&*subjects)
    }

    /// Marks of one subject in the active window, loading them if needed
    ///
    /// `None` if the active window has no such subject.
    pub fn subject_marks(&mut self, subject_id: i64) -> Result<Option<&[Mark]>> {
        let index = self.active_index()?;
        let node = self
            .time_windows
            .as_mut()
            .and_then(|nodes| nodes.get_mut(index))
            .ok_or(Error::NoSuitableTimeWindow)?;
        let mut source = self.client.scoped(&self.student_id);
        match node.subject(&mut source, &*self.clock, subject_id)? {
            Some(subject) => Ok(Some(subject.marks(&mut source, &*self.clock)?)),
            None => Ok(None),
        }
    }

    /// Run every staleness check, one collection after another
    ///
    /// Covers every time window and every subject, not only the active
    /// window. With `force`, everything is reloaded regardless of staleness,
    /// including the window list.
    pub fn check_and_update_all(&mut self, force: bool) -> Result<SyncStats> {
        let start = Instant::now();
        let mut stats = SyncStats::default();
        let clock = &*self.clock;
        let mut source = self.client.scoped(&self.student_id);

        for reloaded in [
            self.homeworks.check_and_update(&mut source, clock, force)?,
            self.topics.check_and_update(&mut source, clock, force)?,
            self.events.check_and_update(&mut source, clock, force)?,
            self.irregularities.check_and_update(&mut source, clock, force)?,
        ] {
            if reloaded {
                stats.collections_reloaded += 1;
            }
        }
        drop(source);

        self.ensure_time_windows(force)?;

        let clock = &*self.clock;
        let mut source = self.client.scoped(&self.student_id);
        for node in self.time_windows.iter_mut().flatten() {
            if node.check_and_update(&mut source, clock, force)? {
                stats.windows_reloaded += 1;
            }
            for subject in node.subjects(&mut source, clock)? {
                if subject.check_and_update(&mut source, clock, force)? {
                    stats.subjects_reloaded += 1;
                }
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Sync complete: {} collections, {} windows, {} subjects reloaded in {}ms",
            stats.collections_reloaded,
            stats.windows_reloaded,
            stats.subjects_reloaded,
            stats.duration_ms
        );
        Ok(stats)
    }

    /// Capture every cached collection
    ///
    /// Irregularities are not part of the snapshot and are fetched again
    /// after a restore.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            homeworks: self.homeworks.snapshot(),
            events: self.events.snapshot(),
            topics: self.topics.snapshot(),
            time_windows: self
                .time_windows
                .iter()
                .flatten()
                .map(TimeWindowNode::snapshot)
                .collect(),
            version: FORMAT_VERSION,
        }
    }

    /// Replace the cached state with a snapshot, without touching the remote
    ///
    /// Reload times are restored as they were, so data that was fresh when
    /// the snapshot was taken is not fetched again until it goes stale. On
    /// any error the current state is left as it was.
    pub fn restore(&mut self, value: &Value, allow_version_mismatch: bool) -> Result<()> {
        let snapshot = Snapshot::from_value(value, allow_version_mismatch)?;
        self.restore_snapshot(&snapshot)
    }

    /// Restore from an already decoded snapshot
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let refresh = &self.settings.refresh;
        let intervals = self.intervals();
        let invalid = |e: Error| Error::Format(e.to_string());

        let homeworks = WindowedCollection::from_snapshot(
            self.settings.homeworks.clone(),
            seconds(refresh.homeworks),
            &snapshot.homeworks,
        )
        .map_err(invalid)?;
        let topics = WindowedCollection::from_snapshot(
            self.settings.topics.clone(),
            seconds(refresh.topics),
            &snapshot.topics,
        )
        .map_err(invalid)?;
        let events = SimpleCollection::from_snapshot(seconds(refresh.events), &snapshot.events)
            .map_err(invalid)?;
        let nodes = snapshot
            .time_windows
            .iter()
            .map(|tw| TimeWindowNode::from_snapshot(tw, intervals))
            .collect::<Result<Vec<_>>>()
            .map_err(invalid)?;

        let (time_windows, active) = if nodes.is_empty() {
            (None, None)
        } else {
            let windows: Vec<TimeWindow> = nodes.iter().map(|n| n.window().clone()).collect();
            let active = select_active(&windows)?;
            (Some(nodes), Some(active))
        };

        self.homeworks = homeworks;
        self.topics = topics;
        self.events = events;
        self.irregularities = SimpleCollection::new(seconds(refresh.irregularities));
        self.time_windows = time_windows;
        self.active = active;
        info!(
            "Restored snapshot: {} homeworks, {} events, {} topics, {} time windows",
            self.homeworks.records().len(),
            self.events.records().len(),
            self.topics.records().len(),
            snapshot.time_windows.len()
        );
        Ok(())
    }
}
