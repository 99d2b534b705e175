use crate::config::{Config, REGIONS, clamp_count};
use crate::core::filter::{self, DurationBucket, ResultView, SortKey, TimeWindow, ViewQuery, cycle};
use crate::core::http::HttpClient;
use crate::core::pipeline::{CacheKey, FetchCache, FetchMode, FetchParams, fetch_records};
use crate::core::records::VideoRecord;
use crate::core::strategy::{StrategyService, TOP_N};
use crate::core::youtube::YouTubeClient;
use crate::error::{ApiError, Result};
use crate::tui::components::{InputField, ProgressBar, VideoList, Viewer};
use crate::tui::events::AppEvent;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Setup,
    Dashboard,
    Working(Task),
    Detail,
    Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    ValidateKey,
    Fetch,
    Consult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Results,
}

/// Sidebar rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Mode,
    Window,
    Count,
    Sort,
    Duration,
    Region,
    Keyword,
    Run,
}

impl Control {
    pub const ALL: [Control; 8] = [
        Control::Mode,
        Control::Window,
        Control::Count,
        Control::Sort,
        Control::Duration,
        Control::Region,
        Control::Keyword,
        Control::Run,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Control::Mode => "Mode",
            Control::Window => "Published",
            Control::Count => "Results",
            Control::Sort => "Sort",
            Control::Duration => "Duration",
            Control::Region => "Region",
            Control::Keyword => "Keyword",
            Control::Run => "Run",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
}

/// Results sent back by background tasks.
#[derive(Debug)]
pub enum TaskMessage {
    Log(String),
    KeyChecked(std::result::Result<(), ApiError>),
    Fetched {
        key: CacheKey,
        result: std::result::Result<Vec<VideoRecord>, ApiError>,
    },
    Strategy(String),
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    pub config: Config,
    pub notice: Option<Notice>,

    // Setup screen
    pub youtube_key_input: InputField,
    pub ai_key_input: InputField,
    pub setup_focus: usize,

    // Session credentials, set once the setup form is accepted
    pub youtube_key: Option<String>,
    pub ai_key: Option<String>,

    // Sidebar
    pub focus: Focus,
    pub control: Control,
    pub mode: FetchMode,
    pub window: TimeWindow,
    pub count: u32,
    pub sort: SortKey,
    pub bucket: DurationBucket,
    pub region: String,
    pub keyword: InputField,

    // Results
    pub records: Vec<VideoRecord>,
    pub last_params: Option<FetchParams>,
    pub view: ResultView,
    pub video_list: VideoList,
    pub detail: Option<VideoRecord>,

    // AI consultant
    pub viewer: Viewer,

    pub progress: ProgressBar,
    cache: FetchCache,
    http: HttpClient,
    task: Option<JoinHandle<()>>,
    /// Fetch whose result the dashboard is waiting for.
    pending_fetch: Option<CacheKey>,
    tx: mpsc::UnboundedSender<TaskMessage>,
    rx: mpsc::UnboundedReceiver<TaskMessage>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let youtube_key_input = InputField::masked("YouTube Data API key", "required")
            .with_value(config.youtube_api_key.as_deref().unwrap_or_default());
        let ai_key_input = InputField::masked(
            &format!("{} API key", config.ai.provider),
            "optional, enables the AI consultant",
        )
        .with_value(config.ai.api_key().unwrap_or_default());

        let mut app = Self {
            state: AppState::Setup,
            should_quit: false,
            notice: None,

            youtube_key_input,
            ai_key_input,
            setup_focus: 0,

            youtube_key: None,
            ai_key: None,

            focus: Focus::Sidebar,
            control: Control::Run,
            mode: FetchMode::Trending,
            window: TimeWindow::All,
            count: clamp_count(config.dashboard.count),
            sort: SortKey::Views,
            bucket: DurationBucket::All,
            region: config.dashboard.region.clone(),
            keyword: InputField::new("Keyword", "e.g. street food"),

            records: Vec::new(),
            last_params: None,
            view: ResultView::NoResults,
            video_list: VideoList::new(
                config.dashboard.show_interaction_columns,
                config.dashboard.viral_threshold,
            ),
            detail: None,

            viewer: Viewer::new("AI Consultant", ""),
            progress: ProgressBar::new(),
            cache: FetchCache::default(),
            http,
            task: None,
            pending_fetch: None,
            tx,
            rx,
            config,
        };
        app.focus_setup_field(0);
        Ok(app)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Tick => self.handle_tick(),
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.state {
            AppState::Setup => self.handle_setup_key(key),
            AppState::Dashboard => self.handle_dashboard_key(key),
            AppState::Working(task) => self.handle_working_key(key, task),
            AppState::Detail => self.handle_detail_key(key),
            AppState::Strategy => self.handle_strategy_key(key),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match self.state {
            AppState::Dashboard => {
                self.video_list.handle_mouse(mouse);
            }
            AppState::Strategy => {
                self.viewer.handle_mouse(mouse);
            }
            _ => {}
        }
    }

    fn handle_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if self.youtube_key.is_some() {
                    self.state = AppState::Dashboard;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => {
                self.focus_setup_field((self.setup_focus + 1) % 2);
            }
            KeyCode::Enter => {
                if self.setup_focus == 0 {
                    self.focus_setup_field(1);
                } else {
                    self.submit_keys();
                }
            }
            _ => {
                if self.setup_focus == 0 {
                    self.youtube_key_input.handle_key(key);
                } else {
                    self.ai_key_input.handle_key(key);
                }
            }
        }
    }

    fn focus_setup_field(&mut self, index: usize) {
        self.setup_focus = index;
        self.youtube_key_input.focused = index == 0;
        self.ai_key_input.focused = index == 1;
    }

    fn submit_keys(&mut self) {
        if !self.youtube_key_input.is_valid() {
            self.notice = Some(Notice::Warning("A YouTube API key is required".to_string()));
            self.focus_setup_field(0);
            return;
        }

        let youtube_key = self.youtube_key_input.trimmed().to_string();
        self.youtube_key = Some(youtube_key.clone());
        self.ai_key = Some(self.ai_key_input.trimmed().to_string()).filter(|k| !k.is_empty());
        info!(ai_enabled = self.ai_key.is_some(), "session keys accepted");

        if self.config.dashboard.validate_key {
            self.begin_task(Task::ValidateKey, "Checking YouTube API key...");
            let client = YouTubeClient::new(self.http.clone(), youtube_key);
            let tx = self.tx.clone();
            self.task = Some(tokio::spawn(async move {
                let result = client.validate_key().await;
                let _ = tx.send(TaskMessage::KeyChecked(result));
            }));
        } else {
            self.state = AppState::Dashboard;
            self.notice = Some(Notice::Info("Choose a mode and press Enter on Run".to_string()));
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        let typing = self.focus == Focus::Sidebar && self.control == Control::Keyword;

        match key.code {
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Sidebar => Focus::Results,
                    Focus::Results => Focus::Sidebar,
                };
                self.keyword.focused = self.focus == Focus::Sidebar && self.control == Control::Keyword;
            }
            KeyCode::Esc if typing => self.select_control(Control::Run),
            KeyCode::Char('q') if !typing => self.should_quit = true,
            KeyCode::Char('k') if !typing => {
                self.state = AppState::Setup;
                self.notice = None;
                self.focus_setup_field(0);
            }
            KeyCode::Char('a') if !typing => self.start_consult(),
            _ => match self.focus {
                Focus::Sidebar => self.handle_sidebar_key(key),
                Focus::Results => self.handle_results_key(key),
            },
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.select_control(cycle(&Control::ALL, self.control, false)),
            KeyCode::Down => self.select_control(cycle(&Control::ALL, self.control, true)),
            KeyCode::Left => self.adjust_control(false),
            KeyCode::Right => self.adjust_control(true),
            KeyCode::Enter => match self.control {
                Control::Keyword | Control::Run => self.start_fetch(),
                _ => self.adjust_control(true),
            },
            _ if self.control == Control::Keyword => {
                self.keyword.handle_key(key);
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if let Some(video) = self.video_list.get_selected() {
                    self.detail = Some(video.clone());
                    self.state = AppState::Detail;
                }
            }
            _ => {
                self.video_list.handle_key(key);
            }
        }
    }

    fn select_control(&mut self, control: Control) {
        self.control = control;
        self.keyword.focused = control == Control::Keyword;
    }

    /// Step the selected sidebar value. Sort, duration and window changes
    /// re-filter the current table without a new request.
    fn adjust_control(&mut self, forward: bool) {
        match self.control {
            Control::Mode => self.mode = cycle(&FetchMode::ALL, self.mode, forward),
            Control::Window => {
                self.window = cycle(&TimeWindow::ALL, self.window, forward);
                self.refresh_view();
            }
            Control::Count => {
                self.count = if forward {
                    clamp_count(self.count + 5)
                } else {
                    clamp_count(self.count.saturating_sub(5))
                };
            }
            Control::Sort => {
                self.sort = cycle(&SortKey::ALL, self.sort, forward);
                self.refresh_view();
            }
            Control::Duration => {
                self.bucket = cycle(&DurationBucket::ALL, self.bucket, forward);
                self.refresh_view();
            }
            Control::Region => {
                let current = REGIONS
                    .iter()
                    .copied()
                    .find(|r| *r == self.region)
                    .unwrap_or(REGIONS[0]);
                self.region = cycle(REGIONS, current, forward).to_string();
            }
            Control::Keyword | Control::Run => {}
        }
    }

    pub fn control_value(&self, control: Control) -> String {
        match control {
            Control::Mode => self.mode.label().to_string(),
            Control::Window => self.window.label().to_string(),
            Control::Count => self.count.to_string(),
            Control::Sort => self.sort.label().to_string(),
            Control::Duration => self.bucket.label().to_string(),
            Control::Region => self.region.clone(),
            Control::Keyword => self.keyword.display_value(),
            Control::Run => match self.mode {
                FetchMode::Trending => "Fetch trending".to_string(),
                FetchMode::Search => "Search niche".to_string(),
            },
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => self.state = AppState::Dashboard,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_strategy_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => self.state = AppState::Dashboard,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {
                self.viewer.handle_key(key);
            }
        }
    }

    fn handle_working_key(&mut self, key: KeyEvent, task: Task) {
        if key.code != KeyCode::Esc {
            return;
        }
        // A fetch runs to completion so its result still lands in the cache.
        if let Some(handle) = self.task.take()
            && task != Task::Fetch
        {
            handle.abort();
        }
        self.pending_fetch = None;
        debug!(?task, "task cancelled");
        self.progress.reset();
        self.notice = Some(Notice::Info("Cancelled".to_string()));
        self.state = match task {
            Task::ValidateKey => AppState::Setup,
            Task::Fetch | Task::Consult => AppState::Dashboard,
        };
    }

    fn begin_task(&mut self, task: Task, message: &str) {
        self.progress.reset();
        self.progress.set_message(message);
        self.progress.add_log(message);
        self.notice = None;
        self.state = AppState::Working(task);
    }

    pub fn fetch_params(&self) -> FetchParams {
        FetchParams {
            mode: self.mode,
            query: self.keyword.trimmed().to_string(),
            region: self.region.clone(),
            count: self.count,
            window: self.window,
        }
    }

    fn start_fetch(&mut self) {
        let params = self.fetch_params();
        if let Err(err) = params.validate() {
            self.notice = Some(Notice::Warning(err.to_string()));
            return;
        }
        let Some(api_key) = self.youtube_key.clone() else {
            self.state = AppState::Setup;
            return;
        };

        let key = CacheKey { api_key, params };
        if let Some(records) = self.cache.get(&key) {
            debug!(entries = self.cache.len(), "serving fetch from cache");
            let records = records.to_vec();
            self.load_records(key.params, records);
            return;
        }

        let message = match key.params.mode {
            FetchMode::Trending => format!("Fetching trending videos in {}...", key.params.region),
            FetchMode::Search => format!("Searching '{}'...", key.params.query),
        };
        self.begin_task(Task::Fetch, &message);

        self.pending_fetch = Some(key.clone());
        let client = YouTubeClient::new(self.http.clone(), key.api_key.clone());
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let _ = tx.send(TaskMessage::Log("Requesting videos and channel statistics".to_string()));
            let result = fetch_records(&client, &key.params, Utc::now()).await;
            let _ = tx.send(TaskMessage::Fetched { key, result });
        }));
    }

    fn start_consult(&mut self) {
        if self.view.rows().is_empty() {
            self.notice = Some(Notice::Warning("No videos to analyze yet".to_string()));
            return;
        }
        let Some(ai_key) = self.ai_key.clone() else {
            self.notice = Some(Notice::Warning(format!(
                "Add a {} API key (press k) to use the AI consultant",
                self.config.ai.provider
            )));
            return;
        };

        let records: Vec<VideoRecord> = self.view.rows().iter().take(TOP_N).cloned().collect();
        let topic = self
            .last_params
            .as_ref()
            .map_or_else(|| self.fetch_params().topic(), FetchParams::topic);
        let service = StrategyService::from_config(&self.config.ai, &ai_key, self.http.clone());

        self.begin_task(Task::Consult, &format!("Asking {} about '{topic}'...", service.provider()));
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let answer = service.consult(&records, &topic).await;
            let _ = tx.send(TaskMessage::Strategy(answer));
        }));
    }

    fn handle_tick(&mut self) {
        if matches!(self.state, AppState::Working(_)) {
            self.progress.tick();
        }

        while let Ok(message) = self.rx.try_recv() {
            self.apply_message(message);
        }
    }

    fn apply_message(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::Log(line) => self.progress.add_log(line),
            TaskMessage::KeyChecked(result) => {
                if self.state != AppState::Working(Task::ValidateKey) {
                    return;
                }
                self.task = None;
                match result {
                    Ok(()) => {
                        self.state = AppState::Dashboard;
                        self.notice = Some(Notice::Info("YouTube API key verified".to_string()));
                    }
                    Err(err) => {
                        warn!(kind = err.kind(), "key validation failed: {err}");
                        self.youtube_key = None;
                        self.state = AppState::Setup;
                        self.focus_setup_field(0);
                        self.notice = Some(Notice::Warning(format!("YouTube API key rejected: {err}")));
                    }
                }
            }
            TaskMessage::Fetched { key, result } => {
                let waiting = self.state == AppState::Working(Task::Fetch)
                    && self.pending_fetch.as_ref() == Some(&key);
                if waiting {
                    self.pending_fetch = None;
                }
                match result {
                    Ok(records) => {
                        self.cache.insert(key.clone(), records.clone());
                        if waiting {
                            self.task = None;
                            self.load_records(key.params, records);
                        }
                    }
                    Err(err) if waiting => {
                        self.task = None;
                        warn!(kind = err.kind(), "fetch failed: {err}");
                        self.records.clear();
                        self.last_params = Some(key.params);
                        self.view = ResultView::NoResults;
                        self.video_list.update_items(Vec::new());
                        self.state = AppState::Dashboard;
                        self.notice = Some(Notice::Warning(fetch_failure_text(&err)));
                    }
                    Err(_) => {}
                }
            }
            TaskMessage::Strategy(answer) => {
                if self.state != AppState::Working(Task::Consult) {
                    return;
                }
                self.task = None;
                self.viewer.set_content("AI Consultant", &answer);
                self.state = AppState::Strategy;
            }
        }
    }

    fn load_records(&mut self, params: FetchParams, records: Vec<VideoRecord>) {
        info!(mode = params.mode.label(), rows = records.len(), "table replaced");
        self.records = records;
        self.last_params = Some(params);
        self.state = AppState::Dashboard;
        self.focus = Focus::Results;
        self.keyword.focused = false;
        self.refresh_view();
    }

    /// Rebuild the visible rows from the held table.
    fn refresh_view(&mut self) {
        let query = ViewQuery {
            bucket: self.bucket,
            sort: self.sort,
            cutoff: self.window.cutoff_date(Utc::now().date_naive()),
        };
        self.view = filter::apply(&self.records, &query);
        self.video_list.update_items(self.view.rows().to_vec());

        if self.last_params.is_none() {
            return;
        }
        self.notice = match &self.view {
            ResultView::NoResults => Some(Notice::Warning("No videos found".to_string())),
            ResultView::FilteredOut => Some(Notice::Warning(
                "No videos match the current filters".to_string(),
            )),
            ResultView::Rows(rows) => Some(Notice::Info(format!(
                "{} of {} videos shown",
                rows.len(),
                self.records.len()
            ))),
        };
    }
}

fn fetch_failure_text(err: &ApiError) -> String {
    match err {
        ApiError::QuotaExceeded(_) => "YouTube quota exceeded, try again tomorrow".to_string(),
        ApiError::Unauthorized(_) => format!("{err} (press k to change the key)"),
        _ => format!("Fetch failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::samples::record;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_event(key(code)).expect("event");
    }

    fn dashboard() -> App {
        let mut app = App::new(Config::default()).expect("app");
        for c in "yt-key".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::Dashboard);
        app
    }

    #[test]
    fn setup_requires_a_youtube_key() {
        let mut app = App::new(Config::default()).expect("app");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Setup);
        assert!(matches!(app.notice, Some(Notice::Warning(_))));
        assert_eq!(app.setup_focus, 0);
    }

    #[test]
    fn accepted_keys_open_the_dashboard() {
        let app = dashboard();
        assert_eq!(app.youtube_key.as_deref(), Some("yt-key"));
        assert_eq!(app.ai_key, None);
    }

    #[test]
    fn search_without_keyword_is_refused() {
        let mut app = dashboard();
        app.mode = FetchMode::Search;
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(
            app.notice,
            Some(Notice::Warning("Enter a keyword for niche search".to_string()))
        );
    }

    #[test]
    fn cached_fetch_fills_the_table_without_a_request() {
        let mut app = dashboard();
        let key = CacheKey {
            api_key: "yt-key".to_string(),
            params: app.fetch_params(),
        };
        app.cache.insert(key, vec![record("a", 5, 2.0), record("b", 50, 2.0)]);

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.state, AppState::Dashboard);
        assert!(app.task.is_none());
        let ids: Vec<&str> = app.video_list.items.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(app.focus, Focus::Results);
    }

    #[test]
    fn sort_and_bucket_changes_refilter_in_place() {
        let mut app = dashboard();
        let mut fresh = record("fresh", 10, 0.5);
        fresh.publish_date = "2099-01-01".to_string();
        app.load_records(app.fetch_params(), vec![record("big", 900, 12.0), fresh]);

        press(&mut app, KeyCode::Tab);
        app.select_control(Control::Sort);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.sort, SortKey::Newest);
        assert_eq!(app.video_list.items[0].id, "fresh");

        app.select_control(Control::Duration);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.bucket, DurationBucket::Shorts);
        assert_eq!(app.view.rows().len(), 1);

        app.select_control(Control::Duration);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.bucket, DurationBucket::Long);
        assert_eq!(app.view, ResultView::FilteredOut);
        assert_eq!(
            app.notice,
            Some(Notice::Warning("No videos match the current filters".to_string()))
        );
        assert_eq!(app.records.len(), 2);
    }

    #[test]
    fn fetch_failure_leaves_an_empty_table_and_a_warning() {
        let mut app = dashboard();
        app.load_records(app.fetch_params(), vec![record("old", 1, 1.0)]);
        app.state = AppState::Working(Task::Fetch);

        let key = CacheKey {
            api_key: "yt-key".to_string(),
            params: app.fetch_params(),
        };
        app.pending_fetch = Some(key.clone());
        app.tx
            .send(TaskMessage::Fetched {
                key: key.clone(),
                result: Err(ApiError::QuotaExceeded("daily".to_string())),
            })
            .expect("send");
        app.handle_event(AppEvent::Tick).expect("tick");

        assert_eq!(app.state, AppState::Dashboard);
        assert!(app.records.is_empty());
        assert!(app.video_list.items.is_empty());
        assert_eq!(
            app.notice,
            Some(Notice::Warning("YouTube quota exceeded, try again tomorrow".to_string()))
        );
        assert!(app.cache.get(&key).is_none());
    }

    #[tokio::test]
    async fn cancelled_fetch_finishes_into_the_cache() {
        let mut app = dashboard();
        let key = CacheKey {
            api_key: "yt-key".to_string(),
            params: app.fetch_params(),
        };

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let tx = app.tx.clone();
        let sent = key.clone();
        app.state = AppState::Working(Task::Fetch);
        app.task = Some(tokio::spawn(async move {
            let _ = release_rx.await;
            let _ = tx.send(TaskMessage::Fetched {
                key: sent,
                result: Ok(vec![record("late", 1, 1.0)]),
            });
            let _ = done_tx.send(());
        }));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::Dashboard);
        assert!(app.task.is_none());

        release_tx.send(()).expect("release");
        tokio::time::timeout(std::time::Duration::from_secs(5), done_rx)
            .await
            .expect("fetch was not aborted")
            .expect("done");
        app.handle_event(AppEvent::Tick).expect("tick");

        assert!(app.records.is_empty());
        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(app.cache.get(&key).map(<[VideoRecord]>::len), Some(1));
    }

    #[test]
    fn stale_fetch_does_not_answer_a_newer_one() {
        let mut app = dashboard();
        let old = CacheKey {
            api_key: "yt-key".to_string(),
            params: app.fetch_params(),
        };
        let mut newer = old.clone();
        newer.params.region = "JP".to_string();
        app.state = AppState::Working(Task::Fetch);
        app.pending_fetch = Some(newer.clone());

        app.apply_message(TaskMessage::Fetched {
            key: old.clone(),
            result: Ok(vec![record("stale", 1, 1.0)]),
        });
        assert_eq!(app.state, AppState::Working(Task::Fetch));
        assert!(app.records.is_empty());
        assert!(app.cache.get(&old).is_some());

        app.apply_message(TaskMessage::Fetched {
            key: newer,
            result: Ok(vec![record("fresh", 1, 1.0)]),
        });
        assert_eq!(app.state, AppState::Dashboard);
        assert_eq!(app.records[0].id, "fresh");
    }

    #[test]
    fn consultant_needs_rows_and_a_key() {
        let mut app = dashboard();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(
            app.notice,
            Some(Notice::Warning("No videos to analyze yet".to_string()))
        );

        app.load_records(app.fetch_params(), vec![record("a", 1, 1.0)]);
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.state, AppState::Dashboard);
        assert!(matches!(&app.notice, Some(Notice::Warning(text)) if text.contains("gemini API key")));
    }

    #[test]
    fn strategy_answer_opens_the_viewer() {
        let mut app = dashboard();
        app.state = AppState::Working(Task::Consult);
        app.apply_message(TaskMessage::Strategy("**AI Model: m**\n\nIdeas".to_string()));
        assert_eq!(app.state, AppState::Strategy);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::Dashboard);
    }

    #[test]
    fn keyword_field_swallows_shortcuts() {
        let mut app = dashboard();
        app.select_control(Control::Keyword);
        press(&mut app, KeyCode::Char('q'));
        press(&mut app, KeyCode::Char('a'));
        assert!(!app.should_quit);
        assert_eq!(app.keyword.value, "qa");

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn region_and_count_cycle_within_bounds() {
        let mut app = dashboard();
        app.select_control(Control::Region);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.region, "US");

        app.select_control(Control::Count);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.count, 10);
        for _ in 0..20 {
            press(&mut app, KeyCode::Right);
        }
        assert_eq!(app.count, 50);
    }
}
