use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::mpsc;
use url::Url;

use crate::backend::{AuthClient, QueryCache, RestClient, Session, SessionStore, SignUpOutcome};
use crate::citation::{format_citation, CitationData, CitationFormat};
use crate::config::Config;
use crate::discovery::{DiscoveryFeed, FeedResult};
use crate::error::{AppError, Result};
use crate::models::{Article, Collection, CollectionUpdate, FeedPreferences, SavedArticle, Taxonomy};
use crate::services::{
    copy_to_clipboard, load_taxonomy, AddOutcome, CollectionService, PreferenceStore,
    SavedArticles, ALREADY_IN_COLLECTION,
};
use crate::tui::{AppAction, InputMode};

const NOTICE_TTL: Duration = Duration::from_secs(4);
pub const RECENT_SAVED: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Landing,
    SignIn,
    SignUp,
    Dashboard,
    Discovery,
    DiscoveryArticles,
    Saved,
    Collections,
    Collection(String),
    Benchtop,
    BenchMate,
    Account,
    NotFound,
}

impl Screen {
    /// Map a route such as `/discovery/articles` or `/collection/<id>` to a screen.
    pub fn from_route(route: &str) -> Self {
        let route = route.trim().trim_end_matches('/');
        match route {
            "" => Screen::Landing,
            "/signin" => Screen::SignIn,
            "/signup" => Screen::SignUp,
            "/dashboard" => Screen::Dashboard,
            "/discovery" => Screen::Discovery,
            "/discovery/articles" => Screen::DiscoveryArticles,
            "/saved" => Screen::Saved,
            "/collections" => Screen::Collections,
            "/benchtop" => Screen::Benchtop,
            "/benchmate" => Screen::BenchMate,
            "/account" => Screen::Account,
            _ => match route.strip_prefix("/collection/") {
                Some(id) if !id.is_empty() && !id.contains('/') => {
                    Screen::Collection(id.to_string())
                }
                _ => Screen::NotFound,
            },
        }
    }

    pub fn requires_session(&self) -> bool {
        !matches!(
            self,
            Screen::Landing | Screen::SignIn | Screen::SignUp | Screen::NotFound
        )
    }

    /// Screens reachable from the number keys, in order.
    pub fn nav(index: usize) -> Option<Screen> {
        Some(match index {
            1 => Screen::Dashboard,
            2 => Screen::Discovery,
            3 => Screen::DiscoveryArticles,
            4 => Screen::Saved,
            5 => Screen::Collections,
            6 => Screen::Benchtop,
            7 => Screen::BenchMate,
            8 => Screen::Account,
            _ => return None,
        })
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Landing => "Welcome",
            Screen::SignIn => "Sign in",
            Screen::SignUp => "Sign up",
            Screen::Dashboard => "Dashboard",
            Screen::Discovery => "Discovery",
            Screen::DiscoveryArticles => "Articles",
            Screen::Saved => "Saved",
            Screen::Collections => "Collections",
            Screen::Collection(_) => "Collection",
            Screen::Benchtop => "Benchtop",
            Screen::BenchMate => "BenchMate",
            Screen::Account => "Account",
            Screen::NotFound => "Not found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    shown_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    SignIn,
    SignUp,
    ChangePassword,
    NewCollection,
}

impl FormKind {
    pub fn title(&self) -> &'static str {
        match self {
            FormKind::SignIn => " Sign in ",
            FormKind::SignUp => " Create an account ",
            FormKind::ChangePassword => " Change password ",
            FormKind::NewCollection => " New collection ",
        }
    }

    /// Forms drawn over a screen rather than being the screen.
    pub fn is_overlay(&self) -> bool {
        matches!(self, FormKind::ChangePassword | FormKind::NewCollection)
    }
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
}

impl FormField {
    fn text(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            secret: false,
        }
    }

    fn secret(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            secret: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub error: Option<String>,
}

impl Form {
    pub fn new(kind: FormKind) -> Self {
        let fields = match kind {
            FormKind::SignIn => vec![FormField::text("Email"), FormField::secret("Password")],
            FormKind::SignUp => vec![
                FormField::text("Display name"),
                FormField::text("Email"),
                FormField::secret("Password"),
                FormField::secret("Confirm password"),
            ],
            FormKind::ChangePassword => vec![
                FormField::secret("New password"),
                FormField::secret("Confirm password"),
            ],
            FormKind::NewCollection => vec![
                FormField::text("Name"),
                FormField::text("Description"),
                FormField::text("Public (y/N)"),
            ],
        };
        Self {
            kind,
            fields,
            focus: 0,
            error: None,
        }
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    fn prev_field(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    fn push(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    fn pop(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPurpose {
    Search,
    Ticker,
    Journal,
    DateFrom,
    DateTo,
    RenameCollection,
    CollectionDescription,
    IncludeKeyword,
    ExcludeKeyword,
    ExcludeJournal,
    FollowJournal,
    FollowTicker,
    DisplayName,
}

impl InputPurpose {
    pub fn title(&self) -> &'static str {
        match self {
            InputPurpose::Search => "Search title, summary, author or journal",
            InputPurpose::Ticker => "Ticker symbol",
            InputPurpose::Journal => "Journal",
            InputPurpose::DateFrom => "Published from (YYYY-MM-DD, empty to clear)",
            InputPurpose::DateTo => "Published until (YYYY-MM-DD, empty to clear)",
            InputPurpose::RenameCollection => "Rename collection",
            InputPurpose::CollectionDescription => "Collection description (empty to clear)",
            InputPurpose::IncludeKeyword => "Include keyword",
            InputPurpose::ExcludeKeyword => "Exclude keyword",
            InputPurpose::ExcludeJournal => "Exclude journal",
            InputPurpose::FollowJournal => "Follow journal",
            InputPurpose::FollowTicker => "Follow ticker symbol",
            InputPurpose::DisplayName => "Display name",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextInput {
    pub purpose: InputPurpose,
    pub buffer: String,
    /// Collection being edited
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Popup {
    Help,
    Article(Box<Article>),
    Input(TextInput),
    Citation {
        data: CitationData,
        format: CitationFormat,
    },
    ConfirmDelete {
        id: String,
        name: String,
    },
    PickCollection {
        article_id: String,
        selected: usize,
    },
}

/// One editable line on the discovery preferences screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefRow {
    Discipline { name: String, preferred: bool },
    Field { name: String, preferred: bool },
    Include(String),
    Exclude(String),
    FollowedJournal(String),
    ExcludedJournal(String),
    Ticker(String),
}

pub struct CollectionView {
    pub collection: Collection,
    pub articles: Vec<Article>,
    pub owned: bool,
}

pub struct App {
    // Navigation
    pub screen: Screen,
    pub selected_index: usize,
    pub popup: Option<Popup>,
    pub form: Option<Form>,
    pub notice: Option<Notice>,

    // Data
    pub session: Option<Session>,
    pub taxonomy: Taxonomy,
    pub feed: DiscoveryFeed,
    pub use_preferences: bool,
    pub preferences: Option<FeedPreferences>,
    pub draft_preferences: FeedPreferences,
    pub saved_list: Vec<SavedArticle>,
    pub collection_view: Option<CollectionView>,

    // Async state
    feed_rx: mpsc::Receiver<FeedResult>,
    feed_tx: mpsc::Sender<FeedResult>,

    // Services
    rest: Arc<RestClient>,
    auth: AuthClient,
    share_base: Url,
    pub saved: SavedArticles,
    pub collections: Option<CollectionService>,
    preference_store: Option<PreferenceStore>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let rest = Arc::new(RestClient::new(config, Arc::new(QueryCache::new(config.cache_ttl())))?);
        let auth = AuthClient::new(
            Arc::clone(&rest),
            SessionStore::new(config.session_path.clone()),
        );
        let (feed_tx, feed_rx) = mpsc::channel(8);

        let mut app = Self {
            screen: Screen::Landing,
            selected_index: 0,
            popup: None,
            form: None,
            notice: None,
            session: None,
            taxonomy: Taxonomy::default(),
            feed: DiscoveryFeed::new(config.page_size()),
            use_preferences: true,
            preferences: None,
            draft_preferences: FeedPreferences::default(),
            saved_list: Vec::new(),
            collection_view: None,
            feed_rx,
            feed_tx,
            saved: SavedArticles::new(Arc::clone(&rest), None),
            collections: None,
            preference_store: None,
            share_base: config.share_base()?,
            auth,
            rest,
        };

        match app.auth.restore().await {
            Ok(Some(session)) => app.on_signed_in(session).await,
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not restore session: {}", e),
        }

        Ok(app)
    }

    pub fn input_mode(&self) -> InputMode {
        match &self.popup {
            Some(Popup::Help) => InputMode::Help,
            Some(Popup::Article(_)) => InputMode::Detail,
            Some(Popup::Input(_)) => InputMode::Text,
            Some(Popup::Citation { .. }) => InputMode::Citation,
            Some(Popup::ConfirmDelete { .. }) => InputMode::Confirm,
            Some(Popup::PickCollection { .. }) => InputMode::Picker,
            None if self.form.is_some() => InputMode::Form,
            None => InputMode::Normal,
        }
    }

    pub fn greeting_name(&self) -> Option<&str> {
        let user = &self.session.as_ref()?.user;
        user.display_name().or(user.email.as_deref())
    }

    // Notices

    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(NoticeKind::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.notify(NoticeKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(NoticeKind::Error, message);
    }

    fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    /// Business-rule rejections are informational; everything else is an error.
    fn report(&mut self, context: &str, err: AppError) {
        match err {
            AppError::Rejected(message) => self.info(message),
            AppError::Validation(message) => self.error(message),
            e => {
                tracing::error!("{}: {}", context, e);
                self.error(format!("{context}: {e}"));
            }
        }
    }

    /// Expire the current notice.
    pub fn tick(&mut self) {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| n.shown_at.elapsed() >= NOTICE_TTL)
        {
            self.notice = None;
        }
    }

    // Selection

    pub fn list_len(&self) -> usize {
        match &self.screen {
            Screen::Dashboard => self.saved_list.len().min(RECENT_SAVED),
            Screen::Discovery => self.preference_rows().len(),
            Screen::DiscoveryArticles => self.feed.articles.len(),
            Screen::Saved => self.saved_list.len(),
            Screen::Collections => self
                .collections
                .as_ref()
                .map(|c| c.collections.len())
                .unwrap_or(0),
            Screen::Collection(_) => self
                .collection_view
                .as_ref()
                .map(|v| v.articles.len())
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn selected_article(&self) -> Option<&Article> {
        match &self.screen {
            Screen::DiscoveryArticles => self.feed.articles.get(self.selected_index),
            Screen::Saved | Screen::Dashboard => {
                self.saved_list.get(self.selected_index).map(|s| &s.article)
            }
            Screen::Collection(_) => self
                .collection_view
                .as_ref()
                .and_then(|v| v.articles.get(self.selected_index)),
            _ => None,
        }
    }

    pub fn selected_collection(&self) -> Option<&Collection> {
        match &self.screen {
            Screen::Collections => self
                .collections
                .as_ref()
                .and_then(|c| c.collections.get(self.selected_index)),
            Screen::Collection(_) => self.collection_view.as_ref().map(|v| &v.collection),
            _ => None,
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.list_len();
        if len == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    /// Articles from a followed journal or ticker get highlighted.
    pub fn is_followed(&self, article: &Article) -> bool {
        let Some(prefs) = &self.preferences else {
            return false;
        };
        let journal = article
            .journal_name
            .as_ref()
            .is_some_and(|j| prefs.followed_journals.contains(j));
        let ticker = article
            .ticker_symbol
            .as_ref()
            .is_some_and(|t| prefs.followed_ticker_symbols.contains(t));
        journal || ticker
    }

    pub fn preference_rows(&self) -> Vec<PrefRow> {
        let prefs = &self.draft_preferences;
        let mut rows: Vec<PrefRow> = self
            .taxonomy
            .disciplines()
            .into_iter()
            .map(|name| PrefRow::Discipline {
                preferred: prefs.preferred_disciplines.contains(&name),
                name,
            })
            .collect();
        for discipline in &prefs.preferred_disciplines {
            rows.extend(
                self.taxonomy
                    .fields_for(discipline)
                    .into_iter()
                    .map(|name| PrefRow::Field {
                        preferred: prefs.preferred_fields.contains(&name),
                        name,
                    }),
            );
        }
        rows.extend(prefs.include_keywords.iter().cloned().map(PrefRow::Include));
        rows.extend(prefs.exclude_keywords.iter().cloned().map(PrefRow::Exclude));
        rows.extend(
            prefs
                .followed_journals
                .iter()
                .cloned()
                .map(PrefRow::FollowedJournal),
        );
        rows.extend(
            prefs
                .excluded_journals
                .iter()
                .cloned()
                .map(PrefRow::ExcludedJournal),
        );
        rows.extend(
            prefs
                .followed_ticker_symbols
                .iter()
                .cloned()
                .map(PrefRow::Ticker),
        );
        rows
    }

    pub fn preferences_dirty(&self) -> bool {
        self.preferences.clone().unwrap_or_default() != self.draft_preferences
    }

    // Session

    async fn on_signed_in(&mut self, session: Session) {
        let user_id = session.user_id().to_string();
        let mut saved = SavedArticles::new(Arc::clone(&self.rest), Some(user_id.clone()));
        let mut collections = CollectionService::new(
            Arc::clone(&self.rest),
            user_id.clone(),
            self.share_base.clone(),
        );
        let store = PreferenceStore::new(Arc::clone(&self.rest), user_id);

        // Background reads fail quietly and leave empty state behind.
        let (saved_loaded, collections_loaded, preferences, taxonomy) = futures::join!(
            saved.refresh(),
            async { collections.refresh().await.map(|c| c.len()) },
            store.load(),
            load_taxonomy(&self.rest),
        );
        if let Err(e) = saved_loaded {
            tracing::warn!("Error loading saved articles: {}", e);
        }
        if let Err(e) = collections_loaded {
            tracing::warn!("Error loading collections: {}", e);
        }
        self.preferences = preferences.unwrap_or_else(|e| {
            tracing::warn!("Error loading preferences: {}", e);
            None
        });
        match taxonomy {
            Ok(taxonomy) => self.taxonomy = taxonomy,
            Err(e) => tracing::warn!("Error loading categories: {}", e),
        }

        self.draft_preferences = self.preferences.clone().unwrap_or_default();
        self.saved = saved;
        self.collections = Some(collections);
        self.preference_store = Some(store);
        self.session = Some(session);
        self.reload_saved_list().await;
    }

    async fn sign_out(&mut self) {
        if let Err(e) = self.auth.sign_out().await {
            self.report("Failed to sign out", e);
        }
        self.session = None;
        self.collections = None;
        self.preference_store = None;
        self.saved = SavedArticles::new(Arc::clone(&self.rest), None);
        self.preferences = None;
        self.draft_preferences = FeedPreferences::default();
        self.saved_list.clear();
        self.collection_view = None;
        self.feed.reset();
        self.navigate(Screen::Landing).await;
        self.info("Signed out");
    }

    // Navigation

    pub async fn navigate(&mut self, screen: Screen) {
        let screen = if screen.requires_session() && self.session.is_none() {
            self.info("Please sign in to continue");
            Screen::Landing
        } else {
            screen
        };

        self.screen = screen.clone();
        self.selected_index = 0;
        self.popup = None;
        self.form = match screen {
            Screen::SignIn => Some(Form::new(FormKind::SignIn)),
            Screen::SignUp => Some(Form::new(FormKind::SignUp)),
            _ => None,
        };

        match screen {
            Screen::DiscoveryArticles => self.fetch_articles(),
            Screen::Dashboard | Screen::Saved => self.reload_saved_list().await,
            Screen::Collections => self.refresh_collections().await,
            Screen::Collection(id) => self.open_collection(&id).await,
            _ => {}
        }
    }

    async fn back(&mut self) {
        let signed_in = self.session.is_some();
        let target = match &self.screen {
            Screen::Collection(_) => Screen::Collections,
            Screen::DiscoveryArticles => Screen::Discovery,
            Screen::Landing => return,
            _ if signed_in => {
                if self.screen == Screen::Dashboard {
                    return;
                }
                Screen::Dashboard
            }
            _ => Screen::Landing,
        };
        self.navigate(target).await;
    }

    // Discovery feed

    fn fetch_articles(&mut self) {
        let preferences = if self.use_preferences {
            self.preferences.clone()
        } else {
            None
        };
        self.feed
            .spawn_fetch(Arc::clone(&self.rest), preferences, self.feed_tx.clone());
    }

    /// Poll for completed feed fetches (non-blocking).
    pub fn poll_feed_results(&mut self) {
        while let Ok(result) = self.feed_rx.try_recv() {
            if self.feed.apply(result) && self.screen == Screen::DiscoveryArticles {
                self.clamp_selection();
            }
        }
    }

    fn cycle_discipline(&mut self) {
        let mut options = vec![String::new()];
        options.extend(self.taxonomy.disciplines());
        let next = next_option(&options, &self.feed.filters.discipline);
        self.feed.filters.set_discipline(next);
        self.fetch_articles();
    }

    fn cycle_field(&mut self) {
        if self.feed.filters.discipline.is_empty() {
            self.info("Choose a discipline first");
            return;
        }
        let mut options = vec![String::new()];
        options.extend(self.taxonomy.fields_for(&self.feed.filters.discipline));
        let next = next_option(&options, &self.feed.filters.field);
        self.feed.filters.set_field(next);
        self.fetch_articles();
    }

    // Data loads

    async fn reload_saved_list(&mut self) {
        match self.saved.list_saved().await {
            Ok(list) => self.saved_list = list,
            Err(e) => tracing::warn!("Error loading saved articles: {}", e),
        }
        self.clamp_selection();
    }

    async fn refresh_collections(&mut self) {
        if let Some(service) = self.collections.as_mut() {
            if let Err(e) = service.refresh().await {
                tracing::warn!("Error loading collections: {}", e);
            }
        }
        self.clamp_selection();
    }

    async fn open_collection(&mut self, id: &str) {
        let Some(service) = self.collections.as_ref() else {
            return;
        };
        let lookup = match service.find(id).cloned() {
            Some(collection) => Ok(collection),
            None => service.get_public(id).await,
        };
        let loaded = match lookup {
            Ok(collection) => service
                .articles(id)
                .await
                .map(|articles| (collection, articles)),
            Err(e) => Err(e),
        };

        match loaded {
            Ok((collection, articles)) => {
                let owned = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.user_id() == collection.user_id);
                self.collection_view = Some(CollectionView {
                    collection,
                    articles,
                    owned,
                });
            }
            Err(e) => {
                self.collection_view = None;
                self.report("Failed to load collection", e);
            }
        }
        self.clamp_selection();
    }

    async fn reload_view(&mut self) {
        if let Screen::Collection(id) = self.screen.clone() {
            self.open_collection(&id).await;
        }
    }

    // Actions

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        if action == AppAction::Quit {
            return Ok(true);
        }
        if self.popup.is_some() {
            self.handle_popup_action(action).await;
            return Ok(false);
        }
        if self.form.is_some() {
            self.handle_form_action(action).await;
            return Ok(false);
        }

        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                let len = self.list_len();
                if len > 0 && self.selected_index < len - 1 {
                    self.selected_index += 1;
                }
            }

            AppAction::Select => self.select().await,

            AppAction::Back => self.back().await,

            AppAction::Navigate(screen) => self.navigate(screen).await,

            AppAction::Refresh => {
                self.rest.cache().clear().await;
                if let Err(e) = self.saved.refresh().await {
                    tracing::warn!("Error loading saved articles: {}", e);
                }
                let index = self.selected_index;
                self.navigate(self.screen.clone()).await;
                self.selected_index = index;
                self.clamp_selection();
            }

            AppAction::ShowHelp => self.popup = Some(Popup::Help),

            AppAction::HideHelp => self.popup = None,

            AppAction::StartInput(purpose) => self.start_input(purpose),

            AppAction::InputChar(_) | AppAction::InputBackspace => {}

            AppAction::CycleDiscipline => self.cycle_discipline(),

            AppAction::CycleField => self.cycle_field(),

            AppAction::ClearFilters => {
                self.feed.filters.clear();
                self.fetch_articles();
            }

            AppAction::NextPage => {
                if self.feed.next_page() {
                    self.selected_index = 0;
                    self.fetch_articles();
                }
            }

            AppAction::PrevPage => {
                if self.feed.prev_page() {
                    self.selected_index = 0;
                    self.fetch_articles();
                }
            }

            AppAction::TogglePreferenceFilter => {
                self.use_preferences = !self.use_preferences;
                self.feed.filters.page = 1;
                self.fetch_articles();
                let state = if self.use_preferences { "on" } else { "off" };
                self.info(format!("Personalized feed {state}"));
            }

            AppAction::ShowDetail => {
                if let Some(article) = self.selected_article() {
                    self.popup = Some(Popup::Article(Box::new(article.clone())));
                }
            }

            AppAction::ToggleSave => self.toggle_save().await,

            AppAction::Cite => {
                if let Some(article) = self.selected_article() {
                    self.popup = Some(Popup::Citation {
                        data: CitationData::from(article),
                        format: CitationFormat::Apa,
                    });
                }
            }

            AppAction::CycleCitationFormat | AppAction::CopyCitation => {}

            AppAction::AddToCollection => self.start_add_to_collection(),

            AppAction::OpenInBrowser => self.open_selected(),

            AppAction::ToggleVisibility => self.toggle_visibility().await,

            AppAction::DeleteCollection => {
                let owned = self.can_edit_selected_collection();
                if let Some(collection) = self.selected_collection().filter(|_| owned) {
                    self.popup = Some(Popup::ConfirmDelete {
                        id: collection.id.clone(),
                        name: collection.name.clone(),
                    });
                }
            }

            AppAction::NewCollection => {
                if self.collections.is_some() {
                    self.form = Some(Form::new(FormKind::NewCollection));
                }
            }

            AppAction::ShareCollection => self.share_collection(),

            AppAction::RemoveFromCollection => self.remove_from_collection().await,

            AppAction::ToggleKeywordLogic => {
                self.draft_preferences.keyword_logic = self.draft_preferences.keyword_logic.toggle();
            }

            AppAction::SavePreferences => self.save_preferences().await,

            AppAction::ClearPreferences => self.clear_preferences().await,

            AppAction::ChangePassword => {
                if self.session.is_some() {
                    self.form = Some(Form::new(FormKind::ChangePassword));
                }
            }

            AppAction::SignOut => self.sign_out().await,
        }

        Ok(false)
    }

    async fn select(&mut self) {
        match self.screen.clone() {
            Screen::Landing => self.navigate(Screen::SignIn).await,
            Screen::NotFound => self.back().await,
            Screen::Collections => {
                if let Some(id) = self.selected_collection().map(|c| c.id.clone()) {
                    self.navigate(Screen::Collection(id)).await;
                }
            }
            Screen::Discovery => {
                if let Some(row) = self.preference_rows().into_iter().nth(self.selected_index) {
                    self.edit_preference_row(row);
                }
            }
            Screen::Dashboard
            | Screen::Saved
            | Screen::DiscoveryArticles
            | Screen::Collection(_) => self.open_selected(),
            _ => {}
        }
    }

    fn open_selected(&mut self) {
        if let Some(link) = self.selected_article().map(|a| a.link.clone()) {
            self.open_link(&link);
        }
    }

    fn open_link(&mut self, link: &str) {
        if let Err(e) = open::that(link) {
            tracing::warn!("Failed to open {}: {}", link, e);
            self.error("Could not open the article in a browser");
        }
    }

    fn edit_preference_row(&mut self, row: PrefRow) {
        let prefs = &mut self.draft_preferences;
        match row {
            PrefRow::Discipline { name, .. } => prefs.toggle_discipline(&name),
            PrefRow::Field { name, .. } => prefs.toggle_field(&name),
            PrefRow::Include(k) => prefs.remove_include_keyword(&k),
            PrefRow::Exclude(k) => prefs.remove_exclude_keyword(&k),
            PrefRow::FollowedJournal(j) => prefs.toggle_followed_journal(&j),
            PrefRow::ExcludedJournal(j) => prefs.toggle_excluded_journal(&j),
            PrefRow::Ticker(t) => prefs.toggle_ticker(&t),
        }
        self.clamp_selection();
    }

    fn start_input(&mut self, purpose: InputPurpose) {
        let filters = &self.feed.filters;
        let mut target = None;
        let buffer = match purpose {
            InputPurpose::Search => filters.search_query.clone(),
            InputPurpose::Ticker => filters.ticker_symbol.clone(),
            InputPurpose::Journal => filters.journal.clone(),
            InputPurpose::DateFrom => format_date(filters.date_from),
            InputPurpose::DateTo => format_date(filters.date_to),
            InputPurpose::RenameCollection | InputPurpose::CollectionDescription => {
                if !self.can_edit_selected_collection() {
                    return;
                }
                let Some(collection) = self.selected_collection() else {
                    return;
                };
                target = Some(collection.id.clone());
                if purpose == InputPurpose::RenameCollection {
                    collection.name.clone()
                } else {
                    collection.description.clone().unwrap_or_default()
                }
            }
            InputPurpose::DisplayName => self
                .session
                .as_ref()
                .and_then(|s| s.user.display_name())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        self.popup = Some(Popup::Input(TextInput {
            purpose,
            buffer,
            target,
        }));
    }

    async fn handle_popup_action(&mut self, action: AppAction) {
        let Some(popup) = self.popup.take() else {
            return;
        };

        match (popup, action) {
            (Popup::Help, _) => {}

            (Popup::Article(article), AppAction::OpenInBrowser) => {
                self.open_link(&article.link);
                self.popup = Some(Popup::Article(article));
            }
            (Popup::Article(article), AppAction::Cite) => {
                self.popup = Some(Popup::Citation {
                    data: CitationData::from(article.as_ref()),
                    format: CitationFormat::Apa,
                });
            }
            (Popup::Article(_), AppAction::Back) => {}

            (Popup::Input(mut input), AppAction::InputChar(c)) => {
                input.buffer.push(c);
                self.popup = Some(Popup::Input(input));
            }
            (Popup::Input(mut input), AppAction::InputBackspace) => {
                input.buffer.pop();
                self.popup = Some(Popup::Input(input));
            }
            (Popup::Input(input), AppAction::Select) => self.submit_input(input).await,
            (Popup::Input(_), AppAction::Back) => {}

            (Popup::Citation { data, format }, AppAction::CycleCitationFormat) => {
                self.popup = Some(Popup::Citation {
                    data,
                    format: format.next(),
                });
            }
            (Popup::Citation { data, format }, AppAction::CopyCitation) => {
                let text = format_citation(&data, format);
                self.copy(&text, "citation");
                self.popup = Some(Popup::Citation { data, format });
            }
            (Popup::Citation { .. }, AppAction::Back) => {}

            (Popup::ConfirmDelete { id, name }, AppAction::Select) => {
                self.delete_collection(&id, &name).await;
            }
            (Popup::ConfirmDelete { .. }, AppAction::Back) => {}

            (Popup::PickCollection { article_id, selected }, AppAction::MoveUp) => {
                self.popup = Some(Popup::PickCollection {
                    article_id,
                    selected: selected.saturating_sub(1),
                });
            }
            (Popup::PickCollection { article_id, selected }, AppAction::MoveDown) => {
                let len = self
                    .collections
                    .as_ref()
                    .map(|c| c.collections.len())
                    .unwrap_or(0);
                self.popup = Some(Popup::PickCollection {
                    article_id,
                    selected: (selected + 1).min(len.saturating_sub(1)),
                });
            }
            (Popup::PickCollection { article_id, selected }, AppAction::Select) => {
                self.add_to_collection(selected, &article_id).await;
            }
            (Popup::PickCollection { .. }, AppAction::Back) => {}

            (popup, _) => self.popup = Some(popup),
        }
    }

    async fn handle_form_action(&mut self, action: AppAction) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match action {
            AppAction::InputChar(c) => form.push(c),
            AppAction::InputBackspace => form.pop(),
            AppAction::MoveDown => form.next_field(),
            AppAction::MoveUp => form.prev_field(),
            AppAction::Select => {
                if form.focus + 1 < form.fields.len() {
                    form.next_field();
                } else {
                    self.submit_form().await;
                }
            }
            AppAction::Back => {
                if form.kind.is_overlay() {
                    self.form = None;
                } else {
                    self.navigate(Screen::Landing).await;
                }
            }
            _ => {}
        }
    }

    async fn submit_form(&mut self) {
        let Some(form) = self.form.clone() else {
            return;
        };

        let result = match form.kind {
            FormKind::SignIn => match self.auth.sign_in(form.value(0), form.value(1)).await {
                Ok(session) => {
                    self.on_signed_in(session).await;
                    self.navigate(Screen::Dashboard).await;
                    self.success("Signed in");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            FormKind::SignUp => {
                let display_name = Some(form.value(0)).filter(|n| !n.trim().is_empty());
                match self
                    .auth
                    .sign_up(form.value(1), form.value(2), form.value(3), display_name)
                    .await
                {
                    Ok(SignUpOutcome::SignedIn(session)) => {
                        self.on_signed_in(session).await;
                        self.navigate(Screen::Dashboard).await;
                        self.success("Account created");
                        Ok(())
                    }
                    Ok(SignUpOutcome::ConfirmationRequired) => {
                        self.navigate(Screen::SignIn).await;
                        self.info("Check your email to confirm your account, then sign in");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            FormKind::ChangePassword => match self.session.clone() {
                Some(session) => {
                    match self
                        .auth
                        .change_password(&session, form.value(0), form.value(1))
                        .await
                    {
                        Ok(()) => {
                            self.form = None;
                            self.success("Password updated");
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
                None => Ok(()),
            },
            FormKind::NewCollection => self.submit_new_collection(&form).await,
        };

        if let Err(e) = result {
            tracing::warn!("{:?} failed: {}", form.kind, e);
            if let Some(form) = self.form.as_mut() {
                form.error = Some(e.to_string());
            }
        }
    }

    async fn submit_new_collection(&mut self, form: &Form) -> Result<()> {
        let is_public = parse_visibility(form.value(2))?;
        let Some(service) = self.collections.as_mut() else {
            return Ok(());
        };
        service
            .create(form.value(0), Some(form.value(1)), is_public)
            .await?;
        self.form = None;
        self.success("Collection created");
        self.clamp_selection();
        Ok(())
    }

    async fn submit_input(&mut self, input: TextInput) {
        let value = input.buffer.trim().to_string();
        match input.purpose {
            InputPurpose::Search => {
                self.feed.filters.set_search(value);
                self.fetch_articles();
            }
            InputPurpose::Ticker => {
                self.feed.filters.set_ticker(value.to_uppercase());
                self.fetch_articles();
            }
            InputPurpose::Journal => {
                self.feed.filters.set_journal(value);
                self.fetch_articles();
            }
            InputPurpose::DateFrom | InputPurpose::DateTo => match parse_date_input(&value) {
                Ok(date) => {
                    let filters = &self.feed.filters;
                    let (from, to) = if input.purpose == InputPurpose::DateFrom {
                        (date, filters.date_to)
                    } else {
                        (filters.date_from, date)
                    };
                    if let (Some(from), Some(to)) = (from, to) {
                        if from > to {
                            self.error("The start date must not be after the end date");
                            return;
                        }
                    }
                    self.feed.filters.set_dates(from, to);
                    self.fetch_articles();
                }
                Err(e) => self.report("Invalid date", e),
            },
            InputPurpose::RenameCollection | InputPurpose::CollectionDescription => {
                let (Some(service), Some(id)) = (self.collections.as_mut(), input.target) else {
                    return;
                };
                let changes = if input.purpose == InputPurpose::RenameCollection {
                    CollectionUpdate {
                        name: Some(value),
                        ..Default::default()
                    }
                } else {
                    CollectionUpdate {
                        description: Some(value),
                        ..Default::default()
                    }
                };
                match service.update(&id, changes).await {
                    Ok(()) => {
                        self.success("Collection updated");
                        self.reload_view().await;
                    }
                    Err(e) => self.report("Failed to update collection", e),
                }
            }
            InputPurpose::IncludeKeyword => {
                if !self.draft_preferences.add_include_keyword(&value) {
                    self.info("Keyword is already in the list");
                }
            }
            InputPurpose::ExcludeKeyword => {
                if !self.draft_preferences.add_exclude_keyword(&value) {
                    self.info("Keyword is already in the list");
                }
            }
            InputPurpose::ExcludeJournal => {
                if !value.is_empty() && !self.draft_preferences.excluded_journals.contains(&value) {
                    self.draft_preferences.toggle_excluded_journal(&value);
                }
            }
            InputPurpose::FollowJournal => {
                if !value.is_empty() && !self.draft_preferences.followed_journals.contains(&value) {
                    self.draft_preferences.toggle_followed_journal(&value);
                }
            }
            InputPurpose::FollowTicker => {
                let ticker = value.to_uppercase();
                if !ticker.is_empty()
                    && !self.draft_preferences.followed_ticker_symbols.contains(&ticker)
                {
                    self.draft_preferences.toggle_ticker(&ticker);
                }
            }
            InputPurpose::DisplayName => {
                let Some(session) = self.session.clone() else {
                    return;
                };
                match self.auth.set_display_name(&session, &value).await {
                    Ok(updated) => {
                        self.session = Some(updated);
                        self.success("Display name updated");
                    }
                    Err(e) => self.report("Failed to update display name", e),
                }
            }
        }
    }

    async fn toggle_save(&mut self) {
        let Some(article_id) = self.selected_article().map(|a| a.id.clone()) else {
            return;
        };
        match self.saved.toggle(&article_id).await {
            Ok(true) => self.success("Article saved"),
            Ok(false) => self.success("Article removed from saved"),
            Err(e) => self.report("Failed to update saved articles", e),
        }
        if matches!(self.screen, Screen::Saved | Screen::Dashboard) {
            self.reload_saved_list().await;
        }
    }

    fn start_add_to_collection(&mut self) {
        let Some(article_id) = self.selected_article().map(|a| a.id.clone()) else {
            return;
        };
        let has_collections = self
            .collections
            .as_ref()
            .is_some_and(|c| !c.collections.is_empty());
        if !has_collections {
            self.info("Create a collection first");
            return;
        }
        self.popup = Some(Popup::PickCollection {
            article_id,
            selected: 0,
        });
    }

    async fn add_to_collection(&mut self, index: usize, article_id: &str) {
        let Some(service) = self.collections.as_mut() else {
            return;
        };
        let Some(collection) = service.collections.get(index).cloned() else {
            return;
        };
        match service.add_article(&collection.id, article_id).await {
            Ok(AddOutcome::Added) => self.success(format!("Added to {}", collection.name)),
            Ok(AddOutcome::AlreadyPresent) => self.info(ALREADY_IN_COLLECTION),
            Err(e) => self.report("Failed to add article to collection", e),
        }
    }

    fn can_edit_selected_collection(&self) -> bool {
        match &self.screen {
            Screen::Collections => true,
            Screen::Collection(_) => self.collection_view.as_ref().is_some_and(|v| v.owned),
            _ => false,
        }
    }

    async fn toggle_visibility(&mut self) {
        if !self.can_edit_selected_collection() {
            return;
        }
        let Some(collection) = self.selected_collection().cloned() else {
            return;
        };
        let Some(service) = self.collections.as_mut() else {
            return;
        };
        let changes = CollectionUpdate {
            is_public: Some(!collection.is_public),
            ..Default::default()
        };
        match service.update(&collection.id, changes).await {
            Ok(()) => {
                let state = if collection.is_public { "private" } else { "public" };
                self.success(format!("Collection is now {state}"));
                self.reload_view().await;
            }
            Err(e) => self.report("Failed to update collection", e),
        }
    }

    async fn delete_collection(&mut self, id: &str, name: &str) {
        let Some(service) = self.collections.as_mut() else {
            return;
        };
        match service.delete(id).await {
            Ok(()) => {
                self.success(format!("Deleted {name}"));
                if matches!(&self.screen, Screen::Collection(current) if current == id) {
                    self.navigate(Screen::Collections).await;
                }
            }
            Err(e) => self.report("Failed to delete collection", e),
        }
        self.clamp_selection();
    }

    fn share_collection(&mut self) {
        let Some(collection) = self.selected_collection() else {
            return;
        };
        let Some(service) = self.collections.as_ref() else {
            return;
        };
        match service.share_link(collection) {
            Ok(link) => self.copy(&link, "share link"),
            Err(e) => self.report("Failed to share collection", e),
        }
    }

    async fn remove_from_collection(&mut self) {
        let Some(view) = self.collection_view.as_ref().filter(|v| v.owned) else {
            return;
        };
        let Some(article) = view.articles.get(self.selected_index) else {
            return;
        };
        let (collection_id, article_id) = (view.collection.id.clone(), article.id.clone());
        let Some(service) = self.collections.as_mut() else {
            return;
        };
        match service.remove_article(&collection_id, &article_id).await {
            Ok(()) => {
                self.success("Article removed from collection");
                self.reload_view().await;
            }
            Err(e) => self.report("Failed to remove article", e),
        }
    }

    async fn save_preferences(&mut self) {
        let Some(store) = self.preference_store.as_ref() else {
            return;
        };
        match store.save(&self.draft_preferences).await {
            Ok(()) => {
                self.preferences = Some(self.draft_preferences.clone());
                self.feed.filters.page = 1;
                self.fetch_articles();
                self.success("Preferences saved");
            }
            Err(e) => self.report("Failed to save preferences", e),
        }
    }

    async fn clear_preferences(&mut self) {
        let Some(store) = self.preference_store.as_ref() else {
            return;
        };
        match store.clear().await {
            Ok(()) => {
                self.preferences = None;
                self.draft_preferences = FeedPreferences::default();
                self.feed.filters.page = 1;
                self.fetch_articles();
                self.selected_index = 0;
                self.success("Preferences cleared");
            }
            Err(e) => self.report("Failed to clear preferences", e),
        }
    }

    fn copy(&mut self, text: &str, what: &str) {
        match copy_to_clipboard(&mut io::stdout(), text) {
            Ok(()) => self.success(format!("Copied {what} to clipboard")),
            Err(e) => {
                tracing::error!("Clipboard write failed: {}", e);
                self.error(format!("Failed to copy {what} to clipboard"));
            }
        }
    }
}

fn next_option(options: &[String], current: &str) -> String {
    let index = options.iter().position(|o| o == current).unwrap_or(0);
    options
        .get((index + 1) % options.len().max(1))
        .cloned()
        .unwrap_or_default()
}

/// Answer to the "Public" field of the new collection form; blank means private.
fn parse_visibility(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "n" | "no" | "private" => Ok(false),
        "y" | "yes" | "public" => Ok(true),
        other => Err(AppError::Validation(format!(
            "Public must be y or n, not \"{other}\""
        ))),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Empty input clears the bound.
pub fn parse_date_input(value: &str) -> Result<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation("Dates must look like 2024-01-31".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthUser;
    use serde_json::json;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn app_for(server: &MockServer, dir: &tempfile::TempDir) -> App {
        let config = Config {
            backend_url: Some(server.uri()),
            anon_key: Some("anon".to_string()),
            share_base_url: Some("https://benchfeed.example.org".to_string()),
            session_path: dir.path().join("session.json").to_string_lossy().to_string(),
            ..Config::default()
        };
        App::new(&config).await.unwrap()
    }

    fn session() -> Session {
        Session {
            access_token: "jwt".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: None,
            user: AuthUser {
                id: "u1".to_string(),
                email: Some("ada@example.org".to_string()),
                user_metadata: serde_json::Value::Null,
            },
        }
    }

    fn collection(id: &str, is_public: bool) -> Collection {
        serde_json::from_value(json!({
            "id": id, "name": "Reading", "is_public": is_public, "user_id": "u1"
        }))
        .unwrap()
    }

    #[test]
    fn routes_map_to_screens() {
        assert_eq!(Screen::from_route("/"), Screen::Landing);
        assert_eq!(Screen::from_route("/discovery/articles"), Screen::DiscoveryArticles);
        assert_eq!(
            Screen::from_route("/collection/abc-123"),
            Screen::Collection("abc-123".to_string())
        );
        assert_eq!(Screen::from_route("/collection/"), Screen::NotFound);
        assert_eq!(Screen::from_route("/nope"), Screen::NotFound);
        assert!(!Screen::NotFound.requires_session());
        assert!(Screen::Account.requires_session());
    }

    #[test]
    fn date_input_parsing() {
        assert_eq!(parse_date_input("").unwrap(), None);
        assert_eq!(
            parse_date_input(" 2024-02-29 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(matches!(
            parse_date_input("29/02/2024"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn cycling_options_wraps_to_all() {
        let options = vec![String::new(), "Biology".to_string(), "Physics".to_string()];
        assert_eq!(next_option(&options, ""), "Biology");
        assert_eq!(next_option(&options, "Physics"), "");
        assert_eq!(next_option(&options, "Unknown"), "Biology");
    }

    #[tokio::test]
    async fn protected_screens_need_a_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;

        app.navigate(Screen::Saved).await;
        assert_eq!(app.screen, Screen::Landing);
        assert_eq!(
            app.notice.as_ref().map(|n| n.message.as_str()),
            Some("Please sign in to continue")
        );

        app.navigate(Screen::SignIn).await;
        assert_eq!(app.input_mode(), InputMode::Form);
    }

    #[tokio::test]
    async fn sharing_private_collection_shows_notice_without_requests() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut service = CollectionService::new(
            Arc::clone(&app.rest),
            "u1",
            Url::parse("https://benchfeed.example.org").unwrap(),
        );
        service.collections = vec![collection("c1", false)];
        app.session = Some(session());
        app.collections = Some(service);
        app.screen = Screen::Collections;

        app.handle_action(AppAction::ShareCollection).await.unwrap();
        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.kind, NoticeKind::Info);
        assert_eq!(notice.message, "Only public collections can be shared");
    }

    #[tokio::test]
    async fn delete_asks_for_confirmation_first() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut service = CollectionService::new(
            Arc::clone(&app.rest),
            "u1",
            Url::parse("https://benchfeed.example.org").unwrap(),
        );
        service.collections = vec![collection("c1", true)];
        app.session = Some(session());
        app.collections = Some(service);
        app.screen = Screen::Collections;

        app.handle_action(AppAction::DeleteCollection).await.unwrap();
        assert_eq!(app.input_mode(), InputMode::Confirm);

        app.handle_action(AppAction::Back).await.unwrap();
        assert!(app.popup.is_none());
        assert_eq!(app.collections.as_ref().unwrap().collections.len(), 1);
    }

    #[test]
    fn visibility_answers() {
        assert!(!parse_visibility("").unwrap());
        assert!(!parse_visibility(" No ").unwrap());
        assert!(parse_visibility("y").unwrap());
        assert!(parse_visibility("PUBLIC").unwrap());
        assert!(matches!(parse_visibility("maybe"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn detail_popup_shows_the_selected_article() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;
        let mut article = crate::models::fixtures::article("a2", "Second");
        article.category_description = Some("Gene editing".to_string());
        app.session = Some(session());
        app.screen = Screen::Saved;
        app.saved_list = vec![
            SavedArticle {
                article: crate::models::fixtures::article("a1", "First"),
                saved_at: "2024-01-01T00:00:00Z".to_string(),
            },
            SavedArticle {
                article,
                saved_at: "2024-01-02T00:00:00Z".to_string(),
            },
        ];
        app.selected_index = 1;

        app.handle_action(AppAction::ShowDetail).await.unwrap();
        assert_eq!(app.input_mode(), InputMode::Detail);
        match &app.popup {
            Some(Popup::Article(shown)) => {
                assert_eq!(shown.id, "a2");
                assert_eq!(shown.category_description.as_deref(), Some("Gene editing"));
            }
            other => panic!("unexpected popup: {other:?}"),
        }

        // Keys that only make sense on the list are ignored while it is open
        app.handle_action(AppAction::MoveUp).await.unwrap();
        assert_eq!(app.selected_index, 1);

        app.handle_action(AppAction::Cite).await.unwrap();
        assert_eq!(app.input_mode(), InputMode::Citation);
        app.handle_action(AppAction::Back).await.unwrap();
        assert!(app.popup.is_none());
    }

    #[tokio::test]
    async fn new_collection_form_sends_description_and_visibility() {
        use wiremock::matchers::{body_json, method, path};

        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/collections"))
            .and(body_json(json!({
                "name": "Reading",
                "description": "Papers for the journal club",
                "is_public": true,
                "user_id": "u1"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "c1", "name": "Reading", "description": "Papers for the journal club",
                "is_public": true, "user_id": "u1", "collection_articles": [{"count": 0}]
            }])))
            .mount(&server)
            .await;

        app.session = Some(session());
        app.collections = Some(CollectionService::new(
            Arc::clone(&app.rest),
            "u1",
            Url::parse("https://benchfeed.example.org").unwrap(),
        ));
        app.screen = Screen::Collections;

        app.handle_action(AppAction::NewCollection).await.unwrap();
        assert_eq!(app.input_mode(), InputMode::Form);
        let type_text = |text: &str| text.chars().map(AppAction::InputChar).collect::<Vec<_>>();
        let mut keys = type_text("Reading");
        keys.push(AppAction::Select);
        keys.extend(type_text("Papers for the journal club"));
        keys.push(AppAction::Select);
        keys.extend(type_text("maybe"));
        keys.push(AppAction::Select);
        for key in keys {
            app.handle_action(key).await.unwrap();
        }

        // An unclear answer keeps the form open with an error
        let form = app.form.as_ref().unwrap();
        assert!(form.error.is_some());

        for _ in 0..5 {
            app.handle_action(AppAction::InputBackspace).await.unwrap();
        }
        app.handle_action(AppAction::InputChar('y')).await.unwrap();
        app.handle_action(AppAction::Select).await.unwrap();

        assert!(app.form.is_none());
        let collections = &app.collections.as_ref().unwrap().collections;
        assert_eq!(collections.len(), 1);
        assert!(collections[0].is_public);
    }

    #[tokio::test]
    async fn description_edit_patches_only_the_description() {
        use wiremock::matchers::{body_json, method, path, query_param};

        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/collections"))
            .and(query_param("id", "eq.c1"))
            .and(body_json(json!({"description": "Weekly reading"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut service = CollectionService::new(
            Arc::clone(&app.rest),
            "u1",
            Url::parse("https://benchfeed.example.org").unwrap(),
        );
        service.collections = vec![collection("c1", false)];
        app.session = Some(session());
        app.collections = Some(service);
        app.screen = Screen::Collections;

        app.handle_action(AppAction::StartInput(InputPurpose::CollectionDescription))
            .await
            .unwrap();
        for c in "Weekly reading".chars() {
            app.handle_action(AppAction::InputChar(c)).await.unwrap();
        }
        app.handle_action(AppAction::Select).await.unwrap();

        assert!(app.popup.is_none());
        assert_eq!(
            app.notice.as_ref().map(|n| n.message.as_str()),
            Some("Collection updated")
        );
    }

    #[tokio::test]
    async fn preference_rows_edit_the_draft() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server, &dir).await;
        app.session = Some(session());
        app.screen = Screen::Discovery;
        app.draft_preferences.add_include_keyword("CRISPR");

        assert_eq!(app.preference_rows(), vec![PrefRow::Include("CRISPR".to_string())]);
        assert!(app.preferences_dirty());

        app.handle_action(AppAction::Select).await.unwrap();
        assert!(app.draft_preferences.include_keywords.is_empty());
        assert!(!app.preferences_dirty());
    }
}
