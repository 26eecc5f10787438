//! The news desk: today's brew, starred articles and per-card speech state.
//!
//! Every change is written through the [`LocalStore`]. Store write failures are
//! logged and otherwise ignored, so the in-memory state stays authoritative for
//! the rest of the run.

use chrono::NaiveDate;
use providers::GenerativeClient;
use shared::news::NewsArticle;
use shared::DripError;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::audio::{decode_speech, AudioBuffer, AudioContext};
use crate::store::{LocalStore, PersistedState};

pub const BREW_FAILED: &str = "Failed to brew your daily drip. This may be due to an invalid API key or network issues. Please try again later.";
pub const AUDIO_FAILED: &str = "Could not play audio.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Brewing,
    News,
}

/// Where decoded speech goes. Returns how long the clip plays for.
pub trait AudioSink {
    fn play(&self, buffer: &AudioBuffer) -> Result<Duration, DripError>;
}

impl AudioSink for AudioContext {
    fn play(&self, buffer: &AudioBuffer) -> Result<Duration, DripError> {
        AudioContext::play(self, buffer)?;
        Ok(Duration::from_secs_f32(buffer.duration_secs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    Playing,
    /// That card is still playing.
    Skipped,
    /// The card's error is set.
    Failed,
    UnknownHeadline,
}

/// `M/D/YYYY`, the stored last-brew format.
pub fn short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

pub struct NewsDesk {
    store: LocalStore,
    state: PersistedState,
    today: NaiveDate,
    screen: Screen,
    error: Option<String>,
    speaking_until: HashMap<String, Instant>,
    card_errors: HashMap<String, String>,
}

impl NewsDesk {
    /// Load persisted state. A brew from an earlier day is discarded.
    pub fn open(store: LocalStore, today: NaiveDate) -> Self {
        let state = store.load();
        let mut desk = Self {
            store,
            state,
            today,
            screen: Screen::Home,
            error: None,
            speaking_until: HashMap::new(),
            card_errors: HashMap::new(),
        };
        if desk.state.last_brew_date != short_date(today) {
            tracing::debug!(last = %desk.state.last_brew_date, "new day, clearing brew");
            desk.state.brewed_today = false;
            desk.state.news.clear();
            desk.persist();
        }
        desk
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn news(&self) -> &[NewsArticle] {
        &self.state.news
    }

    pub fn starred(&self) -> &[NewsArticle] {
        &self.state.starred
    }

    pub fn brewed_today(&self) -> bool {
        self.state.brewed_today
    }

    pub fn dark_mode(&self) -> bool {
        self.state.dark_mode
    }

    pub fn card_error(&self, headline: &str) -> Option<&str> {
        self.card_errors.get(headline).map(String::as_str)
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.state) {
            tracing::warn!("could not save desk state: {}", err);
        }
    }

    /// Fetch today's articles. On failure the generic brew error is shown and
    /// the desk returns home; the underlying error is returned for logging.
    pub async fn brew(&mut self, client: &dyn GenerativeClient) -> Result<usize, DripError> {
        self.error = None;
        self.screen = Screen::Brewing;
        match client.fetch_daily_news().await {
            Ok(drafts) => {
                self.state.news = drafts.into_iter().map(NewsArticle::from).collect();
                self.state.brewed_today = true;
                self.state.last_brew_date = short_date(self.today);
                self.screen = Screen::News;
                self.persist();
                tracing::info!(count = self.state.news.len(), "brewed");
                Ok(self.state.news.len())
            }
            Err(err) => {
                tracing::error!("brew failed: {}", err);
                self.error = Some(BREW_FAILED.to_string());
                self.screen = Screen::Home;
                Err(err)
            }
        }
    }

    pub fn brew_again(&mut self) {
        self.state.news.clear();
        self.state.brewed_today = false;
        self.screen = Screen::Home;
        self.persist();
    }

    /// Flip the star on today's article. Returns the new flag, or `None` when
    /// no article has that headline (any starred copies are still dropped).
    pub fn toggle_star(&mut self, headline: &str) -> Option<bool> {
        let toggled = self
            .state
            .news
            .iter_mut()
            .find(|a| a.headline == headline)
            .map(|article| {
                article.is_starred = !article.is_starred;
                article.clone()
            });

        match &toggled {
            Some(article) if article.is_starred => self.state.starred.push(article.clone()),
            _ => self.state.starred.retain(|a| a.headline != headline),
        }
        self.persist();
        toggled.map(|a| a.is_starred)
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.state.dark_mode = !self.state.dark_mode;
        self.persist();
        self.state.dark_mode
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Home;
        self.error = None;
    }

    pub fn is_speaking(&self, headline: &str) -> bool {
        self.speaking_until
            .get(headline)
            .is_some_and(|until| Instant::now() < *until)
    }

    /// Read one card aloud. Failures only touch that card's error.
    pub async fn speak(
        &mut self,
        client: &dyn GenerativeClient,
        sink: &dyn AudioSink,
        headline: &str,
    ) -> SpeakOutcome {
        if self.is_speaking(headline) {
            return SpeakOutcome::Skipped;
        }
        let Some(text) = self
            .state
            .news
            .iter()
            .find(|a| a.headline == headline)
            .map(NewsArticle::spoken_text)
        else {
            return SpeakOutcome::UnknownHeadline;
        };

        self.card_errors.remove(headline);
        match synthesize_and_play(client, sink, &text).await {
            Ok(length) => {
                self.speaking_until
                    .insert(headline.to_string(), Instant::now() + length);
                SpeakOutcome::Playing
            }
            Err(err) => {
                tracing::error!(headline, "voice brew failed: {}", err);
                self.speaking_until.remove(headline);
                self.card_errors
                    .insert(headline.to_string(), AUDIO_FAILED.to_string());
                SpeakOutcome::Failed
            }
        }
    }
}

async fn synthesize_and_play(
    client: &dyn GenerativeClient,
    sink: &dyn AudioSink,
    text: &str,
) -> Result<Duration, DripError> {
    let audio = client.synthesize_speech(text).await?;
    let buffer = decode_speech(&audio)?;
    sink.play(&buffer)
}
