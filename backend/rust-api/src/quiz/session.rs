use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use super::cancel::CancelSignal;
use super::fetcher::{fetch_unique, Fetched, DEFAULT_MAX_ATTEMPTS};
use super::hints::HintTracker;
use super::source::ItemSource;
use super::timer::{CountdownTimer, DEFAULT_TICK};
use super::lock;
use crate::error::{FetchError, QuizError};
use crate::models::{
    Answer, AnswerOutcome, GameSettings, HintCategory, HintValue, Progress, Question,
    SessionPhase, SessionSnapshot, SessionState,
};

pub const BASE_POINTS: u32 = 100;
pub const DEFAULT_HINTS: u32 = 3;
/// Declared for product parity; scoring does not cap the multiplier.
pub const MAX_STREAK_MULTIPLIER: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizRules {
    pub base_points: u32,
    pub default_hints: u32,
    pub max_fetch_attempts: usize,
    pub tick: Duration,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            base_points: BASE_POINTS,
            default_hints: DEFAULT_HINTS,
            max_fetch_attempts: DEFAULT_MAX_ATTEMPTS,
            tick: DEFAULT_TICK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Another load was pending; nothing was started.
    AlreadyLoading,
    /// The load was superseded or cancelled and left the session untouched.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    NextQuestion(LoadOutcome),
    GameOver,
}

pub struct QuizSessionBuilder {
    source: Arc<dyn ItemSource>,
    settings: GameSettings,
    rules: QuizRules,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl QuizSessionBuilder {
    #[must_use]
    pub fn rules(mut self, rules: QuizRules) -> Self {
        self.rules = rules;
        self
    }

    /// Randomness used to shuffle answer options.
    #[must_use]
    pub fn rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidSettings` for unsupported settings.
    pub fn build(self) -> Result<Arc<QuizSession>, QuizError> {
        self.settings.validate()?;

        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(StdRng::from_os_rng()));
        let Self {
            source,
            settings,
            rules,
            ..
        } = self;

        Ok(Arc::new_cyclic(|weak: &Weak<QuizSession>| {
            let timer = settings.time_per_question.map(|seconds| {
                let timer = CountdownTimer::with_tick(seconds, rules.tick);
                let weak = weak.clone();
                timer.set_expiry_handler(move || {
                    if let Some(session) = weak.upgrade() {
                        session.submit_answer(Answer::TimedOut);
                    }
                });
                timer
            });

            QuizSession {
                source,
                settings,
                rules,
                rng: Mutex::new(rng),
                timer,
                inner: Mutex::new(SessionInner::default()),
            }
        }))
    }
}

/// One quiz run from start to game over.
///
/// Loads are serialized by an in-flight flag and tagged with an epoch; a
/// load whose epoch is no longer current when it resolves is discarded
/// without touching the session.
pub struct QuizSession {
    source: Arc<dyn ItemSource>,
    settings: GameSettings,
    rules: QuizRules,
    rng: Mutex<Box<dyn RngCore + Send>>,
    timer: Option<CountdownTimer>,
    inner: Mutex<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    phase: SessionPhase,
    state: SessionState,
    question: Option<Question>,
    hints: HintTracker,
    loading: bool,
    epoch: u64,
    pending: Option<CancelSignal>,
    error: Option<String>,
}

impl SessionInner {
    /// Preempts any pending load and opens a new epoch for the caller.
    fn claim_load(&mut self) -> (u64, CancelSignal) {
        if let Some(previous) = self.pending.take() {
            previous.cancel();
        }
        self.epoch += 1;
        self.loading = true;
        let signal = CancelSignal::new();
        self.pending = Some(signal.clone());
        (self.epoch, signal)
    }

    fn abandon_load(&mut self) -> bool {
        let had_pending = self.pending.is_some();
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.epoch += 1;
        self.loading = false;
        had_pending
    }
}

impl QuizSession {
    pub fn builder(source: Arc<dyn ItemSource>, settings: GameSettings) -> QuizSessionBuilder {
        QuizSessionBuilder {
            source,
            settings,
            rules: QuizRules::default(),
            rng: None,
        }
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidSettings` for unsupported settings.
    pub fn new(
        source: Arc<dyn ItemSource>,
        settings: GameSettings,
    ) -> Result<Arc<Self>, QuizError> {
        Self::builder(source, settings).build()
    }

    /// Loads the first question, then resets the session around it.
    ///
    /// The reset is applied only once the first question is available, so a
    /// failed start leaves the previous phase and state in place.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionStart` when the first question cannot be loaded.
    pub async fn start(&self) -> Result<LoadOutcome, QuizError> {
        let (epoch, signal) = {
            let mut inner = self.lock_inner();
            inner.error = None;
            inner.claim_load()
        };
        tracing::info!(
            "Starting quiz: tier={}, choices={}, questions={}",
            self.settings.difficulty,
            self.settings.number_of_choices,
            self.settings.question_count
        );

        let result = self.fetch_question(&signal).await;

        let mut inner = self.lock_inner();
        if inner.epoch != epoch {
            tracing::debug!("Discarding superseded start load");
            return Ok(LoadOutcome::Cancelled);
        }
        inner.loading = false;
        inner.pending = None;

        match result {
            Ok(Fetched::Complete(question)) => {
                inner.state = SessionState::fresh(self.rules.default_hints);
                inner.phase = SessionPhase::InProgress;
                self.install_question(&mut inner, question);
                Ok(LoadOutcome::Loaded)
            }
            Ok(Fetched::Cancelled) => Ok(LoadOutcome::Cancelled),
            Err(err) => {
                tracing::error!("Failed to start quiz: {}", err);
                inner.error = Some(err.to_string());
                Err(QuizError::SessionStart(err))
            }
        }
    }

    /// Loads a question for the current index. A call made while another
    /// load is pending does nothing and reports `AlreadyLoading`.
    ///
    /// # Errors
    ///
    /// `QuizError::NotActive` outside of a running game,
    /// `QuizError::QuestionLoad` when the fetch fails. The previous question
    /// stays in place on failure.
    pub async fn load_question(&self) -> Result<LoadOutcome, QuizError> {
        let (epoch, signal) = {
            let mut inner = self.lock_inner();
            if inner.phase != SessionPhase::InProgress {
                return Err(QuizError::NotActive);
            }
            if inner.loading {
                tracing::debug!("Load already in progress, skipping");
                return Ok(LoadOutcome::AlreadyLoading);
            }
            inner.error = None;
            inner.claim_load()
        };
        self.finish_load(epoch, signal).await
    }

    /// Scores the active question. Returns `None` when there is no active
    /// question or it was already answered.
    pub fn submit_answer(&self, answer: Answer) -> Option<AnswerOutcome> {
        let mut inner = self.lock_inner();
        if inner.phase != SessionPhase::InProgress {
            return None;
        }

        let question = inner.question.as_mut()?;
        if question.answered {
            return None;
        }
        question.answered = true;
        let correct_id = question.target.id;

        let correct = matches!(answer, Answer::Choice(id) if id == correct_id);
        let timed_out = answer == Answer::TimedOut;
        let state = &mut inner.state;

        let points_awarded = if correct {
            let multiplier = state.streak.saturating_add(1).max(1);
            let points = self.rules.base_points.saturating_mul(multiplier);
            state.score = state.score.saturating_add(points);
            state.streak += 1;
            state.correct_count += 1;
            points
        } else {
            state.streak = 0;
            state.wrong_count += 1;
            0
        };
        let streak = state.streak;

        if let Some(timer) = &self.timer {
            timer.pause();
        }

        tracing::debug!(
            "Answer scored: question={}, correct={}, timed_out={}, points={}, streak={}",
            inner.state.question_index,
            correct,
            timed_out,
            points_awarded,
            streak
        );

        Some(AnswerOutcome {
            correct,
            timed_out,
            points_awarded,
            correct_id,
            streak,
        })
    }

    /// Moves to the next question, or ends the game after the last one.
    ///
    /// # Errors
    ///
    /// `QuizError::NotActive` outside of a running game,
    /// `QuizError::QuestionLoad` when the next question cannot be loaded.
    pub async fn advance(&self) -> Result<AdvanceOutcome, QuizError> {
        let (epoch, signal) = {
            let mut inner = self.lock_inner();
            if inner.phase != SessionPhase::InProgress {
                return Err(QuizError::NotActive);
            }
            inner.state.question_index += 1;
            inner.hints.clear();

            if inner.state.question_index >= self.settings.question_count {
                self.finish(&mut inner);
                return Ok(AdvanceOutcome::GameOver);
            }

            self.reset_timer();
            inner.error = None;
            inner.claim_load()
        };

        self.finish_load(epoch, signal)
            .await
            .map(AdvanceOutcome::NextQuestion)
    }

    /// Ends the game immediately. Returns `false` if no game was running.
    pub fn end_game(&self) -> bool {
        let mut inner = self.lock_inner();
        if inner.phase != SessionPhase::InProgress {
            return false;
        }
        self.finish(&mut inner);
        true
    }

    /// Cancels a pending load, e.g. when the player leaves the game screen.
    /// Returns whether a load was pending.
    pub fn cancel_pending(&self) -> bool {
        let cancelled = self.lock_inner().abandon_load();
        if cancelled {
            tracing::info!("Question loading was cancelled");
        }
        cancelled
    }

    /// Reveals a hint for the active question and spends one from the budget.
    pub fn use_hint(&self, category: HintCategory) -> bool {
        let mut inner = self.lock_inner();
        if inner.phase != SessionPhase::InProgress || inner.question.is_none() {
            return false;
        }
        let remaining = inner.state.hints_remaining;
        if !inner.hints.reveal(category, remaining) {
            return false;
        }
        inner.state.hints_remaining -= 1;
        inner.state.hints_used += 1;
        true
    }

    pub fn hint_value(&self, category: HintCategory) -> Option<HintValue> {
        let inner = self.lock_inner();
        let question = inner.question.as_ref()?;
        inner.hints.value_for(category, &question.target)
    }

    pub fn can_use_hint(&self) -> bool {
        let inner = self.lock_inner();
        inner.question.is_some() && inner.hints.can_reveal_more(inner.state.hints_remaining)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock_inner();
        let total = self.settings.question_count;
        let current = (inner.state.question_index + 1).min(total);

        SessionSnapshot {
            phase: inner.phase,
            state: inner.state,
            question: inner.question.clone(),
            is_loading: inner.loading,
            error: inner.error.clone(),
            revealed_hints: inner.hints.revealed(),
            progress: Progress {
                current,
                total,
                percentage: f64::from(current) / f64::from(total) * 100.0,
            },
            time_remaining: self.timer.as_ref().map(CountdownTimer::remaining),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock_inner().state
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_inner().phase
    }

    pub fn current_question(&self) -> Option<Question> {
        self.lock_inner().question.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock_inner().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_inner().loading
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn timer(&self) -> Option<&CountdownTimer> {
        self.timer.as_ref()
    }

    async fn finish_load(
        &self,
        epoch: u64,
        signal: CancelSignal,
    ) -> Result<LoadOutcome, QuizError> {
        let result = self.fetch_question(&signal).await;

        let mut inner = self.lock_inner();
        if inner.epoch != epoch {
            tracing::debug!("Discarding superseded question load");
            return Ok(LoadOutcome::Cancelled);
        }
        inner.loading = false;
        inner.pending = None;

        match result {
            Ok(Fetched::Complete(question)) => {
                self.install_question(&mut inner, question);
                Ok(LoadOutcome::Loaded)
            }
            Ok(Fetched::Cancelled) => Ok(LoadOutcome::Cancelled),
            Err(err) => {
                tracing::error!(
                    "Error loading question {}: {}",
                    inner.state.question_index,
                    err
                );
                inner.error = Some(err.to_string());
                Err(QuizError::QuestionLoad(err))
            }
        }
    }

    async fn fetch_question(&self, signal: &CancelSignal) -> Result<Fetched<Question>, FetchError> {
        let count = self.settings.number_of_choices;
        let tier = self.settings.difficulty;

        let fetched = fetch_unique(
            count,
            || self.source.random_item(Some(tier)),
            self.rules.max_fetch_attempts,
            signal,
        )
        .await?;

        let mut options = match fetched {
            Fetched::Complete(items) => items,
            Fetched::Cancelled => return Ok(Fetched::Cancelled),
        };
        let target = options
            .first()
            .cloned()
            .ok_or(FetchError::InsufficientUniqueItems {
                needed: count,
                got: 0,
                attempts: 0,
            })?;
        options.shuffle(&mut **lock(&self.rng));

        Ok(Fetched::Complete(Question {
            target,
            options,
            answered: false,
        }))
    }

    fn install_question(&self, inner: &mut SessionInner, question: Question) {
        tracing::debug!(
            "Question {} ready: target={}",
            inner.state.question_index,
            question.target.id
        );
        inner.question = Some(question);
        inner.hints.clear();
        inner.error = None;
        if let (Some(timer), Some(seconds)) = (&self.timer, self.settings.time_per_question) {
            timer.reset(seconds);
            timer.start();
        }
    }

    fn finish(&self, inner: &mut SessionInner) {
        inner.abandon_load();
        inner.phase = SessionPhase::Over;
        inner.state.is_over = true;
        inner.question = None;
        inner.hints.clear();
        self.reset_timer();
        tracing::info!(
            "Quiz over: score={}, correct={}, wrong={}",
            inner.state.score,
            inner.state.correct_count,
            inner.state.wrong_count
        );
    }

    fn reset_timer(&self) {
        if let (Some(timer), Some(seconds)) = (&self.timer, self.settings.time_per_question) {
            timer.reset(seconds);
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        lock(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemSourceError;
    use crate::models::{Pokemon, TierId};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn pokemon(id: u32) -> Pokemon {
        Pokemon {
            id,
            name: format!("Mon{}", id),
            sprite: format!("https://img.example/{}.png", id),
            cry_url: String::new(),
            types: vec!["fire".to_string()],
            stats: vec![],
        }
    }

    /// Yields ids 1, 2, 3, ... in order; optionally fails every draw.
    #[derive(Default)]
    struct SequentialSource {
        next: AtomicU32,
        failing: AtomicBool,
    }

    #[async_trait]
    impl ItemSource for SequentialSource {
        async fn random_item(
            &self,
            _tier: Option<TierId>,
        ) -> Result<Option<Pokemon>, ItemSourceError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ItemSourceError::network("offline"));
            }
            Ok(Some(pokemon(self.next.fetch_add(1, Ordering::SeqCst) + 1)))
        }
    }

    /// Blocks every draw until `release` is set.
    struct GatedSource {
        open: tokio::sync::watch::Receiver<bool>,
        ids: Mutex<VecDeque<u32>>,
    }

    #[async_trait]
    impl ItemSource for GatedSource {
        async fn random_item(
            &self,
            _tier: Option<TierId>,
        ) -> Result<Option<Pokemon>, ItemSourceError> {
            let mut open = self.open.clone();
            loop {
                let is_open = *open.borrow();
                if is_open {
                    break;
                }
                if open.changed().await.is_err() {
                    return Ok(None);
                }
            }
            let id = lock(&self.ids).pop_front().unwrap_or(999);
            Ok(Some(pokemon(id)))
        }
    }

    fn settings(question_count: u32) -> GameSettings {
        GameSettings {
            question_count,
            time_per_question: None,
            ..GameSettings::default()
        }
    }

    fn session_with(source: Arc<dyn ItemSource>, settings: GameSettings) -> Arc<QuizSession> {
        QuizSession::builder(source, settings)
            .rng(StdRng::seed_from_u64(7))
            .build()
            .unwrap()
    }

    fn answer_correctly(session: &QuizSession) -> AnswerOutcome {
        let target = session.current_question().unwrap().target.id;
        session.submit_answer(Answer::Choice(target)).unwrap()
    }

    fn answer_wrong(session: &QuizSession) -> AnswerOutcome {
        let question = session.current_question().unwrap();
        let wrong = question
            .options
            .iter()
            .find(|p| p.id != question.target.id)
            .unwrap()
            .id;
        session.submit_answer(Answer::Choice(wrong)).unwrap()
    }

    #[tokio::test]
    async fn start_resets_state_and_builds_question() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(10));
        assert_eq!(session.phase(), SessionPhase::NotStarted);

        assert_eq!(session.start().await.unwrap(), LoadOutcome::Loaded);

        let state = session.state();
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(state, SessionState::fresh(DEFAULT_HINTS));

        let question = session.current_question().unwrap();
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.target.id, 1);
        assert_eq!(
            question
                .options
                .iter()
                .filter(|p| p.id == question.target.id)
                .count(),
            1
        );
        let mut ids: Vec<u32> = question.options.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn six_choice_games_get_six_options() {
        let session = session_with(
            Arc::new(SequentialSource::default()),
            GameSettings {
                number_of_choices: 6,
                ..settings(3)
            },
        );
        session.start().await.unwrap();
        assert_eq!(session.current_question().unwrap().options.len(), 6);
    }

    #[test]
    fn unsupported_settings_are_rejected() {
        let source: Arc<dyn ItemSource> = Arc::new(SequentialSource::default());
        let bad_choices = GameSettings {
            number_of_choices: 5,
            ..settings(3)
        };
        assert!(matches!(
            QuizSession::new(Arc::clone(&source), bad_choices),
            Err(QuizError::InvalidSettings(_))
        ));
        assert!(matches!(
            QuizSession::new(source, settings(0)),
            Err(QuizError::InvalidSettings(_))
        ));
    }

    #[tokio::test]
    async fn consecutive_correct_answers_apply_streak_multiplier() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(10));
        session.start().await.unwrap();

        // Multiplier is the streak before the answer plus one: 1, 2, 3.
        let mut awarded = Vec::new();
        for _ in 0..3 {
            awarded.push(answer_correctly(&session).points_awarded);
            session.advance().await.unwrap();
        }

        assert_eq!(awarded, vec![100, 200, 300]);
        let state = session.state();
        assert_eq!(state.score, 600);
        assert_eq!(state.streak, 3);
        assert_eq!(state.correct_count, 3);
    }

    #[tokio::test]
    async fn streak_multiplier_is_not_capped() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(15));
        session.start().await.unwrap();

        let mut last = 0;
        for _ in 0..12 {
            last = answer_correctly(&session).points_awarded;
            session.advance().await.unwrap();
        }

        // MAX_STREAK_MULTIPLIER is declared but intentionally not applied.
        assert_eq!(last, BASE_POINTS * 12);
        assert!(last > BASE_POINTS * MAX_STREAK_MULTIPLIER);
    }

    #[tokio::test]
    async fn wrong_answer_after_streak_resets_it() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(10));
        session.start().await.unwrap();
        for _ in 0..5 {
            answer_correctly(&session);
            session.advance().await.unwrap();
        }
        let before = session.state();
        assert_eq!(before.streak, 5);

        let outcome = answer_wrong(&session);
        assert!(!outcome.correct);
        assert_eq!(outcome.points_awarded, 0);

        let after = session.state();
        assert_eq!(after.streak, 0);
        assert_eq!(after.wrong_count, 1);
        assert_eq!(after.score, before.score);
    }

    #[tokio::test]
    async fn timeout_counts_as_wrong_answer() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(3));
        session.start().await.unwrap();
        answer_correctly(&session);
        session.advance().await.unwrap();

        let outcome = session.submit_answer(Answer::TimedOut).unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.correct);

        let state = session.state();
        assert_eq!(state.streak, 0);
        assert_eq!(state.wrong_count, 1);
    }

    #[tokio::test]
    async fn question_is_scored_once() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(3));
        session.start().await.unwrap();
        answer_correctly(&session);

        assert_eq!(session.submit_answer(Answer::TimedOut), None);
        let target = session.current_question().unwrap().target.id;
        assert_eq!(session.submit_answer(Answer::Choice(target)), None);
        assert_eq!(session.state().score, 100);
    }

    #[test]
    fn submit_without_active_question_is_noop() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(3));
        assert_eq!(session.submit_answer(Answer::Choice(1)), None);
        assert_eq!(session.state(), SessionState::default());
    }

    #[tokio::test]
    async fn advance_past_last_question_ends_game() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(2));
        session.start().await.unwrap();

        assert_eq!(
            session.advance().await.unwrap(),
            AdvanceOutcome::NextQuestion(LoadOutcome::Loaded)
        );
        assert_eq!(session.state().question_index, 1);

        assert_eq!(session.advance().await.unwrap(), AdvanceOutcome::GameOver);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Over);
        assert!(snapshot.state.is_over);
        assert!(snapshot.question.is_none());
        assert!(matches!(
            session.advance().await,
            Err(QuizError::NotActive)
        ));
    }

    #[tokio::test]
    async fn end_game_clears_question() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(5));
        session.start().await.unwrap();
        assert!(session.end_game());
        assert_eq!(session.phase(), SessionPhase::Over);
        assert!(session.current_question().is_none());
        assert!(!session.end_game());
    }

    #[tokio::test]
    async fn hints_spend_budget_once_per_category() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(5));
        session.start().await.unwrap();

        assert!(session.use_hint(HintCategory::Types));
        assert!(!session.use_hint(HintCategory::Types));
        let state = session.state();
        assert_eq!(state.hints_remaining, DEFAULT_HINTS - 1);
        assert_eq!(state.hints_used, 1);
        assert_eq!(
            session.hint_value(HintCategory::Types),
            Some(HintValue::Text("fire".to_string()))
        );
        assert_eq!(session.hint_value(HintCategory::FirstLetter), None);
    }

    #[tokio::test]
    async fn hint_budget_is_shared_across_questions() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(5));
        session.start().await.unwrap();
        assert!(session.use_hint(HintCategory::Types));
        assert!(session.use_hint(HintCategory::FirstLetter));

        session.advance().await.unwrap();
        assert!(session.snapshot().revealed_hints.is_empty());
        assert!(session.use_hint(HintCategory::Types));
        assert!(!session.use_hint(HintCategory::FirstLetter));
        assert!(!session.can_use_hint());

        let state = session.state();
        assert_eq!(state.hints_remaining, 0);
        assert_eq!(state.hints_remaining + state.hints_used, DEFAULT_HINTS);
    }

    #[tokio::test]
    async fn failed_start_keeps_session_not_started() {
        let source = Arc::new(SequentialSource::default());
        source.failing.store(true, Ordering::SeqCst);
        let session = session_with(source.clone(), settings(5));

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, QuizError::SessionStart(_)));
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert!(session.error().is_some());
        assert!(!session.is_loading());

        source.failing.store(false, Ordering::SeqCst);
        assert_eq!(session.start().await.unwrap(), LoadOutcome::Loaded);
        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn failed_advance_keeps_previous_question_until_retry() {
        let source = Arc::new(SequentialSource::default());
        let session = session_with(source.clone(), settings(5));
        session.start().await.unwrap();
        answer_correctly(&session);
        let previous = session.current_question().unwrap();

        source.failing.store(true, Ordering::SeqCst);
        let err = session.advance().await.unwrap_err();
        assert!(matches!(err, QuizError::QuestionLoad(_)));
        assert_eq!(session.current_question(), Some(previous.clone()));
        assert!(session.error().is_some());
        assert_eq!(session.state().score, 100);

        source.failing.store(false, Ordering::SeqCst);
        assert_eq!(session.load_question().await.unwrap(), LoadOutcome::Loaded);
        let next = session.current_question().unwrap();
        assert_ne!(next.target.id, previous.target.id);
        assert!(!next.answered);
        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn load_question_requires_running_game() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(5));
        assert!(matches!(
            session.load_question().await,
            Err(QuizError::NotActive)
        ));
    }

    fn gated(ids: impl IntoIterator<Item = u32>) -> (Arc<GatedSource>, tokio::sync::watch::Sender<bool>) {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let source = Arc::new(GatedSource {
            open: rx,
            ids: Mutex::new(ids.into_iter().collect()),
        });
        (source, tx)
    }

    #[tokio::test]
    async fn second_load_while_pending_is_skipped() {
        let (source, gate) = gated(1..=100);
        let session = session_with(source, settings(5));
        gate.send(true).unwrap();
        session.start().await.unwrap();
        gate.send(false).unwrap();

        let first = session.load_question();
        let second = async {
            tokio::task::yield_now().await;
            let outcome = session.load_question().await;
            gate.send(true).unwrap();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), LoadOutcome::Loaded);
        assert_eq!(second.unwrap(), LoadOutcome::AlreadyLoading);
    }

    #[tokio::test]
    async fn cancelled_load_leaves_state_untouched() {
        let (source, gate) = gated(1..=100);
        let session = session_with(source, settings(5));
        gate.send(true).unwrap();
        session.start().await.unwrap();
        answer_correctly(&session);
        gate.send(false).unwrap();

        let before = session.snapshot();
        let load = session.advance();
        let cancel = async {
            tokio::task::yield_now().await;
            assert!(session.is_loading());
            assert!(session.cancel_pending());
            gate.send(true).unwrap();
        };
        let (outcome, _) = tokio::join!(load, cancel);

        assert_eq!(
            outcome.unwrap(),
            AdvanceOutcome::NextQuestion(LoadOutcome::Cancelled)
        );
        let after = session.snapshot();
        assert_eq!(after.question, before.question);
        assert_eq!(after.state.score, before.state.score);
        assert_eq!(after.error, None);
        assert!(!after.is_loading);
    }

    #[tokio::test]
    async fn stale_load_cannot_overwrite_after_game_ends() {
        let (source, gate) = gated(1..=100);
        let session = session_with(source, settings(5));
        gate.send(true).unwrap();
        session.start().await.unwrap();
        gate.send(false).unwrap();

        let load = session.load_question();
        let end = async {
            tokio::task::yield_now().await;
            assert!(session.end_game());
            gate.send(true).unwrap();
        };
        let (outcome, _) = tokio::join!(load, end);

        assert_eq!(outcome.unwrap(), LoadOutcome::Cancelled);
        assert_eq!(session.phase(), SessionPhase::Over);
        assert!(session.current_question().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_expiry_submits_timeout() {
        let session = QuizSession::builder(
            Arc::new(SequentialSource::default()),
            GameSettings {
                time_per_question: Some(3),
                ..settings(5)
            },
        )
        .rng(StdRng::seed_from_u64(1))
        .build()
        .unwrap();
        session.start().await.unwrap();
        answer_correctly(&session);
        session.advance().await.unwrap();
        assert_eq!(session.snapshot().time_remaining, Some(3));

        tokio::time::sleep(Duration::from_millis(3_100)).await;

        let state = session.state();
        assert_eq!(state.wrong_count, 1);
        assert_eq!(state.streak, 0);
        assert_eq!(session.snapshot().time_remaining, Some(0));
        assert_eq!(session.submit_answer(Answer::TimedOut), None);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_pauses_timer() {
        let session = QuizSession::builder(
            Arc::new(SequentialSource::default()),
            GameSettings {
                time_per_question: Some(10),
                ..settings(5)
            },
        )
        .build()
        .unwrap();
        session.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        answer_correctly(&session);
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(session.snapshot().time_remaining, Some(8));
        assert_eq!(session.state().wrong_count, 0);
    }

    #[tokio::test]
    async fn progress_tracks_question_index() {
        let session = session_with(Arc::new(SequentialSource::default()), settings(4));
        session.start().await.unwrap();
        session.advance().await.unwrap();

        let progress = session.snapshot().progress;
        assert_eq!(progress.current, 2);
        assert_eq!(progress.total, 4);
        assert!((progress.percentage - 50.0).abs() < f64::EPSILON);
    }
}
