//! Command orchestration.
//!
//! Drives each transcript through the pipeline: pattern match first, model
//! interpretation when the match is absent or flagged for it, then
//! execution against the tab host or the page channel. Every stage failure
//! drops to the next fallback tier (AI → matched pattern → keyword scan);
//! only exhaustion of the final tier is a no-op, logged and swallowed. The
//! whole entry point never returns an error.
//!
//! Overlapping transcripts are not mutually excluded; pipelines may
//! interleave if recognition outruns execution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::action::{
    CanonicalAction, CommandCategory, MatchResult, NavigationOp, PatternAction, ScrollDirection,
    ScrollType,
};
use crate::bridge::{ensure_page_ready, PageChannel, ELEMENTS_TIMEOUT, INTERACT_TIMEOUT, SCROLL_TIMEOUT};
use crate::errors::{CommandError, Result};
use crate::interpreter::{normalize_url, search_url, wants_element_interaction, Interpreter};
use crate::llm::LlmClient;
use crate::page::interact::InteractionKind;
use crate::page::inventory::PageSnapshot;
use crate::page::{PageRequest, PageResponse};
use crate::patterns::match_transcript;
use crate::selector::CURRENT_POSITION;
use crate::session::Session;
use crate::tabs::{find_target_tab, parse_tab_ordinal, TabHost};

const TAB_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Which tier ultimately handled a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Dropped: the session was not listening
    Ignored,
    /// A matched pattern executed directly, no model involved
    Direct,
    /// The model's canonical action executed
    Ai,
    /// The model failed; the matched pattern executed instead
    PatternFallback,
    /// The keyword scanner acted as the last line of defense
    KeywordFallback,
    /// Every tier exhausted without an action
    NoOp,
}

pub struct Orchestrator {
    session: Session,
    tabs: Arc<dyn TabHost>,
    page: Arc<dyn PageChannel>,
    interpreter: Interpreter,
}

impl Orchestrator {
    pub fn new(
        session: Session,
        tabs: Arc<dyn TabHost>,
        page: Arc<dyn PageChannel>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            session,
            tabs,
            page,
            interpreter: Interpreter::new(llm),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one transcript through the pipeline. Exactly one source of truth
    /// executes per transcript: the pattern match, or the model's action as
    /// an override when the match is absent or flagged for AI.
    #[instrument(skip(self))]
    pub async fn handle_transcript(&self, raw: &str) -> Resolution {
        if !self.session.is_listening() {
            info!("session not listening, dropping transcript");
            return Resolution::Ignored;
        }

        let transcript = raw.trim().to_lowercase();
        self.session.record_transcript(&transcript);

        let matched = match_transcript(&transcript);
        debug!(?matched, "pattern matching finished");

        if matched.matched && !matched.use_ai {
            match self.execute_direct(&matched).await {
                Ok(()) => Resolution::Direct,
                Err(err) => {
                    warn!(%err, "direct execution failed");
                    self.keyword_fallback(&transcript).await
                }
            }
        } else {
            let fallback = matched.is_executable().then_some(&matched);
            self.process_with_ai(&transcript, fallback).await
        }
    }

    /// The AI tier: gather tab context (and the element inventory for
    /// interaction-flavored transcripts), interpret, execute. Any failure
    /// falls through to the pattern candidate, then the keyword scanner.
    async fn process_with_ai(
        &self,
        transcript: &str,
        fallback: Option<&MatchResult>,
    ) -> Resolution {
        let tabs = match self
            .bounded(self.tabs.list_tabs(), "tab listing")
            .await
        {
            Ok(tabs) => tabs,
            Err(err) => {
                warn!(%err, "could not list tabs for AI context");
                return self.fallback_tiers(transcript, fallback).await;
            }
        };

        let snapshot = if wants_element_interaction(transcript) {
            self.gather_page_snapshot().await
        } else {
            None
        };

        let action = self
            .interpreter
            .interpret(transcript, &tabs, snapshot.as_ref())
            .await;

        if action.is_none() {
            debug!("model produced no usable action");
            return self.fallback_tiers(transcript, fallback).await;
        }

        info!(?action, "executing model action");
        if let Err(err) = self.execute_action(action).await {
            warn!(%err, "model action execution failed");
        }
        Resolution::Ai
    }

    /// Element inventory for model context. The page capability is
    /// re-verified first; a page that stays silent just means no inventory.
    async fn gather_page_snapshot(&self) -> Option<PageSnapshot> {
        if let Err(err) = ensure_page_ready(&*self.page).await {
            warn!(%err, "page not ready, continuing without element context");
            return None;
        }
        match self
            .page
            .request(PageRequest::GetPageElements, ELEMENTS_TIMEOUT)
            .await
        {
            Ok(PageResponse::Snapshot(snapshot)) => Some(snapshot),
            Ok(_) => None,
            Err(err) => {
                warn!(%err, "element extraction failed");
                None
            }
        }
    }

    async fn fallback_tiers(
        &self,
        transcript: &str,
        fallback: Option<&MatchResult>,
    ) -> Resolution {
        if let Some(matched) = fallback {
            info!("falling back to matched pattern execution");
            match self.execute_direct(matched).await {
                Ok(()) => return Resolution::PatternFallback,
                Err(err) => warn!(%err, "pattern fallback failed"),
            }
        }
        self.keyword_fallback(transcript).await
    }

    /// Last line of defense: a bare keyword scan. Always terminates without
    /// an error.
    async fn keyword_fallback(&self, transcript: &str) -> Resolution {
        if transcript.contains("scroll") {
            let direction = if transcript.contains("up") {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };
            if let Err(err) = self.page_scroll(PageRequest::Scroll { direction }).await {
                warn!(%err, "keyword scroll failed");
            }
            Resolution::KeywordFallback
        } else if transcript.contains("click") {
            if let Err(err) = self
                .page_interact(CURRENT_POSITION, InteractionKind::Click, None)
                .await
            {
                warn!(%err, "keyword click failed");
            }
            Resolution::KeywordFallback
        } else if transcript.contains("stop") || transcript.contains("quit") {
            self.session.stop_listening();
            Resolution::KeywordFallback
        } else {
            info!("every fallback tier exhausted, dropping command");
            Resolution::NoOp
        }
    }

    /// Execute a matched pattern without model involvement
    async fn execute_direct(&self, matched: &MatchResult) -> Result<()> {
        let (Some(category), Some(action)) = (matched.category, matched.action) else {
            return Ok(());
        };
        debug!(?category, ?action, params = ?matched.params, "executing matched command");

        match category {
            CommandCategory::Scrolling => {
                let request = match action {
                    PatternAction::Up => PageRequest::Scroll {
                        direction: ScrollDirection::Up,
                    },
                    PatternAction::Down => PageRequest::Scroll {
                        direction: ScrollDirection::Down,
                    },
                    PatternAction::Top => PageRequest::AdvancedScroll {
                        scroll_type: ScrollType::ToPercent,
                        percent: 0.0,
                        pages: 1.0,
                        direction: Some(ScrollDirection::Up),
                    },
                    PatternAction::Bottom => PageRequest::AdvancedScroll {
                        scroll_type: ScrollType::ToPercent,
                        percent: 100.0,
                        pages: 1.0,
                        direction: Some(ScrollDirection::Down),
                    },
                    _ => return Ok(()),
                };
                self.page_scroll(request).await
            }
            CommandCategory::Clicking => match action {
                PatternAction::SimpleClick => {
                    self.page_interact(CURRENT_POSITION, InteractionKind::Click, None)
                        .await
                }
                PatternAction::ElementClick => {
                    let Some(target) = matched.params.first() else {
                        return Ok(());
                    };
                    let selector = format!("[text='{target}']");
                    self.page_interact(&selector, InteractionKind::Click, None)
                        .await
                }
                _ => Ok(()),
            },
            CommandCategory::Navigation => self.execute_navigation(action, &matched.params).await,
            CommandCategory::System => {
                if action == PatternAction::Stop {
                    self.session.stop_listening();
                }
                Ok(())
            }
            // Text entry has no modelless execution path; the keyword tier
            // picks the command up if the model never did
            CommandCategory::Input => {
                debug!("input command has no direct execution");
                Ok(())
            }
        }
    }

    async fn execute_navigation(&self, action: PatternAction, params: &[String]) -> Result<()> {
        match action {
            PatternAction::NewTab => {
                self.bounded(self.tabs.create_tab(None), "tab creation")
                    .await?;
                Ok(())
            }
            PatternAction::CloseTab => {
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.close_tab(active.id), "tab close")
                    .await
            }
            PatternAction::SwitchTab => {
                let Some(word) = params.first() else {
                    return Err(CommandError::NavigationTargetMissing);
                };
                let ordinal = parse_tab_ordinal(word)
                    .ok_or_else(|| CommandError::TabNotFound(word.clone()))?;
                let tabs = self.bounded(self.tabs.list_tabs(), "tab listing").await?;
                let index = ordinal.to_index(tabs.len());
                let tab = tabs
                    .get(index.wrapping_sub(1))
                    .ok_or_else(|| CommandError::TabNotFound(word.clone()))?;
                self.bounded(self.tabs.activate_tab(tab.id), "tab activation")
                    .await?;
                self.bounded(self.tabs.focus_window(tab.window_id), "window focus")
                    .await
            }
            PatternAction::GoBack => {
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.go_back(active.id), "history back")
                    .await
            }
            PatternAction::GoForward => {
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.go_forward(active.id), "history forward")
                    .await
            }
            // URL navigation normally routes through the model; this is the
            // fallback path working from the captured parameter alone
            PatternAction::NavigateToUrl => {
                let Some(target) = params.first() else {
                    return Err(CommandError::NavigationTargetMissing);
                };
                let url = normalize_url(target);
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.navigate(active.id, &url), "navigation")
                    .await
            }
            PatternAction::Search => {
                let Some(query) = params.first() else {
                    return Err(CommandError::NavigationTargetMissing);
                };
                let url = search_url(query);
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.navigate(active.id, &url), "navigation")
                    .await
            }
            _ => Ok(()),
        }
    }

    /// Dispatch a canonical action to the tab host or the page
    async fn execute_action(&self, action: CanonicalAction) -> Result<()> {
        match action {
            CanonicalAction::None => Ok(()),
            CanonicalAction::Click { selector } => {
                self.page_interact(&selector, InteractionKind::Click, None)
                    .await
            }
            CanonicalAction::Input { selector, value } => {
                self.page_interact(&selector, InteractionKind::Input, Some(value))
                    .await
            }
            CanonicalAction::Select { selector, value } => {
                self.page_interact(&selector, InteractionKind::Select, Some(value))
                    .await
            }
            CanonicalAction::Scroll { direction } => {
                self.page_scroll(PageRequest::Scroll { direction }).await
            }
            CanonicalAction::AdvancedScroll {
                scroll_type,
                percent,
                pages,
                direction,
            } => {
                self.page_scroll(PageRequest::AdvancedScroll {
                    scroll_type,
                    percent,
                    pages,
                    direction: Some(direction),
                })
                .await
            }
            CanonicalAction::Navigation { op } => self.execute_navigation_op(op).await,
            CanonicalAction::NavigateToUrl { url, new_tab } => {
                if new_tab {
                    self.bounded(self.tabs.create_tab(Some(&url)), "tab creation")
                        .await?;
                    Ok(())
                } else {
                    let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                    self.bounded(self.tabs.navigate(active.id, &url), "navigation")
                        .await
                }
            }
        }
    }

    async fn execute_navigation_op(&self, op: NavigationOp) -> Result<()> {
        match op {
            NavigationOp::Back => {
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.go_back(active.id), "history back")
                    .await
            }
            NavigationOp::Forward => {
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.go_forward(active.id), "history forward")
                    .await
            }
            NavigationOp::NewTab => {
                self.bounded(self.tabs.create_tab(None), "tab creation")
                    .await?;
                Ok(())
            }
            NavigationOp::CloseTab => {
                let active = self.bounded(self.tabs.active_tab(), "active tab").await?;
                self.bounded(self.tabs.close_tab(active.id), "tab close")
                    .await
            }
            NavigationOp::SwitchTab { target } => {
                // An unresolved target is "not found", never a crash
                let target = target.ok_or(CommandError::NavigationTargetMissing)?;
                let tabs = self.bounded(self.tabs.list_tabs(), "tab listing").await?;
                let tab = find_target_tab(&tabs, &target)
                    .ok_or_else(|| CommandError::TabNotFound(format!("{target:?}")))?
                    .clone();
                self.bounded(self.tabs.activate_tab(tab.id), "tab activation")
                    .await?;
                self.bounded(self.tabs.focus_window(tab.window_id), "window focus")
                    .await
            }
        }
    }

    async fn page_interact(
        &self,
        selector: &str,
        kind: InteractionKind,
        value: Option<String>,
    ) -> Result<()> {
        ensure_page_ready(&*self.page).await?;
        let response = self
            .page
            .request(
                PageRequest::InteractWithElement {
                    selector: selector.to_string(),
                    interaction_type: kind,
                    value,
                },
                INTERACT_TIMEOUT,
            )
            .await?;

        if let PageResponse::Outcome(outcome) = &response {
            if !outcome.success {
                warn!(selector, error = ?outcome.error, "interaction reported failure");
            } else {
                debug!(selector, method = ?outcome.method, "interaction succeeded");
            }
        }
        Ok(())
    }

    async fn page_scroll(&self, request: PageRequest) -> Result<()> {
        ensure_page_ready(&*self.page).await?;
        self.page.request(request, SCROLL_TIMEOUT).await?;
        Ok(())
    }

    /// Bound a tab host call; a timeout is equivalent to failure
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T>> + Send,
        what: &str,
    ) -> Result<T> {
        tokio::time::timeout(TAB_CALL_TIMEOUT, fut)
            .await
            .map_err(|_| CommandError::Timeout(TAB_CALL_TIMEOUT, what.to_string()))?
    }
}
