//! Selection and transition controller
//!
//! Holds the selected asset and the layout flag, and runs the debounce that
//! keeps the detail panel on the previous asset until the transition window
//! elapses. Only the most recent selection ever lands.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use crate::{
    config::DashboardConfig,
    mapper::find_by_id,
    types::{Asset, DashboardEvent, EventKind, SelectionState},
};

/// Result of `select_asset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Selection moved to a new asset; a transition is running
    Changed,
    /// The asset was already selected
    Unchanged,
    /// Id not in the current list; nothing changed
    NotFound,
}

struct SelectionInner {
    state: SelectionState,
    /// Asset the detail panel shows; lags `selected_asset_id` by the debounce window
    displayed_asset_id: Option<String>,
    viewport_width: f64,
    transition_seq: u64,
    pending: Option<JoinHandle<()>>,
}

/// Owns `SelectionState` and the pending transition task
pub struct SelectionController {
    inner: Arc<RwLock<SelectionInner>>,
    events: broadcast::Sender<DashboardEvent>,
    debounce: Duration,
    narrow_viewport_max_width: f64,
}

impl SelectionController {
    pub fn new(config: &DashboardConfig, events: broadcast::Sender<DashboardEvent>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SelectionInner {
                state: SelectionState::default(),
                displayed_asset_id: None,
                viewport_width: config.initial_viewport_width,
                transition_seq: 0,
                pending: None,
            })),
            events,
            debounce: config.transition_debounce,
            narrow_viewport_max_width: config.narrow_viewport_max_width,
        }
    }

    /// Selects `id` if it is in `assets`
    ///
    /// On narrow viewports the list collapses; on wide ones it is left alone.
    /// A change of asset starts (or restarts) the transition window.
    pub async fn select_asset(&self, id: &str, assets: &[Asset]) -> SelectOutcome {
        let Some(asset) = find_by_id(id, assets) else {
            tracing::debug!(asset_id = id, "Selected asset is not in the current list");
            return SelectOutcome::NotFound;
        };

        let mut inner = self.inner.write().await;
        self.select_locked(&mut inner, asset)
    }

    /// Selects the first (highest-rank) asset when nothing is selected yet
    ///
    /// The emptiness check and the selection happen under one write lock, so
    /// a user selection can never be overwritten by the auto-selection.
    pub async fn auto_select(&self, assets: &[Asset]) -> Option<String> {
        let first = assets.first()?;

        let mut inner = self.inner.write().await;
        if inner.state.selected_asset_id.is_some() {
            return None;
        }
        match self.select_locked(&mut inner, first) {
            SelectOutcome::Changed => {
                tracing::info!(asset_id = %first.id, "Auto-selected top asset");
                Some(first.id.clone())
            }
            SelectOutcome::Unchanged | SelectOutcome::NotFound => None,
        }
    }

    fn select_locked(&self, inner: &mut SelectionInner, asset: &Asset) -> SelectOutcome {
        if inner.viewport_width <= self.narrow_viewport_max_width {
            inner.state.list_expanded = false;
        }

        if inner.state.selected_asset_id.as_deref() == Some(asset.id.as_str()) {
            return SelectOutcome::Unchanged;
        }

        inner.state.selected_asset_id = Some(asset.id.clone());
        self.start_transition(inner, asset.id.clone());
        let list_expanded = inner.state.list_expanded;

        tracing::debug!(asset_id = %asset.id, list_expanded, "Selection changed");
        self.emit(EventKind::SelectionChanged {
            asset_id: asset.id.clone(),
            list_expanded,
        });
        SelectOutcome::Changed
    }

    fn start_transition(&self, inner: &mut SelectionInner, asset_id: String) {
        if let Some(pending) = inner.pending.take() {
            pending.abort();
            tracing::trace!("Cancelled pending transition");
        }

        inner.transition_seq += 1;
        inner.state.transitioning = true;

        let seq = inner.transition_seq;
        let shared = self.inner.clone();
        let events = self.events.clone();
        let debounce = self.debounce;

        inner.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let mut inner = shared.write().await;
            if inner.transition_seq != seq {
                return;
            }
            inner.displayed_asset_id = Some(asset_id.clone());
            inner.state.transitioning = false;
            inner.pending = None;
            drop(inner);

            tracing::debug!(asset_id = %asset_id, "Transition completed");
            let _ = events.send(DashboardEvent::new(EventKind::TransitionCompleted { asset_id }));
        }));
    }

    /// Direct user override of the list layout
    pub async fn toggle_list(&self, expanded: bool) {
        self.inner.write().await.state.list_expanded = expanded;
        self.emit(EventKind::ListToggled { expanded });
    }

    pub async fn set_viewport_width(&self, width: f64) {
        self.inner.write().await.viewport_width = width;
    }

    /// Aborts a pending transition; the detail panel keeps its current asset
    pub async fn cancel_pending(&self) {
        let mut inner = self.inner.write().await;
        if let Some(pending) = inner.pending.take() {
            pending.abort();
        }
        inner.transition_seq += 1;
        inner.state.transitioning = false;
    }

    pub async fn state(&self) -> SelectionState {
        self.inner.read().await.state.clone()
    }

    pub async fn selected_asset_id(&self) -> Option<String> {
        self.inner.read().await.state.selected_asset_id.clone()
    }

    pub async fn displayed_asset_id(&self) -> Option<String> {
        self.inner.read().await.displayed_asset_id.clone()
    }

    fn emit(&self, kind: EventKind) {
        let _ = self.events.send(DashboardEvent::new(kind));
    }
}
