//! Market dashboard service
//!
//! Wires the asset-list and price-history coordinators, the selection
//! controller and the chart sync engine together. Presentation code gets a
//! cheap-to-clone handle instead of a shared global context.

use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{
    chart::{ChartRenderer, ChartSync, RenderTarget, SyncOutcome},
    config::DashboardConfig,
    constants::EVENT_CHANNEL_CAPACITY,
    error::ProviderError,
    fetch::{FetchCoordinator, FetchFuture, FetchSnapshot},
    mapper::{find_by_id, map_asset_list, map_price_history},
    metrics::FetchMetrics,
    provider::MarketDataProvider,
    providers::CoinGeckoProvider,
    selection::{SelectOutcome, SelectionController},
    types::{
        Asset, ComponentHealth, Concern, DashboardEvent, EventKind, HealthStatus, PricePoint,
        RequestStatus, SelectionState,
    },
};

/// Trigger key of the asset list concern (there is only one list)
const ASSET_LIST_KEY: &str = "markets";

/// Mounted detail view: its chart and the asset currently plotted
struct DetailView {
    chart: ChartSync,
    plotted_asset_id: Option<String>,
}

/// Market board state and commands
///
/// # Example
/// ```no_run
/// use market_board_sdk::MarketDashboard;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let dashboard = MarketDashboard::new()?;
/// let mut events = dashboard.subscribe();
/// dashboard.start().await;
///
/// while let Ok(event) = events.recv().await {
///     println!("{}", event);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MarketDashboard {
    provider: Arc<dyn MarketDataProvider>,
    assets: Arc<FetchCoordinator<Vec<Asset>>>,
    history: Arc<FetchCoordinator<Vec<PricePoint>>>,
    selection: Arc<SelectionController>,
    detail: Arc<Mutex<Option<DetailView>>>,
    /// Held from a selection change until its history fetch is triggered
    select_gate: Arc<Mutex<()>>,
    events: broadcast::Sender<DashboardEvent>,
    driver: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl MarketDashboard {
    /// Creates a dashboard backed by CoinGecko
    ///
    /// The API base URL can be overridden with `MARKET_DATA_API_URL`.
    pub fn new() -> Result<Self, ProviderError> {
        let config = DashboardConfig::from_env();
        let provider = Arc::new(CoinGeckoProvider::new(&config)?);
        Ok(Self::with_provider(provider, config))
    }

    /// Creates a dashboard with a custom provider
    ///
    /// This is primarily for testing with mock providers.
    pub fn with_provider(provider: Arc<dyn MarketDataProvider>, config: DashboardConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            provider,
            assets: Arc::new(FetchCoordinator::new(Concern::AssetList, events.clone())),
            history: Arc::new(FetchCoordinator::new(Concern::PriceHistory, events.clone())),
            selection: Arc::new(SelectionController::new(&config, events.clone())),
            detail: Arc::new(Mutex::new(None)),
            select_gate: Arc::new(Mutex::new(())),
            events,
            driver: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts the reaction driver and the first asset list fetch
    ///
    /// Calling it again while the driver runs only re-triggers the list
    /// fetch, which is a no-op unless the last one failed.
    pub async fn start(&self) {
        {
            let mut driver = self.driver.lock().await;
            let running = driver.as_ref().is_some_and(|h| !h.is_finished());
            if !running {
                let rx = self.events.subscribe();
                let this = self.clone();
                *driver = Some(tokio::spawn(async move { this.run_driver(rx).await }));
            }
        }

        self.load_assets().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    async fn run_driver(self, mut rx: broadcast::Receiver<DashboardEvent>) {
        tracing::info!(provider = self.provider_name(), "Starting dashboard driver");

        loop {
            match rx.recv().await {
                Ok(event) => self.react(event.kind).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dashboard driver lagged, resynchronizing");
                    self.auto_select().await;
                    self.refresh_chart().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn react(&self, kind: EventKind) {
        match kind {
            EventKind::FetchSucceeded {
                concern: Concern::AssetList,
                ..
            } => {
                self.auto_select().await;
                // a history that settled while the list was reloading is drawn now
                self.refresh_chart().await;
            }
            EventKind::FetchSucceeded {
                concern: Concern::PriceHistory,
                key,
                ..
            } => self.sync_chart(&key).await,
            EventKind::FetchStarted {
                concern: Concern::PriceHistory,
                ..
            }
            | EventKind::FetchFailed {
                concern: Concern::PriceHistory,
                ..
            } => self.clear_chart().await,
            _ => {}
        }
    }

    fn asset_list_fetch(&self) -> FetchFuture<Vec<Asset>> {
        let provider = self.provider.clone();
        async move {
            let raw = provider.fetch_markets().await?;
            let assets = map_asset_list(raw)?;
            Ok::<_, ProviderError>(assets)
        }
        .boxed()
    }

    /// Fetches the asset list unless it is already loading or loaded
    pub async fn load_assets(&self) -> Option<u64> {
        self.assets
            .trigger(ASSET_LIST_KEY, self.asset_list_fetch())
            .await
    }

    /// Fetches the asset list again regardless of its current state
    pub async fn reload_assets(&self) -> u64 {
        self.assets
            .begin_fetch(ASSET_LIST_KEY, self.asset_list_fetch())
            .await
    }

    async fn trigger_history(&self, asset_id: &str) -> Option<u64> {
        let provider = self.provider.clone();
        let id = asset_id.to_string();
        let fetch = async move {
            let raw = provider.fetch_price_history(&id).await?;
            let points = map_price_history(raw)?;
            Ok::<_, ProviderError>(points)
        }
        .boxed();

        self.history.trigger(asset_id, fetch).await
    }

    async fn auto_select(&self) {
        let Some(assets) = self.assets.data().await else {
            return;
        };
        let _gate = self.select_gate.lock().await;
        if let Some(asset_id) = self.selection.auto_select(&assets).await {
            self.trigger_history(&asset_id).await;
        }
    }

    /// Selects an asset of the current list and fetches its history
    ///
    /// Ids missing from the list (or a list that is not loaded) leave the
    /// selection untouched. Re-selecting the current asset re-fetches its
    /// history only if the previous attempt failed.
    pub async fn select_asset(&self, asset_id: &str) -> SelectOutcome {
        let Some(assets) = self.assets.data().await else {
            tracing::debug!(asset_id, "Asset list not loaded, ignoring selection");
            return SelectOutcome::NotFound;
        };

        let _gate = self.select_gate.lock().await;
        let outcome = self.selection.select_asset(asset_id, &assets).await;
        if outcome != SelectOutcome::NotFound {
            self.trigger_history(asset_id).await;
        }
        outcome
    }

    pub async fn toggle_list(&self, expanded: bool) {
        self.selection.toggle_list(expanded).await;
    }

    pub async fn set_viewport_width(&self, width: f64) {
        self.selection.set_viewport_width(width).await;
    }

    /// Brings the mounted chart in line with the price history concern
    async fn refresh_chart(&self) {
        let history = self.history.snapshot().await;
        match (history.status, history.key) {
            (RequestStatus::Success, Some(key)) => self.sync_chart(&key).await,
            _ => self.clear_chart().await,
        }
    }

    /// Blanks the mounted chart so no previous asset's series stays visible
    async fn clear_chart(&self) {
        let mut detail = self.detail.lock().await;
        let Some(view) = detail.as_mut() else {
            return;
        };
        if view.plotted_asset_id.take().is_none() {
            return;
        }
        if view.chart.clear() {
            let target = view.chart.target().name().to_string();
            self.emit(EventKind::ChartCleared { target });
        }
    }

    /// Draws or updates the mounted chart with the history loaded for `key`
    async fn sync_chart(&self, key: &str) {
        let history = self.history.snapshot().await;
        if history.key.as_deref() != Some(key) {
            return;
        }
        let Some(points) = history.into_data() else {
            return;
        };

        let change = self
            .assets
            .data()
            .await
            .and_then(|assets| find_by_id(key, &assets).map(|a| a.change_24h));
        let Some(change) = change else {
            tracing::debug!(asset_id = key, "Charted asset is not in the current list");
            return;
        };

        let mut detail = self.detail.lock().await;
        let Some(view) = detail.as_mut() else {
            tracing::trace!("No detail view mounted");
            return;
        };

        let target = view.chart.target().name().to_string();
        let asset_id = key.to_string();
        match view.chart.sync(&points, change) {
            Ok(SyncOutcome::Drawn) => {
                view.plotted_asset_id = Some(asset_id.clone());
                self.emit(EventKind::ChartDrawn { target, asset_id });
            }
            Ok(SyncOutcome::Updated) => {
                view.plotted_asset_id = Some(asset_id.clone());
                self.emit(EventKind::ChartUpdated { target, asset_id });
            }
            Err(e) => {
                tracing::warn!(target_name = %target, asset_id = %asset_id, error = %e, "Chart sync failed");
            }
        }
    }

    /// Mounts the detail view's chart on `target`
    ///
    /// A view that is already mounted is replaced and its chart destroyed.
    /// If the selected asset's history is already loaded it is drawn at once.
    pub async fn mount_detail(&self, target: RenderTarget, renderer: Box<dyn ChartRenderer>) {
        let previous = self.detail.lock().await.replace(DetailView {
            chart: ChartSync::new(target, renderer),
            plotted_asset_id: None,
        });
        if let Some(view) = previous {
            self.release(view);
        }

        self.refresh_chart().await;
    }

    /// Unmounts the detail view and destroys its chart
    pub async fn unmount_detail(&self) {
        let view = self.detail.lock().await.take();
        if let Some(view) = view {
            self.release(view);
        }
    }

    fn release(&self, mut view: DetailView) {
        let target = view.chart.target().name().to_string();
        if view.chart.destroy() {
            self.emit(EventKind::ChartDestroyed { target });
        }
    }

    /// Asset currently plotted by the mounted chart, if any
    pub async fn plotted_asset_id(&self) -> Option<String> {
        self.detail
            .lock()
            .await
            .as_ref()
            .and_then(|view| view.plotted_asset_id.clone())
    }

    pub async fn assets(&self) -> FetchSnapshot<Vec<Asset>> {
        self.assets.snapshot().await
    }

    pub async fn price_history(&self) -> FetchSnapshot<Vec<PricePoint>> {
        self.history.snapshot().await
    }

    pub async fn selection(&self) -> SelectionState {
        self.selection.state().await
    }

    /// The selected asset, looked up in the current list
    pub async fn selected_asset(&self) -> Option<Asset> {
        let id = self.selection.selected_asset_id().await?;
        let assets = self.assets.data().await?;
        find_by_id(&id, &assets).cloned()
    }

    /// The asset the detail panel shows (lags the selection during a transition)
    pub async fn displayed_asset(&self) -> Option<Asset> {
        let id = self.selection.displayed_asset_id().await?;
        let assets = self.assets.data().await?;
        find_by_id(&id, &assets).cloned()
    }

    pub async fn fetch_metrics(&self, concern: Concern) -> FetchMetrics {
        match concern {
            Concern::AssetList => self.assets.metrics().await,
            Concern::PriceHistory => self.history.metrics().await,
        }
    }

    /// Stops the driver, abandons in-flight work and releases the chart
    pub async fn shutdown(&self) {
        if let Some(driver) = self.driver.lock().await.take() {
            driver.abort();
        }
        self.assets.cancel().await;
        self.history.cancel().await;
        self.selection.cancel_pending().await;
        self.unmount_detail().await;
        tracing::info!("Dashboard shut down");
    }

    /// Perform a health check on the dashboard
    ///
    /// # Returns
    /// ComponentHealth reflecting the status of both fetch concerns
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = std::collections::HashMap::new();

        let assets = self.assets.snapshot().await;
        let history = self.history.snapshot().await;
        let asset_count = assets.data().map(|a| a.len()).unwrap_or(0);

        details.insert(
            "asset_list_status".to_string(),
            serde_json::json!(assets.status),
        );
        details.insert(
            "price_history_status".to_string(),
            serde_json::json!(history.status),
        );
        details.insert("asset_count".to_string(), serde_json::json!(asset_count));
        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider_name()),
        );
        details.insert(
            "selected_asset".to_string(),
            serde_json::json!(self.selection.selected_asset_id().await),
        );

        let status = if assets.status == RequestStatus::Error {
            HealthStatus::Unhealthy
        } else if history.status == RequestStatus::Error {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => format!("Market board has {} assets", asset_count),
            HealthStatus::Degraded => "Price history failed to load".to_string(),
            HealthStatus::Unhealthy => "Asset list failed to load".to_string(),
        };

        ComponentHealth {
            name: "market_dashboard".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }

    fn emit(&self, kind: EventKind) {
        let _ = self.events.send(DashboardEvent::new(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::mock::{
        count, is_clear, is_create, is_destroy, is_update, ChartCall, RecordingRenderer,
    };
    use crate::constants::{GAIN_COLOR, LOSS_COLOR};
    use crate::mapper::fixtures::{raw_asset, raw_history};
    use crate::provider::mock::{MockFailure, MockProvider};
    use std::time::Duration;

    fn provider() -> Arc<MockProvider> {
        let provider = MockProvider::new();
        provider.set_markets(vec![
            raw_asset("bitcoin", "BTC", 1, 67000.0, 1.5),
            raw_asset("ethereum", "ETH", 2, 3500.0, -2.0),
        ]);
        provider.set_history(
            "bitcoin",
            raw_history(&[66000.0, 66500.0, 67000.0]),
            Duration::from_millis(100),
        );
        provider.set_history(
            "ethereum",
            raw_history(&[3600.0, 3550.0, 3500.0]),
            Duration::from_millis(100),
        );
        Arc::new(provider)
    }

    fn dashboard(provider: Arc<MockProvider>, width: f64) -> MarketDashboard {
        let config = DashboardConfig::default().with_viewport_width(width);
        MarketDashboard::with_provider(provider, config)
    }

    async fn wait_for(
        rx: &mut broadcast::Receiver<DashboardEvent>,
        pred: impl Fn(&EventKind) -> bool,
    ) -> EventKind {
        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event.kind) => return event.kind,
                    Ok(_) => continue,
                    Err(e) => panic!("event channel error: {}", e),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(60), wait)
            .await
            .expect("timed out waiting for event")
    }

    fn chart_drawn(kind: &EventKind) -> bool {
        matches!(kind, EventKind::ChartDrawn { .. })
    }

    fn chart_updated(kind: &EventKind) -> bool {
        matches!(kind, EventKind::ChartUpdated { .. })
    }

    fn chart_cleared(kind: &EventKind) -> bool {
        matches!(kind, EventKind::ChartCleared { .. })
    }

    fn list_loaded(kind: &EventKind) -> bool {
        matches!(kind, EventKind::FetchSucceeded { concern: Concern::AssetList, .. })
    }

    fn last_update(calls: &std::sync::Mutex<Vec<ChartCall>>) -> Option<(Vec<f64>, (u8, u8, u8))> {
        calls.lock().unwrap().iter().rev().find_map(|call| match call {
            ChartCall::Update { spec, .. } => {
                let stroke = spec.palette.stroke;
                Some((spec.values.clone(), (stroke.r, stroke.g, stroke.b)))
            }
            _ => None,
        })
    }

    fn selected(id: &'static str) -> impl Fn(&EventKind) -> bool {
        move |kind| matches!(kind, EventKind::SelectionChanged { asset_id, .. } if asset_id == id)
    }

    fn transitioned(id: &'static str) -> impl Fn(&EventKind) -> bool {
        move |kind| matches!(kind, EventKind::TransitionCompleted { asset_id } if asset_id == id)
    }

    fn history_settled(kind: &EventKind) -> bool {
        matches!(
            kind,
            EventKind::FetchSucceeded { concern: Concern::PriceHistory, .. }
                | EventKind::FetchFailed { concern: Concern::PriceHistory, .. }
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_auto_selects_top_asset() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, transitioned("bitcoin")).await;

        assert_eq!(dashboard.assets().await.status, RequestStatus::Success);
        assert_eq!(
            dashboard.selection().await.selected_asset_id.as_deref(),
            Some("bitcoin")
        );
        assert_eq!(dashboard.displayed_asset().await.map(|a| a.symbol), Some("BTC".to_string()));
        assert_eq!(provider.history_calls(), vec!["bitcoin".to_string()]);
        assert_eq!(provider.market_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_selection_supersedes_slow_chart_fetch() {
        let provider = provider();
        provider.set_history(
            "bitcoin",
            raw_history(&[66000.0, 67000.0]),
            Duration::from_secs(2),
        );
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, selected("bitcoin")).await;
        assert_eq!(dashboard.select_asset("ethereum").await, SelectOutcome::Changed);

        let drawn = wait_for(&mut rx, chart_drawn).await;
        assert_eq!(
            drawn,
            EventKind::ChartDrawn {
                target: "detail-chart".into(),
                asset_id: "ethereum".into()
            }
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count(&calls, is_create), 1);
        assert_eq!(count(&calls, is_update), 0);
        match calls.lock().unwrap().first() {
            Some(ChartCall::Create { spec, .. }) => {
                assert_eq!(spec.values, vec![3600.0, 3550.0, 3500.0])
            }
            other => panic!("expected create, got {:?}", other),
        }
        assert_eq!(
            dashboard.price_history().await.key.as_deref(),
            Some("ethereum")
        );
        assert_eq!(
            dashboard
                .fetch_metrics(Concern::PriceHistory)
                .await
                .superseded_requests,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_chart_drawn_once_then_updated_in_place() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;

        dashboard.select_asset("ethereum").await;
        wait_for(&mut rx, chart_updated).await;
        dashboard.select_asset("bitcoin").await;
        wait_for(&mut rx, chart_updated).await;

        assert_eq!(count(&calls, is_create), 1);
        assert_eq!(count(&calls, is_update), 2);
        assert_eq!(count(&calls, is_destroy), 0);
        let first_update = calls.lock().unwrap().iter().find_map(|call| match call {
            ChartCall::Update { spec, .. } => Some(spec.palette.stroke),
            _ => None,
        });
        assert_eq!(
            first_update.map(|stroke| (stroke.r, stroke.g, stroke.b)),
            Some(LOSS_COLOR)
        );
        assert_eq!(dashboard.plotted_asset_id().await.as_deref(), Some("bitcoin"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_destroys_and_remount_draws_again() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;
        dashboard.unmount_detail().await;
        assert_eq!(count(&calls, is_destroy), 1);

        // history already loaded: the new view draws immediately
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart-2"), Box::new(renderer))
            .await;
        assert_eq!(count(&calls, is_create), 1);
        assert_eq!(provider.history_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_view_destroys_previous_chart() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (first, first_calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("a"), Box::new(first))
            .await;
        let mut rx = dashboard.subscribe();
        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;

        let (second, second_calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("b"), Box::new(second))
            .await;

        assert_eq!(count(&first_calls, is_destroy), 1);
        assert_eq!(count(&second_calls, is_create), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_while_loading_never_draws() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, selected("bitcoin")).await;
        dashboard.unmount_detail().await;
        wait_for(&mut rx, history_settled).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_before_list_loads_is_ignored() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 600.0);

        assert_eq!(dashboard.select_asset("bitcoin").await, SelectOutcome::NotFound);
        assert_eq!(dashboard.selection().await, SelectionState::default());
        assert!(provider.history_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_asset_leaves_selection_unchanged() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let mut rx = dashboard.subscribe();
        dashboard.start().await;
        wait_for(&mut rx, transitioned("bitcoin")).await;

        let before = dashboard.selection().await;
        assert_eq!(dashboard.select_asset("dogecoin").await, SelectOutcome::NotFound);
        assert_eq!(dashboard.selection().await, before);
        assert_eq!(provider.history_calls(), vec!["bitcoin".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_width_controls_list_collapse() {
        let provider = provider();
        let narrow = dashboard(provider.clone(), 600.0);
        let mut rx = narrow.subscribe();
        narrow.start().await;
        wait_for(&mut rx, selected("bitcoin")).await;
        narrow.toggle_list(true).await;
        narrow.select_asset("ethereum").await;
        assert!(!narrow.selection().await.list_expanded);

        let wide = dashboard(provider, 1200.0);
        let mut rx = wide.subscribe();
        wide.start().await;
        wait_for(&mut rx, selected("bitcoin")).await;
        wide.select_asset("ethereum").await;
        assert!(wide.selection().await.list_expanded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_error_recovers_on_reselect() {
        let provider = provider();
        provider.set_history_error(
            "bitcoin",
            MockFailure::Api("HTTP 502".into()),
            Duration::from_millis(50),
        );
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, history_settled).await;
        let history = dashboard.price_history().await;
        assert_eq!(history.status, RequestStatus::Error);
        assert!(history.data().is_none());
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(dashboard.health_check().await.status, HealthStatus::Degraded);

        provider.set_history(
            "bitcoin",
            raw_history(&[1.0, 2.0]),
            Duration::from_millis(50),
        );
        assert_eq!(dashboard.select_asset("bitcoin").await, SelectOutcome::Unchanged);
        wait_for(&mut rx, chart_drawn).await;
        assert_eq!(provider.history_calls().len(), 2);
        assert_eq!(dashboard.health_check().await.status, HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_asset_list_failure_and_reload() {
        let provider = provider();
        provider.set_markets_error(MockFailure::Invalid("unexpected token".into()));
        let dashboard = dashboard(provider.clone(), 1200.0);
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, |kind| {
            matches!(kind, EventKind::FetchFailed { concern: Concern::AssetList, .. })
        })
        .await;
        let assets = dashboard.assets().await;
        assert_eq!(assets.status, RequestStatus::Error);
        assert_eq!(
            assets.failure,
            Some(crate::error::FailureKind::MalformedPayload)
        );
        assert!(dashboard.selection().await.selected_asset_id.is_none());
        assert_eq!(dashboard.health_check().await.status, HealthStatus::Unhealthy);

        provider.set_markets(vec![raw_asset("solana", "SOL", 1, 150.0, 3.0)]);
        provider.set_history("solana", raw_history(&[150.0]), Duration::ZERO);
        dashboard.reload_assets().await;
        wait_for(&mut rx, selected("solana")).await;
        assert_eq!(dashboard.assets().await.data().map(|a| a.len()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_asset_payload_is_an_error() {
        let provider = provider();
        let mut broken = raw_asset("bitcoin", "BTC", 1, 67000.0, 1.0);
        broken.current_price = None;
        provider.set_markets(vec![broken]);
        let dashboard = dashboard(provider.clone(), 1200.0);
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        let failed = wait_for(&mut rx, |kind| matches!(kind, EventKind::FetchFailed { .. })).await;
        assert!(matches!(
            failed,
            EventKind::FetchFailed {
                failure: crate::error::FailureKind::MalformedPayload,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_fetches_list_once() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        dashboard.start().await;
        wait_for(&mut rx, transitioned("bitcoin")).await;
        dashboard.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(provider.market_calls(), 1);
        assert_eq!(provider.history_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_chart() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;
        dashboard.shutdown().await;

        assert_eq!(count(&calls, is_destroy), 1);
        assert!(dashboard.plotted_asset_id().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_settling_during_list_reload_is_drawn_after_reload() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;

        provider.set_markets_delayed(
            vec![
                raw_asset("bitcoin", "BTC", 1, 67000.0, 1.5),
                raw_asset("ethereum", "ETH", 2, 3500.0, -2.0),
            ],
            Duration::from_secs(1),
        );
        assert_eq!(dashboard.select_asset("ethereum").await, SelectOutcome::Changed);
        dashboard.reload_assets().await;

        wait_for(&mut rx, list_loaded).await;
        wait_for(&mut rx, chart_updated).await;

        assert_eq!(dashboard.plotted_asset_id().await.as_deref(), Some("ethereum"));
        assert_eq!(
            last_update(&calls),
            Some((vec![3600.0, 3550.0, 3500.0], LOSS_COLOR))
        );
        assert_eq!(count(&calls, is_create), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_reload_recolors_chart() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;

        provider.set_markets(vec![
            raw_asset("bitcoin", "BTC", 1, 65000.0, -3.0),
            raw_asset("ethereum", "ETH", 2, 3500.0, -2.0),
        ]);
        dashboard.reload_assets().await;
        wait_for(&mut rx, chart_updated).await;

        let (_, stroke) = last_update(&calls).expect("chart was not updated");
        assert_eq!(stroke, LOSS_COLOR);
        assert_ne!(stroke, GAIN_COLOR);
        assert_eq!(count(&calls, is_create), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_series_cleared_while_next_loads() {
        let provider = provider();
        provider.set_history(
            "ethereum",
            raw_history(&[3600.0, 3500.0]),
            Duration::from_secs(1),
        );
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;

        dashboard.select_asset("ethereum").await;
        wait_for(&mut rx, chart_cleared).await;
        assert_eq!(dashboard.price_history().await.status, RequestStatus::Loading);
        assert!(dashboard.plotted_asset_id().await.is_none());
        assert_eq!(count(&calls, is_clear), 1);

        wait_for(&mut rx, chart_updated).await;
        assert_eq!(dashboard.plotted_asset_id().await.as_deref(), Some("ethereum"));
        assert_eq!(count(&calls, is_create), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_history_leaves_chart_cleared() {
        let provider = provider();
        provider.set_history_error(
            "ethereum",
            MockFailure::Timeout,
            Duration::from_millis(50),
        );
        let dashboard = dashboard(provider.clone(), 1200.0);
        let (renderer, calls) = RecordingRenderer::new();
        dashboard
            .mount_detail(RenderTarget::new("detail-chart"), Box::new(renderer))
            .await;
        let mut rx = dashboard.subscribe();

        dashboard.start().await;
        wait_for(&mut rx, chart_drawn).await;
        dashboard.select_asset("ethereum").await;
        wait_for(&mut rx, history_settled).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(dashboard.price_history().await.status, RequestStatus::Error);
        assert!(dashboard.plotted_asset_id().await.is_none());
        assert_eq!(count(&calls, is_clear), 1);
        assert_eq!(count(&calls, is_update), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_shutdown_loads_again() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);

        dashboard.start().await;
        dashboard.shutdown().await;
        assert_eq!(dashboard.assets().await.status, RequestStatus::Idle);

        let mut rx = dashboard.subscribe();
        assert!(dashboard.load_assets().await.is_some());
        dashboard.start().await;
        wait_for(&mut rx, transitioned("bitcoin")).await;
        assert_eq!(dashboard.assets().await.status, RequestStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_selection_wins_over_concurrent_auto_select() {
        let provider = provider();
        let dashboard = dashboard(provider.clone(), 1200.0);

        // no driver: the list loads without auto-selecting
        dashboard.load_assets().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dashboard.assets().await.status, RequestStatus::Success);

        let (outcome, _) = tokio::join!(dashboard.select_asset("ethereum"), dashboard.auto_select());
        assert_eq!(outcome, SelectOutcome::Changed);

        let selected = dashboard.selection().await.selected_asset_id;
        assert_eq!(selected.as_deref(), Some("ethereum"));
        assert_eq!(dashboard.price_history().await.key, selected);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.history_calls(), vec!["ethereum".to_string()]);
    }
}
