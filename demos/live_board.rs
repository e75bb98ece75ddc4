use market_board_sdk::{
    format, AssetDisplay, ChartError, ChartHandle, ChartRenderer, ChartSpec, Concern,
    DashboardEvent, EventKind, MarketDashboard, RenderTarget,
};
use std::time::Duration;
use tokio::sync::broadcast;

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Draws charts as a one-line sparkline on stdout
struct TerminalRenderer;

impl TerminalRenderer {
    fn print(&self, verb: &str, target: &RenderTarget, spec: &ChartSpec) {
        let span = spec.y_bounds.width();
        // downsample so the line fits a terminal
        let step = (spec.values.len() / 60).max(1);
        let line: String = spec
            .values
            .iter()
            .step_by(step)
            .map(|v| {
                let level = ((v - spec.y_bounds.min) / span * (SPARK.len() - 1) as f64).round();
                SPARK[(level.max(0.0) as usize).min(SPARK.len() - 1)]
            })
            .collect();
        println!(
            "   [{} {}] {} {} .. {}",
            verb,
            target,
            line,
            format::currency(spec.y_bounds.min),
            format::currency(spec.y_bounds.max)
        );
    }
}

impl ChartRenderer for TerminalRenderer {
    fn create(&mut self, target: &RenderTarget, spec: &ChartSpec) -> Result<ChartHandle, ChartError> {
        self.print("draw", target, spec);
        Ok(ChartHandle::new(target.clone()))
    }

    fn update(&mut self, handle: &ChartHandle, spec: &ChartSpec) -> Result<(), ChartError> {
        self.print("update", handle.target(), spec);
        Ok(())
    }

    fn clear(&mut self, handle: &ChartHandle) {
        println!("   [clear {}]", handle.target());
    }

    fn destroy(&mut self, handle: ChartHandle) {
        println!("   [destroy {}]", handle.target());
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<DashboardEvent>,
    pred: impl Fn(&EventKind) -> bool,
) -> Option<EventKind> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event.kind) => return Some(event.kind),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(20), wait)
        .await
        .ok()
        .flatten()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build the dashboard and mount a detail view
    let dashboard = MarketDashboard::new()?;
    let mut events = dashboard.subscribe();

    println!("Market board (provider: {})", dashboard.provider_name());
    println!("-------------------------------------------");

    dashboard
        .mount_detail(RenderTarget::new("detail-chart"), Box::new(TerminalRenderer))
        .await;
    dashboard.start().await;

    // 2. Wait for the ranked list and print the top of it
    let loaded = wait_for(&mut events, |kind| {
        matches!(
            kind,
            EventKind::FetchSucceeded { concern: Concern::AssetList, .. }
                | EventKind::FetchFailed { concern: Concern::AssetList, .. }
        )
    })
    .await;
    if let Some(EventKind::FetchFailed { failure, .. }) = loaded {
        eprintln!("Error: {}", failure.user_message());
        return Ok(());
    }

    let snapshot = dashboard.assets().await;
    let Some(assets) = snapshot.data() else {
        eprintln!("Error: asset list did not load in time");
        return Ok(());
    };
    for asset in assets.iter().take(10) {
        let row = AssetDisplay::from(asset);
        println!(
            "{:>3}  {:<6} {:>16} {:>9}  cap {}",
            row.rank, row.symbol, row.price, row.change_24h, row.market_cap
        );
    }
    println!();

    // 3. Chart the auto-selected asset, then flip through a few more quickly
    wait_for(&mut events, |kind| matches!(kind, EventKind::ChartDrawn { .. })).await;

    let picks: Vec<String> = assets.iter().skip(1).take(3).map(|a| a.id.clone()).collect();
    for id in &picks {
        println!("Selecting {}", id);
        dashboard.select_asset(id).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    // only the last pick lands
    wait_for(&mut events, |kind| matches!(kind, EventKind::TransitionCompleted { .. })).await;
    wait_for(&mut events, |kind| matches!(kind, EventKind::ChartUpdated { .. })).await;
    if let Some(asset) = dashboard.displayed_asset().await {
        println!(
            "Showing {} at {} ({})",
            asset.name,
            format::currency(asset.price),
            format::percent(asset.change_24h)
        );
    }
    println!();

    // 4. Metrics and health
    for concern in [Concern::AssetList, Concern::PriceHistory] {
        let metrics = dashboard.fetch_metrics(concern).await;
        println!(
            "{}: p50 {:.0}ms, {} settled, {} superseded",
            concern, metrics.latency_p50_ms, metrics.settled_requests, metrics.superseded_requests
        );
    }
    let health = dashboard.health_check().await;
    println!("Health: {:?} - {}", health.status, health.message.unwrap_or_default());

    dashboard.shutdown().await;
    Ok(())
}
