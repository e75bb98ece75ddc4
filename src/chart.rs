//! Chart sync engine
//!
//! The renderer itself is an external capability (`ChartRenderer`): it can
//! create a chart on a named target, update it in place, and destroy it.
//! `ChartSync` owns the single handle of a mounted detail view and is the only
//! place that decides between create and update.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    constants::{
        AXIS_MAX_FACTOR, AXIS_MIN_FACTOR, FILL_ALPHA, GAIN_COLOR, LINE_TENSION, LOSS_COLOR,
        MIN_AXIS_HALF_SPAN, STROKE_ALPHA,
    },
    error::ChartError,
    types::{ChangeDirection, PricePoint},
};

/// Named surface a chart is bound to (e.g. a canvas id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RenderTarget(String);

impl RenderTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live chart bound to one render target
///
/// Deliberately not `Clone`: exactly one owner may update or destroy it.
#[derive(Debug, PartialEq, Eq)]
pub struct ChartHandle {
    id: Uuid,
    target: RenderTarget,
}

impl ChartHandle {
    /// Called by renderers when they create a chart
    pub fn new(target: RenderTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    fn from_rgb((r, g, b): (u8, u8, u8), a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// CSS `rgba(...)` notation
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Stroke and fill colors of the price line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Palette {
    pub stroke: Rgba,
    pub fill: Rgba,
}

impl Palette {
    pub fn for_direction(direction: ChangeDirection) -> Self {
        let rgb = match direction {
            ChangeDirection::Up => GAIN_COLOR,
            ChangeDirection::Down => LOSS_COLOR,
        };
        Self {
            stroke: Rgba::from_rgb(rgb, STROKE_ALPHA),
            fill: Rgba::from_rgb(rgb, FILL_ALPHA),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Everything a renderer needs to draw or redraw the sparkline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Point timestamps (epoch millis), used as x labels
    pub labels: Vec<i64>,
    pub values: Vec<f64>,
    pub palette: Palette,
    pub y_bounds: AxisBounds,
    pub tension: f64,
    pub fill: bool,
    pub point_radius: f64,
    pub show_axes: bool,
    pub show_legend: bool,
}

/// `[min * 0.98, max * 1.02]`, widened around the midpoint when that collapses
pub fn axis_bounds(points: &[PricePoint]) -> Result<AxisBounds, ChartError> {
    let (lo, hi) = points
        .iter()
        .map(|p| p.price)
        .fold(None, |acc: Option<(f64, f64)>, price| match acc {
            None => Some((price, price)),
            Some((lo, hi)) => Some((lo.min(price), hi.max(price))),
        })
        .ok_or(ChartError::EmptySeries)?;

    let a = lo * AXIS_MIN_FACTOR;
    let b = hi * AXIS_MAX_FACTOR;
    let (min, max) = (a.min(b), a.max(b));

    if max - min > 0.0 {
        return Ok(AxisBounds { min, max });
    }

    let mid = (min + max) / 2.0;
    let half = (mid.abs() * (AXIS_MAX_FACTOR - 1.0)).max(MIN_AXIS_HALF_SPAN);
    Ok(AxisBounds {
        min: mid - half,
        max: mid + half,
    })
}

/// Builds the full chart description for `points` colored by `change`
pub fn chart_spec(points: &[PricePoint], change: f64) -> Result<ChartSpec, ChartError> {
    let y_bounds = axis_bounds(points)?;
    Ok(ChartSpec {
        labels: points.iter().map(|p| p.timestamp).collect(),
        values: points.iter().map(|p| p.price).collect(),
        palette: Palette::for_direction(ChangeDirection::from_change(change)),
        y_bounds,
        tension: LINE_TENSION,
        fill: true,
        point_radius: 0.0,
        show_axes: false,
        show_legend: false,
    })
}

/// External draw-once / update-in-place chart capability
pub trait ChartRenderer: Send {
    /// Creates a chart on `target` and returns its handle
    fn create(&mut self, target: &RenderTarget, spec: &ChartSpec)
        -> Result<ChartHandle, ChartError>;

    /// Replaces data, labels and colors of an existing chart and redraws it
    fn update(&mut self, handle: &ChartHandle, spec: &ChartSpec) -> Result<(), ChartError>;

    /// Blanks the plotted series but keeps the chart alive for the next update
    fn clear(&mut self, handle: &ChartHandle);

    /// Releases the chart
    fn destroy(&mut self, handle: ChartHandle);
}

/// Creates a new chart bound to `target`
pub fn draw(
    renderer: &mut dyn ChartRenderer,
    target: &RenderTarget,
    points: &[PricePoint],
    change: f64,
) -> Result<ChartHandle, ChartError> {
    let spec = chart_spec(points, change)?;
    renderer.create(target, &spec)
}

/// Mutates an existing chart in place
pub fn update(
    renderer: &mut dyn ChartRenderer,
    handle: &ChartHandle,
    points: &[PricePoint],
    change: f64,
) -> Result<(), ChartError> {
    let spec = chart_spec(points, change)?;
    renderer.update(handle, &spec)
}

pub fn destroy(renderer: &mut dyn ChartRenderer, handle: ChartHandle) {
    renderer.destroy(handle);
}

/// Which path `ChartSync::sync` took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Drawn,
    Updated,
}

/// Owns the chart of one mounted detail view
///
/// The first successful `sync` draws; every later one updates in place.
/// The handle is destroyed by `destroy` or when the sync is dropped.
pub struct ChartSync {
    renderer: Box<dyn ChartRenderer>,
    target: RenderTarget,
    handle: Option<ChartHandle>,
}

impl ChartSync {
    pub fn new(target: RenderTarget, renderer: Box<dyn ChartRenderer>) -> Self {
        Self {
            renderer,
            target,
            handle: None,
        }
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn is_drawn(&self) -> bool {
        self.handle.is_some()
    }

    pub fn sync(&mut self, points: &[PricePoint], change: f64) -> Result<SyncOutcome, ChartError> {
        if let Some(handle) = self.handle.as_ref() {
            update(self.renderer.as_mut(), handle, points, change)?;
            tracing::trace!(target_name = %self.target, points = points.len(), "Chart updated");
            return Ok(SyncOutcome::Updated);
        }

        let handle = draw(self.renderer.as_mut(), &self.target, points, change)?;
        tracing::debug!(target_name = %self.target, points = points.len(), "Chart drawn");
        self.handle = Some(handle);
        Ok(SyncOutcome::Drawn)
    }

    /// Blanks the chart while no current series is available
    ///
    /// The handle survives, so the next `sync` is still an update.
    pub fn clear(&mut self) -> bool {
        let Some(handle) = self.handle.as_ref() else {
            return false;
        };
        self.renderer.clear(handle);
        tracing::trace!(target_name = %self.target, "Chart cleared");
        true
    }

    /// Releases the chart if one was drawn; returns whether anything was released
    pub fn destroy(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                destroy(self.renderer.as_mut(), handle);
                tracing::debug!(target_name = %self.target, "Chart destroyed");
                true
            }
            None => false,
        }
    }
}

impl Drop for ChartSync {
    fn drop(&mut self) {
        self.destroy();
    }
}
