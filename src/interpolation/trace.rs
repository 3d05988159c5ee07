//! Optional per-stage tracing of an interpolation run.
//!
//! Nothing is emitted unless a hook is passed in through
//! [`InterpolationOptions`](super::InterpolationOptions). Hooks may be called
//! from several worker threads at once.

use tracing::trace;

use super::axis::AxisLocation;
use super::bounds::Envelope;
use super::gather::CORNERS;

/// One observation from inside the interpolation pipeline
#[derive(Debug, Clone, Copy)]
pub enum TraceEvent<'a> {
    /// The bounds filter ran
    Filtered {
        envelope: &'a Envelope,
        input: usize,
        kept: usize,
    },
    /// A point was bracketed on one axis
    Located {
        id: &'a str,
        axis: &'a str,
        location: &'a AxisLocation,
    },
    /// Corner samples (before repair) and weights of a point
    Corners {
        id: &'a str,
        samples: &'a [f64; CORNERS],
        weights: &'a [f64; CORNERS],
    },
    /// The final value of a point, `None` when all corners were missing.
    /// `repaired` counts the corners filled with the neighbourhood mean.
    Value {
        id: &'a str,
        value: Option<f64>,
        repaired: usize,
    },
}

/// Receiver for [`TraceEvent`]s
pub trait TraceHook: Send + Sync {
    fn on_event(&self, event: &TraceEvent<'_>);
}

/// Forwards trace events to `tracing` at TRACE level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl TraceHook for TracingHook {
    fn on_event(&self, event: &TraceEvent<'_>) {
        match *event {
            TraceEvent::Filtered {
                envelope,
                input,
                kept,
            } => trace!(
                stage = "bounds",
                lat_min = envelope.lat_min,
                lat_max = envelope.lat_max,
                lon_min = envelope.lon_min,
                lon_max = envelope.lon_max,
                input = input,
                kept = kept,
                "Filtered query points"
            ),
            TraceEvent::Located { id, axis, location } => trace!(
                stage = "locate",
                id = id,
                axis = axis,
                nearest = location.nearest,
                next = location.next,
                delta = location.delta,
                base = location.base,
                weight = location.weight,
                "Bracketed point"
            ),
            TraceEvent::Corners {
                id,
                samples,
                weights,
            } => trace!(
                stage = "gather",
                id = id,
                samples = ?samples,
                weights = ?weights,
                "Gathered corners"
            ),
            TraceEvent::Value {
                id,
                value,
                repaired,
            } => trace!(
                stage = "combine",
                id = id,
                value = ?value,
                repaired = repaired,
                "Interpolated point"
            ),
        }
    }
}
