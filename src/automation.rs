//! Automation curve evaluation and point editing.
//!
//! A lane with no points renders at the parameter's live value, a single
//! point renders flat at that point's value, and two or more points are
//! joined by shaped segments with flat rays before the first and after
//! the last point.
use crate::constants::{CURVE_MAX_EXPONENT, LINEAR_CURVE};
use crate::model::automation::{AutomationLane, AutomationPoint};

/// Steps used to approximate one non-linear segment as a polyline.
pub const CURVE_RENDER_STEPS: usize = 24;

/// Exponent applied to segment progress. `curve` < 0.5 front-loads the
/// transition, > 0.5 delays it, 0.5 is linear.
#[inline]
pub fn curve_exponent(curve: f32) -> f32 {
    let c = curve.clamp(0.0, 1.0);
    CURVE_MAX_EXPONENT.powf((c - LINEAR_CURVE) * 2.0)
}

/// Remap linear progress `t` in [0, 1] through the segment's curve.
#[inline]
pub fn shape_progress(t: f32, curve: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if (curve - LINEAR_CURVE).abs() < f32::EPSILON {
        t
    } else {
        t.powf(curve_exponent(curve))
    }
}

#[inline]
fn is_linear(curve: f32) -> bool {
    (curve - LINEAR_CURVE).abs() < 1e-4
}

impl AutomationLane {
    /// Value of the lane at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        match self.points.as_slice() {
            [] => self.live_value,
            [only] => only.value,
            [first, .., last] => {
                if time <= first.time {
                    return first.value;
                }
                if time >= last.time {
                    return last.value;
                }
                let idx = self.points.partition_point(|p| p.time <= time);
                let a = &self.points[idx - 1];
                let b = &self.points[idx];
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.value;
                }
                let t = ((time - a.time) / span) as f32;
                a.value + (b.value - a.value) * shape_progress(t, a.curve)
            }
        }
    }

    /// Index of the point at exactly `(time, value)`.
    pub fn find_point(&self, time: f64, value: f32) -> Option<usize> {
        self.points
            .iter()
            .position(|p| p.time == time && p.value == value)
    }

    /// Insert a point, keeping the list sorted with neighbours at least
    /// `epsilon` apart. A point within `epsilon` of an existing one
    /// replaces that point's value.
    ///
    /// The first point added to an empty lane is preceded by an implicit
    /// anchor at t=0 carrying the live value.
    pub fn insert_point(&mut self, time: f64, value: f32, epsilon: f64) -> usize {
        let epsilon = epsilon.max(1e-9);
        let point = AutomationPoint::new(time, value);

        if self.points.is_empty() && point.time > epsilon {
            self.points.push(AutomationPoint::new(0.0, self.live_value));
            self.anchored = true;
        }

        let idx = self.points.partition_point(|p| p.time <= point.time - epsilon);
        if let Some(existing) = self.points.get_mut(idx)
            && (existing.time - point.time).abs() < epsilon
        {
            existing.value = point.value;
            return idx;
        }
        self.points.insert(idx, point);
        idx
    }

    /// Remove the point at exactly `(time, value)`. Returns false if no
    /// such point exists.
    pub fn remove_point(&mut self, time: f64, value: f32) -> bool {
        let Some(idx) = self.find_point(time, value) else {
            return false;
        };
        self.points.remove(idx);
        if idx == 0 {
            self.anchored = false;
        }
        if self.anchored && self.points.len() == 1 {
            // only the placeholder is left
            self.points.clear();
            self.anchored = false;
        }
        true
    }

    /// Move point `index` to `(time, value)`. The new time must stay
    /// strictly between the neighbouring points by at least `epsilon`;
    /// otherwise nothing changes and false is returned.
    pub fn move_point(&mut self, index: usize, time: f64, value: f32, epsilon: f64) -> bool {
        if index >= self.points.len() || time < 0.0 {
            return false;
        }
        let lower = if index > 0 {
            self.points[index - 1].time + epsilon
        } else {
            0.0
        };
        let upper = self
            .points
            .get(index + 1)
            .map(|p| p.time - epsilon)
            .unwrap_or(f64::INFINITY);
        if time < lower || time > upper {
            return false;
        }
        let p = &mut self.points[index];
        p.time = time;
        p.value = value.clamp(0.0, 1.0);
        if index == 0 && time > 0.0 {
            self.anchored = false;
        }
        true
    }

    /// Set the curve of the segment starting at `index`.
    pub fn set_curve(&mut self, index: usize, curve: f32) {
        if let Some(p) = self.points.get_mut(index) {
            p.curve = curve.clamp(0.0, 1.0);
        }
    }

    /// Bend the segment starting at `index` by a vertical pointer delta in
    /// pixels (positive is downwards). Dragging up bows the curve upwards
    /// for both rising and falling segments.
    pub fn bend_segment(&mut self, index: usize, base_curve: f32, dy_px: f32, sensitivity: f32) {
        let Some(next) = self.points.get(index + 1).copied() else {
            return;
        };
        let Some(start) = self.points.get(index).copied() else {
            return;
        };
        let delta = dy_px * sensitivity;
        let curve = if next.value >= start.value {
            base_curve + delta
        } else {
            base_curve - delta
        };
        self.set_curve(index, curve);
    }

    /// Index of the segment (its left point) spanning `time`, if any.
    pub fn segment_at(&self, time: f64) -> Option<usize> {
        if self.points.len() < 2 {
            return None;
        }
        let idx = self.points.partition_point(|p| p.time <= time);
        if idx == 0 || idx >= self.points.len() {
            None
        } else {
            Some(idx - 1)
        }
    }

    /// Polyline vertices `(time, value)` describing the lane over `[t0, t1]`.
    pub fn profile(&self, t0: f64, t1: f64) -> Vec<(f64, f32)> {
        let (t0, t1) = if t1 < t0 { (t1, t0) } else { (t0, t1) };
        match self.points.as_slice() {
            [] => vec![(t0, self.live_value), (t1, self.live_value)],
            [only] => vec![(t0, only.value), (t1, only.value)],
            [first, .., last] => {
                let mut out = Vec::with_capacity(self.points.len() * 2 + 2);
                if t0 < first.time {
                    out.push((t0, first.value));
                }
                for pair in self.points.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    if b.time < t0 || a.time > t1 {
                        continue;
                    }
                    if out.last().map(|&(t, _)| t != a.time).unwrap_or(true) {
                        out.push((a.time, a.value));
                    }
                    if !is_linear(a.curve) {
                        for step in 1..CURVE_RENDER_STEPS {
                            let t = step as f32 / CURVE_RENDER_STEPS as f32;
                            let time = a.time + (b.time - a.time) * t as f64;
                            out.push((time, a.value + (b.value - a.value) * shape_progress(t, a.curve)));
                        }
                    }
                    out.push((b.time, b.value));
                }
                if out.is_empty() {
                    // window lies entirely before the first or after the last point
                    let v = self.value_at(t0);
                    return vec![(t0, v), (t1, v)];
                }
                if t1 > last.time {
                    out.push((t1, last.value));
                }
                out
            }
        }
    }

    pub(crate) fn is_sorted_unique(&self) -> bool {
        self.points.windows(2).all(|w| w[0].time < w[1].time)
    }
}
