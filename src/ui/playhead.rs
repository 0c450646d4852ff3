use crate::config::PlaybackConfig;
use crate::constants::FOLLOW_LEFT_MARGIN;
use crate::ui::view_state::ViewState;

/// Keeps the playhead in view while the transport runs.
#[derive(Debug, Clone)]
pub struct PlayheadTracker {
    follow_rate: f32,
}

impl PlayheadTracker {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            follow_rate: config.follow_rate.max(0.0),
        }
    }

    /// Advance follow scrolling by `dt` seconds and return the playhead's
    /// screen x for this frame.
    ///
    /// Once the playhead passes the middle of the viewport the scroll offset
    /// eases towards centring it. The easing is exponential in `dt`, so two
    /// half-length frames land where one full-length frame would.
    pub fn update(&self, view: &mut ViewState, bpm: f64, position: f64, playing: bool, width: f32, dt: f32) -> f32 {
        let mapper = view.mapper(bpm);
        let x = mapper.seconds_to_pixels(position);
        if !playing || !view.follow_playhead || width <= 0.0 || !view.interaction.is_idle() {
            return x;
        }

        let pps = mapper.pixels_per_second();
        if x < 0.0 {
            view.set_scroll_offset((width as f64 * FOLLOW_LEFT_MARGIN as f64 - position * pps) as f32);
        } else if x > width * 0.5 {
            let target = width as f64 * 0.5 - position * pps;
            let scroll = view.scroll_offset() as f64;
            let alpha = 1.0 - (-(self.follow_rate as f64) * dt.max(0.0) as f64).exp();
            view.set_scroll_offset((scroll + (target - scroll) * alpha) as f32);
        }
        view.mapper(bpm).seconds_to_pixels(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PlayheadTracker {
        PlayheadTracker::new(&PlaybackConfig::default())
    }

    // default view: 100 px per beat at 120 bpm = 200 px/s

    #[test]
    fn leaves_view_alone_before_midpoint() {
        let mut view = ViewState::default();
        let x = tracker().update(&mut view, 120.0, 1.5, true, 800.0, 0.016);
        assert_eq!(x, 300.0);
        assert_eq!(view.scroll_offset(), 0.0);
    }

    #[test]
    fn eases_towards_centre_independent_of_frame_rate() {
        let mut one = ViewState::default();
        let mut two = ViewState::default();
        let t = tracker();
        t.update(&mut one, 120.0, 3.0, true, 800.0, 0.1);
        t.update(&mut two, 120.0, 3.0, true, 800.0, 0.05);
        t.update(&mut two, 120.0, 3.0, true, 800.0, 0.05);

        // x = 600 > 400, target offset is -200
        assert!(one.scroll_offset() < 0.0 && one.scroll_offset() > -200.0);
        assert!((one.scroll_offset() - two.scroll_offset()).abs() < 1e-3);

        for _ in 0..200 {
            t.update(&mut one, 120.0, 3.0, true, 800.0, 0.1);
        }
        assert!((one.scroll_offset() + 200.0).abs() < 1e-2);
    }

    #[test]
    fn jumps_when_playhead_is_left_of_view() {
        let mut view = ViewState::default();
        view.set_scroll_offset(-2000.0);
        let x = tracker().update(&mut view, 120.0, 2.0, true, 800.0, 0.016);
        assert!((x - 200.0).abs() < 1e-3);
        assert_eq!(view.scroll_offset(), -200.0);

        let mut view = ViewState::default();
        view.set_scroll_offset(-4000.0);
        let x = tracker().update(&mut view, 120.0, 15.0, true, 800.0, 0.016);
        assert!((x - 200.0).abs() < 1e-3);
    }

    #[test]
    fn stopped_or_not_following_never_scrolls() {
        let t = tracker();
        let mut view = ViewState::default();
        t.update(&mut view, 120.0, 30.0, false, 800.0, 1.0);
        assert_eq!(view.scroll_offset(), 0.0);

        view.follow_playhead = false;
        t.update(&mut view, 120.0, 30.0, true, 800.0, 1.0);
        assert_eq!(view.scroll_offset(), 0.0);
    }
}
