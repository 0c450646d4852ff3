pub mod automation_lane;
pub mod clip_editor;
pub mod coords;
pub mod geometry;
pub mod grid;
pub mod playhead;
pub mod timeline;
pub mod view_state;
pub mod waveform;

pub use automation_lane::{AutomationLaneEditor, LaneArea};
pub use clip_editor::{ClipEditor, EditContext};
pub use coords::CoordinateMapper;
pub use geometry::{FrameGeometry, LaneGeometry, Primitive};
pub use grid::{GridGenerator, GridLine, GridLineKind};
pub use playhead::PlayheadTracker;
pub use timeline::{HitTarget, LaneLayout, TimelineView};
pub use view_state::{Interaction, SelectionKey, ViewState};
