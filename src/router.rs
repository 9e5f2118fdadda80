//! Selection event routing
//!
//! The previewer reports keyboard navigation (the user pressing an arrow key
//! while the preview window has focus) as a `SelectionEvent`. The router hands
//! it to the view of the first file-manager window so the selection moves and
//! the next file gets previewed.
//!
//! The host application is reached only through the capability traits below.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::dbus::SelectionHandler;

/// Focus direction carried by a `SelectionEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    TabForward,
    TabBackward,
    Up,
    Down,
    Left,
    Right,
    /// A code this crate doesn't know; passed through untouched
    Other(u32),
}

impl Direction {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::TabForward,
            1 => Self::TabBackward,
            2 => Self::Up,
            3 => Self::Down,
            4 => Self::Left,
            5 => Self::Right,
            other => Self::Other(other),
        }
    }

    /// The code as it appeared on the bus
    pub fn code(self) -> u32 {
        match self {
            Self::TabForward => 0,
            Self::TabBackward => 1,
            Self::Up => 2,
            Self::Down => 3,
            Self::Left => 4,
            Self::Right => 5,
            Self::Other(code) => code,
        }
    }
}

impl From<u32> for Direction {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "direction {}", code),
            named => write!(f, "{:?}", named),
        }
    }
}

/// The running file-manager application
pub trait HostApplication: Send + Sync {
    /// Top-level windows in the application's own order
    fn windows(&self) -> Vec<Arc<dyn HostWindow>>;
}

/// Any top-level window of the host
pub trait HostWindow: Send + Sync {
    /// `Some` if this is a file-manager window (as opposed to a dialog etc.)
    fn as_file_manager(&self) -> Option<&dyn FileManagerWindow> {
        None
    }
}

pub trait FileManagerWindow: Send + Sync {
    /// The focused pane (tab or split) of the window
    fn active_pane(&self) -> Option<Arc<dyn Pane>>;
}

pub trait Pane: Send + Sync {
    fn current_view(&self) -> Option<Arc<dyn View>>;
}

pub trait View: Send + Sync {
    /// `Some` if the view can move its selection in response to the previewer
    fn as_preview_target(&self) -> Option<&dyn PreviewSelectionTarget> {
        None
    }
}

pub trait PreviewSelectionTarget: Send + Sync {
    fn preview_selection_event(&self, direction: Direction);
}

/// What happened to one `SelectionEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered(Direction),
    NoFileManagerWindow,
    NoActivePane,
    NoPreviewTarget,
}

/// Find the view that should receive selection events: the current view of
/// the active pane of the first file-manager window, if it is preview-capable.
pub fn find_preview_target(app: &dyn HostApplication) -> Option<Arc<dyn View>> {
    locate_preview_target(app).ok()
}

fn locate_preview_target(app: &dyn HostApplication) -> Result<Arc<dyn View>, RouteOutcome> {
    let windows = app.windows();
    let window = windows
        .iter()
        .find_map(|w| w.as_file_manager())
        .ok_or(RouteOutcome::NoFileManagerWindow)?;

    let pane = window.active_pane().ok_or(RouteOutcome::NoActivePane)?;

    pane.current_view()
        .filter(|view| view.as_preview_target().is_some())
        .ok_or(RouteOutcome::NoPreviewTarget)
}

/// Forwards selection events from the bus into the host
pub struct SelectionRouter {
    host: Arc<dyn HostApplication>,
}

impl SelectionRouter {
    pub fn new(host: Arc<dyn HostApplication>) -> Self {
        Self { host }
    }

    /// Deliver one direction code. Events without a target are dropped.
    pub fn route(&self, code: u32) -> RouteOutcome {
        let view = match locate_preview_target(self.host.as_ref()) {
            Ok(view) => view,
            Err(outcome) => {
                debug!("Dropping SelectionEvent({}): {:?}", code, outcome);
                return outcome;
            }
        };

        let Some(target) = view.as_preview_target() else {
            return RouteOutcome::NoPreviewTarget;
        };

        let direction = Direction::from_code(code);
        trace!("Forwarding {} to the active view", direction);
        target.preview_selection_event(direction);
        RouteOutcome::Delivered(direction)
    }

    /// Handler suitable for [`crate::dbus::Transport::subscribe`]
    pub fn handler(self: &Arc<Self>) -> SelectionHandler {
        let router = Arc::clone(self);
        Arc::new(move |code: u32| {
            router.route(code);
        })
    }
}


#[cfg(test)]
mod tests {
    use super::host::*;
    use super::*;

    #[test]
    fn direction_codes() {
        assert_eq!(Direction::from_code(3), Direction::Down);
        assert_eq!(Direction::from_code(0), Direction::TabForward);
        assert_eq!(Direction::from_code(42), Direction::Other(42));
        for code in 0..8 {
            assert_eq!(Direction::from(code).code(), code);
        }
    }

    #[test]
    fn delivers_to_first_file_manager_window() {
        let first = TestView::capable();
        let second = TestView::capable();
        let app = TestApp::with_windows(vec![
            TestWindow::dialog(),
            TestWindow::showing(&first),
            TestWindow::showing(&second),
        ]);

        let router = SelectionRouter::new(app);
        assert_eq!(router.route(3), RouteOutcome::Delivered(Direction::Down));

        assert_eq!(first.received(), vec![Direction::Down]);
        assert!(second.received().is_empty());
    }

    #[test]
    fn no_file_manager_window_drops_event() {
        let app = TestApp::with_windows(vec![TestWindow::dialog()]);
        let router = SelectionRouter::new(app);

        assert_eq!(router.route(3), RouteOutcome::NoFileManagerWindow);
        assert_eq!(
            SelectionRouter::new(TestApp::with_windows(Vec::new())).route(1),
            RouteOutcome::NoFileManagerWindow
        );
    }

    #[test]
    fn missing_pane_or_view_drops_event() {
        let no_pane: Arc<dyn HostWindow> = Arc::new(TestWindow::FileManager(None));
        let app = TestApp::with_windows(vec![no_pane]);
        assert_eq!(SelectionRouter::new(app).route(2), RouteOutcome::NoActivePane);

        let no_view: Arc<dyn HostWindow> =
            Arc::new(TestWindow::FileManager(Some(Arc::new(TestPane(None)))));
        let app = TestApp::with_windows(vec![no_view]);
        assert_eq!(SelectionRouter::new(app).route(2), RouteOutcome::NoPreviewTarget);
    }

    #[test]
    fn view_without_preview_capability_is_skipped() {
        let view = Arc::new(TestView::default());
        let app = TestApp::with_windows(vec![TestWindow::showing(&view)]);

        assert!(find_preview_target(&*app).is_none());
        assert_eq!(SelectionRouter::new(app).route(4), RouteOutcome::NoPreviewTarget);
        assert!(view.received().is_empty());
    }

    #[test]
    fn only_the_first_file_manager_window_is_considered() {
        let incapable = Arc::new(TestView::default());
        let capable = TestView::capable();
        let app = TestApp::with_windows(vec![
            TestWindow::showing(&incapable),
            TestWindow::showing(&capable),
        ]);

        assert_eq!(SelectionRouter::new(app).route(5), RouteOutcome::NoPreviewTarget);
        assert!(capable.received().is_empty());
    }

    #[test]
    fn handler_routes_every_event() {
        let view = TestView::capable();
        let router = Arc::new(SelectionRouter::new(TestApp::with_windows(vec![
            TestWindow::showing(&view),
        ])));

        let handler = router.handler();
        handler(2);
        handler(99);

        assert_eq!(view.received(), vec![Direction::Up, Direction::Other(99)]);
    }
}
