//! Window-platform seam.
//!
//! The shell never talks to a window system directly.  It asks a
//! [`WindowPlatform`] for the screen topology and for new [`DockView`]s, and
//! hands views back to it for destruction.
//!
//! # Why a trait? (for beginners)
//!
//! Real platforms (Wayland, X11) need a running compositor.  Putting them
//! behind a trait lets the view registry and the screen synchronizer run in
//! unit tests against [`mock::MockWindowPlatform`], and lets the binary run
//! headless against [`headless::HeadlessPlatform`].
//!
//! # Destruction is deferred
//!
//! [`WindowPlatform::destroy_later`] takes ownership of a view and tears it
//! down on its own schedule.  When it is done it reports
//! `ShellEvent::ViewDestroyed` back to the event loop.

pub mod headless;
pub mod mock;

use dockyard_core::{Edge, EntityId, Screen, ScreenTopology, VisibilityMode};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a live dock view.
pub type ViewId = Uuid;

/// Errors reported by a window platform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform refused to create a view.
    #[error("view creation failed: {0}")]
    CreateFailed(String),
}

/// Everything the platform needs to create a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub view_id: ViewId,
    pub definition: EntityId,
    pub screen: Screen,
    pub edge: Edge,
    pub visibility: VisibilityMode,
    /// Already forced off for visibility modes that forbid it.
    pub bypass_compositor: bool,
}

/// A live dock view bound to a screen.
pub trait DockView: Send {
    /// Binds the view to the definition it renders.
    fn bind_definition(&mut self, definition: EntityId);

    /// Maps the view on screen.
    fn show(&mut self);

    /// Name of the screen the view currently lives on.
    fn current_screen_name(&self) -> String;

    /// Edge the view currently occupies.
    fn location(&self) -> Edge;

    /// Re-evaluates the view's screen, moving it to `target` when it is not
    /// already there.
    fn reverify_screen(&mut self, target: &Screen);

    /// Disconnects every platform signal.  Called before the view is handed
    /// back for destruction.
    fn disconnect_platform_signals(&mut self);

    /// Marks the view as pinned to the primary screen regardless of its
    /// definition's affinity.
    fn force_on_primary(&mut self);
}

/// The window system as seen by the shell.
pub trait WindowPlatform: Send {
    /// Currently attached screens.
    fn topology(&self) -> ScreenTopology;

    /// Creates a new, not yet shown, view.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::CreateFailed`] if the platform cannot create it.
    fn create_view(&mut self, request: ViewRequest) -> Result<Box<dyn DockView>, PlatformError>;

    /// Takes ownership of `view` and destroys it later.
    fn destroy_later(&mut self, view_id: ViewId, view: Box<dyn DockView>);
}
