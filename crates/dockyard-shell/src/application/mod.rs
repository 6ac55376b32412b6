//! Application layer use cases for the dock shell.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure placement and identifier rules in `dockyard-core`) and the
//! infrastructure (windowing platform, layout files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a goal (e.g., "make the live
//!   views match the attached screens").
//! - **Talk to the outside world through traits** ([`WindowPlatform`],
//!   [`ConfigStore`]), so tests can swap in mocks.
//!
//! # Sub-modules
//!
//! - **`events`**           – The event enum driving a layout and the delayed
//!   follow-ups a use case can ask for.
//!
//! - **`manage_views`**     – The view registry: one live view per dock
//!   definition, edge conflict rules, and the waiting partition for docks in
//!   the undo-able destroyed state.
//!
//! - **`sync_screens`**     – Adds, removes and re-checks views whenever the
//!   screen topology or the definition set changes.
//!
//! - **`recreate_view`**    – The deferred remove-then-re-add cycle used to
//!   rebuild a view.
//!
//! - **`duplicate_layout`** – Copying a dock and importing a layout file with
//!   fresh, collision-free identifiers.
//!
//! - **`manage_layout`**    – The controller that owns one loaded layout and
//!   routes events to the use cases above.
//!
//! [`WindowPlatform`]: crate::infrastructure::platform::WindowPlatform
//! [`ConfigStore`]: crate::infrastructure::config_store::ConfigStore

pub mod duplicate_layout;
pub mod events;
pub mod manage_layout;
pub mod manage_views;
pub mod recreate_view;
pub mod sync_screens;
