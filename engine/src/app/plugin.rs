//! Plugin assembly.
//!
//! A plugin is a reusable bundle of registrations: systems, resources,
//! events, states. Plugins compose an app without the app knowing their
//! internals; registering the same plugin type twice is ignored.
//!
//! ```rust,ignore
//! struct PhysicsPlugin;
//!
//! impl Plugin for PhysicsPlugin {
//!     fn build(&self, app: &mut App) {
//!         app.init_resource::<Gravity>();
//!         app.add_system(Stage::Update, integrate).unwrap();
//!     }
//! }
//!
//! app.add_plugin(PhysicsPlugin);
//! ```

use crate::app::App;

/// A reusable bundle of app registrations.
pub trait Plugin: 'static {
    /// Apply this plugin's registrations to the app.
    fn build(&self, app: &mut App);
}

/// Marker plugin enabling the main loop.
///
/// Without it, [`App::run`](crate::app::App::run) performs the startup and
/// shutdown sequences only - useful for batch tools and tests.
pub struct LoopPlugin;

impl Plugin for LoopPlugin {
    fn build(&self, app: &mut App) {
        app.enable_loop();
    }
}
