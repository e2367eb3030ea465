//! Plugins linked into the binary and registered ahead of any external ones.

mod datetime;

pub use datetime::{parse_datetime, DateTimePlugin};

use crate::sdk::Plugin;

/// Every builtin plugin, freshly constructed and not yet initialized.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(DateTimePlugin::new())]
}
