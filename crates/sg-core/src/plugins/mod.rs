//! Built-in collector plugins.

pub mod gluster;
pub mod navicli;

use crate::plugin::Plugin;

/// All built-in plugins. The driver sorts by name; registration order
/// here is not a contract.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(gluster::Gluster),
        Box::new(navicli::Navicli),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn plugin_names_are_unique() {
        let plugins = builtin_plugins();
        let names: HashSet<&str> = plugins.iter().map(|p| p.descriptor().name).collect();
        assert_eq!(names.len(), plugins.len());
    }

    #[test]
    fn every_plugin_declares_a_profile() {
        for plugin in builtin_plugins() {
            assert!(!plugin.descriptor().profiles.is_empty());
        }
    }
}
