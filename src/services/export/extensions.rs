use std::collections::HashMap;

/// Bookkeeping for one file extension during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionState {
    /// False once a save through this extension failed for good.
    pub is_valid: bool,
    /// Successful saves so far.
    pub processed_count: usize,
}

impl Default for ExtensionState {
    fn default() -> Self {
        Self {
            is_valid: true,
            processed_count: 0,
        }
    }
}

/// Extension states keyed by lowercase extension. Unknown extensions read as
/// the default state.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    states: HashMap<String, ExtensionState>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, extension: &str) -> ExtensionState {
        self.states
            .get(&extension.to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    /// State of `extension`, created on first access.
    pub fn state_mut(&mut self, extension: &str) -> &mut ExtensionState {
        self.states.entry(extension.to_lowercase()).or_default()
    }

    pub fn invalidate(&mut self, extension: &str) {
        self.state_mut(extension).is_valid = false;
    }

    pub fn record_success(&mut self, extension: &str) {
        self.state_mut(extension).processed_count += 1;
    }
}
