// polaris_core/src/lifecycle.rs

/// Filter lifecycle as seen from the sensor manager. There is no terminal
/// state: a new seed may be submitted at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterLifecycle {
    #[default]
    Uninitialized,
    /// A seed was accepted; the core has not propagated from it yet.
    Initialized,
    /// The core has propagated at least once since the last seed.
    Running,
}

impl FilterLifecycle {
    /// State after the core accepted a seed.
    pub fn on_seed_accepted(self) -> Self {
        FilterLifecycle::Initialized
    }

    /// State after the core reports a propagation step.
    pub fn on_propagated(self) -> Self {
        match self {
            FilterLifecycle::Uninitialized => FilterLifecycle::Uninitialized,
            FilterLifecycle::Initialized | FilterLifecycle::Running => FilterLifecycle::Running,
        }
    }

    pub fn is_initialized(self) -> bool {
        !matches!(self, FilterLifecycle::Uninitialized)
    }
}
