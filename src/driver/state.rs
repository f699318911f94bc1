//! The refresh state machine, as a tagged enum plus a small struct of
//! counters -- not the OR-ed bitflags the original Python used. Illegal
//! combinations like READY && SLEEPING become unrepresentable.

/// Lifecycle stage of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Never initialized, or just woke from deep sleep.
    Uninitialized,
    /// Initialized and idle.
    Ready,
    /// A refresh is currently in flight.
    Updating,
    /// In deep sleep.
    Sleeping,
}

/// Default consecutive-partial-refresh count before an automatic full
/// refresh is forced. Zero disables the threshold.
pub const DEFAULT_PARTIAL_THRESHOLD: u32 = 10;

/// The driver's refresh state machine.
///
/// `state` carries the lifecycle stage; `has_basemap`, `is_initial`,
/// `in_partial_mode` and the partial-refresh counters qualify it while
/// `Ready`. See `needs_full_refresh` / `can_partial_refresh` for the
/// derived decisions callers actually care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverState {
    state: RefreshState,
    has_basemap: bool,
    is_initial: bool,
    in_partial_mode: bool,
    partial_count: u32,
    partial_threshold: u32,
}

impl Default for DriverState {
    fn default() -> Self {
        Self {
            state: RefreshState::Uninitialized,
            has_basemap: false,
            is_initial: true,
            in_partial_mode: false,
            partial_count: 0,
            partial_threshold: DEFAULT_PARTIAL_THRESHOLD,
        }
    }
}

impl DriverState {
    /// A fresh, just-constructed state machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle stage.
    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Whether a basemap (a committed full-refresh image) is present.
    pub fn has_basemap(&self) -> bool {
        self.has_basemap
    }

    /// Whether no refresh has ever completed.
    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    /// Whether the driver is currently windowed for partial updates.
    pub fn in_partial_mode(&self) -> bool {
        self.in_partial_mode
    }

    /// Number of consecutive partial refreshes since the last full refresh.
    pub fn partial_count(&self) -> u32 {
        self.partial_count
    }

    /// Configured auto-escalation threshold (0 = disabled).
    pub fn partial_threshold(&self) -> u32 {
        self.partial_threshold
    }

    /// Change the auto-escalation threshold.
    pub fn set_partial_threshold(&mut self, threshold: u32) {
        self.partial_threshold = threshold;
    }

    /// Directly set the partial-refresh counter (exposed for callers that
    /// want to reset or seed it, mirroring the reference implementation's
    /// writable `partial_count` property).
    pub fn set_partial_count(&mut self, count: u32) {
        self.partial_count = count;
    }

    /// `true` once initialization has completed, from any prior state.
    pub fn on_init_complete(&mut self) {
        self.state = RefreshState::Ready;
    }

    /// Called after a successful full refresh.
    pub fn on_full_refresh_complete(&mut self) {
        self.state = RefreshState::Ready;
        self.has_basemap = true;
        self.is_initial = false;
        self.partial_count = 0;
        self.in_partial_mode = false;
    }

    /// Called after a successful partial refresh.
    pub fn on_partial_refresh_complete(&mut self) {
        self.state = RefreshState::Ready;
        self.partial_count += 1;
        // in_partial_mode and has_basemap are unchanged.
    }

    /// Called after entering deep sleep.
    ///
    /// `retain_ram` is whether the chosen sleep mode preserves RAM
    /// contents; if not, the basemap is invalidated since the next full
    /// refresh can no longer rely on panel RAM matching `prev_frame`.
    pub fn on_sleep(&mut self, retain_ram: bool) {
        self.state = RefreshState::Sleeping;
        if !retain_ram {
            self.has_basemap = false;
        }
        self.in_partial_mode = false;
    }

    /// Called after a hardware reset used to wake from sleep.
    pub fn on_wake(&mut self) {
        self.state = RefreshState::Uninitialized;
        self.in_partial_mode = false;
    }

    /// Recover to `Uninitialized` without discarding basemap bookkeeping.
    ///
    /// Distinct from `on_wake`: used after a bus error (e.g. a `Timeout`)
    /// forces a hardware reset that isn't a deliberate sleep/wake cycle,
    /// so `has_basemap`/`is_initial` should survive the re-init that
    /// follows.
    pub fn reset(&mut self) {
        self.state = RefreshState::Uninitialized;
        self.in_partial_mode = false;
    }

    /// Mark that the driver has entered the partial-update RAM window.
    pub fn set_in_partial_mode(&mut self, value: bool) {
        self.in_partial_mode = value;
    }

    /// Whether the driver must perform a full refresh next.
    pub fn needs_full_refresh(&self) -> bool {
        self.is_initial
            || !self.has_basemap
            || (self.partial_threshold > 0 && self.partial_count >= self.partial_threshold)
    }

    /// Whether a partial refresh is legal given current state.
    pub fn can_partial_refresh(&self) -> bool {
        self.has_basemap && !self.is_initial
    }

    /// Invalidate the basemap without changing lifecycle stage.
    ///
    /// Used after a custom-LUT refresh, whose waveform leaves panel state
    /// incompatible with the Mode-2 differential expectation.
    pub fn invalidate_basemap(&mut self) {
        self.has_basemap = false;
    }

    /// `true` if currently asleep.
    pub fn is_sleeping(&self) -> bool {
        self.state == RefreshState::Sleeping
    }

    /// `true` if currently ready to accept a refresh request.
    pub fn is_ready(&self) -> bool {
        self.state == RefreshState::Ready
    }

    /// `true` if a refresh is currently in flight.
    pub fn is_updating(&self) -> bool {
        self.state == RefreshState::Updating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_needs_full_refresh() {
        let s = DriverState::new();
        assert!(s.needs_full_refresh());
        assert!(!s.can_partial_refresh());
    }

    #[test]
    fn full_refresh_clears_initial_and_sets_basemap() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        assert!(!s.needs_full_refresh());
        assert!(s.can_partial_refresh());
        assert_eq!(s.partial_count(), 0);
    }

    #[test]
    fn partial_refresh_increments_counter_without_touching_basemap() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.on_partial_refresh_complete();
        s.on_partial_refresh_complete();
        assert_eq!(s.partial_count(), 2);
        assert!(s.has_basemap());
    }

    #[test]
    fn threshold_triggers_need_for_full_refresh() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.set_partial_threshold(10);
        for _ in 0..10 {
            s.on_partial_refresh_complete();
        }
        assert!(s.needs_full_refresh());
    }

    #[test]
    fn zero_threshold_disables_auto_escalation() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.set_partial_threshold(0);
        for _ in 0..1000 {
            s.on_partial_refresh_complete();
        }
        assert!(!s.needs_full_refresh());
    }

    #[test]
    fn sleep_discarding_ram_clears_basemap() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.on_sleep(false);
        assert!(s.is_sleeping());
        assert!(!s.has_basemap());
    }

    #[test]
    fn sleep_retaining_ram_keeps_basemap() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.on_sleep(true);
        assert!(s.has_basemap());
    }

    #[test]
    fn wake_returns_to_uninitialized() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.on_sleep(true);
        s.on_wake();
        assert_eq!(s.state(), RefreshState::Uninitialized);
        assert!(s.has_basemap());
    }

    #[test]
    fn custom_lut_invalidates_basemap() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.invalidate_basemap();
        assert!(s.needs_full_refresh());
    }

    #[test]
    fn reset_preserves_basemap_unlike_wake_discard() {
        let mut s = DriverState::new();
        s.on_init_complete();
        s.on_full_refresh_complete();
        s.reset();
        assert_eq!(s.state(), RefreshState::Uninitialized);
        assert!(s.has_basemap());
    }
}
