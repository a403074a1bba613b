//! Navigation gating between onboarding, the paywall and the main app.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use creator_shared::EntitlementState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OnboardingPhase {
    /// The onboarding flag has not been loaded yet.
    Unknown,
    NotOnboarded,
    Onboarding,
    Onboarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Loading,
    Onboarding,
    Paywall,
    Home,
}

/// Decides where the app should be and emits each redirect only once.
#[derive(Debug)]
pub struct Gate {
    phase: OnboardingPhase,
    redirected: HashSet<Route>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Self {
            phase: OnboardingPhase::Unknown,
            redirected: HashSet::new(),
        }
    }

    pub fn phase(&self) -> OnboardingPhase {
        self.phase
    }

    /// Feed the persisted onboarding flag; `None` while it is still loading.
    /// An onboarding flow in progress is not interrupted by a `false` flag.
    pub fn observe_onboarded(&mut self, onboarded: Option<bool>) {
        self.phase = match (self.phase, onboarded) {
            (_, Some(true)) => OnboardingPhase::Onboarded,
            (OnboardingPhase::Onboarding, _) => OnboardingPhase::Onboarding,
            (_, Some(false)) => OnboardingPhase::NotOnboarded,
            (_, None) => OnboardingPhase::Unknown,
        };
    }

    pub fn begin_onboarding(&mut self) {
        if self.phase != OnboardingPhase::Onboarded {
            self.phase = OnboardingPhase::Onboarding;
        }
    }

    pub fn finish_onboarding(&mut self) {
        self.phase = OnboardingPhase::Onboarded;
    }

    /// Where the app belongs right now.
    pub fn route(&self, entitlement: EntitlementState) -> Route {
        match self.phase {
            OnboardingPhase::Unknown => Route::Loading,
            OnboardingPhase::NotOnboarded | OnboardingPhase::Onboarding => Route::Onboarding,
            OnboardingPhase::Onboarded => match entitlement {
                EntitlementState::Loading => Route::Loading,
                state if state.has_access() => Route::Home,
                _ => Route::Paywall,
            },
        }
    }

    /// The redirect to perform, if any. Each target is returned at most once
    /// until [`reset`](Self::reset).
    pub fn next_redirect(&mut self, entitlement: EntitlementState) -> Option<Route> {
        let route = self.route(entitlement);
        if !matches!(route, Route::Onboarding | Route::Paywall) {
            return None;
        }
        if !self.redirected.insert(route) {
            return None;
        }
        debug!(?route, "redirecting");
        Some(route)
    }

    /// Forget emitted redirects and the loaded phase, e.g. after the
    /// onboarding flag was reset or the store wiped.
    pub fn reset(&mut self) {
        self.phase = OnboardingPhase::Unknown;
        self.redirected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_until_flag_is_known() {
        let mut gate = Gate::new();
        assert_eq!(gate.route(EntitlementState::TrialActive(3)), Route::Loading);
        assert_eq!(gate.next_redirect(EntitlementState::TrialActive(3)), None);

        gate.observe_onboarded(Some(true));
        assert_eq!(gate.route(EntitlementState::Loading), Route::Loading);
        assert_eq!(gate.route(EntitlementState::Subscribed), Route::Home);
    }

    #[test]
    fn test_onboarding_redirect_fires_once() {
        let mut gate = Gate::new();
        gate.observe_onboarded(Some(false));
        assert_eq!(
            gate.next_redirect(EntitlementState::Loading),
            Some(Route::Onboarding)
        );
        assert_eq!(gate.next_redirect(EntitlementState::Loading), None);

        gate.begin_onboarding();
        gate.observe_onboarded(Some(false));
        assert_eq!(gate.phase(), OnboardingPhase::Onboarding);

        gate.finish_onboarding();
        assert_eq!(gate.route(EntitlementState::TrialActive(14)), Route::Home);
    }

    #[test]
    fn test_expired_trial_goes_to_paywall_once() {
        let mut gate = Gate::new();
        gate.observe_onboarded(Some(true));
        assert_eq!(
            gate.next_redirect(EntitlementState::TrialExpired),
            Some(Route::Paywall)
        );
        assert_eq!(gate.next_redirect(EntitlementState::TrialExpired), None);
        assert_eq!(gate.route(EntitlementState::TrialExpired), Route::Paywall);
    }

    #[test]
    fn test_reset_rearms_redirects() {
        let mut gate = Gate::new();
        gate.observe_onboarded(Some(false));
        gate.next_redirect(EntitlementState::Loading);

        gate.reset();
        assert_eq!(gate.phase(), OnboardingPhase::Unknown);
        gate.observe_onboarded(Some(false));
        assert_eq!(
            gate.next_redirect(EntitlementState::Loading),
            Some(Route::Onboarding)
        );
    }
}
