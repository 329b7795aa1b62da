use crate::client::SessionState;

/// What a protected view should do for a given session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session resolution is still in flight: show a neutral placeholder.
    /// Protected content must not render and no redirect may fire yet,
    /// otherwise an authenticated user refreshing the page would bounce
    /// through the login screen.
    ShowLoading,
    /// The visitor is authenticated: render the protected content.
    RenderProtected,
    /// The visitor is anonymous: send them to the login entry point.
    RedirectToLogin,
}

/// Route guard: a pure function of the session state, re-derived on every
/// state change so it can never cache a stale decision.
pub fn route_decision(state: &SessionState) -> RouteDecision {
    match state {
        SessionState::Resolving => RouteDecision::ShowLoading,
        SessionState::Authenticated(_) => RouteDecision::RenderProtected,
        SessionState::Anonymous => RouteDecision::RedirectToLogin,
    }
}
