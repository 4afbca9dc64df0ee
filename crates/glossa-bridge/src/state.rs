//! Session state owned by the manager loop.

/// Token, language, and update-progress state shared by every binding.
///
/// Lives inside the manager task; nothing outside the loop touches it, so
/// no synchronization is needed.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Opaque credential issued by the overlay once a session exists.
    pub token: String,
    /// Whether `token` is current. Starts `true` so the very first session
    /// start may proceed with an empty token and acquire one.
    pub token_fresh: bool,
    /// Last successfully negotiated target language.
    pub current_lang: String,
    /// A settings update is in flight.
    pub updating: bool,
    /// The in-flight update was initiated by attachment negotiation rather
    /// than a caller.
    pub updating_internal: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            token: String::new(),
            token_fresh: true,
            current_lang: String::new(),
            updating: false,
            updating_internal: false,
        }
    }

    /// Session start may proceed only with a fresh token and no update in
    /// flight.
    pub fn ready_for_start(&self) -> bool {
        self.token_fresh && !self.updating
    }

    /// Record a token reported by the overlay and mark it fresh.
    pub fn store_token(&mut self, token: String) {
        self.token = token;
        self.token_fresh = true;
    }

    /// Mark the token stale so the next acquisition path runs again.
    pub fn invalidate_token(&mut self) {
        self.token_fresh = false;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fresh_with_empty_token() {
        let state = SessionState::new();
        assert!(state.token.is_empty());
        assert!(state.token_fresh);
        assert!(state.ready_for_start());
    }

    #[test]
    fn stale_token_blocks_start() {
        let mut state = SessionState::new();
        state.invalidate_token();
        assert!(!state.ready_for_start());

        state.store_token("tok".into());
        assert!(state.ready_for_start());
        assert_eq!(state.token, "tok");
    }

    #[test]
    fn update_in_flight_blocks_start() {
        let mut state = SessionState::new();
        state.updating = true;
        assert!(!state.ready_for_start());

        state.updating = false;
        assert!(state.ready_for_start());
    }
}
