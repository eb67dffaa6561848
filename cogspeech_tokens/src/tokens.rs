use cogspeech_clock::{DurationSecs, UnixTime};

use super::{AccessToken, AccessTokenRef};

/// The currently held access token and the time it expires
///
/// A store without a token has no expiry. The store does no synchronization of its own;
/// the owner is responsible for serializing access to it.
#[derive(Debug, Default)]
pub struct TokenStore {
    value: Option<AccessToken>,
    expires_at: Option<UnixTime>,
}

impl TokenStore {
    /// Constructs an empty token store
    pub const fn new() -> Self {
        Self {
            value: None,
            expires_at: None,
        }
    }

    /// Whether a token is held and `now` is before its expiry
    #[inline]
    pub fn is_valid(&self, now: UnixTime) -> bool {
        match (&self.value, self.expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }

    /// Records `value`, valid for `ttl` from `now`
    ///
    /// An empty `value` clears the store instead, so that a token is held exactly when an
    /// expiry is set.
    pub fn set(&mut self, value: AccessToken, ttl: DurationSecs, now: UnixTime) {
        if value.as_str().is_empty() {
            self.value = None;
            self.expires_at = None;
        } else {
            self.value = Some(value);
            self.expires_at = Some(now + ttl);
        }
    }

    /// Gets the current token, which may already have expired
    #[inline]
    pub fn get(&self) -> Option<&AccessTokenRef> {
        self.value.as_deref()
    }

    /// Gets the current token only if it is still valid as of `now`
    #[inline]
    pub fn valid_token(&self, now: UnixTime) -> Option<&AccessTokenRef> {
        if self.is_valid(now) {
            self.get()
        } else {
            None
        }
    }

    /// Gets the time that the held token expires
    #[inline]
    pub fn expires_at(&self) -> Option<UnixTime> {
        self.expires_at
    }

    /// Gets a duration for how much longer the held token would be valid as of the
    /// provided time
    #[inline]
    pub fn until_expired_at(&self, time: UnixTime) -> DurationSecs {
        match self.expires_at {
            Some(expiry) if self.value.is_some() => expiry - time,
            _ => DurationSecs(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: UnixTime = UnixTime(1_700_000_000);

    #[test]
    fn empty_store_is_never_valid() {
        let store = TokenStore::new();
        assert!(!store.is_valid(UnixTime(0)));
        assert!(!store.is_valid(T0));
        assert_eq!(store.get(), None);
        assert_eq!(store.expires_at(), None);
    }

    mod when_a_token_is_set {
        use super::*;

        fn store() -> TokenStore {
            let mut store = TokenStore::new();
            store.set(AccessToken::from_static("tok1"), DurationSecs(600), T0);
            store
        }

        #[test]
        fn expiry_is_ttl_after_now() {
            assert_eq!(store().expires_at(), Some(T0 + DurationSecs(600)));
        }

        #[test]
        fn token_is_valid_until_just_before_expiry() {
            let store = store();
            assert!(store.is_valid(T0));
            assert!(store.is_valid(T0 + DurationSecs(599)));
            assert!(!store.is_valid(T0 + DurationSecs(600)));
            assert!(!store.is_valid(T0 + DurationSecs(601)));
        }

        #[test]
        fn expired_token_is_still_readable() {
            let store = store();
            assert_eq!(store.get().map(|t| t.as_str()), Some("tok1"));
            assert_eq!(store.valid_token(T0 + DurationSecs(601)), None);
            assert_eq!(
                store.valid_token(T0 + DurationSecs(1)).map(|t| t.as_str()),
                Some("tok1")
            );
        }

        #[test]
        fn remaining_lifetime_counts_down() {
            let store = store();
            assert_eq!(store.until_expired_at(T0 + DurationSecs(100)), DurationSecs(500));
            assert_eq!(store.until_expired_at(T0 + DurationSecs(700)), DurationSecs(0));
        }

        #[test]
        fn renewal_overwrites_value_and_expiry() {
            let mut store = store();
            let later = T0 + DurationSecs(700);
            store.set(AccessToken::from_static("tok2"), DurationSecs(600), later);

            assert_eq!(store.get().map(|t| t.as_str()), Some("tok2"));
            assert_eq!(store.expires_at(), Some(later + DurationSecs(600)));
            assert!(store.is_valid(later));
        }

        #[test]
        fn setting_an_empty_token_clears_the_store() {
            let mut store = store();
            store.set(AccessToken::from_static(""), DurationSecs(600), T0);

            assert_eq!(store.get(), None);
            assert_eq!(store.expires_at(), None);
            assert!(!store.is_valid(T0));
        }
    }
}
