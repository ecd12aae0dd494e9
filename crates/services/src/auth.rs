use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use quiz_core::model::UserProfile;

//
// ─── AUTH SESSION CAPABILITY ──────────────────────────────────────────────────
//

/// Callback invoked with the new authentication flag whenever it flips.
pub type AuthCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Read-only view of the authentication state, injected into the session
/// controller at construction instead of reaching for a global.
pub trait AuthSession: Send + Sync {
    /// Whether a user is currently signed in.
    fn is_authenticated(&self) -> bool;

    /// Identity of the signed-in user, if any.
    fn current_user(&self) -> Option<UserProfile>;

    /// Registers a callback fired on every authentication change.
    ///
    /// The registration is dropped when the returned handle is dropped.
    fn subscribe(&self, callback: AuthCallback) -> AuthSubscription;
}

/// Handle for an auth-change registration; unsubscribes on drop.
pub struct AuthSubscription {
    id: u64,
    registry: Weak<Mutex<HashMap<u64, AuthCallback>>>,
}

impl AuthSubscription {
    /// Removes the registration immediately.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut callbacks) = registry.lock() {
                callbacks.remove(&self.id);
            }
        }
    }
}

//
// ─── PROVIDER ─────────────────────────────────────────────────────────────────
//

/// In-memory auth session provider.
///
/// Holds the current user, notifies subscribers on login/logout, and is
/// shared as `Arc<AuthProvider>` between the UI shell and the session
/// controller.
pub struct AuthProvider {
    user: Mutex<Option<UserProfile>>,
    callbacks: Arc<Mutex<HashMap<u64, AuthCallback>>>,
    next_subscription: AtomicU64,
}

impl AuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            user: Mutex::new(None),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Provider that starts already signed in. Mostly useful in tests.
    #[must_use]
    pub fn signed_in(user: UserProfile) -> Self {
        let provider = Self::new();
        *provider.user.lock().expect("auth state poisoned") = Some(user);
        provider
    }

    /// Signs the user in and notifies subscribers.
    pub fn login(&self, user: UserProfile) {
        let changed = {
            let mut current = self.user.lock().expect("auth state poisoned");
            let changed = current.is_none();
            *current = Some(user);
            changed
        };
        if changed {
            self.notify(true);
        }
    }

    /// Signs the user out and notifies subscribers.
    pub fn logout(&self) {
        let changed = {
            let mut current = self.user.lock().expect("auth state poisoned");
            let changed = current.is_some();
            *current = None;
            changed
        };
        if changed {
            self.notify(false);
        }
    }

    fn notify(&self, authenticated: bool) {
        // Callbacks run under the registry lock and must not call back
        // into subscribe/unsubscribe.
        let callbacks = self.callbacks.lock().expect("auth callbacks poisoned");
        for callback in callbacks.values() {
            callback(authenticated);
        }
    }
}

impl Default for AuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession for AuthProvider {
    fn is_authenticated(&self) -> bool {
        self.user.lock().expect("auth state poisoned").is_some()
    }

    fn current_user(&self) -> Option<UserProfile> {
        self.user.lock().expect("auth state poisoned").clone()
    }

    fn subscribe(&self, callback: AuthCallback) -> AuthSubscription {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .lock()
            .expect("auth callbacks poisoned")
            .insert(id, callback);
        AuthSubscription {
            id,
            registry: Arc::downgrade(&self.callbacks),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::UserId;
    use std::sync::atomic::AtomicUsize;

    fn user() -> UserProfile {
        UserProfile::new(UserId::new(1), "nori")
    }

    #[test]
    fn login_and_logout_flip_the_flag() {
        let provider = AuthProvider::new();
        assert!(!provider.is_authenticated());

        provider.login(user());
        assert!(provider.is_authenticated());
        assert_eq!(provider.current_user().unwrap().username, "nori");

        provider.logout();
        assert!(!provider.is_authenticated());
        assert!(provider.current_user().is_none());
    }

    #[test]
    fn subscribers_see_changes() {
        let provider = AuthProvider::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = provider.subscribe(Box::new(move |flag| {
            sink.lock().unwrap().push(flag);
        }));

        provider.login(user());
        provider.logout();
        provider.logout(); // no change, no callback

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let provider = AuthProvider::new();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let sub = provider.subscribe(Box::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        }));

        provider.login(user());
        sub.unsubscribe();
        provider.logout();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_login_does_not_renotify() {
        let provider = AuthProvider::new();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let _sub = provider.subscribe(Box::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        }));

        provider.login(user());
        provider.login(user());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
