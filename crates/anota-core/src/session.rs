//! Sign-in, registration, and sign-out flows on top of [`AuthService`].

use crate::auth::{validate_credentials, AuthUser, SignUpOutcome};
use crate::backend::AuthService;
use crate::notice::Confirm;
use crate::Result;

/// Message shown after a registration that still needs e-mail confirmation.
pub const CHECK_EMAIL_MESSAGE: &str = "Registration complete! Check your e-mail to confirm your account.";

/// Identifier of the signed-in user, if any.
pub async fn resolve_owner<A>(auth: &A) -> Result<Option<String>>
where
    A: AuthService + ?Sized,
{
    Ok(auth.current_user().await?.map(|user| user.id))
}

/// Sign in with e-mail and password; both are required.
pub async fn log_in<A>(auth: &A, email: &str, password: &str) -> Result<AuthUser>
where
    A: AuthService + ?Sized,
{
    validate_credentials(email, password)?;
    let session = auth.sign_in(email, password).await?;
    tracing::info!("Signed in as {}", session.user.id);
    Ok(session.user)
}

/// Create an account; both fields are required.
pub async fn register<A>(auth: &A, email: &str, password: &str) -> Result<SignUpOutcome>
where
    A: AuthService + ?Sized,
{
    validate_credentials(email, password)?;
    let outcome = auth.sign_up(email, password).await?;
    match &outcome {
        SignUpOutcome::SignedIn(session) => tracing::info!("Registered and signed in as {}", session.user.id),
        SignUpOutcome::ConfirmationRequired => tracing::info!("Registered; awaiting e-mail confirmation"),
    }
    Ok(outcome)
}

/// Sign out after the user confirms. Returns whether a sign-out happened.
pub async fn log_out<A>(auth: &A, confirm: &dyn Confirm) -> Result<bool>
where
    A: AuthService + ?Sized,
{
    if !confirm.confirm("Sign out of your account?") {
        return Ok(false);
    }
    auth.sign_out().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, Operation};
    use crate::Error;

    #[tokio::test]
    async fn log_in_requires_both_fields_before_any_request() {
        let backend = InMemoryBackend::new();
        let error = log_in(&backend, "me@example.com", "").await.unwrap_err();
        assert_eq!(error.to_string(), "Please fill in all fields");
        assert_eq!(backend.call_count(Operation::SignIn), 0);
    }

    #[tokio::test]
    async fn log_in_surfaces_backend_message() {
        let backend = InMemoryBackend::new();
        let error = log_in(&backend, "me@example.com", "secret").await.unwrap_err();
        assert!(matches!(error, Error::Backend(ref message) if message.contains("Invalid login credentials")));
    }

    #[tokio::test]
    async fn register_then_resolve_owner() {
        let backend = InMemoryBackend::new();
        let outcome = register(&backend, "me@example.com", "secret").await.unwrap();
        let SignUpOutcome::SignedIn(session) = outcome else {
            panic!("expected an active session");
        };
        assert_eq!(resolve_owner(&backend).await.unwrap(), Some(session.user.id));
    }

    #[tokio::test]
    async fn register_may_require_confirmation() {
        let backend = InMemoryBackend::new();
        backend.require_email_confirmation(true).unwrap();
        let outcome = register(&backend, "me@example.com", "secret").await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
        assert_eq!(resolve_owner(&backend).await.unwrap(), None);
    }

    #[tokio::test]
    async fn log_out_only_after_confirmation() {
        let backend = InMemoryBackend::with_signed_in_user("user-1");

        assert!(!log_out(&backend, &|_: &str| false).await.unwrap());
        assert!(resolve_owner(&backend).await.unwrap().is_some());

        assert!(log_out(&backend, &|_: &str| true).await.unwrap());
        assert!(resolve_owner(&backend).await.unwrap().is_none());
    }
}
