//! Auth form: input state, validation and request dispatch.
//!
//! The form holds no session state. Each submit validates locally, and only
//! a valid form reaches the auth context; the outcome comes back as a
//! `*Completed` action and is surfaced as a notification. `submitting` is
//! set for the duration of the call and cleared on every exit path.

use crate::notification::{Notification, NotificationQueue};
use chatai_auth::constants::MIN_PASSWORD_LENGTH;
use chatai_auth::{AuthContext, AuthResult, SessionProvider, ValidationError};
use chatai_core::effect::Effect;
use chatai_core::reducer::Reducer;
use chatai_core::{smallvec, SmallVec};
use std::fmt;
use std::marker::PhantomData;

/// Notification titles and success messages.
pub mod copy {
    /// Title of validation failures.
    pub const VALIDATION_TITLE: &str = "Error";
    /// Sign-in failure title.
    pub const SIGN_IN_FAILED: &str = "Sign In Failed";
    /// Sign-up failure title.
    pub const SIGN_UP_FAILED: &str = "Sign Up Failed";
    /// Reset failure title.
    pub const RESET_FAILED: &str = "Reset Failed";
    /// Generic success title.
    pub const SUCCESS: &str = "Success";
    /// Sign-in success message.
    pub const WELCOME_BACK: &str = "Welcome back!";
    /// Sign-up success title.
    pub const ACCOUNT_CREATED: &str = "Account Created!";
    /// Sign-up success message.
    pub const CONFIRM_EMAIL: &str =
        "Please check your email to confirm your account before signing in.";
    /// Reset success message.
    pub const RESET_SENT: &str = "Check your email for a password reset link!";
}

/// Active form tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthTab {
    /// Sign in (and password reset).
    #[default]
    SignIn,
    /// Create an account.
    SignUp,
}

/// Auth form state.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthFormState {
    /// Active tab.
    pub tab: AuthTab,
    /// Email input.
    pub email: String,
    /// Password input.
    pub password: String,
    /// Full name input (sign-up).
    pub full_name: String,
    /// Password confirmation input (sign-up).
    pub confirm_password: String,
    /// Show the password in clear text.
    pub show_password: bool,
    /// A submit is in flight.
    pub submitting: bool,
    /// Notifications produced by the form.
    pub notifications: NotificationQueue,
}

impl AuthFormState {
    /// Clear every input and hide the password.
    pub fn reset_fields(&mut self) {
        self.email.clear();
        self.password.clear();
        self.full_name.clear();
        self.confirm_password.clear();
        self.show_password = false;
    }
}

impl fmt::Debug for AuthFormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFormState")
            .field("tab", &self.tab)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("show_password", &self.show_password)
            .field("submitting", &self.submitting)
            .field("notifications", &self.notifications.len())
            .finish_non_exhaustive()
    }
}

/// Auth form action.
#[derive(Clone, PartialEq, Eq)]
pub enum FormAction {
    // ═══════════════════════════════════════════════════════════
    // Input
    // ═══════════════════════════════════════════════════════════
    /// Switch tab; clears all inputs.
    TabChanged(AuthTab),
    /// Email edited.
    EmailChanged(String),
    /// Password edited.
    PasswordChanged(String),
    /// Full name edited.
    FullNameChanged(String),
    /// Confirmation edited.
    ConfirmPasswordChanged(String),
    /// Toggle password visibility.
    TogglePasswordVisibility,
    /// The shell rendered the `count` oldest notifications.
    NotificationsShown {
        /// How many were rendered
        count: usize,
    },

    // ═══════════════════════════════════════════════════════════
    // Submit
    // ═══════════════════════════════════════════════════════════
    /// Submit the sign-in tab.
    SubmitSignIn,
    /// Submit the sign-up tab.
    SubmitSignUp,
    /// Request a password reset for the entered email.
    SubmitReset,

    // ═══════════════════════════════════════════════════════════
    // Results
    // ═══════════════════════════════════════════════════════════
    /// Sign-in call finished.
    SignInCompleted(AuthResult),
    /// Sign-up call finished.
    SignUpCompleted(AuthResult),
    /// Reset call finished.
    ResetCompleted(AuthResult),
}

impl fmt::Debug for FormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TabChanged(tab) => f.debug_tuple("TabChanged").field(tab).finish(),
            Self::EmailChanged(email) => f.debug_tuple("EmailChanged").field(email).finish(),
            Self::PasswordChanged(_) => f.write_str("PasswordChanged(<redacted>)"),
            Self::FullNameChanged(name) => f.debug_tuple("FullNameChanged").field(name).finish(),
            Self::ConfirmPasswordChanged(_) => f.write_str("ConfirmPasswordChanged(<redacted>)"),
            Self::TogglePasswordVisibility => f.write_str("TogglePasswordVisibility"),
            Self::NotificationsShown { count } => {
                f.debug_struct("NotificationsShown").field("count", count).finish()
            },
            Self::SubmitSignIn => f.write_str("SubmitSignIn"),
            Self::SubmitSignUp => f.write_str("SubmitSignUp"),
            Self::SubmitReset => f.write_str("SubmitReset"),
            Self::SignInCompleted(result) => f.debug_tuple("SignInCompleted").field(result).finish(),
            Self::SignUpCompleted(result) => f.debug_tuple("SignUpCompleted").field(result).finish(),
            Self::ResetCompleted(result) => f.debug_tuple("ResetCompleted").field(result).finish(),
        }
    }
}

/// Validate the sign-in tab.
///
/// # Errors
///
/// [`ValidationError::MissingFields`] if email or password is empty.
pub const fn validate_sign_in(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

/// Validate the sign-up tab.
///
/// Checks run in order: required fields, confirmation, length.
///
/// # Errors
///
/// The first violated constraint.
pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirm_password: &str,
    full_name: &str,
) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() || full_name.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Validate a password reset request.
///
/// # Errors
///
/// [`ValidationError::MissingEmail`] if email is empty.
pub const fn validate_reset(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    Ok(())
}

/// Auth form reducer.
#[derive(Debug, Clone)]
pub struct FormReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> FormReducer<P> {
    /// Create a new form reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Default for FormReducer<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Short-circuit a submit with a validation notification.
fn reject(state: &mut AuthFormState, error: ValidationError) -> SmallVec<[Effect<FormAction>; 4]> {
    tracing::debug!(%error, "Form validation failed");
    state.submitting = false;
    state
        .notifications
        .push(Notification::error(copy::VALIDATION_TITLE, error.to_string()));
    smallvec![Effect::None]
}

/// Wrap an auth context call whose result is fed back as `done(result)`.
fn dispatch<F>(call: F, done: fn(AuthResult) -> FormAction) -> SmallVec<[Effect<FormAction>; 4]>
where
    F: std::future::Future<Output = AuthResult> + Send + 'static,
{
    smallvec![Effect::Future(Box::pin(async move { Some(done(call.await)) }))]
}

impl<P> Reducer for FormReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    type State = AuthFormState;
    type Action = FormAction;
    type Environment = AuthContext<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FormAction::TabChanged(tab) => {
                state.tab = tab;
                state.reset_fields();
            },
            FormAction::EmailChanged(email) => state.email = email,
            FormAction::PasswordChanged(password) => state.password = password,
            FormAction::FullNameChanged(name) => state.full_name = name,
            FormAction::ConfirmPasswordChanged(password) => state.confirm_password = password,
            FormAction::TogglePasswordVisibility => state.show_password = !state.show_password,
            FormAction::NotificationsShown { count } => state.notifications.dismiss(count),

            // ═══════════════════════════════════════════════════════════
            // Submits: validate, then call the auth context
            // ═══════════════════════════════════════════════════════════
            FormAction::SubmitSignIn => {
                if state.submitting {
                    tracing::debug!("Ignoring duplicate submit");
                    return smallvec![Effect::None];
                }
                state.submitting = true;
                if let Err(error) = validate_sign_in(&state.email, &state.password) {
                    return reject(state, error);
                }
                return dispatch(
                    env.sign_in(state.email.clone(), state.password.clone()),
                    FormAction::SignInCompleted,
                );
            },
            FormAction::SubmitSignUp => {
                if state.submitting {
                    tracing::debug!("Ignoring duplicate submit");
                    return smallvec![Effect::None];
                }
                state.submitting = true;
                if let Err(error) = validate_sign_up(
                    &state.email,
                    &state.password,
                    &state.confirm_password,
                    &state.full_name,
                ) {
                    return reject(state, error);
                }
                return dispatch(
                    env.sign_up(
                        state.email.clone(),
                        state.password.clone(),
                        Some(state.full_name.clone()),
                    ),
                    FormAction::SignUpCompleted,
                );
            },
            FormAction::SubmitReset => {
                if state.submitting {
                    tracing::debug!("Ignoring duplicate submit");
                    return smallvec![Effect::None];
                }
                state.submitting = true;
                if let Err(error) = validate_reset(&state.email) {
                    return reject(state, error);
                }
                return dispatch(env.reset_password(state.email.clone()), FormAction::ResetCompleted);
            },

            // ═══════════════════════════════════════════════════════════
            // Results: notify, clear `submitting`
            // ═══════════════════════════════════════════════════════════
            FormAction::SignInCompleted(result) => {
                state.submitting = false;
                state.notifications.push(match result {
                    Ok(()) => Notification::info(copy::SUCCESS, copy::WELCOME_BACK),
                    Err(error) => Notification::error(copy::SIGN_IN_FAILED, error.to_string()),
                });
            },
            FormAction::SignUpCompleted(result) => {
                state.submitting = false;
                match result {
                    Ok(()) => {
                        state
                            .notifications
                            .push(Notification::info(copy::ACCOUNT_CREATED, copy::CONFIRM_EMAIL));
                        // No auto sign-in: the provider may require confirmation first.
                        state.reset_fields();
                        state.tab = AuthTab::SignIn;
                    },
                    Err(error) => state
                        .notifications
                        .push(Notification::error(copy::SIGN_UP_FAILED, error.to_string())),
                }
            },
            FormAction::ResetCompleted(result) => {
                state.submitting = false;
                state.notifications.push(match result {
                    Ok(()) => Notification::info(copy::SUCCESS, copy::RESET_SENT),
                    Err(error) => Notification::error(copy::RESET_FAILED, error.to_string()),
                });
            },
        }
        smallvec![Effect::None]
    }
}
