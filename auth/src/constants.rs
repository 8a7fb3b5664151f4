//! Authentication constants.
//!
//! User-facing messages, environment variable names and default settings
//! used throughout the auth crate.

/// User-facing messages returned by auth operations.
pub mod messages {
    /// Returned by every operation while the session provider is disabled.
    pub const NOT_CONFIGURED: &str = "Authentication is not configured. Please set SUPABASE_URL and SUPABASE_ANON_KEY environment variables.";

    /// Sign-in or sign-up form with an empty required field.
    pub const FILL_ALL_FIELDS: &str = "Please fill in all fields";

    /// Sign-up password and confirmation differ.
    pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";

    /// Sign-up password shorter than [`super::MIN_PASSWORD_LENGTH`].
    pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";

    /// Password reset requested without an email address.
    pub const EMAIL_REQUIRED: &str = "Please enter your email address";
}

/// Environment variables consulted for the provider endpoint, in order.
pub const URL_VARIABLES: [&str; 3] = [
    "VITE_SUPABASE_URL",
    "NEXT_PUBLIC_SUPABASE_URL",
    "SUPABASE_URL",
];

/// Environment variables consulted for the public API key, in order.
pub const ANON_KEY_VARIABLES: [&str; 3] = [
    "VITE_SUPABASE_ANON_KEY",
    "NEXT_PUBLIC_SUPABASE_ANON_KEY",
    "SUPABASE_ANON_KEY",
];

/// Environment variable overriding the application origin.
pub const ORIGIN_VARIABLE: &str = "APP_ORIGIN";

/// Default application origin.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Path the password reset email links back to.
pub const DEFAULT_RESET_PATH: &str = "/reset-password";

/// Placeholder avatar service; the email is passed as `seed`.
pub const DEFAULT_AVATAR_BASE_URL: &str = "https://api.dicebear.com/9.x/avataaars/svg";

/// Minimum sign-up password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;
