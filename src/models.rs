use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity (consumed from the auth provider) ---

/// Role
///
/// Closed set of roles a learning-platform account can hold. The provider stores the
/// role as free text in `user_metadata.role`; it is parsed here, at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Parent,
    Teacher,
    #[default]
    Student,
}

impl Role {
    /// from_metadata
    ///
    /// Absent or unrecognised role strings default to `Student`.
    pub fn from_metadata(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("admin") => Role::Admin,
            Some("parent") => Role::Parent,
            Some("teacher") => Role::Teacher,
            Some("student") | None => Role::Student,
            Some(other) => {
                tracing::debug!(role = other, "unknown role in user metadata, using student");
                Role::Student
            }
        }
    }

    /// Landing page for a signed-in user of this role.
    pub fn home_path(self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Parent => "/parent",
            _ => "/student",
        }
    }
}

/// SessionUser
///
/// The slice of the provider's user record that the session gate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    // True once the provider has recorded an email confirmation.
    pub email_verified: bool,
}

/// Session
///
/// Snapshot of the current authentication state. `user == None` means signed out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }
}

/// AuthEventKind
///
/// The auth-state transitions the gate distinguishes. Everything besides sign-in and
/// sign-out (token refresh, user update, ...) is carried as `Other` with its raw name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    Other(String),
}

impl AuthEventKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "SIGNED_IN" => AuthEventKind::SignedIn,
            "SIGNED_OUT" => AuthEventKind::SignedOut,
            other => AuthEventKind::Other(other.to_string()),
        }
    }
}

/// AuthEvent
///
/// A single auth-state change delivered through a provider subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    /// The signed-in user carried by this event, if any.
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().and_then(|s| s.user.as_ref())
    }
}

/// GateAction
///
/// What the session gate decided for a path. Navigations always use replace
/// semantics, so no history entry is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum GateAction {
    Stay,
    Navigate { to: String },
    SignOut,
}

impl GateAction {
    pub fn navigate(to: &str) -> Self {
        GateAction::Navigate { to: to.to_string() }
    }
}

// --- SVG Content Gate ---

/// SvgValidationResult
///
/// Verdict of the SVG content gate. `is_valid` is derived from `errors` at
/// construction and the value is never mutated afterwards; warnings are advisory.
/// Deserialization goes through `new`, so a serialized `is_valid` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct SvgValidationResult {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl SvgValidationResult {
    pub fn new(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// A result carrying exactly one error and no warnings.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self::new(vec![error.into()], Vec::new())
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl<'de> Deserialize<'de> for SvgValidationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawSvgValidationResult {
            #[serde(default)]
            errors: Vec<String>,
            #[serde(default)]
            warnings: Vec<String>,
        }

        let raw = RawSvgValidationResult::deserialize(deserializer)?;
        Ok(Self::new(raw.errors, raw.warnings))
    }
}

// --- Request Payloads ---

/// ValidateSvgRequest
///
/// Input for POST /svg/validate, POST /svg/sanitize and PUT /diagrams/{key}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ValidateSvgRequest {
    pub svg: String,
}

/// ValidateDataUrlRequest
///
/// Input for POST /svg/validate-data-url.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ValidateDataUrlRequest {
    #[schema(example = "data:image/svg+xml;base64,PHN2Zy4uLg==")]
    pub data_url: String,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SanitizedSvgResponse {
    pub svg: String,
}

/// RouteCheckResponse
///
/// Output of GET /route-check: the path's classification and the action the
/// initial session check would take for the caller's session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteCheckResponse {
    pub path: String,
    pub is_public: bool,
    pub is_verify_email_route: bool,
    pub action: GateAction,
}

/// Diagram
///
/// A generated diagram that passed sanitization and validation and was cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Diagram {
    pub key: String,
    pub svg: String,
    // Non-blocking diagnostics from validation, kept for display.
    pub warnings: Vec<String>,
    pub stored_by: Uuid,
    #[ts(type = "string")]
    pub stored_at: DateTime<Utc>,
}

/// StoreDiagramResponse
///
/// Output of PUT /diagrams/{key}. `stored` is false when validation failed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StoreDiagramResponse {
    pub key: String,
    pub stored: bool,
    pub validation: SvgValidationResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DiagramCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub evictions: u64,
}
