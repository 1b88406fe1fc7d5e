//! Route classification for the session gate.
//!
//! Classification is a pure function of the path string; nothing is cached.

pub const ROOT_PATH: &str = "/";
pub const AUTH_PATH: &str = "/auth";
pub const VERIFY_EMAIL_PATH: &str = "/verify-email";

/// Paths reachable without a session.
pub const PUBLIC_PATHS: [&str; 5] = [
    ROOT_PATH,
    AUTH_PATH,
    "/privacy-policy",
    "/terms-of-service",
    VERIFY_EMAIL_PATH,
];

/// Invitation links are public regardless of what follows the prefix.
pub const INVITE_PREFIX: &str = "/invite/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteClass {
    pub is_public: bool,
    pub is_verify_email_route: bool,
}

pub fn classify(path: &str) -> RouteClass {
    RouteClass {
        is_public: is_public(path),
        is_verify_email_route: path == VERIFY_EMAIL_PATH,
    }
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || path.starts_with(INVITE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_and_invites_are_public() {
        for path in PUBLIC_PATHS {
            assert!(is_public(path), "{path} should be public");
        }
        assert!(is_public("/invite/abc123"));
        assert!(is_public("/invite/"));
    }

    #[test]
    fn everything_else_is_private() {
        for path in ["/student", "/admin", "/auth/callback", "/invite", "/privacy", ""] {
            assert!(!is_public(path), "{path} should not be public");
        }
    }

    #[test]
    fn verify_email_route_is_flagged() {
        let class = classify(VERIFY_EMAIL_PATH);
        assert!(class.is_public);
        assert!(class.is_verify_email_route);
        assert!(!classify(AUTH_PATH).is_verify_email_route);
    }
}
