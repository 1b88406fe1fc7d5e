//! Redirect policy for the session gate.
//!
//! The initial check and the auth-event handler use two separately written rule
//! sets. The event handler sends `/auth` through its own sign-in landing rule and
//! excludes it from the generic public-page rule; the initial check has a single
//! public-page rule. Keep them separate until product confirms the intended
//! behavior for `/auth`.

use crate::{
    models::{AuthEvent, AuthEventKind, GateAction, Role, Session},
    paths::{AUTH_PATH, ROOT_PATH, VERIFY_EMAIL_PATH, is_public},
};

/// initial_action
///
/// Decision taken once the mount-time session check succeeds. First match wins.
pub fn initial_action(path: &str, session: &Session) -> GateAction {
    let public = is_public(path);

    let Some(user) = session.user.as_ref() else {
        return if public {
            GateAction::Stay
        } else {
            GateAction::navigate(AUTH_PATH)
        };
    };

    if user.role == Role::Teacher {
        return GateAction::SignOut;
    }
    if !user.email_verified && !public {
        return GateAction::navigate(VERIFY_EMAIL_PATH);
    }
    if user.email_verified && path == VERIFY_EMAIL_PATH {
        return GateAction::navigate(user.role.home_path());
    }
    if public && path != VERIFY_EMAIL_PATH {
        return GateAction::navigate(user.role.home_path());
    }
    GateAction::Stay
}

/// event_action
///
/// Decision taken for a live auth event. `path` is read when the event arrives.
pub fn event_action(path: &str, event: &AuthEvent) -> GateAction {
    if event.kind == AuthEventKind::SignedOut {
        return GateAction::navigate(ROOT_PATH);
    }

    let Some(user) = event.user() else {
        return GateAction::Stay;
    };

    if user.role == Role::Teacher {
        return GateAction::SignOut;
    }

    let public = is_public(path);
    let home = user.role.home_path();

    if !user.email_verified && !public {
        return GateAction::navigate(VERIFY_EMAIL_PATH);
    }
    if user.email_verified && path == VERIFY_EMAIL_PATH {
        return GateAction::navigate(home);
    }
    // Sign-in landing.
    if path == AUTH_PATH {
        return GateAction::navigate(home);
    }
    if public && path != AUTH_PATH && path != VERIFY_EMAIL_PATH {
        return GateAction::navigate(home);
    }
    GateAction::Stay
}
