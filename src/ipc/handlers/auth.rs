use crate::ipc::error::{ok, school_err};
use crate::ipc::helpers::{open_store, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::Session;
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match store.find_user_by_credentials(&username, &password, state.settings.verifier.as_ref()) {
        Ok(Some(role)) => {
            tracing::info!(username = %username, role = %role, "login succeeded");
            state.session = Some(Session {
                username: username.clone(),
                role,
            });
            ok(
                &req.id,
                json!({ "authenticated": true, "username": username, "role": role }),
            )
        }
        Ok(None) => {
            tracing::info!(username = %username, "login rejected");
            ok(&req.id, json!({ "authenticated": false }))
        }
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was = state.session.take();
    ok(&req.id, json!({ "loggedOut": was.is_some() }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.session }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
