use std::sync::Arc;

use crate::api::LoginService;
use crate::core::{Alert, AlertButton, Cmd, Navigation, RemoteData, Return, Update};

use super::model::{AuthModel, LoginSession};
use super::msg::AuthMsg;

pub const LOGIN_ROUTE: &str = "/login";

/// What the auth store needs from the outside.
pub struct AuthEnv {
    pub login: Arc<dyn LoginService>,
}

pub struct AuthUpdate;

impl Update for AuthUpdate {
    type Model = AuthModel;
    type Msg = AuthMsg;
    type Env = AuthEnv;
    type Flags = ();

    fn init(_env: &AuthEnv, _flags: ()) -> Return<AuthModel, AuthMsg> {
        Return::singleton(AuthModel::default())
    }

    fn update(env: &AuthEnv, model: &AuthModel, msg: AuthMsg) -> Return<AuthModel, AuthMsg> {
        match msg {
            AuthMsg::LoginRequested { username, password } => {
                if model.login_session.is_submitting {
                    tracing::debug!("login already in progress");
                    return Return::singleton(model.clone());
                }

                let service = Arc::clone(&env.login);
                let attempt_username = username.clone();
                let cmd = Cmd::task(
                    move || async move { service.login(&attempt_username, password.expose()).await },
                    |user| AuthMsg::LoginResponseReceived {
                        web_data: RemoteData::success(user),
                    },
                    |error| AuthMsg::LoginResponseReceived {
                        web_data: RemoteData::failure(error),
                    },
                );

                Return::val(
                    AuthModel {
                        is_loading: true,
                        login_session: LoginSession {
                            is_submitting: true,
                            username,
                            error: None,
                        },
                        ..model.clone()
                    },
                    cmd,
                )
            }

            AuthMsg::LoginResponseReceived { web_data } => match web_data {
                RemoteData::Success(user) => {
                    tracing::info!(username = %user.username, role = %user.role, "signed in");
                    let home = Cmd::navigate(Navigation::replace(user.role.dashboard()));
                    Return::val(
                        AuthModel {
                            is_loading: false,
                            is_authenticated: true,
                            user: Some(user),
                            login_session: LoginSession::default(),
                        },
                        home,
                    )
                }
                RemoteData::Failure(error) => {
                    tracing::warn!(error_type = error.error_type(), %error, "login failed");
                    let alert = Cmd::alert(
                        Alert::new("Login failed", error.to_string())
                            .button(AlertButton::cancel("OK")),
                    );
                    Return::val(
                        AuthModel {
                            is_loading: false,
                            is_authenticated: false,
                            user: None,
                            login_session: LoginSession {
                                is_submitting: false,
                                username: model.login_session.username.clone(),
                                error: Some(error),
                            },
                        },
                        alert,
                    )
                }
                RemoteData::Loading => Return::singleton(AuthModel {
                    is_loading: true,
                    ..model.clone()
                }),
                RemoteData::NotAsked => Return::singleton(model.clone()),
            },

            AuthMsg::LogoutRequested => {
                if !model.is_authenticated {
                    return Return::singleton(model.clone());
                }
                let confirm = Alert::new("Sign out", "Do you want to end this session?")
                    .button(AlertButton::cancel("Cancel"))
                    .button(AlertButton::destructive("Sign out", AuthMsg::LogoutConfirmed));
                Return::val(model.clone(), Cmd::alert(confirm))
            }

            AuthMsg::LogoutConfirmed => {
                tracing::info!("signed out");
                Return::val(AuthModel::default(), Cmd::replace(LOGIN_ROUTE))
            }
        }
    }
}
