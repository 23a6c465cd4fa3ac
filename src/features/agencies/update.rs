use std::sync::Arc;

use crate::api::StructureService;
use crate::core::{Alert, AlertButton, Cmd, RemoteData, Return, Store, Sub, Update};
use crate::features::auth::{AuthModel, AuthUpdate};

use super::model::AgenciesModel;
use super::msg::{AgenciesMsg, Session};

pub const SESSION_SUB: &str = "agencies/session";

pub struct AgenciesEnv {
    pub structures: Arc<dyn StructureService>,
    /// Session store to follow. Without one, the session must arrive
    /// through `SessionChanged` dispatched by hand.
    pub auth: Option<Store<AuthUpdate>>,
}

pub struct AgenciesUpdate;

impl Update for AgenciesUpdate {
    type Model = AgenciesModel;
    type Msg = AgenciesMsg;
    type Env = AgenciesEnv;
    /// Structure to show instead of the signed-in user's own.
    type Flags = Option<String>;

    fn init(_env: &AgenciesEnv, flags: Option<String>) -> Return<AgenciesModel, AgenciesMsg> {
        Return::singleton(AgenciesModel::bound_to(flags))
    }

    fn update(
        env: &AgenciesEnv,
        model: &AgenciesModel,
        msg: AgenciesMsg,
    ) -> Return<AgenciesModel, AgenciesMsg> {
        match msg {
            AgenciesMsg::SessionChanged { session: None } => {
                let (generation, _) = model.generation.next();
                Return::singleton(AgenciesModel {
                    generation,
                    ..AgenciesModel::bound_to(model.bound_structure_id.clone())
                })
            }

            AgenciesMsg::SessionChanged {
                session: Some(session),
            } => {
                let token_changed = model.token.as_deref() != Some(session.token.as_str());
                let structure_id = model
                    .bound_structure_id
                    .clone()
                    .or_else(|| model.user_structure_id.clone())
                    .or(session.structure_id);
                let next = AgenciesModel {
                    token: Some(session.token),
                    ..model.clone()
                };
                match structure_id {
                    // Data loaded for another session must not be reused.
                    Some(id) if token_changed => fetch(env, next, id),
                    Some(id) => request(env, next, id),
                    None => Return::singleton(next),
                }
            }

            AgenciesMsg::FetchDataRequested { structure_id } => {
                request(env, model.clone(), structure_id)
            }

            AgenciesMsg::RefreshRequested => match model.user_structure_id.clone() {
                Some(id) => fetch(env, model.clone(), id),
                None => Return::singleton(model.clone()),
            },

            AgenciesMsg::FetchDataResponse { ticket, web_data } => {
                if !model.generation.is_current(ticket) {
                    tracing::warn!(?ticket, "stale agencies response ignored");
                    return Return::singleton(model.clone());
                }

                let cmd = match web_data.failure_ref() {
                    Some(error) => Cmd::alert(
                        Alert::new("Could not load agencies", error.to_string())
                            .button(AlertButton::cancel("Close"))
                            .button(AlertButton::new(
                                "Retry",
                                Some(AgenciesMsg::RefreshRequested),
                            )),
                    ),
                    None => Cmd::none(),
                };
                Return::val(
                    AgenciesModel {
                        agencies: web_data,
                        ..model.clone()
                    },
                    cmd,
                )
            }
        }
    }

    fn subscriptions(env: &AgenciesEnv, _model: &AgenciesModel) -> Sub<AgenciesMsg> {
        match &env.auth {
            Some(auth) => Sub::watch_store(
                auth,
                |auth: &AuthModel| auth.user.as_ref().map(Session::from),
                |session: &Option<Session>| AgenciesMsg::SessionChanged {
                    session: session.clone(),
                },
                SESSION_SUB,
            ),
            None => Sub::none(),
        }
    }
}

/// Fetch unless data for `structure_id` is already loaded or loading.
fn request(
    env: &AgenciesEnv,
    model: AgenciesModel,
    structure_id: String,
) -> Return<AgenciesModel, AgenciesMsg> {
    if model.has_data_for(&structure_id) {
        tracing::trace!(%structure_id, "agencies already requested");
        return Return::singleton(model);
    }
    fetch(env, model, structure_id)
}

fn fetch(
    env: &AgenciesEnv,
    model: AgenciesModel,
    structure_id: String,
) -> Return<AgenciesModel, AgenciesMsg> {
    let Some(token) = model.token.clone() else {
        tracing::debug!(%structure_id, "no session yet; fetch deferred");
        return Return::singleton(AgenciesModel {
            agencies: RemoteData::NotAsked,
            user_structure_id: Some(structure_id),
            ..model
        });
    };

    let (generation, ticket) = model.generation.next();
    let service = Arc::clone(&env.structures);
    let id = structure_id.clone();
    let cmd = Cmd::task(
        move || async move { service.agencies(&id, &token).await },
        move |agencies| AgenciesMsg::FetchDataResponse {
            ticket,
            web_data: RemoteData::success(agencies),
        },
        move |error| AgenciesMsg::FetchDataResponse {
            ticket,
            web_data: RemoteData::failure(error),
        },
    );

    Return::val(
        AgenciesModel {
            agencies: RemoteData::Loading,
            user_structure_id: Some(structure_id),
            token: model.token,
            generation,
            ..model
        },
        cmd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Agency;
    use crate::core::{ApiError, CmdTag, Generation};
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl StructureService for Offline {
        async fn agencies(&self, _id: &str, _token: &str) -> Result<Vec<Agency>, ApiError> {
            Err(ApiError::NotConfigured)
        }
    }

    fn env() -> AgenciesEnv {
        AgenciesEnv {
            structures: Arc::new(Offline),
            auth: None,
        }
    }

    fn centro() -> Agency {
        Agency {
            id: "a1".into(),
            name: "Centro".into(),
            listero_count: 3,
        }
    }

    fn loaded(structure_id: &str) -> AgenciesModel {
        let (generation, _) = Generation::default().next();
        AgenciesModel {
            agencies: RemoteData::success(vec![centro()]),
            user_structure_id: Some(structure_id.into()),
            bound_structure_id: None,
            token: Some("t".into()),
            generation,
        }
    }

    fn tags(cmd: Cmd<AgenciesMsg>) -> Vec<CmdTag> {
        cmd.flatten().iter().filter_map(Cmd::tag).collect()
    }

    #[test]
    fn same_structure_is_not_fetched_twice() {
        let model = loaded("5");
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::FetchDataRequested {
                structure_id: "5".into(),
            },
        );
        assert_eq!(ret.model, model);
        assert!(ret.cmd.is_none());
    }

    #[test]
    fn other_structure_goes_loading_and_fetches() {
        let model = loaded("5");
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::FetchDataRequested {
                structure_id: "6".into(),
            },
        );
        assert!(ret.model.agencies.is_loading());
        assert_eq!(ret.model.user_structure_id.as_deref(), Some("6"));
        assert_ne!(ret.model.generation, model.generation);
        assert_eq!(tags(ret.cmd), vec![CmdTag::Task]);
    }

    #[test]
    fn loading_counts_as_requested() {
        let model = AgenciesModel {
            agencies: RemoteData::Loading,
            ..loaded("5")
        };
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::FetchDataRequested {
                structure_id: "5".into(),
            },
        );
        assert!(ret.cmd.is_none());
    }

    #[test]
    fn failed_data_is_fetched_again() {
        let model = AgenciesModel {
            agencies: RemoteData::failure(ApiError::Transport("reset".into())),
            ..loaded("5")
        };
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::FetchDataRequested {
                structure_id: "5".into(),
            },
        );
        assert!(ret.model.agencies.is_loading());
        assert_eq!(tags(ret.cmd), vec![CmdTag::Task]);
    }

    #[test]
    fn fetch_without_session_is_deferred() {
        let ret = AgenciesUpdate::update(
            &env(),
            &AgenciesModel::default(),
            AgenciesMsg::FetchDataRequested {
                structure_id: "5".into(),
            },
        );
        assert!(ret.model.agencies.is_not_asked());
        assert_eq!(ret.model.user_structure_id.as_deref(), Some("5"));
        assert!(ret.cmd.is_none());

        let session = Session {
            token: "t".into(),
            structure_id: None,
        };
        let ret = AgenciesUpdate::update(
            &env(),
            &ret.model,
            AgenciesMsg::SessionChanged {
                session: Some(session),
            },
        );
        assert!(ret.model.agencies.is_loading());
        assert_eq!(tags(ret.cmd), vec![CmdTag::Task]);
    }

    #[test]
    fn stale_response_is_dropped() {
        let model = loaded("5");
        let stale = model.generation.current();
        let refreshed = AgenciesUpdate::update(&env(), &model, AgenciesMsg::RefreshRequested).model;

        let ret = AgenciesUpdate::update(
            &env(),
            &refreshed,
            AgenciesMsg::FetchDataResponse {
                ticket: stale,
                web_data: RemoteData::success(vec![]),
            },
        );
        assert_eq!(ret.model, refreshed);
        assert!(ret.cmd.is_none());
    }

    #[test]
    fn failed_response_offers_retry() {
        let model = AgenciesModel {
            agencies: RemoteData::Loading,
            ..loaded("5")
        };
        let ticket = model.generation.current();
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::FetchDataResponse {
                ticket,
                web_data: RemoteData::failure(ApiError::Unauthorized { status: 401 }),
            },
        );
        assert!(ret.model.agencies.is_failure());
        match ret.cmd.flatten().pop() {
            Some(Cmd::Alert(alert)) => {
                let (_, messages) = alert.split();
                assert_eq!(messages, vec![None, Some(AgenciesMsg::RefreshRequested)]);
            }
            other => panic!("expected alert, got {:?}", other),
        }
    }

    #[test]
    fn sign_out_clears_and_fences() {
        let model = loaded("5");
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::SessionChanged { session: None },
        );
        assert!(ret.model.agencies.is_not_asked());
        assert_eq!(ret.model.token, None);
        assert!(!ret.model.generation.is_current(model.generation.current()));
    }

    #[test]
    fn sign_out_keeps_bound_structure() {
        let model = AgenciesModel {
            bound_structure_id: Some("7".into()),
            ..loaded("7")
        };
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::SessionChanged { session: None },
        );
        assert_eq!(ret.model.bound_structure_id.as_deref(), Some("7"));
        assert_eq!(ret.model.user_structure_id.as_deref(), Some("7"));
        assert!(ret.model.agencies.is_not_asked());
        assert_eq!(ret.model.token, None);
    }

    #[test]
    fn bound_structure_beats_session_structure() {
        let model = AgenciesUpdate::init(&env(), Some("7".into())).model;
        let ret = AgenciesUpdate::update(
            &env(),
            &model,
            AgenciesMsg::SessionChanged {
                session: Some(Session {
                    token: "t".into(),
                    structure_id: Some("5".into()),
                }),
            },
        );
        assert!(ret.model.agencies.is_loading());
        assert_eq!(ret.model.user_structure_id.as_deref(), Some("7"));
        assert_eq!(ret.model.bound_structure_id.as_deref(), Some("7"));
        assert_eq!(tags(ret.cmd), vec![CmdTag::Task]);
    }
}
