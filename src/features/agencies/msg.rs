use crate::api::{Agency, User};
use crate::core::{Ticket, WebData};

/// What the agencies store needs to know about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub structure_id: Option<String>,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            token: user.token.clone(),
            structure_id: user.structure_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgenciesMsg {
    /// The session changed (`None` after sign-out).
    SessionChanged { session: Option<Session> },
    FetchDataRequested { structure_id: String },
    /// Fetch again even if data is already loaded.
    RefreshRequested,
    FetchDataResponse {
        ticket: Ticket,
        web_data: WebData<Vec<Agency>>,
    },
}
