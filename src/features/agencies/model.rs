use crate::api::Agency;
use crate::core::{Generation, WebData};

/// Agencies below the colector's node of the betting structure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgenciesModel {
    pub agencies: WebData<Vec<Agency>>,
    /// Structure currently shown or about to be fetched.
    pub user_structure_id: Option<String>,
    /// Structure this store was initialized for. Survives sign-out and
    /// takes precedence over the session's own structure.
    pub bound_structure_id: Option<String>,
    /// Token of the signed-in user; fetches need one.
    pub token: Option<String>,
    /// Bumped per fetch so late responses for an older request are dropped.
    pub generation: Generation,
}

impl AgenciesModel {
    /// True when data for `structure_id` is loaded or on its way.
    pub fn has_data_for(&self, structure_id: &str) -> bool {
        self.user_structure_id.as_deref() == Some(structure_id)
            && (self.agencies.is_success() || self.agencies.is_loading())
    }

    /// Empty dashboard for `bound_structure_id`, with no session attached.
    pub fn bound_to(bound_structure_id: Option<String>) -> Self {
        Self {
            user_structure_id: bound_structure_id.clone(),
            bound_structure_id,
            ..Self::default()
        }
    }
}
