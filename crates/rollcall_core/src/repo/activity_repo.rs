//! Activity visibility and form-context queries.
//!
//! # Responsibility
//! - Resolve which activities a user may see.
//! - Assemble the reference bundles used by activity create/edit forms.
//!
//! # Invariants
//! - Soft-deleted activities (`state=deleted`) are never visible, even after
//!   their deletion has been acknowledged remotely.
//! - Context builders are read-only.

use crate::model::{
    Activity, Parameter, Partner, Site, User, PARAMETER_SET_ACTIVITY_TYPE,
    PARAMETER_SET_FREQUENCY,
};
use crate::repo::entity_repo::{query_records, RepoResult, Repository};
use crate::repo::reference_repo::{assigned_site_ids, placeholders, ReferenceRepository};
use log::debug;
use rusqlite::{params, params_from_iter};
use serde::Serialize;

/// Reference data offered by the activity form, scoped to one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityFormContext {
    pub sites: Vec<Site>,
    pub partners: Vec<Partner>,
    pub activity_types: Vec<Parameter>,
    pub frequencies: Vec<Parameter>,
    pub responsibles: Vec<User>,
}

/// Form context plus the activity being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEditContext {
    pub activity: Activity,
    pub context: ActivityFormContext,
}

impl Repository<Activity> {
    /// Activities visible to `user_id`.
    ///
    /// Users without assigned sites see every live activity; others see live
    /// activities of their sites only.
    pub fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Activity>> {
        let activities = self.store().with_conn(|conn| {
            let site_ids = assigned_site_ids(conn, user_id)?;
            if site_ids.is_empty() {
                return query_records::<Activity, _>(
                    conn,
                    "state = 'active' ORDER BY date ASC, start_time ASC, id ASC",
                    params![],
                );
            }

            let where_clause = format!(
                "state = 'active' AND site_id IN ({}) ORDER BY date ASC, start_time ASC, id ASC",
                placeholders(site_ids.len())
            );
            query_records::<Activity, _>(conn, &where_clause, params_from_iter(site_ids.iter()))
        })?;

        debug!(
            "event=activity_list_by_user module=repo status=ok user_id={} count={}",
            user_id,
            activities.len()
        );
        Ok(activities)
    }

    /// Reference bundle for the activity creation form.
    pub fn build_pre_create_context(&self, user_id: &str) -> RepoResult<ActivityFormContext> {
        let references = ReferenceRepository::new(self.store().clone());
        let site_ids = references.user_site_ids(user_id)?;

        Ok(ActivityFormContext {
            sites: references.sites_for_user(user_id)?,
            partners: references.all::<Partner>()?,
            activity_types: references.parameters_in_set(PARAMETER_SET_ACTIVITY_TYPE)?,
            frequencies: references.parameters_in_set(PARAMETER_SET_FREQUENCY)?,
            responsibles: references.users_for_sites(&site_ids)?,
        })
    }

    /// Reference bundle plus the current activity; `None` when the activity is
    /// absent or deleted.
    pub fn build_pre_edit_context(
        &self,
        activity_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<ActivityEditContext>> {
        let Some(activity) = self.get_by_id(activity_id)? else {
            return Ok(None);
        };
        if !activity.is_active() {
            return Ok(None);
        }

        Ok(Some(ActivityEditContext {
            activity,
            context: self.build_pre_create_context(user_id)?,
        }))
    }
}
