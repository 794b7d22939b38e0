use std::sync::Arc;

use club_core::model::{PageRequest, QueryDraft, QueryId, QueryPage, QueryStatus, UserQuery};
use club_core::{Actor, Permission};
use storage::repository::{NewQueryRecord, QueryRepository};

use crate::Clock;
use crate::error::QueryServiceError;

/// Contact-form submissions and their triage.
#[derive(Clone)]
pub struct QueryService {
    clock: Clock,
    queries: Arc<dyn QueryRepository>,
}

impl QueryService {
    #[must_use]
    pub fn new(clock: Clock, queries: Arc<dyn QueryRepository>) -> Self {
        Self { clock, queries }
    }

    /// Store a contact message. Open to anyone.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::Query` when a field is missing or the
    /// email is malformed.
    pub async fn submit(
        &self,
        actor: &Actor,
        first_name: &str,
        last_name: &str,
        email: &str,
        message: &str,
    ) -> Result<UserQuery, QueryServiceError> {
        actor.check(Permission::SubmitQuery)?;
        let draft = QueryDraft::validate(first_name, last_name, email, message)?;
        let query = self
            .queries
            .insert_query(NewQueryRecord {
                draft,
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(query_id = %query.id, "contact query received");
        Ok(query)
    }

    /// One page of queries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::Access` unless the caller is an admin.
    pub async fn list(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<QueryPage, QueryServiceError> {
        actor.require(Permission::ManageQueries)?;
        let (queries, total) = self.queries.list_queries(page).await?;
        Ok(QueryPage {
            queries,
            total,
            page: page.page(),
            pages: page.page_count(total),
        })
    }

    /// # Errors
    ///
    /// Returns `QueryServiceError::Access` unless the caller is an admin and a
    /// `NotFound` storage error for an unknown query.
    pub async fn set_status(
        &self,
        actor: &Actor,
        id: QueryId,
        status: QueryStatus,
    ) -> Result<UserQuery, QueryServiceError> {
        actor.require(Permission::ManageQueries)?;
        let query = self.queries.set_query_status(id, status).await?;
        tracing::info!(query_id = %id, status = %status, "query status changed");
        Ok(query)
    }
}
