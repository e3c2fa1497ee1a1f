//! One-shot bulk download that seeds the local store.
//!
//! # Responsibility
//! - Replace reference tables with the remote's authoritative copy.
//! - Append transactional records as `synced`.
//!
//! # Invariants
//! - Nothing is written unless the remote answers `pong`.
//! - Transactional tables are never appended while local pending work
//!   exists; the report records the skip instead.
//! - A table is written only after every page has been fetched; a failed
//!   page leaves the stored table untouched.

use crate::config::SyncConfig;
use crate::db::LocalStore;
use crate::model::{GroupMember, Parameter, Partner, Person, Site, SyncStatus, User};
use crate::remote::{ops, GatewayError, QueryPage, RemoteGateway, RemoteTransport};
use crate::repo::{
    ActivityRepository, AttendanceRepository, PendingSummary, ReferenceRecord,
    ReferenceRepository, RepoError, Repository, SessionRepository, SyncRecord,
};
use crate::sync::engine::PING_ANSWER;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum ColdLoadError {
    /// Ping failed or answered something other than `pong`.
    Unreachable(String),
    Gateway(GatewayError),
    Repo(RepoError),
}

impl Display for ColdLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(detail) => write!(f, "remote service unreachable: {detail}"),
            Self::Gateway(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ColdLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreachable(_) => None,
            Self::Gateway(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<GatewayError> for ColdLoadError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<RepoError> for ColdLoadError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Rows loaded per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColdLoadReport {
    pub people: usize,
    pub sites: usize,
    pub partners: usize,
    pub parameters: usize,
    pub users: usize,
    pub group_members: usize,
    pub activities: usize,
    pub sessions: usize,
    pub attendances: usize,
    /// Set when local pending work blocked the transactional tables.
    pub transactional_skipped: bool,
}

pub struct ColdLoader<T> {
    store: LocalStore,
    gateway: RemoteGateway<T>,
    page_size: u32,
}

impl<T: RemoteTransport> ColdLoader<T> {
    pub fn new(store: LocalStore, gateway: RemoteGateway<T>, config: &SyncConfig) -> Self {
        Self {
            store,
            gateway,
            page_size: config.cold_load_page_size.max(1),
        }
    }

    pub async fn run(&self) -> Result<ColdLoadReport, ColdLoadError> {
        let started_at = Instant::now();
        info!("event=cold_load module=sync status=start");

        let result = self.load().await;
        match &result {
            Ok(report) => info!(
                "event=cold_load module=sync status=ok duration_ms={} transactional_skipped={}",
                started_at.elapsed().as_millis(),
                report.transactional_skipped
            ),
            Err(err) => warn!(
                "event=cold_load module=sync status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    async fn load(&self) -> Result<ColdLoadReport, ColdLoadError> {
        match self.gateway.ping().await {
            Ok(answer) if answer == PING_ANSWER => {}
            Ok(answer) => {
                return Err(ColdLoadError::Unreachable(format!(
                    "unexpected ping answer `{answer}`"
                )))
            }
            Err(err) => return Err(ColdLoadError::Unreachable(err.to_string())),
        }

        let references = ReferenceRepository::new(self.store.clone());
        let mut report = ColdLoadReport {
            people: self
                .load_reference::<Person>(&references, ops::QUERY_PEOPLE)
                .await?,
            sites: self
                .load_reference::<Site>(&references, ops::QUERY_SITES)
                .await?,
            partners: self
                .load_reference::<Partner>(&references, ops::QUERY_PARTNERS)
                .await?,
            parameters: self
                .load_reference::<Parameter>(&references, ops::QUERY_PARAMETERS)
                .await?,
            users: self
                .load_reference::<User>(&references, ops::QUERY_USERS)
                .await?,
            group_members: self
                .load_reference::<GroupMember>(&references, ops::QUERY_GROUP_MEMBERS)
                .await?,
            ..ColdLoadReport::default()
        };

        let pending = PendingSummary::collect(&self.store)?;
        if !pending.is_empty() {
            warn!(
                "event=cold_load module=sync status=skip phase=transactional reason=pending_work pending={}",
                pending.total()
            );
            report.transactional_skipped = true;
            return Ok(report);
        }

        report.activities = self
            .load_transactional(
                &ActivityRepository::new(self.store.clone()),
                ops::QUERY_ACTIVITIES,
            )
            .await?;
        report.sessions = self
            .load_transactional(
                &SessionRepository::new(self.store.clone()),
                ops::QUERY_SESSIONS,
            )
            .await?;
        report.attendances = self
            .load_transactional(
                &AttendanceRepository::new(self.store.clone()),
                ops::QUERY_ATTENDANCES,
            )
            .await?;
        Ok(report)
    }

    async fn load_reference<R>(
        &self,
        references: &ReferenceRepository,
        operation: &str,
    ) -> Result<usize, ColdLoadError>
    where
        R: ReferenceRecord + DeserializeOwned,
    {
        let records = self.fetch_all::<R>(operation).await?;
        Ok(references.replace(&records)?)
    }

    async fn load_transactional<E>(
        &self,
        repository: &Repository<E>,
        operation: &str,
    ) -> Result<usize, ColdLoadError>
    where
        E: SyncRecord + DeserializeOwned,
    {
        let mut records = self.fetch_all::<E>(operation).await?;
        for record in records.iter_mut() {
            record.set_sync_status(SyncStatus::Synced);
            record.clear_deleted();
        }
        Ok(repository.bulk_load(&records)?)
    }

    async fn fetch_all<R>(&self, operation: &str) -> Result<Vec<R>, ColdLoadError>
    where
        R: DeserializeOwned,
    {
        let mut page = 0u32;
        let mut records = Vec::new();
        loop {
            let QueryPage { items, has_more } = self
                .gateway
                .query_page::<R>(operation, page, self.page_size)
                .await?;
            let received = items.len();
            records.extend(items);
            if !has_more || received == 0 {
                break;
            }
            page += 1;
        }

        info!(
            "event=cold_load_table module=sync status=ok operation={} pages={} count={}",
            operation,
            page + 1,
            records.len()
        );
        Ok(records)
    }
}
