/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::error::{self, Error};
use crate::uri::ObjectUri;

use super::UploadSession;

type SharedSession = Arc<tokio::sync::Mutex<UploadSession>>;

/// Open upload sessions of a single client, keyed by file URI.
///
/// The map lock is only held to look up, insert or remove entries, never across an `.await`.
/// Each session has its own async lock, claimed without waiting so that a second writer on the
/// same path is rejected instead of interleaving with the first.
#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: Mutex<HashMap<ObjectUri, SharedSession>>,
}

/// Exclusive access to an open session.
#[derive(Debug)]
pub(crate) struct ClaimedSession {
    session: SharedSession,
    guard: OwnedMutexGuard<UploadSession>,
}

impl ClaimedSession {
    pub(crate) fn session(&mut self) -> &mut UploadSession {
        &mut *self.guard
    }
}

impl SessionTable {
    /// Claim the session for `uri`, opening a new one if none exists.
    pub(crate) fn claim_or_open(
        &self,
        uri: &ObjectUri,
        part_size: usize,
    ) -> Result<ClaimedSession, Error> {
        let session = {
            let mut sessions = self.sessions.lock().expect("lock valid");
            sessions
                .entry(uri.clone())
                .or_insert_with(|| {
                    tracing::debug!("opened upload session for `{uri}`");
                    Arc::new(tokio::sync::Mutex::new(UploadSession::new(
                        uri.clone(),
                        part_size,
                    )))
                })
                .clone()
        };
        claim(uri, session)
    }

    /// Claim the session for `uri` if one is open.
    pub(crate) fn claim(&self, uri: &ObjectUri) -> Result<Option<ClaimedSession>, Error> {
        let session = self.sessions.lock().expect("lock valid").get(uri).cloned();
        session.map(|session| claim(uri, session)).transpose()
    }

    /// Drop a claimed session from the table.
    ///
    /// Only the exact session claimed is removed, a newer session opened for the same path is
    /// left alone.
    pub(crate) fn remove(&self, uri: &ObjectUri, claimed: ClaimedSession) {
        let mut sessions = self.sessions.lock().expect("lock valid");
        if let Some(current) = sessions.get(uri) {
            if Arc::ptr_eq(current, &claimed.session) {
                sessions.remove(uri);
            }
        }
    }

    /// Whether a session is open for `uri`.
    pub(crate) fn contains(&self, uri: &ObjectUri) -> bool {
        self.sessions.lock().expect("lock valid").contains_key(uri)
    }

    /// Number of open sessions
    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().expect("lock valid").len()
    }
}

fn claim(uri: &ObjectUri, session: SharedSession) -> Result<ClaimedSession, Error> {
    let guard = session.clone().try_lock_owned().map_err(|_| {
        error::invalid_state(format!(
            "session busy: another operation is in progress on `{uri}`"
        ))
    })?;
    Ok(ClaimedSession { session, guard })
}
