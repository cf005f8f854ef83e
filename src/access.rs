//! Access control for file reads.
//!
//! A read walks: resolve record, moderation, visibility/ownership, then the
//! caller's share credential. The first three steps are pure and live in
//! [`check_record`]; share credentials are checked by [`check_share`] and
//! [`check_grant`]. [`authorize_read`] wires them to the stores.

use chrono::{DateTime, Utc};

use crate::auth::{AuthUser, GrantClaims};
use crate::error::AppError;
use crate::storage::models::{FileRecord, ShareRecord, ShareType, Visibility};
use crate::AppState;

/// Terminal state of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Allowed through a share link; its access counter must be bumped.
    AllowViaShare(String),
    Deny(&'static str),
    Blocked,
}

/// Share credentials a caller may attach to a file request.
#[derive(Debug, Clone, Default)]
pub struct ShareCredentials {
    /// Share id, as handed out in `?token=`
    pub token: Option<String>,
    /// Signed grant from a redeemed password or private share
    pub grant: Option<String>,
}

/// Outcome of [`authorize_read`].
#[derive(Debug)]
pub enum ReadAccess {
    Granted {
        record: FileRecord,
        /// The id had no stored record; persist `record` once the blob resolves.
        unregistered: bool,
    },
    Blocked,
}

/// Moderation, then visibility and ownership. `None` means a share credential
/// has to decide.
pub fn check_record(record: &FileRecord, principal: Option<&AuthUser>) -> Option<Decision> {
    if record.moderation.is_blocked() {
        return Some(Decision::Blocked);
    }
    if record.visibility == Visibility::Public {
        return Some(Decision::Allow);
    }
    if principal.is_some_and(|user| record.is_owned_by(&user.id)) {
        return Some(Decision::Allow);
    }
    None
}

/// Check a share id presented directly on the file path. Only `public` and
/// `specific_users` shares are honoured inline; the other kinds must be
/// redeemed through the share access endpoint.
pub fn check_share(
    share: &ShareRecord,
    file_id: &str,
    principal: Option<&AuthUser>,
    now: DateTime<Utc>,
) -> Decision {
    if share.image_id != file_id {
        return Decision::Deny("Share does not grant access to this file");
    }
    if share.is_expired(now) {
        return Decision::Deny("Share has expired");
    }

    match share.share_type {
        ShareType::Public => Decision::AllowViaShare(share.id.clone()),
        ShareType::SpecificUsers => match principal {
            Some(user) if share.allows_user(&user.id) => Decision::AllowViaShare(share.id.clone()),
            Some(_) => Decision::Deny("You are not allowed to view this file"),
            None => Decision::Deny("Sign in to view this file"),
        },
        ShareType::Password | ShareType::Private => {
            Decision::Deny("This share must be opened through its share page")
        }
    }
}

/// Check a grant minted by a successful share redemption. The share it names
/// must still exist and be unexpired.
pub fn check_grant(
    claims: &GrantClaims,
    share: Option<&ShareRecord>,
    file_id: &str,
    now: DateTime<Utc>,
) -> Decision {
    if claims.fid != file_id {
        return Decision::Deny("Grant does not cover this file");
    }
    match share {
        Some(share) if share.image_id == file_id && !share.is_expired(now) => Decision::Allow,
        Some(_) => Decision::Deny("Share has expired"),
        None => Decision::Deny("Share no longer exists"),
    }
}

/// Run the evaluator for a read of `file_id`.
///
/// Denials come back as `Forbidden`. Unknown ids are `NotFound` unless the
/// file policy treats them as fresh public records.
pub fn authorize_read(
    state: &AppState,
    file_id: &str,
    principal: Option<&AuthUser>,
    credentials: &ShareCredentials,
) -> Result<ReadAccess, AppError> {
    let (record, unregistered) = match state.db.get_file(file_id)? {
        Some(record) => (record, false),
        None if state.config.files.auto_register_unknown_files => {
            let record = FileRecord::unregistered(file_id);
            // A claimed blob is only reachable through the record that stored it
            if let Some(claimed_by) = state.db.blob_claim(&record.blob_ref)? {
                tracing::debug!(
                    file_id = %file_id,
                    claimed_by = %claimed_by,
                    "Unknown id names a claimed blob"
                );
                return Err(AppError::not_found("File not found"));
            }
            (record, true)
        }
        None => return Err(AppError::not_found("File not found")),
    };

    let now = Utc::now();
    let decision = match check_record(&record, principal) {
        Some(decision) => decision,
        None => evaluate_credentials(state, &record, principal, credentials, now)?,
    };

    match decision {
        Decision::Allow => Ok(ReadAccess::Granted {
            record,
            unregistered,
        }),
        Decision::AllowViaShare(share_id) => {
            state.db.record_share_access(&share_id, now)?;
            tracing::debug!(file_id = %file_id, share_id = %share_id, "Read allowed via share");
            Ok(ReadAccess::Granted {
                record,
                unregistered,
            })
        }
        Decision::Deny(reason) => {
            tracing::debug!(file_id = %file_id, reason, "Read denied");
            Err(AppError::forbidden(reason))
        }
        Decision::Blocked => {
            tracing::info!(file_id = %file_id, "Blocked content requested");
            Ok(ReadAccess::Blocked)
        }
    }
}

fn evaluate_credentials(
    state: &AppState,
    record: &FileRecord,
    principal: Option<&AuthUser>,
    credentials: &ShareCredentials,
    now: DateTime<Utc>,
) -> Result<Decision, AppError> {
    if let Some(ref grant) = credentials.grant {
        let Ok(claims) = state.tokens.verify_grant(grant) else {
            return Ok(Decision::Deny("Invalid or expired share grant"));
        };
        let share = state.db.get_share(&claims.sid)?;
        return Ok(check_grant(&claims, share.as_ref(), &record.id, now));
    }

    if let Some(ref token) = credentials.token {
        return Ok(match state.db.get_share(token)? {
            Some(share) => check_share(&share, &record.id, principal, now),
            None => Decision::Deny("Share not found"),
        });
    }

    Ok(match principal {
        Some(_) => Decision::Deny("You do not have access to this file"),
        None => Decision::Deny("Sign in or use a share link to view this file"),
    })
}
