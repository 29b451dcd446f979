//! Access policies.
//!
//! Each operation calls exactly one policy function with the acting user and the
//! resource, and gets a [`Decision`] back. Authentication itself is enforced earlier
//! by the [`AuthUser`] extractor, so these functions only see signed-in actors (except
//! [`signup`], which guards the anonymous-only entry point).

use crate::{auth::AuthUser, error::AppError, flow::Notice, models::Comment};

/// Decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Notice),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Denial as the 403 error page. Used by update operations.
    pub fn or_forbid(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(notice) => Err(AppError::Forbidden(notice)),
        }
    }

    /// Denial as a redirect with an error notice. Used by delete operations.
    pub fn or_redirect(self, redirect_to: impl Into<String>) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(notice) => Err(AppError::AuthorizationDenied {
                redirect_to: redirect_to.into(),
                notice,
            }),
        }
    }
}

/// Book and author create/update: any signed-in actor may edit the catalog.
pub fn edit_catalog(_actor: &AuthUser) -> Decision {
    Decision::Allow
}

/// Posting a comment or reply. Creator and book are bound by the handler, so there is
/// nothing left to check beyond authentication.
pub fn post_comment(_actor: &AuthUser) -> Decision {
    Decision::Allow
}

/// Comment update/delete: only the creator.
pub fn modify_comment(actor: &AuthUser, comment: &Comment) -> Decision {
    if comment.creator_id == actor.id {
        Decision::Allow
    } else {
        Decision::Deny(Notice::NotCommentCreator)
    }
}

/// Account update/delete: only the account itself.
pub fn modify_account(actor: &AuthUser, target_user_id: i64) -> Decision {
    if target_user_id == actor.id {
        Decision::Allow
    } else {
        Decision::Deny(Notice::NotAccountOwner)
    }
}

/// Reading-list changes always act on the actor's own list.
pub fn manage_reading_list(_actor: &AuthUser) -> Decision {
    Decision::Allow
}

/// Signup is for anonymous visitors only.
pub fn signup(actor: Option<&AuthUser>) -> Decision {
    match actor {
        None => Decision::Allow,
        Some(_) => Decision::Deny(Notice::AlreadySignedIn),
    }
}
