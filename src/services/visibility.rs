//! Per-row visibility shared by products and categories.
//!
//! Admins see everything. Owners see their own rows regardless of flags.
//! Everyone else sees rows that are public (NULL counts as public for
//! legacy rows) and not hidden.

use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;

/// Query-level filter. `None` means no filtering (admin).
pub fn row_filter<C: ColumnTrait>(
    viewer: Option<&AuthUser>,
    user_col: C,
    is_public_col: C,
    hidden_col: C,
) -> Option<Condition> {
    let public = public_condition(is_public_col, hidden_col);
    match viewer {
        Some(user) if user.is_admin() => None,
        Some(user) => Some(
            Condition::any()
                .add(user_col.eq(user.user_id))
                .add(public),
        ),
        None => Some(public),
    }
}

fn public_condition<C: ColumnTrait>(is_public_col: C, hidden_col: C) -> Condition {
    Condition::all()
        .add(
            Condition::any()
                .add(is_public_col.eq(true))
                .add(is_public_col.is_null()),
        )
        .add(hidden_col.eq(false))
}

/// Row-level check for already-loaded models, mirroring [`row_filter`].
pub fn can_view(
    viewer: Option<&AuthUser>,
    row_user_id: Option<Uuid>,
    is_public: Option<bool>,
    hidden: bool,
) -> bool {
    if let Some(user) = viewer {
        if user.is_admin() {
            return true;
        }
        if row_user_id == Some(user.user_id) {
            return true;
        }
    }
    is_public.unwrap_or(true) && !hidden
}

/// Mutation guard: only the owner or an admin may touch the row.
pub fn can_mutate(user: &AuthUser, row_user_id: Option<Uuid>) -> bool {
    user.is_admin() || row_user_id == Some(user.user_id)
}
