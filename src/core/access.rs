//! Row-level access control.
//!
//! Every data-access function in `core` receives the [`Requester`] explicitly,
//! resolves it into a [`Subject`] once per call and then asks the rule for the
//! target table whether each row may be read or written. Rules are pure functions
//! of `(subject, operation, row)`; nothing is cached between calls, so a role change
//! is visible on the very next request.
//!
//! Updates are checked twice, mirroring row-level security in relational backends:
//! [`RowRule::check`] runs against the stored row and [`RowRule::check_proposed`]
//! runs against the row as it would look after the write.

use crate::{
    entities::{
        AnalyticsEventModel, CurriculumModuleModel, OrderModel, Profile, ProductModel,
        ProfileModel, Role, profile,
    },
    errors::Result,
};
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

/// Who is asking. Authentication happens upstream; this is only the identity it
/// produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requester {
    /// No session
    Anonymous,
    /// Authenticated principal
    Principal(Uuid),
}

impl Requester {
    /// Principal id, if authenticated.
    #[must_use]
    pub const fn id(&self) -> Option<Uuid> {
        match self {
            Self::Anonymous => None,
            Self::Principal(id) => Some(*id),
        }
    }
}

/// Row operation being authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Read
    Select,
    /// Create
    Insert,
    /// Modify
    Update,
    /// Remove
    Delete,
}

/// Outcome of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Operation may proceed
    Allow,
    /// Row is hidden or the write is rejected
    Deny,
}

impl Decision {
    const fn from_bool(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }

    /// True for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// A requester together with the role stored for it at the start of the call.
///
/// Outside tests a `Subject` can only be obtained through [`Subject::resolve`], so the
/// admin flag always comes from the profile table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subject {
    id: Option<Uuid>,
    is_admin: bool,
}

impl Subject {
    /// Reads the requester's current role and builds the subject for this call.
    ///
    /// # Errors
    /// Returns an error if the role lookup fails.
    pub async fn resolve<C: ConnectionTrait>(db: &C, requester: &Requester) -> Result<Self> {
        let is_admin = match requester.id() {
            Some(id) => requester_is_admin(db, id).await?,
            None => false,
        };
        trace!(?requester, is_admin, "resolved subject");
        Ok(Self {
            id: requester.id(),
            is_admin,
        })
    }

    /// Principal id, None for anonymous callers.
    #[must_use]
    pub const fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Whether the stored role was `admin` when the subject was resolved.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Whether the caller has a session at all.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }

    fn is(&self, principal: Uuid) -> bool {
        self.id == Some(principal)
    }

    fn owns(&self, owner: Option<Uuid>) -> bool {
        owner.is_some() && self.id == owner
    }

    #[cfg(test)]
    pub(crate) const fn anonymous() -> Self {
        Self {
            id: None,
            is_admin: false,
        }
    }

    #[cfg(test)]
    pub(crate) const fn customer(id: Uuid) -> Self {
        Self {
            id: Some(id),
            is_admin: false,
        }
    }

    #[cfg(test)]
    pub(crate) const fn admin(id: Uuid) -> Self {
        Self {
            id: Some(id),
            is_admin: true,
        }
    }
}

/// Answers "is this principal an admin" by reading its stored role.
///
/// The profile rule depends on this answer, so the lookup cannot itself go through
/// the profile rule. It reads a single column of a single row and returns a bool;
/// keep it that way.
async fn requester_is_admin<C: ConnectionTrait>(db: &C, principal: Uuid) -> Result<bool> {
    let role: Option<Role> = Profile::find_by_id(principal)
        .select_only()
        .column(profile::Column::Role)
        .into_tuple()
        .one(db)
        .await?;
    Ok(role == Some(Role::Admin))
}

/// Row-level rule for one table.
pub trait RowRule {
    /// Row the rule is evaluated against.
    type Row;

    /// Decides `op` against a stored row, or against the new row for inserts.
    fn check(subject: &Subject, op: Operation, row: &Self::Row) -> Decision;

    /// Decides whether the row produced by a write is acceptable.
    ///
    /// Defaults to [`RowRule::check`] with the same operation.
    fn check_proposed(subject: &Subject, op: Operation, row: &Self::Row) -> Decision {
        Self::check(subject, op, row)
    }
}

/// Profiles: own row only, no self-escalation; admins unrestricted.
pub struct ProfileRule;

impl RowRule for ProfileRule {
    type Row = ProfileModel;

    fn check(subject: &Subject, op: Operation, row: &ProfileModel) -> Decision {
        if subject.is_admin() {
            return Decision::Allow;
        }
        Decision::from_bool(match op {
            Operation::Select | Operation::Update => subject.is(row.id),
            Operation::Insert => subject.is(row.id) && row.role == Role::Customer,
            Operation::Delete => false,
        })
    }

    fn check_proposed(subject: &Subject, op: Operation, row: &ProfileModel) -> Decision {
        if subject.is_admin() {
            return Decision::Allow;
        }
        Decision::from_bool(match op {
            Operation::Insert | Operation::Update => {
                subject.is(row.id) && row.role == Role::Customer
            }
            Operation::Select | Operation::Delete => false,
        })
    }
}

/// Curriculum modules: published rows readable by anyone; writes admin-only.
pub struct CurriculumRule;

impl RowRule for CurriculumRule {
    type Row = CurriculumModuleModel;

    fn check(subject: &Subject, op: Operation, row: &CurriculumModuleModel) -> Decision {
        Decision::from_bool(match op {
            Operation::Select => row.published || subject.is_admin(),
            Operation::Insert | Operation::Update | Operation::Delete => subject.is_admin(),
        })
    }
}

/// Products: readable by anyone; writes admin-only.
pub struct ProductRule;

impl RowRule for ProductRule {
    type Row = ProductModel;

    fn check(subject: &Subject, op: Operation, _row: &ProductModel) -> Decision {
        Decision::from_bool(match op {
            Operation::Select => true,
            Operation::Insert | Operation::Update | Operation::Delete => subject.is_admin(),
        })
    }
}

/// Orders: owner or admin may read; any authenticated principal may insert;
/// fulfilment changes are admin-only.
pub struct OrderRule;

impl RowRule for OrderRule {
    type Row = OrderModel;

    fn check(subject: &Subject, op: Operation, row: &OrderModel) -> Decision {
        Decision::from_bool(match op {
            Operation::Select => subject.is_admin() || subject.owns(row.user_id),
            Operation::Insert => subject.is_authenticated(),
            Operation::Update | Operation::Delete => subject.is_admin(),
        })
    }
}

/// Order items inherit from their parent order, so this rule is evaluated against
/// the parent row.
pub struct OrderItemRule;

impl RowRule for OrderItemRule {
    type Row = OrderModel;

    fn check(subject: &Subject, op: Operation, parent: &OrderModel) -> Decision {
        match op {
            Operation::Select => OrderRule::check(subject, Operation::Select, parent),
            Operation::Insert => Decision::from_bool(
                subject.is_admin() || subject.owns(parent.user_id),
            ),
            Operation::Update | Operation::Delete => Decision::from_bool(subject.is_admin()),
        }
    }
}

/// Analytics events: admin-only for everything.
pub struct AnalyticsRule;

impl RowRule for AnalyticsRule {
    type Row = AnalyticsEventModel;

    fn check(subject: &Subject, _op: Operation, _row: &AnalyticsEventModel) -> Decision {
        Decision::from_bool(subject.is_admin())
    }
}

/// Keeps the rows `subject` may select.
pub fn visible<R: RowRule>(subject: &Subject, rows: Vec<R::Row>) -> Vec<R::Row> {
    rows.into_iter()
        .filter(|row| R::check(subject, Operation::Select, row).is_allowed())
        .collect()
}
