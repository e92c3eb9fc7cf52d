//! Multi-tenancy rules.
//!
//! Every business row carries a `company_id`. Which of those rows a caller
//! may see is decided here: the super-admin sees everything, OWNER/ADMIN see
//! their whole company, SUPERVISOR/TECHNICIAN only the contracts they are
//! assigned to.

use diesel::prelude::*;

use crate::error::{ApiError, ApiResult};
use crate::models::{Contract, User, UserRole};
use crate::orm::contract::get_contract;
use crate::orm::user::get_user_contract_ids;

/// Set of contracts visible to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractScope {
    /// Every contract of every company.
    All,
    /// Every contract of one company.
    Company(i32),
    /// Only the listed contracts, all inside `company_id`.
    Only { company_id: i32, contract_ids: Vec<i32> },
}

impl ContractScope {
    pub fn for_user(conn: &mut SqliteConnection, user: &User) -> QueryResult<ContractScope> {
        match user.role {
            UserRole::SuperAdmin => Ok(ContractScope::All),
            UserRole::Owner | UserRole::Admin => Ok(ContractScope::Company(user.company_id)),
            UserRole::Supervisor | UserRole::Technician => Ok(ContractScope::Only {
                company_id: user.company_id,
                contract_ids: get_user_contract_ids(conn, user.id)?,
            }),
        }
    }

    pub fn allows(&self, company_id: i32, contract_id: i32) -> bool {
        match self {
            ContractScope::All => true,
            ContractScope::Company(id) => *id == company_id,
            ContractScope::Only { company_id: id, contract_ids } => {
                *id == company_id && contract_ids.contains(&contract_id)
            }
        }
    }

    /// Company the scope is confined to, `None` for the super-admin.
    pub fn company_id(&self) -> Option<i32> {
        match self {
            ContractScope::All => None,
            ContractScope::Company(id) => Some(*id),
            ContractScope::Only { company_id, .. } => Some(*company_id),
        }
    }

    /// Explicit contract list for assignment-scoped users.
    pub fn contract_ids(&self) -> Option<&[i32]> {
        match self {
            ContractScope::Only { contract_ids, .. } => Some(contract_ids),
            _ => None,
        }
    }
}

/// Narrows a boxed query over a table with `company_id` and `contract_id`
/// columns to the rows visible through a `&ContractScope`.
macro_rules! apply_scope {
    ($query:expr, $scope:expr, $company_col:expr, $contract_col:expr) => {{
        let mut query = $query;
        match $scope {
            $crate::tenancy::ContractScope::All => {}
            $crate::tenancy::ContractScope::Company(company_id) => {
                query = query.filter($company_col.eq(*company_id));
            }
            $crate::tenancy::ContractScope::Only { company_id, contract_ids } => {
                query = query
                    .filter($company_col.eq(*company_id))
                    .filter($contract_col.eq_any(contract_ids.clone()));
            }
        }
        query
    }};
}
pub(crate) use apply_scope;

pub fn is_super_admin(user: &User) -> bool {
    user.role == UserRole::SuperAdmin
}

/// OWNER or ADMIN of their own company (the super-admin counts too).
pub fn is_manager(user: &User) -> bool {
    user.role.is_manager()
}

pub fn can_access_company(user: &User, company_id: i32) -> bool {
    is_super_admin(user) || user.company_id == company_id
}

pub fn can_manage_company(user: &User, company_id: i32) -> bool {
    is_super_admin(user) || (is_manager(user) && user.company_id == company_id)
}

pub fn can_access_contract(
    conn: &mut SqliteConnection,
    user: &User,
    contract: &Contract,
) -> QueryResult<bool> {
    Ok(ContractScope::for_user(conn, user)?.allows(contract.company_id, contract.id))
}

/// Loads a live contract the user may see.
///
/// Contracts of other companies report 404 so their existence does not
/// leak; contracts of the user's own company outside their assignments
/// report 403.
pub fn load_accessible_contract(
    conn: &mut SqliteConnection,
    user: &User,
    contract_id: i32,
) -> ApiResult<Contract> {
    let contract = get_contract(conn, contract_id)?
        .ok_or_else(|| ApiError::not_found("Contract not found"))?;
    if !can_access_company(user, contract.company_id) {
        return Err(ApiError::not_found("Contract not found"));
    }
    if !can_access_contract(conn, user, &contract)? {
        return Err(ApiError::forbidden("You are not assigned to this contract"));
    }
    Ok(contract)
}

/// Checks that a row owned by `(company_id, contract_id)` is visible.
pub fn ensure_row_access(
    conn: &mut SqliteConnection,
    user: &User,
    company_id: i32,
    contract_id: i32,
    what: &str,
) -> ApiResult<()> {
    if !can_access_company(user, company_id) {
        return Err(ApiError::not_found(format!("{} not found", what)));
    }
    if !ContractScope::for_user(conn, user)?.allows(company_id, contract_id) {
        return Err(ApiError::forbidden("You are not assigned to this contract"));
    }
    Ok(())
}

/// Like [`load_accessible_contract`] but also requires a manager or
/// supervisor role.
pub fn load_editable_contract(
    conn: &mut SqliteConnection,
    user: &User,
    contract_id: i32,
) -> ApiResult<Contract> {
    if !(is_manager(user) || user.role == UserRole::Supervisor) {
        return Err(ApiError::forbidden("Only managers and supervisors may change this data"));
    }
    load_accessible_contract(conn, user, contract_id)
}
