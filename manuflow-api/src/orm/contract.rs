use diesel::prelude::*;

use crate::models::{Contract, ContractChanges, ContractInput, NewContract};
use crate::orm::db::{last_insert_id, now};
use crate::schema::contracts;
use crate::tenancy::{ContractScope, apply_scope};

pub fn insert_contract(
    conn: &mut SqliteConnection,
    company_id: i32,
    input: ContractInput,
) -> QueryResult<Contract> {
    let timestamp = now();
    let new_contract = NewContract {
        company_id,
        name: input.name.trim().to_string(),
        code: input.code,
        client_name: input.client_name,
        address: input.address,
        active: true,
        created_at: timestamp,
        updated_at: timestamp,
    };
    diesel::insert_into(contracts::table)
        .values(&new_contract)
        .execute(conn)?;
    let contract_id = last_insert_id(conn)?;
    contracts::table
        .find(contract_id)
        .select(Contract::as_select())
        .first(conn)
}

/// Live contract by id.
pub fn get_contract(conn: &mut SqliteConnection, contract_id: i32) -> QueryResult<Option<Contract>> {
    contracts::table
        .filter(contracts::id.eq(contract_id))
        .filter(contracts::deleted_at.is_null())
        .select(Contract::as_select())
        .first(conn)
        .optional()
}

/// Live contract of a company with the given name (case-insensitive).
pub fn get_contract_by_name(
    conn: &mut SqliteConnection,
    company_id: i32,
    name: &str,
) -> QueryResult<Option<Contract>> {
    contracts::table
        .filter(contracts::company_id.eq(company_id))
        .filter(contracts::name.eq(name.trim()))
        .filter(contracts::deleted_at.is_null())
        .select(Contract::as_select())
        .first(conn)
        .optional()
}

/// Live contracts visible through `scope`, ordered by name.
pub fn list_contracts(conn: &mut SqliteConnection, scope: &ContractScope) -> QueryResult<Vec<Contract>> {
    let query = contracts::table
        .filter(contracts::deleted_at.is_null())
        .select(Contract::as_select())
        .into_boxed();
    let query = apply_scope!(query, scope, contracts::company_id, contracts::id);
    query.order((contracts::name.asc(), contracts::id.asc())).load(conn)
}

/// Ids of the live contracts of a company.
pub fn company_contract_ids(conn: &mut SqliteConnection, company_id: i32) -> QueryResult<Vec<i32>> {
    contracts::table
        .filter(contracts::company_id.eq(company_id))
        .filter(contracts::deleted_at.is_null())
        .select(contracts::id)
        .load(conn)
}

pub fn update_contract(
    conn: &mut SqliteConnection,
    contract_id: i32,
    mut changes: ContractChanges,
) -> QueryResult<Contract> {
    changes.name = changes.name.map(|n| n.trim().to_string());
    changes.updated_at = Some(now());
    diesel::update(contracts::table.find(contract_id))
        .set(&changes)
        .execute(conn)?;
    contracts::table
        .find(contract_id)
        .select(Contract::as_select())
        .first(conn)
}

pub fn soft_delete_contract(conn: &mut SqliteConnection, contract_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        contracts::table
            .filter(contracts::id.eq(contract_id))
            .filter(contracts::deleted_at.is_null()),
    )
    .set((
        contracts::deleted_at.eq(Some(timestamp)),
        contracts::active.eq(false),
        contracts::updated_at.eq(timestamp),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}
