use diesel::prelude::*;

use crate::models::{
    Asset, AssetChanges, AssetInput, AssetScript, AssetScriptInput, AssetScriptStep,
    AssetScriptWithSteps, AssetStatus, NewAsset, NewAssetScript, NewAssetScriptStep,
};
use crate::orm::db::{last_insert_id, now};
use crate::schema::{asset_script_steps, asset_scripts, assets};
use crate::tenancy::{ContractScope, apply_scope};

pub fn insert_asset(conn: &mut SqliteConnection, company_id: i32, input: AssetInput) -> QueryResult<Asset> {
    let timestamp = now();
    let new_asset = NewAsset {
        company_id,
        contract_id: input.contract_id,
        name: input.name.trim().to_string(),
        code: input.code,
        category: input.category.map(|c| c.trim().to_uppercase()),
        location: input.location,
        manufacturer: input.manufacturer,
        model: input.model,
        serial_number: input.serial_number,
        status: input.status.unwrap_or(AssetStatus::Operational),
        created_at: timestamp,
        updated_at: timestamp,
    };
    diesel::insert_into(assets::table)
        .values(&new_asset)
        .execute(conn)?;
    let asset_id = last_insert_id(conn)?;
    assets::table.find(asset_id).select(Asset::as_select()).first(conn)
}

pub fn get_asset(conn: &mut SqliteConnection, asset_id: i32) -> QueryResult<Option<Asset>> {
    assets::table
        .filter(assets::id.eq(asset_id))
        .filter(assets::deleted_at.is_null())
        .select(Asset::as_select())
        .first(conn)
        .optional()
}

#[derive(Debug, Default, Clone)]
pub struct AssetFilter {
    pub contract_id: Option<i32>,
    pub category: Option<String>,
}

/// Live assets visible through `scope`, ordered by name.
pub fn list_assets(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    filter: &AssetFilter,
) -> QueryResult<Vec<Asset>> {
    let mut query = assets::table
        .filter(assets::deleted_at.is_null())
        .select(Asset::as_select())
        .into_boxed();
    query = apply_scope!(query, scope, assets::company_id, assets::contract_id);
    if let Some(contract_id) = filter.contract_id {
        query = query.filter(assets::contract_id.eq(contract_id));
    }
    if let Some(category) = &filter.category {
        query = query.filter(assets::category.eq(category.trim().to_uppercase()));
    }
    query.order((assets::name.asc(), assets::id.asc())).load(conn)
}

pub fn update_asset(
    conn: &mut SqliteConnection,
    asset_id: i32,
    mut changes: AssetChanges,
) -> QueryResult<Asset> {
    changes.category = changes.category.map(|c| c.trim().to_uppercase());
    changes.updated_at = Some(now());
    diesel::update(assets::table.find(asset_id))
        .set(&changes)
        .execute(conn)?;
    assets::table.find(asset_id).select(Asset::as_select()).first(conn)
}

pub fn soft_delete_asset(conn: &mut SqliteConnection, asset_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        assets::table
            .filter(assets::id.eq(asset_id))
            .filter(assets::deleted_at.is_null()),
    )
    .set((assets::deleted_at.eq(Some(timestamp)), assets::updated_at.eq(timestamp)))
    .execute(conn)?;
    Ok(rows > 0)
}

fn insert_script_steps(
    conn: &mut SqliteConnection,
    script_id: i32,
    input: &AssetScriptInput,
) -> QueryResult<()> {
    let steps: Vec<NewAssetScriptStep> = input
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| NewAssetScriptStep {
            script_id,
            step_order: i as i32 + 1,
            title: step.title.trim().to_string(),
            description: step.description.clone(),
        })
        .collect();
    if !steps.is_empty() {
        diesel::insert_into(asset_script_steps::table)
            .values(&steps)
            .execute(conn)?;
    }
    Ok(())
}

/// Creates a checklist for an asset; steps are numbered in input order.
pub fn insert_script(
    conn: &mut SqliteConnection,
    asset_id: i32,
    input: AssetScriptInput,
) -> QueryResult<AssetScriptWithSteps> {
    conn.transaction(|conn| {
        let timestamp = now();
        diesel::insert_into(asset_scripts::table)
            .values(&NewAssetScript {
                asset_id,
                name: input.name.trim().to_string(),
                description: input.description.clone(),
                created_at: timestamp,
                updated_at: timestamp,
            })
            .execute(conn)?;
        let script_id = last_insert_id(conn)?;
        insert_script_steps(conn, script_id, &input)?;
        get_script_with_steps(conn, script_id)?.ok_or(diesel::result::Error::NotFound)
    })
}

/// Replaces name, description and every step of a checklist.
pub fn replace_script(
    conn: &mut SqliteConnection,
    script_id: i32,
    input: AssetScriptInput,
) -> QueryResult<AssetScriptWithSteps> {
    conn.transaction(|conn| {
        diesel::update(asset_scripts::table.find(script_id))
            .set((
                asset_scripts::name.eq(input.name.trim()),
                asset_scripts::description.eq(input.description.clone()),
                asset_scripts::updated_at.eq(now()),
            ))
            .execute(conn)?;
        diesel::delete(asset_script_steps::table.filter(asset_script_steps::script_id.eq(script_id)))
            .execute(conn)?;
        insert_script_steps(conn, script_id, &input)?;
        get_script_with_steps(conn, script_id)?.ok_or(diesel::result::Error::NotFound)
    })
}

pub fn get_script(conn: &mut SqliteConnection, script_id: i32) -> QueryResult<Option<AssetScript>> {
    asset_scripts::table
        .filter(asset_scripts::id.eq(script_id))
        .filter(asset_scripts::deleted_at.is_null())
        .select(AssetScript::as_select())
        .first(conn)
        .optional()
}

pub fn get_script_steps(conn: &mut SqliteConnection, script_id: i32) -> QueryResult<Vec<AssetScriptStep>> {
    asset_script_steps::table
        .filter(asset_script_steps::script_id.eq(script_id))
        .order(asset_script_steps::step_order.asc())
        .select(AssetScriptStep::as_select())
        .load(conn)
}

pub fn get_script_with_steps(
    conn: &mut SqliteConnection,
    script_id: i32,
) -> QueryResult<Option<AssetScriptWithSteps>> {
    let Some(script) = get_script(conn, script_id)? else {
        return Ok(None);
    };
    let steps = get_script_steps(conn, script_id)?;
    Ok(Some(AssetScriptWithSteps { script, steps }))
}

pub fn list_scripts(conn: &mut SqliteConnection, asset_id: i32) -> QueryResult<Vec<AssetScriptWithSteps>> {
    let scripts: Vec<AssetScript> = asset_scripts::table
        .filter(asset_scripts::asset_id.eq(asset_id))
        .filter(asset_scripts::deleted_at.is_null())
        .order(asset_scripts::id.asc())
        .select(AssetScript::as_select())
        .load(conn)?;
    scripts
        .into_iter()
        .map(|script| {
            let steps = get_script_steps(conn, script.id)?;
            Ok(AssetScriptWithSteps { script, steps })
        })
        .collect()
}

pub fn soft_delete_script(conn: &mut SqliteConnection, script_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        asset_scripts::table
            .filter(asset_scripts::id.eq(script_id))
            .filter(asset_scripts::deleted_at.is_null()),
    )
    .set((
        asset_scripts::deleted_at.eq(Some(timestamp)),
        asset_scripts::updated_at.eq(timestamp),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}
