use std::collections::BTreeSet;

use confab_db::DbPool;
use confab_models::GroupWithMembers;
use confab_util::{snowflake, validation};

use crate::error::CoreError;
use crate::member_index::MembershipIndex;

/// Create a group. The member set is the union of the requested members
/// and the creator, so the admin is a member no matter what the caller
/// sent.
pub async fn create_group(
    db: &DbPool,
    index: &MembershipIndex,
    admin_id: i64,
    name: &str,
    description: Option<&str>,
    member_ids: &[i64],
) -> Result<GroupWithMembers, CoreError> {
    validation::validate_group_name(name)?;
    if member_ids.is_empty() {
        return Err(CoreError::Validation(
            "a group needs at least one member".into(),
        ));
    }

    let mut unique: BTreeSet<i64> = member_ids.iter().copied().collect();
    unique.insert(admin_id);

    for &user_id in &unique {
        if !confab_db::users::user_exists(db, user_id).await? {
            return Err(CoreError::NotFound);
        }
    }

    let id = snowflake::generate(1);
    let member_list: Vec<i64> = unique.into_iter().collect();
    let row =
        confab_db::groups::create_group(db, id, name.trim(), description, admin_id, &member_list)
            .await?;
    index.invalidate(id).await;

    Ok(GroupWithMembers {
        group: row.into(),
        member_ids: member_list,
    })
}

pub async fn list_groups(db: &DbPool, user_id: i64) -> Result<Vec<GroupWithMembers>, CoreError> {
    let rows = confab_db::groups::list_groups_for_user(db, user_id).await?;
    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let member_ids = confab_db::groups::get_member_ids(db, row.id).await?;
        groups.push(GroupWithMembers {
            group: row.into(),
            member_ids,
        });
    }
    Ok(groups)
}

/// Admin-only. Invalidates the membership index so the next fan-out sees
/// the new member.
pub async fn add_member(
    db: &DbPool,
    index: &MembershipIndex,
    group_id: i64,
    acting_user_id: i64,
    new_member_id: i64,
) -> Result<(), CoreError> {
    let group = confab_db::groups::get_group(db, group_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if group.admin_id != acting_user_id {
        return Err(CoreError::Unauthorized);
    }
    if !confab_db::users::user_exists(db, new_member_id).await? {
        return Err(CoreError::NotFound);
    }

    confab_db::groups::add_member(db, group_id, new_member_id).await?;
    index.invalidate(group_id).await;
    Ok(())
}

/// Admin removal or self-leave. The admin can never be removed: the
/// creator stays a member for the group's lifetime.
pub async fn remove_member(
    db: &DbPool,
    index: &MembershipIndex,
    group_id: i64,
    acting_user_id: i64,
    member_id: i64,
) -> Result<(), CoreError> {
    let group = confab_db::groups::get_group(db, group_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    let self_leave = acting_user_id == member_id;
    if !self_leave && group.admin_id != acting_user_id {
        return Err(CoreError::Unauthorized);
    }
    if member_id == group.admin_id {
        return Err(CoreError::Validation(
            "the group admin cannot be removed".into(),
        ));
    }

    if !confab_db::groups::remove_member(db, group_id, member_id).await? {
        return Err(CoreError::NotFound);
    }
    index.invalidate(group_id).await;
    Ok(())
}
