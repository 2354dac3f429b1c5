//! Team member business logic for the about and team pages.

use crate::{
    entities::{TeamMember, team_member},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Order, PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use validator::Validate;

/// Input for a new team member
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct NewTeamMember {
    /// Display name
    #[validate(length(min = 1, max = 20))]
    pub name: String,
    /// Job title
    #[validate(length(min = 1, max = 50))]
    pub designation: String,
    /// Facebook profile URL
    #[validate(url, length(max = 50))]
    pub facebook: Option<String>,
    /// Twitter handle or URL
    #[validate(length(max = 50))]
    pub twitter: String,
    /// Stored path of the portrait
    #[validate(length(min = 1))]
    pub photo: String,
}

/// Adds a team member.
#[instrument(skip(db, member), fields(name = %member.name))]
pub async fn create_team_member(
    db: &DatabaseConnection,
    member: NewTeamMember,
) -> Result<team_member::Model> {
    member.validate()?;

    let now = Utc::now();
    let created = team_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_date: Set(now),
        modified_date: Set(now),
        name: Set(member.name),
        designation: Set(member.designation),
        facebook: Set(member.facebook),
        twitter: Set(member.twitter),
        photo: Set(member.photo),
    }
    .insert(db)
    .await?;

    debug!("Created team member {}", created.id);
    Ok(created)
}

/// All team members in the order they were added.
pub async fn list_team_members(db: &DatabaseConnection) -> Result<Vec<team_member::Model>> {
    TeamMember::find()
        .order_by_asc(team_member::Column::CreatedDate)
        .order_by(Expr::cust("rowid"), Order::Asc)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Inserts the configured team members when the table is still empty.
/// Returns the number of members inserted.
#[instrument(skip_all, fields(members = members.len()))]
pub async fn seed_team_members(db: &DatabaseConnection, members: &[NewTeamMember]) -> Result<usize> {
    if TeamMember::find().count(db).await? > 0 {
        debug!("Team members already present, skipping seed");
        return Ok(0);
    }

    for member in members {
        create_team_member(db, member.clone()).await?;
    }

    info!("Seeded {} team members", members.len());
    Ok(members.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_team_member_validation() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut member = new_team_member("A name that is far too long");
        let result = create_team_member(&db, member.clone()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        member.name = "Ana".to_string();
        member.facebook = Some("not a url".to_string());
        let result = create_team_member(&db, member).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_team_members_in_creation_order() -> Result<()> {
        let db = setup_test_db().await?;
        for name in ["Zoe", "Ana", "Marco"] {
            create_test_team_member(&db, name).await?;
        }

        let names: Vec<String> = list_team_members(&db)
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Zoe", "Ana", "Marco"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_team_members_only_into_empty_table() -> Result<()> {
        let db = setup_test_db().await?;
        let members = vec![new_team_member("Ana"), new_team_member("Marco")];

        assert_eq!(seed_team_members(&db, &members).await?, 2);
        assert_eq!(seed_team_members(&db, &members).await?, 0);
        assert_eq!(list_team_members(&db).await?.len(), 2);

        Ok(())
    }
}
