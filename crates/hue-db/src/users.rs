//! user and package operations on the metadata store.

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use hue_types::{Package, PackageStatus, User, UserFilter, UserStatus};

use crate::entity::{package, user};
use crate::meta::MetaDb;
use crate::{Error, Result};

impl MetaDb {
    // ─── users ───────────────────────────────────────────────────────────

    /// insert a new user.
    pub async fn create_user(&self, new_user: &User) -> Result<()> {
        let model: user::ActiveModel = new_user.into();
        model.insert(&self.conn).await?;
        Ok(())
    }

    /// get a user by id.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let result = user::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(result.map(Into::into))
    }

    /// get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    /// list users with optional status/search filtering and paging.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut query = user::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(user::Column::Status.eq(status.as_str()));
        }
        if let Some(search) = filter.search.as_deref() {
            query = query.filter(user::Column::Username.contains(search));
        }

        query = query.order_by_desc(user::Column::CreatedAt);
        if filter.limit > 0 {
            query = query.limit(filter.limit).offset(filter.offset);
        }

        let results = query.all(&self.conn).await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    /// count all users.
    pub async fn count_users(&self) -> Result<u64> {
        Ok(user::Entity::find().count(&self.conn).await?)
    }

    /// replace a user's mutable fields.
    pub async fn update_user(&self, updated: &User) -> Result<()> {
        let mut model: user::ActiveModel = updated.into();
        model.updated_at = sea_orm::Set(Utc::now());
        model.update(&self.conn).await?;
        Ok(())
    }

    /// update only the user's status.
    pub async fn update_user_status(&self, id: &str, status: UserStatus) -> Result<()> {
        user::Entity::update_many()
            .col_expr(user::Column::Status, Expr::value(status.as_str()))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// stamp the user's last connection, anchoring the first one if unset.
    pub async fn touch_user_connection(&self, id: &str) -> Result<()> {
        let now = Utc::now();
        user::Entity::update_many()
            .col_expr(user::Column::FirstConnectionAt, Expr::value(now))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::FirstConnectionAt.is_null())
            .exec(&self.conn)
            .await?;
        user::Entity::update_many()
            .col_expr(user::Column::LastConnectionAt, Expr::value(now))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// delete a user; owned packages cascade.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        user::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    // ─── packages ────────────────────────────────────────────────────────

    /// insert a new package.
    pub async fn create_package(&self, pkg: &Package) -> Result<()> {
        let model: package::ActiveModel = pkg.into();
        model.insert(&self.conn).await?;
        Ok(())
    }

    /// get a package by id.
    pub async fn get_package(&self, id: &str) -> Result<Option<Package>> {
        let result = package::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(result.map(Into::into))
    }

    /// get the package referenced by a user's `active_package_id`.
    pub async fn get_package_by_user_id(&self, user_id: &str) -> Result<Option<Package>> {
        let Some(found) = user::Entity::find_by_id(user_id).one(&self.conn).await? else {
            return Ok(None);
        };
        let Some(package_id) = found.active_package_id else {
            return Ok(None);
        };
        self.get_package(&package_id).await
    }

    /// add a usage delta to a package's counters.
    ///
    /// arithmetic happens server-side so concurrent writers never lose
    /// increments to a read-modify-write race.
    pub async fn update_package_usage(&self, id: &str, upload: i64, download: i64) -> Result<()> {
        package::Entity::update_many()
            .col_expr(
                package::Column::CurrentUpload,
                Expr::col(package::Column::CurrentUpload).add(upload),
            )
            .col_expr(
                package::Column::CurrentDownload,
                Expr::col(package::Column::CurrentDownload).add(download),
            )
            .col_expr(
                package::Column::CurrentTotal,
                Expr::col(package::Column::CurrentTotal).add(upload + download),
            )
            .col_expr(package::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(package::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// update only the package's status.
    pub async fn update_package_status(&self, id: &str, status: PackageStatus) -> Result<()> {
        package::Entity::update_many()
            .col_expr(package::Column::Status, Expr::value(status.as_str()))
            .col_expr(package::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(package::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// zero a package's counters (period reset).
    pub async fn reset_package_usage(&self, id: &str) -> Result<()> {
        package::Entity::update_many()
            .col_expr(package::Column::CurrentUpload, Expr::value(0i64))
            .col_expr(package::Column::CurrentDownload, Expr::value(0i64))
            .col_expr(package::Column::CurrentTotal, Expr::value(0i64))
            .col_expr(package::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(package::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// anchor a lazily started package: set `start_at` to now and derive
    /// `expires_at` from the duration. No-op when already anchored.
    pub async fn anchor_package_start(&self, id: &str) -> Result<Option<Package>> {
        let Some(pkg) = self.get_package(id).await? else {
            return Err(Error::NotFound(format!("package {id}")));
        };
        if pkg.start_at.is_some() {
            return Ok(Some(pkg));
        }

        let now = Utc::now();
        let expires = now + Duration::seconds(pkg.duration);
        package::Entity::update_many()
            .col_expr(package::Column::StartAt, Expr::value(now))
            .col_expr(package::Column::ExpiresAt, Expr::value(expires))
            .col_expr(package::Column::UpdatedAt, Expr::value(now))
            .filter(package::Column::Id.eq(id))
            .filter(package::Column::StartAt.is_null())
            .exec(&self.conn)
            .await?;
        self.get_package(id).await
    }

    /// delete a package.
    pub async fn delete_package(&self, id: &str) -> Result<()> {
        package::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hue_types::{PackageCreate, ResetMode};

    async fn setup() -> MetaDb {
        MetaDb::new_in_memory().await.unwrap()
    }

    fn test_package(user_id: &str, total: i64) -> Package {
        PackageCreate {
            user_id: user_id.to_string(),
            total_traffic: total,
            total_limit: 0,
            upload_limit: 0,
            download_limit: 0,
            reset_mode: ResetMode::NoReset,
            duration: 3600,
            start_at: None,
            max_concurrent: 2,
        }
        .into_package()
    }

    #[tokio::test]
    async fn user_crud_round_trip() {
        let db = setup().await;

        let mut created = User::new("tester".to_string(), "secret".to_string());
        created.groups = vec!["premium".to_string()];
        db.create_user(&created).await.unwrap();

        let fetched = db.get_user(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "tester");
        assert_eq!(fetched.groups, vec!["premium".to_string()]);
        assert_eq!(fetched.status, UserStatus::Active);
        // timestamps survive at second resolution
        assert_eq!(
            fetched.created_at.timestamp(),
            created.created_at.timestamp()
        );

        let by_name = db.get_user_by_username("tester").await.unwrap();
        assert!(by_name.is_some());

        db.update_user_status(&created.id, UserStatus::Suspended)
            .await
            .unwrap();
        let suspended = db.get_user(&created.id).await.unwrap().unwrap();
        assert_eq!(suspended.status, UserStatus::Suspended);

        db.delete_user(&created.id).await.unwrap();
        assert!(db.get_user(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_users_filters_by_status_and_search() {
        let db = setup().await;

        let alice = User::new("alice".to_string(), "x".to_string());
        let mut bob = User::new("bob".to_string(), "x".to_string());
        bob.status = UserStatus::Suspended;
        db.create_user(&alice).await.unwrap();
        db.create_user(&bob).await.unwrap();

        let all = db.list_users(&UserFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let suspended = db
            .list_users(&UserFilter {
                status: Some(UserStatus::Suspended),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].username, "bob");

        let searched = db
            .list_users(&UserFilter {
                search: Some("ali".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].username, "alice");
    }

    #[tokio::test]
    async fn package_counters_increment_server_side() {
        let db = setup().await;
        let mut owner = User::new("owner".to_string(), "x".to_string());
        db.create_user(&owner).await.unwrap();

        let pkg = test_package(&owner.id, 1000);
        db.create_package(&pkg).await.unwrap();
        owner.active_package_id = Some(pkg.id.clone());
        db.update_user(&owner).await.unwrap();

        db.update_package_usage(&pkg.id, 120, 80).await.unwrap();
        db.update_package_usage(&pkg.id, 10, 5).await.unwrap();

        let fetched = db.get_package_by_user_id(&owner.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_upload, 130);
        assert_eq!(fetched.current_download, 85);
        assert_eq!(
            fetched.current_total,
            fetched.current_upload + fetched.current_download
        );
    }

    #[tokio::test]
    async fn reset_zeroes_counters() {
        let db = setup().await;
        let owner = User::new("owner".to_string(), "x".to_string());
        db.create_user(&owner).await.unwrap();
        let pkg = test_package(&owner.id, 1000);
        db.create_package(&pkg).await.unwrap();

        db.update_package_usage(&pkg.id, 500, 400).await.unwrap();
        db.reset_package_usage(&pkg.id).await.unwrap();

        let fetched = db.get_package(&pkg.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_total, 0);
        assert_eq!(fetched.current_upload, 0);
        assert_eq!(fetched.current_download, 0);
    }

    #[tokio::test]
    async fn anchor_package_start_is_idempotent() {
        let db = setup().await;
        let owner = User::new("owner".to_string(), "x".to_string());
        db.create_user(&owner).await.unwrap();
        let pkg = test_package(&owner.id, 0);
        db.create_package(&pkg).await.unwrap();

        let anchored = db.anchor_package_start(&pkg.id).await.unwrap().unwrap();
        let start = anchored.start_at.unwrap();
        assert_eq!(
            anchored.expires_at.unwrap().timestamp(),
            (start + Duration::seconds(3600)).timestamp()
        );

        // second anchor keeps the original start
        let again = db.anchor_package_start(&pkg.id).await.unwrap().unwrap();
        assert_eq!(again.start_at.unwrap().timestamp(), start.timestamp());
    }

    #[tokio::test]
    async fn touch_user_connection_sets_first_once() {
        let db = setup().await;
        let owner = User::new("owner".to_string(), "x".to_string());
        db.create_user(&owner).await.unwrap();

        db.touch_user_connection(&owner.id).await.unwrap();
        let first = db
            .get_user(&owner.id)
            .await
            .unwrap()
            .unwrap()
            .first_connection_at
            .unwrap();

        db.touch_user_connection(&owner.id).await.unwrap();
        let fetched = db.get_user(&owner.id).await.unwrap().unwrap();
        assert_eq!(
            fetched.first_connection_at.unwrap().timestamp(),
            first.timestamp()
        );
        assert!(fetched.last_connection_at.unwrap() >= first);
    }
}
