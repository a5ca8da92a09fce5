/// Board membership and the role mapping
///
/// One row per `(board, user)` with a [`Role`]. A partial unique index keeps
/// at most one `owner` per board; every path that touches the owner row goes
/// through [`BoardMember::transfer_ownership`], which keeps exactly one.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE board_role AS ENUM ('observer', 'member', 'admin', 'owner');
///
/// CREATE TABLE board_members (
///     board_id BIGINT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role board_role NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (board_id, user_id)
/// );
///
/// CREATE UNIQUE INDEX board_members_single_owner ON board_members (board_id) WHERE role = 'owner';
/// ```
///
/// # Example
///
/// ```no_run
/// use kanban_shared::authz::role::Role;
/// use kanban_shared::models::board_member::BoardMember;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, board_id: i64, alice: i64, bob: i64) -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = pool.acquire().await?;
/// BoardMember::add_many(&mut conn, board_id, &[bob], Role::Member).await?;
/// BoardMember::transfer_ownership(&pool, board_id, alice, bob).await?;
///
/// assert_eq!(BoardMember::find_role(&pool, board_id, bob).await?, Some(Role::Owner));
/// # Ok(())
/// # }
/// ```

use crate::authz::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// Errors from ownership transfer
#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    /// Caller does not hold the owner role
    #[error("caller is not the board owner")]
    NotOwner,

    /// Incoming owner is not a member of the board
    #[error("new owner is not a member of the board")]
    NotMember,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BoardMember {
    pub board_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member row joined with the user's public profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

impl BoardMember {
    /// Inserts a membership; the creator of a board calls this with `Owner`
    pub async fn create(
        conn: &mut PgConnection,
        board_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BoardMember>(
            r#"
            INSERT INTO board_members (board_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING board_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(conn)
        .await
    }

    /// Adds users with `role`
    ///
    /// An existing membership fails the insert with a unique violation.
    pub async fn add_many(
        conn: &mut PgConnection,
        board_id: i64,
        user_ids: &[i64],
        role: Role,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO board_members (board_id, user_id, role)
            SELECT $1, u, $3 FROM UNNEST($2::BIGINT[]) AS u
            RETURNING user_id
            "#,
        )
        .bind(board_id)
        .bind(user_ids)
        .bind(role)
        .fetch_all(conn)
        .await
    }

    /// Removes members; the owner row is never removed here
    pub async fn remove_many(
        conn: &mut PgConnection,
        board_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            DELETE FROM board_members
            WHERE board_id = $1 AND user_id = ANY($2) AND role <> 'owner'
            RETURNING user_id
            "#,
        )
        .bind(board_id)
        .bind(user_ids)
        .fetch_all(conn)
        .await
    }

    pub async fn find_role(
        pool: &PgPool,
        board_id: i64,
        user_id: i64,
    ) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_scalar("SELECT role FROM board_members WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Reads roles of several members under row locks, ordered by user id
    pub async fn lock_roles(
        conn: &mut PgConnection,
        board_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<(i64, Role)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT user_id, role FROM board_members
            WHERE board_id = $1 AND user_id = ANY($2)
            ORDER BY user_id
            FOR UPDATE
            "#,
        )
        .bind(board_id)
        .bind(user_ids)
        .fetch_all(conn)
        .await
    }

    pub async fn set_role(
        conn: &mut PgConnection,
        board_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BoardMember>(
            r#"
            UPDATE board_members SET role = $3, updated_at = NOW()
            WHERE board_id = $1 AND user_id = $2
            RETURNING board_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(conn)
        .await
    }

    /// Members of a board with their usernames, highest role first
    pub async fn list_for_board(pool: &PgPool, board_id: i64) -> Result<Vec<MemberView>, sqlx::Error> {
        sqlx::query_as::<_, MemberView>(
            r#"
            SELECT m.user_id, u.username, u.full_name, m.role
            FROM board_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.board_id = $1
            ORDER BY m.role DESC, u.username
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Hands the owner role to another member atomically
    ///
    /// The outgoing owner becomes `member`. The demotion runs first so the
    /// single-owner index never sees two owners.
    pub async fn transfer_ownership(
        pool: &PgPool,
        board_id: i64,
        current_owner: i64,
        new_owner: i64,
    ) -> Result<(), OwnershipError> {
        let mut tx = pool.begin().await?;

        let mut ids = [current_owner, new_owner];
        ids.sort_unstable();
        let roles = Self::lock_roles(&mut *tx, board_id, &ids).await?;
        let role_of = |user: i64| roles.iter().find(|(id, _)| *id == user).map(|(_, r)| *r);

        if role_of(current_owner) != Some(Role::Owner) {
            return Err(OwnershipError::NotOwner);
        }
        if current_owner == new_owner {
            return Ok(());
        }
        if role_of(new_owner).is_none() {
            return Err(OwnershipError::NotMember);
        }

        Self::set_role(&mut *tx, board_id, current_owner, Role::Member).await?;
        Self::set_role(&mut *tx, board_id, new_owner, Role::Owner).await?;

        tx.commit().await?;
        Ok(())
    }
}
