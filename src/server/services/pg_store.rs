use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::server::models::{
    identity::{GuestIdentity, Identity, NewIdentity},
    message::{ConversationSummary, Message},
};

use super::store::SupportStore;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupportStore for PgStore {
    async fn create_identity(&self, new: NewIdentity) -> Result<Identity> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO identities (id, kind, role, display_name, email, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, kind, role, display_name, email, created_at
            "#,
        )
        .bind(new.id.unwrap_or_else(Uuid::new_v4))
        .bind(new.kind)
        .bind(new.role)
        .bind(&new.display_name)
        .bind(&new.email)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create identity")?;

        Ok(identity)
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, kind, role, display_name, email, created_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch identity")?;

        Ok(identity)
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, kind, role, display_name, email, created_at
            FROM identities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up identity by email")?;

        Ok(identity)
    }

    async fn create_guest(&self, token: &str, display_name: &str) -> Result<GuestIdentity> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let identity_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO identities (id, kind, role, display_name, email, created_at)
            VALUES ($1, 'guest', 'member', $2, NULL, NOW())
            "#,
        )
        .bind(identity_id)
        .bind(display_name)
        .execute(&mut *tx)
        .await
        .context("Failed to create guest identity row")?;

        let guest = sqlx::query_as::<_, GuestIdentity>(
            r#"
            INSERT INTO guest_identities (identity_id, token, display_name, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING identity_id, token, display_name, created_at, merged_into
            "#,
        )
        .bind(identity_id)
        .bind(token)
        .bind(display_name)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create guest credential row")?;

        tx.commit().await.context("Failed to commit guest creation")?;
        Ok(guest)
    }

    async fn find_guest_by_token(&self, token: &str) -> Result<Option<GuestIdentity>> {
        let guest = sqlx::query_as::<_, GuestIdentity>(
            r#"
            SELECT identity_id, token, display_name, created_at, merged_into
            FROM guest_identities
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to resolve guest token")?;

        Ok(guest)
    }

    async fn rename_guest(&self, identity_id: Uuid, display_name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        sqlx::query("UPDATE guest_identities SET display_name = $2 WHERE identity_id = $1")
            .bind(identity_id)
            .bind(display_name)
            .execute(&mut *tx)
            .await
            .context("Failed to rename guest")?;
        sqlx::query("UPDATE identities SET display_name = $2 WHERE id = $1")
            .bind(identity_id)
            .bind(display_name)
            .execute(&mut *tx)
            .await
            .context("Failed to rename guest identity")?;

        tx.commit().await.context("Failed to commit rename")?;
        Ok(())
    }

    async fn merge_guest(&self, identity_id: Uuid, user_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let sent = sqlx::query("UPDATE messages SET sender_id = $2 WHERE sender_id = $1")
            .bind(identity_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to migrate sent messages")?
            .rows_affected();
        let received = sqlx::query("UPDATE messages SET receiver_id = $2 WHERE receiver_id = $1")
            .bind(identity_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to migrate received messages")?
            .rows_affected();
        sqlx::query("UPDATE guest_identities SET merged_into = $2 WHERE identity_id = $1")
            .bind(identity_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to tombstone guest credential")?;

        tx.commit().await.context("Failed to commit guest merge")?;
        Ok(sent + received)
    }

    async fn purge_stale_guests(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let stale: Vec<(Uuid, Option<Uuid>)> = sqlx::query_as(
            r#"
            SELECT g.identity_id, g.merged_into
            FROM guest_identities g
            WHERE COALESCE(
                (SELECT MAX(m.created_at) FROM messages m
                 WHERE m.sender_id = g.identity_id OR m.receiver_id = g.identity_id),
                g.created_at
            ) < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to select stale guests")?;

        let unmerged: Vec<Uuid> = stale
            .iter()
            .filter(|(_, merged)| merged.is_none())
            .map(|(id, _)| *id)
            .collect();
        let all: Vec<Uuid> = stale.iter().map(|(id, _)| *id).collect();

        sqlx::query("DELETE FROM guest_identities WHERE identity_id = ANY($1)")
            .bind(&all)
            .execute(&mut *tx)
            .await
            .context("Failed to delete stale guest credentials")?;
        // Merged tombstones keep their (now account-owned) messages.
        sqlx::query("DELETE FROM messages WHERE sender_id = ANY($1) OR receiver_id = ANY($1)")
            .bind(&unmerged)
            .execute(&mut *tx)
            .await
            .context("Failed to delete stale guest messages")?;
        sqlx::query("DELETE FROM identities WHERE id = ANY($1)")
            .bind(&unmerged)
            .execute(&mut *tx)
            .await
            .context("Failed to delete stale guest identities")?;

        tx.commit().await.context("Failed to commit retention sweep")?;
        Ok(all.len() as u64)
    }

    async fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            RETURNING id, sender_id, receiver_id, content, read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create message")?;

        Ok(message)
    }

    async fn thread(&self, a: Uuid, b: &[Uuid], limit: i64) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, read, created_at
            FROM (
                SELECT id, sender_id, receiver_id, content, read, created_at, seq
                FROM messages
                WHERE (sender_id = $1 AND receiver_id = ANY($2))
                   OR (sender_id = ANY($2) AND receiver_id = $1)
                ORDER BY created_at DESC, seq DESC
                LIMIT $3
            ) recent
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch thread")?;

        Ok(messages)
    }

    async fn unread_count(&self, receivers: &[Uuid]) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ANY($1) AND read = FALSE",
        )
        .bind(receivers)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count unread messages")?;

        Ok(count)
    }

    async fn mark_read(&self, receivers: &[Uuid]) -> Result<u64> {
        let marked = sqlx::query(
            "UPDATE messages SET read = TRUE WHERE receiver_id = ANY($1) AND read = FALSE",
        )
        .bind(receivers)
        .execute(&self.pool)
        .await
        .context("Failed to mark messages read")?
        .rows_affected();

        Ok(marked)
    }

    async fn delete_thread(&self, a: Uuid, b: &[Uuid]) -> Result<u64> {
        let removed = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE (sender_id = $1 AND receiver_id = ANY($2))
               OR (sender_id = ANY($2) AND receiver_id = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .execute(&self.pool)
        .await
        .context("Failed to delete thread")?
        .rows_affected();

        Ok(removed)
    }

    async fn create_session(&self, token: &str, identity_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, identity_id, created_at) VALUES ($1, $2, NOW())",
        )
        .bind(token)
        .bind(identity_id)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT i.id, i.kind, i.role, i.display_name, i.email, i.created_at
            FROM identities i
            JOIN sessions s ON s.identity_id = i.id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to resolve session")?;

        Ok(identity)
    }

    async fn support_conversations(&self, aliases: &[Uuid]) -> Result<Vec<ConversationSummary>> {
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT i.id AS counterpart_id,
                   i.display_name,
                   i.kind,
                   COUNT(*) AS message_count,
                   COUNT(*) FILTER (WHERE m.receiver_id = ANY($1) AND m.read = FALSE)
                       AS unread_count,
                   MAX(m.created_at) AS last_message_at
            FROM messages m
            JOIN identities i
              ON i.id = CASE WHEN m.sender_id = ANY($1) THEN m.receiver_id
                             ELSE m.sender_id END
            WHERE (m.sender_id = ANY($1)) <> (m.receiver_id = ANY($1))
            GROUP BY i.id, i.display_name, i.kind
            ORDER BY last_message_at DESC
            "#,
        )
        .bind(aliases)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list support conversations")?;

        Ok(summaries)
    }
}
