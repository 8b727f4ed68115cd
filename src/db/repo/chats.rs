//! Support chat operations for the repository.
//!
//! A chat belongs to one customer. Messages are linked to it through the
//! customer's id appearing as sender or receiver; "admin" is the support side.

use crate::domain::{Chat, Message, NewMessage, TimeMs, UserId, ADMIN_ID};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::Repository;

impl Repository {
    /// Return the customer's chat, creating an empty one if needed.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn create_chat(&self, customer: &UserId) -> Result<Chat, sqlx::Error> {
        if let Some(chat) = self.chat_for_customer(customer).await? {
            return Ok(chat);
        }

        let chat = Chat {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer.clone(),
            last_message: String::new(),
            last_message_time: TimeMs::now(),
            unread_count: 0,
        };

        sqlx::query(
            r#"
            INSERT INTO chats (id, customer_id, last_message, last_message_time, unread_count)
            VALUES (?, ?, ?, ?, 0)
            ON CONFLICT(customer_id) DO NOTHING
            "#,
        )
        .bind(&chat.id)
        .bind(chat.customer_id.as_str())
        .bind(&chat.last_message)
        .bind(chat.last_message_time.as_ms())
        .execute(&self.pool)
        .await?;

        // a concurrent writer may have won the insert
        Ok(self.chat_for_customer(customer).await?.unwrap_or(chat))
    }

    /// Append a message and update the customer's chat summary in one transaction.
    pub async fn add_message(&self, message: &NewMessage) -> Result<Message, sqlx::Error> {
        let stored = Message {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: message.sender_id.clone(),
            receiver_id: message.receiver_id.clone(),
            content: message.content.clone(),
            timestamp: TimeMs::now(),
            read: message.read,
        };
        let customer = message.customer_id();
        let unread_increment: i64 = if message.read { 0 } else { 1 };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chats (id, customer_id, last_message, last_message_time, unread_count)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(customer_id) DO UPDATE SET
                last_message = excluded.last_message,
                last_message_time = excluded.last_message_time,
                unread_count = unread_count + excluded.unread_count
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(customer.as_str())
        .bind(&stored.content)
        .bind(stored.timestamp.as_ms())
        .bind(unread_increment)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, timestamp, read)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(stored.sender_id.as_str())
        .bind(stored.receiver_id.as_str())
        .bind(&stored.content)
        .bind(stored.timestamp.as_ms())
        .bind(stored.read)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(customer = %customer, message_id = %stored.id, "Chat message stored");
        Ok(stored)
    }

    /// Zero the chat's unread counter and mark every message of its customer read.
    ///
    /// Returns false if the chat does not exist.
    pub async fn mark_chat_read(&self, chat_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(customer) = chat_customer_conn(&mut tx, chat_id).await? else {
            return Ok(false);
        };

        sqlx::query("UPDATE chats SET unread_count = 0 WHERE id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE messages SET read = 1 WHERE sender_id = ? OR receiver_id = ?")
            .bind(customer.as_str())
            .bind(customer.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Remove a chat together with every message to or from its customer.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(customer) = chat_customer_conn(&mut tx, chat_id).await? else {
            return Ok(false);
        };

        let removed = sqlx::query("DELETE FROM messages WHERE sender_id = ? OR receiver_id = ?")
            .bind(customer.as_str())
            .bind(customer.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(chat_id = %chat_id, messages = removed, "Chat deleted");
        Ok(true)
    }

    /// Unread messages waiting for `user`: the sum over all chats for "admin",
    /// otherwise the counter of that customer's chat (0 without a chat).
    pub async fn unread_count(&self, user: &UserId) -> Result<i64, sqlx::Error> {
        let row = if user.as_str() == ADMIN_ID {
            sqlx::query("SELECT COALESCE(SUM(unread_count), 0) AS n FROM chats")
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query(
                "SELECT COALESCE(SUM(unread_count), 0) AS n FROM chats WHERE customer_id = ?",
            )
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await?
        };
        Ok(row.get("n"))
    }

    /// List chats, most recent activity first.
    pub async fn list_chats(&self) -> Result<Vec<Chat>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, last_message, last_message_time, unread_count
            FROM chats
            ORDER BY last_message_time DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(chat_from_row).collect())
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, last_message, last_message_time, unread_count
            FROM chats
            WHERE id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(chat_from_row))
    }

    pub async fn chat_for_customer(&self, customer: &UserId) -> Result<Option<Chat>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, last_message, last_message_time, unread_count
            FROM chats
            WHERE customer_id = ?
            "#,
        )
        .bind(customer.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(chat_from_row))
    }

    /// Messages to or from a customer, oldest first.
    pub async fn messages_for_customer(
        &self,
        customer: &UserId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, content, timestamp, read
            FROM messages
            WHERE sender_id = ? OR receiver_id = ?
            ORDER BY timestamp ASC, rowid ASC
            "#,
        )
        .bind(customer.as_str())
        .bind(customer.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }
}

async fn chat_customer_conn(
    conn: &mut SqliteConnection,
    chat_id: &str,
) -> Result<Option<UserId>, sqlx::Error> {
    let row = sqlx::query("SELECT customer_id FROM chats WHERE id = ?")
        .bind(chat_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| UserId::new(r.get::<String, _>("customer_id"))))
}

fn chat_from_row(row: &SqliteRow) -> Chat {
    Chat {
        id: row.get("id"),
        customer_id: UserId::new(row.get::<String, _>("customer_id")),
        last_message: row.get("last_message"),
        last_message_time: TimeMs::new(row.get("last_message_time")),
        unread_count: row.get("unread_count"),
    }
}

fn message_from_row(row: &SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: UserId::new(row.get::<String, _>("sender_id")),
        receiver_id: UserId::new(row.get::<String, _>("receiver_id")),
        content: row.get("content"),
        timestamp: TimeMs::new(row.get("timestamp")),
        read: row.get("read"),
    }
}
