use postrepo_types::Post;
use rusqlite::{params, Connection, Row};
use tokio::sync::{mpsc::Receiver, oneshot};
use tracing::{debug, info};

use crate::error::Error;

const POST_SELECT_SQL: &str = "SELECT userId, id, title, body FROM posts";

const POST_UPSERT_SQL: &str = "INSERT INTO posts (userId, id, title, body)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(id) DO UPDATE SET
        userId = excluded.userId,
        title = excluded.title,
        body = excluded.body;";

pub(crate) enum StoreRequest {
    GetById(i32, oneshot::Sender<Result<Post, Error>>),
    GetAll(oneshot::Sender<Result<Vec<Post>, Error>>),
    StoreAll(Vec<Post>, oneshot::Sender<Result<usize, Error>>),
    Clear(oneshot::Sender<Result<usize, Error>>),
}

/// Sole owner of the store connection. Requests are handled one at a time.
pub(crate) struct StoreInner {
    conn: Connection,
}

impl StoreInner {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Serves requests until every sender is dropped, then releases the connection.
    pub fn run(mut self, mut rx: Receiver<StoreRequest>) {
        while let Some(request) = rx.blocking_recv() {
            self.handle_request(request);
        }
        info!("Post store closed");
    }

    fn handle_request(&mut self, request: StoreRequest) {
        match request {
            StoreRequest::GetById(id, tx) => reply(tx, self.select_by_id(id)),
            StoreRequest::GetAll(tx) => reply(tx, self.select_all()),
            StoreRequest::StoreAll(posts, tx) => reply(tx, self.upsert_all(&posts)),
            StoreRequest::Clear(tx) => reply(tx, self.delete_all()),
        }
    }

    fn select_all(&self) -> Result<Vec<Post>, Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} ORDER BY id;"))?;
        let mut rows = stmt.query([])?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        debug!("Selected {} posts", posts.len());
        Ok(posts)
    }

    fn select_by_id(&self, id: i32) -> Result<Post, Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => parse_post_row(row),
            None => Err(Error::NotFound(id)),
        }
    }

    fn upsert_all(&mut self, posts: &[Post]) -> Result<usize, Error> {
        for post in posts {
            post.validate()?;
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(POST_UPSERT_SQL)?;
            for post in posts {
                stmt.execute(params![post.user_id, post.id, post.title, post.body])?;
            }
        }
        tx.commit()?;
        debug!("Stored {} posts", posts.len());
        Ok(posts.len())
    }

    fn delete_all(&mut self) -> Result<usize, Error> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM posts;", [])?;
        tx.commit()?;
        Ok(removed)
    }
}

fn reply<T>(tx: oneshot::Sender<T>, value: T) {
    if tx.send(value).is_err() {
        debug!("Store caller went away before the reply");
    }
}

fn parse_post_row(row: &Row<'_>) -> Result<Post, Error> {
    let post = Post::from_nullable(
        row.get(0).map_err(decode_error)?,
        row.get(1).map_err(decode_error)?,
        row.get(2).map_err(decode_error)?,
        row.get(3).map_err(decode_error)?,
    );
    post.validate()?;
    Ok(post)
}

fn decode_error(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::FromSqlConversionFailure(..) => Error::Decode(e.to_string()),
        other => Error::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, local::schema::ensure_schema};

    fn store() -> StoreInner {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();
        StoreInner::new(conn)
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_null_text_reads_as_empty() {
        let store = store();
        store
            .conn
            .execute_batch(
                "INSERT INTO posts (userId, id, title, body) VALUES (1, 2, NULL, 'b');
                 INSERT INTO posts (userId, id, title, body) VALUES (1, 1, 't', NULL);
                 INSERT INTO posts (userId, id, title, body) VALUES (2, 3, NULL, NULL);",
            )
            .unwrap();

        assert_eq!(
            store.select_all().unwrap(),
            vec![
                Post::new(1, 1, "t", ""),
                Post::new(1, 2, "", "b"),
                Post::new(2, 3, "", ""),
            ]
        );
        assert_eq!(store.select_by_id(3).unwrap(), Post::new(2, 3, "", ""));
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_select_by_id_miss() {
        let store = store();
        assert!(matches!(store.select_by_id(5), Err(Error::NotFound(5))));
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_corrupt_rows_are_decode_errors() {
        let store = store();
        store
            .conn
            .execute_batch(
                "INSERT INTO posts (userId, id, title, body) VALUES (4294967296, 1, 'a', 'b');
                 INSERT INTO posts (userId, id, title, body) VALUES (1, 2, X'00FF', 'b');
                 INSERT INTO posts (userId, id, title, body) VALUES (1, -4, 'a', 'b');",
            )
            .unwrap();

        for id in [1, 2, -4] {
            let err = store.select_by_id(id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "id {id}: {err}");
        }
        assert_eq!(store.select_all().unwrap_err().kind(), ErrorKind::Decode);
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_upsert_replaces_rows() {
        let mut store = store();
        store
            .upsert_all(&[Post::new(1, 1, "a", "b"), Post::new(1, 2, "c", "d")])
            .unwrap();
        store.upsert_all(&[Post::new(9, 1, "new", "")]).unwrap();

        assert_eq!(
            store.select_all().unwrap(),
            vec![Post::new(9, 1, "new", ""), Post::new(1, 2, "c", "d")]
        );
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_upsert_rejects_invalid_batch() {
        let mut store = store();
        let err = store
            .upsert_all(&[Post::new(1, 1, "a", "b"), Post::new(1, -1, "c", "d")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(store.select_all().unwrap().is_empty());
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_delete_all() {
        let mut store = store();
        store
            .upsert_all(&[Post::new(1, 1, "a", "b"), Post::new(1, 2, "c", "d")])
            .unwrap();
        assert_eq!(store.delete_all().unwrap(), 2);
        assert_eq!(store.delete_all().unwrap(), 0);
        assert!(store.select_all().unwrap().is_empty());
    }
}
