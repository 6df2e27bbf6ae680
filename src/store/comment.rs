use crate::model::comment::{Comment, NewComment};
use crate::schema::comment;
use diesel::prelude::*;

/// Comments are write-once. Ids that already exist are skipped, and the first
/// other failure aborts the batch.
pub fn insert_all(conn: &mut PgConnection, comments: &[Comment]) -> QueryResult<usize> {
    let mut inserted = 0;
    for new_comment in comments.iter().map(NewComment::from) {
        inserted += diesel::insert_into(comment::table)
            .values(&new_comment)
            .on_conflict(comment::id)
            .do_nothing()
            .execute(conn)?;
    }
    Ok(inserted)
}
