use crate::model::post::{Post, PostRow};
use crate::schema::post;
use crate::store::{PostSearch, StoreError, StoreResult};
use crate::time::DateTime;
use diesel::prelude::*;

pub fn get(conn: &mut PgConnection, id: i64) -> StoreResult<Post> {
    post::table
        .find(id)
        .select(PostRow::as_select())
        .first(conn)
        .optional()?
        .map(Post::from)
        .ok_or(StoreError::PostNotFound(id))
}

pub fn insert(conn: &mut PgConnection, post: &Post) -> QueryResult<()> {
    diesel::insert_into(post::table)
        .values(PostRow::from(post))
        .execute(conn)
        .map(|_| ())
}

/// Insert-or-ignore keyed on id, so two requests racing on the same new post
/// leave exactly one row holding the first writer's values.
pub fn check_and_insert(conn: &mut PgConnection, post: &Post) -> QueryResult<bool> {
    diesel::insert_into(post::table)
        .values(PostRow::from(post))
        .on_conflict(post::id)
        .do_nothing()
        .execute(conn)
        .map(|inserted| inserted > 0)
}

pub fn update(conn: &mut PgConnection, post: &Post) -> StoreResult<()> {
    let mut row = PostRow::from(post);
    row.updated_at = DateTime::now();

    let updated = diesel::update(post::table.find(row.id)).set(&row).execute(conn)?;
    match updated {
        0 => Err(StoreError::PostNotFound(row.id)),
        _ => Ok(()),
    }
}

pub fn delete(conn: &mut PgConnection, id: i64) -> StoreResult<()> {
    let deleted = diesel::delete(post::table.find(id)).execute(conn)?;
    match deleted {
        0 => Err(StoreError::PostNotFound(id)),
        _ => Ok(()),
    }
}

/// Newest posts first.
pub fn search(conn: &mut PgConnection, search: &PostSearch) -> QueryResult<Vec<Post>> {
    let mut query = post::table.select(PostRow::as_select()).into_boxed();
    if search.min_score_total != 0 {
        query = query.filter(post::score_total.ge(search.min_score_total));
    }
    if let Some(rating) = search.rating {
        query = query.filter(post::rating.eq(rating));
    }
    if !search.general_tags.is_empty() {
        query = query.filter(post::tags_general.contains(&search.general_tags));
    }

    query
        .order_by(post::created_at.desc())
        .limit(search.limit)
        .offset(search.offset)
        .load(conn)
        .map(|rows| rows.into_iter().map(Post::from).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::enums::Rating;
    use crate::test::*;
    use serial_test::serial;

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn check_and_insert_keeps_first() {
        test_transaction(|conn| -> StoreResult<()> {
            let first = sample_post(9001, 5, Rating::Safe, &["canine"]);
            let mut second = first.clone();
            second.score.total = 500;
            second.description = String::from("changed");

            assert!(check_and_insert(conn, &first)?);
            assert!(!check_and_insert(conn, &second)?);

            let count: i64 = post::table.filter(post::id.eq(9001)).count().get_result(conn)?;
            assert_eq!(count, 1);

            let stored = get(conn, 9001)?;
            assert_eq!(stored.score.total, 5);
            assert_eq!(stored.description, first.description);
            Ok(())
        });
    }

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn missing_post_is_typed() {
        test_transaction(|conn| -> StoreResult<()> {
            assert!(matches!(get(conn, 404_404), Err(StoreError::PostNotFound(404_404))));
            assert!(matches!(delete(conn, 404_404), Err(StoreError::PostNotFound(404_404))));
            Ok(())
        });
    }

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn update_and_delete() {
        test_transaction(|conn| -> StoreResult<()> {
            let mut post = sample_post(9002, 1, Rating::Questionable, &[]);
            insert(conn, &post)?;

            post.fav_count = 77;
            update(conn, &post)?;
            let stored = get(conn, 9002)?;
            assert_eq!(stored.fav_count, 77);
            assert!(stored.updated_at > post.updated_at);

            delete(conn, 9002)?;
            assert!(matches!(get(conn, 9002), Err(StoreError::PostNotFound(9002))));
            Ok(())
        });
    }

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn search_filters_and_orders() {
        test_transaction(|conn| -> StoreResult<()> {
            let seeded = [
                sample_post_at(1, 10, Rating::Safe, &["canine", "solo"], 1),
                sample_post_at(2, 50, Rating::Safe, &["canine"], 4),
                sample_post_at(3, 12, Rating::Safe, &["feline"], 3),
                sample_post_at(4, 99, Rating::Explicit, &["canine"], 5),
                sample_post_at(5, 9, Rating::Safe, &["canine"], 6),
                sample_post_at(6, 30, Rating::Safe, &["canine", "duo"], 2),
            ];
            for post in &seeded {
                insert(conn, post)?;
            }

            let filter = PostSearch {
                min_score_total: 10,
                rating: Some(Rating::Safe),
                general_tags: vec![String::from("canine")],
                limit: 2,
                offset: 0,
            };
            let results = search(conn, &filter)?;
            let ids: Vec<i64> = results.iter().map(|post| post.id).collect();
            assert_eq!(ids, [2, 6]);
            for post in &results {
                assert!(post.score.total >= 10);
                assert_eq!(post.rating, Rating::Safe);
                assert!(post.tags.general.iter().any(|tag| tag == "canine"));
            }

            let next_page = search(conn, &PostSearch { offset: 2, ..filter })?;
            let ids: Vec<i64> = next_page.iter().map(|post| post.id).collect();
            assert_eq!(ids, [1]);

            let tag_only = PostSearch {
                general_tags: vec![String::from("solo")],
                limit: 10,
                ..PostSearch::default()
            };
            let ids: Vec<i64> = search(conn, &tag_only)?.iter().map(|post| post.id).collect();
            assert_eq!(ids, [1]);
            Ok(())
        });
    }
}
