use crate::model::pool::{NewPool, Pool, PoolPost};
use crate::schema::{pool, pool_post};
use diesel::prelude::*;

/// Writes every scalar field of `pool` and replaces its membership sequence.
/// Both happen in one transaction, so a failure leaves the previous state intact.
pub fn upsert(conn: &mut PgConnection, pool: &Pool) -> QueryResult<()> {
    conn.transaction(|conn| {
        let new_pool = NewPool::from(pool);
        diesel::insert_into(pool::table)
            .values(&new_pool)
            .on_conflict(pool::id)
            .do_update()
            .set(&new_pool)
            .execute(conn)?;
        replace_members(conn, pool.id, &pool.post_ids)
    })
}

fn replace_members(conn: &mut PgConnection, pool_id: i64, post_ids: &[i64]) -> QueryResult<()> {
    diesel::delete(pool_post::table.filter(pool_post::pool_id.eq(pool_id))).execute(conn)?;
    if post_ids.is_empty() {
        return Ok(());
    }

    let new_members: Vec<_> = post_ids
        .iter()
        .zip(0..)
        .map(|(&post_id, position)| PoolPost {
            pool_id,
            position,
            post_id,
        })
        .collect();
    diesel::insert_into(pool_post::table)
        .values(new_members)
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use serial_test::serial;

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn membership_is_replaced() {
        test_transaction(|conn| -> QueryResult<()> {
            upsert(conn, &sample_pool(31, "First name", &[1, 2, 3]))?;
            assert_eq!(pool_members(conn, 31)?, [1, 2, 3]);

            upsert(conn, &sample_pool(31, "Second name", &[4, 5]))?;
            assert_eq!(pool_members(conn, 31)?, [4, 5]);

            let name: String = pool::table.find(31).select(pool::name).first(conn)?;
            assert_eq!(name, "Second name");

            upsert(conn, &sample_pool(31, "Emptied", &[]))?;
            assert!(pool_members(conn, 31)?.is_empty());
            Ok(())
        });
    }

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn failed_replacement_rolls_back() {
        test_transaction(|conn| -> QueryResult<()> {
            upsert(conn, &sample_pool(32, "Original", &[1, 2, 3]))?;

            // Post id 0 violates the membership check constraint after the old rows are gone.
            let result = upsert(conn, &sample_pool(32, "Renamed", &[4, 0]));
            assert!(result.is_err());

            assert_eq!(pool_members(conn, 32)?, [1, 2, 3]);
            let name: String = pool::table.find(32).select(pool::name).first(conn)?;
            assert_eq!(name, "Original");
            Ok(())
        });
    }

    #[test]
    #[serial]
    #[ignore = "requires PostgreSQL"]
    fn preserves_order() {
        test_transaction(|conn| -> QueryResult<()> {
            upsert(conn, &sample_pool(33, "Comic", &[50, 10, 40, 20]))?;
            assert_eq!(pool_members(conn, 33)?, [50, 10, 40, 20]);
            Ok(())
        });
    }
}
