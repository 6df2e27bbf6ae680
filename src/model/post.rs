use crate::model::enums::Rating;
use crate::schema::post;
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A post as returned by the upstream API. Fields this proxy doesn't know about are
/// kept in `extra` so they survive re-serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub created_at: DateTime,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
    pub file: File,
    pub preview: Preview,
    pub sample: Sample,
    pub score: Score,
    pub tags: Tags,
    #[serde(default)]
    pub locked_tags: Vec<String>,
    pub change_seq: i64,
    pub flags: Flags,
    pub rating: Rating,
    pub fav_count: i32,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub pools: Vec<i64>,
    pub relationships: Relationships,
    pub approver_id: Option<i64>,
    pub uploader_id: i64,
    #[serde(default)]
    pub description: String,
    pub comment_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub width: i32,
    pub height: i32,
    pub ext: String,
    pub size: i64,
    pub md5: String,
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub width: i32,
    pub height: i32,
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub has: bool,
    pub width: i32,
    pub height: i32,
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub up: i32,
    pub down: i32,
    pub total: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tags {
    pub general: Vec<String>,
    pub species: Vec<String>,
    pub character: Vec<String>,
    pub artist: Vec<String>,
    pub invalid: Vec<String>,
    pub lore: Vec<String>,
    pub meta: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    pub pending: bool,
    pub flagged: bool,
    pub note_locked: bool,
    pub status_locked: bool,
    pub rating_locked: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub has_active_children: bool,
    #[serde(default)]
    pub children: Vec<i64>,
}

/// The upstream wraps post listings as `{"posts": [...]}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostList {
    pub posts: Vec<Post>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The upstream wraps single posts as `{"post": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SinglePost {
    pub post: Post,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Flattened database representation of a [`Post`].
#[derive(Debug, Clone, PartialEq, AsChangeset, Identifiable, Insertable, Queryable, Selectable)]
#[diesel(table_name = post)]
#[diesel(check_for_backend(Pg))]
#[diesel(treat_none_as_null = true)]
pub struct PostRow {
    pub id: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub file_width: i32,
    pub file_height: i32,
    pub file_ext: String,
    pub file_size: i64,
    pub file_md5: String,
    pub file_url: Option<String>,
    pub preview_width: i32,
    pub preview_height: i32,
    pub preview_url: Option<String>,
    pub sample_has: bool,
    pub sample_width: i32,
    pub sample_height: i32,
    pub sample_url: Option<String>,
    pub score_up: i32,
    pub score_down: i32,
    pub score_total: i32,
    pub tags_general: Vec<String>,
    pub tags_species: Vec<String>,
    pub tags_character: Vec<String>,
    pub tags_artist: Vec<String>,
    pub tags_invalid: Vec<String>,
    pub tags_lore: Vec<String>,
    pub tags_meta: Vec<String>,
    pub locked_tags: Vec<String>,
    pub change_seq: i64,
    pub flags_pending: bool,
    pub flags_flagged: bool,
    pub flags_note_locked: bool,
    pub flags_status_locked: bool,
    pub flags_rating_locked: bool,
    pub flags_deleted: bool,
    pub rating: Rating,
    pub fav_count: i32,
    pub sources: Vec<String>,
    pub pools: Vec<i64>,
    pub parent_id: Option<i64>,
    pub has_children: bool,
    pub has_active_children: bool,
    pub children: Vec<i64>,
    pub approver_id: Option<i64>,
    pub uploader_id: i64,
    pub description: String,
    pub comment_count: i32,
    pub is_favorited: Option<bool>,
}

impl From<&Post> for PostRow {
    /// A missing update time defaults to the creation time.
    fn from(post: &Post) -> Self {
        let Post {
            id,
            created_at,
            updated_at,
            file,
            preview,
            sample,
            score,
            tags,
            locked_tags,
            change_seq,
            flags,
            rating,
            fav_count,
            sources,
            pools,
            relationships,
            approver_id,
            uploader_id,
            description,
            comment_count,
            is_favorited,
            extra: _,
        } = post.clone();

        Self {
            id,
            created_at,
            updated_at: updated_at.unwrap_or(created_at),
            file_width: file.width,
            file_height: file.height,
            file_ext: file.ext,
            file_size: file.size,
            file_md5: file.md5,
            file_url: file.url,
            preview_width: preview.width,
            preview_height: preview.height,
            preview_url: preview.url,
            sample_has: sample.has,
            sample_width: sample.width,
            sample_height: sample.height,
            sample_url: sample.url,
            score_up: score.up,
            score_down: score.down,
            score_total: score.total,
            tags_general: tags.general,
            tags_species: tags.species,
            tags_character: tags.character,
            tags_artist: tags.artist,
            tags_invalid: tags.invalid,
            tags_lore: tags.lore,
            tags_meta: tags.meta,
            locked_tags,
            change_seq,
            flags_pending: flags.pending,
            flags_flagged: flags.flagged,
            flags_note_locked: flags.note_locked,
            flags_status_locked: flags.status_locked,
            flags_rating_locked: flags.rating_locked,
            flags_deleted: flags.deleted,
            rating,
            fav_count,
            sources,
            pools,
            parent_id: relationships.parent_id,
            has_children: relationships.has_children,
            has_active_children: relationships.has_active_children,
            children: relationships.children,
            approver_id,
            uploader_id,
            description,
            comment_count,
            is_favorited,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            updated_at: Some(row.updated_at),
            file: File {
                width: row.file_width,
                height: row.file_height,
                ext: row.file_ext,
                size: row.file_size,
                md5: row.file_md5,
                url: row.file_url,
                extra: Map::new(),
            },
            preview: Preview {
                width: row.preview_width,
                height: row.preview_height,
                url: row.preview_url,
                extra: Map::new(),
            },
            sample: Sample {
                has: row.sample_has,
                width: row.sample_width,
                height: row.sample_height,
                url: row.sample_url,
                extra: Map::new(),
            },
            score: Score {
                up: row.score_up,
                down: row.score_down,
                total: row.score_total,
            },
            tags: Tags {
                general: row.tags_general,
                species: row.tags_species,
                character: row.tags_character,
                artist: row.tags_artist,
                invalid: row.tags_invalid,
                lore: row.tags_lore,
                meta: row.tags_meta,
            },
            locked_tags: row.locked_tags,
            change_seq: row.change_seq,
            flags: Flags {
                pending: row.flags_pending,
                flagged: row.flags_flagged,
                note_locked: row.flags_note_locked,
                status_locked: row.flags_status_locked,
                rating_locked: row.flags_rating_locked,
                deleted: row.flags_deleted,
            },
            rating: row.rating,
            fav_count: row.fav_count,
            sources: row.sources,
            pools: row.pools,
            relationships: Relationships {
                parent_id: row.parent_id,
                has_children: row.has_children,
                has_active_children: row.has_active_children,
                children: row.children,
            },
            approver_id: row.approver_id,
            uploader_id: row.uploader_id,
            description: row.description,
            comment_count: row.comment_count,
            is_favorited: row.is_favorited,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;

    #[test]
    fn unknown_fields_survive() {
        let json: Value = serde_json::from_str(SAMPLE_POST_JSON).unwrap();
        let post: Post = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(post.extra.get("duration"), Some(&Value::Null));
        assert!(post.sample.extra.contains_key("alternates"));

        let reserialized = serde_json::to_value(&post).unwrap();
        assert_eq!(reserialized, json);
    }

    #[test]
    fn row_defaults_updated_at() {
        let mut post = sample_post(7, 12, Rating::Safe, &["canine"]);
        post.updated_at = None;
        let row = PostRow::from(&post);
        assert_eq!(row.updated_at, post.created_at);
        assert_eq!(row.tags_general, vec![String::from("canine")]);
        assert_eq!(row.score_total, 12);

        let restored = Post::from(row);
        assert_eq!(restored.id, 7);
        assert_eq!(restored.updated_at, Some(post.created_at));
        assert_eq!(restored.file, post.file);
    }
}
