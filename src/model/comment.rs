use crate::schema::comment;
use crate::time::DateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub created_at: DateTime,
    pub post_id: i64,
    pub creator_id: i64,
    pub body: String,
    pub score: i32,
    pub updated_at: DateTime,
    pub updater_id: i64,
    #[serde(default)]
    pub do_not_bump_post: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_sticky: bool,
    pub warning_type: Option<String>,
    pub warning_user_id: Option<i64>,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub updater_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Comment listings arrive either as a bare array or wrapped as `{"comments": [...]}`.
/// The shape is kept so the response matches what the upstream sent.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommentList {
    List(Vec<Comment>),
    Wrapped {
        comments: Vec<Comment>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl CommentList {
    pub fn comments(&self) -> &[Comment] {
        match self {
            Self::List(comments) | Self::Wrapped { comments, .. } => comments,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = comment)]
pub struct NewComment<'a> {
    pub id: i64,
    pub created_at: DateTime,
    pub post_id: i64,
    pub creator_id: i64,
    pub body: &'a str,
    pub score: i32,
    pub updated_at: DateTime,
    pub updater_id: i64,
    pub do_not_bump_post: bool,
    pub is_hidden: bool,
    pub is_sticky: bool,
    pub warning_type: Option<&'a str>,
    pub warning_user_id: Option<i64>,
    pub creator_name: &'a str,
    pub updater_name: &'a str,
}

impl<'a> From<&'a Comment> for NewComment<'a> {
    fn from(comment: &'a Comment) -> Self {
        Self {
            id: comment.id,
            created_at: comment.created_at,
            post_id: comment.post_id,
            creator_id: comment.creator_id,
            body: &comment.body,
            score: comment.score,
            updated_at: comment.updated_at,
            updater_id: comment.updater_id,
            do_not_bump_post: comment.do_not_bump_post,
            is_hidden: comment.is_hidden,
            is_sticky: comment.is_sticky,
            warning_type: comment.warning_type.as_deref(),
            warning_user_id: comment.warning_user_id,
            creator_name: &comment.creator_name,
            updater_name: &comment.updater_name,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;

    #[test]
    fn listing_shapes() {
        let bare = format!("[{SAMPLE_COMMENT_JSON}]");
        let list: CommentList = serde_json::from_str(&bare).unwrap();
        assert!(matches!(list, CommentList::List(_)));
        assert_eq!(list.comments()[0].body, "Nice shading");

        let wrapped = format!("{{\"comments\":[{SAMPLE_COMMENT_JSON}],\"meta\":1}}");
        let list: CommentList = serde_json::from_str(&wrapped).unwrap();
        assert!(matches!(list, CommentList::Wrapped { .. }));
        assert_eq!(list.comments().len(), 1);

        let reserialized = serde_json::to_value(&list).unwrap();
        assert_eq!(reserialized["meta"], 1);
        assert_eq!(reserialized["comments"][0]["id"], 101);
    }

    #[test]
    fn listing_rejects_posts() {
        let posts = format!("[{SAMPLE_POST_JSON}]");
        assert!(serde_json::from_str::<CommentList>(&posts).is_err());
    }
}
