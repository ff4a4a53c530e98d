use crate::record::{FullCommentRecord, FullPostRecord, GroupRecord, UserRecord};
use inkwell_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentMarker},
    follow::{FollowCounts, FollowOutcome},
    form::RequiredText,
    group::{CreateGroup, Group, GroupMarker, GroupSlug},
    post::{Post, PostContent, PostMarker},
    timestamp_to_nanos,
    user::{User, UserMarker, Username},
};
use inkwell_common::pagination::{Page, Paginator, RequestedPage};
use sqlx::{
    QueryBuilder, Sqlite, SqlitePool,
    migrate::MigrateError,
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A group with slug {0} already exists")]
    GroupSlugTaken(GroupSlug),
    #[error("Migrating the database failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const SELECT_POSTS: &str = "
    SELECT
        posts.post_id,
        posts.text,
        posts.image,
        posts.created_at,
        users.user_id,
        users.username,
        post_groups.group_id,
        post_groups.title AS group_title,
        post_groups.slug AS group_slug,
        post_groups.description AS group_description
    FROM
        posts
        JOIN users ON users.user_id = posts.author_id
        LEFT JOIN post_groups ON post_groups.group_id = posts.group_id
    ";

const SELECT_COMMENTS: &str = "
    SELECT
        comments.comment_id,
        comments.post_id,
        comments.text,
        comments.created_at,
        users.user_id,
        users.username
    FROM
        comments
        JOIN users ON users.user_id = comments.author_id
    ";

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostFilter {
    All,
    Group(Id<GroupMarker>),
    Author(Id<UserMarker>),
    /// Posts by every author the given user follows.
    FollowedBy(Id<UserMarker>),
}

impl PostFilter {
    fn push_where(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            PostFilter::All => {}
            PostFilter::Group(group_id) => {
                builder.push(" WHERE posts.group_id = ").push_bind(group_id.get());
            }
            PostFilter::Author(author_id) => {
                builder.push(" WHERE posts.author_id = ").push_bind(author_id.get());
            }
            PostFilter::FollowedBy(user_id) => {
                builder
                    .push(
                        " WHERE posts.author_id IN \
                        (SELECT follows.author_id FROM follows WHERE follows.user_id = ",
                    )
                    .push_bind(user_id.get())
                    .push(")");
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Ok(Self::new(pool))
    }

    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let client = Self::new(pool);
        client.migrate().await?;
        Ok(client)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.username
            FROM users
            WHERE users.user_id = ?1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.username
            FROM users
            WHERE users.username = ?1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn upsert_user(&self, username: &Username) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users (username)
            VALUES (?1)
            ON CONFLICT (username) DO UPDATE SET username = excluded.username
            RETURNING user_id, username
            ",
        )
        .bind(username.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM users WHERE user_id = ?1")
            .bind(user_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_group(&self, group: &CreateGroup) -> Result<Id<GroupMarker>> {
        let group_id = query_scalar::<_, i64>(
            "
            INSERT INTO post_groups (title, slug, description)
            VALUES (?1, ?2, ?3)
            RETURNING group_id
            ",
        )
        .bind(group.title.as_str())
        .bind(group.slug.get())
        .bind(group.description.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                DbError::GroupSlugTaken(group.slug.clone())
            }
            err => err.into(),
        })?;

        Ok(group_id.into())
    }

    pub async fn fetch_group(&self, group_id: Id<GroupMarker>) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM post_groups
            WHERE group_id = ?1
            ",
        )
        .bind(group_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    pub async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM post_groups
            WHERE slug = ?1
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    pub async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM post_groups
            ORDER BY title, group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let groups: Vec<Group> = records
            .into_iter()
            .map(Group::try_from)
            .collect::<Result<_, _>>()?;
        Ok(groups)
    }

    /// Fails once posts reference the group and the slug would change.
    pub async fn update_group(
        &self,
        group_id: Id<GroupMarker>,
        group: &CreateGroup,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE post_groups
            SET title = ?1, slug = ?2, description = ?3
            WHERE group_id = ?4
            ",
        )
        .bind(group.title.as_str())
        .bind(group.slug.get())
        .bind(group.description.as_str())
        .bind(group_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Posts of the group stay, with their group cleared.
    pub async fn delete_group(&self, group_id: Id<GroupMarker>) -> Result<bool> {
        let result = query("DELETE FROM post_groups WHERE group_id = ?1")
            .bind(group_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_POSTS);
        builder
            .push(" WHERE posts.post_id = ")
            .push_bind(post_id.get());

        let record = builder
            .build_query_as::<FullPostRecord>()
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        filter.push_where(&mut builder);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }

    /// Newest first; posts created at the same instant keep insertion order.
    pub async fn fetch_posts(
        &self,
        filter: PostFilter,
        paginator: Paginator,
        requested: RequestedPage,
    ) -> Result<Page<Post>> {
        let count = self.count_posts(filter).await?;
        let window = paginator.window(count, requested);

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_POSTS);
        filter.push_where(&mut builder);
        builder
            .push(" ORDER BY posts.created_at DESC, posts.post_id ASC LIMIT ")
            .push_bind(i64::from(window.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(window.offset()).unwrap_or(i64::MAX));

        let records = builder
            .build_query_as::<FullPostRecord>()
            .fetch_all(&self.pool)
            .await?;

        let posts: Vec<Post> = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(window.into_page(posts))
    }

    pub async fn create_post(
        &self,
        post: &PostContent,
        author: Id<UserMarker>,
    ) -> Result<Id<PostMarker>> {
        self.create_post_at(post, author, OffsetDateTime::now_utc())
            .await
    }

    pub async fn create_post_at(
        &self,
        post: &PostContent,
        author: Id<UserMarker>,
        created: OffsetDateTime,
    ) -> Result<Id<PostMarker>> {
        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts (text, created_at, author_id, group_id, image)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING post_id
            ",
        )
        .bind(post.text.get())
        .bind(timestamp_to_nanos(created)?)
        .bind(author.get())
        .bind(post.group.map(Id::get))
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(post_id.into())
    }

    pub async fn update_post(&self, post_id: Id<PostMarker>, post: &PostContent) -> Result<bool> {
        let result = query(
            "
            UPDATE posts
            SET text = ?1, group_id = ?2, image = ?3
            WHERE post_id = ?4
            ",
        )
        .bind(post.text.get())
        .bind(post.group.map(Id::get))
        .bind(post.image.as_deref())
        .bind(post_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts WHERE post_id = ?1")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COMMENTS);
        builder
            .push(" WHERE comments.comment_id = ")
            .push_bind(comment_id.get());

        let record = builder
            .build_query_as::<FullCommentRecord>()
            .fetch_optional(&self.pool)
            .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn fetch_post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COMMENTS);
        builder
            .push(" WHERE comments.post_id = ")
            .push_bind(post_id.get())
            .push(" ORDER BY comments.created_at DESC, comments.comment_id ASC");

        let records = builder
            .build_query_as::<FullCommentRecord>()
            .fetch_all(&self.pool)
            .await?;

        let comments: Vec<Comment> = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        text: &RequiredText,
    ) -> Result<Id<CommentMarker>> {
        let comment_id = query_scalar::<_, i64>(
            "
            INSERT INTO comments (post_id, author_id, text, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING comment_id
            ",
        )
        .bind(post_id.get())
        .bind(author.get())
        .bind(text.get())
        .bind(timestamp_to_nanos(OffsetDateTime::now_utc())?)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment_id.into())
    }

    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        text: &RequiredText,
    ) -> Result<bool> {
        let result = query("UPDATE comments SET text = ?1 WHERE comment_id = ?2")
            .bind(text.get())
            .bind(comment_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let result = query("DELETE FROM comments WHERE comment_id = ?1")
            .bind(comment_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get-or-create, backed by the unique `(user_id, author_id)` constraint.
    pub async fn follow(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<FollowOutcome> {
        if user == author {
            debug!(%user, "Ignoring self-follow");
            return Ok(FollowOutcome::SelfFollow);
        }

        let result = query(
            "
            INSERT INTO follows (user_id, author_id)
            VALUES (?1, ?2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2")
            .bind(user.get())
            .bind(author.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        let following = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM follows WHERE user_id = ?1 AND author_id = ?2
            )
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(following)
    }

    pub async fn follow_counts(&self, user: Id<UserMarker>) -> Result<FollowCounts> {
        let (followers, following) = query_as::<_, (i64, i64)>(
            "
            SELECT
                (SELECT COUNT(*) FROM follows WHERE author_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE user_id = ?1)
            ",
        )
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowCounts {
            followers: followers.cast_unsigned(),
            following: following.cast_unsigned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{DbClient, DbError, PostFilter};
    use inkwell_common::model::{
        Id,
        follow::FollowOutcome,
        form::RequiredText,
        group::{CreateGroup, GroupMarker, GroupSlug},
        post::{Post, PostContent, PostMarker},
        user::{User, Username},
    };
    use inkwell_common::pagination::{Page, Paginator, RequestedPage};
    use std::num::NonZeroU32;
    use time::{Duration, OffsetDateTime, macros::datetime};

    const START: OffsetDateTime = datetime!(2022-12-19 14:55 UTC);

    async fn db() -> DbClient {
        DbClient::connect_in_memory().await.unwrap()
    }

    async fn user(db: &DbClient, username: &str) -> User {
        db.upsert_user(&Username::new(username.to_owned()).unwrap())
            .await
            .unwrap()
    }

    async fn group(db: &DbClient, slug: &str) -> Id<GroupMarker> {
        let group = CreateGroup::new(
            format!("Group {slug}"),
            GroupSlug::new(slug.to_owned()).unwrap(),
            "Description".to_owned(),
        )
        .unwrap();
        db.create_group(&group).await.unwrap()
    }

    fn content(text: &str, group: Option<Id<GroupMarker>>) -> PostContent {
        PostContent {
            text: RequiredText::new(text).unwrap(),
            group,
            image: None,
        }
    }

    async fn post_at(
        db: &DbClient,
        author: &User,
        text: &str,
        group: Option<Id<GroupMarker>>,
        seconds: i64,
    ) -> Id<PostMarker> {
        db.create_post_at(
            &content(text, group),
            author.id,
            START + Duration::seconds(seconds),
        )
        .await
        .unwrap()
    }

    fn paginator() -> Paginator {
        Paginator::new(NonZeroU32::new(10).unwrap())
    }

    fn texts(page: &Page<Post>) -> Vec<&str> {
        page.items.iter().map(|post| post.text.get()).collect()
    }

    #[tokio::test]
    async fn upsert_user_is_stable() {
        let db = db().await;

        let first = user(&db, "auth").await;
        let second = user(&db, "auth").await;
        assert_eq!(first, second);

        let other = user(&db, "other").await;
        assert_ne!(first.id, other.id);

        let fetched = db
            .fetch_user_by_username(&first.username)
            .await
            .unwrap();
        assert_eq!(fetched, Some(first));
    }

    #[tokio::test]
    async fn thirteen_posts_split_into_two_pages() {
        let db = db().await;
        let author = user(&db, "auth").await;
        for i in 0..13 {
            post_at(&db, &author, &format!("post {i}"), None, i).await;
        }

        let first = db
            .fetch_posts(PostFilter::All, paginator(), RequestedPage::First)
            .await
            .unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.count, 13);
        assert_eq!(first.num_pages, 2);
        assert_eq!(texts(&first)[..3], ["post 12", "post 11", "post 10"]);

        let second = db
            .fetch_posts(PostFilter::All, paginator(), RequestedPage::Number(2))
            .await
            .unwrap();
        assert_eq!(texts(&second), ["post 2", "post 1", "post 0"]);

        let fallback = db
            .fetch_posts(PostFilter::All, paginator(), RequestedPage::Number(99))
            .await
            .unwrap();
        assert_eq!(fallback.number, 2);
        assert_eq!(fallback.items, second.items);
    }

    #[tokio::test]
    async fn simultaneous_posts_keep_insertion_order() {
        let db = db().await;
        let author = user(&db, "auth").await;
        post_at(&db, &author, "older", None, 0).await;
        post_at(&db, &author, "first", None, 5).await;
        post_at(&db, &author, "second", None, 5).await;

        let page = db
            .fetch_posts(PostFilter::All, paginator(), RequestedPage::First)
            .await
            .unwrap();
        assert_eq!(texts(&page), ["first", "second", "older"]);
    }

    #[tokio::test]
    async fn filters() {
        let db = db().await;
        let leo = user(&db, "leo").await;
        let anna = user(&db, "anna").await;
        let novels = group(&db, "novels").await;

        post_at(&db, &leo, "leo in novels", Some(novels), 0).await;
        post_at(&db, &leo, "leo alone", None, 1).await;
        post_at(&db, &anna, "anna in novels", Some(novels), 2).await;

        let in_group = db
            .fetch_posts(PostFilter::Group(novels), paginator(), RequestedPage::First)
            .await
            .unwrap();
        assert_eq!(texts(&in_group), ["anna in novels", "leo in novels"]);
        assert_eq!(in_group.items[0].group.as_ref().unwrap().id, novels);

        let by_leo = db
            .fetch_posts(PostFilter::Author(leo.id), paginator(), RequestedPage::First)
            .await
            .unwrap();
        assert_eq!(texts(&by_leo), ["leo alone", "leo in novels"]);
        assert_eq!(db.count_posts(PostFilter::Author(anna.id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn follow_is_idempotent() {
        let db = db().await;
        let reader = user(&db, "reader").await;
        let writer = user(&db, "writer").await;

        assert_eq!(
            db.follow(reader.id, writer.id).await.unwrap(),
            FollowOutcome::Created
        );
        let counts = db.follow_counts(writer.id).await.unwrap();
        assert_eq!(counts.followers, 1);

        assert_eq!(
            db.follow(reader.id, writer.id).await.unwrap(),
            FollowOutcome::AlreadyFollowing
        );
        assert_eq!(db.follow_counts(writer.id).await.unwrap(), counts);
        assert_eq!(db.follow_counts(reader.id).await.unwrap().following, 1);
        assert!(db.is_following(reader.id, writer.id).await.unwrap());
        assert!(!db.is_following(writer.id, reader.id).await.unwrap());
    }

    #[tokio::test]
    async fn self_follow_is_ignored() {
        let db = db().await;
        let narcissus = user(&db, "narcissus").await;

        assert_eq!(
            db.follow(narcissus.id, narcissus.id).await.unwrap(),
            FollowOutcome::SelfFollow
        );
        assert!(!db.is_following(narcissus.id, narcissus.id).await.unwrap());
        assert_eq!(db.follow_counts(narcissus.id).await.unwrap().followers, 0);
    }

    #[tokio::test]
    async fn unfollow_missing_relation_is_noop() {
        let db = db().await;
        let reader = user(&db, "reader").await;
        let writer = user(&db, "writer").await;

        assert!(!db.unfollow(reader.id, writer.id).await.unwrap());

        db.follow(reader.id, writer.id).await.unwrap();
        assert!(db.unfollow(reader.id, writer.id).await.unwrap());
        assert!(!db.is_following(reader.id, writer.id).await.unwrap());
    }

    #[tokio::test]
    async fn feed_contains_only_followed_authors() {
        let db = db().await;
        let follower = user(&db, "follower").await;
        let author = user(&db, "author").await;
        let stranger = user(&db, "stranger").await;

        db.follow(follower.id, author.id).await.unwrap();
        post_at(&db, &author, "followed post", None, 0).await;
        post_at(&db, &stranger, "unrelated post", None, 1).await;

        let feed = db
            .fetch_posts(
                PostFilter::FollowedBy(follower.id),
                paginator(),
                RequestedPage::First,
            )
            .await
            .unwrap();
        assert_eq!(texts(&feed), ["followed post"]);

        let stranger_feed = db
            .fetch_posts(
                PostFilter::FollowedBy(stranger.id),
                paginator(),
                RequestedPage::First,
            )
            .await
            .unwrap();
        assert!(stranger_feed.items.is_empty());
    }

    #[tokio::test]
    async fn deleting_group_keeps_posts() {
        let db = db().await;
        let author = user(&db, "auth").await;
        let doomed = group(&db, "doomed").await;
        let post_id = post_at(&db, &author, "survivor", Some(doomed), 0).await;

        assert!(db.delete_group(doomed).await.unwrap());

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.group, None);
        assert_eq!(post.text.get(), "survivor");
    }

    #[tokio::test]
    async fn deletes_cascade() {
        let db = db().await;
        let author = user(&db, "auth").await;
        let commenter = user(&db, "commenter").await;
        let post_id = post_at(&db, &author, "post", None, 0).await;
        let text = RequiredText::new("comment").unwrap();
        let comment_id = db.create_comment(post_id, commenter.id, &text).await.unwrap();
        db.follow(commenter.id, author.id).await.unwrap();

        assert!(db.delete_post(post_id).await.unwrap());
        assert_eq!(db.fetch_comment(comment_id).await.unwrap(), None);

        let second_post = post_at(&db, &author, "again", None, 1).await;
        db.create_comment(second_post, commenter.id, &text).await.unwrap();
        assert!(db.delete_user(commenter.id).await.unwrap());
        assert!(db.fetch_post_comments(second_post).await.unwrap().is_empty());
        assert_eq!(db.follow_counts(author.id).await.unwrap().followers, 0);

        assert!(db.delete_user(author.id).await.unwrap());
        assert_eq!(db.fetch_post(second_post).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_post_keeps_creation_time() {
        let db = db().await;
        let author = user(&db, "auth").await;
        let post_id = post_at(&db, &author, "before", None, 0).await;
        let created = db.fetch_post(post_id).await.unwrap().unwrap().created;

        assert!(db.update_post(post_id, &content("after", None)).await.unwrap());

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.text.get(), "after");
        assert_eq!(post.created, created);

        let tampering = sqlx::query("UPDATE posts SET created_at = created_at + 1")
            .execute(db.pool())
            .await;
        assert!(tampering.is_err());
    }

    #[tokio::test]
    async fn group_slugs() {
        let db = db().await;
        let author = user(&db, "auth").await;
        let used = group(&db, "used").await;
        let unused = group(&db, "unused").await;
        post_at(&db, &author, "post", Some(used), 0).await;

        let duplicate = CreateGroup::new(
            "Duplicate".to_owned(),
            GroupSlug::new("used".to_owned()).unwrap(),
            String::new(),
        )
        .unwrap();
        assert!(matches!(
            db.create_group(&duplicate).await,
            Err(DbError::GroupSlugTaken(_))
        ));

        let renamed = |slug: &str| {
            CreateGroup::new(
                "Renamed".to_owned(),
                GroupSlug::new(slug.to_owned()).unwrap(),
                String::new(),
            )
            .unwrap()
        };
        assert!(db.update_group(unused, &renamed("fresh")).await.unwrap());
        assert!(db.update_group(used, &renamed("moved")).await.is_err());
        assert!(db.update_group(used, &renamed("used")).await.unwrap());

        let fetched = db
            .fetch_group_by_slug(&GroupSlug::new("fresh".to_owned()).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, unused);
        assert_eq!(db.fetch_groups().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn comments_newest_first() {
        let db = db().await;
        let author = user(&db, "auth").await;
        let post_id = post_at(&db, &author, "post", None, 0).await;

        for text in ["first", "second"] {
            db.create_comment(post_id, author.id, &RequiredText::new(text).unwrap())
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let comments = db.fetch_post_comments(post_id).await.unwrap();
        let texts: Vec<_> = comments.iter().map(|comment| comment.text.get()).collect();
        assert_eq!(texts, ["second", "first"]);
        assert!(comments.iter().all(|comment| comment.post_id == post_id));
    }
}
