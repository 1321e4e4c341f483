use crate::{
    error::{AppError, Result},
    models::{bookmark::*, response::Paginated, tag::{Tag, TagLink}},
    services::{
        policy::{Scope, Viewer},
        tag::TagService,
        Database,
    },
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

const BOOKMARK_SELECT: &str = "SELECT b.id, b.url, b.title, b.description, b.is_public, \
     b.date_created, b.date_updated, b.owner_id, u.username AS owner_username \
     FROM bookmarks b JOIN users u ON u.id = b.owner_id";

#[derive(Clone)]
pub struct BookmarkService {
    db: Arc<Database>,
    tags: TagService,
}

impl BookmarkService {
    pub async fn new(db: Arc<Database>, tags: TagService) -> Result<Self> {
        Ok(Self { db, tags })
    }

    /// Create a bookmark owned by the viewer.
    pub async fn create_bookmark(
        &self,
        viewer: &Viewer,
        request: CreateBookmarkRequest,
    ) -> Result<Bookmark> {
        let owner = viewer.require_authenticated()?;
        request.validate()?;

        let tags = self
            .tags
            .resolve_names(request.tags.as_deref().unwrap_or_default())
            .await?;

        debug!("Creating bookmark {} for user: {}", request.url, owner.id);

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let id = sqlx::query(
            "INSERT INTO bookmarks (url, title, description, is_public, date_created, date_updated, owner_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.url.trim())
        .bind(request.title.trim())
        .bind(request.description.unwrap_or_default())
        .bind(request.is_public.unwrap_or(true))
        .bind(now)
        .bind(now)
        .bind(owner.id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        replace_tags(&mut tx, id, &tags).await?;
        tx.commit().await?;

        info!("Created bookmark {} for {}", id, owner.username);
        self.fetch(id).await
    }

    pub async fn get_bookmark(&self, viewer: &Viewer, id: i64) -> Result<Bookmark> {
        let bookmark = self.fetch(id).await?;
        viewer.require_read(&bookmark)?;
        Ok(bookmark)
    }

    /// Load a bookmark the viewer is allowed to edit, e.g. to prefill a form.
    pub async fn get_for_edit(&self, viewer: &Viewer, id: i64) -> Result<Bookmark> {
        let bookmark = self.fetch(id).await?;
        viewer.require_write(&bookmark)?;
        Ok(bookmark)
    }

    /// Apply the present fields of `request`. The owner never changes and
    /// `date_created` is kept.
    pub async fn update_bookmark(
        &self,
        viewer: &Viewer,
        id: i64,
        request: UpdateBookmarkRequest,
    ) -> Result<Bookmark> {
        let existing = self.fetch(id).await?;
        viewer.require_write(&existing)?;
        request.validate()?;

        let tags = match &request.tags {
            Some(names) => Some(self.tags.resolve_names(names).await?),
            None => None,
        };

        // 时钟回拨时也不能让更新时间早于上一次保存
        let now = Utc::now().max(existing.date_updated);

        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            "UPDATE bookmarks SET url = ?, title = ?, description = ?, is_public = ?, date_updated = ? \
             WHERE id = ?",
        )
        .bind(request.url.as_deref().map(str::trim).unwrap_or(&existing.url))
        .bind(request.title.as_deref().map(str::trim).unwrap_or(&existing.title))
        .bind(request.description.as_deref().unwrap_or(&existing.description))
        .bind(request.is_public.unwrap_or(existing.is_public))
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(tags) = &tags {
            replace_tags(&mut tx, id, tags).await?;
        }

        tx.commit().await?;

        info!("Updated bookmark {}", id);
        self.fetch(id).await
    }

    pub async fn delete_bookmark(&self, viewer: &Viewer, id: i64) -> Result<()> {
        let existing = self.fetch(id).await?;
        viewer.require_delete(&existing)?;

        sqlx::query("DELETE FROM bookmarks WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        info!("Deleted bookmark {}", id);
        Ok(())
    }

    /// Bookmarks in the viewer's listing scope, newest first.
    pub async fn list_bookmarks(
        &self,
        viewer: &Viewer,
        filter: &BookmarkFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Paginated<Bookmark>> {
        self.paginate(viewer.scope(), filter, page, per_page).await
    }

    /// One owner's bookmarks: all of them for the owner and superusers,
    /// public ones for everybody else.
    pub async fn list_for_owner(
        &self,
        viewer: &Viewer,
        owner_id: i64,
        filter: &BookmarkFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Paginated<Bookmark>> {
        let filter = filter.clone().with_owner(owner_id);
        self.paginate(viewer.scope_for_owner(owner_id), &filter, page, per_page)
            .await
    }

    /// Unpaginated variant of [`Self::list_for_owner`] for nested listings.
    pub async fn all_for_owner(&self, viewer: &Viewer, owner_id: i64) -> Result<Vec<Bookmark>> {
        let filter = BookmarkFilter::default().with_owner(owner_id);
        self.query(viewer.scope_for_owner(owner_id), &filter, None)
            .await
    }

    async fn paginate(
        &self,
        scope: Scope,
        filter: &BookmarkFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Paginated<Bookmark>> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM bookmarks b");
        push_conditions(&mut count, scope, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.db.pool()).await?;

        // pages that cannot be addressed are past the end
        let items = match page_offset(page, per_page) {
            Some(offset) => self.query(scope, filter, Some((offset, per_page))).await?,
            None => Vec::new(),
        };

        Ok(Paginated::new(items, total as usize, page, per_page))
    }

    async fn query(
        &self,
        scope: Scope,
        filter: &BookmarkFilter,
        window: Option<(i64, usize)>,
    ) -> Result<Vec<Bookmark>> {
        debug!("Listing bookmarks with scope {:?} and filter {:?}", scope, filter);

        let mut qb = QueryBuilder::<Sqlite>::new(BOOKMARK_SELECT);
        push_conditions(&mut qb, scope, filter);
        qb.push(" ORDER BY b.date_created DESC, b.id DESC");

        if let Some((offset, limit)) = window {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        let rows: Vec<BookmarkRow> = qb.build_query_as().fetch_all(self.db.pool()).await?;
        self.attach_tags(rows).await
    }

    async fn fetch(&self, id: i64) -> Result<Bookmark> {
        let row = sqlx::query_as::<_, BookmarkRow>(&format!("{} WHERE b.id = ?", BOOKMARK_SELECT))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::not_found("Bookmark"))?;

        let mut bookmarks = self.attach_tags(vec![row]).await?;
        bookmarks
            .pop()
            .ok_or_else(|| AppError::internal("Bookmark vanished while loading tags"))
    }

    async fn attach_tags(&self, rows: Vec<BookmarkRow>) -> Result<Vec<Bookmark>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT bt.bookmark_id, t.id, t.name FROM bookmark_tags bt \
             JOIN tags t ON t.id = bt.tag_id WHERE bt.bookmark_id IN (",
        );
        let mut ids = qb.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        ids.push_unseparated(") ORDER BY t.name");

        let links: Vec<TagLink> = qb.build_query_as().fetch_all(self.db.pool()).await?;

        let mut by_bookmark: HashMap<i64, Vec<Tag>> = HashMap::new();
        for link in links {
            by_bookmark.entry(link.bookmark_id).or_default().push(link.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_bookmark.remove(&row.id).unwrap_or_default();
                row.into_bookmark(tags)
            })
            .collect())
    }
}

async fn replace_tags(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    bookmark_id: i64,
    tags: &[Tag],
) -> Result<()> {
    sqlx::query("DELETE FROM bookmark_tags WHERE bookmark_id = ?")
        .bind(bookmark_id)
        .execute(&mut **tx)
        .await?;

    for tag in tags {
        sqlx::query("INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id) VALUES (?, ?)")
            .bind(bookmark_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Append the WHERE clause for a scope and filter. Expects the bookmarks
/// table aliased as `b`.
fn push_conditions(qb: &mut QueryBuilder<'_, Sqlite>, scope: Scope, filter: &BookmarkFilter) {
    qb.push(" WHERE 1 = 1");

    match scope {
        Scope::Public => {
            qb.push(" AND b.is_public = 1");
        }
        Scope::PublicOrOwnedBy(user_id) => {
            qb.push(" AND (b.is_public = 1 OR b.owner_id = ");
            qb.push_bind(user_id);
            qb.push(")");
        }
        Scope::All => {}
    }

    if let Some(owner_id) = filter.owner_id {
        qb.push(" AND b.owner_id = ");
        qb.push_bind(owner_id);
    }

    if let Some(tag) = &filter.tag {
        qb.push(
            " AND EXISTS (SELECT 1 FROM bookmark_tags bt JOIN tags t ON t.id = bt.tag_id \
             WHERE bt.bookmark_id = b.id AND t.name = ",
        );
        qb.push_bind(tag.clone());
        qb.push(")");
    }

    for term in filter.search_terms() {
        let pattern = like_pattern(&term);
        qb.push(" AND (b.title LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(r" ESCAPE '\' OR b.url LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(r" ESCAPE '\' OR b.description LIKE ");
        qb.push_bind(pattern);
        qb.push(r" ESCAPE '\')");
    }

    if let Some(after) = filter.date_created_after {
        qb.push(" AND b.date_created >= ");
        qb.push_bind(after);
    }
    if let Some(before) = filter.date_created_before {
        qb.push(" AND b.date_created <= ");
        qb.push_bind(before);
    }
    if let Some(after) = filter.date_updated_after {
        qb.push(" AND b.date_updated >= ");
        qb.push_bind(after);
    }
    if let Some(before) = filter.date_updated_before {
        qb.push(" AND b.date_updated <= ");
        qb.push_bind(before);
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
/// Row offset of a 1-based page, `None` when it does not fit SQLite's
/// signed 64-bit OFFSET.
fn page_offset(page: usize, per_page: usize) -> Option<i64> {
    page.checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(per_page))
        .and_then(|offset| i64::try_from(offset).ok())
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tag::TagRequest;
    use crate::models::user::{RegisterRequest, User};
    use crate::services::user::UserService;
    use chrono::Duration;

    struct Fixture {
        bookmarks: BookmarkService,
        dummy: Viewer,
        other: Viewer,
        admin: Viewer,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let users = UserService::new(db.clone()).await.unwrap();
        let tags = TagService::new(db.clone()).await.unwrap();
        let bookmarks = BookmarkService::new(db, tags.clone()).await.unwrap();

        let mk = |name: &str| RegisterRequest {
            username: name.to_string(),
            password: "password123".to_string(),
        };
        let dummy = Viewer::User(users.create_user(mk("dummy"), false).await.unwrap());
        let other = Viewer::User(users.create_user(mk("other"), false).await.unwrap());
        let admin = Viewer::User(users.create_user(mk("admin"), true).await.unwrap());

        for name in ["testtag", "rust"] {
            tags.create_tag(&admin, TagRequest { name: name.to_string() })
                .await
                .unwrap();
        }

        Fixture {
            bookmarks,
            dummy,
            other,
            admin,
        }
    }

    fn request(title: &str, is_public: bool, tags: &[&str]) -> CreateBookmarkRequest {
        CreateBookmarkRequest {
            url: format!("https://example.com/{}", title),
            title: title.to_string(),
            description: Some(format!("about {}", title)),
            is_public: Some(is_public),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        }
    }

    fn titles(page: &Paginated<Bookmark>) -> Vec<&str> {
        page.items.iter().map(|b| b.title.as_str()).collect()
    }

    fn owner(viewer: &Viewer) -> &User {
        viewer.user().unwrap()
    }

    #[tokio::test]
    async fn create_sets_owner_and_equal_timestamps() {
        let f = fixture().await;
        let created = f
            .bookmarks
            .create_bookmark(&f.dummy, request("localhost", true, &["rust"]))
            .await
            .unwrap();

        assert_eq!(created.owner_id, owner(&f.dummy).id);
        assert_eq!(created.owner, "dummy");
        assert_eq!(created.date_created, created.date_updated);
        assert_eq!(created.tag_names(), vec!["rust"]);

        let fetched = f.bookmarks.get_bookmark(&f.dummy, created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn anonymous_cannot_create() {
        let f = fixture().await;
        let err = f
            .bookmarks
            .create_bookmark(&Viewer::Anonymous, request("x", true, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn invalid_input_does_not_persist() {
        let f = fixture().await;
        let mut bad = request("bad", true, &[]);
        bad.url = "not a url".to_string();
        assert!(matches!(
            f.bookmarks.create_bookmark(&f.dummy, bad).await.unwrap_err(),
            AppError::ValidatorError(_)
        ));

        let unknown_tag = request("tagged", true, &["missing"]);
        assert!(f.bookmarks.create_bookmark(&f.dummy, unknown_tag).await.is_err());

        let page = f
            .bookmarks
            .list_bookmarks(&f.admin, &BookmarkFilter::default(), 1, 20)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn edit_keeps_created_and_advances_updated() {
        let f = fixture().await;
        let created = f
            .bookmarks
            .create_bookmark(&f.dummy, request("before", true, &["rust"]))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let updated = f
            .bookmarks
            .update_bookmark(
                &f.dummy,
                created.id,
                UpdateBookmarkRequest {
                    title: Some("after".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "after");
        assert_eq!(updated.url, created.url);
        assert_eq!(updated.tags, created.tags);
        assert_eq!(updated.owner_id, created.owner_id);
        assert_eq!(updated.date_created, created.date_created);
        assert!(updated.date_updated > created.date_updated);
    }

    #[tokio::test]
    async fn only_owner_or_superuser_can_write() {
        let f = fixture().await;
        let public = f
            .bookmarks
            .create_bookmark(&f.dummy, request("public", true, &[]))
            .await
            .unwrap();

        let change = UpdateBookmarkRequest {
            title: Some("hijacked".to_string()),
            ..Default::default()
        };

        for intruder in [&Viewer::Anonymous, &f.other] {
            assert!(matches!(
                f.bookmarks
                    .update_bookmark(intruder, public.id, change.clone())
                    .await
                    .unwrap_err(),
                AppError::Authorization(_)
            ));
            assert!(matches!(
                f.bookmarks.delete_bookmark(intruder, public.id).await.unwrap_err(),
                AppError::Authorization(_)
            ));
        }

        let by_admin = f
            .bookmarks
            .update_bookmark(&f.admin, public.id, change)
            .await
            .unwrap();
        assert_eq!(by_admin.title, "hijacked");
        assert_eq!(by_admin.owner, "dummy");

        f.bookmarks.delete_bookmark(&f.admin, public.id).await.unwrap();
        assert!(matches!(
            f.bookmarks.get_bookmark(&f.admin, public.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn private_bookmarks_are_forbidden_to_others() {
        let f = fixture().await;
        let private = f
            .bookmarks
            .create_bookmark(&f.dummy, request("secret", false, &[]))
            .await
            .unwrap();

        assert!(f.bookmarks.get_bookmark(&f.dummy, private.id).await.is_ok());
        assert!(f.bookmarks.get_bookmark(&f.admin, private.id).await.is_ok());
        for outsider in [&Viewer::Anonymous, &f.other] {
            assert!(matches!(
                f.bookmarks.get_bookmark(outsider, private.id).await.unwrap_err(),
                AppError::Authorization(_)
            ));
        }
        assert!(matches!(
            f.bookmarks.get_bookmark(&f.other, 9999).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn listing_respects_scope_and_orders_newest_first() {
        let f = fixture().await;
        for (viewer, title, public) in [
            (&f.dummy, "dummy-public", true),
            (&f.dummy, "dummy-private", false),
            (&f.other, "other-public", true),
            (&f.other, "other-private", false),
        ] {
            f.bookmarks
                .create_bookmark(viewer, request(title, public, &[]))
                .await
                .unwrap();
        }

        let all = BookmarkFilter::default();
        let anonymous = f.bookmarks.list_bookmarks(&Viewer::Anonymous, &all, 1, 20).await.unwrap();
        assert_eq!(titles(&anonymous), vec!["other-public", "dummy-public"]);

        let dummy = f.bookmarks.list_bookmarks(&f.dummy, &all, 1, 20).await.unwrap();
        assert_eq!(titles(&dummy), vec!["other-public", "dummy-private", "dummy-public"]);

        let admin = f.bookmarks.list_bookmarks(&f.admin, &all, 1, 20).await.unwrap();
        assert_eq!(admin.total, 4);
    }

    #[tokio::test]
    async fn owner_listing_depends_on_viewer() {
        let f = fixture().await;
        f.bookmarks.create_bookmark(&f.dummy, request("a", true, &[])).await.unwrap();
        f.bookmarks.create_bookmark(&f.dummy, request("b", false, &[])).await.unwrap();
        f.bookmarks.create_bookmark(&f.other, request("c", true, &[])).await.unwrap();

        let dummy_id = owner(&f.dummy).id;
        let all = BookmarkFilter::default();

        let own = f.bookmarks.list_for_owner(&f.dummy, dummy_id, &all, 1, 20).await.unwrap();
        assert_eq!(titles(&own), vec!["b", "a"]);

        let seen_by_other = f.bookmarks.list_for_owner(&f.other, dummy_id, &all, 1, 20).await.unwrap();
        assert_eq!(titles(&seen_by_other), vec!["a"]);

        let seen_by_admin = f.bookmarks.all_for_owner(&f.admin, dummy_id).await.unwrap();
        assert_eq!(seen_by_admin.len(), 2);
    }

    #[tokio::test]
    async fn tag_filter_returns_exactly_tagged() {
        let f = fixture().await;
        f.bookmarks.create_bookmark(&f.dummy, request("one", true, &["testtag"])).await.unwrap();
        f.bookmarks
            .create_bookmark(&f.dummy, request("two", true, &["testtag", "rust"]))
            .await
            .unwrap();
        f.bookmarks.create_bookmark(&f.dummy, request("three", true, &["rust"])).await.unwrap();
        f.bookmarks.create_bookmark(&f.dummy, request("four", true, &[])).await.unwrap();

        let filter = BookmarkFilter::default().with_tag("testtag");
        let page = f.bookmarks.list_bookmarks(&Viewer::Anonymous, &filter, 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["two", "one"]);
        assert!(page.items.iter().all(|b| b.has_tag("testtag")));

        let none = BookmarkFilter::default().with_tag("missing");
        assert_eq!(
            f.bookmarks.list_bookmarks(&Viewer::Anonymous, &none, 1, 20).await.unwrap().total,
            0
        );
    }

    #[tokio::test]
    async fn search_matches_title_url_and_description() {
        let f = fixture().await;
        let mut by_desc = request("alpha", true, &[]);
        by_desc.description = Some("Fearless Concurrency".to_string());
        f.bookmarks.create_bookmark(&f.dummy, by_desc).await.unwrap();

        let mut by_url = request("beta", true, &[]);
        by_url.url = "https://docs.rs/tokio".to_string();
        f.bookmarks.create_bookmark(&f.dummy, by_url).await.unwrap();

        f.bookmarks.create_bookmark(&f.dummy, request("gamma_100%", true, &[])).await.unwrap();

        let search = |term: &str| BookmarkFilter::default().with_search(term);

        let page = f.bookmarks.list_bookmarks(&f.dummy, &search("concurrency"), 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["alpha"]);

        let page = f.bookmarks.list_bookmarks(&f.dummy, &search("DOCS.RS"), 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["beta"]);

        // every term must match somewhere
        let page = f.bookmarks.list_bookmarks(&f.dummy, &search("alpha fearless"), 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["alpha"]);
        let page = f.bookmarks.list_bookmarks(&f.dummy, &search("alpha tokio"), 1, 20).await.unwrap();
        assert!(page.items.is_empty());

        // wildcards are literal
        let page = f.bookmarks.list_bookmarks(&f.dummy, &search("_100%"), 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["gamma_100%"]);
        let page = f.bookmarks.list_bookmarks(&f.dummy, &search("%"), 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["gamma_100%"]);
    }

    #[tokio::test]
    async fn date_ranges_are_inclusive_bounds() {
        let f = fixture().await;
        let first = f.bookmarks.create_bookmark(&f.dummy, request("first", true, &[])).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = f.bookmarks.create_bookmark(&f.dummy, request("second", true, &[])).await.unwrap();

        let filter = BookmarkFilter {
            date_created_after: Some(second.date_created),
            ..Default::default()
        };
        let page = f.bookmarks.list_bookmarks(&f.dummy, &filter, 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["second"]);

        let filter = BookmarkFilter {
            date_created_before: Some(first.date_created),
            ..Default::default()
        };
        let page = f.bookmarks.list_bookmarks(&f.dummy, &filter, 1, 20).await.unwrap();
        assert_eq!(titles(&page), vec!["first"]);

        let filter = BookmarkFilter {
            date_updated_after: Some(Utc::now() + Duration::days(1)),
            ..Default::default()
        };
        assert!(f.bookmarks.list_bookmarks(&f.dummy, &filter, 1, 20).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn pagination_windows_results() {
        let f = fixture().await;
        for i in 0..5 {
            f.bookmarks
                .create_bookmark(&f.dummy, request(&format!("b{}", i), true, &[]))
                .await
                .unwrap();
        }

        let all = BookmarkFilter::default();
        let first = f.bookmarks.list_bookmarks(&f.dummy, &all, 1, 2).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages, 3);
        assert_eq!(titles(&first), vec!["b4", "b3"]);

        let last = f.bookmarks.list_bookmarks(&f.dummy, &all, 3, 2).await.unwrap();
        assert_eq!(titles(&last), vec!["b0"]);
    }

    #[tokio::test]
    async fn deleting_a_tag_unlinks_it() {
        let f = fixture().await;
        let tagged = f
            .bookmarks
            .create_bookmark(&f.dummy, request("tagged", true, &["rust", "testtag"]))
            .await
            .unwrap();

        let rust = f.bookmarks.tags.get_by_name("rust").await.unwrap().unwrap();
        f.bookmarks.tags.delete_tag(&f.admin, rust.id).await.unwrap();

        let reloaded = f.bookmarks.get_bookmark(&f.dummy, tagged.id).await.unwrap();
        assert_eq!(reloaded.tag_names(), vec!["testtag"]);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn page_offset_rejects_unaddressable_pages() {
        assert_eq!(page_offset(1, 20), Some(0));
        assert_eq!(page_offset(3, 2), Some(4));
        assert_eq!(page_offset(usize::MAX, 20), None);
        assert_eq!(page_offset(i64::MAX as usize / 2 + 2, 2), None);
    }
}
