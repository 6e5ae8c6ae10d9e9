//! Association loading and synchronization
//!
//! Generated update operations call the `prune_*` helpers before the parent
//! row is saved and the `save_*` helpers after it, with the mutation strategy
//! fixed at generation time.

use tracing::{debug, trace};

use crate::context::Context;
use crate::error::PersistError;
use crate::query::{Condition, Query};
use crate::record::{PrimaryKey, Record, Value};
use crate::store::Store;

/// How an update of the parent treats an associated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStrategy {
    /// Delete every linked child, then store the provided ones.
    #[default]
    Default,
    /// Store the provided children and delete linked children not among them.
    Replace,
    /// Store the provided children and delete nothing.
    Append,
    /// Delete every linked child and ignore the provided ones.
    Clear,
}

/// Delete the has-many children of `parent_key` that `strategy` removes.
///
/// `keep` holds the children provided with the update. Only
/// [`MutationStrategy::Replace`] looks at it.
pub async fn prune_children<S, C>(
    ctx: &Context,
    store: &S,
    strategy: MutationStrategy,
    foreign_key: &'static str,
    parent_key: Value,
    keep: &[C],
) -> Result<u64, PersistError>
where
    S: Store,
    C: Record,
{
    let linked = Query::<C>::new().filter(Condition::Eq(foreign_key.to_string(), parent_key));
    let query = match strategy {
        MutationStrategy::Append => return Ok(0),
        MutationStrategy::Default | MutationStrategy::Clear => linked,
        MutationStrategy::Replace => {
            let kept: Vec<Value> = keep
                .iter()
                .filter(|child| !child.key_is_empty())
                .map(|child| child.primary_key().to_value())
                .collect();
            if kept.is_empty() {
                linked
            } else {
                linked.filter(Condition::not_in(C::PRIMARY_KEY, kept))
            }
        }
    };
    let removed = store.delete(ctx, &query).await?;
    debug!(table = C::TABLE_NAME, ?strategy, removed, "pruned children");
    Ok(removed)
}

/// Link and store the provided has-many children.
///
/// `attach` points each child at its parent before it is saved.
pub async fn save_children<S, C, F>(
    ctx: &Context,
    store: &S,
    strategy: MutationStrategy,
    children: &mut [C],
    attach: F,
) -> Result<(), PersistError>
where
    S: Store,
    C: Record,
    F: Fn(&mut C),
{
    if strategy == MutationStrategy::Clear {
        return Ok(());
    }
    for child in children.iter_mut() {
        attach(child);
        store.save(ctx, child).await?;
    }
    trace!(table = C::TABLE_NAME, count = children.len(), "saved children");
    Ok(())
}

/// Delete the join rows of `owner_key` that `strategy` removes.
pub async fn prune_links<S, J>(
    ctx: &Context,
    store: &S,
    strategy: MutationStrategy,
    owner_column: &'static str,
    owner_key: Value,
) -> Result<u64, PersistError>
where
    S: Store,
    J: Record,
{
    if strategy == MutationStrategy::Append {
        return Ok(0);
    }
    let query = Query::<J>::new().filter(Condition::Eq(owner_column.to_string(), owner_key));
    let removed = store.delete(ctx, &query).await?;
    debug!(table = J::TABLE_NAME, ?strategy, removed, "pruned links");
    Ok(removed)
}

/// Store the provided many-to-many targets and link each one to its owner.
///
/// A link that already exists is left alone, which also keeps duplicate
/// targets in one update from violating the join key.
pub async fn save_links<S, T, J, F>(
    ctx: &Context,
    store: &S,
    strategy: MutationStrategy,
    targets: &mut [T],
    link: F,
) -> Result<(), PersistError>
where
    S: Store,
    T: Record,
    J: Record,
    F: Fn(&T) -> J,
{
    if strategy == MutationStrategy::Clear {
        return Ok(());
    }
    for target in targets.iter_mut() {
        store.save(ctx, target).await?;
        let mut join = link(target);
        let mut existing = Query::<J>::new();
        for column in J::COLUMNS {
            let value = join.column(column).unwrap_or(Value::Null);
            existing = existing.filter(Condition::Eq((*column).to_string(), value));
        }
        if store.count(ctx, &existing).await? == 0 {
            store.create(ctx, &mut join).await?;
        }
    }
    trace!(table = J::TABLE_NAME, count = targets.len(), "saved links");
    Ok(())
}

/// The record with primary key `key`, if any.
pub async fn load_one<S, T>(ctx: &Context, store: &S, key: Value) -> Result<Option<T>, PersistError>
where
    S: Store,
    T: Record,
{
    let query = Query::<T>::new().filter(Condition::Eq(T::PRIMARY_KEY.to_string(), key));
    store.first(ctx, &query).await
}

/// The has-many children of `parent_key`, ordered by their primary key.
pub async fn load_children<S, C>(
    ctx: &Context,
    store: &S,
    foreign_key: &'static str,
    parent_key: Value,
) -> Result<Vec<C>, PersistError>
where
    S: Store,
    C: Record,
{
    let query = Query::<C>::new()
        .filter(Condition::Eq(foreign_key.to_string(), parent_key))
        .order_by(C::PRIMARY_KEY);
    store.find(ctx, &query).await
}

/// The many-to-many targets linked to `owner_key`, ordered by their primary key.
pub async fn load_linked<S, J, T>(
    ctx: &Context,
    store: &S,
    owner_column: &'static str,
    owner_key: Value,
    target_column: &'static str,
) -> Result<Vec<T>, PersistError>
where
    S: Store,
    J: Record,
    T: Record,
{
    let links = Query::<J>::new().filter(Condition::Eq(owner_column.to_string(), owner_key));
    let target_keys: Vec<Value> = store
        .find(ctx, &links)
        .await?
        .iter()
        .filter_map(|join| join.column(target_column))
        .collect();
    if target_keys.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::<T>::new()
        .filter(Condition::is_in(T::PRIMARY_KEY, target_keys))
        .order_by(T::PRIMARY_KEY);
    store.find(ctx, &query).await
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct PostRow {
        id: u64,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct NoteRow {
        id: u64,
        body: String,
        post_id: Option<u64>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct LabelRow {
        id: String,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct PostLabelRow {
        post_id: u64,
        label_id: String,
    }

    impl Record for PostRow {
        type Key = u64;
        const TABLE_NAME: &'static str = "posts";
        const PRIMARY_KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id"];

        fn primary_key(&self) -> u64 {
            self.id
        }

        fn set_primary_key(&mut self, key: u64) {
            self.id = key;
        }

        fn column(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::from(self.id)),
                _ => None,
            }
        }

        fn reset_column(&mut self, column: &str) -> bool {
            match column {
                "id" => self.id = Default::default(),
                _ => return false,
            }
            true
        }
    }

    impl Record for NoteRow {
        type Key = u64;
        const TABLE_NAME: &'static str = "notes";
        const PRIMARY_KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id", "body", "post_id"];

        fn primary_key(&self) -> u64 {
            self.id
        }

        fn set_primary_key(&mut self, key: u64) {
            self.id = key;
        }

        fn column(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::from(self.id)),
                "body" => Some(Value::from(self.body.clone())),
                "post_id" => Some(Value::from(self.post_id)),
                _ => None,
            }
        }

        fn reset_column(&mut self, column: &str) -> bool {
            match column {
                "id" => self.id = Default::default(),
                "body" => self.body = Default::default(),
                "post_id" => self.post_id = Default::default(),
                _ => return false,
            }
            true
        }
    }

    impl Record for LabelRow {
        type Key = String;
        const TABLE_NAME: &'static str = "labels";
        const PRIMARY_KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id"];

        fn primary_key(&self) -> String {
            self.id.clone()
        }

        fn set_primary_key(&mut self, key: String) {
            self.id = key;
        }

        fn column(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::from(self.id.clone())),
                _ => None,
            }
        }

        fn reset_column(&mut self, column: &str) -> bool {
            match column {
                "id" => self.id = Default::default(),
                _ => return false,
            }
            true
        }
    }

    impl Record for PostLabelRow {
        type Key = (u64, String);
        const TABLE_NAME: &'static str = "post_labels";
        const PRIMARY_KEY: &'static str = "post_id";
        const COLUMNS: &'static [&'static str] = &["post_id", "label_id"];

        fn primary_key(&self) -> (u64, String) {
            (self.post_id, self.label_id.clone())
        }

        fn set_primary_key(&mut self, key: (u64, String)) {
            self.post_id = key.0;
            self.label_id = key.1;
        }

        fn column(&self, column: &str) -> Option<Value> {
            match column {
                "post_id" => Some(Value::from(self.post_id)),
                "label_id" => Some(Value::from(self.label_id.clone())),
                _ => None,
            }
        }

        fn reset_column(&mut self, column: &str) -> bool {
            match column {
                "post_id" => self.post_id = Default::default(),
                "label_id" => self.label_id = Default::default(),
                _ => return false,
            }
            true
        }
    }

    fn note(id: u64, body: &str) -> NoteRow {
        NoteRow {
            id,
            body: body.to_string(),
            post_id: None,
        }
    }

    async fn seed(store: &MemoryStore, ctx: &Context) -> PostRow {
        let mut post = PostRow::default();
        store.create(ctx, &mut post).await.unwrap();
        let mut notes = vec![note(0, "first"), note(0, "second")];
        save_children(ctx, store, MutationStrategy::Default, &mut notes, |n: &mut NoteRow| {
            n.post_id = Some(post.id)
        })
        .await
        .unwrap();
        post
    }

    async fn bodies(store: &MemoryStore, ctx: &Context, post: &PostRow) -> Vec<String> {
        let notes: Vec<NoteRow> = load_children(ctx, store, "post_id", Value::from(post.id))
            .await
            .unwrap();
        notes.into_iter().map(|n| n.body).collect()
    }

    async fn sync(
        store: &MemoryStore,
        ctx: &Context,
        post: &PostRow,
        strategy: MutationStrategy,
        mut provided: Vec<NoteRow>,
    ) {
        prune_children(ctx, store, strategy, "post_id", Value::from(post.id), &provided)
            .await
            .unwrap();
        let post_id = post.id;
        save_children(ctx, store, strategy, &mut provided, |n: &mut NoteRow| {
            n.post_id = Some(post_id)
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_default_strategy_rewrites_children() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let post = seed(&store, &ctx).await;

        sync(&store, &ctx, &post, MutationStrategy::Default, vec![note(0, "third")]).await;
        assert_eq!(bodies(&store, &ctx, &post).await, vec!["third"]);
    }

    #[tokio::test]
    async fn test_replace_strategy_deletes_orphans() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let post = seed(&store, &ctx).await;
        let existing: Vec<NoteRow> = load_children(&ctx, &store, "post_id", Value::from(post.id))
            .await
            .unwrap();

        let mut kept = existing[0].clone();
        kept.body = "first, edited".into();
        sync(&store, &ctx, &post, MutationStrategy::Replace, vec![kept, note(0, "third")]).await;

        assert_eq!(
            bodies(&store, &ctx, &post).await,
            vec!["first, edited", "third"]
        );
    }

    #[tokio::test]
    async fn test_append_strategy_keeps_children() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let post = seed(&store, &ctx).await;

        sync(&store, &ctx, &post, MutationStrategy::Append, vec![note(0, "third")]).await;
        assert_eq!(
            bodies(&store, &ctx, &post).await,
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn test_clear_strategy_ignores_provided() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let post = seed(&store, &ctx).await;

        sync(&store, &ctx, &post, MutationStrategy::Clear, vec![note(0, "third")]).await;
        assert!(bodies(&store, &ctx, &post).await.is_empty());
    }

    #[tokio::test]
    async fn test_links_round_trip() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut post = PostRow::default();
        store.create(&ctx, &mut post).await.unwrap();
        let post_id = post.id;
        let link = |label: &LabelRow| PostLabelRow {
            post_id,
            label_id: label.id.clone(),
        };

        let mut labels = vec![
            LabelRow { id: "rust".into() },
            LabelRow { id: "db".into() },
            LabelRow { id: "rust".into() },
        ];
        save_links(&ctx, &store, MutationStrategy::Append, &mut labels, link)
            .await
            .unwrap();
        let linked: Vec<LabelRow> =
            load_linked::<_, PostLabelRow, _>(&ctx, &store, "post_id", Value::from(post_id), "label_id")
                .await
                .unwrap();
        assert_eq!(
            linked.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec!["db", "rust"]
        );

        prune_links::<_, PostLabelRow>(&ctx, &store, MutationStrategy::Replace, "post_id", Value::from(post_id))
            .await
            .unwrap();
        let mut labels = vec![LabelRow { id: "go".into() }];
        save_links(&ctx, &store, MutationStrategy::Replace, &mut labels, link)
            .await
            .unwrap();
        let linked: Vec<LabelRow> =
            load_linked::<_, PostLabelRow, _>(&ctx, &store, "post_id", Value::from(post_id), "label_id")
                .await
                .unwrap();
        assert_eq!(linked, vec![LabelRow { id: "go".into() }]);

        let label: Option<LabelRow> = load_one(&ctx, &store, Value::from("db")).await.unwrap();
        assert_eq!(label, Some(LabelRow { id: "db".into() }));
    }
}
