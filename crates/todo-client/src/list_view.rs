//! 一覧画面の状態管理
//!
//! 正となる状態はサーバー側のストアが持ち、ビューはその写しを保持するだけです。
//! 写しは再取得の結果で丸ごと置き換えるか、完了フラグの楽観的更新でのみ変化します。

use domain::{TodoId, TodoItem, TodoPatch};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::TodoApi;
use crate::error::ClientError;

/// 再取得の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 応答を一覧に反映した
    Applied,
    /// より新しい要求が発行済みのため破棄した（または要求自体を取りやめた）
    Superseded,
}

#[derive(Debug, Default)]
struct Snapshot {
    items: Vec<TodoItem>,
    filter: Option<String>,
}

/// 一覧画面のビューモデル
///
/// 全操作が `&self` で呼べるため、`Arc` で共有して複数の操作を並行に実行できる。
pub struct TodoListView<A> {
    api: A,
    debounce: Duration,
    snapshot: Mutex<Snapshot>,
    /// 最後に発行した一覧取得の通番
    latest_request: AtomicU64,
    /// 検索語の変更回数（デバウンス判定用）
    filter_edits: AtomicU64,
    /// 同一アイテムへのトグル操作を直列化するロック
    toggle_locks: Mutex<HashMap<TodoId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<A: TodoApi> TodoListView<A> {
    pub fn new(api: A, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            snapshot: Mutex::new(Snapshot::default()),
            latest_request: AtomicU64::new(0),
            filter_edits: AtomicU64::new(0),
            toggle_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// 現在表示中の一覧
    pub fn items(&self) -> Vec<TodoItem> {
        self.snapshot().items.clone()
    }

    pub fn item(&self, id: &TodoId) -> Option<TodoItem> {
        self.snapshot().items.iter().find(|t| &t.id == id).cloned()
    }

    /// 現在の検索語
    pub fn filter(&self) -> Option<String> {
        self.snapshot().filter.clone()
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 現在の検索語で一覧を再取得する（画面復帰時など）
    ///
    /// 各要求には単調増加の通番を付け、最新の要求に対する応答のみ反映する。
    pub async fn refresh(&self) -> Result<RefreshOutcome, ClientError> {
        let seq = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = self.filter();
        debug!(seq, filter = ?filter, "refreshing todo list");

        let result = self.api.list(filter.as_deref()).await;

        if self.latest_request.load(Ordering::SeqCst) != seq {
            debug!(seq, "discarding stale list response");
            return Ok(RefreshOutcome::Superseded);
        }

        let items = result.map_err(|e| {
            warn!(seq, error = %e, "failed to refresh todo list");
            e
        })?;
        self.snapshot().items = items;
        Ok(RefreshOutcome::Applied)
    }

    /// 検索語を変更し、入力が落ち着いてから再取得する
    ///
    /// 待機中に次の変更が来た場合は要求を出さずに `Superseded` を返す。
    pub async fn set_filter(&self, filter: impl Into<String>) -> Result<RefreshOutcome, ClientError> {
        let filter = filter.into();
        let edit = self.filter_edits.fetch_add(1, Ordering::SeqCst) + 1;
        self.snapshot().filter = Some(filter).filter(|f| !f.trim().is_empty());

        tokio::time::sleep(self.debounce).await;

        if self.filter_edits.load(Ordering::SeqCst) != edit {
            return Ok(RefreshOutcome::Superseded);
        }
        self.refresh().await
    }

    /// 完了フラグを反転する
    ///
    /// 一覧の写しを先に書き換え、サーバーへの更新が失敗したら元に戻す。
    /// 同じアイテムへのトグルは前の操作の完了を待ってから実行する。
    pub async fn toggle_completed(&self, id: &TodoId) -> Result<TodoItem, ClientError> {
        let lock = self.toggle_lock(id);
        let _serialized = lock.lock().await;

        let previous = {
            let mut snapshot = self.snapshot();
            let item = snapshot
                .items
                .iter_mut()
                .find(|t| &t.id == id)
                .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
            let previous = item.clone();
            item.is_completed = !item.is_completed;
            previous
        };

        match self
            .api
            .update(id, TodoPatch::completed(!previous.is_completed))
            .await
        {
            Ok(updated) => {
                self.replace_item(updated.clone());
                Ok(updated)
            }
            Err(e) => {
                warn!(todo_id = %id, error = %e, "toggle failed; rolling back");
                self.rollback_completed(id, previous.is_completed);
                Err(e)
            }
        }
    }

    /// 完了フラグのみを元に戻す
    ///
    /// 待機中の再取得で他のフィールドが新しくなっている場合があるため、
    /// アイテム全体は差し戻さない。写しが楽観値のままのときだけ戻す。
    fn rollback_completed(&self, id: &TodoId, was_completed: bool) {
        let mut snapshot = self.snapshot();
        if let Some(item) = snapshot.items.iter_mut().find(|t| &t.id == id) {
            if item.is_completed != was_completed {
                item.is_completed = was_completed;
            }
        }
    }

    fn replace_item(&self, item: TodoItem) {
        let mut snapshot = self.snapshot();
        if let Some(slot) = snapshot.items.iter_mut().find(|t| t.id == item.id) {
            *slot = item;
        }
    }

    fn toggle_lock(&self, id: &TodoId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .toggle_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // 誰も使っていないロックはここで掃除する
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(id.clone()).or_default().clone()
    }
}
