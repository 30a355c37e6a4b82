//! Per-absolute-path exclusive locking so two concurrently-scheduled edits
//! to the same file serialize instead of racing. Grounded verbatim on the
//! teacher's `steer-workspace::local::workspace` `FILE_LOCKS` pattern: a
//! process-wide map from path to a per-path `Mutex<()>`, held only long
//! enough to hand out a guard.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

static FILE_LOCKS: LazyLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Acquire the exclusive lock for `path`, creating its entry if this is the
/// first contender. The returned guard holds the lock until dropped.
pub async fn lock_path(path: &Path) -> OwnedMutexGuard<()> {
    let key = path.display().to_string();
    let per_path = {
        let mut locks = FILE_LOCKS.lock().await;
        locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    };
    per_path.lock_owned().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    #[tokio::test]
    async fn concurrent_lockers_on_the_same_path_serialize() {
        let path = PathBuf::from("/tmp/orchestra-path-lock-test");
        let concurrent = StdArc::new(AtomicUsize::new(0));
        let max_concurrent = StdArc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let path = path.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                let _guard = lock_path(&path).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_paths_do_not_contend() {
        let a = lock_path(Path::new("/tmp/orchestra-path-lock-a")).await;
        let b = lock_path(Path::new("/tmp/orchestra-path-lock-b")).await;
        drop(a);
        drop(b);
    }
}
