//! Removal of precaches left behind by older cache-name schemes.

use swkit_cache::{CacheError, CacheStorage};
use tracing::info;

/// Marker present in every generated precache name.
pub const PRECACHE_NAME_MARKER: &str = "-precache-";

/// Delete every precache for `scope` except `current`. Returns the deleted
/// cache names.
pub async fn delete_outdated_caches(
    storage: &dyn CacheStorage,
    current: &str,
    scope: &str,
) -> Result<Vec<String>, CacheError> {
    let mut deleted = Vec::new();
    for name in storage.cache_names().await? {
        if name == current || !name.contains(PRECACHE_NAME_MARKER) || !name.contains(scope) {
            continue;
        }
        if storage.delete_cache(&name).await? {
            deleted.push(name);
        }
    }

    if !deleted.is_empty() {
        info!(caches = ?deleted, "Deleted outdated precaches");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swkit_cache::MemoryCacheStorage;

    const SCOPE: &str = "https://example.com/";

    #[tokio::test]
    async fn test_deletes_only_outdated_precaches() {
        let storage = MemoryCacheStorage::new();
        let current = format!("workbox-precache-v2-{SCOPE}");
        for name in [
            "workbox-precache-https://example.com/".to_string(),
            format!("workbox-precache-v1-{SCOPE}"),
            current.clone(),
            format!("workbox-runtime-{SCOPE}"),
            "workbox-precache-v1-https://other.example/".to_string(),
        ] {
            storage.open(&name).await.unwrap();
        }

        let deleted = delete_outdated_caches(&storage, &current, SCOPE).await.unwrap();
        assert_eq!(
            deleted,
            vec![
                "workbox-precache-https://example.com/".to_string(),
                format!("workbox-precache-v1-{SCOPE}"),
            ]
        );
        assert!(storage.has(&current).await.unwrap());
        assert!(storage.has(&format!("workbox-runtime-{SCOPE}")).await.unwrap());
        assert!(storage
            .has("workbox-precache-v1-https://other.example/")
            .await
            .unwrap());
    }
}
