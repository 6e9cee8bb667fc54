//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和常用缓存操作封装。

use crate::config::RedisConfig;
use crate::error::Result;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端
    ///
    /// 只解析连接地址，真正的连接在首次操作时建立
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    /// 设置值
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 删除值
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// 批量删除（按模式）
    #[instrument(skip(self))]
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.get_conn().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let count: u64 = conn.del(keys).await?;
        Ok(count)
    }
}

/// 缓存键生成器
///
/// 所有键集中定义，写操作按同一规则失效
pub struct CacheKey;

impl CacheKey {
    pub fn gang_detail(gang_id: &str) -> String {
        format!("gang:detail:{}", gang_id)
    }

    pub fn user_gangs(user_id: &str) -> String {
        format!("user:gangs:{}", user_id)
    }

    pub fn campaign_detail(campaign_id: &str) -> String {
        format!("campaign:detail:{}", campaign_id)
    }

    pub fn fighter_types(gang_type_id: &str) -> String {
        format!("catalog:fighter_types:{}", gang_type_id)
    }

    pub fn gang_types() -> String {
        "catalog:gang_types".to_string()
    }

    pub fn equipment_catalog() -> String {
        "catalog:equipment".to_string()
    }

    /// 目录类缓存的通配模式
    pub fn catalog_pattern() -> String {
        "catalog:*".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_generation() {
        assert_eq!(CacheKey::gang_detail("abc"), "gang:detail:abc");
        assert_eq!(CacheKey::user_gangs("u1"), "user:gangs:u1");
        assert_eq!(CacheKey::campaign_detail("c1"), "campaign:detail:c1");
        assert_eq!(CacheKey::fighter_types("g1"), "catalog:fighter_types:g1");
    }

    #[test]
    fn test_catalog_keys_match_catalog_pattern() {
        let prefix = CacheKey::catalog_pattern().trim_end_matches('*').to_string();
        assert!(CacheKey::equipment_catalog().starts_with(&prefix));
        assert!(CacheKey::fighter_types("x").starts_with(&prefix));
        assert!(CacheKey::gang_types().starts_with(&prefix));
        assert!(!CacheKey::gang_detail("x").starts_with(&prefix));
    }

    #[test]
    fn test_client_creation_is_lazy() {
        let cache = Cache::new(&RedisConfig::default());
        assert!(cache.is_ok());
    }
}
