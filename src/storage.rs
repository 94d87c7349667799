use crate::Result;
use crate::config::StoreConfig;
use crate::game::{ChainState, Player};
use dashmap::DashMap;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, warn};

/// 订阅通道的缓冲大小
const SUBSCRIPTION_BUFFER: usize = 32;

/// 房间共享文档的读写与订阅
///
/// 写入是整体替换，不做乐观锁；并发写入的先后由存储本身决定。
/// 任何失败都以 `Error::Storage` 返回给调用方，由调用方提示玩家重试。
pub trait DocumentStore: Send + Sync {
    fn load_state(
        &self,
        room_code: &str,
    ) -> impl Future<Output = Result<Option<ChainState>>> + Send;

    fn save_state(
        &self,
        room_code: &str,
        state: &ChainState,
    ) -> impl Future<Output = Result<()>> + Send;

    /// 先推送当前状态（如果有），之后每次写入都会推送新状态
    fn subscribe(
        &self,
        room_code: &str,
    ) -> impl Future<Output = Result<mpsc::Receiver<ChainState>>> + Send;

    fn load_roster(&self, room_code: &str)
    -> impl Future<Output = Result<Option<Vec<Player>>>> + Send;

    fn save_roster(
        &self,
        room_code: &str,
        players: &[Player],
    ) -> impl Future<Output = Result<()>> + Send;
}

fn encode(value: &impl Serialize) -> Result<String> {
    serde_json::to_string(value).map_err(|e| crate::Error::Storage(e.to_string()))
}

fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| crate::Error::Storage(e.to_string()))
}

#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    manager: Arc<Mutex<ConnectionManager>>,
    key_prefix: String,
    state_ttl: u64,
}

impl RedisStore {
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| crate::Error::Storage(e.to_string()))?;
        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| crate::Error::Storage(e.to_string()))?;

        Ok(Self {
            client,
            manager: Arc::new(Mutex::new(manager)),
            key_prefix: config.key_prefix.clone(),
            state_ttl: config.state_ttl,
        })
    }

    fn state_key(&self, room_code: &str) -> String {
        format!("{}:room:{}:state", self.key_prefix, room_code)
    }

    fn roster_key(&self, room_code: &str) -> String {
        format!("{}:room:{}:roster", self.key_prefix, room_code)
    }

    fn updates_channel(&self, room_code: &str) -> String {
        format!("{}:room:{}:updates", self.key_prefix, room_code)
    }

    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.lock().await;
        conn.get(key)
            .await
            .map_err(|e| crate::Error::Storage(e.to_string()))
    }
}

impl DocumentStore for RedisStore {
    async fn load_state(&self, room_code: &str) -> Result<Option<ChainState>> {
        match self.get_json(&self.state_key(room_code)).await? {
            Some(json) => Ok(Some(decode(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_state(&self, room_code: &str, state: &ChainState) -> Result<()> {
        let key = self.state_key(room_code);
        let channel = self.updates_channel(room_code);
        let value = encode(state)?;

        let mut conn = self.manager.lock().await;
        // 写入与通知放在同一个事务里
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_ex(&key, &value, self.state_ttl)
            .ignore()
            .publish(&channel, &value)
            .ignore();

        let _: () = pipe
            .query_async(&mut *conn)
            .await
            .map_err(|e| crate::Error::Storage(e.to_string()))?;

        debug!("房间 {} 状态已写入 ({} 个单词)", room_code, state.chain.len());
        Ok(())
    }

    async fn subscribe(&self, room_code: &str) -> Result<mpsc::Receiver<ChainState>> {
        let channel = self.updates_channel(room_code);
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| crate::Error::Storage(e.to_string()))?;
        pubsub
            .subscribe(&channel)
            .await
            .map_err(|e| crate::Error::Storage(e.to_string()))?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        if let Some(current) = self.load_state(room_code).await? {
            let _ = tx.send(current).await;
        }

        let room_code = room_code.to_string();
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("房间 {} 的更新消息无法读取: {}", room_code, e);
                        continue;
                    }
                };

                match decode::<ChainState>(&payload) {
                    Ok(state) => {
                        if tx.send(state).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("房间 {} 的更新消息格式错误: {}", room_code, e),
                }
            }
            debug!("房间 {} 的订阅已结束", room_code);
        });

        Ok(rx)
    }

    async fn load_roster(&self, room_code: &str) -> Result<Option<Vec<Player>>> {
        match self.get_json(&self.roster_key(room_code)).await? {
            Some(json) => Ok(Some(decode(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_roster(&self, room_code: &str, players: &[Player]) -> Result<()> {
        let key = self.roster_key(room_code);
        let value = encode(&players)?;

        let mut conn = self.manager.lock().await;
        conn.set_ex::<_, _, ()>(&key, &value, self.state_ttl)
            .await
            .map_err(|e| crate::Error::Storage(e.to_string()))?;
        Ok(())
    }
}

/// 进程内存储，文档同样以 JSON 保存
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<String, String>>,
    updates: Arc<DashMap<String, broadcast::Sender<String>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储不可达，之后的读写都会失败
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(crate::Error::Storage("存储服务不可用".to_string()));
        }
        Ok(())
    }

    fn sender(&self, room_code: &str) -> broadcast::Sender<String> {
        self.updates
            .entry(room_code.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIPTION_BUFFER).0)
            .clone()
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.check_online()?;
        Ok(self.documents.get(key).map(|entry| entry.value().clone()))
    }

    fn write(&self, key: String, value: String) -> Result<()> {
        self.check_online()?;
        self.documents.insert(key, value);
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn load_state(&self, room_code: &str) -> Result<Option<ChainState>> {
        match self.read(&format!("{}:state", room_code))? {
            Some(json) => Ok(Some(decode(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_state(&self, room_code: &str, state: &ChainState) -> Result<()> {
        let value = encode(state)?;
        self.write(format!("{}:state", room_code), value.clone())?;
        // 没有订阅者时发送失败，忽略即可
        let _ = self.sender(room_code).send(value);
        Ok(())
    }

    async fn subscribe(&self, room_code: &str) -> Result<mpsc::Receiver<ChainState>> {
        let mut updates = self.sender(room_code).subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        if let Some(current) = self.load_state(room_code).await? {
            let _ = tx.send(current).await;
        }

        let room_code = room_code.to_string();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(json) => match decode::<ChainState>(&json) {
                        Ok(state) => {
                            if tx.send(state).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("房间 {} 的更新消息格式错误: {}", room_code, e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("房间 {} 的订阅落后，跳过 {} 条更新", room_code, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn load_roster(&self, room_code: &str) -> Result<Option<Vec<Player>>> {
        match self.read(&format!("{}:roster", room_code))? {
            Some(json) => Ok(Some(decode(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_roster(&self, room_code: &str, players: &[Player]) -> Result<()> {
        let value = encode(&players)?;
        self.write(format!("{}:roster", room_code), value)
    }
}
