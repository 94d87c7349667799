use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub room: RoomConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key_prefix: String,
    /// 房间状态的过期时间（秒）
    pub state_ttl: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomConfig {
    pub min_players: usize,
    pub max_players: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl Config {
    /// 读取 config.toml（可选）以及 WORDCHAIN__ 前缀的环境变量
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .set_default("store.url", "redis://127.0.0.1:6379")?
            .set_default("store.key_prefix", "wordchain")?
            .set_default("store.state_ttl", 86_400_i64)?
            .set_default("room.min_players", 2_i64)?
            .set_default("room.max_players", 5_i64)?
            .set_default("log.level", "info")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("WORDCHAIN").separator("__"))
            .build()?;

        let config = config.try_deserialize::<Config>()?;
        if config.room.min_players == 0 || config.room.min_players > config.room.max_players {
            anyhow::bail!(
                "房间人数配置无效: min_players={} max_players={}",
                config.room.min_players,
                config.room.max_players
            );
        }
        Ok(config)
    }

    /// 初始化全局配置
    pub fn init() -> Result<()> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| anyhow::anyhow!("配置已经初始化"))?;
        Ok(())
    }

    /// 获取全局配置实例
    pub fn get() -> &'static Config {
        CONFIG.get().expect("配置未初始化，请先调用 Config::init()")
    }

    pub fn log_filter(&self) -> String {
        format!("word_chain={},wordchain={}", self.log.level, self.log.level)
    }
}
