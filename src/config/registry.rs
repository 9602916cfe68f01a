//! 配置注册表
//!
//! 持有通用、数据库、设备三个配置单元，按固定顺序加载、重载和关闭。
//! 注册表自身有一把读写锁保护 `initialized` 标志，逐个调用单元时
//! 不会同时持有两个单元的锁

use crate::config::loader::ConfigPaths;
use crate::config::store::ConfigStore;
use crate::config::types::UnitKind;
use crate::config::units::{DatabaseConfig, DeviceConfig, GeneralConfig};
use crate::error::ConfigError;
use crate::logging::EventRecorder;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info};

const SOURCE: &str = "ConfigRegistry";

/// 配置注册表
pub struct ConfigRegistry {
    /// 三个单元的文件路径
    paths: ConfigPaths,
    general: Arc<GeneralConfig>,
    database: Arc<DatabaseConfig>,
    device: Arc<DeviceConfig>,
    /// 是否已初始化
    initialized: RwLock<bool>,
    recorder: Arc<dyn EventRecorder>,
}

impl std::fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRegistry")
            .field("paths", &self.paths)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl ConfigRegistry {
    /// 创建配置注册表
    ///
    /// # 参数
    /// * `paths` - 三个配置单元的文件路径
    /// * `recorder` - 事件记录器，同时传给每个单元
    ///
    /// # 返回
    /// * `Result<Self, ConfigError>` - 任一单元目录无法创建时失败
    pub fn new(paths: ConfigPaths, recorder: Arc<dyn EventRecorder>) -> Result<Self, ConfigError> {
        let general = GeneralConfig::new(&paths.general, Arc::clone(&recorder))?;
        let database = DatabaseConfig::new(&paths.database, Arc::clone(&recorder))?;
        let device = DeviceConfig::new(&paths.device, Arc::clone(&recorder))?;

        Ok(Self {
            paths,
            general: Arc::new(general),
            database: Arc::new(database),
            device: Arc::new(device),
            initialized: RwLock::new(false),
            recorder,
        })
    }

    fn read_flag(&self) -> RwLockReadGuard<'_, bool> {
        self.initialized.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_flag(&self) -> RwLockWriteGuard<'_, bool> {
        self.initialized.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, kind: UnitKind) -> &ConfigStore {
        match kind {
            UnitKind::General => self.general.store(),
            UnitKind::Database => self.database.store(),
            UnitKind::Device => self.device.store(),
        }
    }

    fn load_in_order(&self, action: &str) -> Result<(), ConfigError> {
        for kind in UnitKind::LOAD_ORDER {
            if let Err(e) = self.store(kind).load() {
                error!("{}配置单元 {} 失败: {}", action, kind, e);
                self.recorder
                    .record(SOURCE, &format!("{action}配置单元 {kind} 失败"), &e.to_string());
                return Err(e);
            }
        }
        Ok(())
    }

    /// 初始化注册表，按 general → database → device 顺序加载
    ///
    /// 任一单元失败时注册表保持未初始化
    pub fn initialize(&self) -> Result<(), ConfigError> {
        let mut initialized = self.write_flag();
        if *initialized {
            return Err(ConfigError::AlreadyInitialized);
        }

        info!("初始化配置注册表");
        self.load_in_order("加载")?;

        *initialized = true;
        self.recorder.record(SOURCE, "配置注册表初始化完成", "");
        info!("配置注册表初始化完成");
        Ok(())
    }

    /// 按固定顺序重载全部单元
    ///
    /// 第一个失败直接返回，之前已重载的单元保持新状态
    pub fn reload_all(&self) -> Result<(), ConfigError> {
        let _initialized = self.require_initialized_mut()?;

        info!("重新加载全部配置单元");
        self.load_in_order("重载")?;

        self.recorder.record(SOURCE, "全部配置单元已重载", "");
        Ok(())
    }

    /// 重载单个配置单元
    pub fn reload_unit(&self, kind: UnitKind) -> Result<(), ConfigError> {
        let _initialized = self.require_initialized_mut()?;

        match self.store(kind).reload() {
            Ok(()) => {
                self.recorder
                    .record(SOURCE, &format!("配置单元 {kind} 已重载"), "");
                Ok(())
            }
            Err(e) => {
                self.recorder
                    .record(SOURCE, &format!("重载配置单元 {kind} 失败"), &e.to_string());
                Err(e)
            }
        }
    }

    /// 关闭注册表，单元缓存保持不变
    pub fn shutdown(&self) {
        let mut initialized = self.write_flag();
        *initialized = false;
        self.recorder.record(SOURCE, "配置注册表已关闭", "");
        info!("配置注册表已关闭");
    }

    fn require_initialized_mut(&self) -> Result<RwLockWriteGuard<'_, bool>, ConfigError> {
        let initialized = self.write_flag();
        if *initialized {
            Ok(initialized)
        } else {
            Err(ConfigError::NotInitialized)
        }
    }

    fn require_initialized(&self) -> Result<(), ConfigError> {
        if *self.read_flag() {
            Ok(())
        } else {
            Err(ConfigError::NotInitialized)
        }
    }

    /// 通用配置单元
    pub fn general(&self) -> Result<Arc<GeneralConfig>, ConfigError> {
        self.require_initialized()?;
        Ok(Arc::clone(&self.general))
    }

    /// 数据库配置单元
    pub fn database(&self) -> Result<Arc<DatabaseConfig>, ConfigError> {
        self.require_initialized()?;
        Ok(Arc::clone(&self.database))
    }

    /// 设备配置单元
    pub fn device(&self) -> Result<Arc<DeviceConfig>, ConfigError> {
        self.require_initialized()?;
        Ok(Arc::clone(&self.device))
    }

    /// 按种类取得单元的底层存储
    pub fn unit(&self, kind: UnitKind) -> Result<&ConfigStore, ConfigError> {
        self.require_initialized()?;
        Ok(self.store(kind))
    }

    pub fn is_initialized(&self) -> bool {
        *self.read_flag()
    }

    /// 已初始化且每个单元都处于已加载状态
    pub fn is_all_configurations_loaded(&self) -> bool {
        let initialized = self.read_flag();
        *initialized
            && UnitKind::LOAD_ORDER
                .iter()
                .all(|kind| self.store(*kind).is_loaded())
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// 根据文件路径找到对应的配置单元
    pub fn unit_for_path(&self, path: &Path) -> Option<UnitKind> {
        UnitKind::LOAD_ORDER
            .into_iter()
            .find(|kind| self.paths.for_unit(*kind) == path)
    }
}
