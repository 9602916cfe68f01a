//! 配置单元存储
//!
//! 单个配置单元持有文件路径、已校验的缓存快照、加载标志和一把读写锁。
//! 缓存只会整体替换，读者看到的要么是旧快照要么是新快照

use crate::config::loader::{ensure_parent_dir, read_config_file, write_config_file};
use crate::config::types::{resolve_path, validate_config, FieldRule, UnitKind};
use crate::error::{ConfigError, ConfigFault};
use crate::json::{NativeMap, NativeValue};
use crate::logging::EventRecorder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// 受锁保护的单元状态
#[derive(Debug, Default)]
struct StoreState {
    /// 最近一次成功加载并校验的快照
    cache: Arc<NativeMap>,
    /// 是否处于已加载状态
    loaded: bool,
}

/// 配置单元
pub struct ConfigStore {
    /// 单元种类
    kind: UnitKind,
    /// 配置文件路径
    path: PathBuf,
    /// 校验规则
    schema: &'static [FieldRule],
    /// 缓存与加载标志
    state: RwLock<StoreState>,
    /// 事件记录器
    recorder: Arc<dyn EventRecorder>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl ConfigStore {
    /// 创建配置单元
    ///
    /// # 参数
    /// * `kind` - 单元种类，决定校验规则
    /// * `path` - 配置文件路径，所在目录不存在时会被创建
    /// * `recorder` - 事件记录器
    ///
    /// # 返回
    /// * `Result<Self, ConfigError>` - 目录创建失败时返回 `DirectoryCreation`
    pub fn new<P: AsRef<Path>>(
        kind: UnitKind,
        path: P,
        recorder: Arc<dyn EventRecorder>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();

        if let Err(e) = ensure_parent_dir(&path) {
            recorder.record(&Self::source_name(kind), "无法创建配置目录", &e.to_string());
            return Err(e);
        }

        Ok(Self {
            kind,
            path,
            schema: kind.schema(),
            state: RwLock::new(StoreState::default()),
            recorder,
        })
    }

    fn source_name(kind: UnitKind) -> String {
        format!("ConfigStore[{kind}]")
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        // 缓存只整体替换，锁中毒时数据仍是完整的
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 从文件加载配置
    ///
    /// IO或解析失败时保留原有缓存和加载标志；校验失败时保留原有缓存，
    /// 但加载标志被置为 false
    pub fn load(&self) -> Result<(), ConfigError> {
        let mut state = self.write_state();

        match self.read_and_validate() {
            Ok(config) => {
                state.cache = Arc::new(config);
                state.loaded = true;
                info!("配置单元 {} 加载成功: {}", self.kind, self.path.display());
                Ok(())
            }
            Err(cause) => {
                if matches!(cause, ConfigFault::Validation { .. }) {
                    state.loaded = false;
                }
                warn!("配置单元 {} 加载失败: {}", self.kind, cause);
                self.recorder.record(
                    &Self::source_name(self.kind),
                    "配置加载失败",
                    &cause.to_string(),
                );
                Err(ConfigError::Load {
                    unit: self.kind,
                    cause,
                })
            }
        }
    }

    /// 重新加载配置，语义与 `load` 相同
    pub fn reload(&self) -> Result<(), ConfigError> {
        debug!("重新加载配置单元 {}", self.kind);
        self.load()
    }

    fn read_and_validate(&self) -> Result<NativeMap, ConfigFault> {
        let config = read_config_file(&self.path)?;
        validate_config(&config, self.schema)?;
        Ok(config)
    }

    fn ensure_loaded(&self, state: &StoreState) -> Result<(), ConfigError> {
        if state.loaded {
            Ok(())
        } else {
            Err(ConfigError::NotLoaded { unit: self.kind })
        }
    }

    fn not_found(&self, key: &str) -> ConfigError {
        ConfigError::PropertyNotFound {
            unit: self.kind,
            key: key.to_string(),
        }
    }

    /// 获取顶层属性的原生值
    ///
    /// 不存在同名顶层键时，点分隔的键（如 `pool.max_size`）按嵌套路径解析
    pub fn value(&self, key: &str) -> Result<NativeValue, ConfigError> {
        let state = self.read_state();
        self.ensure_loaded(&state)?;

        state
            .cache
            .get(key)
            .or_else(|| {
                if key.contains('.') {
                    resolve_path(&state.cache, key)
                } else {
                    None
                }
            })
            .cloned()
            .ok_or_else(|| self.not_found(key))
    }

    /// 获取顶层属性的字符串形式
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        self.value(key).map(|value| value.to_string())
    }

    /// 获取嵌套映射中某个键的原生值
    pub fn nested_value(&self, section: &str, key: &str) -> Result<NativeValue, ConfigError> {
        let state = self.read_state();
        self.ensure_loaded(&state)?;

        state
            .cache
            .get(section)
            .and_then(NativeValue::as_map)
            .and_then(|nested| nested.get(key))
            .cloned()
            .ok_or_else(|| self.not_found(&format!("{section}.{key}")))
    }

    /// 获取嵌套映射中某个键的字符串形式
    pub fn get_nested(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.nested_value(section, key).map(|value| value.to_string())
    }

    /// 获取当前完整快照
    pub fn snapshot(&self) -> Result<Arc<NativeMap>, ConfigError> {
        let state = self.read_state();
        self.ensure_loaded(&state)?;
        Ok(Arc::clone(&state.cache))
    }

    /// 获取顶层属性的字符串形式，不可用时返回默认值
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|_| default.to_string())
    }

    /// 将整个缓存写回配置文件
    ///
    /// 要求已加载；写入前重新校验缓存
    pub fn save(&self) -> Result<(), ConfigError> {
        let state = self.write_state();
        self.ensure_loaded(&state)?;

        let result = validate_config(&state.cache, self.schema)
            .and_then(|_| write_config_file(&self.path, &state.cache));

        match result {
            Ok(()) => {
                info!("配置单元 {} 已保存: {}", self.kind, self.path.display());
                Ok(())
            }
            Err(cause) => {
                warn!("配置单元 {} 保存失败: {}", self.kind, cause);
                Err(ConfigError::Save {
                    unit: self.kind,
                    cause,
                })
            }
        }
    }

    /// 将单个顶层属性写回配置文件
    ///
    /// 读取当前文件内容、替换一个键、再整体写回。文件不可读或内容无效时
    /// 视为空对象
    pub fn save_property(&self, key: &str) -> Result<(), ConfigError> {
        let state = self.write_state();
        self.ensure_loaded(&state)?;

        let value = state
            .cache
            .get(key)
            .cloned()
            .ok_or_else(|| self.not_found(key))?;

        let mut on_disk = read_config_file(&self.path).unwrap_or_else(|e| {
            debug!("读取 {} 失败，按空配置处理: {}", self.path.display(), e);
            NativeMap::new()
        });
        on_disk.insert(key.to_string(), value);

        write_config_file(&self.path, &on_disk).map_err(|cause| ConfigError::Save {
            unit: self.kind,
            cause,
        })?;

        info!("配置单元 {} 的属性 {} 已保存", self.kind, key);
        Ok(())
    }

    /// 配置文件中是否存在某个顶层属性
    ///
    /// 直接读取文件而不是缓存，文件不可读或内容无效时返回 false
    pub fn has_property(&self, key: &str) -> bool {
        let _state = self.read_state();

        match read_config_file(&self.path) {
            Ok(on_disk) => on_disk.contains_key(key),
            Err(e) => {
                debug!("读取 {} 失败: {}", self.path.display(), e);
                false
            }
        }
    }

    /// 从配置文件中删除一个顶层属性
    ///
    /// # 参数
    /// * `key` - 顶层属性名
    ///
    /// # 返回
    /// * `Result<bool, ConfigError>` - 属性存在并已写回文件时为 true；
    ///   文件不可读、内容无效或属性不存在时为 false。缓存保持不变
    pub fn remove_property(&self, key: &str) -> Result<bool, ConfigError> {
        let _state = self.write_state();

        let mut on_disk = match read_config_file(&self.path) {
            Ok(on_disk) => on_disk,
            Err(e) => {
                debug!("读取 {} 失败，未删除属性 {}: {}", self.path.display(), key, e);
                return Ok(false);
            }
        };
        if on_disk.remove(key).is_none() {
            return Ok(false);
        }

        write_config_file(&self.path, &on_disk).map_err(|cause| ConfigError::Save {
            unit: self.kind,
            cause,
        })?;

        info!("配置单元 {} 的属性 {} 已从文件中删除", self.kind, key);
        Ok(true)
    }

    /// 是否已加载
    pub fn is_loaded(&self) -> bool {
        self.read_state().loaded
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 单元种类
    pub fn kind(&self) -> UnitKind {
        self.kind
    }
}
