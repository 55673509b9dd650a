// ==========================================
// 商品批量导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::path::PathBuf;
use std::time::Duration;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 执行器 / 仓储 / CLI 读取配置
// 实现者: ConfigManager（TOML + 环境变量）
pub trait ImportConfigReader: Send + Sync {
    // ===== 远端连接 =====

    /// 获取商品服务基础 URL
    ///
    /// # 默认值
    /// - http://localhost:3000/api
    fn get_api_base_url(&self) -> String;

    /// 获取 Bearer Token（未配置时不发送 Authorization 头）
    ///
    /// # 默认值
    /// - None
    fn get_api_token(&self) -> Option<String>;

    /// 获取单次请求超时
    ///
    /// # 返回
    /// - None: 不设置超时（由传输层决定）
    ///
    /// # 默认值
    /// - None
    fn get_request_timeout(&self) -> Option<Duration>;

    // ===== 重试策略 =====

    /// 获取每行最大尝试次数（含首次）
    ///
    /// # 默认值
    /// - 3
    fn get_max_attempts(&self) -> u32;

    /// 获取线性退避步长（第 i 次失败后等待 step × i）
    ///
    /// # 默认值
    /// - 1000 ms
    fn get_backoff_step(&self) -> Duration;

    // ===== 展示 =====

    /// 获取消息语言
    ///
    /// # 默认值
    /// - es
    fn get_locale(&self) -> String;

    /// 获取模板 / 错误报告输出目录
    ///
    /// # 默认值
    /// - 当前工作目录
    fn get_output_dir(&self) -> PathBuf;
}
