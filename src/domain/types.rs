// ==========================================
// 商品批量导入 - 领域类型定义
// ==========================================
// 职责: 导入模式、计价模式、行处理动作、运行阶段
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入模式 (Import Mode)
// ==========================================
// create: 新建商品（必填列校验 + SKU 去重）
// edit: 按 ID 更新已有商品
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    Create,
    Edit,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Create => write!(f, "create"),
            ImportMode::Edit => write!(f, "edit"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" | "crear" => Ok(ImportMode::Create),
            "edit" | "editar" => Ok(ImportMode::Edit),
            other => Err(format!("未知导入模式: {}（应为 create/edit）", other)),
        }
    }
}

// ==========================================
// 计价模式 (Pricing Mode)
// ==========================================
// 店铺级全局开关，决定 CSV 价格列写入哪个 API 字段
// 远端标记: 0 = 含税, 1 = 不含税
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    #[default]
    WithTax,
    WithoutTax,
}

impl PricingMode {
    /// 从远端 pricing_mode 标记转换（未知值按含税处理）
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            PricingMode::WithoutTax
        } else {
            PricingMode::WithTax
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingMode::WithTax => write!(f, "WITH_TAX"),
            PricingMode::WithoutTax => write!(f, "WITHOUT_TAX"),
        }
    }
}

// ==========================================
// 行处理动作 (Row Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Created,
    Updated,
    Skipped,
}

impl RowAction {
    /// 某模式下一次远端调用对应的动作
    pub fn for_mode(mode: ImportMode) -> Self {
        match mode {
            ImportMode::Create => RowAction::Created,
            ImportMode::Edit => RowAction::Updated,
        }
    }
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowAction::Created => write!(f, "created"),
            RowAction::Updated => write!(f, "updated"),
            RowAction::Skipped => write!(f, "skipped"),
        }
    }
}

// ==========================================
// 运行阶段 (Run Phase)
// ==========================================
// 状态机: Idle → Running ⇄ Paused → {Completed, Cancelled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl RunPhase {
    /// 是否处于活动运行中（含暂停）
    pub fn is_active(&self) -> bool {
        matches!(self, RunPhase::Running | RunPhase::Paused)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "IDLE"),
            RunPhase::Running => write!(f, "RUNNING"),
            RunPhase::Paused => write!(f, "PAUSED"),
            RunPhase::Completed => write!(f, "COMPLETED"),
            RunPhase::Cancelled => write!(f, "CANCELLED"),
        }
    }
}
