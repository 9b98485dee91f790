// ==========================================
// 骑手周结算系统 - 骑手标识识别
// ==========================================
// 职责: 判断单元格是否为骑手标识，并规范化
// 规则: 按声明顺序逐条尝试，首条命中即返回
//   A: 任意前缀 + 末尾 4 位数字（手机号后四位）
//   B: 同 A，但允许前缀与数字之间有一个空白 / '-' / '_'
//   C: 兜底，长度 2..=20 的任意字符串
// ==========================================

use crate::domain::record::CellValue;
use regex::Regex;

/// 兜底规则的长度上下限（按字符计）
pub const FALLBACK_MIN_LEN: usize = 2;
pub const FALLBACK_MAX_LEN: usize = 20;

// ==========================================
// IdentifierExtractor Trait
// ==========================================
// 实现者: RiderIdExtractor
pub trait IdentifierExtractor: Send + Sync {
    /// 识别骑手标识
    ///
    /// # 返回
    /// - Some(id): 规范化后的标识
    /// - None: 非标识单元格（表头 / 空行 / 合计行等）
    fn extract(&self, raw: &CellValue) -> Option<String>;
}

// ==========================================
// IdRule - 单条识别规则
// ==========================================
#[derive(Debug, Clone)]
pub enum IdRule {
    /// 前缀 + 末尾数字，结果 = 去尾部空白的前缀 + 数字
    DigitSuffix { name: &'static str, pattern: Regex },
    /// 长度区间兜底，结果 = 原字符串
    Length { min: usize, max: usize },
}

impl IdRule {
    pub fn name(&self) -> &'static str {
        match self {
            IdRule::DigitSuffix { name, .. } => name,
            IdRule::Length { .. } => "C",
        }
    }

    fn apply(&self, text: &str) -> Option<String> {
        match self {
            IdRule::DigitSuffix { pattern, .. } => {
                let caps = pattern.captures(text)?;
                let prefix = caps.get(1)?.as_str().trim_end();
                let digits = caps.get(2)?.as_str();
                if prefix.is_empty() {
                    return None;
                }
                Some(format!("{}{}", prefix, digits))
            }
            IdRule::Length { min, max } => {
                let len = text.chars().count();
                (len >= *min && len <= *max).then(|| text.to_string())
            }
        }
    }
}

// ==========================================
// RiderIdExtractor - 默认规则集
// ==========================================
#[derive(Debug, Clone)]
pub struct RiderIdExtractor {
    rules: Vec<IdRule>,
}

impl RiderIdExtractor {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// 自定义规则集（仍按顺序匹配）
    pub fn with_rules(rules: Vec<IdRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IdRule] {
        &self.rules
    }

    /// 识别并返回命中的规则名（日志用）
    pub fn extract_with_rule(&self, raw: &CellValue) -> Option<(String, &'static str)> {
        let text = raw.to_text();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find_map(|rule| rule.apply(text).map(|id| (id, rule.name())))
    }
}

impl Default for RiderIdExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierExtractor for RiderIdExtractor {
    fn extract(&self, raw: &CellValue) -> Option<String> {
        self.extract_with_rule(raw).map(|(id, _)| id)
    }
}

fn default_rules() -> Vec<IdRule> {
    // 模式为编译期常量，构造失败的规则直接丢弃
    let suffix = |name: &'static str, pattern: &str| {
        Regex::new(pattern)
            .ok()
            .map(|pattern| IdRule::DigitSuffix { name, pattern })
    };

    let mut rules: Vec<IdRule> = [
        suffix("A", r"^(.+?)([0-9]{4})$"),
        suffix("B", r"^(.+?)[\s\-_]?([0-9]{4})$"),
    ]
    .into_iter()
    .flatten()
    .collect();
    rules.push(IdRule::Length {
        min: FALLBACK_MIN_LEN,
        max: FALLBACK_MAX_LEN,
    });
    rules
}
