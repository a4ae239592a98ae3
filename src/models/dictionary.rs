//! 字典文档模型
//!
//! 两种字典（修正规则库 / 保护词库）共用一套保存流程，
//! 通过 [`DictionaryKind`] 区分，通过 [`Dictionary`] trait 参数化。

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 新建术语时的默认分类
pub const DEFAULT_TERM_CATEGORY: &str = "术语映射";

/// 字典种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryKind {
    Correction,
    Shielding,
}

impl DictionaryKind {
    /// 对应的接口路径片段
    pub fn as_path(self) -> &'static str {
        match self {
            DictionaryKind::Correction => "correction",
            DictionaryKind::Shielding => "shielding",
        }
    }
}

impl fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictionaryKind::Correction => write!(f, "修正规则库"),
            DictionaryKind::Shielding => write!(f, "保护词库"),
        }
    }
}

/// 可被自动保存的字典内容
pub trait Dictionary:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Default + Send + Sync + 'static
{
    const KIND: DictionaryKind;

    /// 字典中的条目数
    fn entry_count(&self) -> usize;
}

/// 一条术语修正规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionTerm {
    pub source: String,
    pub target: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_TERM_CATEGORY.to_string()
}

impl CorrectionTerm {
    /// 创建并校验术语，原文和修正会去掉首尾空白
    pub fn new(
        source: &str,
        target: &str,
        category: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let source = source.trim();
        let target = target.trim();
        if source.is_empty() || target.is_empty() {
            return Err(ValidationError::EmptyTerm);
        }
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_TERM_CATEGORY);
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            category: category.to_string(),
        })
    }

    fn matches(&self, needle: &str) -> bool {
        self.source.to_lowercase().contains(needle)
            || self.target.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
    }
}

/// 修正规则库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorrectionDictionary {
    pub terms: Vec<CorrectionTerm>,
    pub noise_patterns: Vec<String>,
}

impl Dictionary for CorrectionDictionary {
    const KIND: DictionaryKind = DictionaryKind::Correction;

    fn entry_count(&self) -> usize {
        self.terms.len()
    }
}

impl CorrectionDictionary {
    pub fn add_term(&mut self, term: CorrectionTerm) {
        self.terms.push(term);
    }

    pub fn update_term(&mut self, index: usize, term: CorrectionTerm) -> Result<(), ValidationError> {
        let len = self.terms.len();
        let slot = self
            .terms
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfRange { index, len })?;
        *slot = term;
        Ok(())
    }

    pub fn remove_term(&mut self, index: usize) -> Result<CorrectionTerm, ValidationError> {
        if index >= self.terms.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.terms.len(),
            });
        }
        Ok(self.terms.remove(index))
    }

    /// 添加噪音规则，规则必须是合法的正则表达式
    pub fn add_noise_pattern(&mut self, pattern: &str) -> Result<(), ValidationError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ValidationError::InvalidNoisePattern {
                pattern: String::new(),
                reason: "规则为空".to_string(),
            });
        }
        regex::Regex::new(pattern).map_err(|e| ValidationError::InvalidNoisePattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.noise_patterns.push(pattern.to_string());
        Ok(())
    }

    pub fn remove_noise_pattern(&mut self, index: usize) -> Result<String, ValidationError> {
        if index >= self.noise_patterns.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.noise_patterns.len(),
            });
        }
        Ok(self.noise_patterns.remove(index))
    }

    /// 按原文 / 修正 / 分类搜索（不区分大小写）
    pub fn search(&self, query: &str) -> Vec<(usize, &CorrectionTerm)> {
        let needle = query.to_lowercase();
        self.terms
            .iter()
            .enumerate()
            .filter(|(_, term)| term.matches(&needle))
            .collect()
    }
}

/// 保护词库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShieldingDictionary {
    pub protected_words: Vec<String>,
}

impl Dictionary for ShieldingDictionary {
    const KIND: DictionaryKind = DictionaryKind::Shielding;

    fn entry_count(&self) -> usize {
        self.protected_words.len()
    }
}

impl ShieldingDictionary {
    pub fn add_word(&mut self, word: &str) -> Result<(), ValidationError> {
        let word = normalize_word(word)?;
        self.protected_words.push(word);
        Ok(())
    }

    pub fn update_word(&mut self, index: usize, word: &str) -> Result<(), ValidationError> {
        let word = normalize_word(word)?;
        let len = self.protected_words.len();
        let slot = self
            .protected_words
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfRange { index, len })?;
        *slot = word;
        Ok(())
    }

    pub fn remove_word(&mut self, index: usize) -> Result<String, ValidationError> {
        if index >= self.protected_words.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.protected_words.len(),
            });
        }
        Ok(self.protected_words.remove(index))
    }

    /// 搜索保护词，空白词条不参与匹配
    pub fn search(&self, query: &str) -> Vec<(usize, &str)> {
        let needle = query.to_lowercase();
        self.protected_words
            .iter()
            .enumerate()
            .filter(|(_, word)| !word.trim().is_empty() && word.to_lowercase().contains(&needle))
            .map(|(i, word)| (i, word.as_str()))
            .collect()
    }
}

fn normalize_word(word: &str) -> Result<String, ValidationError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(ValidationError::EmptyProtectedWord);
    }
    Ok(word.to_string())
}

/// 保存状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// 一个可编辑的字典文档
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryDocument<D> {
    pub payload: D,
    /// 存在未保存的修改
    pub dirty: bool,
    pub save_status: SaveStatus,
}

impl<D: Dictionary> DictionaryDocument<D> {
    pub fn new(payload: D) -> Self {
        Self {
            payload,
            dirty: false,
            save_status: SaveStatus::Idle,
        }
    }

    pub fn kind(&self) -> DictionaryKind {
        D::KIND
    }
}
