//! 字符级差异计算
//!
//! 以 Unicode 字符（`char`）为单位做最短编辑脚本（Myers），适合不以空格分词的中文字幕。
//! 结果中相邻的同类片段会被合并；每个改动块内删除总是排在插入之前。

use serde::{Deserialize, Serialize};

/// 片段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Added,
    Removed,
    Unchanged,
}

/// 一段连续的、同类的字符
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub value: String,
}

impl DiffSegment {
    pub fn added(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Added,
            value: value.into(),
        }
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Removed,
            value: value.into(),
        }
    }

    pub fn unchanged(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Unchanged,
            value: value.into(),
        }
    }
}

/// 由片段还原原文（去掉新增部分）
pub fn original_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Added)
        .map(|s| s.value.as_str())
        .collect()
}

/// 由片段还原修正后的文本（去掉删除部分）
pub fn modified_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Removed)
        .map(|s| s.value.as_str())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep(char),
    Delete(char),
    Insert(char),
}

/// 计算两行文本的字符级差异
pub fn compute_diff(original: &str, modified: &str) -> Vec<DiffSegment> {
    if original == modified {
        if original.is_empty() {
            return Vec::new();
        }
        return vec![DiffSegment::unchanged(original)];
    }

    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = modified.chars().collect();

    merge(&edit_script(&a, &b))
}

/// Myers 最短编辑脚本，O((N+M)·D)
fn edit_script(a: &[char], b: &[char]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let offset = max as usize;

    let mut v = vec![0isize; 2 * offset + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + max) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    backtrack(a, b, &trace)
}

fn backtrack(a: &[char], b: &[char], trace: &[Vec<isize>]) -> Vec<Edit> {
    let max = (a.len() + b.len()) as isize;
    let mut x = a.len() as isize;
    let mut y = b.len() as isize;
    let mut edits = Vec::with_capacity(a.len() + b.len());

    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + max) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + max) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::Keep(a[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert(b[(y - 1) as usize]));
            } else {
                edits.push(Edit::Delete(a[(x - 1) as usize]));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

/// 合并连续同类字符；每个改动块先输出删除再输出插入
fn merge(edits: &[Edit]) -> Vec<DiffSegment> {
    let mut segments: Vec<DiffSegment> = Vec::new();
    let mut removed = String::new();
    let mut added = String::new();

    for edit in edits {
        match *edit {
            Edit::Delete(c) => removed.push(c),
            Edit::Insert(c) => added.push(c),
            Edit::Keep(c) => {
                flush_hunk(&mut segments, &mut removed, &mut added);
                push_char(&mut segments, SegmentKind::Unchanged, c);
            }
        }
    }
    flush_hunk(&mut segments, &mut removed, &mut added);

    segments
}

fn flush_hunk(segments: &mut Vec<DiffSegment>, removed: &mut String, added: &mut String) {
    if !removed.is_empty() {
        segments.push(DiffSegment::removed(std::mem::take(removed)));
    }
    if !added.is_empty() {
        segments.push(DiffSegment::added(std::mem::take(added)));
    }
}

fn push_char(segments: &mut Vec<DiffSegment>, kind: SegmentKind, c: char) {
    match segments.last_mut() {
        Some(last) if last.kind == kind => last.value.push(c),
        _ => segments.push(DiffSegment {
            kind,
            value: c.to_string(),
        }),
    }
}
